use crate::app::PvpnGui;
use crate::types::{
    btn_icon, btn_primary, card, Message, COLOR_ACCENT, COLOR_TEXT_DIM, ICON_EYE_SVG,
};
use iced::widget::{
    button, checkbox, column, container, pick_list, row, scrollable, svg, text, text_input,
    Space,
};
use iced::{Alignment, Color, Element, Length};
use pvpn::profile::{DnsMode, KillSwitch, Plan, Protocol};

const LABEL_WIDTH: f32 = 150.0;

fn section_label<'a>(label: &'static str) -> Element<'a, Message> {
    text(label)
        .size(11)
        .color(Color::from_rgb(0.45, 0.45, 0.50))
        .into()
}

fn divider<'a>() -> Element<'a, Message> {
    container(Space::new().height(0))
        .width(Length::Fill)
        .height(Length::Fixed(1.0))
        .style(|_| container::Style {
            background: Some(Color::from_rgb(0.22, 0.21, 0.27).into()),
            ..Default::default()
        })
        .into()
}

fn labeled<'a>(label: &'a str, control: impl Into<Element<'a, Message>>) -> Element<'a, Message> {
    row![
        text(format!("{}:", label)).width(Length::Fixed(LABEL_WIDTH)),
        control.into(),
    ]
    .spacing(10)
    .align_y(Alignment::Center)
    .into()
}

impl PvpnGui {
    pub fn view_vpn_settings(&self) -> Element<'_, Message> {
        let profile = &self.profile;

        let password = row![
            text_input("Password", &profile.password)
                .on_input(Message::PasswordChanged)
                .secure(!self.show_password)
                .padding(8),
            button(
                svg(svg::Handle::from_memory(ICON_EYE_SVG))
                    .width(16)
                    .height(16)
                    .style(|_, _| svg::Style {
                        color: Some(COLOR_TEXT_DIM)
                    })
            )
            .padding(4)
            .on_press(Message::TogglePasswordVisibility)
            .style(btn_icon),
        ]
        .spacing(6)
        .align_y(Alignment::Center);

        let mut confirm = text_input("Confirm Password", &self.password_confirm)
            .secure(!self.show_password)
            .padding(8);
        if !profile.password.is_empty() {
            confirm = confirm.on_input(Message::PasswordConfirmChanged);
        }

        let mut form = column![
            section_label("ACCOUNT"),
            labeled(
                "Username",
                text_input("OpenVPN username", &profile.username)
                    .on_input(Message::UsernameChanged)
                    .padding(8)
            ),
            labeled("Password", password),
            labeled("Confirm Password", confirm),
            labeled(
                "Plan",
                pick_list(&Plan::ALL[..], Some(profile.plan), Message::PlanSelected)
                    .width(Length::Fill)
            ),
            divider(),
            section_label("CONNECTION"),
            labeled(
                "Default Protocol",
                pick_list(
                    &Protocol::ALL[..],
                    Some(profile.protocol),
                    Message::ProtocolSelected
                )
                .width(Length::Fill)
            ),
            labeled(
                "DNS",
                pick_list(&DnsMode::ALL[..], Some(profile.dns), Message::DnsSelected)
                    .width(Length::Fill)
            ),
        ]
        .spacing(10);

        if profile.dns == DnsMode::Custom {
            form = form.push(labeled(
                "Custom DNS Servers",
                text_input("Up to 3 addresses, separated by spaces", &profile.custom_dns)
                    .on_input(Message::CustomDnsChanged)
                    .padding(8),
            ));
        }

        form = form
            .push(labeled(
                "Kill Switch",
                pick_list(
                    &KillSwitch::ALL[..],
                    Some(profile.kill_switch),
                    Message::KillSwitchSelected,
                )
                .width(Length::Fill),
            ))
            .push(
                row![
                    checkbox(profile.split_tunnel).on_toggle(Message::SplitTunnelToggled),
                    text("Split Tunneling"),
                ]
                .spacing(10)
                .align_y(Alignment::Center),
            );

        if profile.split_tunnel {
            form = form.push(labeled(
                "Excluded IP",
                text_input("IPv4 address or CIDR block", &profile.split_tunnel_ips)
                    .on_input(Message::SplitTunnelIpsChanged)
                    .padding(8),
            ));
        }

        let can_update = !self.profile_initialized || self.profile_has_changes();
        let mut update = button(
            text("UPDATE SETTINGS")
                .width(Length::Fill)
                .align_x(Alignment::Center),
        )
        .padding(12)
        .width(Length::Fill)
        .style(btn_primary);
        if can_update {
            update = update.on_press(Message::UpdateProfilePressed);
        }

        let intro: Element<'_, Message> = if self.profile_initialized {
            Space::new().height(0).into()
        } else {
            text("Enter your OpenVPN credentials to get started.")
                .size(13)
                .color(COLOR_ACCENT)
                .into()
        };

        container(
            column![
                self.view_screen_title("VPN Settings"),
                intro,
                scrollable(
                    container(form.push(divider()).push(update))
                        .padding(20)
                        .style(card)
                )
                .height(Length::Fill),
            ]
            .spacing(12),
        )
        .padding(16)
        .width(Length::Fill)
        .height(Length::Fill)
        .into()
    }
}
