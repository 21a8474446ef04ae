use crate::app::PvpnGui;
use crate::types::{
    btn_icon, card, Message, COLOR_ACCENT, COLOR_DANGER, COLOR_SUCCESS, COLOR_TEXT,
    COLOR_TEXT_DIM, ICON_ARROW_DOWN_SVG, ICON_ARROW_UP_SVG, ICON_CLOCK_SVG, ICON_COPY_SVG,
    ICON_SHIELD_CHECK_SVG, ICON_SHIELD_SVG,
};
use iced::widget::{button, column, container, row, svg, text, Space};
use iced::{Alignment, Border, Color, Element, Font, Length};
use pvpn::monitor::{ip_label, ConnectionDetails};

/// Country code in a rounded badge, standing in for a flag.
pub fn flag_badge<'a>(code: &str) -> Element<'a, Message> {
    container(
        text(code.to_uppercase())
            .size(11)
            .font(Font::MONOSPACE)
            .color(Color::WHITE),
    )
    .padding([2, 6])
    .style(|_| container::Style {
        background: Some(Color::from_rgba(0.43, 0.29, 1.0, 0.35).into()),
        border: Border {
            radius: 4.0.into(),
            color: COLOR_ACCENT,
            width: 1.0,
        },
        ..Default::default()
    })
    .into()
}

fn stat<'a>(icon: &'static [u8], value: String) -> Element<'a, Message> {
    row![
        svg(svg::Handle::from_memory(icon))
            .width(14)
            .height(14)
            .style(|_, _| svg::Style {
                color: Some(COLOR_TEXT_DIM)
            }),
        text(value).size(12).color(COLOR_TEXT),
    ]
    .spacing(4)
    .align_y(Alignment::Center)
    .into()
}

impl PvpnGui {
    fn view_ip_row(&self, label: String) -> Element<'_, Message> {
        let copy: Element<'_, Message> = if self.current_ip.is_some() {
            button(
                svg(svg::Handle::from_memory(ICON_COPY_SVG))
                    .width(14)
                    .height(14)
                    .style(|_, _| svg::Style {
                        color: Some(COLOR_TEXT_DIM)
                    }),
            )
            .padding(2)
            .on_press(Message::CopyIp)
            .style(btn_icon)
            .into()
        } else {
            Space::new().width(0).into()
        };

        row![text(label).size(13).color(COLOR_TEXT_DIM), copy]
            .spacing(6)
            .align_y(Alignment::Center)
            .into()
    }

    fn view_connected(&self, details: &ConnectionDetails) -> Element<'_, Message> {
        let (sent, received, elapsed) = match &self.stats {
            Some(stats) => (
                stats.sent.clone(),
                stats.received.clone(),
                stats.elapsed.clone(),
            ),
            None => ("-".to_string(), "-".to_string(), String::new()),
        };

        let mut info = row![].spacing(12).align_y(Alignment::Center);
        let protocol = details.protocol_label();
        if !protocol.is_empty() {
            info = info.push(text(protocol).size(12).color(COLOR_TEXT_DIM));
        }
        let load = details.load_label();
        if !load.is_empty() {
            info = info.push(text(load).size(12).color(COLOR_TEXT_DIM));
        }

        column![
            row![
                svg(svg::Handle::from_memory(ICON_SHIELD_CHECK_SVG))
                    .width(28)
                    .height(28)
                    .style(|_, _| svg::Style {
                        color: Some(COLOR_SUCCESS)
                    }),
                flag_badge(&details.country_code),
                text(details.exit_server_label()).size(17),
            ]
            .spacing(10)
            .align_y(Alignment::Center),
            self.view_ip_row(details.ip_label()),
            info,
            row![
                stat(ICON_ARROW_UP_SVG, sent),
                stat(ICON_ARROW_DOWN_SVG, received),
                Space::new().width(Length::Fill),
                stat(ICON_CLOCK_SVG, elapsed),
            ]
            .spacing(14)
            .align_y(Alignment::Center),
        ]
        .spacing(8)
        .into()
    }

    fn view_disconnected(&self) -> Element<'_, Message> {
        column![
            row![
                svg(svg::Handle::from_memory(ICON_SHIELD_SVG))
                    .width(28)
                    .height(28)
                    .style(|_, _| svg::Style {
                        color: Some(COLOR_DANGER)
                    }),
                text("You are not protected!").size(17).color(COLOR_DANGER),
            ]
            .spacing(10)
            .align_y(Alignment::Center),
            self.view_ip_row(ip_label(self.current_ip.as_deref())),
        ]
        .spacing(8)
        .into()
    }

    /// Current connection: exit server, IP, protocol, load and session stats.
    pub fn view_connection_window(&self) -> Element<'_, Message> {
        let content = match (&self.connection, self.is_connected()) {
            (Some(details), true) => self.view_connected(details),
            (None, true) => text(format!(
                "Connected to {}",
                self.monitor.last_known().unwrap_or("a VPN server")
            ))
            .size(15)
            .color(COLOR_SUCCESS)
            .into(),
            _ => self.view_disconnected(),
        };

        container(content)
            .padding(16)
            .width(Length::Fill)
            .style(card)
            .into()
    }
}
