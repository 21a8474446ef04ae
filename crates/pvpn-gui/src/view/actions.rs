use crate::app::PvpnGui;
use crate::types::{
    btn_danger, btn_primary, Message, COLOR_TEXT, COLOR_TEXT_DIM, ICON_POWER_SVG,
    ICON_SHIELD_CHECK_SVG, ICON_SHIELD_SVG,
};
use iced::widget::{button, column, container, row, svg, text, toggler};
use iced::{Alignment, Element, Length};

impl PvpnGui {
    pub fn view_actions(&self) -> Element<'_, Message> {
        let connected = self.is_connected();

        let (icon, label) = if connected {
            (ICON_POWER_SVG, "DISCONNECT")
        } else if self.secure_core {
            (ICON_SHIELD_CHECK_SVG, "QUICK CONNECT (SECURE CORE)")
        } else {
            (ICON_SHIELD_SVG, "QUICK CONNECT")
        };

        let quick = button(
            container(
                row![
                    svg(svg::Handle::from_memory(icon))
                        .width(18)
                        .height(18)
                        .style(|_, _| svg::Style {
                            color: Some(iced::Color::WHITE)
                        }),
                    text(label).size(15).color(iced::Color::WHITE),
                ]
                .spacing(10)
                .align_y(Alignment::Center),
            )
            .width(Length::Fill)
            .center_x(Length::Fill),
        )
        .padding([14, 20])
        .width(Length::Fill)
        .on_press(Message::QuickConnectPressed)
        .style(if connected { btn_danger } else { btn_primary });

        // Secure Core needs a Plus or Visionary plan
        let secure_core_allowed = self.user_tier >= 2;
        let mut secure_core = toggler(self.secure_core).size(18);
        if secure_core_allowed {
            secure_core = secure_core.on_toggle(Message::SecureCoreToggled);
        }

        let secure_core_row = row![
            secure_core,
            text("Secure Core").size(13).color(if secure_core_allowed {
                COLOR_TEXT
            } else {
                COLOR_TEXT_DIM
            }),
        ]
        .spacing(10)
        .align_y(Alignment::Center);

        column![quick, secure_core_row].spacing(10).into()
    }
}
