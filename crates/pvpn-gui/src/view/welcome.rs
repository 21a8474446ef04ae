use crate::app::PvpnGui;
use crate::types::{Message, COLOR_ACCENT, COLOR_TEXT_DIM, LOGO_SVG};
use iced::widget::{column, container, svg, text};
use iced::{Alignment, Element, Length};

impl PvpnGui {
    pub fn view_welcome(&self) -> Element<'_, Message> {
        let version = self
            .cli_version
            .clone()
            .unwrap_or_else(|| "Looking for the ProtonVPN CLI...".to_string());

        container(
            column![
                svg(svg::Handle::from_memory(LOGO_SVG))
                    .width(120)
                    .height(120)
                    .style(|_, _| svg::Style {
                        color: Some(COLOR_ACCENT)
                    }),
                text("ProtonVPN-CLI-GUI").size(26),
                text(version).size(12).color(COLOR_TEXT_DIM),
                text(format!("GUI v{}", env!("CARGO_PKG_VERSION")))
                    .size(12)
                    .color(COLOR_TEXT_DIM),
            ]
            .spacing(16)
            .align_x(Alignment::Center),
        )
        .width(Length::Fill)
        .height(Length::Fill)
        .center_x(Length::Fill)
        .center_y(Length::Fill)
        .into()
    }
}
