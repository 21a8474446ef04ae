use crate::app::PvpnGui;
use crate::types::{
    btn_icon, Message, Screen, COLOR_ACCENT, COLOR_TEXT, ICON_POWER_SVG, ICON_SETTINGS_SVG,
    ICON_SHUFFLE_SVG, ICON_SLIDERS_SVG, ICON_TERMINAL_SVG, LOGO_SVG,
};
use iced::widget::{button, row, svg, text, tooltip, Space};
use iced::{Alignment, Element, Length};

fn header_button<'a>(
    icon: &'static [u8],
    hint: &'a str,
    message: Message,
) -> Element<'a, Message> {
    tooltip(
        button(
            svg(svg::Handle::from_memory(icon))
                .width(22)
                .height(22)
                .style(|_, _| svg::Style {
                    color: Some(COLOR_TEXT)
                }),
        )
        .padding(6)
        .on_press(message)
        .style(btn_icon),
        text(hint).size(12),
        tooltip::Position::Bottom,
    )
    .into()
}

impl PvpnGui {
    pub fn view_header(&self) -> Element<'_, Message> {
        row![
            svg(svg::Handle::from_memory(LOGO_SVG))
                .width(30)
                .height(30)
                .style(|_, _| svg::Style {
                    color: Some(COLOR_ACCENT)
                }),
            text("ProtonVPN").size(22),
            Space::new().width(Length::Fill),
            header_button(ICON_SHUFFLE_SVG, "Connect to a random server", Message::ConnectRandom),
            header_button(
                ICON_SETTINGS_SVG,
                "VPN Settings",
                Message::ShowScreen(Screen::VpnSettings)
            ),
            header_button(
                ICON_SLIDERS_SVG,
                "App Settings",
                Message::ShowScreen(Screen::AppSettings)
            ),
            header_button(
                ICON_TERMINAL_SVG,
                "Console",
                Message::ShowScreen(Screen::Console)
            ),
            header_button(ICON_POWER_SVG, "Exit", Message::ExitPressed),
        ]
        .spacing(6)
        .align_y(Alignment::Center)
        .into()
    }
}
