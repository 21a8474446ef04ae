pub mod actions;
pub mod app_settings;
pub mod console;
pub mod header;
pub mod modal;
pub mod servers;
pub mod settings;
pub mod status;
pub mod welcome;

use crate::app::PvpnGui;
use crate::types::{
    Message, Screen, COLOR_BG, COLOR_SURFACE, COLOR_TEXT, COLOR_WARNING, ICON_CLOSE_SVG,
};
use iced::widget::{button, column, container, row, stack, svg, text, Space};
use iced::{Alignment, Border, Element, Length};

impl PvpnGui {
    pub fn view(&self, _id: iced::window::Id) -> Element<'_, Message> {
        let screen = match self.screen {
            Screen::Welcome => self.view_welcome(),
            Screen::Main => self.view_main(),
            Screen::VpnSettings => self.view_vpn_settings(),
            Screen::AppSettings => self.view_app_settings(),
            Screen::Console => self.view_console(),
        };

        let main_container = container(screen)
            .width(Length::Fill)
            .height(Length::Fill)
            .style(|_| container::Style {
                background: Some(COLOR_BG.into()),
                text_color: Some(COLOR_TEXT),
                ..Default::default()
            });

        if let Some(popup) = &self.popup {
            stack![main_container, self.view_modal(popup)].into()
        } else {
            main_container.into()
        }
    }

    fn view_main(&self) -> Element<'_, Message> {
        // Missing CLI banner
        let cli_warning: Element<'_, Message> = if self.cli_test_result == Some(false) {
            container(
                text("ProtonVPN CLI not found! Install it or set its path in App Settings.")
                    .size(12)
                    .color(COLOR_WARNING),
            )
            .width(Length::Fill)
            .padding(10)
            .style(|_| container::Style {
                background: Some(COLOR_SURFACE.into()),
                border: Border {
                    color: COLOR_WARNING,
                    width: 1.0,
                    radius: 6.0.into(),
                },
                ..Default::default()
            })
            .into()
        } else {
            container(Space::new().height(0)).into()
        };

        container(
            column![
                self.view_header(),
                cli_warning,
                self.view_connection_window(),
                self.view_actions(),
                self.view_server_tree(),
            ]
            .spacing(12)
            .width(Length::Fill)
            .height(Length::Fill),
        )
        .padding(16)
        .width(Length::Fill)
        .height(Length::Fill)
        .into()
    }

    /// Title row with a close button, shared by the secondary screens.
    pub(crate) fn view_screen_title<'a>(&self, title: &'a str) -> Element<'a, Message> {
        row![
            text(title).size(20).width(Length::Fill),
            button(
                svg(svg::Handle::from_memory(ICON_CLOSE_SVG))
                    .width(18)
                    .height(18)
                    .style(|_, _| svg::Style {
                        color: Some(COLOR_TEXT)
                    })
            )
            .on_press(Message::CloseScreen)
            .style(crate::types::btn_icon),
        ]
        .align_y(Alignment::Center)
        .into()
    }
}
