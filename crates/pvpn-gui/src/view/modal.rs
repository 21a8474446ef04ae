use crate::app::PvpnGui;
use crate::types::{
    btn_danger, btn_primary, btn_secondary, Message, Popup, COLOR_ACCENT, COLOR_SURFACE,
    COLOR_TEXT,
};
use iced::widget::{button, column, container, row, text};
use iced::{Alignment, Border, Color, Element, Length};

fn modal_button<'a>(
    label: &'a str,
    message: Message,
    style: fn(&iced::Theme, button::Status) -> button::Style,
) -> Element<'a, Message> {
    button(text(label).width(Length::Fill).align_x(Alignment::Center))
        .padding(10)
        .width(Length::Fill)
        .on_press(message)
        .style(style)
        .into()
}

impl PvpnGui {
    pub fn view_modal<'a>(&self, popup: &'a Popup) -> Element<'a, Message> {
        let (title, body, buttons): (&str, String, Element<'a, Message>) = match popup {
            Popup::Notice { title, body } => (
                title.as_str(),
                body.clone(),
                modal_button("OK", Message::PopupDismissed, btn_primary),
            ),
            Popup::ConfirmSecureCore { enable } => (
                "Attention!",
                format!(
                    "{} Secure Core mode will disconnect the active VPN connection.\n\nDo you want to continue?",
                    if *enable { "Switching to" } else { "Disabling" }
                ),
                row![
                    modal_button("Cancel", Message::SecureCoreCancelled, btn_secondary),
                    modal_button("Continue", Message::SecureCoreConfirmed, btn_primary),
                ]
                .spacing(10)
                .into(),
            ),
            Popup::ConfirmExit => (
                "Exit ProtonVPN-CLI-GUI?",
                "Are you sure you wish to exit the application?".to_string(),
                row![
                    modal_button("Cancel", Message::PopupDismissed, btn_secondary),
                    modal_button("Exit", Message::ExitConfirmed, btn_danger),
                ]
                .spacing(10)
                .into(),
            ),
        };

        let modal_content = container(
            column![
                text(title).size(20).color(COLOR_ACCENT),
                text(body).size(14).color(COLOR_TEXT),
                buttons,
            ]
            .spacing(20)
            .padding(28),
        )
        .width(Length::Fixed(380.0))
        .style(|_| container::Style {
            background: Some(COLOR_SURFACE.into()),
            border: Border {
                radius: 12.0.into(),
                color: COLOR_ACCENT,
                width: 1.0,
            },
            ..Default::default()
        });

        container(modal_content)
            .width(Length::Fill)
            .height(Length::Fill)
            .center_x(Length::Fill)
            .center_y(Length::Fill)
            .style(|_| container::Style {
                background: Some(Color::from_rgba(0.0, 0.0, 0.0, 0.75).into()),
                ..Default::default()
            })
            .into()
    }
}
