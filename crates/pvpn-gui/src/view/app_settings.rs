use crate::app::PvpnGui;
use crate::types::{btn_secondary, card, log_level_name, Message, COLOR_TEXT_DIM};
use iced::widget::{
    button, checkbox, column, container, pick_list, row, slider, text, text_input,
};
use iced::{Alignment, Color, Element, Length};
use pvpn::cli::DEFAULT_PROGRAM;

impl PvpnGui {
    pub fn view_app_settings(&self) -> Element<'_, Message> {
        let section_label = |label: &'static str| -> Element<'_, Message> {
            text(label)
                .size(11)
                .color(Color::from_rgb(0.45, 0.45, 0.50))
                .into()
        };

        let cli_status = match (&self.cli, &self.cli_version) {
            (Some(_), Some(version)) => version.clone(),
            (Some(cli), None) => cli.program().display().to_string(),
            (None, _) => "Not found".to_string(),
        };

        container(
            column![
                self.view_screen_title("App Settings"),
                container(
                    column![
                        section_label("PROTONVPN CLI"),
                        row![
                            text("CLI Path:").width(Length::Fixed(120.0)),
                            text_input(DEFAULT_PROGRAM, &self.settings.cli_path)
                                .on_input(Message::CliPathChanged)
                                .padding(8),
                            button(text(match self.cli_test_result {
                                Some(true) => "✓",
                                Some(false) => "✗",
                                None => "Test",
                            }))
                            .on_press(Message::TestCli)
                            .style(match self.cli_test_result {
                                Some(true) => button::success,
                                Some(false) => button::danger,
                                None => button::secondary,
                            }),
                        ]
                        .spacing(10)
                        .align_y(Alignment::Center),
                        text(cli_status).size(12).color(COLOR_TEXT_DIM),
                        row![
                            text("Elevation:").width(Length::Fixed(120.0)),
                            pick_list(
                                self.escalation_tools.as_slice(),
                                Some(self.settings.escalation_tool.clone()),
                                Message::EscalationToolChanged
                            )
                            .width(Length::Fill),
                        ]
                        .spacing(10)
                        .align_y(Alignment::Center),
                        section_label("SYSTEM"),
                        row![
                            text("Log Level:").width(Length::Fixed(120.0)),
                            slider(
                                0.0..=5.0,
                                self.settings.log_level_val,
                                Message::LogLevelSliderChanged
                            )
                            .step(1.0)
                            .width(Length::Fill),
                            text(log_level_name(self.settings.log_level_val))
                                .width(Length::Fixed(60.0)),
                        ]
                        .spacing(10)
                        .align_y(Alignment::Center),
                        row![
                            checkbox(self.settings.close_to_tray)
                                .on_toggle(Message::CloseToTrayToggled),
                            text("Close window to system tray"),
                        ]
                        .spacing(10)
                        .align_y(Alignment::Center),
                        row![
                            checkbox(self.settings.notifications)
                                .on_toggle(Message::NotificationsToggled),
                            text("Desktop notifications on connect and disconnect"),
                        ]
                        .spacing(10)
                        .align_y(Alignment::Center),
                        button(text("RESET TO DEFAULTS").size(12))
                            .padding(10)
                            .on_press(Message::ResetSettings)
                            .style(btn_secondary),
                    ]
                    .spacing(12),
                )
                .padding(20)
                .style(card),
            ]
            .spacing(12),
        )
        .padding(16)
        .width(Length::Fill)
        .height(Length::Fill)
        .into()
    }
}
