use crate::app::PvpnGui;
use crate::types::{Message, COLOR_DANGER, COLOR_TEXT_DIM, COLOR_WARNING, ICON_TERMINAL_SVG};
use iced::widget::{column, container, row, scrollable, svg, text};
use iced::{Border, Color, Element, Font, Length};

fn log_line_color(line: &str) -> Color {
    if line.starts_with("[ERR]") {
        COLOR_DANGER
    } else if line.starts_with("[WRN]") {
        COLOR_WARNING
    } else if line.starts_with("[DBG]") || line.starts_with("[TRC]") {
        Color::from_rgb(0.38, 0.38, 0.42)
    } else {
        COLOR_TEXT_DIM
    }
}

impl PvpnGui {
    pub fn view_console(&self) -> Element<'_, Message> {
        let log_lines: Vec<Element<'_, Message>> = self
            .logs
            .iter()
            .map(|line| {
                text(line.as_str())
                    .font(Font::MONOSPACE)
                    .size(12)
                    .color(log_line_color(line))
                    .into()
            })
            .collect();

        container(
            column![
                self.view_screen_title("Console"),
                container(
                    column![
                        row![
                            svg(svg::Handle::from_memory(ICON_TERMINAL_SVG))
                                .width(14)
                                .height(14)
                                .style(|_, _| svg::Style {
                                    color: Some(COLOR_TEXT_DIM)
                                }),
                            text("SESSION LOGS").size(12).color(COLOR_TEXT_DIM),
                        ]
                        .spacing(10),
                        scrollable(column(log_lines).spacing(2))
                            .anchor_bottom()
                            .height(Length::Fill),
                    ]
                    .spacing(10),
                )
                .padding(15)
                .height(Length::Fill)
                .style(|_| container::Style {
                    background: Some(Color::from_rgb(0.05, 0.05, 0.07).into()),
                    border: Border {
                        color: Color::from_rgb(0.18, 0.18, 0.22),
                        width: 1.0,
                        radius: 6.0.into(),
                    },
                    ..Default::default()
                }),
            ]
            .spacing(12),
        )
        .padding(16)
        .width(Length::Fill)
        .height(Length::Fill)
        .into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn errors_and_warnings_stand_out() {
        assert_eq!(log_line_color("[ERR] boom"), COLOR_DANGER);
        assert_eq!(log_line_color("[WRN] hmm"), COLOR_WARNING);
        assert_eq!(log_line_color("[INF] ok"), COLOR_TEXT_DIM);
    }
}
