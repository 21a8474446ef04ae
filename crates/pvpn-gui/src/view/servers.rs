use crate::app::PvpnGui;
use crate::types::{
    btn_icon, btn_secondary, card, Message, COLOR_ACCENT, COLOR_SUCCESS, COLOR_TEXT,
    COLOR_TEXT_DIM, COLOR_WARNING, ICON_CHEVRON_SVG,
};
use crate::view::status::flag_badge;
use iced::widget::{button, column, container, row, scrollable, svg, text, Space};
use iced::{Alignment, Border, Color, Element, Length, Radians};
use pvpn::servers::{CountryNode, Feature, ServerNode};

fn feature_badge<'a>(feature: Feature) -> Element<'a, Message> {
    let color = match feature {
        Feature::SecureCore => COLOR_SUCCESS,
        Feature::Tor => COLOR_ACCENT,
        Feature::P2p => COLOR_WARNING,
    };
    container(text(feature.label()).size(10).color(color))
        .padding([1, 5])
        .style(move |_| container::Style {
            border: Border {
                radius: 4.0.into(),
                color,
                width: 1.0,
            },
            ..Default::default()
        })
        .into()
}

fn plus_badge<'a>() -> Element<'a, Message> {
    container(text("PLUS").size(10).color(Color::WHITE))
        .padding([1, 5])
        .style(|_| container::Style {
            background: Some(COLOR_ACCENT.into()),
            border: Border {
                radius: 4.0.into(),
                ..Default::default()
            },
            ..Default::default()
        })
        .into()
}

fn connect_button<'a>(message: Message) -> Element<'a, Message> {
    button(text("Connect").size(11))
        .padding([3, 10])
        .on_press(message)
        .style(btn_secondary)
        .into()
}

fn view_server_row(server: &ServerNode) -> Element<'_, Message> {
    let mut line = row![text(&server.name).size(13).width(Length::Fixed(110.0))]
        .spacing(8)
        .align_y(Alignment::Center);

    if let Some(city) = &server.city {
        line = line.push(text(city).size(12).color(COLOR_TEXT_DIM));
    }
    if server.plus {
        line = line.push(plus_badge());
    }
    if let Some(feature) = server.feature {
        line = line.push(feature_badge(feature));
    }

    line.push(Space::new().width(Length::Fill))
        .push(text(&server.load).size(12).color(COLOR_TEXT_DIM))
        .push(connect_button(Message::ConnectServer(server.name.clone())))
        .into()
}

impl PvpnGui {
    fn view_country<'a>(&'a self, country: &'a CountryNode) -> Element<'a, Message> {
        let expanded = self.expanded_country.as_deref() == Some(country.name.as_str());

        let mut header = row![
            button(
                svg(svg::Handle::from_memory(ICON_CHEVRON_SVG))
                    .width(14)
                    .height(14)
                    .rotation(Radians(if expanded {
                        std::f32::consts::FRAC_PI_2
                    } else {
                        0.0
                    }))
                    .style(|_, _| svg::Style {
                        color: Some(COLOR_TEXT_DIM)
                    }),
            )
            .padding(4)
            .on_press(Message::CountryToggled(country.name.clone()))
            .style(btn_icon),
            flag_badge(&country.code),
            button(text(&country.name).size(14).color(COLOR_TEXT))
                .padding(0)
                .on_press(Message::CountryToggled(country.name.clone()))
                .style(button::text),
        ]
        .spacing(8)
        .align_y(Alignment::Center);

        for feature in &country.features {
            header = header.push(feature_badge(*feature));
        }
        header = header
            .push(Space::new().width(Length::Fill))
            .push(connect_button(Message::ConnectCountry(country.code.clone())));

        let mut node = column![header].spacing(6);
        if expanded {
            let servers: Vec<Element<'a, Message>> =
                country.servers.iter().map(view_server_row).collect();
            node = node.push(container(column(servers).spacing(4)).padding([0, 30]));
        }
        node.into()
    }

    /// Countries and their servers, one country expanded at a time.
    pub fn view_server_tree(&self) -> Element<'_, Message> {
        let countries: Vec<Element<'_, Message>> = self
            .server_tree
            .iter()
            .map(|country| self.view_country(country))
            .collect();

        let body: Element<'_, Message> = if countries.is_empty() {
            text("Building server list...")
                .size(13)
                .color(COLOR_TEXT_DIM)
                .into()
        } else {
            scrollable(column(countries).spacing(6).padding([0, 8]))
                .height(Length::Fill)
                .into()
        };

        container(
            column![
                text(if self.secure_core {
                    "SECURE CORE COUNTRIES"
                } else {
                    "COUNTRIES"
                })
                .size(11)
                .color(COLOR_TEXT_DIM),
                body,
            ]
            .spacing(10),
        )
        .padding(12)
        .width(Length::Fill)
        .height(Length::Fill)
        .style(card)
        .into()
    }
}
