use iced::{
    alignment,
    widget::{button, column, container, row, scrollable, text, text_input, Column},
    Element, Length,
};

use crate::{App, Message, Tab};

const WIDTH: f32 = 260.0;

fn badge(count: usize) -> String {
    if count > 9 {
        "9+".to_string()
    } else {
        count.to_string()
    }
}

fn tab_button(label: &str, tab: Tab, active: Tab) -> Element<'_, Message> {
    let style = if tab == active { button::primary } else { button::text };
    button(text(label).size(16))
        .style(style)
        .width(Length::Fill)
        .padding(10)
        .on_press(Message::SelectTab(tab))
        .into()
}

pub fn view(app: &App) -> Element<'_, Message> {
    let header = text("Question Images").size(22);

    let tabs = column![
        tab_button("Ask Questions", Tab::Questions, app.tab),
        tab_button("Source Files", Tab::Sources, app.tab),
    ]
    .spacing(4);

    let create = row![
        text_input("Source Name", &app.new_source_name)
            .on_input(Message::NewSourceNameChanged)
            .on_submit(Message::CreateSource)
            .padding(8),
        button(text(if app.creating_source { "…" } else { "+" }).size(16))
            .padding([8, 12])
            .on_press_maybe((!app.creating_source).then_some(Message::CreateSource)),
    ]
    .spacing(6)
    .align_y(alignment::Vertical::Center);

    let list: Element<Message> = if app.sources_loading {
        text("Loading sources...").size(14).style(text::secondary).into()
    } else if app.sources.is_empty() {
        text("No sources yet").size(14).style(text::secondary).into()
    } else {
        let items = app.sources.iter().map(|source| {
            let style = if app.is_selected(&source.name) {
                button::primary
            } else {
                button::text
            };
            let mut label = row![text(&source.name).size(14).width(Length::Fill)].spacing(6);
            if !source.images.is_empty() {
                label = label.push(text(badge(source.images.len())).size(12).style(text::success));
            }
            button(label)
                .style(style)
                .width(Length::Fill)
                .padding(8)
                .on_press(Message::SelectSource(source.name.clone()))
                .into()
        });
        scrollable(Column::with_children(items).spacing(2)).height(Length::Fill).into()
    };

    let sources_header = row![
        text("Sources").size(14).width(Length::Fill),
        text(app.sources.len().to_string()).size(12).style(text::secondary),
    ];

    container(
        column![header, tabs, sources_header, create, list]
            .spacing(16)
            .padding(16),
    )
    .width(Length::Fixed(WIDTH))
    .height(Length::Fill)
    .style(container::bordered_box)
    .into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_badge_caps_at_nine() {
        assert_eq!(badge(3), "3");
        assert_eq!(badge(9), "9");
        assert_eq!(badge(12), "9+");
    }
}
