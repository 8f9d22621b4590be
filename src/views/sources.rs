use iced::{
    alignment,
    widget::{button, checkbox, column, container, horizontal_space, image, row, scrollable, text, Column},
    Element, Length,
};

use super::{placeholder, preloader};
use crate::{App, Message};

const THUMBNAIL_SIZE: f32 = 72.0;

fn thumbnail(handle: Option<&image::Handle>) -> Element<'_, Message> {
    match handle {
        Some(handle) => image(handle.clone())
            .width(THUMBNAIL_SIZE)
            .height(THUMBNAIL_SIZE)
            .content_fit(iced::ContentFit::Cover)
            .into(),
        None => container(text("...").size(12).style(text::secondary))
            .center(THUMBNAIL_SIZE)
            .style(container::bordered_box)
            .into(),
    }
}

fn summary(images: usize, selected: usize) -> String {
    let mut line = format!("{} image(s) in this source.", images);
    if selected > 0 {
        line.push_str(&format!(" {} selected.", selected));
    }
    line
}

pub fn view(app: &App) -> Element<'_, Message> {
    let Some(name) = app.selected.as_deref() else {
        return placeholder(
            "No source selected",
            "Create a new source or select one from the sidebar to manage files.",
        );
    };

    let manager = &app.manager;
    let source = match (&manager.source, manager.loading) {
        (Some(source), false) => source,
        _ => return preloader(app.loading_frame, format!("Loading {}...", name)),
    };

    let selected = manager.selected_images.len();
    let mut actions = row![
        column![
            text(&source.name).size(22),
            text(summary(source.images.len(), selected)).size(14).style(text::secondary),
        ]
        .spacing(4),
        horizontal_space(),
    ]
    .spacing(8)
    .align_y(alignment::Vertical::Center);

    if selected > 0 {
        actions = actions.push(
            button(text(format!("Delete ({})", selected)))
                .style(button::danger)
                .on_press_maybe((!manager.busy).then_some(Message::DeleteSelectedImages)),
        );
    }
    actions = actions
        .push(
            button(text(if manager.busy { "Working..." } else { "Upload Images" }))
                .on_press_maybe((!manager.busy).then_some(Message::PickUploads)),
        )
        .push(
            button(text("Delete Source"))
                .style(button::secondary)
                .on_press_maybe((!manager.busy && source.images.is_empty()).then_some(Message::DeleteSource)),
        );

    let images: Element<Message> = if source.images.is_empty() {
        placeholder("No images yet", "Upload png or jpg question images to this source.")
    } else {
        let rows = source.images.iter().map(|image| {
            let checked = manager.selected_images.contains(image);
            let key = image.clone();
            container(
                row![
                    thumbnail(manager.thumbnails.get(image)),
                    checkbox(image.as_str(), checked).on_toggle(move |_| Message::ToggleImage(key.clone())),
                ]
                .spacing(12)
                .align_y(alignment::Vertical::Center),
            )
            .padding(8)
            .width(Length::Fill)
            .style(container::rounded_box)
            .into()
        });
        scrollable(Column::with_children(rows).spacing(4))
            .height(Length::Fill)
            .into()
    };

    column![actions, images].spacing(16).into()
}
