pub mod answers;
pub mod chat;
pub mod sidebar;
pub mod sources;

use iced::{
    alignment,
    widget::{button, column, container, row, text, Column},
    Element, Length,
};

use crate::toast::{self, Toasts};
use crate::Message;

pub const SPINNER: [&str; 10] = ["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

/// Centered spinner with a caption.
pub fn preloader(frame: usize, caption: String) -> Element<'static, Message> {
    container(
        column![
            text(SPINNER[frame % SPINNER.len()]).size(32),
            text(caption).size(15)
        ]
        .spacing(10)
        .align_x(alignment::Horizontal::Center),
    )
    .width(Length::Fill)
    .height(Length::Fill)
    .align_x(alignment::Horizontal::Center)
    .align_y(alignment::Vertical::Center)
    .into()
}

/// Centered hint shown when there is nothing to display.
pub fn placeholder<'a>(title: &'a str, hint: &'a str) -> Element<'a, Message> {
    container(
        column![text(title).size(20), text(hint).size(14).style(text::secondary)]
            .spacing(8)
            .align_x(alignment::Horizontal::Center),
    )
    .width(Length::Fill)
    .height(Length::Fill)
    .align_x(alignment::Horizontal::Center)
    .align_y(alignment::Vertical::Center)
    .into()
}

pub fn toasts(toasts: &Toasts) -> Element<'_, Message> {
    let entries = toasts.iter().enumerate().map(|(index, entry)| {
        let style = match entry.kind {
            toast::Kind::Success => text::success,
            toast::Kind::Error => text::danger,
            toast::Kind::Info => text::primary,
        };
        container(
            row![
                text(&entry.text).size(14).style(style).width(Length::Fill),
                button(text("✕").size(12))
                    .style(button::text)
                    .on_press(Message::DismissToast(index)),
            ]
            .spacing(8)
            .align_y(alignment::Vertical::Center),
        )
        .padding(8)
        .width(Length::Fill)
        .style(container::rounded_box)
        .into()
    });

    Column::with_children(entries).spacing(4).into()
}
