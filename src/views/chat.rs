use iced::{
    alignment,
    widget::{
        button, column, container, horizontal_space, image, row, scrollable, text, text_input, Column, Row,
    },
    Element, Length,
};

use super::{answers, placeholder, preloader, SPINNER};
use crate::assistant::MAX_FILES;
use crate::chat::{ChatMessage, Role};
use crate::{file_name, App, Message};

fn render_markdown(markdown: &str) -> Element<'_, Message> {
    // Shown as typed; formatting only matters for the PDF export.
    text(markdown).size(15).into()
}

fn bubble(index: usize, message: &ChatMessage) -> Element<'_, Message> {
    let who = match message.role {
        Role::User => "You",
        Role::Assistant => "Assistant",
    };

    let mut header = row![
        text(who).size(13).style(text::primary),
        text(message.timestamp.format("%H:%M:%S").to_string())
            .size(12)
            .style(text::secondary),
        horizontal_space(),
    ]
    .spacing(8)
    .align_y(alignment::Vertical::Center);

    if message.is_assistant() {
        header = header.push(
            button(text("Download PDF").size(12))
                .style(button::secondary)
                .padding([4, 8])
                .on_press(Message::DownloadPdf(index)),
        );
    }

    let mut body = column![header].spacing(8);

    if !message.content.is_empty() {
        body = body.push(render_markdown(&message.content));
    }
    if !message.images.is_empty() {
        let names = message.images.iter().map(|name| text(format!("[image] {}", name)).size(12).into());
        body = body.push(Column::with_children(names).spacing(2));
    }
    if let Some(answers) = message.answers.as_deref().filter(|_| message.is_structured) {
        body = body.push(answers::view(answers));
    }
    if let Some(ocr) = message.ocr_content.as_deref() {
        body = body.push(text(format!("OCR: {}", ocr)).size(12).style(text::secondary));
    }

    container(body)
        .padding(12)
        .width(Length::Fill)
        .style(container::rounded_box)
        .into()
}

fn staged(app: &App) -> Element<'_, Message> {
    let chips = app.conversation.staged.iter().enumerate().map(|(index, path)| {
        container(
            row![
                image(image::Handle::from_path(path)).width(40).height(40),
                text(file_name(path)).size(12),
                button(text("✕").size(12))
                    .style(button::text)
                    .padding(2)
                    .on_press(Message::RemoveAttachment(index)),
            ]
            .spacing(4)
            .align_y(alignment::Vertical::Center),
        )
        .padding(4)
        .style(container::rounded_box)
        .into()
    });

    row![
        Row::with_children(chips).spacing(6).wrap(),
        text(format!("{}/{}", app.conversation.staged.len(), MAX_FILES))
            .size(12)
            .style(text::secondary),
    ]
    .spacing(8)
    .into()
}

pub fn view(app: &App) -> Element<'_, Message> {
    let Some(name) = app.selected.as_deref() else {
        return placeholder(
            "No source selected",
            "Select a source from the sidebar to start asking questions.",
        );
    };
    let conversation = &app.conversation;

    let Some(messages) = conversation.messages.as_ref() else {
        return preloader(app.loading_frame, "Loading chat history...".to_string());
    };

    let header = row![
        text(name).size(22),
        horizontal_space(),
        button(text("Clear history").size(13))
            .style(button::secondary)
            .on_press_maybe(
                (!conversation.loading && !messages.is_empty()).then_some(Message::ClearHistory)
            ),
    ]
    .align_y(alignment::Vertical::Center);

    let history: Element<Message> = if messages.is_empty() {
        placeholder(
            "Start a conversation",
            "Ask a question about this source or attach question images.",
        )
    } else {
        let mut list = Column::with_children(
            messages
                .iter()
                .enumerate()
                .map(|(index, message)| bubble(index, message)),
        )
        .spacing(10);

        if conversation.loading {
            list = list.push(
                row![
                    text(SPINNER[app.loading_frame % SPINNER.len()]).size(18),
                    text("Thinking...").size(14),
                ]
                .spacing(8),
            );
        }
        scrollable(list).height(Length::Fill).into()
    };

    let can_send = !conversation.loading
        && (!conversation.input.trim().is_empty() || !conversation.staged.is_empty());

    let input = row![
        text_input("Ask a question...", &conversation.input)
            .on_input(Message::InputChanged)
            .on_submit(Message::Submit)
            .padding(12)
            .size(16)
            .id(conversation.input_id.clone()),
        button(text("Attach"))
            .style(button::secondary)
            .padding(12)
            .on_press_maybe((!conversation.loading).then_some(Message::PickAttachments)),
        button(text("Send"))
            .padding(12)
            .on_press_maybe(can_send.then_some(Message::Submit)),
    ]
    .spacing(8)
    .align_y(alignment::Vertical::Center);

    let mut content = column![header, history].spacing(12);
    if !conversation.staged.is_empty() {
        content = content.push(staged(app));
    }
    content.push(input).into()
}
