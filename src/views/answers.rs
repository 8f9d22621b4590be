use iced::{
    widget::{column, container, row, text, Column},
    Element, Length,
};

use crate::chat::{group_by_section, plural, SectionGroup, SectionKind};
use crate::models::AssistantQuestion;
use crate::Message;

fn section_tag(kind: SectionKind) -> &'static str {
    match kind {
        SectionKind::MultipleChoice => "[MCQ]",
        SectionKind::ShortAnswer => "[Short]",
        SectionKind::FillInBlank => "[Fill]",
        SectionKind::Other => "[Section]",
    }
}

fn answer_card(position: usize, answer: &AssistantQuestion) -> Element<'_, Message> {
    let number = if answer.question_number.is_empty() {
        (position + 1).to_string()
    } else {
        answer.question_number.clone()
    };

    let mut heading = row![text(format!("Question {}", number)).size(14).style(text::primary)].spacing(8);
    if !answer.question_type.is_empty() {
        heading = heading.push(text(&answer.question_type).size(12).style(text::secondary));
    }

    let mut card = column![heading, text(&answer.question).size(15)].spacing(6);
    if let Some(options) = answer.options_with_answer.as_deref() {
        card = card.push(text(options).size(13).font(iced::Font::MONOSPACE));
    }
    card = card
        .push(text("Answer").size(12).style(text::success))
        .push(text(&answer.answer).size(15));
    if !answer.source.is_empty() {
        card = card.push(text(format!("Source: {}", answer.source)).size(12).style(text::secondary));
    }

    container(card)
        .padding(12)
        .width(Length::Fill)
        .style(container::rounded_box)
        .into()
}

fn section<'a>(group: SectionGroup<'a>) -> Element<'a, Message> {
    let header = row![
        text(section_tag(group.kind)).size(14).style(text::primary),
        text(group.name).size(18),
        text(plural(group.answers.len(), "question")).size(13).style(text::secondary),
    ]
    .spacing(8);

    let cards = group
        .answers
        .into_iter()
        .enumerate()
        .map(|(position, answer)| answer_card(position, answer));

    column![header, Column::with_children(cards).spacing(8)]
        .spacing(10)
        .into()
}

/// Structured answers grouped by section.
pub fn view(answers: &[AssistantQuestion]) -> Element<'_, Message> {
    let groups = group_by_section(answers);
    let summary = column![
        text(format!("{} Questions Answered Successfully", answers.len()))
            .size(17)
            .style(text::success),
        text(format!("Organized across {}", plural(groups.len(), "section")))
            .size(13)
            .style(text::secondary),
    ]
    .spacing(2);

    let sections = groups.into_iter().map(section);
    column![summary, Column::with_children(sections).spacing(16)]
        .spacing(12)
        .into()
}
