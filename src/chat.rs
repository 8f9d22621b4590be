use chrono::{DateTime, Duration, Local};

use crate::models::{AssistantQuestion, AssistantResponse, ChatHistoryEntry, ResponseKind};

pub const DEFAULT_SECTION: &str = "General Questions";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Assistant,
}

/// One entry in the conversation as shown on screen.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
    pub images: Vec<String>,
    pub timestamp: DateTime<Local>,
    pub answers: Option<Vec<AssistantQuestion>>,
    pub is_structured: bool,
    pub ocr_content: Option<String>,
    pub page_files: Option<Vec<String>>,
}

impl ChatMessage {
    fn new(role: Role, content: impl Into<String>, timestamp: DateTime<Local>) -> Self {
        ChatMessage {
            role,
            content: content.into(),
            images: Vec::new(),
            timestamp,
            answers: None,
            is_structured: false,
            ocr_content: None,
            page_files: None,
        }
    }

    /// The question as typed, with the names of any attached images.
    pub fn user(content: impl Into<String>, images: Vec<String>, timestamp: DateTime<Local>) -> Self {
        let page_files = (!images.is_empty()).then(|| images.clone());
        ChatMessage {
            images,
            page_files,
            ..ChatMessage::new(Role::User, content, timestamp)
        }
    }

    pub fn assistant(content: impl Into<String>, timestamp: DateTime<Local>) -> Self {
        ChatMessage::new(Role::Assistant, content, timestamp)
    }

    pub fn error(message: &str, timestamp: DateTime<Local>) -> Self {
        ChatMessage::assistant(format!("Error: {}", message), timestamp)
    }

    pub fn from_response(response: &AssistantResponse, timestamp: DateTime<Local>) -> Self {
        let mut message = match response.result.as_ref() {
            Some(result) if result.kind == ResponseKind::StructuredAnswers => {
                let answers = result.answers.clone().unwrap_or_default();
                let total = result.total_questions.unwrap_or(answers.len());
                ChatMessage {
                    answers: Some(answers),
                    is_structured: true,
                    ..ChatMessage::assistant(format!("Answered {} questions", total), timestamp)
                }
            }
            Some(result) => ChatMessage::assistant(
                result.response.clone().unwrap_or_else(|| "No response".to_string()),
                timestamp,
            ),
            None => ChatMessage::assistant("No response", timestamp),
        };
        message.ocr_content = response.ocr_content.clone();
        message
    }

    pub fn is_assistant(&self) -> bool {
        self.role == Role::Assistant
    }
}

/// Rebuild the conversation from server history.
///
/// Exchange `i` of `n` is stamped `n - i` minutes before `now`, its answer one
/// second after the question.
pub fn from_history(history: &[ChatHistoryEntry], now: DateTime<Local>) -> Vec<ChatMessage> {
    let n = history.len() as i64;
    history
        .iter()
        .enumerate()
        .flat_map(|(i, entry)| {
            let asked = now - Duration::minutes(n - i as i64);
            [
                ChatMessage::user(entry.user.clone(), Vec::new(), asked),
                ChatMessage::assistant(entry.assistant.clone(), asked + Duration::seconds(1)),
            ]
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectionKind {
    MultipleChoice,
    ShortAnswer,
    FillInBlank,
    Other,
}

impl SectionKind {
    pub fn classify(section: &str) -> Self {
        let section = section.to_lowercase();
        if section.contains("multiple choice") || section.contains("mcq") {
            SectionKind::MultipleChoice
        } else if section.contains("short") || section.contains("brief") {
            SectionKind::ShortAnswer
        } else if section.contains("fill") || section.contains("blank") {
            SectionKind::FillInBlank
        } else {
            SectionKind::Other
        }
    }
}

#[derive(Debug)]
pub struct SectionGroup<'a> {
    pub name: String,
    pub kind: SectionKind,
    pub answers: Vec<&'a AssistantQuestion>,
}

/// Group answers by section, keeping the order sections first appear in.
pub fn group_by_section(answers: &[AssistantQuestion]) -> Vec<SectionGroup<'_>> {
    let mut groups: Vec<SectionGroup<'_>> = Vec::new();
    for answer in answers {
        let name = match answer.section.trim() {
            "" => DEFAULT_SECTION,
            section => section,
        };
        match groups.iter_mut().find(|group| group.name == name) {
            Some(group) => group.answers.push(answer),
            None => groups.push(SectionGroup {
                name: name.to_string(),
                kind: SectionKind::classify(name),
                answers: vec![answer],
            }),
        }
    }
    groups
}

/// `"1 question"`, `"3 sections"`.
pub fn plural(count: usize, noun: &str) -> String {
    if count == 1 {
        format!("{} {}", count, noun)
    } else {
        format!("{} {}s", count, noun)
    }
}
