use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    pub name: String,
    #[serde(default)]
    pub images: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SourceList {
    pub sources: Vec<Source>,
}

/// Plain `{ "message": ... }` acknowledgement.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct Ack {
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatHistoryEntry {
    pub user: String,
    #[serde(default)]
    pub assistant: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatHistoryResponse {
    #[serde(default)]
    pub source_name: String,
    #[serde(default)]
    pub history: Vec<ChatHistoryEntry>,
    #[serde(default)]
    pub total_exchanges: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseKind {
    StructuredAnswers,
    SingleResponse,
    #[default]
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssistantQuestion {
    #[serde(default)]
    pub question_number: String,
    #[serde(default)]
    pub question: String,
    #[serde(default)]
    pub answer: String,
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub section: String,
    #[serde(default)]
    pub question_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options_with_answer: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AssistantResult {
    #[serde(rename = "type", default)]
    pub kind: ResponseKind,
    pub answers: Option<Vec<AssistantQuestion>>,
    pub total_questions: Option<usize>,
    pub response: Option<String>,
    pub source_name: Option<String>,
    pub message: Option<String>,
    pub sections_summary: Option<BTreeMap<String, usize>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AssistantResponse {
    #[serde(rename = "type", default)]
    pub kind: ResponseKind,
    pub result: Option<AssistantResult>,
    #[serde(default)]
    pub source_name: String,
    #[serde(default)]
    pub files_processed: usize,
    pub chat_history_length: Option<usize>,
    pub message: Option<String>,
    pub ocr_content: Option<String>,
}
