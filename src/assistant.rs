use image::ImageFormat;
use reqwest::{multipart, Method};
use std::path::PathBuf;

use crate::api::{check_image, encode_segment, image_part, ApiClient, ApiError, Body};
use crate::models::{Ack, AssistantResponse, ChatHistoryResponse};

pub const MAX_FILES: usize = 10;

/// Image types accepted alongside a question.
pub const ASK_FORMATS: [ImageFormat; 5] = [
    ImageFormat::Png,
    ImageFormat::Jpeg,
    ImageFormat::Gif,
    ImageFormat::Bmp,
    ImageFormat::Tiff,
];
pub const ASK_EXTENSIONS: [&str; 7] = ["png", "jpg", "jpeg", "gif", "bmp", "tif", "tiff"];

fn route(name: &str, action: &str) -> String {
    format!("/assistant/{}/{}", encode_segment(name), action)
}

/// Check a set of staged attachments before anything is read from disk.
pub fn validate_attachments(files: &[PathBuf]) -> Result<(), ApiError> {
    if files.len() > MAX_FILES {
        return Err(ApiError::TooManyFiles {
            max: MAX_FILES,
            count: files.len(),
        });
    }
    for path in files {
        check_image(path, &ASK_FORMATS)?;
    }
    Ok(())
}

/// Ask a question against `source`, optionally with images for OCR.
pub async fn ask(
    api: &ApiClient,
    source: &str,
    text: &str,
    files: &[PathBuf],
) -> Result<AssistantResponse, ApiError> {
    validate_attachments(files)?;

    let mut form = multipart::Form::new();
    if !text.is_empty() {
        form = form.text("text", text.to_string());
    }
    for path in files {
        form = form.part("file", image_part(path, &ASK_FORMATS).await?);
    }

    tracing::info!(source, files = files.len(), "asking assistant");
    let response: AssistantResponse = api
        .call(Method::POST, &route(source, "ask"), Body::Multipart(form))
        .await?;
    tracing::debug!(
        source,
        kind = ?response.kind,
        files_processed = response.files_processed,
        "assistant answered"
    );
    Ok(response)
}

pub async fn history(api: &ApiClient, source: &str) -> Result<ChatHistoryResponse, ApiError> {
    api.get(&route(source, "history")).await
}

pub async fn clear_history(api: &ApiClient, source: &str) -> Result<String, ApiError> {
    let ack: Ack = api
        .call(Method::POST, &route(source, "clear_history"), Body::Empty)
        .await?;
    tracing::info!(source, "cleared chat history");
    Ok(ack.message)
}
