use reqwest::header::CONTENT_TYPE;
use reqwest::{multipart, Method, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use image::ImageFormat;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("API call failed: {message}")]
    Status { status: StatusCode, message: String },

    #[error("Unexpected response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Could not read {path}: {source}")]
    File {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Unsupported file type: {0}")]
    UnsupportedFile(String),

    #[error("Maximum {max} files allowed. You selected {count} files.")]
    TooManyFiles { max: usize, count: usize },

    #[error("Upload partially failed. {succeeded}/{total} files succeeded. Please try the remaining {failed} again.")]
    PartialUpload {
        succeeded: usize,
        failed: usize,
        total: usize,
    },
}

pub enum Body {
    Empty,
    Json(Value),
    /// Sent without the default JSON content type so the multipart boundary
    /// header is used instead.
    Multipart(multipart::Form),
}

/// Thin JSON client for the question-images HTTP API.
#[derive(Debug, Clone)]
pub struct ApiClient {
    base_url: String,
    client: reqwest::Client,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        ApiClient {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Every route is served with a trailing slash.
    pub fn url(&self, route: &str) -> String {
        format!("{}{}/", self.base_url, route)
    }

    pub async fn call<T: DeserializeOwned>(
        &self,
        method: Method,
        route: &str,
        body: Body,
    ) -> Result<T, ApiError> {
        let url = self.url(route);
        tracing::debug!(%method, %url, "api request");

        let request = self.client.request(method.clone(), &url);
        let request = match body {
            Body::Empty => request.header(CONTENT_TYPE, "application/json"),
            Body::Json(value) => request
                .header(CONTENT_TYPE, "application/json")
                .body(value.to_string()),
            Body::Multipart(form) => request.multipart(form),
        };

        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            let message = error_message(&text);
            tracing::warn!(%method, %url, %status, %message, "api call failed");
            return Err(ApiError::Status { status, message });
        }

        Ok(serde_json::from_str(&text)?)
    }

    pub async fn get<T: DeserializeOwned>(&self, route: &str) -> Result<T, ApiError> {
        self.call(Method::GET, route, Body::Empty).await
    }

    /// Download a stored file as raw bytes. Static files have no trailing slash.
    pub async fn fetch_bytes(&self, route: &str) -> Result<Vec<u8>, ApiError> {
        let url = format!("{}{}", self.base_url, route);
        tracing::debug!(%url, "file request");

        let response = self.client.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            let message = error_message(&response.text().await?);
            tracing::warn!(%url, %status, %message, "file request failed");
            return Err(ApiError::Status { status, message });
        }

        Ok(response.bytes().await?.to_vec())
    }
}

/// Pull the server's explanation out of an error body.
///
/// Prefers a JSON `message`, then a JSON `error`, then the JSON itself, then
/// the raw text.
pub fn error_message(body: &str) -> String {
    match serde_json::from_str::<Value>(body) {
        Ok(value) => {
            let field = |key: &str| value.get(key).and_then(Value::as_str).map(str::to_string);
            field("message")
                .or_else(|| field("error"))
                .unwrap_or_else(|| value.to_string())
        }
        Err(_) if body.trim().is_empty() => "An unknown error occurred.".to_string(),
        Err(_) => body.to_string(),
    }
}

/// Reject files whose extension is not one of `allowed`.
pub fn check_image(path: &Path, allowed: &[ImageFormat]) -> Result<ImageFormat, ApiError> {
    match ImageFormat::from_path(path) {
        Ok(format) if allowed.contains(&format) => Ok(format),
        _ => Err(ApiError::UnsupportedFile(
            path.file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string()),
        )),
    }
}

/// Read an image from disk as a multipart file part.
pub async fn image_part(path: &Path, allowed: &[ImageFormat]) -> Result<multipart::Part, ApiError> {
    let format = check_image(path, allowed)?;
    let bytes = tokio::fs::read(path).await.map_err(|source| ApiError::File {
        path: path.to_path_buf(),
        source,
    })?;
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "image".to_string());

    Ok(multipart::Part::bytes(bytes)
        .file_name(file_name)
        .mime_str(format.to_mime_type())?)
}

/// Percent-encode one path segment.
pub fn encode_segment(segment: &str) -> String {
    let mut out = String::with_capacity(segment.len());
    for byte in segment.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(byte as char)
            }
            _ => out.push_str(&format!("%{:02X}", byte)),
        }
    }
    out
}

#[cfg(test)]
pub(crate) mod test_server {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::sync::oneshot;

    /// Client that talks to the local test server directly.
    pub fn client(base_url: String) -> super::ApiClient {
        super::ApiClient {
            base_url,
            client: reqwest::Client::builder().no_proxy().build().unwrap(),
        }
    }

    /// Serve one canned HTTP response; yields the raw request.
    pub async fn serve_once(status: &str, body: &str) -> (String, oneshot::Receiver<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let response = format!(
            "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            status,
            body.len(),
            body
        );
        let (tx, rx) = oneshot::channel();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = vec![0u8; 64 * 1024];
            let mut read = 0;
            loop {
                let n = socket.read(&mut buf[read..]).await.unwrap();
                read += n;
                if n == 0 || request_complete(&buf[..read]) {
                    break;
                }
            }
            let head = String::from_utf8_lossy(&buf[..read]).to_string();
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.ok();
            let _ = tx.send(head);
        });

        (format!("http://{}", addr), rx)
    }

    fn request_complete(buf: &[u8]) -> bool {
        let Some(end) = buf.windows(4).position(|w| w == b"\r\n\r\n") else {
            return false;
        };
        let head = String::from_utf8_lossy(&buf[..end]).to_lowercase();
        let length = head
            .lines()
            .find_map(|line| line.strip_prefix("content-length:"))
            .and_then(|value| value.trim().parse::<usize>().ok())
            .unwrap_or(0);
        buf.len() >= end + 4 + length
    }
}
