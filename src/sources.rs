use futures_util::future::join_all;
use image::ImageFormat;
use reqwest::{multipart, Method};
use serde_json::json;
use std::path::{Path, PathBuf};

use crate::api::{encode_segment, image_part, ApiClient, ApiError, Body};
use crate::models::{Ack, Source, SourceList};

/// Image types a source accepts.
pub const SOURCE_FORMATS: [ImageFormat; 2] = [ImageFormat::Png, ImageFormat::Jpeg];
pub const SOURCE_EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];

fn route(name: &str) -> String {
    format!("/source/{}", encode_segment(name))
}

pub async fn fetch_sources(api: &ApiClient) -> Result<Vec<Source>, ApiError> {
    let list: SourceList = api.get("/source").await?;
    Ok(list.sources)
}

/// The server only acknowledges creation, so the new source is built locally.
pub async fn create_source(api: &ApiClient, name: &str) -> Result<Source, ApiError> {
    let ack: Ack = api
        .call(Method::POST, "/source", Body::Json(json!({ "name": name })))
        .await?;
    tracing::info!(source = name, message = %ack.message, "created source");

    Ok(Source {
        name: name.to_string(),
        images: Vec::new(),
    })
}

pub async fn fetch_source(api: &ApiClient, name: &str) -> Result<Source, ApiError> {
    api.get(&route(name)).await
}

async fn upload_one(api: &ApiClient, name: &str, path: &Path) -> Result<(), ApiError> {
    let part = image_part(path, &SOURCE_FORMATS).await?;
    let form = multipart::Form::new().part("file", part);
    let _: Ack = api
        .call(Method::POST, &format!("{}/upload", route(name)), Body::Multipart(form))
        .await?;
    Ok(())
}

/// Upload every file in its own request, all at once.
///
/// Fails with [`ApiError::PartialUpload`] when any single upload fails; the
/// others are still attempted.
pub async fn upload_images(api: &ApiClient, name: &str, paths: &[PathBuf]) -> Result<(), ApiError> {
    let results = join_all(paths.iter().map(|path| upload_one(api, name, path))).await;

    let mut failed = 0;
    for (path, result) in paths.iter().zip(&results) {
        if let Err(e) = result {
            failed += 1;
            tracing::error!(path = %path.display(), error = %e, "upload failed");
        }
    }

    if failed > 0 {
        return Err(ApiError::PartialUpload {
            succeeded: paths.len() - failed,
            failed,
            total: paths.len(),
        });
    }

    tracing::info!(source = name, count = paths.len(), "uploaded images");
    Ok(())
}

pub async fn delete_images(api: &ApiClient, name: &str, images: &[String]) -> Result<(), ApiError> {
    let _: Ack = api
        .call(
            Method::DELETE,
            &format!("{}/files", route(name)),
            Body::Json(json!({ "fileNames": images })),
        )
        .await?;
    tracing::info!(source = name, count = images.len(), "deleted images");
    Ok(())
}

/// Raw bytes of one stored image, for thumbnails.
pub async fn fetch_image(api: &ApiClient, name: &str, image: &str) -> Result<Vec<u8>, ApiError> {
    api.fetch_bytes(&format!("/uploads/sources/{}/{}", encode_segment(name), encode_segment(image)))
        .await
}

pub fn delete_images_prompt(count: usize) -> String {
    format!("Are you sure you want to delete {} image(s)? This cannot be undone.", count)
}

pub fn delete_source_prompt(name: &str) -> String {
    format!("Are you sure you want to delete source \"{}\"? This cannot be undone.", name)
}

pub async fn delete_source(api: &ApiClient, name: &str) -> Result<(), ApiError> {
    let _: Ack = api.call(Method::DELETE, &route(name), Body::Empty).await?;
    tracing::info!(source = name, "deleted source");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::test_server;

    #[test]
    fn test_route_encodes_name() {
        assert_eq!(route("bio"), "/source/bio");
        assert_eq!(route("unit 3"), "/source/unit%203");
    }

    #[tokio::test]
    async fn test_fetch_sources() {
        let (base, head) =
            test_server::serve_once("200 OK", r#"{"sources": [{"name": "bio", "images": ["q1.png"]}]}"#).await;
        let api = test_server::client(base);

        let sources = fetch_sources(&api).await.unwrap();
        assert_eq!(sources.len(), 1);
        assert_eq!(sources[0].images, vec!["q1.png".to_string()]);
        assert!(head.await.unwrap().starts_with("GET /source/ HTTP/1.1"));
    }

    #[tokio::test]
    async fn test_create_source_builds_empty_source() {
        let (base, head) =
            test_server::serve_once("201 CREATED", r#"{"message": "Source created successfully"}"#).await;
        let api = test_server::client(base);

        let source = create_source(&api, "chem").await.unwrap();
        assert_eq!(source, Source { name: "chem".to_string(), images: vec![] });
        assert!(head.await.unwrap().contains(r#"{"name":"chem"}"#));
    }

    #[tokio::test]
    async fn test_delete_images_sends_file_names() {
        let (base, head) =
            test_server::serve_once("200 OK", r#"{"message": "Files deleted successfully"}"#).await;
        let api = test_server::client(base);

        delete_images(&api, "bio", &["a.png".to_string(), "b.jpg".to_string()])
            .await
            .unwrap();
        let head = head.await.unwrap();
        assert!(head.starts_with("DELETE /source/bio/files/ HTTP/1.1"));
        assert!(head.contains(r#"{"fileNames":["a.png","b.jpg"]}"#));
    }

    #[tokio::test]
    async fn test_upload_sends_multipart_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("page.png");
        std::fs::write(&path, b"not really a png").unwrap();

        let (base, head) =
            test_server::serve_once("201 CREATED", r#"{"message": "File uploaded successfully"}"#).await;
        let api = test_server::client(base);

        upload_images(&api, "bio", &[path]).await.unwrap();
        let head = head.await.unwrap();
        assert!(head.starts_with("POST /source/bio/upload/ HTTP/1.1"));
        assert!(head.to_lowercase().contains("content-type: multipart/form-data; boundary="));
        assert!(head.contains(r#"name="file"; filename="page.png""#));
    }

    #[tokio::test]
    async fn test_fetch_image_uses_upload_route() {
        let (base, head) = test_server::serve_once("200 OK", "JPEG").await;
        let api = test_server::client(base);

        let bytes = fetch_image(&api, "unit 3", "q 1.jpg").await.unwrap();
        assert_eq!(bytes, b"JPEG");
        assert!(head
            .await
            .unwrap()
            .starts_with("GET /uploads/sources/unit%203/q%201.jpg HTTP/1.1"));
    }

    #[test]
    fn test_delete_prompts() {
        assert_eq!(
            delete_images_prompt(3),
            "Are you sure you want to delete 3 image(s)? This cannot be undone."
        );
        assert_eq!(
            delete_source_prompt("bio"),
            "Are you sure you want to delete source \"bio\"? This cannot be undone."
        );
    }

    #[tokio::test]
    async fn test_upload_reports_partial_failure() {
        // Neither file is sent: one has the wrong type, the other is missing.
        let api = ApiClient::new("http://127.0.0.1:9");
        let paths = vec![PathBuf::from("notes.txt"), PathBuf::from("/nonexistent/qi/page.png")];

        let err = upload_images(&api, "bio", &paths).await.unwrap_err();
        assert!(matches!(
            err,
            ApiError::PartialUpload { succeeded: 0, failed: 2, total: 2 }
        ));
    }
}
