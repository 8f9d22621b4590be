//! PDF export of assistant responses.

pub mod canvas;
pub mod fonts;
pub mod layout;
pub mod markdown;
pub mod pdf;

use std::path::{Path, PathBuf};
use thiserror::Error;

use layout::{Cursor, LayoutConfig, LayoutEngine};
use pdf::PdfDocument;

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("Could not create download directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Could not write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// File name for the message at `index` in the conversation.
pub fn file_name(index: usize) -> String {
    format!("chat-response-{}.pdf", index + 1)
}

/// Lay out `content` as markdown on a fresh A4 document.
pub fn render_markdown(content: &str, title: &str) -> PdfDocument {
    let config = LayoutConfig::default();
    let mut document = PdfDocument::new(title);
    let mut cursor = Cursor::new(&config);
    let blocks = markdown::parse(content);

    LayoutEngine::new(&mut document, &config).render(&blocks, &mut cursor);
    document
}

/// Render the message at `index` and write it into `directory`.
pub fn export_message(content: &str, index: usize, directory: &Path) -> Result<PathBuf, ExportError> {
    let name = file_name(index);
    let document = render_markdown(content, &name);

    std::fs::create_dir_all(directory).map_err(|source| ExportError::CreateDir {
        path: directory.to_path_buf(),
        source,
    })?;

    let path = directory.join(&name);
    std::fs::write(&path, document.to_bytes()).map_err(|source| ExportError::Write {
        path: path.clone(),
        source,
    })?;

    tracing::info!(
        path = %path.display(),
        pages = document.page_count(),
        "exported response"
    );
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_name_is_one_based() {
        assert_eq!(file_name(0), "chat-response-1.pdf");
        assert_eq!(file_name(4), "chat-response-5.pdf");
    }

    #[test]
    fn test_export_message_writes_pdf() {
        let dir = tempfile::tempdir().unwrap();
        let downloads = dir.path().join("downloads");
        let path = export_message("# Answer\n\nIt is **42** \u{2713}", 2, &downloads).unwrap();

        assert_eq!(path, downloads.join("chat-response-3.pdf"));
        let bytes = std::fs::read(&path).unwrap();
        assert!(bytes.starts_with(b"%PDF-1.4"));
    }

    #[test]
    fn test_empty_content_gives_single_blank_page() {
        let document = render_markdown("", "empty");
        assert_eq!(document.page_count(), 1);
        assert!(document.pages()[0].ops.is_empty());
    }
}
