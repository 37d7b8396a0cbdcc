// Document Text Extractor: PDF and DOCX to plain text.
// Extraction is CPU-bound; async callers go through `extract_text`, which runs
// the work on the blocking pool.

pub mod docx;
pub mod pdf;

use std::path::{Path, PathBuf};

use crate::errors::AppError;

/// Size above which the whole-document PDF fallback is skipped.
pub const PDF_FALLBACK_MAX_BYTES: u64 = 5_000_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Pdf,
    Docx,
}

impl DocumentKind {
    /// Resolves the kind from the file extension, case-insensitively.
    pub fn from_path(path: &Path) -> Result<Self, AppError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());
        match ext.as_deref() {
            Some("pdf") => Ok(DocumentKind::Pdf),
            Some("docx") => Ok(DocumentKind::Docx),
            Some(other) => Err(AppError::UnsupportedFormat(format!(".{other}"))),
            None => Err(AppError::UnsupportedFormat("(no extension)".to_string())),
        }
    }
}

/// Synchronous extraction. An empty string is a valid result for PDFs.
pub fn extract(path: &Path) -> Result<String, AppError> {
    match DocumentKind::from_path(path)? {
        DocumentKind::Pdf => Ok(pdf::extract(path)),
        DocumentKind::Docx => docx::extract(path),
    }
}

pub async fn extract_text(path: PathBuf) -> Result<String, AppError> {
    tokio::task::spawn_blocking(move || extract(&path))
        .await
        .map_err(|e| AppError::Internal(anyhow::anyhow!("spawn_blocking failed in extraction: {e}")))?
}
