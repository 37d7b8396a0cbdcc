//! Axum route handlers for the resume parsing API.

use std::path::{Path, PathBuf};

use axum::{
    extract::{Multipart, State},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::errors::AppError;
use crate::models::resume::OutputRow;
use crate::parsing::pipeline::BatchItem;
use crate::state::AppState;

#[derive(Debug, Serialize, Deserialize)]
pub struct ParseResponse {
    pub results: Vec<OutputRow>,
}

/// POST /api/v1/resumes/parse
///
/// Multipart upload; every part that carries a file name is one document.
/// Files are spooled to a temporary directory under their original names and
/// parsed in upload order. Per-file failures come back as error rows.
pub async fn handle_parse(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<ParseResponse>, AppError> {
    let spool = tempfile::tempdir().map_err(|e| AppError::Internal(e.into()))?;
    let mut paths = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Malformed multipart body: {e}")))?
    {
        let Some(file_name) = field.file_name().and_then(sanitize_file_name) else {
            continue;
        };
        let data = field
            .bytes()
            .await
            .map_err(|e| AppError::Validation(format!("Failed to read '{file_name}': {e}")))?;
        paths.push(spool_file(spool.path(), paths.len(), &file_name, &data).await?);
    }

    if paths.is_empty() {
        return Err(AppError::Validation(
            "Upload at least one PDF or DOCX file".to_string(),
        ));
    }

    state.pipeline.ensure_reachable().await?;

    info!("Parsing {} uploaded file(s)", paths.len());
    let results = state
        .pipeline
        .parse_many(&paths)
        .await
        .into_iter()
        .map(BatchItem::into_row)
        .collect();

    Ok(Json(ParseResponse { results }))
}

/// Keeps only the final path component of a client-supplied name.
fn sanitize_file_name(name: &str) -> Option<String> {
    Path::new(name)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .filter(|n| !n.trim().is_empty())
}

/// Each upload gets its own sub-directory so duplicate names cannot collide.
async fn spool_file(
    root: &Path,
    index: usize,
    file_name: &str,
    data: &[u8],
) -> Result<PathBuf, AppError> {
    let dir = root.join(index.to_string());
    tokio::fs::create_dir(&dir)
        .await
        .map_err(|e| AppError::Internal(e.into()))?;
    let path = dir.join(file_name);
    tokio::fs::write(&path, data)
        .await
        .map_err(|e| AppError::Internal(e.into()))?;
    Ok(path)
}
