//! Orchestrator: extraction, prompt, model call, repair and normalization for
//! one document, and the sequential batch loop over many.
//!
//! Batch output always has one entry per input, in input order. A failure on one
//! document is kept in that document's `BatchItem` and never stops the loop.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use anyhow::Context;
use tracing::{debug, info, warn};

use crate::errors::AppError;
use crate::extract::{extract_text, DocumentKind};
use crate::llm_client::ModelGateway;
use crate::models::resume::{OutputRow, ResumeRecord};
use crate::parsing::normalize::normalize;
use crate::parsing::prompts::build_prompt;
use crate::parsing::repair::repair;

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Model tag passed to the gateway on every call.
    pub model: String,
}

/// Outcome for one document of a batch.
#[derive(Debug)]
pub struct BatchItem {
    pub file: String,
    pub latency_s: f64,
    pub result: Result<ResumeRecord, AppError>,
}

impl BatchItem {
    pub fn into_row(self) -> OutputRow {
        match self.result {
            Ok(record) => OutputRow::parsed(self.file, record, Some(self.latency_s)),
            Err(e) => OutputRow::failed(self.file, &e, Some(self.latency_s)),
        }
    }
}

pub struct ResumePipeline {
    gateway: Arc<dyn ModelGateway>,
    config: PipelineConfig,
}

impl ResumePipeline {
    pub fn new(gateway: Arc<dyn ModelGateway>, config: PipelineConfig) -> Self {
        Self { gateway, config }
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }

    pub fn endpoint(&self) -> &str {
        self.gateway.endpoint()
    }

    /// Liveness probe, run once before a batch starts.
    pub async fn ensure_reachable(&self) -> Result<(), AppError> {
        self.gateway.ensure_reachable().await.map_err(AppError::from)
    }

    pub async fn parse_one(&self, path: &Path) -> Result<ResumeRecord, AppError> {
        DocumentKind::from_path(path)?;

        let text = extract_text(path.to_path_buf()).await?;
        if text.trim().is_empty() {
            warn!("No text extracted from '{}'", path.display());
        }

        let request = build_prompt(&text);
        let raw = self.gateway.send(&request, &self.config.model).await?;
        debug!("Model reply for '{}': {} chars", path.display(), raw.len());

        normalize(repair(&raw))
    }

    /// Runs `parse_one` and captures its outcome, timing and file name.
    pub async fn parse_timed(&self, path: &Path) -> BatchItem {
        let file = display_name(path);
        let started = Instant::now();
        let result = self.parse_one(path).await;
        let latency_s = round_secs(started.elapsed().as_secs_f64());

        match &result {
            Ok(record) => info!(
                "Parsed '{file}' in {latency_s}s: {} skills",
                record.skills().len()
            ),
            Err(e) => warn!("Failed to parse '{file}': {e}"),
        }

        BatchItem {
            file,
            latency_s,
            result,
        }
    }

    /// Parses each document in order, one at a time.
    pub async fn parse_many(&self, paths: &[PathBuf]) -> Vec<BatchItem> {
        let mut items = Vec::with_capacity(paths.len());
        for path in paths {
            items.push(self.parse_timed(path).await);
        }
        items
    }
}

/// Lists the `.pdf` and `.docx` files of `dir`, sorted by file name.
pub fn collect_documents(dir: &Path) -> anyhow::Result<Vec<PathBuf>> {
    let mut paths = Vec::new();
    for entry in std::fs::read_dir(dir)
        .with_context(|| format!("Cannot read directory '{}'", dir.display()))?
    {
        let path = entry?.path();
        if path.is_file() && DocumentKind::from_path(&path).is_ok() {
            paths.push(path);
        }
    }
    paths.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(paths)
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn round_secs(secs: f64) -> f64 {
    (secs * 100.0).round() / 100.0
}
