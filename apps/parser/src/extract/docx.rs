//! DOCX text extraction via `docx-rs`.
//!
//! A .docx file is a ZIP of XML parts. `read_docx` gives a typed tree:
//! Document → Paragraph → Run → Text. Body paragraphs are joined with `\n` in
//! document order, empty ones included.

use std::path::Path;

use docx_rs::{read_docx, DocumentChild, Paragraph, ParagraphChild, RunChild};
use tracing::debug;

use crate::errors::AppError;

pub fn extract(path: &Path) -> Result<String, AppError> {
    let unreadable = |reason: String| AppError::DocumentUnreadable {
        file: path.display().to_string(),
        reason,
    };

    let bytes = std::fs::read(path).map_err(|e| unreadable(e.to_string()))?;
    let docx = read_docx(&bytes).map_err(|e| unreadable(format!("docx parse error: {e:?}")))?;

    let paragraphs: Vec<String> = docx
        .document
        .children
        .iter()
        .filter_map(|child| match child {
            DocumentChild::Paragraph(para) => Some(paragraph_text(para)),
            _ => None,
        })
        .collect();

    debug!(
        "Extracted {} paragraphs from '{}'",
        paragraphs.len(),
        path.display()
    );
    Ok(paragraphs.join("\n"))
}

/// Concatenates the text of every run in a paragraph.
fn paragraph_text(para: &Paragraph) -> String {
    let mut text = String::new();
    for child in &para.children {
        if let ParagraphChild::Run(run) = child {
            for rc in &run.children {
                match rc {
                    RunChild::Text(t) => text.push_str(&t.text),
                    RunChild::Tab(_) => text.push('\t'),
                    RunChild::Break(_) => text.push('\n'),
                    _ => {}
                }
            }
        }
    }
    text
}
