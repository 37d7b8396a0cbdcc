//! PDF text extraction.
//!
//! # Strategy
//! 1. Primary: walk each page's content stream with `lopdf`, collecting one block
//!    per `BT … ET` text object together with its origin. Origins are mapped
//!    through the current transformation matrix (`q`/`Q`/`cm`), so pages drawn
//!    with a flipped y-axis still read top down. Blocks are sorted top to
//!    bottom, then left to right, within each page, and pages are joined in
//!    page order. Sorting is never global across pages: a whole-document sort
//!    by coordinates would interleave the lines of different pages.
//! 2. Fallback: if the primary pass produced only whitespace and the file is
//!    under `PDF_FALLBACK_MAX_BYTES`, use `pdf-extract` on the whole document.
//!
//! Nothing here returns an error. Every failure, including a panic inside either
//! PDF library, is logged and becomes "no text", which the pipeline treats like
//! an empty resume.

use std::cmp::Reverse;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::Path;

use lopdf::content::Operation;
use lopdf::{Document, Object};
use tracing::{debug, warn};

use super::PDF_FALLBACK_MAX_BYTES;

/// A block whose decoded text is more than this share of control characters is
/// treated as undecodable (glyph-id encoded fonts without a usable mapping).
const MAX_CONTROL_RATIO: f32 = 0.3;

/// TJ adjustments below this (thousandths of an em) are rendered as a space.
const TJ_SPACE_THRESHOLD: f32 = -200.0;

const IDENTITY: [f32; 6] = [1.0, 0.0, 0.0, 1.0, 0.0, 0.0];

#[derive(Debug, Clone, PartialEq)]
pub struct TextBlock {
    pub x: f32,
    pub y: f32,
    pub text: String,
}

impl TextBlock {
    /// Higher y is closer to the top of the page in device space.
    fn reading_key(&self) -> (Reverse<i64>, i64) {
        (Reverse(self.y as i64), self.x as i64)
    }
}

pub fn extract(path: &Path) -> String {
    extract_with(path, extract_blocks)
}

fn extract_with<F>(path: &Path, primary: F) -> String
where
    F: FnOnce(&Path) -> Result<String, lopdf::Error>,
{
    let text = match catch_unwind(AssertUnwindSafe(|| primary(path))) {
        Ok(Ok(text)) => text,
        Ok(Err(e)) => {
            warn!("Block extraction failed for '{}': {e}", path.display());
            String::new()
        }
        Err(_) => {
            warn!("Block extraction panicked for '{}'", path.display());
            String::new()
        }
    };

    if !text.trim().is_empty() {
        return text;
    }

    let size = std::fs::metadata(path).map(|m| m.len()).unwrap_or(u64::MAX);
    if size >= PDF_FALLBACK_MAX_BYTES {
        debug!(
            "Skipping whole-document fallback for '{}' ({size} bytes)",
            path.display()
        );
        return text;
    }

    // pdf-extract panics on some malformed inputs instead of returning an error.
    match catch_unwind(|| pdf_extract::extract_text(path)) {
        Ok(Ok(fallback)) => {
            debug!(
                "Whole-document fallback produced {} chars for '{}'",
                fallback.len(),
                path.display()
            );
            fallback
        }
        Ok(Err(e)) => {
            warn!("Fallback extraction failed for '{}': {e}", path.display());
            String::new()
        }
        Err(_) => {
            warn!("Fallback extraction panicked for '{}'", path.display());
            String::new()
        }
    }
}

fn extract_blocks(path: &Path) -> Result<String, lopdf::Error> {
    let doc = Document::load(path)?;
    let mut pages_text = Vec::new();

    for (page_number, page_id) in doc.get_pages() {
        let content = match doc.get_and_decode_page_content(page_id) {
            Ok(content) => content,
            Err(e) => {
                debug!("Page {page_number}: undecodable content stream ({e})");
                continue;
            }
        };

        let mut blocks = collect_blocks(&content.operations);
        blocks.sort_by_key(TextBlock::reading_key);
        pages_text.extend(blocks.into_iter().map(|b| b.text));
    }

    Ok(pages_text.join("\n"))
}

/// Text state tracked while walking a content stream. Only what positioning needs.
#[derive(Debug, Clone, Copy)]
struct TextState {
    /// Text matrix [a b c d e f].
    tm: [f32; 6],
    /// Text line matrix.
    tlm: [f32; 6],
    leading: f32,
}

impl Default for TextState {
    fn default() -> Self {
        Self {
            tm: IDENTITY,
            tlm: IDENTITY,
            leading: 0.0,
        }
    }
}

impl TextState {
    fn move_line(&mut self, tx: f32, ty: f32) {
        let [a, b, c, d, e, f] = self.tlm;
        self.tlm = [a, b, c, d, tx * a + ty * c + e, tx * b + ty * d + f];
        self.tm = self.tlm;
    }

    fn next_line(&mut self) {
        self.move_line(0.0, -self.leading);
    }

    /// Origin of the next glyph in device space.
    fn origin(&self, ctm: &[f32; 6]) -> (f32, f32) {
        apply(ctm, self.tm[4], self.tm[5])
    }
}

/// `m × n` for matrices in PDF `[a b c d e f]` form.
fn multiply(m: &[f32; 6], n: &[f32; 6]) -> [f32; 6] {
    [
        m[0] * n[0] + m[1] * n[2],
        m[0] * n[1] + m[1] * n[3],
        m[2] * n[0] + m[3] * n[2],
        m[2] * n[1] + m[3] * n[3],
        m[4] * n[0] + m[5] * n[2] + n[4],
        m[4] * n[1] + m[5] * n[3] + n[5],
    ]
}

fn apply(m: &[f32; 6], x: f32, y: f32) -> (f32, f32) {
    (m[0] * x + m[2] * y + m[4], m[1] * x + m[3] * y + m[5])
}

/// Block under construction inside one BT … ET.
#[derive(Default)]
struct PendingBlock {
    origin: Option<(f32, f32)>,
    text: String,
    last: Option<(f32, f32)>,
}

impl PendingBlock {
    fn show(&mut self, origin: (f32, f32), text: &str) {
        let (x, y) = origin;
        if self.origin.is_none() {
            self.origin = Some(origin);
        }
        if let Some((prev_x, prev_y)) = self.last {
            if (prev_y - y).abs() > 0.5 {
                if !self.text.ends_with('\n') {
                    self.text.push('\n');
                }
            } else if x - prev_x > 0.5
                && !self.text.ends_with(char::is_whitespace)
                && !text.starts_with(char::is_whitespace)
            {
                // Repositioned further along the same baseline.
                self.text.push(' ');
            }
        }
        self.last = Some(origin);
        self.text.push_str(text);
    }

    fn finish(self) -> Option<TextBlock> {
        let (x, y) = self.origin?;
        let text = self.text.trim();
        if text.is_empty() || control_ratio(text) > MAX_CONTROL_RATIO {
            return None;
        }
        Some(TextBlock {
            x,
            y,
            text: text.to_string(),
        })
    }
}

fn collect_blocks(operations: &[Operation]) -> Vec<TextBlock> {
    let mut blocks = Vec::new();
    let mut state = TextState::default();
    let mut ctm = IDENTITY;
    let mut saved_ctm = Vec::new();
    let mut pending: Option<PendingBlock> = None;

    for op in operations {
        let operands = &op.operands;
        match op.operator.as_str() {
            "q" => saved_ctm.push(ctm),
            "Q" => ctm = saved_ctm.pop().unwrap_or(IDENTITY),
            "cm" => {
                if let Some(m) = six_numbers(operands) {
                    ctm = multiply(&m, &ctm);
                }
            }
            "BT" => {
                state.tm = IDENTITY;
                state.tlm = IDENTITY;
                pending = Some(PendingBlock::default());
            }
            "ET" => {
                if let Some(block) = pending.take().and_then(PendingBlock::finish) {
                    blocks.push(block);
                }
            }
            "Tm" => {
                if let Some(m) = six_numbers(operands) {
                    state.tm = m;
                    state.tlm = m;
                }
            }
            "Td" => {
                if let (Some(tx), Some(ty)) = (number(operands, 0), number(operands, 1)) {
                    state.move_line(tx, ty);
                }
            }
            "TD" => {
                if let (Some(tx), Some(ty)) = (number(operands, 0), number(operands, 1)) {
                    state.leading = -ty;
                    state.move_line(tx, ty);
                }
            }
            "TL" => {
                if let Some(leading) = number(operands, 0) {
                    state.leading = leading;
                }
            }
            "T*" => state.next_line(),
            "Tj" => {
                if let (Some(block), Some(text)) = (pending.as_mut(), operands.first().and_then(string_text)) {
                    block.show(state.origin(&ctm), &text);
                }
            }
            "'" => {
                state.next_line();
                if let (Some(block), Some(text)) = (pending.as_mut(), operands.first().and_then(string_text)) {
                    block.show(state.origin(&ctm), &text);
                }
            }
            "\"" => {
                state.next_line();
                if let (Some(block), Some(text)) = (pending.as_mut(), operands.get(2).and_then(string_text)) {
                    block.show(state.origin(&ctm), &text);
                }
            }
            "TJ" => {
                if let (Some(block), Some(Object::Array(parts))) = (pending.as_mut(), operands.first()) {
                    block.show(state.origin(&ctm), &tj_text(parts));
                }
            }
            _ => {}
        }
    }

    blocks
}

fn number(operands: &[Object], idx: usize) -> Option<f32> {
    operands.get(idx).and_then(|o| o.as_float().ok())
}

fn six_numbers(operands: &[Object]) -> Option<[f32; 6]> {
    let mut m = [0.0; 6];
    for (i, slot) in m.iter_mut().enumerate() {
        *slot = number(operands, i)?;
    }
    Some(m)
}

fn tj_text(parts: &[Object]) -> String {
    let mut text = String::new();
    for part in parts {
        match part {
            Object::String(..) => {
                if let Some(s) = string_text(part) {
                    text.push_str(&s);
                }
            }
            other => {
                if let Ok(adjust) = other.as_float() {
                    if adjust < TJ_SPACE_THRESHOLD && !text.ends_with(' ') {
                        text.push(' ');
                    }
                }
            }
        }
    }
    text
}

/// Decodes a PDF string operand: UTF-16BE when it carries a BOM, otherwise
/// each byte is taken as a Latin-1 code point.
fn string_text(object: &Object) -> Option<String> {
    let Object::String(bytes, _) = object else {
        return None;
    };
    if let Some(utf16) = bytes.strip_prefix(&[0xFE, 0xFF]) {
        let units: Vec<u16> = utf16
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        return Some(String::from_utf16_lossy(&units));
    }
    Some(bytes.iter().map(|&b| b as char).collect())
}

fn control_ratio(text: &str) -> f32 {
    let total = text.chars().count();
    if total == 0 {
        return 0.0;
    }
    let control = text
        .chars()
        .filter(|c| c.is_control() && !matches!(c, '\n' | '\t' | '\r'))
        .count();
    control as f32 / total as f32
}
