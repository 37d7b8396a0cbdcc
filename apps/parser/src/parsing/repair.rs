//! Response Repairer: recovers the three expected fields from whatever the model returned.
//!
//! Strategy, in order:
//! 1. parse the whole reply (after stripping markdown fences) as JSON;
//! 2. parse the greedy span from the first `{` to the last `}`;
//! 3. give up and default every field.
//!
//! Step 2 is a lexical heuristic. A reply holding two separate objects yields a
//! span covering both, which does not parse, so the result is all defaults.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};
use tracing::{debug, warn};

static OBJECT_SPAN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)\{.*\}").expect("object span regex is valid"));

/// The model's answer reduced to exactly `name`, `email` and `skills`.
///
/// Values stay untyped here; type checks belong to the normalizer.
#[derive(Debug, Clone, PartialEq)]
pub struct RepairedFields {
    pub name: Value,
    pub email: Value,
    pub skills: Value,
}

impl Default for RepairedFields {
    fn default() -> Self {
        Self {
            name: Value::String(String::new()),
            email: Value::String(String::new()),
            skills: Value::Array(Vec::new()),
        }
    }
}

impl RepairedFields {
    fn from_object(mut object: Map<String, Value>) -> Self {
        let defaults = Self::default();
        let mut take = |key: &str, default: Value| match object.remove(key) {
            Some(Value::Null) | None => default,
            Some(v) => v,
        };
        Self {
            name: take("name", defaults.name),
            email: take("email", defaults.email),
            skills: take("skills", defaults.skills),
        }
    }
}

pub fn repair(raw: &str) -> RepairedFields {
    match locate_object(raw) {
        Some(object) => RepairedFields::from_object(object),
        None => {
            warn!("Model reply held no parseable JSON object; using empty fields");
            RepairedFields::default()
        }
    }
}

fn locate_object(raw: &str) -> Option<Map<String, Value>> {
    if let Ok(Value::Object(object)) = serde_json::from_str::<Value>(strip_json_fences(raw)) {
        return Some(object);
    }

    let span = OBJECT_SPAN.find(raw)?;
    debug!("Direct parse failed; trying brace span of {} bytes", span.len());
    match serde_json::from_str::<Value>(span.as_str()) {
        Ok(Value::Object(object)) => Some(object),
        _ => None,
    }
}

/// Strips ```json ... ``` or ``` ... ``` code fences from model output.
fn strip_json_fences(text: &str) -> &str {
    let text = text.trim();
    let stripped = text
        .strip_prefix("```json")
        .or_else(|| text.strip_prefix("```"));
    match stripped {
        Some(inner) => {
            let inner = inner.trim_start();
            inner
                .strip_suffix("```")
                .map(|s| s.trim())
                .unwrap_or(inner)
        }
        None => text,
    }
}
