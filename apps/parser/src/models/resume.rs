use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::errors::AppError;

/// Unanchored email pattern used to find an address inside free text.
pub const EMAIL_PATTERN: &str = r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,24}\b";

pub static EMAIL_SEARCH: Lazy<Regex> =
    Lazy::new(|| Regex::new(EMAIL_PATTERN).expect("email regex is valid"));

static EMAIL_EXACT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,24}$")
        .expect("anchored email regex is valid")
});

/// The canonical parse result for one resume.
///
/// Only constructible through `ResumeRecord::new` (or deserialization, which
/// routes through it), so every instance satisfies:
/// - `name` is single-spaced title case;
/// - `email` is empty or a lowercase address matching the email pattern;
/// - `skills` holds no two entries equal ignoring case, none empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RecordFields")]
pub struct ResumeRecord {
    name: String,
    email: String,
    skills: Vec<String>,
}

#[derive(Deserialize)]
struct RecordFields {
    name: String,
    email: String,
    #[serde(default)]
    skills: Vec<String>,
}

impl TryFrom<RecordFields> for ResumeRecord {
    type Error = AppError;

    fn try_from(fields: RecordFields) -> Result<Self, Self::Error> {
        ResumeRecord::new(fields.name, fields.email, fields.skills)
    }
}

impl ResumeRecord {
    /// Normalizes `name` and `email`, then rejects any state that breaks the
    /// record invariants. Skills are checked, not repaired.
    pub fn new(name: String, email: String, skills: Vec<String>) -> Result<Self, AppError> {
        let name = title_case(&collapse_whitespace(&name));
        let email = email.trim().to_lowercase();

        if !email.is_empty() && !EMAIL_EXACT.is_match(&email) {
            return Err(AppError::SchemaViolation(format!(
                "email '{email}' is not a valid address"
            )));
        }

        let mut seen = HashSet::new();
        for skill in &skills {
            if skill.trim().is_empty() || skill.trim() != skill {
                return Err(AppError::SchemaViolation(format!(
                    "skill '{skill}' is blank or has surrounding whitespace"
                )));
            }
            if !seen.insert(skill.to_lowercase()) {
                return Err(AppError::SchemaViolation(format!(
                    "skill '{skill}' is duplicated"
                )));
            }
        }

        Ok(Self {
            name,
            email,
            skills,
        })
    }

    /// Record standing in for a document whose pipeline failed.
    /// The error text is carried as the only skill so it stays visible in
    /// consumers that only read the record fields.
    pub fn placeholder(error: &str) -> Self {
        Self {
            name: String::new(),
            email: String::new(),
            skills: vec![format!("ERROR: {}", error.trim())],
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn skills(&self) -> &[String] {
        &self.skills
    }
}

/// One line of batch output: the record plus caller-attached metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputRow {
    #[serde(flatten)]
    pub record: ResumeRecord,
    pub file: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latency_s: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl OutputRow {
    pub fn parsed(file: impl Into<String>, record: ResumeRecord, latency_s: Option<f64>) -> Self {
        Self {
            record,
            file: file.into(),
            latency_s,
            error: None,
        }
    }

    pub fn failed(file: impl Into<String>, error: &AppError, latency_s: Option<f64>) -> Self {
        let message = error.to_string();
        Self {
            record: ResumeRecord::placeholder(&message),
            file: file.into(),
            latency_s,
            error: Some(message),
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    /// Serializes the row as one JSON Lines entry (no trailing newline).
    pub fn to_json_line(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Uppercases the first letter of every alphabetic run and lowercases the rest,
/// so `o'neil` becomes `O'Neil` and `jean-luc` becomes `Jean-Luc`.
///
/// Letters whose case mapping is not a single character (`ß`, `İ`) are kept
/// as written, which keeps the function idempotent.
pub fn title_case(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_word = false;
    for c in text.chars() {
        if c.is_alphabetic() {
            let mapped = if in_word {
                single_char(c.to_lowercase())
            } else {
                single_char(c.to_uppercase())
            };
            out.push(mapped.unwrap_or(c));
            in_word = true;
        } else {
            out.push(c);
            in_word = false;
        }
    }
    out
}

fn single_char(mut mapping: impl Iterator<Item = char>) -> Option<char> {
    let first = mapping.next()?;
    mapping.next().is_none().then_some(first)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> ResumeRecord {
        ResumeRecord::new(
            "jane   DOE".to_string(),
            " Jane@Example.COM ".to_string(),
            vec!["Python".to_string(), "SQL".to_string()],
        )
        .unwrap()
    }

    #[test]
    fn test_title_case_basic() {
        assert_eq!(title_case("jane doe"), "Jane Doe");
        assert_eq!(title_case("JANE DOE"), "Jane Doe");
    }

    #[test]
    fn test_title_case_apostrophes_and_hyphens() {
        assert_eq!(title_case("mary-kate o'neil"), "Mary-Kate O'Neil");
    }

    #[test]
    fn test_title_case_unicode() {
        assert_eq!(title_case("élodie ÅSTRÖM"), "Élodie Åström");
    }

    #[test]
    fn test_title_case_keeps_letters_with_multi_char_mappings() {
        assert_eq!(title_case("ßara"), "ßara");
        assert_eq!(title_case("straße"), "Straße");
        assert_eq!(title_case("aİb"), "Aİb");
        for name in ["ßara", "straße", "aİb", "ǆemal", "ﬁona"] {
            let once = title_case(name);
            assert_eq!(title_case(&once), once, "not idempotent for {name:?}");
        }
    }

    #[test]
    fn test_record_with_sharp_s_name_round_trips() {
        let record = ResumeRecord::new("ßara lee".into(), String::new(), vec![]).unwrap();
        assert_eq!(record.name(), "ßara Lee");
        let row = OutputRow::parsed("s.pdf", record, None);
        let back: OutputRow = serde_json::from_str(&row.to_json_line().unwrap()).unwrap();
        assert_eq!(back, row);
    }

    #[test]
    fn test_collapse_whitespace() {
        assert_eq!(collapse_whitespace("  Jane \n\t Doe  "), "Jane Doe");
        assert_eq!(collapse_whitespace("   "), "");
    }

    #[test]
    fn test_new_normalizes_name_and_email() {
        let r = record();
        assert_eq!(r.name(), "Jane Doe");
        assert_eq!(r.email(), "jane@example.com");
        assert_eq!(r.skills(), ["Python", "SQL"]);
    }

    #[test]
    fn test_new_rejects_invalid_email() {
        let err = ResumeRecord::new("A".into(), "not-an-email".into(), vec![]).unwrap_err();
        assert!(matches!(err, AppError::SchemaViolation(_)));
    }

    #[test]
    fn test_new_rejects_case_insensitive_duplicate_skills() {
        let err = ResumeRecord::new(
            "A".into(),
            String::new(),
            vec!["Rust".into(), "rust".into()],
        )
        .unwrap_err();
        assert!(matches!(err, AppError::SchemaViolation(_)));
    }

    #[test]
    fn test_new_rejects_blank_skill() {
        let err = ResumeRecord::new("A".into(), String::new(), vec!["  ".into()]).unwrap_err();
        assert!(matches!(err, AppError::SchemaViolation(_)));
    }

    #[test]
    fn test_output_row_round_trip() {
        let row = OutputRow::parsed("jane.pdf", record(), Some(1.37));
        let line = row.to_json_line().unwrap();
        let back: OutputRow = serde_json::from_str(&line).unwrap();
        assert_eq!(back, row);
    }

    #[test]
    fn test_output_row_shape() {
        let row = OutputRow::parsed("jane.pdf", record(), None);
        let v: serde_json::Value = serde_json::from_str(&row.to_json_line().unwrap()).unwrap();
        assert_eq!(
            v,
            serde_json::json!({
                "name": "Jane Doe",
                "email": "jane@example.com",
                "skills": ["Python", "SQL"],
                "file": "jane.pdf"
            })
        );
    }

    #[test]
    fn test_failed_row_carries_error_in_skills() {
        let err = AppError::UnsupportedFormat(".txt".to_string());
        let row = OutputRow::failed("notes.txt", &err, Some(0.0));
        assert!(row.is_error());
        assert_eq!(row.record.name(), "");
        assert_eq!(row.record.skills(), ["ERROR: Unsupported: .txt"]);
        assert_eq!(row.error.as_deref(), Some("Unsupported: .txt"));

        let back: OutputRow = serde_json::from_str(&row.to_json_line().unwrap()).unwrap();
        assert_eq!(back, row);
    }

    #[test]
    fn test_deserialize_rejects_duplicate_skills() {
        let line = r#"{"name":"A","email":"","skills":["Go","GO"],"file":"a.pdf"}"#;
        assert!(serde_json::from_str::<OutputRow>(line).is_err());
    }

    #[test]
    fn test_non_ascii_written_as_is() {
        let r = ResumeRecord::new("zoë".into(), String::new(), vec!["C++".into()]).unwrap();
        let line = OutputRow::parsed("z.docx", r, None).to_json_line().unwrap();
        assert!(line.contains("Zoë"));
    }
}
