//! Record Normalizer: turns repaired model fields into a `ResumeRecord`.

use std::collections::HashSet;

use serde_json::Value;

use crate::errors::AppError;
use crate::models::resume::{ResumeRecord, EMAIL_SEARCH};
use crate::parsing::repair::RepairedFields;

pub fn normalize(fields: RepairedFields) -> Result<ResumeRecord, AppError> {
    let name = string_field("name", &fields.name)?;
    let email = string_field("email", &fields.email)?;
    let skills = skill_list(&fields.skills)?;

    let email = find_email(&email)
        .or_else(|| find_email(&name))
        .unwrap_or_default();

    ResumeRecord::new(name, email, dedup_skills(&skills))
}

/// First email-looking substring of `text`, lowercased.
pub fn find_email(text: &str) -> Option<String> {
    EMAIL_SEARCH.find(text).map(|m| m.as_str().to_lowercase())
}

/// Trims each skill, drops blanks and keeps only the first occurrence of each
/// skill compared case-insensitively. Order and first-seen casing survive.
pub fn dedup_skills<S: AsRef<str>>(skills: &[S]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for skill in skills {
        let skill = skill.as_ref().trim();
        if skill.is_empty() {
            continue;
        }
        if seen.insert(skill.to_lowercase()) {
            out.push(skill.to_string());
        }
    }
    out
}

fn string_field(field: &str, value: &Value) -> Result<String, AppError> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Null => Ok(String::new()),
        other => Err(AppError::SchemaViolation(format!(
            "'{field}' must be a string, got {}",
            type_name(other)
        ))),
    }
}

fn skill_list(value: &Value) -> Result<Vec<String>, AppError> {
    let items = match value {
        Value::Array(items) => items,
        Value::Null => return Ok(Vec::new()),
        other => {
            return Err(AppError::SchemaViolation(format!(
                "'skills' must be a list of strings, got {}",
                type_name(other)
            )))
        }
    };

    let mut skills = Vec::with_capacity(items.len());
    for item in items {
        match item {
            Value::String(s) => skills.push(s.clone()),
            Value::Null => {}
            other => {
                return Err(AppError::SchemaViolation(format!(
                    "'skills' entries must be strings, got {}",
                    type_name(other)
                )))
            }
        }
    }
    Ok(skills)
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "object",
    }
}
