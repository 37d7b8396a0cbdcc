// Resume extraction prompt templates and the builder that fills them.
// All prompts for the parsing module are defined here.

/// Hard cap on resume characters sent to the model.
pub const MAX_CHARS: usize = 8000;

pub const RESUME_PARSE_SYSTEM: &str = "\
You extract structured data. \
Return ONLY valid JSON that matches the schema. \
Rules: dedupe skills, use canonical names if obvious, no prose.";

/// Empty schema shown to the model to anchor the output shape.
pub const SCHEMA_EXAMPLE: &str = r#"{
  "name": "",
  "email": "",
  "skills": []
}"#;

/// User prompt template. Replace `{schema}` and `{chunk}` before sending.
pub const RESUME_PARSE_PROMPT_TEMPLATE: &str = "\
Extract name, primary email, and skills. \
Return JSON with keys exactly: name, email, skills.
Schema example:
{schema}

Extract name, primary email, and skills from this resume text.

=== RESUME TEXT START ===
{chunk}
=== RESUME TEXT END ===";

/// Everything the model sees for one document. Built only by `build_prompt`.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelRequest {
    system: &'static str,
    schema_example: &'static str,
    resume_text: String,
}

impl ModelRequest {
    pub fn system(&self) -> &str {
        self.system
    }

    pub fn resume_text(&self) -> &str {
        &self.resume_text
    }

    /// Renders the user message: instructions, schema example, then the
    /// delimited resume excerpt.
    pub fn user_prompt(&self) -> String {
        RESUME_PARSE_PROMPT_TEMPLATE
            .replace("{schema}", self.schema_example)
            .replace("{chunk}", &self.resume_text)
    }
}

/// Trims `text` and keeps at most `max_chars` characters. Cuts mid-word.
pub fn truncate(text: &str, max_chars: usize) -> &str {
    let text = text.trim();
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => &text[..byte_idx],
        None => text,
    }
}

pub fn build_prompt(text: &str) -> ModelRequest {
    ModelRequest {
        system: RESUME_PARSE_SYSTEM,
        schema_example: SCHEMA_EXAMPLE,
        resume_text: truncate(text, MAX_CHARS).to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_trims_whitespace() {
        assert_eq!(truncate("  \n Jane Doe \t\n", MAX_CHARS), "Jane Doe");
    }

    #[test]
    fn test_truncate_short_text_untouched() {
        assert_eq!(truncate("abc", 3), "abc");
    }

    #[test]
    fn test_truncate_hard_cut_mid_word() {
        assert_eq!(truncate("Kubernetes", 4), "Kube");
    }

    #[test]
    fn test_truncate_counts_chars_not_bytes() {
        let text = "é".repeat(MAX_CHARS + 10);
        let cut = truncate(&text, MAX_CHARS);
        assert_eq!(cut.chars().count(), MAX_CHARS);
    }

    #[test]
    fn test_truncate_applies_after_trim() {
        let text = format!("{}{}", " ".repeat(50), "x".repeat(MAX_CHARS));
        assert_eq!(truncate(&text, MAX_CHARS).len(), MAX_CHARS);
    }

    #[test]
    fn test_build_prompt_embeds_text_between_markers() {
        let request = build_prompt("  Jane Doe\nRust, SQL  ");
        let user = request.user_prompt();
        assert!(user.contains("=== RESUME TEXT START ===\nJane Doe\nRust, SQL\n=== RESUME TEXT END ==="));
        assert!(user.contains("\"skills\": []"));
        assert!(user.contains("keys exactly: name, email, skills"));
        assert_eq!(request.system(), RESUME_PARSE_SYSTEM);
    }

    #[test]
    fn test_build_prompt_truncates_long_resume() {
        let request = build_prompt(&"a".repeat(MAX_CHARS * 2));
        assert_eq!(request.resume_text().len(), MAX_CHARS);
    }

    #[test]
    fn test_build_prompt_empty_text_still_well_formed() {
        let request = build_prompt("   ");
        assert_eq!(request.resume_text(), "");
        assert!(request
            .user_prompt()
            .ends_with("=== RESUME TEXT START ===\n\n=== RESUME TEXT END ==="));
    }

    #[test]
    fn test_schema_example_is_valid_json() {
        let v: serde_json::Value = serde_json::from_str(SCHEMA_EXAMPLE).unwrap();
        assert_eq!(v["skills"], serde_json::json!([]));
    }
}
