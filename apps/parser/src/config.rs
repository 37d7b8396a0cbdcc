use anyhow::{Context, Result};

pub const DEFAULT_OLLAMA_HOST: &str = "http://127.0.0.1:11434";
pub const DEFAULT_MODEL: &str = "llama3.1:8b";

/// Application configuration loaded from environment variables.
/// Every value has a default; a local Ollama daemon needs no setup.
#[derive(Debug, Clone)]
pub struct Config {
    pub ollama_host: String,
    pub model: String,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            ollama_host: normalize_host(&env_or("OLLAMA_HOST", DEFAULT_OLLAMA_HOST)),
            model: env_or("RESUME_MODEL", DEFAULT_MODEL),
            port: env_or("PORT", "8080")
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: env_or("RUST_LOG", "info"),
        })
    }

    /// Applies CLI overrides on top of the environment.
    pub fn with_overrides(mut self, host: Option<String>, model: Option<String>) -> Self {
        if let Some(host) = host {
            self.ollama_host = normalize_host(&host);
        }
        if let Some(model) = model {
            let model = model.trim();
            if !model.is_empty() {
                self.model = model.to_string();
            }
        }
        self
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn normalize_host(host: &str) -> String {
    host.trim().trim_end_matches('/').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Config {
        Config {
            ollama_host: DEFAULT_OLLAMA_HOST.to_string(),
            model: DEFAULT_MODEL.to_string(),
            port: 8080,
            rust_log: "info".to_string(),
        }
    }

    #[test]
    fn test_normalize_host_strips_trailing_slash() {
        assert_eq!(normalize_host(" http://gpu-box:11434/ "), "http://gpu-box:11434");
    }

    #[test]
    fn test_overrides_replace_host_and_model() {
        let config = base().with_overrides(
            Some("http://10.0.0.5:11434/".to_string()),
            Some(" phi3:mini ".to_string()),
        );
        assert_eq!(config.ollama_host, "http://10.0.0.5:11434");
        assert_eq!(config.model, "phi3:mini");
    }

    #[test]
    fn test_blank_model_override_keeps_default() {
        let config = base().with_overrides(None, Some("   ".to_string()));
        assert_eq!(config.model, DEFAULT_MODEL);
        assert_eq!(config.ollama_host, DEFAULT_OLLAMA_HOST);
    }
}
