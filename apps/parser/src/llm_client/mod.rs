/// LLM Client: the single point of entry for all inference calls.
///
/// ARCHITECTURAL RULE: No other module may call the inference endpoint directly.
/// The pipeline only sees the `ModelGateway` trait; `OllamaClient` is the
/// production implementation talking to a local Ollama daemon.
///
/// One call per document, no retries. A failed call is reported to the caller,
/// which decides whether the rest of a batch continues.
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::parsing::prompts::ModelRequest;

/// Liveness probe budget. Generation calls have no explicit timeout.
const PROBE_TIMEOUT: Duration = Duration::from_secs(3);
const TEMPERATURE: f32 = 0.0;
const NUM_CTX: u32 = 2048;
const NUM_PREDICT: u32 = 256;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("{endpoint} unreachable: {cause}")]
    Unreachable { endpoint: String, cause: String },
}

/// The seam between the pipeline and the inference backend.
#[async_trait]
pub trait ModelGateway: Send + Sync {
    /// Base address of the endpoint, used in diagnostics.
    fn endpoint(&self) -> &str;

    /// Fails fast with `LlmError::Unreachable` if the endpoint does not answer
    /// the liveness probe.
    async fn ensure_reachable(&self) -> Result<(), LlmError>;

    /// Sends one chat request and returns the model's text verbatim.
    async fn send(&self, request: &ModelRequest, model: &str) -> Result<String, LlmError>;
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    format: &'a str,
    stream: bool,
    options: ChatOptions,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatOptions {
    temperature: f32,
    num_ctx: u32,
    num_predict: u32,
}

#[derive(Debug, Deserialize)]
pub struct ChatResponse {
    pub message: ResponseMessage,
    #[serde(default)]
    pub prompt_eval_count: Option<u32>,
    #[serde(default)]
    pub eval_count: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct ResponseMessage {
    #[serde(default)]
    pub content: String,
}

#[derive(Debug, Deserialize)]
struct OllamaError {
    error: String,
}

/// HTTP client for the Ollama REST API (`/api/tags`, `/api/chat`).
#[derive(Clone)]
pub struct OllamaClient {
    client: Client,
    host: String,
}

impl OllamaClient {
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            host: host.into().trim_end_matches('/').to_string(),
        }
    }

    async fn probe(&self) -> Result<(), String> {
        let response = self
            .client
            .get(format!("{}/api/tags", self.host))
            .timeout(PROBE_TIMEOUT)
            .send()
            .await
            .map_err(|e| e.to_string())?;

        let status = response.status();
        if !status.is_success() {
            return Err(format!("probe returned status {status}"));
        }

        response
            .json::<serde_json::Value>()
            .await
            .map(|_| ())
            .map_err(|e| e.to_string())
    }
}

#[async_trait]
impl ModelGateway for OllamaClient {
    fn endpoint(&self) -> &str {
        &self.host
    }

    async fn ensure_reachable(&self) -> Result<(), LlmError> {
        self.probe().await.map_err(|cause| LlmError::Unreachable {
            endpoint: self.host.clone(),
            cause,
        })
    }

    async fn send(&self, request: &ModelRequest, model: &str) -> Result<String, LlmError> {
        let user = request.user_prompt();
        let body = ChatRequest {
            model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: request.system(),
                },
                ChatMessage {
                    role: "user",
                    content: &user,
                },
            ],
            format: "json",
            stream: false,
            options: ChatOptions {
                temperature: TEMPERATURE,
                num_ctx: NUM_CTX,
                num_predict: NUM_PREDICT,
            },
        };

        let response = self
            .client
            .post(format!("{}/api/chat", self.host))
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            // Ollama reports failures as {"error": "..."}
            let message = serde_json::from_str::<OllamaError>(&body)
                .map(|e| e.error)
                .unwrap_or(body);
            return Err(LlmError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let chat: ChatResponse = response.json().await?;

        debug!(
            "Chat call succeeded: model={}, prompt_tokens={:?}, output_tokens={:?}",
            model, chat.prompt_eval_count, chat.eval_count
        );

        Ok(chat.message.content)
    }
}
