//! Completion backend boundary.
//!
//! Everything coming back from the backend is untrusted text. The helpers at
//! the bottom of this module turn it into a JSON object or a
//! `BackendUnavailable` error; field-level normalisation happens in the
//! classifier and runbook modules.

use crate::error::{Result, TriageError};
use async_trait::async_trait;
use rig::client::completion::CompletionClient;
use rig::completion::Prompt;
use rig::providers::openai;
use serde::{Deserialize, Serialize};

pub const DEFAULT_BASE_URL: &str = "https://inference.do-ai.run/v1";
pub const DEFAULT_MODEL: &str = "llama3.3-70b-instruct";

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LlmConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: DEFAULT_BASE_URL.into(),
            model: DEFAULT_MODEL.into(),
        }
    }
}

impl LlmConfig {
    pub fn from_env() -> Self {
        Self {
            api_key: std::env::var("GRADIENT_API_KEY").unwrap_or_default(),
            base_url: std::env::var("GRADIENT_BASE_URL")
                .ok()
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_BASE_URL.into()),
            model: std::env::var("GRADIENT_MODEL")
                .ok()
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_MODEL.into()),
        }
    }

    pub fn has_credential(&self) -> bool {
        !self.api_key.trim().is_empty()
    }
}

/// One chat-style completion call.
#[derive(Clone, Debug, PartialEq)]
pub struct CompletionRequest {
    pub system: &'static str,
    pub context: String,
    pub temperature: f64,
    pub max_tokens: u64,
    pub json_output: bool,
}

#[async_trait]
pub trait CompletionBackend: Send + Sync {
    async fn complete(&self, request: CompletionRequest) -> Result<String>;
}

/// OpenAI-compatible chat completions through rig. A single attempt per call.
#[derive(Clone, Debug)]
pub struct RigBackend {
    config: LlmConfig,
}

impl RigBackend {
    pub fn new(config: LlmConfig) -> Self {
        Self { config }
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }

    /// Builds the provider client without sending anything.
    pub fn client(&self) -> Result<openai::Client> {
        let client: openai::Client = openai::Client::builder()
            .api_key(&self.config.api_key)
            .base_url(&self.config.base_url)
            .build()
            .map_err(|e| TriageError::backend(format!("openai client error: {e}")))?;
        Ok(client)
    }
}

#[async_trait]
impl CompletionBackend for RigBackend {
    async fn complete(&self, request: CompletionRequest) -> Result<String> {
        if !self.config.has_credential() {
            return Err(TriageError::Configuration(
                "GRADIENT_API_KEY not configured".into(),
            ));
        }

        let mut builder = self
            .client()?
            .completions_api()
            .agent(&self.config.model)
            .preamble(request.system)
            .temperature(request.temperature)
            .max_tokens(request.max_tokens);
        if request.json_output {
            builder = builder.additional_params(serde_json::json!({
                "response_format": {"type": "json_object"}
            }));
        }
        let agent = builder.build();

        agent.prompt(request.context).await.map_err(|e| {
            tracing::warn!(model = %self.config.model, error = %e, "llm prompt failed");
            TriageError::backend(format!("llm prompt failed: {e}"))
        })
    }
}

/// Parses a backend reply into a JSON object, tolerating a surrounding
/// markdown code fence.
pub(crate) fn parse_object(
    raw: &str,
    what: &str,
) -> Result<serde_json::Map<String, serde_json::Value>> {
    let body = strip_code_fence(raw);
    let value: serde_json::Value = serde_json::from_str(body)
        .map_err(|e| TriageError::backend(format!("invalid {what} json: {e}")))?;
    match value {
        serde_json::Value::Object(map) => Ok(map),
        other => Err(TriageError::backend(format!(
            "{what} json is not an object: {}",
            json_kind(&other)
        ))),
    }
}

/// Non-blank string field, trimmed.
pub(crate) fn text_field(
    obj: &serde_json::Map<String, serde_json::Value>,
    key: &str,
) -> Option<String> {
    obj.get(key)
        .and_then(serde_json::Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
}

fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "bool",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}
