use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::StatusCode;
use serde_json::{json, Value};
use tracing::debug;

use crate::config::{
    AppConfig, DEFAULT_API_KEY_ENV, DEFAULT_ENDPOINT, DEFAULT_TIMEOUT_SECS,
};
use crate::error::{BackendError, Error, Result};
use crate::textutil::clip;

use super::{GenerationSettings, GenerativeModel, ModelResponse};

const ERROR_SNIPPET_CHARS: usize = 400;

#[derive(Clone)]
pub struct GeminiConfig {
    pub endpoint: String,
    pub api_key: String,
    pub timeout: Duration,
}

impl std::fmt::Debug for GeminiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiConfig")
            .field("endpoint", &self.endpoint)
            .field("api_key", &"<redacted>")
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl GeminiConfig {
    /// Reads the API key from the environment variable named in `[model]`.
    pub fn from_app_config(cfg: &AppConfig) -> Result<Self> {
        let key_env = cfg
            .model
            .api_key_env
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(DEFAULT_API_KEY_ENV);
        let api_key = std::env::var(key_env)
            .ok()
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
            .ok_or_else(|| Error::config(format!("missing API key: set {key_env}")))?;
        let endpoint = cfg
            .model
            .endpoint
            .as_deref()
            .map(|e| e.trim().trim_end_matches('/').to_string())
            .filter(|e| !e.is_empty())
            .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string());
        let timeout = Duration::from_secs(cfg.model.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS).max(1));
        Ok(Self {
            endpoint,
            api_key,
            timeout,
        })
    }
}

/// `generateContent` over HTTPS with a forced JSON response schema.
pub struct GeminiClient {
    client: Client,
    cfg: GeminiConfig,
}

impl GeminiClient {
    pub fn new(cfg: GeminiConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(cfg.timeout)
            .build()
            .map_err(|e| Error::config(format!("build http client: {e}")))?;
        Ok(Self { client, cfg })
    }

    fn url(&self, model: &str) -> String {
        format!("{}/{}:generateContent", self.cfg.endpoint, model)
    }
}

impl GenerativeModel for GeminiClient {
    fn name(&self) -> &str {
        "gemini"
    }

    fn generate(
        &mut self,
        segments: &[String],
        settings: &GenerationSettings,
    ) -> std::result::Result<ModelResponse, BackendError> {
        let body = request_body(segments, settings);
        let resp = self
            .client
            .post(self.url(&settings.model))
            .header("x-goog-api-key", &self.cfg.api_key)
            .json(&body)
            .send()
            .map_err(|e| BackendError::Transport(e.to_string()))?;

        let status = resp.status();
        // Read as text first so error bodies survive a failed JSON parse.
        let text = resp
            .text()
            .map_err(|e| BackendError::Transport(e.to_string()))?;
        debug!(status = status.as_u16(), bytes = text.len(), "gemini response");

        if !status.is_success() {
            return Err(BackendError::Http {
                status: status.as_u16(),
                message: extract_error_message(status, &text),
            });
        }
        parse_generate_response(&text)
    }
}

pub fn response_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "chapter_title": { "type": "STRING", "nullable": true },
            "translated_text": { "type": "STRING" }
        },
        "required": ["chapter_title", "translated_text"],
        "propertyOrdering": ["chapter_title", "translated_text"]
    })
}

pub fn request_body(segments: &[String], settings: &GenerationSettings) -> Value {
    let parts: Vec<Value> = segments.iter().map(|s| json!({ "text": s })).collect();
    json!({
        "contents": [{ "role": "user", "parts": parts }],
        "generationConfig": {
            "temperature": settings.temperature,
            "responseMimeType": "application/json",
            "responseSchema": response_schema(),
            "thinkingConfig": { "thinkingBudget": settings.thinking_budget }
        }
    })
}

/// Pull the structured payload out of a `generateContent` reply. Thought
/// parts are skipped; a blocked or empty candidate is a contract violation.
pub fn parse_generate_response(text: &str) -> std::result::Result<ModelResponse, BackendError> {
    let v: Value = serde_json::from_str(text)
        .map_err(|e| BackendError::Contract(format!("invalid JSON from backend: {e}")))?;

    if let Some(reason) = v
        .get("promptFeedback")
        .and_then(|p| p.get("blockReason"))
        .and_then(|r| r.as_str())
    {
        return Err(BackendError::Contract(format!("prompt blocked: {reason}")));
    }

    let candidate = v
        .get("candidates")
        .and_then(|c| c.get(0))
        .ok_or_else(|| BackendError::Contract("response has no candidates".to_string()))?;

    let payload: String = candidate
        .get("content")
        .and_then(|c| c.get("parts"))
        .and_then(|p| p.as_array())
        .map(|parts| {
            parts
                .iter()
                .filter(|p| !p.get("thought").and_then(|t| t.as_bool()).unwrap_or(false))
                .filter_map(|p| p.get("text").and_then(|t| t.as_str()))
                .collect()
        })
        .unwrap_or_default();

    if payload.trim().is_empty() {
        let finish = candidate
            .get("finishReason")
            .and_then(|r| r.as_str())
            .unwrap_or("UNKNOWN");
        return Err(BackendError::Contract(format!(
            "candidate has no text (finishReason={finish})"
        )));
    }

    ModelResponse::from_json(&payload)
}

fn extract_error_message(status: StatusCode, body_text: &str) -> String {
    if let Ok(v) = serde_json::from_str::<Value>(body_text) {
        if let Some(msg) = v
            .get("error")
            .and_then(|e| e.get("message"))
            .and_then(|m| m.as_str())
        {
            return msg.to_string();
        }
        if let Some(msg) = v.get("message").and_then(|m| m.as_str()) {
            return msg.to_string();
        }
    }
    let trimmed = body_text.trim();
    if trimmed.is_empty() {
        status
            .canonical_reason()
            .unwrap_or("empty response body")
            .to_string()
    } else {
        clip(trimmed, ERROR_SNIPPET_CHARS)
    }
}
