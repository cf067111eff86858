//! LLM client: one interface over Ollama and OpenAI-compatible backends.

use std::time::{Duration, Instant};

use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{debug, warn};

use crate::error::LlmError;
use crate::types::{LlmRequest, LlmResponse, LlmTask};

/// Provider backend for LLM inference.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LlmProvider {
    /// Ollama running locally.
    Ollama {
        /// e.g. `http://localhost:11434`.
        base_url: String,
    },
    /// OpenAI-compatible chat completions API.
    OpenAiCompatible {
        /// API root without the `/v1` suffix.
        base_url: String,
        /// Bearer token.
        api_key: String,
    },
    /// No LLM: every call fails and callers fall back.
    #[default]
    None,
}

/// Client settings, loadable from the `[llm]` table of a config file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmSettings {
    /// Backend.
    #[serde(default)]
    pub provider: LlmProvider,
    /// Model used for message analysis.
    #[serde(default = "default_analysis_model")]
    pub analysis_model: String,
    /// Model used for replies.
    #[serde(default = "default_response_model")]
    pub response_model: String,
    /// Retries after the first attempt.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            provider: LlmProvider::None,
            analysis_model: default_analysis_model(),
            response_model: default_response_model(),
            max_retries: default_max_retries(),
        }
    }
}

fn default_analysis_model() -> String { "llama3.2:3b".to_string() }
fn default_response_model() -> String { "llama3.1:8b".to_string() }
fn default_max_retries() -> u32 { 1 }

/// Routes requests to the configured backend with retries.
#[derive(Debug, Clone)]
pub struct LlmClient {
    provider: LlmProvider,
    http: Client,
    analysis_model: String,
    response_model: String,
    max_retries: u32,
}

impl LlmClient {
    /// Create a client from settings.
    #[must_use]
    pub fn new(settings: LlmSettings) -> Self {
        Self {
            provider: settings.provider,
            http: Client::new(),
            analysis_model: settings.analysis_model,
            response_model: settings.response_model,
            max_retries: settings.max_retries,
        }
    }

    /// Client with no backend; every call returns `Unavailable`.
    #[must_use]
    pub fn none() -> Self {
        Self::new(LlmSettings::default())
    }

    /// Whether a backend is configured.
    #[must_use]
    pub fn is_available(&self) -> bool {
        !matches!(self.provider, LlmProvider::None)
    }

    /// Generate a completion.
    ///
    /// # Errors
    /// `Unavailable` without a backend, `RetriesExhausted` when every
    /// attempt failed, `ParseError` when the backend answered garbage.
    pub async fn generate(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError> {
        let model = match request.task {
            LlmTask::Analysis => &self.analysis_model,
            LlmTask::Response => &self.response_model,
        };
        match &self.provider {
            LlmProvider::None => Err(LlmError::Unavailable("No LLM provider configured".into())),
            LlmProvider::Ollama { base_url } => {
                let url = format!("{base_url}/api/generate");
                let mut body = json!({
                    "model": model,
                    "system": request.system,
                    "prompt": request.user,
                    "stream": false,
                    "options": {
                        "temperature": request.temperature,
                        "num_predict": request.max_tokens,
                    }
                });
                if request.json_mode {
                    body["format"] = json!("json");
                }
                self.post_with_retries(&url, None, &body, request, model, |v| {
                    let text = v["response"].as_str().unwrap_or_default().to_string();
                    let tokens = v["eval_count"].as_u64().unwrap_or(0);
                    (text, tokens)
                })
                .await
            }
            LlmProvider::OpenAiCompatible { base_url, api_key } => {
                let url = format!("{base_url}/v1/chat/completions");
                let mut body = json!({
                    "model": model,
                    "messages": [
                        { "role": "system", "content": request.system },
                        { "role": "user", "content": request.user },
                    ],
                    "max_tokens": request.max_tokens,
                    "temperature": request.temperature,
                });
                if request.json_mode {
                    body["response_format"] = json!({ "type": "json_object" });
                }
                self.post_with_retries(&url, Some(api_key), &body, request, model, |v| {
                    let text = v["choices"][0]["message"]["content"]
                        .as_str()
                        .unwrap_or_default()
                        .to_string();
                    let tokens = v["usage"]["completion_tokens"].as_u64().unwrap_or(0);
                    (text, tokens)
                })
                .await
            }
        }
    }

    async fn post_with_retries(
        &self,
        url: &str,
        bearer: Option<&str>,
        body: &Value,
        request: &LlmRequest,
        model: &str,
        extract: impl Fn(&Value) -> (String, u64),
    ) -> Result<LlmResponse, LlmError> {
        let mut last_error = String::new();
        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                debug!(attempt = attempt + 1, max = self.max_retries + 1, "retrying LLM call");
            }

            let start = Instant::now();
            let mut builder = self
                .http
                .post(url)
                .json(body)
                .timeout(Duration::from_millis(request.timeout_ms));
            if let Some(key) = bearer {
                builder = builder.bearer_auth(key);
            }
            let result = builder.send().await;
            let latency_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);

            match result {
                Ok(resp) if resp.status().is_success() => {
                    let json: Value = resp
                        .json()
                        .await
                        .map_err(|e| LlmError::ParseError(e.to_string()))?;
                    let (text, tokens) = extract(&json);
                    return Ok(LlmResponse {
                        text,
                        tokens_generated: u32::try_from(tokens).unwrap_or(u32::MAX),
                        latency_ms,
                        model: model.to_string(),
                    });
                }
                Ok(resp) => {
                    let status = resp.status();
                    last_error = format!("HTTP {status}: {}", resp.text().await.unwrap_or_default());
                    warn!(%url, %status, "LLM backend returned an error");
                }
                Err(e) => {
                    if e.is_timeout() {
                        warn!(%url, timeout_ms = request.timeout_ms, "LLM request timed out");
                    } else {
                        warn!(%url, error = %e, "LLM request failed");
                    }
                    last_error = e.to_string();
                }
            }
        }

        Err(LlmError::RetriesExhausted {
            attempts: self.max_retries + 1,
            last_error,
        })
    }

    /// Parse a response body as structured JSON.
    ///
    /// Tolerates prose or code fences around the object by parsing the
    /// outermost `{ ... }` span.
    ///
    /// # Errors
    /// `ParseError` if no JSON object of the expected shape is present.
    pub fn parse_structured<T: serde::de::DeserializeOwned>(
        response: &LlmResponse,
    ) -> Result<T, LlmError> {
        let text = response.text.trim();
        let span = match (text.find('{'), text.rfind('}')) {
            (Some(start), Some(end)) if end > start => &text[start..=end],
            _ => text,
        };
        serde_json::from_str(span).map_err(|e| {
            LlmError::ParseError(format!("JSON parse error: {e}; raw text: '{}'", response.text))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::MessageAnalysis;

    fn response(text: &str) -> LlmResponse {
        LlmResponse {
            text: text.to_string(),
            tokens_generated: 0,
            latency_ms: 0,
            model: "test".to_string(),
        }
    }

    #[tokio::test]
    async fn no_provider_is_unavailable() {
        let client = LlmClient::none();
        assert!(!client.is_available());
        let err = client
            .generate(&LlmRequest::analysis("s", "u"))
            .await
            .unwrap_err();
        assert!(matches!(err, LlmError::Unavailable(_)));
    }

    #[test]
    fn parses_json_wrapped_in_prose() {
        let r = response("Sure! ```json\n{\"urgency\": 0.4}\n```");
        let a: MessageAnalysis = LlmClient::parse_structured(&r).expect("embedded object");
        assert!((a.urgency - 0.4).abs() < f32::EPSILON);
    }

    #[test]
    fn garbage_is_parse_error() {
        let r = response("I cannot answer that.");
        let err = LlmClient::parse_structured::<MessageAnalysis>(&r).unwrap_err();
        assert!(matches!(err, LlmError::ParseError(_)));
    }

    #[test]
    fn settings_deserialize_from_tagged_provider() {
        let settings: LlmSettings = serde_json::from_str(
            r#"{"provider": {"kind": "ollama", "base_url": "http://localhost:11434"}}"#,
        )
        .expect("valid settings");
        assert!(matches!(settings.provider, LlmProvider::Ollama { .. }));
        assert_eq!(settings.max_retries, 1);
    }
}
