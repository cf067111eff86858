//! Collaborator contracts consumed by the message coordinator.
//!
//! [`AnalysisProvider`] turns a message into a [`MessageAnalysis`];
//! [`ResponseGenerator`] turns state into reply text. Both may fail; the
//! coordinator substitutes a neutral analysis or a fallback reply.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::client::LlmClient;
use crate::error::LlmError;
use crate::prompt;
use crate::types::{AnalysisRequest, LlmRequest, MessageAnalysis, ResponseRequest};

/// Reads a message for its effect on the character.
#[async_trait]
pub trait AnalysisProvider: Send + Sync {
    /// Analyse one message.
    ///
    /// # Errors
    /// Any backend failure; callers fall back to [`MessageAnalysis::neutral`].
    async fn analyze(
        &self,
        character_name: &str,
        request: &AnalysisRequest,
    ) -> Result<MessageAnalysis, LlmError>;
}

/// Writes the character's reply.
#[async_trait]
pub trait ResponseGenerator: Send + Sync {
    /// Generate reply text.
    ///
    /// # Errors
    /// Any backend failure; callers fall back to a fixed text.
    async fn generate(&self, request: &ResponseRequest) -> Result<String, LlmError>;
}

// ---------------------------------------------------------------------------
// LLM-backed implementations
// ---------------------------------------------------------------------------

/// Analysis through a JSON-mode LLM call.
#[derive(Debug, Clone)]
pub struct LlmAnalysisProvider {
    client: Arc<LlmClient>,
}

impl LlmAnalysisProvider {
    /// Wrap a client.
    #[must_use]
    pub fn new(client: Arc<LlmClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl AnalysisProvider for LlmAnalysisProvider {
    async fn analyze(
        &self,
        character_name: &str,
        request: &AnalysisRequest,
    ) -> Result<MessageAnalysis, LlmError> {
        let (system, user) = prompt::analysis_prompt(character_name, request);
        let response = self.client.generate(&LlmRequest::analysis(system, user)).await?;
        debug!(
            character = %request.character,
            latency_ms = response.latency_ms,
            model = %response.model,
            "message analysed"
        );
        let analysis: MessageAnalysis = LlmClient::parse_structured(&response)?;
        Ok(analysis.sanitized())
    }
}

/// Replies through a free-text LLM call.
#[derive(Debug, Clone)]
pub struct LlmResponseGenerator {
    client: Arc<LlmClient>,
}

impl LlmResponseGenerator {
    /// Wrap a client.
    #[must_use]
    pub fn new(client: Arc<LlmClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ResponseGenerator for LlmResponseGenerator {
    async fn generate(&self, request: &ResponseRequest) -> Result<String, LlmError> {
        let (system, user) = prompt::response_prompt(request);
        let response = self.client.generate(&LlmRequest::response(system, user)).await?;
        let text = response.text.trim();
        if text.is_empty() {
            return Err(LlmError::ParseError("empty reply".into()));
        }
        Ok(text.to_string())
    }
}

// ---------------------------------------------------------------------------
// Offline implementations
// ---------------------------------------------------------------------------

/// Fixed analysis and reply, for tests and offline runs.
#[derive(Debug, Clone, Default)]
pub struct StaticResponder {
    analysis: MessageAnalysis,
    reply: Option<String>,
}

impl StaticResponder {
    /// Always return `analysis`; replies fail until [`Self::with_reply`].
    #[must_use]
    pub fn new(analysis: MessageAnalysis) -> Self {
        Self {
            analysis,
            reply: None,
        }
    }

    /// Reply with `text`.
    #[must_use]
    pub fn with_reply(mut self, text: impl Into<String>) -> Self {
        self.reply = Some(text.into());
        self
    }
}

#[async_trait]
impl AnalysisProvider for StaticResponder {
    async fn analyze(
        &self,
        _character_name: &str,
        _request: &AnalysisRequest,
    ) -> Result<MessageAnalysis, LlmError> {
        Ok(self.analysis.clone())
    }
}

#[async_trait]
impl ResponseGenerator for StaticResponder {
    async fn generate(&self, _request: &ResponseRequest) -> Result<String, LlmError> {
        self.reply
            .clone()
            .ok_or_else(|| LlmError::Unavailable("no canned reply".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use animus_core::emotion::EmotionalState;
    use animus_core::{BehaviorContext, CharacterId, CharacterProfile};

    fn response_request() -> ResponseRequest {
        ResponseRequest {
            profile: CharacterProfile::new("Mira", "An archivist."),
            message: "hello".into(),
            emotional_state: EmotionalState::neutral(),
            behavior_context: BehaviorContext::default(),
            additional_context: None,
        }
    }

    #[tokio::test]
    async fn llm_providers_fail_without_backend() {
        let client = Arc::new(LlmClient::none());
        let analysis = LlmAnalysisProvider::new(Arc::clone(&client));
        let request = AnalysisRequest {
            character: CharacterId::new(),
            user_id: "u1".into(),
            message: "hi".into(),
        };
        assert!(analysis.analyze("Mira", &request).await.is_err());
        let generator = LlmResponseGenerator::new(client);
        assert!(generator.generate(&response_request()).await.is_err());
    }

    #[tokio::test]
    async fn static_responder_replies_once_configured() {
        let silent = StaticResponder::default();
        assert!(silent.generate(&response_request()).await.is_err());
        let talking = StaticResponder::default().with_reply("Hi there.");
        assert_eq!(
            talking.generate(&response_request()).await.expect("canned"),
            "Hi there."
        );
    }
}
