//! Request and response types for the analysis and generation collaborators.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use animus_core::emotion::EmotionalState;
use animus_core::{BehaviorContext, CharacterId, CharacterProfile, Emotion, NeedType};

// ---------------------------------------------------------------------------
// LLM transport
// ---------------------------------------------------------------------------

/// What an LLM call is for; selects the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LlmTask {
    /// Structured message analysis. Small model, JSON output.
    Analysis,
    /// In-character reply. Larger model, free text.
    Response,
}

/// A request to the LLM.
#[derive(Debug, Clone, Serialize)]
pub struct LlmRequest {
    /// System prompt (persona, rules, output contract).
    pub system: String,
    /// User prompt (message and state).
    pub user: String,
    /// Which model to route to.
    pub task: LlmTask,
    /// Maximum tokens to generate.
    pub max_tokens: u32,
    /// Temperature (0.0 = deterministic, 1.0 = creative).
    pub temperature: f32,
    /// Ask the backend to constrain output to JSON.
    pub json_mode: bool,
    /// Request timeout in milliseconds.
    pub timeout_ms: u64,
}

impl LlmRequest {
    /// Low-temperature JSON request for message analysis.
    #[must_use]
    pub fn analysis(system: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            user: user.into(),
            task: LlmTask::Analysis,
            max_tokens: 300,
            temperature: 0.2,
            json_mode: true,
            timeout_ms: 5000,
        }
    }

    /// Free-text request for a character reply.
    #[must_use]
    pub fn response(system: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            user: user.into(),
            task: LlmTask::Response,
            max_tokens: 400,
            temperature: 0.8,
            json_mode: false,
            timeout_ms: 15_000,
        }
    }

    /// Set the timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }
}

/// A response from the LLM.
#[derive(Debug, Clone, Deserialize)]
pub struct LlmResponse {
    /// The generated text.
    pub text: String,
    /// How many tokens were generated.
    pub tokens_generated: u32,
    /// Latency in milliseconds.
    pub latency_ms: u64,
    /// Which model was used.
    pub model: String,
}

// ---------------------------------------------------------------------------
// Message analysis
// ---------------------------------------------------------------------------

/// Overall mood of the user's message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserMood {
    /// Friendly, warm.
    Positive,
    /// Nothing notable.
    #[default]
    Neutral,
    /// Dismissive, cold, sad.
    Negative,
    /// Insulting or aggressive.
    Hostile,
}

impl UserMood {
    /// Whether the mood counts as a negative social signal.
    #[must_use]
    pub fn is_negative(self) -> bool {
        matches!(self, Self::Negative | Self::Hostile)
    }
}

/// Emotional reading of a message.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EmotionalAnalysis {
    /// Mood of the user.
    #[serde(default)]
    pub user_mood: UserMood,
    /// How strongly the message should move the character, 0–1.
    #[serde(default)]
    pub emotional_intensity: f32,
    /// Emotions the message evokes in the character, most relevant first.
    #[serde(default)]
    pub trigger_emotions: Vec<String>,
    /// Free-form note on how the character is expected to feel.
    #[serde(default)]
    pub expected_emotional_response: Option<String>,
}

/// What the analysis provider says about one message.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MessageAnalysis {
    /// Signed deltas to apply to needs.
    #[serde(default)]
    pub needs_impact: BTreeMap<NeedType, f32>,
    /// Emotional reading.
    #[serde(default)]
    pub emotional_analysis: EmotionalAnalysis,
    /// How urgently the character should act, 0–1.
    #[serde(default)]
    pub urgency: f32,
}

impl MessageAnalysis {
    /// The documented default used when analysis fails: no need changes,
    /// neutral mood, zero intensity and urgency.
    #[must_use]
    pub fn neutral() -> Self {
        Self::default()
    }

    /// Clamp ranged fields and drop non-finite need deltas.
    #[must_use]
    pub fn sanitized(mut self) -> Self {
        self.needs_impact.retain(|need, delta| {
            let keep = delta.is_finite();
            if !keep {
                debug!(%need, "dropping non-finite need delta from analysis");
            }
            keep
        });
        self.emotional_analysis.emotional_intensity =
            clamp_unit(self.emotional_analysis.emotional_intensity);
        self.urgency = clamp_unit(self.urgency);
        self
    }

    /// Trigger emotions the engine knows, in order; unknown names are skipped.
    #[must_use]
    pub fn trigger_emotions(&self) -> Vec<Emotion> {
        self.emotional_analysis
            .trigger_emotions
            .iter()
            .filter_map(|name| name.trim().parse().ok())
            .collect()
    }

    /// Need deltas as a list, in need order.
    #[must_use]
    pub fn needs_impact_list(&self) -> Vec<(NeedType, f32)> {
        self.needs_impact.iter().map(|(n, d)| (*n, *d)).collect()
    }
}

fn clamp_unit(v: f32) -> f32 {
    if v.is_nan() { 0.0 } else { v.clamp(0.0, 1.0) }
}

/// Input to the analysis provider.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisRequest {
    /// Character receiving the message.
    pub character: CharacterId,
    /// Sender.
    pub user_id: String,
    /// Message text.
    pub message: String,
}

// ---------------------------------------------------------------------------
// Response generation
// ---------------------------------------------------------------------------

/// Input to the response generator.
///
/// `behavior_context` may be partially empty; generators must cope.
#[derive(Debug, Clone, Serialize)]
pub struct ResponseRequest {
    /// Who is answering.
    pub profile: CharacterProfile,
    /// Message being answered.
    pub message: String,
    /// Resultant emotional state.
    pub emotional_state: EmotionalState,
    /// Needs, motivations, frustration and debuffs.
    pub behavior_context: BehaviorContext,
    /// Anything else the caller wants in the prompt.
    pub additional_context: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn neutral_analysis_changes_nothing() {
        let a = MessageAnalysis::neutral();
        assert!(a.needs_impact.is_empty());
        assert_eq!(a.emotional_analysis.user_mood, UserMood::Neutral);
        assert!(a.urgency.abs() < f32::EPSILON);
    }

    #[test]
    fn sanitize_clamps_and_drops_nan() {
        let mut a = MessageAnalysis::neutral();
        a.needs_impact.insert(NeedType::Rest, f32::NAN);
        a.needs_impact.insert(NeedType::Attention, -12.0);
        a.urgency = 3.0;
        a.emotional_analysis.emotional_intensity = f32::NAN;
        let a = a.sanitized();
        assert_eq!(a.needs_impact_list(), vec![(NeedType::Attention, -12.0)]);
        assert!((a.urgency - 1.0).abs() < f32::EPSILON);
        assert!(a.emotional_analysis.emotional_intensity.abs() < f32::EPSILON);
    }

    #[test]
    fn partial_json_deserializes_with_defaults() {
        let a: MessageAnalysis = serde_json::from_str(
            r#"{"needs_impact": {"communication": -20.0},
                "emotional_analysis": {"user_mood": "hostile", "trigger_emotions": ["anger", "glee"]}}"#,
        )
        .expect("valid analysis");
        assert!(a.emotional_analysis.user_mood.is_negative());
        assert_eq!(a.trigger_emotions(), vec![Emotion::Anger]);
        assert!(a.urgency.abs() < f32::EPSILON);
    }
}
