//! Per-message coordination.
//!
//! ```text
//! RECEIVED → ANALYZED → UPDATING → RESPONDING → DONE
//! ```
//!
//! After analysis four branches run concurrently, each with its own failure
//! boundary: needs, emotion, behaviour (social signal + frustration) and
//! action trigger. A failed branch is logged and counted; the others still
//! apply and nothing is rolled back. Only after every branch settles is the
//! behaviour context read and handed to the response generator. The caller
//! always gets text back: a failed analysis becomes the neutral analysis, a
//! failed reply becomes the configured fallback.

use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use tracing::{debug, info, warn};

use animus_core::config::CoordinatorConfig;
use animus_core::emotion::EmotionalImpact;
use animus_core::metrics::AnimusCounters;
use animus_core::{CharacterId, Result};
use animus_llm::{AnalysisProvider, AnalysisRequest, MessageAnalysis, ResponseGenerator, ResponseRequest};

use crate::actor::CharacterHandle;
use crate::registry::CharacterRegistry;

/// Share of the message intensity given to trigger emotions after the first.
const SECONDARY_TRIGGER_SCALE: f32 = 0.5;

/// Processing stage of one message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Message accepted.
    Received,
    /// Analysis (or its neutral substitute) available.
    Analyzed,
    /// Branches running.
    Updating,
    /// Reply being generated.
    Responding,
    /// Reply returned.
    Done,
}

/// Independent update branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Branch {
    /// Need deltas.
    Needs,
    /// Emotional impacts.
    Emotion,
    /// Social signal and frustration analysis.
    Behavior,
    /// Motivation evaluation on urgent messages.
    Action,
}

/// A branch that failed, with its error text.
#[derive(Debug, Clone, Serialize)]
pub struct BranchFailure {
    /// Failed branch.
    pub branch: Branch,
    /// What went wrong.
    pub error: String,
}

/// Everything that happened to one message.
#[derive(Debug, Clone, Serialize)]
pub struct MessageOutcome {
    /// Reply text; never empty.
    pub response: String,
    /// Analysis that was applied.
    pub analysis: MessageAnalysis,
    /// Stages passed, in order.
    pub stages: Vec<Stage>,
    /// Whether analysis failed and the neutral default was used.
    pub analysis_fallback: bool,
    /// Branches that failed.
    pub branch_failures: Vec<BranchFailure>,
    /// Whether the reply is the fixed fallback.
    pub response_fallback: bool,
}

/// Runs messages through analysis, state updates and reply generation.
pub struct MessageCoordinator {
    registry: Arc<CharacterRegistry>,
    analysis: Arc<dyn AnalysisProvider>,
    responder: Arc<dyn ResponseGenerator>,
    config: CoordinatorConfig,
    impact_fade_rate: f32,
}

impl std::fmt::Debug for MessageCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageCoordinator")
            .field("characters", &self.registry.len())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl MessageCoordinator {
    /// Coordinator over `registry` using the given collaborators.
    #[must_use]
    pub fn new(
        registry: Arc<CharacterRegistry>,
        analysis: Arc<dyn AnalysisProvider>,
        responder: Arc<dyn ResponseGenerator>,
    ) -> Self {
        let config = registry.config().coordinator.clone();
        let impact_fade_rate = registry.config().message_impact_fade_rate();
        Self {
            registry,
            analysis,
            responder,
            config,
            impact_fade_rate,
        }
    }

    fn counters(&self) -> &AnimusCounters {
        self.registry.counters()
    }

    /// Process one user message for `character`. Never fails; an unknown
    /// character gets the fallback reply.
    pub async fn process_message(
        &self,
        character: CharacterId,
        user_id: &str,
        message: &str,
    ) -> MessageOutcome {
        let start = Instant::now();
        AnimusCounters::bump(&self.counters().messages_processed);
        let mut stages = vec![Stage::Received];

        let Some(handle) = self.registry.get(character) else {
            stages.push(Stage::Done);
            return self.fallback_outcome(MessageAnalysis::neutral(), stages, true, Vec::new());
        };

        // ANALYZED
        let name = handle
            .read(|s| s.profile().name.clone())
            .await
            .unwrap_or_default();
        let request = AnalysisRequest {
            character,
            user_id: user_id.to_string(),
            message: message.to_string(),
        };
        let (analysis, analysis_fallback) = match self.analysis.analyze(&name, &request).await {
            Ok(a) => (a.sanitized(), false),
            Err(e) => {
                warn!(character = %character, error = %e, "analysis failed, using neutral analysis");
                (MessageAnalysis::neutral(), true)
            }
        };
        stages.push(Stage::Analyzed);

        // UPDATING
        stages.push(Stage::Updating);
        let branch_failures = self.run_branches(&handle, user_id, &analysis).await;

        // RESPONDING
        stages.push(Stage::Responding);
        let (profile, emotional_state, behavior_context) = match handle.response_view().await {
            Ok(view) => view,
            Err(e) => {
                warn!(character = %character, error = %e, "state unavailable for reply");
                stages.push(Stage::Done);
                return self.fallback_outcome(analysis, stages, analysis_fallback, branch_failures);
            }
        };
        let reply_request = ResponseRequest {
            profile,
            message: message.to_string(),
            emotional_state,
            behavior_context,
            additional_context: None,
        };
        let reply = self.responder.generate(&reply_request).await;
        stages.push(Stage::Done);

        match reply {
            Ok(response) => {
                info!(
                    character = %character,
                    branch_failures = branch_failures.len(),
                    elapsed_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX),
                    "message processed"
                );
                MessageOutcome {
                    response,
                    analysis,
                    stages,
                    analysis_fallback,
                    branch_failures,
                    response_fallback: false,
                }
            }
            Err(e) => {
                warn!(character = %character, error = %e, "response generation failed, using fallback");
                self.fallback_outcome(analysis, stages, analysis_fallback, branch_failures)
            }
        }
    }

    fn fallback_outcome(
        &self,
        analysis: MessageAnalysis,
        stages: Vec<Stage>,
        analysis_fallback: bool,
        branch_failures: Vec<BranchFailure>,
    ) -> MessageOutcome {
        AnimusCounters::bump(&self.counters().fallback_responses);
        MessageOutcome {
            response: self.config.fallback_response.clone(),
            analysis,
            stages,
            analysis_fallback,
            branch_failures,
            response_fallback: true,
        }
    }

    /// Run the four update branches concurrently; collect the failures.
    async fn run_branches(
        &self,
        handle: &CharacterHandle,
        user_id: &str,
        analysis: &MessageAnalysis,
    ) -> Vec<BranchFailure> {
        let (needs, emotion, behavior, action) = tokio::join!(
            self.needs_branch(handle, analysis),
            self.emotion_branch(handle, user_id, analysis),
            self.behavior_branch(handle, analysis),
            self.action_branch(handle, analysis),
        );

        let mut failures = Vec::new();
        for (branch, result) in [
            (Branch::Needs, needs),
            (Branch::Emotion, emotion),
            (Branch::Behavior, behavior),
            (Branch::Action, action),
        ] {
            if let Err(e) = result {
                warn!(character = %handle.id(), ?branch, error = %e, "update branch failed");
                AnimusCounters::bump(&self.counters().branch_failures);
                failures.push(BranchFailure {
                    branch,
                    error: e.to_string(),
                });
            }
        }
        failures
    }

    async fn needs_branch(&self, handle: &CharacterHandle, analysis: &MessageAnalysis) -> Result<()> {
        let impact = analysis.needs_impact_list();
        if impact.is_empty() {
            return Ok(());
        }
        handle.apply_needs_impact(impact, "message").await
    }

    async fn emotion_branch(
        &self,
        handle: &CharacterHandle,
        user_id: &str,
        analysis: &MessageAnalysis,
    ) -> Result<()> {
        let intensity = analysis.emotional_analysis.emotional_intensity * 100.0;
        if intensity <= 0.0 {
            return Ok(());
        }
        let source = format!("message:{user_id}");
        for (i, emotion) in analysis.trigger_emotions().into_iter().enumerate() {
            let scaled = if i == 0 {
                intensity
            } else {
                intensity * SECONDARY_TRIGGER_SCALE
            };
            let impact = EmotionalImpact::new(
                emotion,
                scaled,
                self.impact_fade_rate,
                source.clone(),
            );
            handle.apply_impact(impact).await?;
        }
        Ok(())
    }

    async fn behavior_branch(&self, handle: &CharacterHandle, analysis: &MessageAnalysis) -> Result<()> {
        let negative = analysis.emotional_analysis.user_mood.is_negative();
        handle.record_social_signal(negative).await?;
        handle.analyze_frustration().await
    }

    async fn action_branch(&self, handle: &CharacterHandle, analysis: &MessageAnalysis) -> Result<()> {
        if analysis.urgency < self.config.action_urgency_threshold {
            debug!(character = %handle.id(), urgency = analysis.urgency, "message not urgent enough to act");
            return Ok(());
        }
        handle.evaluate_motivations().await
    }
}

