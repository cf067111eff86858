//! Character aggregate: one character's complete psychological state.
//!
//! [`CharacterState`] owns the need store, emotion engine, frustration
//! engine, motivation planner and action gate of a single character and
//! runs the event cascade between them synchronously:
//!
//! ```text
//! need.threshold_reached → motivation → action → need.reset | frustration
//!     → influence (one hop) → frustration analysis → behaviour patterns
//!     → message.initiative_requested
//! ```
//!
//! Nothing here knows about threads or timers. Mutations return [`Effects`]:
//! the events produced in causal order plus the [`Timer`]s the owner must
//! schedule (fade ticks, pattern expiry, action completion). The owner posts
//! timer firings back through [`CharacterState::fade_impact`],
//! [`CharacterState::expire_patterns`] and [`CharacterState::complete_action`].

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::AnimusConfig;
use crate::emotion::{EmotionEngine, EmotionalImpact, EmotionalState};
use crate::error::{AnimusError, Result};
use crate::events::DomainEvent;
use crate::frustration::{
    BehaviorModifiers, EmotionalModifiers, FrustrationEngine, FrustrationLevel,
    FrustrationOutcome, FrustrationRecord, PatternExpiry, TemporaryDebuffs,
};
use crate::motivation::{
    ActionGate, ActionType, CharacterAction, ExecutionOutcome, Motivation, MotivationPlanner,
};
use crate::needs::{Need, NeedState, NeedStore};
use crate::types::{ActionId, CharacterId, CharacterProfile, Emotion, ImpactId, NeedType};

/// Needs listed in a behaviour context.
const CONTEXT_TOP_NEEDS: usize = 3;

// ---------------------------------------------------------------------------
// Effects
// ---------------------------------------------------------------------------

/// A timer the owner of a [`CharacterState`] must start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Timer {
    /// Fade `impact` on every tick until it reports finished.
    Fade {
        /// Impact to fade.
        impact: ImpactId,
    },
    /// Clear behaviour patterns after `expiry.after`.
    ExpirePatterns(PatternExpiry),
    /// Complete `action` after `after`.
    CompleteAction {
        /// In-flight action.
        action: ActionId,
        /// Delay until completion.
        after: Duration,
    },
}

/// What a mutation produced.
#[derive(Debug, Default)]
pub struct Effects {
    /// Events in causal order.
    pub events: Vec<DomainEvent>,
    /// Timers to start.
    pub timers: Vec<Timer>,
}

impl Effects {
    fn merge(&mut self, other: Self) {
        self.events.extend(other.events);
        self.timers.extend(other.timers);
    }

    /// Whether an event with this dotted name was produced.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.events.iter().any(|e| e.name() == name)
    }
}

// ---------------------------------------------------------------------------
// Snapshots and context
// ---------------------------------------------------------------------------

/// Persistable image of a character.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CharacterSnapshot {
    /// Identity and persona.
    pub profile: CharacterProfile,
    /// Every need, including deactivated ones.
    pub needs: Vec<Need>,
    /// Resultant emotional state; restored as the baseline.
    pub emotional_state: EmotionalState,
    /// Frustration record with active patterns.
    pub frustration: FrustrationRecord,
    /// Most recent finished actions.
    pub recent_actions: Vec<CharacterAction>,
    /// When the snapshot was taken.
    pub saved_at: DateTime<Utc>,
}

/// Short view of a need for response generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NeedSummary {
    /// Need category.
    pub need: NeedType,
    /// Current value.
    pub value: f32,
    /// Threshold.
    pub threshold: f32,
    /// Dynamic priority.
    pub dynamic_priority: f32,
    /// Lifecycle state.
    pub state: NeedState,
}

/// Everything the response generator may use to colour a reply.
///
/// Every field may be empty; consumers must cope with a default context.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BehaviorContext {
    /// Resultant emotional state.
    pub emotional_state: Option<EmotionalState>,
    /// Needs with the highest dynamic priority.
    pub top_needs: Vec<NeedSummary>,
    /// Current motivations, strongest first.
    pub motivations: Vec<Motivation>,
    /// Frustration level.
    pub frustration_level: Option<FrustrationLevel>,
    /// Field-wise strongest behaviour modifiers of active patterns.
    pub behavior_modifiers: Option<BehaviorModifiers>,
    /// Field-wise strongest emotional modifiers of active patterns.
    pub emotional_modifiers: Option<EmotionalModifiers>,
    /// Field-wise strongest debuffs of active patterns.
    pub debuffs: Option<TemporaryDebuffs>,
    /// Action currently in progress.
    pub action_in_progress: Option<ActionType>,
}

// ---------------------------------------------------------------------------
// CharacterState
// ---------------------------------------------------------------------------

/// Complete state of one character.
#[derive(Debug)]
pub struct CharacterState {
    profile: CharacterProfile,
    needs: NeedStore,
    emotion: EmotionEngine,
    frustration: FrustrationEngine,
    planner: MotivationPlanner,
    gate: ActionGate,
    rng: StdRng,
    config: Arc<AnimusConfig>,
    last_growth: DateTime<Utc>,
}

impl CharacterState {
    /// Provision a character with the default need set.
    ///
    /// `seed` fixes the success draws; `None` seeds from the OS.
    #[must_use]
    pub fn new(
        profile: CharacterProfile,
        config: Arc<AnimusConfig>,
        now: DateTime<Utc>,
        seed: Option<u64>,
    ) -> Self {
        let id = profile.id;
        Self {
            needs: NeedStore::with_defaults(id, &config.needs, now),
            emotion: EmotionEngine::new(id, &config.emotion),
            frustration: FrustrationEngine::new(id, &config.frustration),
            planner: MotivationPlanner::new(),
            gate: ActionGate::new(id, config.actions.history_len),
            rng: make_rng(seed),
            profile,
            config,
            last_growth: now,
        }
    }

    /// Rebuild a character from a snapshot.
    #[must_use]
    pub fn from_snapshot(
        snapshot: CharacterSnapshot,
        config: Arc<AnimusConfig>,
        now: DateTime<Utc>,
        seed: Option<u64>,
    ) -> Self {
        let id = snapshot.profile.id;
        Self {
            needs: NeedStore::from_needs(id, snapshot.needs, &config.needs),
            emotion: EmotionEngine::restore(id, &config.emotion, snapshot.emotional_state),
            frustration: FrustrationEngine::restore(id, &config.frustration, snapshot.frustration),
            planner: MotivationPlanner::new(),
            gate: ActionGate::restore(id, config.actions.history_len, snapshot.recent_actions),
            rng: make_rng(seed),
            profile: snapshot.profile,
            config,
            last_growth: now,
        }
    }

    /// Timers a freshly restored character needs.
    #[must_use]
    pub fn pending_timers(&self) -> Vec<Timer> {
        self.frustration
            .pending_expiry()
            .map(Timer::ExpirePatterns)
            .into_iter()
            .collect()
    }

    /// Character ID.
    #[must_use]
    pub fn id(&self) -> CharacterId {
        self.profile.id
    }

    /// Profile.
    #[must_use]
    pub fn profile(&self) -> &CharacterProfile {
        &self.profile
    }

    /// Needs.
    #[must_use]
    pub fn needs(&self) -> &NeedStore {
        &self.needs
    }

    /// Emotion engine.
    #[must_use]
    pub fn emotion(&self) -> &EmotionEngine {
        &self.emotion
    }

    /// Frustration engine.
    #[must_use]
    pub fn frustration(&self) -> &FrustrationEngine {
        &self.frustration
    }

    /// Action gate.
    #[must_use]
    pub fn gate(&self) -> &ActionGate {
        &self.gate
    }

    /// Shared configuration.
    #[must_use]
    pub fn config(&self) -> &AnimusConfig {
        &self.config
    }

    // ------------------------------------------------------------------
    // Needs
    // ------------------------------------------------------------------

    /// Grow needs by `hours`.
    pub fn grow(&mut self, hours: f32, now: DateTime<Utc>) -> Effects {
        self.last_growth = now;
        let events = self.needs.grow(hours, now);
        self.cascade(events, now)
    }

    /// Grow needs for the time elapsed since the previous growth pass.
    pub fn tick_needs(&mut self, now: DateTime<Utc>) -> Effects {
        #[allow(clippy::cast_precision_loss)]
        let hours = (now - self.last_growth).num_milliseconds().max(0) as f32 / 3_600_000.0;
        self.grow(hours, now)
    }

    /// Direct additive need update.
    ///
    /// # Errors
    /// Returns `InvalidInput` for a NaN delta.
    pub fn update_need(
        &mut self,
        need: NeedType,
        delta: f32,
        reason: &str,
        now: DateTime<Utc>,
    ) -> Result<Effects> {
        let events = self.needs.update_value(need, delta, reason, now)?;
        Ok(self.cascade(events, now))
    }

    /// Apply a batch of need deltas, validating all of them first.
    ///
    /// # Errors
    /// Returns `InvalidInput` if any delta is NaN or targets a deactivated
    /// need; nothing is applied then.
    pub fn apply_needs_impact(
        &mut self,
        impact: &[(NeedType, f32)],
        reason: &str,
        now: DateTime<Utc>,
    ) -> Result<Effects> {
        if let Some((need, _)) = impact.iter().find(|(_, d)| d.is_nan()) {
            return Err(AnimusError::InvalidInput(format!(
                "NaN impact for need {need}"
            )));
        }
        if let Some((need, _)) = impact
            .iter()
            .find(|(n, _)| self.needs.get(*n).is_some_and(|need| !need.active))
        {
            return Err(AnimusError::InvalidInput(format!(
                "impact on deactivated need {need}"
            )));
        }
        let mut events = Vec::new();
        for &(need, delta) in impact {
            events.extend(self.needs.update_value(need, delta, reason, now)?);
        }
        Ok(self.cascade(events, now))
    }

    /// Satisfy a need.
    pub fn reset_need(&mut self, need: NeedType, now: DateTime<Utc>) -> Effects {
        let events = self.needs.reset(need, now);
        self.cascade(events, now)
    }

    /// Suspend a need's growth.
    ///
    /// # Errors
    /// Returns `InvalidInput` for a non-positive or non-finite duration.
    pub fn block_need(
        &mut self,
        need: NeedType,
        hours: f32,
        reason: &str,
        now: DateTime<Utc>,
    ) -> Result<Effects> {
        let events = self.needs.block(need, hours, reason, now)?;
        Ok(self.cascade(events, now))
    }

    /// Resume a need's growth.
    pub fn unblock_need(&mut self, need: NeedType, now: DateTime<Utc>) -> Effects {
        let events = self.needs.unblock(need, now);
        self.cascade(events, now)
    }

    /// Remove a need from every sweep.
    pub fn deactivate_need(&mut self, need: NeedType, now: DateTime<Utc>) -> Effects {
        let events = self.needs.deactivate(need);
        self.cascade(events, now)
    }

    // ------------------------------------------------------------------
    // Emotion
    // ------------------------------------------------------------------

    /// Add an emotional impact; asks for its fade timer.
    ///
    /// # Errors
    /// Returns `InvalidInput` for a malformed impact.
    pub fn apply_impact(&mut self, impact: EmotionalImpact, now: DateTime<Utc>) -> Result<Effects> {
        let (id, events) = self.emotion.apply_impact(impact)?;
        let mut effects = self.cascade(events, now);
        effects.timers.push(Timer::Fade { impact: id });
        effects.merge(self.observe_emotion(now));
        Ok(effects)
    }

    /// Fade one impact. The flag is true once the impact is gone.
    pub fn fade_impact(&mut self, id: ImpactId, minutes: f32, now: DateTime<Utc>) -> (Effects, bool) {
        let outcome = self.emotion.fade_impact(id, minutes);
        let mut effects = self.cascade(outcome.events, now);
        effects.merge(self.observe_emotion(now));
        (effects, outcome.finished)
    }

    /// Fade every impact at once; for owners without per-impact timers.
    pub fn fade_all(&mut self, minutes: f32, now: DateTime<Utc>) -> Effects {
        let (events, _) = self.emotion.fade_all(minutes);
        let mut effects = self.cascade(events, now);
        effects.merge(self.observe_emotion(now));
        effects
    }

    /// Set the emotional baseline from raw magnitudes (0–100).
    pub fn update_from_direct_emotions(
        &mut self,
        emotions: &[(Emotion, f32)],
        source: &str,
        description: Option<&str>,
        now: DateTime<Utc>,
    ) -> Effects {
        let events = self.emotion.update_from_direct_emotions(emotions, source, description);
        self.cascade(events, now)
    }

    /// Force the neutral state and drop every impact.
    pub fn normalize_emotion(&mut self, now: DateTime<Utc>) -> Effects {
        let events = self.emotion.normalize();
        self.cascade(events, now)
    }

    fn observe_emotion(&mut self, now: DateTime<Utc>) -> Effects {
        let primary = self.emotion.state().primary;
        let saturated = self.emotion.saturated_intensity();
        let outcome = self.frustration.observe_emotion(primary, saturated, now);
        self.absorb_frustration(outcome, now)
    }

    // ------------------------------------------------------------------
    // Frustration
    // ------------------------------------------------------------------

    /// Note a user reaction; negative ones count toward frustration.
    pub fn record_social_signal(&mut self, negative: bool, now: DateTime<Utc>) {
        if negative {
            self.frustration.record_negative_social(now);
        }
    }

    /// Re-score frustration and refresh behaviour patterns.
    pub fn analyze_frustration(&mut self, now: DateTime<Utc>) -> Effects {
        let outcome = self.frustration.analyze(&self.needs, now);
        self.absorb_frustration(outcome, now)
    }

    /// Expiry timer fired.
    pub fn expire_patterns(&mut self, generation: u64, now: DateTime<Utc>) -> Effects {
        let events = self.frustration.expire_patterns(generation);
        self.cascade(events, now)
    }

    fn absorb_frustration(&mut self, outcome: FrustrationOutcome, now: DateTime<Utc>) -> Effects {
        let mut effects = self.cascade(outcome.events, now);
        if let Some(expiry) = outcome.expiry {
            effects.timers.push(Timer::ExpirePatterns(expiry));
        }
        effects
    }

    // ------------------------------------------------------------------
    // Motivation and actions
    // ------------------------------------------------------------------

    /// Current motivations without acting on them.
    #[must_use]
    pub fn motivations(&self) -> Vec<Motivation> {
        self.planner.evaluate(&self.needs)
    }

    /// Derive motivations, request initiative for pressing social needs and,
    /// when enabled, hand the strongest one to the action gate.
    pub fn evaluate_motivations(&mut self, now: DateTime<Utc>) -> Effects {
        let character = self.id();
        let mut effects = Effects::default();
        let mut motivations = self.planner.evaluate(&self.needs);

        for m in &motivations {
            effects.events.push(DomainEvent::MotivationThresholdReached {
                character,
                need: m.need_type,
                intensity: m.intensity,
            });
            if m.need_type.is_social() && m.intensity >= self.config.actions.initiative_intensity {
                effects.events.push(DomainEvent::InitiativeRequested {
                    character,
                    reason: format!("{} need is pressing", m.need_type),
                    urgency: m.intensity,
                });
            }
        }

        if !self.config.actions.auto_execute || self.gate.in_flight().is_some() {
            return effects;
        }
        let Some(top) = motivations.first_mut() else {
            return effects;
        };
        self.planner.consume(top);
        effects.events.push(DomainEvent::MotivationCreated {
            character,
            motivation: top.clone(),
        });
        let action = CharacterAction::for_motivation(top);
        match self.start_action(action, now) {
            Ok(more) => effects.merge(more),
            Err(e) => {
                debug!(character = %character, need = %top.need_type, error = %e, "motivated action not admitted");
                self.planner.release(top.need_type);
            }
        }
        effects
    }

    /// Whether the resource need can pay for `action`.
    ///
    /// # Errors
    /// Returns `ContractViolation` for a negative cost.
    pub fn can_execute(&self, action: &CharacterAction) -> Result<bool> {
        self.gate.can_execute(&self.needs, action)
    }

    /// Start an action; instant actions settle immediately with a random
    /// draw, others ask for a completion timer.
    ///
    /// # Errors
    /// `ActionInProgress`, `InsufficientResource` or `ContractViolation`.
    pub fn start_action(&mut self, action: CharacterAction, now: DateTime<Utc>) -> Result<Effects> {
        if action.duration.is_zero() {
            let roll = self.roll();
            return self.execute_with_roll(action, roll, now);
        }
        let after = action.duration;
        let id = self.gate.begin(&self.needs, action, now)?;
        let mut effects = Effects::default();
        effects.timers.push(Timer::CompleteAction { action: id, after });
        Ok(effects)
    }

    /// Start and settle an action against an explicit draw in `[0, 1)`.
    ///
    /// # Errors
    /// `ActionInProgress`, `InsufficientResource` or `ContractViolation`.
    pub fn execute_with_roll(
        &mut self,
        action: CharacterAction,
        roll: f32,
        now: DateTime<Utc>,
    ) -> Result<Effects> {
        let outcome =
            self.gate
                .execute_with_roll(&mut self.needs, &self.frustration, action, roll, now)?;
        Ok(self.settle(outcome, now))
    }

    /// Completion timer fired.
    pub fn complete_action(&mut self, id: ActionId, now: DateTime<Utc>) -> Effects {
        let roll = self.roll();
        match self
            .gate
            .complete(id, &mut self.needs, &self.frustration, roll, now)
        {
            Some(outcome) => self.settle(outcome, now),
            None => {
                warn!(character = %self.id(), action = %id, "completion for an action that is not in flight");
                Effects::default()
            }
        }
    }

    /// Abandon the in-flight action, if any.
    pub fn cancel_action(&mut self, now: DateTime<Utc>) -> Option<CharacterAction> {
        let cancelled = self.gate.cancel(now)?;
        if let Some(need) = cancelled.motivating_need {
            self.planner.release(need);
        }
        Some(cancelled)
    }

    fn roll(&mut self) -> f32 {
        self.rng.gen_range(0.0..1.0_f32)
    }

    fn settle(&mut self, outcome: ExecutionOutcome, now: DateTime<Utc>) -> Effects {
        let mut seed = outcome.events;
        if outcome.success {
            if let Some(need) = outcome.action.motivating_need {
                seed.extend(self.needs.reset(need, now));
            }
        } else {
            seed.extend(self.needs.record_failure(outcome.action.target_need(), now));
            self.frustration.record_failure(now);
        }
        let mut effects = self.cascade(seed, now);
        if !outcome.success {
            effects.merge(self.analyze_frustration(now));
        }
        effects
    }

    // ------------------------------------------------------------------
    // Cascade
    // ------------------------------------------------------------------

    /// Process events in order, appending the reactions they trigger.
    ///
    /// Influence events never react, so propagation stays one hop deep.
    fn cascade(&mut self, seed: Vec<DomainEvent>, now: DateTime<Utc>) -> Effects {
        let character = self.id();
        let mut effects = Effects::default();
        let mut queue: VecDeque<DomainEvent> = seed.into();
        let mut evaluate = false;

        while let Some(event) = queue.pop_front() {
            let follow = match &event {
                DomainEvent::NeedThresholdReached { .. } => {
                    evaluate = true;
                    Vec::new()
                }
                DomainEvent::NeedReset { need, .. } => {
                    self.planner.release(*need);
                    self.needs.propagate_influence(*need, now)
                }
                DomainEvent::NeedBlocked { need, .. }
                | DomainEvent::FrustrationIncreased { need, .. } => {
                    self.needs.propagate_influence(*need, now)
                }
                DomainEvent::FrustrationLevelChanged { old, new, .. }
                    if *new >= FrustrationLevel::Severe && *old < FrustrationLevel::Severe =>
                {
                    vec![DomainEvent::InitiativeRequested {
                        character,
                        reason: format!("frustration is {new:?}").to_lowercase(),
                        urgency: new.intensity(),
                    }]
                }
                _ => Vec::new(),
            };
            effects.events.push(event);
            queue.extend(follow);
        }

        if evaluate {
            let more = self.evaluate_motivations(now);
            effects.merge(more);
        }
        effects
    }

    // ------------------------------------------------------------------
    // Views
    // ------------------------------------------------------------------

    /// Summary handed to response generation.
    #[must_use]
    pub fn behavior_context(&self) -> BehaviorContext {
        let record = self.frustration.record();
        let patterns = &record.active_patterns;
        BehaviorContext {
            emotional_state: Some(self.emotion.state().clone()),
            top_needs: self
                .needs
                .top_by_dynamic_priority(CONTEXT_TOP_NEEDS)
                .into_iter()
                .map(|n| NeedSummary {
                    need: n.need_type,
                    value: n.current_value,
                    threshold: n.threshold,
                    dynamic_priority: n.dynamic_priority,
                    state: n.state,
                })
                .collect(),
            motivations: self.planner.evaluate(&self.needs),
            frustration_level: Some(record.level),
            behavior_modifiers: patterns
                .iter()
                .map(|p| p.behavior_modifiers)
                .reduce(BehaviorModifiers::max),
            emotional_modifiers: patterns
                .iter()
                .map(|p| p.emotional_modifiers)
                .reduce(EmotionalModifiers::max),
            debuffs: record.strongest_debuffs(),
            action_in_progress: self.gate.in_flight().map(|a| a.action_type),
        }
    }

    /// Persistable image.
    #[must_use]
    pub fn snapshot(&self, now: DateTime<Utc>) -> CharacterSnapshot {
        CharacterSnapshot {
            profile: self.profile.clone(),
            needs: self.needs.iter().cloned().collect(),
            emotional_state: self.emotion.state().clone(),
            frustration: self.frustration.record().clone(),
            recent_actions: self.gate.history().cloned().collect(),
            saved_at: now,
        }
    }
}

fn make_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(s) => StdRng::seed_from_u64(s),
        None => StdRng::from_entropy(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn character() -> (CharacterState, DateTime<Utc>) {
        let now = Utc::now();
        let state = CharacterState::new(
            CharacterProfile::new("Mira", "a curious archivist"),
            Arc::new(AnimusConfig::default()),
            now,
            Some(7),
        );
        (state, now)
    }

    #[test]
    fn threshold_cascades_into_an_action() {
        let (mut c, now) = character();
        let effects = c
            .update_need(NeedType::Security, 85.0, "bad news", now)
            .expect("valid");
        assert!(effects.contains("need.threshold_reached"));
        assert!(effects.contains("motivation.created"));
        assert!(effects.contains("motivation.executed"));
    }

    #[test]
    fn successful_motivated_action_resets_need() {
        let (mut c, now) = character();
        c.update_need(NeedType::Security, 85.0, "t", now).expect("valid");
        let history: Vec<_> = c.gate().history().collect();
        assert_eq!(history.len(), 1);
        let succeeded = history[0].status == crate::motivation::ActionStatus::Completed;
        let security = c.needs().get(NeedType::Security).expect("need");
        if succeeded {
            assert!(security.current_value.abs() < f32::EPSILON);
            assert_eq!(security.state, NeedState::Satisfied);
        } else {
            assert!((security.current_value - 65.0).abs() < 1e-4);
            assert!(security.frustration_level > 0.0);
        }
    }

    #[test]
    fn long_action_waits_for_completion() {
        let (mut c, now) = character();
        c.update_need(NeedType::Rest, 50.0, "t", now).expect("valid");
        let effects = c
            .start_action(CharacterAction::new(ActionType::TakeRest), now)
            .expect("admitted");
        let Some(Timer::CompleteAction { action, .. }) = effects.timers.first().copied() else {
            panic!("expected completion timer");
        };
        assert!(matches!(
            c.start_action(CharacterAction::new(ActionType::TakeRest), now),
            Err(AnimusError::ActionInProgress { .. })
        ));
        c.complete_action(action, now);
        assert!(c.gate().in_flight().is_none());
        assert!((c.needs().value(NeedType::Rest) - 40.0).abs() < 1e-4);
    }

    #[test]
    fn impact_requests_fade_timer() {
        let (mut c, now) = character();
        let effects = c
            .apply_impact(EmotionalImpact::new(Emotion::Joy, 60.0, 60.0, "test"), now)
            .expect("valid");
        assert!(matches!(effects.timers.as_slice(), [Timer::Fade { .. }]));
        assert!(effects.contains("emotional_state.changed"));
    }

    #[test]
    fn severe_frustration_requests_initiative() {
        let (mut c, now) = character();
        for need in [NeedType::Freedom, NeedType::Knowledge, NeedType::SelfRealization] {
            c.needs.update_value(need, 100.0, "t", now).expect("valid");
        }
        for _ in 0..4 {
            c.frustration.record_failure(now);
        }
        let effects = c.analyze_frustration(now);
        assert_eq!(c.frustration().level(), FrustrationLevel::Severe);
        assert!(effects.contains("message.initiative_requested"));
        assert!(matches!(effects.timers.as_slice(), [Timer::ExpirePatterns(_)]));
    }

    #[test]
    fn behavior_context_defaults_are_usable() {
        let ctx = BehaviorContext::default();
        assert!(ctx.emotional_state.is_none());
        let (c, _) = character();
        let ctx = c.behavior_context();
        assert_eq!(ctx.top_needs.len(), CONTEXT_TOP_NEEDS);
        assert_eq!(ctx.frustration_level, Some(FrustrationLevel::None));
        assert!(ctx.debuffs.is_none());
    }

    #[test]
    fn snapshot_restores_needs_and_baseline() {
        let (mut c, now) = character();
        c.update_need(NeedType::Knowledge, 42.0, "t", now).expect("valid");
        c.update_from_direct_emotions(&[(Emotion::Interest, 70.0)], "t", None, now);
        let snapshot = c.snapshot(now);
        let restored =
            CharacterState::from_snapshot(snapshot, Arc::new(AnimusConfig::default()), now, None);
        assert!((restored.needs().value(NeedType::Knowledge) - 42.0).abs() < 1e-4);
        assert_eq!(restored.emotion().state().primary, Emotion::Interest);
        assert_eq!(restored.id(), c.id());
    }
}
