//! Frustration: scoring, leveling and time-bounded behaviour debuffs.
//!
//! The score is a pure function of three signals:
//!
//!   score = 15 × unmet_needs + 20 × [failures > 3] + 10 × negative_social
//!
//! mapped to a level (≥80 critical, ≥60 severe, ≥40 moderate, ≥20 mild).
//! Each contributing [`FrustrationType`] yields one [`BehaviorPattern`] whose
//! modifiers are scaled by the level intensity (0.25 / 0.5 / 0.75 / 1.0).
//!
//! Patterns do not expire individually: one expiry per character clears all
//! of them after the longest pattern duration. Each (re)activation bumps a
//! generation counter so a stale expiry timer cannot clear newer patterns.
//!
//! Sustained negative emotion escalates the stored level one step, on top
//! of whatever the score says, until the patterns expire.

use std::collections::{BTreeSet, VecDeque};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::FrustrationConfig;
use crate::events::DomainEvent;
use crate::needs::NeedStore;
use crate::types::{CharacterId, Emotion};

/// Lowest effective success rate frustration can push an action to.
pub const SUCCESS_FLOOR: f32 = 0.1;

// ---------------------------------------------------------------------------
// Levels and types
// ---------------------------------------------------------------------------

/// Character-level frustration classification.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum FrustrationLevel {
    /// Not frustrated.
    #[default]
    None,
    /// Score ≥ 20.
    Mild,
    /// Score ≥ 40.
    Moderate,
    /// Score ≥ 60.
    Severe,
    /// Score ≥ 80.
    Critical,
}

impl FrustrationLevel {
    /// Level for a raw score.
    #[must_use]
    pub fn from_score(score: u32) -> Self {
        match score {
            80..=u32::MAX => Self::Critical,
            60..=79 => Self::Severe,
            40..=59 => Self::Moderate,
            20..=39 => Self::Mild,
            _ => Self::None,
        }
    }

    /// Modifier scale for patterns built at this level.
    #[must_use]
    pub fn intensity(self) -> f32 {
        match self {
            Self::None => 0.0,
            Self::Mild => 0.25,
            Self::Moderate => 0.5,
            Self::Severe => 0.75,
            Self::Critical => 1.0,
        }
    }

    /// One step up, saturating at critical.
    #[must_use]
    pub fn escalate(self) -> Self {
        self.raise(1)
    }

    fn raise(self, steps: u8) -> Self {
        let mut level = self;
        for _ in 0..steps {
            level = match level {
                Self::None => Self::Mild,
                Self::Mild => Self::Moderate,
                Self::Moderate => Self::Severe,
                Self::Severe | Self::Critical => Self::Critical,
            };
        }
        level
    }
}

/// What a frustration pattern stems from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FrustrationType {
    /// Needs past threshold or frustrated.
    NeedDeprivation,
    /// More than three failed actions in the window.
    RepeatedFailure,
    /// Negative or hostile user moods in the window.
    SocialRejection,
    /// Sustained strong negative emotion.
    EmotionalDistress,
}

/// Signals the score is computed from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrustrationInputs {
    /// Unmet needs.
    pub unmet_needs: usize,
    /// Failed actions inside the window.
    pub failure_signals: usize,
    /// Negative social signals inside the window.
    pub negative_social_signals: usize,
}

impl FrustrationInputs {
    /// Frustration types these inputs contribute.
    #[must_use]
    pub fn contributing_types(&self) -> BTreeSet<FrustrationType> {
        let mut types = BTreeSet::new();
        if self.unmet_needs > 0 {
            types.insert(FrustrationType::NeedDeprivation);
        }
        if self.failure_signals > 3 {
            types.insert(FrustrationType::RepeatedFailure);
        }
        if self.negative_social_signals > 0 {
            types.insert(FrustrationType::SocialRejection);
        }
        types
    }
}

/// Frustration score for a set of inputs.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn score(inputs: &FrustrationInputs) -> u32 {
    let unmet = 15 * inputs.unmet_needs as u32;
    let failures = if inputs.failure_signals > 3 { 20 } else { 0 };
    let social = 10 * inputs.negative_social_signals as u32;
    unmet.saturating_add(failures).saturating_add(social)
}

// ---------------------------------------------------------------------------
// Patterns
// ---------------------------------------------------------------------------

/// Behavioural tendencies, each 0–1.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BehaviorModifiers {
    /// Sharp, confrontational replies.
    pub aggression: f32,
    /// Acting before thinking.
    pub impulsivity: f32,
    /// Steering away from topics or people.
    pub avoidance: f32,
    /// Pulling back from conversation.
    pub withdrawal: f32,
    /// Seeking attention and confirmation.
    pub neediness: f32,
}

impl BehaviorModifiers {
    fn scaled(self, k: f32) -> Self {
        Self {
            aggression: self.aggression * k,
            impulsivity: self.impulsivity * k,
            avoidance: self.avoidance * k,
            withdrawal: self.withdrawal * k,
            neediness: self.neediness * k,
        }
    }

    /// Field-wise maximum.
    #[must_use]
    pub fn max(self, other: Self) -> Self {
        Self {
            aggression: self.aggression.max(other.aggression),
            impulsivity: self.impulsivity.max(other.impulsivity),
            avoidance: self.avoidance.max(other.avoidance),
            withdrawal: self.withdrawal.max(other.withdrawal),
            neediness: self.neediness.max(other.neediness),
        }
    }
}

/// Emotional tendencies, each 0–1.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct EmotionalModifiers {
    /// Worry.
    pub anxiety: f32,
    /// Irritability.
    pub anger: f32,
    /// Low mood.
    pub sadness: f32,
    /// How quickly mood swings.
    pub volatility: f32,
}

impl EmotionalModifiers {
    fn scaled(self, k: f32) -> Self {
        Self {
            anxiety: self.anxiety * k,
            anger: self.anger * k,
            sadness: self.sadness * k,
            volatility: self.volatility * k,
        }
    }

    /// Field-wise maximum.
    #[must_use]
    pub fn max(self, other: Self) -> Self {
        Self {
            anxiety: self.anxiety.max(other.anxiety),
            anger: self.anger.max(other.anger),
            sadness: self.sadness.max(other.sadness),
            volatility: self.volatility.max(other.volatility),
        }
    }
}

/// Time-bounded penalties, in percent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TemporaryDebuffs {
    /// Relative reduction of action success probability.
    pub action_success_reduction: f32,
    /// Extra resource spent per action.
    pub resource_efficiency_loss: f32,
    /// Penalty on social actions.
    pub social_skill_penalty: f32,
    /// Worse choices under pressure.
    pub decision_making_impairment: f32,
    /// How long the debuffs last.
    pub duration_minutes: f32,
}

/// Behaviour changes caused by one frustration type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BehaviorPattern {
    /// Source of the pattern.
    pub frustration_type: FrustrationType,
    /// Level the pattern was built at.
    pub level: FrustrationLevel,
    /// Scale applied to the type weights.
    pub intensity: f32,
    /// Behavioural tendencies.
    pub behavior_modifiers: BehaviorModifiers,
    /// Emotional tendencies.
    pub emotional_modifiers: EmotionalModifiers,
    /// Penalties until expiry.
    pub debuffs: TemporaryDebuffs,
    /// When the pattern was activated.
    pub activated_at: DateTime<Utc>,
}

impl BehaviorPattern {
    /// Build the pattern for `frustration_type` at `level`.
    #[must_use]
    pub fn build(
        frustration_type: FrustrationType,
        level: FrustrationLevel,
        now: DateTime<Utc>,
    ) -> Self {
        let k = level.intensity();
        let w = type_weights(frustration_type);
        Self {
            frustration_type,
            level,
            intensity: k,
            behavior_modifiers: w.behavior.scaled(k),
            emotional_modifiers: w.emotional.scaled(k),
            debuffs: TemporaryDebuffs {
                action_success_reduction: k * 30.0,
                resource_efficiency_loss: k * w.resource_loss,
                social_skill_penalty: k * w.social_penalty,
                decision_making_impairment: k * w.decision_impairment,
                duration_minutes: w.base_minutes * (1.0 + k),
            },
            activated_at: now,
        }
    }
}

struct TypeWeights {
    behavior: BehaviorModifiers,
    emotional: EmotionalModifiers,
    resource_loss: f32,
    social_penalty: f32,
    decision_impairment: f32,
    base_minutes: f32,
}

fn type_weights(frustration_type: FrustrationType) -> TypeWeights {
    match frustration_type {
        FrustrationType::NeedDeprivation => TypeWeights {
            behavior: BehaviorModifiers {
                aggression: 0.6,
                impulsivity: 0.7,
                avoidance: 0.1,
                withdrawal: 0.2,
                neediness: 0.5,
            },
            emotional: EmotionalModifiers {
                anxiety: 0.3,
                anger: 0.5,
                sadness: 0.3,
                volatility: 0.4,
            },
            resource_loss: 20.0,
            social_penalty: 10.0,
            decision_impairment: 15.0,
            base_minutes: 60.0,
        },
        FrustrationType::RepeatedFailure => TypeWeights {
            behavior: BehaviorModifiers {
                aggression: 0.4,
                impulsivity: 0.3,
                avoidance: 0.4,
                withdrawal: 0.5,
                neediness: 0.1,
            },
            emotional: EmotionalModifiers {
                anxiety: 0.4,
                anger: 0.4,
                sadness: 0.5,
                volatility: 0.3,
            },
            resource_loss: 25.0,
            social_penalty: 5.0,
            decision_impairment: 25.0,
            base_minutes: 45.0,
        },
        FrustrationType::SocialRejection => TypeWeights {
            behavior: BehaviorModifiers {
                aggression: 0.2,
                impulsivity: 0.1,
                avoidance: 0.7,
                withdrawal: 0.6,
                neediness: 0.4,
            },
            emotional: EmotionalModifiers {
                anxiety: 0.7,
                anger: 0.2,
                sadness: 0.6,
                volatility: 0.3,
            },
            resource_loss: 10.0,
            social_penalty: 30.0,
            decision_impairment: 10.0,
            base_minutes: 90.0,
        },
        FrustrationType::EmotionalDistress => TypeWeights {
            behavior: BehaviorModifiers {
                aggression: 0.3,
                impulsivity: 0.5,
                avoidance: 0.3,
                withdrawal: 0.4,
                neediness: 0.3,
            },
            emotional: EmotionalModifiers {
                anxiety: 0.5,
                anger: 0.4,
                sadness: 0.5,
                volatility: 0.7,
            },
            resource_loss: 15.0,
            social_penalty: 15.0,
            decision_impairment: 20.0,
            base_minutes: 30.0,
        },
    }
}

// ---------------------------------------------------------------------------
// Record and engine
// ---------------------------------------------------------------------------

/// Persistable frustration state of one character.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FrustrationRecord {
    /// Current level, including emotional escalation.
    pub level: FrustrationLevel,
    /// Last computed score.
    pub score: u32,
    /// Types behind the active patterns.
    pub active_types: BTreeSet<FrustrationType>,
    /// Active patterns; cleared together on expiry.
    pub active_patterns: Vec<BehaviorPattern>,
    /// Levels added by sustained negative emotion.
    pub escalation_steps: u8,
    /// When the record was last analyzed.
    pub last_analyzed: Option<DateTime<Utc>>,
}

impl FrustrationRecord {
    /// Largest action-success reduction across active patterns (percent).
    #[must_use]
    pub fn max_action_success_reduction(&self) -> f32 {
        self.active_patterns
            .iter()
            .map(|p| p.debuffs.action_success_reduction)
            .fold(0.0, f32::max)
    }

    /// Field-wise strongest debuffs.
    #[must_use]
    pub fn strongest_debuffs(&self) -> Option<TemporaryDebuffs> {
        self.active_patterns.iter().map(|p| p.debuffs).reduce(|a, b| TemporaryDebuffs {
            action_success_reduction: a.action_success_reduction.max(b.action_success_reduction),
            resource_efficiency_loss: a.resource_efficiency_loss.max(b.resource_efficiency_loss),
            social_skill_penalty: a.social_skill_penalty.max(b.social_skill_penalty),
            decision_making_impairment: a
                .decision_making_impairment
                .max(b.decision_making_impairment),
            duration_minutes: a.duration_minutes.max(b.duration_minutes),
        })
    }
}

/// When to clear the active patterns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PatternExpiry {
    /// Generation the expiry belongs to.
    pub generation: u64,
    /// Delay from activation.
    pub after: Duration,
}

/// Result of an analysis or escalation.
#[derive(Debug, Default)]
pub struct FrustrationOutcome {
    /// Events in causal order.
    pub events: Vec<DomainEvent>,
    /// Set when patterns were (re)activated and an expiry must be scheduled.
    pub expiry: Option<PatternExpiry>,
}

/// Frustration state and signal history of one character.
#[derive(Debug, Clone)]
pub struct FrustrationEngine {
    character: CharacterId,
    record: FrustrationRecord,
    failures: VecDeque<DateTime<Utc>>,
    negative_social: VecDeque<DateTime<Utc>>,
    generation: u64,
    negative_since: Option<DateTime<Utc>>,
    config: FrustrationConfig,
}

impl FrustrationEngine {
    /// Engine with no frustration.
    #[must_use]
    pub fn new(character: CharacterId, config: &FrustrationConfig) -> Self {
        Self::restore(character, config, FrustrationRecord::default())
    }

    /// Engine resumed from a persisted record.
    #[must_use]
    pub fn restore(
        character: CharacterId,
        config: &FrustrationConfig,
        record: FrustrationRecord,
    ) -> Self {
        Self {
            character,
            record,
            failures: VecDeque::new(),
            negative_social: VecDeque::new(),
            generation: 0,
            negative_since: None,
            config: config.clone(),
        }
    }

    /// Current record.
    #[must_use]
    pub fn record(&self) -> &FrustrationRecord {
        &self.record
    }

    /// Current level.
    #[must_use]
    pub fn level(&self) -> FrustrationLevel {
        self.record.level
    }

    /// Generation of the active patterns.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Expiry for patterns that are active but have no timer yet, e.g.
    /// after a restore.
    #[must_use]
    pub fn pending_expiry(&self) -> Option<PatternExpiry> {
        self.expiry_for_active()
    }

    /// Note a failed action.
    pub fn record_failure(&mut self, now: DateTime<Utc>) {
        self.failures.push_back(now);
    }

    /// Note a negative or hostile user reaction.
    pub fn record_negative_social(&mut self, now: DateTime<Utc>) {
        self.negative_social.push_back(now);
    }

    /// Windowed signal counts together with the unmet needs.
    pub fn inputs(&mut self, needs: &NeedStore, now: DateTime<Utc>) -> FrustrationInputs {
        #[allow(clippy::cast_possible_wrap)]
        let window = chrono::Duration::minutes(self.config.signal_window_minutes as i64);
        let cutoff = now - window;
        while self.failures.front().is_some_and(|t| *t < cutoff) {
            self.failures.pop_front();
        }
        while self.negative_social.front().is_some_and(|t| *t < cutoff) {
            self.negative_social.pop_front();
        }
        FrustrationInputs {
            unmet_needs: needs.unmet_count(),
            failure_signals: self.failures.len(),
            negative_social_signals: self.negative_social.len(),
        }
    }

    /// Score the character and (re)activate behaviour patterns.
    pub fn analyze(&mut self, needs: &NeedStore, now: DateTime<Utc>) -> FrustrationOutcome {
        let inputs = self.inputs(needs, now);
        let score = score(&inputs);
        let level = FrustrationLevel::from_score(score).raise(self.record.escalation_steps);
        let mut types = inputs.contributing_types();
        if self.record.escalation_steps > 0 {
            types.insert(FrustrationType::EmotionalDistress);
        }
        self.record.score = score;
        self.record.last_analyzed = Some(now);
        debug!(character = %self.character, score, ?level, ?inputs, "frustration analyzed");
        self.settle(level, types, now)
    }

    /// Escalate one level from sustained negative emotion.
    pub fn escalate(&mut self, now: DateTime<Utc>) -> FrustrationOutcome {
        if self.record.level == FrustrationLevel::Critical {
            return FrustrationOutcome::default();
        }
        self.record.escalation_steps = self.record.escalation_steps.saturating_add(1);
        let level = self.record.level.escalate();
        let mut types = self.record.active_types.clone();
        types.insert(FrustrationType::EmotionalDistress);
        info!(character = %self.character, ?level, "frustration escalated by sustained negative emotion");
        self.settle(level, types, now)
    }

    /// Feed the resultant emotion back. Once a negative primary emotion has
    /// stayed above the intensity bar for `sustained_negative_minutes`, the
    /// level escalates and the clock restarts.
    pub fn observe_emotion(
        &mut self,
        primary: Emotion,
        saturated_intensity: f32,
        now: DateTime<Utc>,
    ) -> FrustrationOutcome {
        if !(primary.is_negative() && saturated_intensity > self.config.negative_feedback_intensity) {
            self.negative_since = None;
            return FrustrationOutcome::default();
        }
        let since = *self.negative_since.get_or_insert(now);
        #[allow(clippy::cast_precision_loss)]
        let held_minutes = (now - since).num_milliseconds() as f32 / 60_000.0;
        if held_minutes >= self.config.sustained_negative_minutes {
            self.negative_since = Some(now);
            return self.escalate(now);
        }
        FrustrationOutcome::default()
    }

    /// Clear all patterns if `generation` is still current.
    pub fn expire_patterns(&mut self, generation: u64) -> Vec<DomainEvent> {
        if generation != self.generation || self.record.active_patterns.is_empty() {
            return Vec::new();
        }
        self.record.active_patterns.clear();
        self.record.active_types.clear();
        self.record.escalation_steps = 0;
        let old = self.record.level;
        self.record.level = FrustrationLevel::from_score(self.record.score);
        debug!(character = %self.character, generation, "behaviour patterns expired");
        if old == self.record.level {
            Vec::new()
        } else {
            vec![DomainEvent::FrustrationLevelChanged {
                character: self.character,
                old,
                new: self.record.level,
            }]
        }
    }

    /// Success probability after frustration debuffs.
    ///
    /// Unchanged without active patterns; otherwise reduced by the largest
    /// action-success reduction and floored at [`SUCCESS_FLOOR`].
    #[must_use]
    pub fn apply_to_action(&self, base_rate: f32) -> f32 {
        if self.record.active_patterns.is_empty() {
            return base_rate;
        }
        let reduction = self.record.max_action_success_reduction();
        (base_rate * (1.0 - reduction / 100.0)).max(SUCCESS_FLOOR)
    }

    fn settle(
        &mut self,
        level: FrustrationLevel,
        types: BTreeSet<FrustrationType>,
        now: DateTime<Utc>,
    ) -> FrustrationOutcome {
        let mut outcome = FrustrationOutcome::default();
        let old = self.record.level;
        if old != level {
            self.record.level = level;
            outcome.events.push(DomainEvent::FrustrationLevelChanged {
                character: self.character,
                old,
                new: level,
            });
        }
        if level == FrustrationLevel::None || types.is_empty() {
            return outcome;
        }

        let changed = old != level || self.record.active_types != types;
        self.record.active_patterns = types
            .iter()
            .map(|&t| BehaviorPattern::build(t, level, now))
            .collect();
        self.record.active_types = types;
        self.generation += 1;
        if changed {
            outcome.events.push(DomainEvent::BehaviorPatternActivationRequested {
                character: self.character,
                level,
                types: self.record.active_types.iter().copied().collect(),
            });
        }
        outcome.expiry = self.expiry_for_active();
        outcome
    }

    fn expiry_for_active(&self) -> Option<PatternExpiry> {
        let minutes = self
            .record
            .active_patterns
            .iter()
            .map(|p| p.debuffs.duration_minutes)
            .fold(0.0_f32, f32::max);
        (minutes > 0.0).then(|| PatternExpiry {
            generation: self.generation,
            after: Duration::from_secs_f32(minutes * 60.0),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::NeedsConfig;
    use crate::events::count_named;
    use crate::types::NeedType;

    fn needs_with_unmet(n: usize, now: DateTime<Utc>) -> NeedStore {
        let mut needs = NeedStore::with_defaults(CharacterId::new(), &NeedsConfig::default(), now);
        for need in NeedType::ALL.into_iter().take(n) {
            needs.update_value(need, 100.0, "test", now).expect("valid");
        }
        needs
    }

    #[test]
    fn score_and_level_are_deterministic() {
        let three_unmet = FrustrationInputs {
            unmet_needs: 3,
            ..FrustrationInputs::default()
        };
        assert_eq!(score(&three_unmet), 45);
        assert_eq!(FrustrationLevel::from_score(45), FrustrationLevel::Moderate);
        assert_eq!(FrustrationLevel::from_score(85), FrustrationLevel::Critical);
        assert_eq!(FrustrationLevel::from_score(19), FrustrationLevel::None);
    }

    #[test]
    fn failures_count_only_above_three() {
        let three = FrustrationInputs {
            failure_signals: 3,
            ..FrustrationInputs::default()
        };
        let four = FrustrationInputs {
            failure_signals: 4,
            ..FrustrationInputs::default()
        };
        assert_eq!(score(&three), 0);
        assert_eq!(score(&four), 20);
    }

    #[test]
    fn analysis_builds_one_pattern_per_type() {
        let now = Utc::now();
        let needs = needs_with_unmet(3, now);
        let mut engine = FrustrationEngine::new(CharacterId::new(), &FrustrationConfig::default());
        for _ in 0..4 {
            engine.record_failure(now);
        }
        let outcome = engine.analyze(&needs, now);
        assert_eq!(engine.level(), FrustrationLevel::Severe);
        assert_eq!(engine.record().active_patterns.len(), 2);
        assert_eq!(count_named(&outcome.events, "behavior.pattern_activation_requested"), 1);
        assert!(outcome.expiry.is_some());
        assert!(engine.apply_to_action(0.9) < 0.9);
    }

    #[test]
    fn old_signals_leave_the_window() {
        let now = Utc::now();
        let needs = needs_with_unmet(0, now);
        let mut engine = FrustrationEngine::new(CharacterId::new(), &FrustrationConfig::default());
        for _ in 0..5 {
            engine.record_failure(now - chrono::Duration::hours(2));
        }
        engine.analyze(&needs, now);
        assert_eq!(engine.level(), FrustrationLevel::None);
    }

    #[test]
    fn apply_to_action_is_identity_without_patterns() {
        let engine = FrustrationEngine::new(CharacterId::new(), &FrustrationConfig::default());
        assert!((engine.apply_to_action(0.05) - 0.05).abs() < f32::EPSILON);
    }

    #[test]
    fn apply_to_action_respects_floor() {
        let now = Utc::now();
        let needs = needs_with_unmet(8, now);
        let mut engine = FrustrationEngine::new(CharacterId::new(), &FrustrationConfig::default());
        engine.analyze(&needs, now);
        assert_eq!(engine.level(), FrustrationLevel::Critical);
        assert!((engine.apply_to_action(0.8) - 0.56).abs() < 1e-5);
        assert!((engine.apply_to_action(0.11) - SUCCESS_FLOOR).abs() < f32::EPSILON);
    }

    #[test]
    fn stale_generation_does_not_clear_patterns() {
        let now = Utc::now();
        let needs = needs_with_unmet(3, now);
        let mut engine = FrustrationEngine::new(CharacterId::new(), &FrustrationConfig::default());
        let first = engine.analyze(&needs, now).expiry.expect("expiry");
        let second = engine.analyze(&needs, now).expiry.expect("expiry");
        assert!(engine.expire_patterns(first.generation).is_empty());
        assert!(!engine.record().active_patterns.is_empty());
        engine.expire_patterns(second.generation);
        assert!(engine.record().active_patterns.is_empty());
    }

    #[test]
    fn sustained_negative_emotion_escalates() {
        let t0 = Utc::now();
        let mut engine = FrustrationEngine::new(CharacterId::new(), &FrustrationConfig::default());
        for minute in 0..10 {
            let at = t0 + chrono::Duration::minutes(minute);
            let outcome = engine.observe_emotion(Emotion::Anger, 90.0, at);
            assert!(outcome.events.is_empty());
        }
        let outcome = engine.observe_emotion(Emotion::Anger, 90.0, t0 + chrono::Duration::minutes(10));
        assert_eq!(engine.level(), FrustrationLevel::Mild);
        assert_eq!(count_named(&outcome.events, "character.frustration_level_changed"), 1);
        assert!(engine.record().active_types.contains(&FrustrationType::EmotionalDistress));
    }

    #[test]
    fn positive_emotion_resets_the_clock() {
        let t0 = Utc::now();
        let mut engine = FrustrationEngine::new(CharacterId::new(), &FrustrationConfig::default());
        engine.observe_emotion(Emotion::Fear, 95.0, t0);
        engine.observe_emotion(Emotion::Joy, 95.0, t0 + chrono::Duration::minutes(9));
        engine.observe_emotion(Emotion::Fear, 95.0, t0 + chrono::Duration::minutes(10));
        engine.observe_emotion(Emotion::Fear, 95.0, t0 + chrono::Duration::minutes(15));
        assert_eq!(engine.level(), FrustrationLevel::None);
    }

    #[test]
    fn weak_negative_emotion_does_not_escalate() {
        let t0 = Utc::now();
        let mut engine = FrustrationEngine::new(CharacterId::new(), &FrustrationConfig::default());
        engine.observe_emotion(Emotion::Sadness, 60.0, t0);
        engine.observe_emotion(Emotion::Sadness, 60.0, t0 + chrono::Duration::minutes(30));
        assert_eq!(engine.level(), FrustrationLevel::None);
    }
}
