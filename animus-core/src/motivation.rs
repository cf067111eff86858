//! Motivations and resource-gated actions.
//!
//! Motivations are derived fresh on every pass from needs at or past their
//! threshold and ranked by `priority × intensity`; nothing is queued. A
//! motivation is consumed once by the [`ActionGate`] and not offered again
//! until its need resets.
//!
//! An action spends value from a resource need. It may run only when the
//! resource holds at least its cost, and only one action per character may
//! be in flight. The success draw uses the frustration-adjusted probability;
//! the cost is paid either way, the related-need relief only on success.

use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, Utc};
use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{AnimusError, Result};
use crate::events::DomainEvent;
use crate::frustration::FrustrationEngine;
use crate::needs::{NeedState, NeedStore};
use crate::types::{ActionId, CharacterId, NeedType};

// ---------------------------------------------------------------------------
// Motivations
// ---------------------------------------------------------------------------

/// Whether a motivation has been acted on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MotivationStatus {
    /// Waiting for the action gate.
    Pending,
    /// Handed to the action gate.
    Consumed,
}

/// A ranked drive derived from one need.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Motivation {
    /// Need behind the drive.
    pub need_type: NeedType,
    /// Ordinal priority of the need.
    pub priority: f32,
    /// `current_value / max_value`, 0–1.
    pub intensity: f32,
    /// Lifecycle.
    pub status: MotivationStatus,
}

impl Motivation {
    /// Ranking key.
    #[must_use]
    pub fn weight(&self) -> f32 {
        self.priority * self.intensity
    }
}

/// Turns pressing needs into ranked motivations.
#[derive(Debug, Clone, Default)]
pub struct MotivationPlanner {
    consumed: BTreeSet<NeedType>,
}

impl MotivationPlanner {
    /// Planner with nothing consumed.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Pending motivations, strongest first.
    ///
    /// Inactive, blocked and already consumed needs are skipped.
    #[must_use]
    pub fn evaluate(&self, needs: &NeedStore) -> Vec<Motivation> {
        let mut motivations: Vec<Motivation> = needs
            .iter()
            .filter(|n| n.active && n.state != NeedState::Blocked && n.is_pressing())
            .filter(|n| !self.consumed.contains(&n.need_type))
            .map(|n| Motivation {
                need_type: n.need_type,
                priority: n.priority,
                intensity: if n.max_value > 0.0 {
                    n.current_value / n.max_value
                } else {
                    0.0
                },
                status: MotivationStatus::Pending,
            })
            .collect();
        motivations.sort_by_key(|m| std::cmp::Reverse(OrderedFloat(m.weight())));
        motivations
    }

    /// Mark a motivation as handed to the gate.
    pub fn consume(&mut self, motivation: &mut Motivation) {
        motivation.status = MotivationStatus::Consumed;
        self.consumed.insert(motivation.need_type);
    }

    /// Allow the need to motivate again (after a reset).
    pub fn release(&mut self, need_type: NeedType) {
        self.consumed.remove(&need_type);
    }

    /// Whether a need's motivation is currently consumed.
    #[must_use]
    pub fn is_consumed(&self, need_type: NeedType) -> bool {
        self.consumed.contains(&need_type)
    }
}

// ---------------------------------------------------------------------------
// Action catalog
// ---------------------------------------------------------------------------

/// Motivated actions a character can take.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    /// Reach out and start talking.
    InitiateConversation,
    /// Do something to get noticed.
    SeekAttention,
    /// Tell the user about oneself.
    ShareExperience,
    /// Step away and recover.
    TakeRest,
    /// Spend time on something fulfilling.
    PursueHobby,
    /// Make an independent choice.
    AssertIndependence,
    /// Dig into a subject.
    ExploreTopic,
    /// Ask for comfort.
    SeekReassurance,
}

/// Static parameters of an action type.
#[derive(Debug, Clone, Copy)]
pub struct ActionSpec {
    /// Need the action satisfies.
    pub need: NeedType,
    /// Need the cost is paid from.
    pub resource: NeedType,
    /// Resource points spent.
    pub cost: f32,
    /// Base success probability.
    pub success_probability: f32,
    /// Value deltas on related needs, applied on success.
    pub related: &'static [(NeedType, f32)],
    /// Time the action stays in progress.
    pub duration: Duration,
}

impl ActionType {
    /// Every action type.
    pub const ALL: [Self; 8] = [
        Self::InitiateConversation,
        Self::SeekAttention,
        Self::ShareExperience,
        Self::TakeRest,
        Self::PursueHobby,
        Self::AssertIndependence,
        Self::ExploreTopic,
        Self::SeekReassurance,
    ];

    /// Stable snake_case name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::InitiateConversation => "initiate_conversation",
            Self::SeekAttention => "seek_attention",
            Self::ShareExperience => "share_experience",
            Self::TakeRest => "take_rest",
            Self::PursueHobby => "pursue_hobby",
            Self::AssertIndependence => "assert_independence",
            Self::ExploreTopic => "explore_topic",
            Self::SeekReassurance => "seek_reassurance",
        }
    }

    /// Action that serves a need.
    #[must_use]
    pub fn for_need(need: NeedType) -> Self {
        match need {
            NeedType::Communication => Self::InitiateConversation,
            NeedType::Attention => Self::SeekAttention,
            NeedType::Acceptance => Self::ShareExperience,
            NeedType::Rest => Self::TakeRest,
            NeedType::SelfRealization => Self::PursueHobby,
            NeedType::Freedom => Self::AssertIndependence,
            NeedType::Knowledge => Self::ExploreTopic,
            NeedType::Security => Self::SeekReassurance,
        }
    }

    /// Catalog entry.
    #[must_use]
    pub fn spec(self) -> ActionSpec {
        use NeedType::{
            Acceptance, Attention, Communication, Freedom, Knowledge, Rest, Security,
            SelfRealization,
        };
        let (need, cost, p, related, minutes): (NeedType, f32, f32, &'static [(NeedType, f32)], u64) =
            match self {
                Self::InitiateConversation => (Communication, 20.0, 0.8, &[(Attention, -10.0)], 0),
                Self::SeekAttention => (Attention, 15.0, 0.7, &[(Acceptance, -5.0)], 0),
                Self::ShareExperience => (Acceptance, 15.0, 0.75, &[(Communication, -10.0)], 0),
                Self::TakeRest => (Rest, 10.0, 0.95, &[], 30),
                Self::PursueHobby => (
                    SelfRealization,
                    25.0,
                    0.7,
                    &[(Freedom, -10.0), (Knowledge, -5.0)],
                    45,
                ),
                Self::AssertIndependence => (Freedom, 20.0, 0.6, &[(SelfRealization, -5.0)], 0),
                Self::ExploreTopic => (Knowledge, 15.0, 0.8, &[(SelfRealization, -10.0)], 20),
                Self::SeekReassurance => (Security, 20.0, 0.7, &[(Acceptance, -10.0)], 0),
            };
        ActionSpec {
            need,
            resource: need,
            cost,
            success_probability: p,
            related,
            duration: Duration::from_secs(minutes * 60),
        }
    }
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActionType {
    type Err = AnimusError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|a| a.as_str() == s)
            .ok_or_else(|| AnimusError::InvalidInput(format!("unknown action type: {s}")))
    }
}

// ---------------------------------------------------------------------------
// Actions
// ---------------------------------------------------------------------------

/// Lifecycle of an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionStatus {
    /// Created, not started.
    Pending,
    /// Started; holds the per-character action slot.
    InProgress,
    /// Success draw passed.
    Completed,
    /// Success draw failed.
    Failed,
    /// Abandoned before completion.
    Cancelled,
}

/// One concrete action.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CharacterAction {
    /// Unique identifier.
    pub id: ActionId,
    /// Kind of action.
    pub action_type: ActionType,
    /// Points spent from the resource need.
    pub resource_cost: f32,
    /// Need the cost is paid from.
    pub resource_type: NeedType,
    /// Base success probability, before frustration.
    pub success_probability: f32,
    /// Value deltas applied to other needs on success.
    pub related_needs: BTreeMap<NeedType, f32>,
    /// Need whose motivation produced the action, if any.
    pub motivating_need: Option<NeedType>,
    /// Time the action stays in progress.
    pub duration: Duration,
    /// Lifecycle.
    pub status: ActionStatus,
    /// Probability actually drawn against.
    pub effective_probability: Option<f32>,
    /// When the action started.
    pub started_at: Option<DateTime<Utc>>,
    /// When the action finished.
    pub finished_at: Option<DateTime<Utc>>,
}

impl CharacterAction {
    /// Action with catalog parameters.
    #[must_use]
    pub fn new(action_type: ActionType) -> Self {
        let spec = action_type.spec();
        Self {
            id: ActionId::new(),
            action_type,
            resource_cost: spec.cost,
            resource_type: spec.resource,
            success_probability: spec.success_probability,
            related_needs: spec.related.iter().copied().collect(),
            motivating_need: None,
            duration: spec.duration,
            status: ActionStatus::Pending,
            effective_probability: None,
            started_at: None,
            finished_at: None,
        }
    }

    /// Action answering a motivation.
    #[must_use]
    pub fn for_motivation(motivation: &Motivation) -> Self {
        let mut action = Self::new(ActionType::for_need(motivation.need_type));
        action.motivating_need = Some(motivation.need_type);
        action
    }

    /// Override the resource cost.
    #[must_use]
    pub fn with_cost(mut self, cost: f32) -> Self {
        self.resource_cost = cost;
        self
    }

    /// Override the base success probability.
    #[must_use]
    pub fn with_success_probability(mut self, p: f32) -> Self {
        self.success_probability = p;
        self
    }

    /// Override the in-progress duration.
    #[must_use]
    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    /// Need credited or blamed for the outcome.
    #[must_use]
    pub fn target_need(&self) -> NeedType {
        self.motivating_need.unwrap_or(self.resource_type)
    }
}

/// Result of finishing an action.
#[derive(Debug)]
pub struct ExecutionOutcome {
    /// The finished action.
    pub action: CharacterAction,
    /// Whether the draw passed.
    pub success: bool,
    /// Events in causal order.
    pub events: Vec<DomainEvent>,
}

// ---------------------------------------------------------------------------
// Gate
// ---------------------------------------------------------------------------

/// Admits at most one in-flight action per character and settles outcomes.
#[derive(Debug, Clone)]
pub struct ActionGate {
    character: CharacterId,
    in_flight: Option<CharacterAction>,
    history: VecDeque<CharacterAction>,
    history_len: usize,
}

impl ActionGate {
    /// Empty gate keeping `history_len` finished actions.
    #[must_use]
    pub fn new(character: CharacterId, history_len: usize) -> Self {
        Self {
            character,
            in_flight: None,
            history: VecDeque::new(),
            history_len,
        }
    }

    /// Gate restored with previous history.
    #[must_use]
    pub fn restore(character: CharacterId, history_len: usize, history: Vec<CharacterAction>) -> Self {
        let mut gate = Self::new(character, history_len);
        for action in history {
            gate.remember(action);
        }
        gate
    }

    /// Action currently holding the slot.
    #[must_use]
    pub fn in_flight(&self) -> Option<&CharacterAction> {
        self.in_flight.as_ref()
    }

    /// Finished actions, oldest first.
    pub fn history(&self) -> impl Iterator<Item = &CharacterAction> {
        self.history.iter()
    }

    /// Whether the resource need can pay for `action`. Equality passes.
    ///
    /// # Errors
    /// Returns `ContractViolation` for a negative or NaN cost.
    pub fn can_execute(&self, needs: &NeedStore, action: &CharacterAction) -> Result<bool> {
        check_cost(action)?;
        Ok(needs.value(action.resource_type) >= action.resource_cost)
    }

    /// Take the action slot.
    ///
    /// # Errors
    /// `ActionInProgress` if another action holds the slot,
    /// `ContractViolation` for a bad cost, `InsufficientResource` when the
    /// resource cannot pay.
    pub fn begin(
        &mut self,
        needs: &NeedStore,
        mut action: CharacterAction,
        now: DateTime<Utc>,
    ) -> Result<ActionId> {
        if let Some(current) = &self.in_flight {
            return Err(AnimusError::ActionInProgress {
                character: self.character,
                in_flight: current.id,
            });
        }
        if !self.can_execute(needs, &action)? {
            return Err(AnimusError::InsufficientResource {
                resource: action.resource_type,
                required: action.resource_cost,
                available: needs.value(action.resource_type),
            });
        }
        action.status = ActionStatus::InProgress;
        action.started_at = Some(now);
        let id = action.id;
        debug!(character = %self.character, action = %action.action_type, %id, "action started");
        self.in_flight = Some(action);
        Ok(id)
    }

    /// Settle the in-flight action against a uniform `roll` in `[0, 1)`.
    ///
    /// Pays the cost from the resource need; applies related deltas only on
    /// success. Returns `None` when `id` is not the in-flight action.
    pub fn complete(
        &mut self,
        id: ActionId,
        needs: &mut NeedStore,
        frustration: &FrustrationEngine,
        roll: f32,
        now: DateTime<Utc>,
    ) -> Option<ExecutionOutcome> {
        if self.in_flight.as_ref().is_none_or(|a| a.id != id) {
            return None;
        }
        let mut action = self.in_flight.take()?;
        let p = frustration.apply_to_action(action.success_probability);
        let success = roll < p;
        action.effective_probability = Some(p);

        let mut events = Vec::new();
        let reason = format!("action cost: {}", action.action_type);
        // Cost and deltas were validated at begin; NaN cannot reach here.
        if let Ok(e) = needs.update_value(action.resource_type, -action.resource_cost, &reason, now) {
            events.extend(e);
        }
        if success {
            let reason = format!("action outcome: {}", action.action_type);
            for (&need, &delta) in &action.related_needs {
                if let Ok(e) = needs.update_value(need, delta, &reason, now) {
                    events.extend(e);
                }
            }
        }

        action.status = if success {
            ActionStatus::Completed
        } else {
            ActionStatus::Failed
        };
        action.finished_at = Some(now);
        info!(
            character = %self.character,
            action = %action.action_type,
            success,
            probability = p,
            "action finished"
        );
        events.push(DomainEvent::MotivationExecuted {
            character: self.character,
            need: action.target_need(),
            action: action.action_type,
            success,
        });
        self.remember(action.clone());
        Some(ExecutionOutcome {
            action,
            success,
            events,
        })
    }

    /// Start and immediately settle an action.
    ///
    /// # Errors
    /// Same as [`ActionGate::begin`].
    pub fn execute_with_roll(
        &mut self,
        needs: &mut NeedStore,
        frustration: &FrustrationEngine,
        action: CharacterAction,
        roll: f32,
        now: DateTime<Utc>,
    ) -> Result<ExecutionOutcome> {
        let id = self.begin(needs, action, now)?;
        self.complete(id, needs, frustration, roll, now)
            .ok_or_else(|| AnimusError::ContractViolation(format!("action {id} vanished")))
    }

    /// Abandon the in-flight action without paying its cost.
    pub fn cancel(&mut self, now: DateTime<Utc>) -> Option<CharacterAction> {
        let mut action = self.in_flight.take()?;
        action.status = ActionStatus::Cancelled;
        action.finished_at = Some(now);
        self.remember(action.clone());
        Some(action)
    }

    fn remember(&mut self, action: CharacterAction) {
        self.history.push_back(action);
        while self.history.len() > self.history_len {
            self.history.pop_front();
        }
    }
}

fn check_cost(action: &CharacterAction) -> Result<()> {
    if action.resource_cost.is_nan() || action.resource_cost < 0.0 {
        return Err(AnimusError::ContractViolation(format!(
            "resource cost must be non-negative, got {}",
            action.resource_cost
        )));
    }
    if action.related_needs.values().any(|d| d.is_nan()) {
        return Err(AnimusError::ContractViolation(
            "related need delta is NaN".into(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{FrustrationConfig, NeedsConfig};

    fn setup() -> (NeedStore, FrustrationEngine, ActionGate, DateTime<Utc>) {
        let now = Utc::now();
        let character = CharacterId::new();
        (
            NeedStore::with_defaults(character, &NeedsConfig::default(), now),
            FrustrationEngine::new(character, &FrustrationConfig::default()),
            ActionGate::new(character, 20),
            now,
        )
    }

    #[test]
    fn resource_gate_boundary() {
        let (mut needs, _, gate, now) = setup();
        needs.update_value(NeedType::Rest, 20.0, "t", now).expect("valid");
        let action = |cost| CharacterAction::new(ActionType::TakeRest).with_cost(cost);
        assert!(gate.can_execute(&needs, &action(20.0)).expect("valid"));
        assert!(!gate.can_execute(&needs, &action(21.0)).expect("valid"));
        assert!(gate.can_execute(&needs, &action(19.0)).expect("valid"));
    }

    #[test]
    fn negative_cost_is_contract_violation() {
        let (needs, _, gate, _) = setup();
        let action = CharacterAction::new(ActionType::TakeRest).with_cost(-1.0);
        assert!(matches!(
            gate.can_execute(&needs, &action),
            Err(AnimusError::ContractViolation(_))
        ));
    }

    #[test]
    fn success_pays_cost_and_applies_related() {
        let (mut needs, frustration, mut gate, now) = setup();
        needs.update_value(NeedType::Communication, 50.0, "t", now).expect("valid");
        needs.update_value(NeedType::Attention, 30.0, "t", now).expect("valid");
        let outcome = gate
            .execute_with_roll(
                &mut needs,
                &frustration,
                CharacterAction::new(ActionType::InitiateConversation),
                0.0,
                now,
            )
            .expect("admitted");
        assert!(outcome.success);
        assert!((needs.value(NeedType::Communication) - 30.0).abs() < 1e-4);
        assert!((needs.value(NeedType::Attention) - 20.0).abs() < 1e-4);
        assert_eq!(outcome.action.status, ActionStatus::Completed);
    }

    #[test]
    fn failure_pays_cost_without_related() {
        let (mut needs, frustration, mut gate, now) = setup();
        needs.update_value(NeedType::Communication, 50.0, "t", now).expect("valid");
        needs.update_value(NeedType::Attention, 30.0, "t", now).expect("valid");
        let outcome = gate
            .execute_with_roll(
                &mut needs,
                &frustration,
                CharacterAction::new(ActionType::InitiateConversation),
                0.99,
                now,
            )
            .expect("admitted");
        assert!(!outcome.success);
        assert!((needs.value(NeedType::Communication) - 30.0).abs() < 1e-4);
        assert!((needs.value(NeedType::Attention) - 30.0).abs() < 1e-4);
        assert!(outcome.events.iter().any(|e| matches!(
            e,
            DomainEvent::MotivationExecuted { success: false, .. }
        )));
    }

    #[test]
    fn second_action_is_rejected_while_in_flight() {
        let (mut needs, _, mut gate, now) = setup();
        needs.update_value(NeedType::Rest, 50.0, "t", now).expect("valid");
        let first = gate
            .begin(&needs, CharacterAction::new(ActionType::TakeRest), now)
            .expect("admitted");
        let err = gate
            .begin(&needs, CharacterAction::new(ActionType::TakeRest), now)
            .unwrap_err();
        assert!(matches!(err, AnimusError::ActionInProgress { in_flight, .. } if in_flight == first));
    }

    #[test]
    fn unknown_action_name_is_invalid_input() {
        assert!(matches!(
            "fly_away".parse::<ActionType>(),
            Err(AnimusError::InvalidInput(_))
        ));
        assert_eq!("take_rest".parse::<ActionType>().expect("known"), ActionType::TakeRest);
    }

    #[test]
    fn planner_ranks_and_consumes() {
        let (mut needs, _, _, now) = setup();
        needs.update_value(NeedType::Security, 90.0, "t", now).expect("valid");
        needs.update_value(NeedType::Communication, 100.0, "t", now).expect("valid");
        needs.update_value(NeedType::Rest, 20.0, "t", now).expect("valid");
        let mut planner = MotivationPlanner::new();
        let mut ranked = planner.evaluate(&needs);
        // Security 8 × 0.9 = 7.2 beats Communication 7 × 1.0.
        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[0].need_type, NeedType::Security);

        planner.consume(&mut ranked[0]);
        assert_eq!(planner.evaluate(&needs)[0].need_type, NeedType::Communication);
        planner.release(NeedType::Security);
        assert_eq!(planner.evaluate(&needs).len(), 2);
    }

    #[test]
    fn history_is_bounded() {
        let (mut needs, frustration, _, now) = setup();
        let mut gate = ActionGate::new(CharacterId::new(), 2);
        needs.update_value(NeedType::Security, 100.0, "t", now).expect("valid");
        for _ in 0..3 {
            gate.execute_with_roll(
                &mut needs,
                &frustration,
                CharacterAction::new(ActionType::SeekReassurance),
                0.5,
                now,
            )
            .expect("admitted");
        }
        assert_eq!(gate.history().count(), 2);
    }
}
