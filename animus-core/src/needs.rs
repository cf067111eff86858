//! Need dynamics: growth, blocking, influence and dynamic priority.
//!
//! Each character owns one [`NeedStore`] holding a [`Need`] per [`NeedType`].
//! Needs grow with elapsed time:
//!
//!   Δv = growth_rate × (priority / 5) × individual_accumulation_rate × hours
//!
//! and are clamped to `[0, max_value]` on every write. Crossing the
//! threshold from below emits `need.threshold_reached` once; the trigger
//! re-arms only when the need is reset.
//!
//! Influence is single hop: a blocked or frustrated need raises the
//! frustration of its related needs, a satisfied need lowers it. The
//! targets never propagate further within the same call.
//!
//! Unknown needs are a no-op with a warning. Only values that cannot be
//! clamped (NaN, non-finite hours) are rejected with `InvalidInput`.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::NeedsConfig;
use crate::error::{AnimusError, Result};
use crate::events::DomainEvent;
use crate::types::{CharacterId, NeedType};

/// Lifecycle state of a need.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NeedState {
    /// Growing normally.
    Active,
    /// Growth suspended until `blocked_until`.
    Blocked,
    /// Recently reset by a successful action.
    Satisfied,
    /// Accumulated too much frustration; still grows.
    Frustrated,
}

/// A single need of one character.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Need {
    /// Need category.
    pub need_type: NeedType,
    /// Current pressure in `[0, max_value]`.
    pub current_value: f32,
    /// Upper bound of `current_value`.
    pub max_value: f32,
    /// Value at which the need produces a motivation.
    pub threshold: f32,
    /// Ordinal weight, 1–10.
    pub priority: f32,
    /// Points per hour at priority 5 and accumulation rate 1.
    pub growth_rate: f32,
    /// Frustration points shed per hour while the need is calm.
    pub decay_rate: f32,
    /// Per-character multiplier on growth.
    pub individual_accumulation_rate: f32,
    /// Priority adjusted for current pressure and frustration.
    pub dynamic_priority: f32,
    /// Lifecycle state.
    pub state: NeedState,
    /// Accumulated frustration in `[0, 100]`.
    pub frustration_level: f32,
    /// End of the current block, if blocked.
    pub blocked_until: Option<DateTime<Utc>>,
    /// Related needs and the coefficient each is influenced with.
    pub influence_coefficients: BTreeMap<NeedType, f32>,
    /// False once deactivated; inactive needs are skipped by every sweep.
    pub active: bool,
    /// Whether the next upward crossing of `threshold` fires an event.
    pub threshold_armed: bool,
    /// Last mutation time.
    pub last_updated: DateTime<Utc>,
}

impl Need {
    /// Create a need from its default profile.
    #[must_use]
    pub fn with_defaults(need_type: NeedType, config: &NeedsConfig, now: DateTime<Utc>) -> Self {
        let profile = default_profile(need_type);
        let influence_coefficients = profile.related.iter().copied().collect();
        let mut need = Self {
            need_type,
            current_value: 0.0,
            max_value: config.max_value,
            threshold: profile.threshold,
            priority: profile.priority,
            growth_rate: profile.growth_rate,
            decay_rate: profile.decay_rate,
            individual_accumulation_rate: 1.0,
            dynamic_priority: 0.0,
            state: NeedState::Active,
            frustration_level: 0.0,
            blocked_until: None,
            influence_coefficients,
            active: true,
            threshold_armed: true,
            last_updated: now,
        };
        need.refresh_dynamic_priority();
        need
    }

    /// Growth weight derived from the ordinal priority.
    #[must_use]
    pub fn priority_weight(&self) -> f32 {
        self.priority / 5.0
    }

    /// Whether the need is at or past its threshold.
    #[must_use]
    pub fn is_pressing(&self) -> bool {
        self.current_value >= self.threshold
    }

    /// Whether the need counts as unmet for frustration scoring.
    #[must_use]
    pub fn is_unmet(&self) -> bool {
        self.active && (self.is_pressing() || self.state == NeedState::Frustrated)
    }

    /// `priority × (1 + v/max) × (1 + frustration/100)`.
    pub fn refresh_dynamic_priority(&mut self) {
        let fill = if self.max_value > 0.0 {
            self.current_value / self.max_value
        } else {
            0.0
        };
        self.dynamic_priority =
            self.priority * (1.0 + fill) * (1.0 + self.frustration_level / 100.0);
    }

    fn set_value(&mut self, value: f32) -> f32 {
        let old = self.current_value;
        // A NaN or negative max clamps to zero.
        self.current_value = value.clamp(0.0, self.max_value.max(0.0));
        old
    }

    /// State a need falls back to when it is neither blocked nor satisfied.
    fn settled_state(&self, frustrated_threshold: f32) -> NeedState {
        if self.frustration_level >= frustrated_threshold {
            NeedState::Frustrated
        } else {
            NeedState::Active
        }
    }
}

// ---------------------------------------------------------------------------
// Default need table
// ---------------------------------------------------------------------------

/// Static tuning for one need type.
#[derive(Debug, Clone, Copy)]
pub struct NeedProfile {
    /// Points per hour at priority 5.
    pub growth_rate: f32,
    /// Threshold for motivation.
    pub threshold: f32,
    /// Ordinal priority.
    pub priority: f32,
    /// Frustration cooling per hour.
    pub decay_rate: f32,
    /// Related needs with influence coefficients.
    pub related: &'static [(NeedType, f32)],
}

/// Default tuning for a need type.
#[must_use]
pub fn default_profile(need_type: NeedType) -> NeedProfile {
    use NeedType::{
        Acceptance, Attention, Communication, Freedom, Knowledge, Rest, Security, SelfRealization,
    };
    let (growth_rate, threshold, priority, related): (f32, f32, f32, &'static [(NeedType, f32)]) =
        match need_type {
            Rest => (4.0, 70.0, 6.0, &[(SelfRealization, 0.3)]),
            Communication => (8.0, 60.0, 7.0, &[(Attention, 0.6), (Acceptance, 0.4)]),
            Attention => (6.0, 65.0, 6.0, &[(Communication, 0.5), (Acceptance, 0.5)]),
            Acceptance => (3.0, 70.0, 5.0, &[(Attention, 0.4), (SelfRealization, 0.3)]),
            SelfRealization => (2.0, 75.0, 4.0, &[(Knowledge, 0.5), (Freedom, 0.3)]),
            Freedom => (2.0, 75.0, 4.0, &[(SelfRealization, 0.4)]),
            Knowledge => (3.0, 70.0, 5.0, &[(SelfRealization, 0.5)]),
            Security => (1.0, 80.0, 8.0, &[(Rest, 0.3), (Acceptance, 0.2)]),
        };
    NeedProfile {
        growth_rate,
        threshold,
        priority,
        decay_rate: 5.0,
        related,
    }
}

// ---------------------------------------------------------------------------
// NeedStore
// ---------------------------------------------------------------------------

/// All needs of one character.
#[derive(Debug, Clone)]
pub struct NeedStore {
    character: CharacterId,
    needs: BTreeMap<NeedType, Need>,
    config: NeedsConfig,
}

impl NeedStore {
    /// Provision the default need set.
    #[must_use]
    pub fn with_defaults(character: CharacterId, config: &NeedsConfig, now: DateTime<Utc>) -> Self {
        let needs = NeedType::ALL
            .into_iter()
            .map(|t| (t, Need::with_defaults(t, config, now)))
            .collect();
        Self {
            character,
            needs,
            config: config.clone(),
        }
    }

    /// Rebuild a store from persisted needs.
    #[must_use]
    pub fn from_needs(character: CharacterId, needs: Vec<Need>, config: &NeedsConfig) -> Self {
        Self {
            character,
            needs: needs.into_iter().map(|n| (n.need_type, n)).collect(),
            config: config.clone(),
        }
    }

    /// Owning character.
    #[must_use]
    pub fn character(&self) -> CharacterId {
        self.character
    }

    /// Look up a need.
    #[must_use]
    pub fn get(&self, need_type: NeedType) -> Option<&Need> {
        self.needs.get(&need_type)
    }

    /// Iterate over every need, active or not.
    pub fn iter(&self) -> impl Iterator<Item = &Need> {
        self.needs.values()
    }

    /// Current value of a need, or 0 if the character lacks it.
    #[must_use]
    pub fn value(&self, need_type: NeedType) -> f32 {
        self.get(need_type).map_or(0.0, |n| n.current_value)
    }

    /// Needs that count as unmet for frustration scoring.
    #[must_use]
    pub fn unmet_count(&self) -> usize {
        self.needs.values().filter(|n| n.is_unmet()).count()
    }

    /// Active needs ordered by dynamic priority, highest first.
    #[must_use]
    pub fn top_by_dynamic_priority(&self, n: usize) -> Vec<&Need> {
        let mut needs: Vec<&Need> = self.needs.values().filter(|n| n.active).collect();
        needs.sort_by(|a, b| b.dynamic_priority.total_cmp(&a.dynamic_priority));
        needs.truncate(n);
        needs
    }

    /// Set the per-character growth multiplier of a need.
    pub fn set_accumulation_rate(&mut self, need_type: NeedType, rate: f32) {
        if let Some(need) = self.need_mut(need_type) {
            need.individual_accumulation_rate = rate.max(0.0);
        }
    }

    /// Relate `source` to `target`. Without an explicit coefficient the
    /// configured default is used.
    pub fn relate(&mut self, source: NeedType, target: NeedType, coefficient: Option<f32>) {
        let c = coefficient.unwrap_or(self.config.default_influence_coefficient);
        if let Some(need) = self.need_mut(source) {
            need.influence_coefficients.insert(target, c);
        }
    }

    /// Advance every active, unblocked need by `hours`.
    ///
    /// Expired blocks are lifted first and the need grows only for the time
    /// since the block ended. Calm needs shed frustration at `decay_rate`.
    pub fn grow(&mut self, hours: f32, now: DateTime<Utc>) -> Vec<DomainEvent> {
        let mut events = Vec::new();
        if !hours.is_finite() || hours <= 0.0 {
            debug!(character = %self.character, hours, "grow skipped: no elapsed time");
            return events;
        }
        let character = self.character;
        let frustrated_threshold = self.config.frustrated_threshold;

        for need in self.needs.values_mut().filter(|n| n.active) {
            let mut effective_hours = hours;
            if need.state == NeedState::Blocked {
                match need.blocked_until {
                    Some(until) if until <= now => {
                        need.state = need.settled_state(frustrated_threshold);
                        need.blocked_until = None;
                        events.push(DomainEvent::NeedUnblocked {
                            character,
                            need: need.need_type,
                        });
                        let since = hours_between(until, now);
                        effective_hours = hours.min(since);
                    }
                    _ => continue,
                }
            }

            let delta = need.growth_rate
                * need.priority_weight()
                * need.individual_accumulation_rate
                * effective_hours;
            let old = need.set_value(need.current_value + delta);

            if need.state == NeedState::Satisfied && need.current_value > old {
                need.state = need.settled_state(frustrated_threshold);
            }
            if need.state == NeedState::Active {
                need.frustration_level =
                    (need.frustration_level - need.decay_rate * effective_hours).max(0.0);
            }
            need.last_updated = now;
            need.refresh_dynamic_priority();

            if let Some(event) = crossing(character, need, old) {
                events.push(event);
            }
        }
        events
    }

    /// Additive update with an audit reason.
    ///
    /// # Errors
    /// Returns `InvalidInput` if `delta` is not a number or the need is
    /// deactivated. Unknown needs are a logged no-op.
    pub fn update_value(
        &mut self,
        need_type: NeedType,
        delta: f32,
        reason: &str,
        now: DateTime<Utc>,
    ) -> Result<Vec<DomainEvent>> {
        if delta.is_nan() {
            return Err(AnimusError::InvalidInput(format!(
                "NaN delta for need {need_type}"
            )));
        }
        let character = self.character;
        let frustrated_threshold = self.config.frustrated_threshold;
        let Some(need) = self.need_mut(need_type) else {
            return Ok(Vec::new());
        };
        if !need.active {
            return Err(AnimusError::InvalidInput(format!(
                "need {need_type} is deactivated"
            )));
        }

        let old = need.set_value(need.current_value + delta);
        if need.state == NeedState::Satisfied && need.current_value > old {
            need.state = need.settled_state(frustrated_threshold);
        }
        need.last_updated = now;
        need.refresh_dynamic_priority();

        let mut events = vec![DomainEvent::NeedUpdated {
            character,
            need: need_type,
            old_value: old,
            new_value: need.current_value,
            reason: reason.to_string(),
        }];
        events.extend(crossing(character, need, old));
        Ok(events)
    }

    /// Satisfy a need: value to zero, state `satisfied`, trigger re-armed.
    pub fn reset(&mut self, need_type: NeedType, now: DateTime<Utc>) -> Vec<DomainEvent> {
        let character = self.character;
        let Some(need) = self.need_mut(need_type) else {
            return Vec::new();
        };
        need.current_value = 0.0;
        need.frustration_level = 0.0;
        need.blocked_until = None;
        need.state = NeedState::Satisfied;
        need.threshold_armed = true;
        need.last_updated = now;
        need.refresh_dynamic_priority();
        vec![DomainEvent::NeedReset {
            character,
            need: need_type,
        }]
    }

    /// Suspend growth for `hours`. Blocking a blocked need moves its end.
    ///
    /// # Errors
    /// Returns `InvalidInput` if `hours` is not a finite positive number or
    /// the resulting end time is out of range.
    pub fn block(
        &mut self,
        need_type: NeedType,
        hours: f32,
        reason: &str,
        now: DateTime<Utc>,
    ) -> Result<Vec<DomainEvent>> {
        if !hours.is_finite() || hours <= 0.0 {
            return Err(AnimusError::InvalidInput(format!(
                "block duration must be positive, got {hours}"
            )));
        }
        #[allow(clippy::cast_possible_truncation)]
        let until = Duration::try_seconds((f64::from(hours) * 3600.0) as i64)
            .and_then(|d| now.checked_add_signed(d))
            .ok_or_else(|| {
                AnimusError::InvalidInput(format!("block duration out of range: {hours} hours"))
            })?;
        let character = self.character;
        let Some(need) = self.need_mut(need_type) else {
            return Ok(Vec::new());
        };
        need.state = NeedState::Blocked;
        need.blocked_until = Some(until);
        need.last_updated = now;
        Ok(vec![DomainEvent::NeedBlocked {
            character,
            need: need_type,
            until,
            reason: reason.to_string(),
        }])
    }

    /// Resume growth from the paused value.
    pub fn unblock(&mut self, need_type: NeedType, now: DateTime<Utc>) -> Vec<DomainEvent> {
        let character = self.character;
        let frustrated_threshold = self.config.frustrated_threshold;
        let Some(need) = self.need_mut(need_type) else {
            return Vec::new();
        };
        if need.state != NeedState::Blocked {
            return Vec::new();
        }
        need.state = need.settled_state(frustrated_threshold);
        need.blocked_until = None;
        need.last_updated = now;
        vec![DomainEvent::NeedUnblocked {
            character,
            need: need_type,
        }]
    }

    /// Remove a need from every sweep. The record is kept.
    pub fn deactivate(&mut self, need_type: NeedType) -> Vec<DomainEvent> {
        let character = self.character;
        match self.need_mut(need_type) {
            Some(need) if need.active => {
                need.active = false;
                vec![DomainEvent::NeedDeactivated {
                    character,
                    need: need_type,
                }]
            }
            _ => Vec::new(),
        }
    }

    /// Raise a need's frustration after a failed action.
    pub fn record_failure(&mut self, need_type: NeedType, now: DateTime<Utc>) -> Vec<DomainEvent> {
        let character = self.character;
        let step = self.config.need_frustration_step;
        let frustrated_threshold = self.config.frustrated_threshold;
        let Some(need) = self.need_mut(need_type) else {
            return Vec::new();
        };
        need.frustration_level = (need.frustration_level + step).min(100.0);
        if need.state != NeedState::Blocked {
            need.state = need.settled_state(frustrated_threshold);
        }
        need.last_updated = now;
        need.refresh_dynamic_priority();
        vec![DomainEvent::FrustrationIncreased {
            character,
            need: need_type,
            level: need.frustration_level,
        }]
    }

    /// Push frustration from `source` onto its related needs, one hop only.
    pub fn propagate_influence(&mut self, source: NeedType, now: DateTime<Utc>) -> Vec<DomainEvent> {
        let character = self.character;
        let frustrated_threshold = self.config.frustrated_threshold;
        let Some(src) = self.needs.get(&source) else {
            warn!(character = %character, need = %source, "influence from unknown need");
            return Vec::new();
        };
        if !src.active {
            return Vec::new();
        }
        let sign_magnitude = match src.state {
            NeedState::Blocked | NeedState::Frustrated => src.frustration_level * 0.1,
            NeedState::Satisfied => -10.0,
            NeedState::Active => return Vec::new(),
        };
        let related: Vec<(NeedType, f32)> = src
            .influence_coefficients
            .iter()
            .map(|(&t, &c)| (t, c))
            .collect();

        let mut events = Vec::new();
        for (target_type, coefficient) in related {
            if target_type == source {
                continue;
            }
            let Some(target) = self.needs.get_mut(&target_type) else {
                continue;
            };
            if !target.active {
                continue;
            }
            let before = target.frustration_level;
            target.frustration_level =
                (before + coefficient * sign_magnitude).clamp(0.0, 100.0);
            let applied = target.frustration_level - before;
            if applied.abs() <= f32::EPSILON {
                continue;
            }
            if matches!(target.state, NeedState::Active | NeedState::Frustrated) {
                target.state = target.settled_state(frustrated_threshold);
            }
            target.last_updated = now;
            target.refresh_dynamic_priority();
            events.push(DomainEvent::NeedInfluenced {
                character,
                source,
                target: target_type,
                delta: applied,
            });
        }
        events
    }

    fn need_mut(&mut self, need_type: NeedType) -> Option<&mut Need> {
        let need = self.needs.get_mut(&need_type);
        if need.is_none() {
            warn!(character = %self.character, need = %need_type, "need not found, ignoring");
        }
        need
    }
}

/// Edge-triggered threshold check after a value change.
fn crossing(character: CharacterId, need: &mut Need, old: f32) -> Option<DomainEvent> {
    if need.threshold_armed && old < need.threshold && need.current_value >= need.threshold {
        need.threshold_armed = false;
        debug!(character = %character, need = %need.need_type, value = need.current_value, "threshold crossed");
        Some(DomainEvent::NeedThresholdReached {
            character,
            need: need.need_type,
            value: need.current_value,
            threshold: need.threshold,
        })
    } else {
        None
    }
}

#[allow(clippy::cast_precision_loss)]
fn hours_between(from: DateTime<Utc>, to: DateTime<Utc>) -> f32 {
    ((to - from).num_milliseconds().max(0) as f64 / 3_600_000.0) as f32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::count_named;

    fn store() -> (NeedStore, DateTime<Utc>) {
        let now = Utc::now();
        (
            NeedStore::with_defaults(CharacterId::new(), &NeedsConfig::default(), now),
            now,
        )
    }

    #[test]
    fn growth_uses_priority_weight() {
        let (mut needs, now) = store();
        // Communication: 8/h × 7/5 = 11.2 per hour.
        needs.grow(1.0, now);
        assert!((needs.value(NeedType::Communication) - 11.2).abs() < 1e-4);
    }

    #[test]
    fn growth_clamps_at_max() {
        let (mut needs, now) = store();
        needs.grow(1_000.0, now);
        for need in needs.iter() {
            assert!(need.current_value <= need.max_value);
        }
    }

    #[test]
    fn threshold_is_edge_triggered() {
        let (mut needs, now) = store();
        needs
            .update_value(NeedType::Rest, 65.0, "test", now)
            .expect("valid");
        let up = needs
            .update_value(NeedType::Rest, 10.0, "test", now)
            .expect("valid");
        assert_eq!(count_named(&up, "need.threshold_reached"), 1);

        needs
            .update_value(NeedType::Rest, 5.0, "test", now)
            .expect("valid");
        let again = needs
            .update_value(NeedType::Rest, 5.0, "test", now)
            .expect("valid");
        assert_eq!(count_named(&again, "need.threshold_reached"), 0);
    }

    #[test]
    fn reset_rearms_threshold() {
        let (mut needs, now) = store();
        needs.update_value(NeedType::Rest, 75.0, "t", now).expect("valid");
        needs.reset(NeedType::Rest, now);
        assert_eq!(needs.get(NeedType::Rest).map(|n| n.state), Some(NeedState::Satisfied));
        let events = needs.update_value(NeedType::Rest, 80.0, "t", now).expect("valid");
        assert_eq!(count_named(&events, "need.threshold_reached"), 1);
        assert_eq!(needs.get(NeedType::Rest).map(|n| n.state), Some(NeedState::Active));
    }

    #[test]
    fn nan_delta_is_rejected() {
        let (mut needs, now) = store();
        let err = needs.update_value(NeedType::Rest, f32::NAN, "t", now).unwrap_err();
        assert!(matches!(err, AnimusError::InvalidInput(_)));
        assert!(needs.value(NeedType::Rest).abs() < f32::EPSILON);
    }

    #[test]
    fn direct_update_is_audited_and_clamped() {
        let (mut needs, now) = store();
        let events = needs
            .update_value(NeedType::Security, -40.0, "reassured", now)
            .expect("valid");
        match &events[0] {
            DomainEvent::NeedUpdated { new_value, reason, .. } => {
                assert!(new_value.abs() < f32::EPSILON);
                assert_eq!(reason, "reassured");
            }
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[test]
    fn blocked_need_keeps_value_and_resumes() {
        let (mut needs, now) = store();
        needs.update_value(NeedType::Knowledge, 30.0, "t", now).expect("valid");
        needs.block(NeedType::Knowledge, 2.0, "busy", now).expect("valid");
        needs.grow(1.0, now + Duration::hours(1));
        assert!((needs.value(NeedType::Knowledge) - 30.0).abs() < 1e-4);

        needs.unblock(NeedType::Knowledge, now + Duration::hours(1));
        needs.grow(1.0, now + Duration::hours(2));
        // Knowledge: 3/h × 5/5.
        assert!((needs.value(NeedType::Knowledge) - 33.0).abs() < 1e-4);
    }

    #[test]
    fn expired_block_lifts_and_grows_only_after_expiry() {
        let (mut needs, now) = store();
        needs.block(NeedType::Knowledge, 1.0, "busy", now).expect("valid");
        let events = needs.grow(2.0, now + Duration::hours(2));
        assert_eq!(count_named(&events, "need.unblocked"), 1);
        assert!((needs.value(NeedType::Knowledge) - 3.0).abs() < 1e-3);
    }

    #[test]
    fn bad_max_value_clamps_without_panicking() {
        let now = Utc::now();
        for max_value in [-1.0, f32::NAN] {
            let config = NeedsConfig {
                max_value,
                ..NeedsConfig::default()
            };
            let mut needs = NeedStore::with_defaults(CharacterId::new(), &config, now);
            needs.update_value(NeedType::Rest, 10.0, "t", now).expect("valid");
            needs.grow(1.0, now);
            assert!(needs.value(NeedType::Rest).abs() < f32::EPSILON);
        }
    }

    #[test]
    fn invalid_block_duration_is_rejected() {
        let (mut needs, now) = store();
        assert!(needs.block(NeedType::Rest, -1.0, "t", now).is_err());
        assert!(needs.block(NeedType::Rest, f32::INFINITY, "t", now).is_err());
    }

    #[test]
    fn out_of_range_block_duration_is_rejected_without_side_effects() {
        let (mut needs, now) = store();
        for hours in [1.0e10, f32::MAX] {
            let err = needs.block(NeedType::Rest, hours, "t", now).unwrap_err();
            assert!(matches!(err, AnimusError::InvalidInput(_)));
        }
        let rest = needs.get(NeedType::Rest).expect("need");
        assert_eq!(rest.state, NeedState::Active);
        assert!(rest.blocked_until.is_none());

        // A long but representable block still works.
        needs.block(NeedType::Rest, 24.0 * 365.0 * 100.0, "t", now).expect("valid");
        assert_eq!(needs.get(NeedType::Rest).expect("need").state, NeedState::Blocked);
    }

    #[test]
    fn influence_from_frustrated_source_is_single_hop() {
        let (mut needs, now) = store();
        for _ in 0..4 {
            needs.record_failure(NeedType::Communication, now);
        }
        let comm = needs.get(NeedType::Communication).expect("need");
        assert_eq!(comm.state, NeedState::Frustrated);
        assert!((comm.frustration_level - 60.0).abs() < 1e-4);

        let events = needs.propagate_influence(NeedType::Communication, now);
        // Attention 0.6 × 60 × 0.1 = 3.6, Acceptance 0.4 × 60 × 0.1 = 2.4.
        assert_eq!(events.len(), 2);
        let attention = needs.get(NeedType::Attention).expect("need");
        assert!((attention.frustration_level - 3.6).abs() < 1e-4);
        // Attention relates back to Communication, but nothing recursed.
        let comm = needs.get(NeedType::Communication).expect("need");
        assert!((comm.frustration_level - 60.0).abs() < 1e-4);
    }

    #[test]
    fn satisfied_source_relieves_targets() {
        let (mut needs, now) = store();
        for _ in 0..2 {
            needs.record_failure(NeedType::Attention, now);
        }
        needs.reset(NeedType::Communication, now);
        needs.propagate_influence(NeedType::Communication, now);
        // 30 − 0.6 × 10.
        let attention = needs.get(NeedType::Attention).expect("need");
        assert!((attention.frustration_level - 24.0).abs() < 1e-4);
    }

    #[test]
    fn relate_uses_default_coefficient() {
        let (mut needs, now) = store();
        needs.relate(NeedType::Rest, NeedType::Security, None);
        needs.block(NeedType::Rest, 1.0, "t", now).expect("valid");
        for _ in 0..2 {
            needs.record_failure(NeedType::Rest, now);
        }
        let events = needs.propagate_influence(NeedType::Rest, now);
        // 0.5 × 30 × 0.1 on Security.
        let security = needs.get(NeedType::Security).expect("need");
        assert!((security.frustration_level - 1.5).abs() < 1e-4);
        assert_eq!(count_named(&events, "need.influenced"), 2);
    }

    #[test]
    fn deactivated_need_is_skipped() {
        let (mut needs, now) = store();
        let events = needs.deactivate(NeedType::Freedom);
        assert_eq!(count_named(&events, "need.deactivated"), 1);
        needs.grow(10.0, now);
        assert!(needs.value(NeedType::Freedom).abs() < f32::EPSILON);
        assert!(needs.get(NeedType::Freedom).is_some());

        let err = needs.update_value(NeedType::Freedom, 10.0, "t", now).unwrap_err();
        assert!(matches!(err, AnimusError::InvalidInput(_)));
        assert!(needs.value(NeedType::Freedom).abs() < f32::EPSILON);
    }

    #[test]
    fn dynamic_priority_tracks_pressure() {
        let (mut needs, now) = store();
        let before = needs.get(NeedType::Rest).expect("need").dynamic_priority;
        needs.update_value(NeedType::Rest, 50.0, "t", now).expect("valid");
        let after = needs.get(NeedType::Rest).expect("need").dynamic_priority;
        assert!((before - 6.0).abs() < 1e-4);
        assert!((after - 9.0).abs() < 1e-4);
    }
}
