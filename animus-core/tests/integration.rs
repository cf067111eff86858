//! Integration tests: end-to-end character flows.
//!
//! Resource gating, frustration build-up, edge-triggered thresholds,
//! impact extinction and snapshot persistence, driven through the public
//! API only.

use std::sync::Arc;

use chrono::{Duration, Utc};

use animus_core::character::{CharacterState, Timer};
use animus_core::config::{AnimusConfig, PersistenceConfig};
use animus_core::emotion::{EmotionEngine, EmotionalImpact};
use animus_core::events::{count_named, DomainEvent};
use animus_core::frustration::{FrustrationLevel, SUCCESS_FLOOR};
use animus_core::motivation::{ActionStatus, ActionType, CharacterAction};
use animus_core::needs::{NeedState, NeedStore};
use animus_core::persistence::SnapshotStore;
use animus_core::types::{CharacterId, CharacterProfile, Emotion, NeedType};

fn manual_config() -> Arc<AnimusConfig> {
    let mut config = AnimusConfig::default();
    config.actions.auto_execute = false;
    Arc::new(config)
}

fn character(config: Arc<AnimusConfig>) -> CharacterState {
    CharacterState::new(
        CharacterProfile::new("Iris", "a quiet gardener"),
        config,
        Utc::now(),
        Some(11),
    )
}

// ---------------------------------------------------------------------------
// Resource gating
// ---------------------------------------------------------------------------

#[test]
fn low_rest_cannot_pay_for_expensive_action() {
    let now = Utc::now();
    let mut c = character(manual_config());
    c.update_need(NeedType::Rest, 10.0, "setup", now).expect("valid");
    let action = CharacterAction::new(ActionType::TakeRest).with_cost(30.0);
    assert!(!c.can_execute(&action).expect("non-negative cost"));
}

#[test]
fn successful_action_spends_its_cost() {
    let now = Utc::now();
    let mut c = character(manual_config());
    c.update_need(NeedType::Rest, 50.0, "setup", now).expect("valid");
    let action = CharacterAction::new(ActionType::TakeRest).with_cost(10.0);
    assert!(c.can_execute(&action).expect("non-negative cost"));

    let effects = c.execute_with_roll(action, 0.0, now).expect("admitted");
    assert_eq!(count_named(&effects.events, "motivation.executed"), 1);
    assert!((c.needs().value(NeedType::Rest) - 40.0).abs() < 1e-4);
    let last = c.gate().history().last().expect("history");
    assert_eq!(last.status, ActionStatus::Completed);
}

#[test]
fn negative_cost_is_a_contract_violation() {
    let c = character(manual_config());
    let action = CharacterAction::new(ActionType::TakeRest).with_cost(-1.0);
    assert!(c.can_execute(&action).is_err());
}

// ---------------------------------------------------------------------------
// Frustration build-up
// ---------------------------------------------------------------------------

#[test]
fn failures_and_unmet_needs_reduce_success_rate() {
    let now = Utc::now();
    let mut c = character(manual_config());
    for need in [NeedType::Freedom, NeedType::Knowledge, NeedType::SelfRealization] {
        c.update_need(need, 100.0, "setup", now).expect("valid");
    }
    assert_eq!(c.frustration().level(), FrustrationLevel::None);
    assert!((c.frustration().apply_to_action(0.9) - 0.9).abs() < f32::EPSILON);

    for _ in 0..4 {
        let action = CharacterAction::new(ActionType::TakeRest).with_cost(0.0);
        c.execute_with_roll(action, 0.999, now).expect("admitted");
    }

    assert!(c.frustration().level() >= FrustrationLevel::Moderate);
    let reduced = c.frustration().apply_to_action(0.9);
    assert!(reduced < 0.9);
    assert!(reduced >= SUCCESS_FLOOR);
    assert!(!c.frustration().record().active_patterns.is_empty());
}

#[test]
fn pattern_expiry_timer_restores_the_base_rate() {
    let now = Utc::now();
    let mut c = character(manual_config());
    for need in [NeedType::Freedom, NeedType::Knowledge] {
        c.update_need(need, 100.0, "setup", now).expect("valid");
    }
    let effects = c.analyze_frustration(now);
    let expiry = effects
        .timers
        .iter()
        .find_map(|t| match t {
            Timer::ExpirePatterns(e) => Some(*e),
            _ => None,
        })
        .expect("expiry timer");

    c.expire_patterns(expiry.generation, now + Duration::hours(2));
    assert!(c.frustration().record().active_patterns.is_empty());
    assert!((c.frustration().apply_to_action(0.9) - 0.9).abs() < f32::EPSILON);
}

// ---------------------------------------------------------------------------
// Thresholds
// ---------------------------------------------------------------------------

#[test]
fn threshold_fires_once_per_crossing() {
    let now = Utc::now();
    let config = AnimusConfig::default();
    let mut store = NeedStore::with_defaults(CharacterId::new(), &config.needs, now);

    let first = store.grow(6.0, now);
    assert_eq!(count_named(&first, "need.threshold_reached"), 1);
    let again = store.grow(1.0, now);
    assert_eq!(count_named(&again, "need.threshold_reached"), 0);

    store.reset(NeedType::Communication, now);
    assert_eq!(
        store.get(NeedType::Communication).expect("need").state,
        NeedState::Satisfied
    );
    let after_reset = store.grow(6.0, now);
    assert!(after_reset.iter().any(|e| matches!(
        e,
        DomainEvent::NeedThresholdReached { need: NeedType::Communication, .. }
    )));
}

#[test]
fn crossing_with_auto_execute_runs_one_action() {
    let now = Utc::now();
    let mut c = character(Arc::new(AnimusConfig::default()));
    let effects = c
        .update_need(NeedType::Security, 90.0, "alarm", now)
        .expect("valid");
    assert_eq!(count_named(&effects.events, "motivation.created"), 1);
    assert_eq!(count_named(&effects.events, "motivation.executed"), 1);
    assert_eq!(c.gate().history().count(), 1);
}

// ---------------------------------------------------------------------------
// Emotion
// ---------------------------------------------------------------------------

#[test]
fn impact_fades_to_extinction_and_state_returns_to_baseline() {
    let config = AnimusConfig::default();
    let mut engine = EmotionEngine::new(CharacterId::new(), &config.emotion);
    let (id, events) = engine
        .apply_impact(EmotionalImpact::new(Emotion::Joy, 50.0, 60.0, "test"))
        .expect("valid impact");
    assert_eq!(count_named(&events, "emotional_state.changed"), 1);
    assert_eq!(engine.state().primary, Emotion::Joy);

    let halfway = engine.fade_impact(id, 60.0);
    assert!(!halfway.finished);
    assert!((engine.impacts()[0].intensity - 20.0).abs() < 1e-3);

    let done = engine.fade_impact(id, 40.0);
    assert!(done.finished);
    assert!(engine.impacts().is_empty());
    assert_eq!(engine.state().primary, Emotion::Neutral);
}

// ---------------------------------------------------------------------------
// Persistence
// ---------------------------------------------------------------------------

#[test]
fn snapshot_survives_a_store_round_trip() {
    let now = Utc::now();
    let mut c = character(manual_config());
    c.update_need(NeedType::Attention, 33.0, "setup", now).expect("valid");

    let store = SnapshotStore::open_in_memory(&PersistenceConfig::default()).expect("open");
    store.save(&c.snapshot(now)).expect("save");
    let loaded = store.load(c.id()).expect("load").expect("present");

    let restored = CharacterState::from_snapshot(loaded, manual_config(), now, Some(1));
    assert!((restored.needs().value(NeedType::Attention) - 33.0).abs() < 1e-4);
    assert_eq!(restored.profile().name, "Iris");
}
