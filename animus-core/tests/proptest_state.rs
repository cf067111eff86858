//! Property-based tests for the state engine.
//!
//! Need values stay in range under any update sequence, the same seed and
//! inputs give the same character, and frustration never pushes a success
//! rate under the floor.

use std::sync::Arc;

use chrono::{TimeZone, Utc};
use proptest::prelude::*;

use animus_core::character::CharacterState;
use animus_core::config::AnimusConfig;
use animus_core::emotion::{EmotionEngine, EmotionalImpact};
use animus_core::frustration::{self, FrustrationInputs, FrustrationLevel, SUCCESS_FLOOR};
use animus_core::motivation::{ActionType, CharacterAction};
use animus_core::needs::NeedStore;
use animus_core::types::{CharacterId, CharacterProfile, Emotion, NeedType};

// ---------------------------------------------------------------------------
// Strategies
// ---------------------------------------------------------------------------

fn arb_need() -> impl Strategy<Value = NeedType> {
    prop::sample::select(NeedType::ALL.to_vec())
}

fn arb_emotion() -> impl Strategy<Value = Emotion> {
    prop::sample::select(vec![
        Emotion::Joy,
        Emotion::Calm,
        Emotion::Interest,
        Emotion::Sadness,
        Emotion::Anger,
        Emotion::Fear,
        Emotion::Loneliness,
    ])
}

// ---------------------------------------------------------------------------
// Properties
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn need_values_stay_in_range(
        updates in prop::collection::vec((arb_need(), -500.0..500.0f32), 1..40),
        hours in 0.0..48.0f32,
    ) {
        let now = Utc::now();
        let config = AnimusConfig::default();
        let mut store = NeedStore::with_defaults(CharacterId::new(), &config.needs, now);
        for (need, delta) in updates {
            store.update_value(need, delta, "prop", now).expect("finite delta");
        }
        store.grow(hours, now);
        for need in store.iter() {
            prop_assert!(need.current_value >= 0.0);
            prop_assert!(need.current_value <= need.max_value);
        }
    }

    #[test]
    fn same_seed_same_character(
        updates in prop::collection::vec((arb_need(), 0.0..100.0f32), 1..10),
        seed in any::<u64>(),
    ) {
        let now = Utc.with_ymd_and_hms(2025, 1, 1, 12, 0, 0).single().expect("valid date");
        let config = Arc::new(AnimusConfig::default());
        let profile = CharacterProfile::new("Twin", "identical");

        let mut a = CharacterState::new(profile.clone(), Arc::clone(&config), now, Some(seed));
        let mut b = CharacterState::new(profile, config, now, Some(seed));
        for &(need, delta) in &updates {
            a.update_need(need, delta, "prop", now).expect("valid");
            b.update_need(need, delta, "prop", now).expect("valid");
        }
        for need in NeedType::ALL {
            prop_assert_eq!(a.needs().value(need).to_bits(), b.needs().value(need).to_bits());
        }
        prop_assert_eq!(a.frustration().level(), b.frustration().level());
        let a_status: Vec<_> = a.gate().history().map(|x| x.status).collect();
        let b_status: Vec<_> = b.gate().history().map(|x| x.status).collect();
        prop_assert_eq!(a_status, b_status);
    }

    #[test]
    fn frustrated_rate_never_below_floor(
        unmet in 0usize..8,
        failures in 0usize..10,
        social in 0usize..10,
        base in 0.0..1.0f32,
    ) {
        let inputs = FrustrationInputs {
            unmet_needs: unmet,
            failure_signals: failures,
            negative_social_signals: social,
        };
        let level = FrustrationLevel::from_score(frustration::score(&inputs));
        prop_assert!(level <= FrustrationLevel::Critical);

        let now = Utc::now();
        let config = Arc::new({
            let mut c = AnimusConfig::default();
            c.actions.auto_execute = false;
            c
        });
        let mut c = CharacterState::new(CharacterProfile::new("P", "p"), config, now, Some(3));
        for _ in 0..failures {
            let action = CharacterAction::new(ActionType::TakeRest).with_cost(0.0);
            c.execute_with_roll(action, 0.999, now).expect("admitted");
        }
        for _ in 0..social {
            c.record_social_signal(true, now);
        }
        c.analyze_frustration(now);
        let adjusted = c.frustration().apply_to_action(base);
        if c.frustration().record().active_patterns.is_empty() {
            prop_assert!((adjusted - base).abs() < f32::EPSILON);
        } else {
            prop_assert!(adjusted >= SUCCESS_FLOOR);
            prop_assert!(adjusted <= base.max(SUCCESS_FLOOR));
        }
    }

    #[test]
    fn primary_emotion_is_the_strongest_impact(
        impacts in prop::collection::vec((arb_emotion(), 1.0..100.0f32), 1..6),
    ) {
        let config = AnimusConfig::default();
        let mut engine = EmotionEngine::new(CharacterId::new(), &config.emotion);
        for &(emotion, intensity) in &impacts {
            engine
                .apply_impact(EmotionalImpact::new(emotion, intensity, 60.0, "prop"))
                .expect("valid impact");
        }
        let strongest = impacts
            .iter()
            .map(|(_, i)| *i)
            .fold(f32::MIN, f32::max);
        let primary = engine.state().primary;
        prop_assert!(impacts
            .iter()
            .any(|(e, i)| *e == primary && (*i - strongest).abs() < f32::EPSILON));
    }
}
