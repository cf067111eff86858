//! State engine benchmarks.
//!
//! Targets:
//!   need_growth_pass_single ............. < 5μs
//!   frustration_analysis_single ......... < 10μs
//!   threshold_cascade_single ............ < 50μs
//!   short_sweep_100_characters .......... < 1ms

use std::sync::Arc;

use chrono::{Duration, Utc};
use criterion::{black_box, criterion_group, criterion_main, Criterion};

use animus_core::config::AnimusConfig;
use animus_core::emotion::EmotionalImpact;
use animus_core::{CharacterProfile, CharacterState, Emotion, NeedType};

fn make_character(config: &Arc<AnimusConfig>, seed: u64) -> CharacterState {
    CharacterState::new(
        CharacterProfile::new(format!("npc-{seed}"), "a market trader"),
        Arc::clone(config),
        Utc::now(),
        Some(seed),
    )
}

/// Benchmark: one growth pass over all eight needs.
fn bench_need_growth(c: &mut Criterion) {
    let config = Arc::new(AnimusConfig::default());
    let mut character = make_character(&config, 1);
    let now = Utc::now();

    c.bench_function("need_growth_pass_single", |b| {
        b.iter(|| {
            let effects = character.grow(black_box(0.01), now);
            black_box(effects);
        });
    });
}

/// Benchmark: frustration scoring with unmet needs and active patterns.
fn bench_frustration_analysis(c: &mut Criterion) {
    let mut config = AnimusConfig::default();
    config.actions.auto_execute = false;
    let config = Arc::new(config);
    let mut character = make_character(&config, 2);
    let now = Utc::now();
    for need in [NeedType::Freedom, NeedType::Knowledge, NeedType::Security] {
        let _ = character.update_need(need, 100.0, "bench", now);
    }

    c.bench_function("frustration_analysis_single", |b| {
        b.iter(|| {
            let effects = character.analyze_frustration(black_box(now));
            black_box(effects);
        });
    });
}

/// Benchmark: threshold crossing → motivation → instant action → reset.
fn bench_threshold_cascade(c: &mut Criterion) {
    let config = Arc::new(AnimusConfig::default());
    let now = Utc::now();

    c.bench_function("threshold_cascade_single", |b| {
        b.iter_batched(
            || make_character(&config, 3),
            |mut character| {
                let effects = character.update_need(NeedType::Security, black_box(90.0), "bench", now);
                black_box(effects)
            },
            criterion::BatchSize::SmallInput,
        );
    });
}

/// Benchmark: impact application plus one fade step.
fn bench_emotion_impact(c: &mut Criterion) {
    let config = Arc::new(AnimusConfig::default());
    let mut character = make_character(&config, 4);
    let now = Utc::now();

    c.bench_function("impact_apply_and_fade", |b| {
        b.iter(|| {
            let impact = EmotionalImpact::new(Emotion::Interest, black_box(40.0), 60.0, "bench");
            let id = impact.id;
            let _ = character.apply_impact(impact, now);
            let (effects, _) = character.fade_impact(id, 200.0, now);
            black_box(effects);
        });
    });
}

/// Benchmark: growth pass for 100 characters, one simulated minute.
fn bench_short_sweep(c: &mut Criterion) {
    let config = Arc::new(AnimusConfig::default());
    let mut characters: Vec<_> = (0..100).map(|i| make_character(&config, i)).collect();
    let mut now = Utc::now();

    c.bench_function("short_sweep_100_characters", |b| {
        b.iter(|| {
            now += Duration::minutes(1);
            for character in &mut characters {
                black_box(character.tick_needs(now));
            }
        });
    });
}

criterion_group!(
    benches,
    bench_need_growth,
    bench_frustration_analysis,
    bench_threshold_cascade,
    bench_emotion_impact,
    bench_short_sweep,
);
criterion_main!(benches);
