//! Emotional state: concurrently fading impacts merged into one state.
//!
//! Impacts live on a 0–100 scale; the resultant [`EmotionalState`] uses
//! 0–10. The merge is a saturating sum, not an average, so simultaneous
//! triggers compound:
//!
//!   intensity = round(min(100, Σ impact.intensity) / 10)
//!
//! An impact fades linearly against its *original* intensity:
//!
//!   loss per minute = fade_rate / 60 × original / 100
//!
//! so every impact lives `6000 / fade_rate` minutes regardless of how strong
//! it started. With no impacts left the state falls back to the baseline
//! set by direct emotion updates (neutral until one arrives).

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::EmotionConfig;
use crate::error::{AnimusError, Result};
use crate::events::DomainEvent;
use crate::types::{CharacterId, Emotion, ImpactId};

/// Intensity at or below which an impact counts as extinct.
const EXTINCT: f32 = 1e-3;

// ---------------------------------------------------------------------------
// State and impacts
// ---------------------------------------------------------------------------

/// Resultant emotional state of a character.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmotionalState {
    /// Dominant emotion.
    pub primary: Emotion,
    /// Next strongest distinct emotion.
    pub secondary: Option<Emotion>,
    /// Overall intensity, 0–10.
    pub intensity: u8,
    /// Human-readable summary; not load-bearing.
    pub description: String,
}

impl EmotionalState {
    /// The neutral baseline.
    #[must_use]
    pub fn neutral() -> Self {
        Self::new(Emotion::Neutral, None, 0)
    }

    /// Build a state with a derived description.
    #[must_use]
    pub fn new(primary: Emotion, secondary: Option<Emotion>, intensity: u8) -> Self {
        let intensity = intensity.min(10);
        Self {
            primary,
            secondary,
            intensity,
            description: describe(primary, secondary, intensity),
        }
    }
}

impl Default for EmotionalState {
    fn default() -> Self {
        Self::neutral()
    }
}

/// A time-bounded contribution to the emotional state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmotionalImpact {
    /// Unique identifier; fade ticks address impacts by it.
    pub id: ImpactId,
    /// Emotion contributed.
    pub emotion: Emotion,
    /// Intensity at creation, 0–100.
    pub original_intensity: f32,
    /// Remaining intensity, 0–100.
    pub intensity: f32,
    /// Percent of the original intensity lost per hour.
    pub fade_rate: f32,
    /// Implied lifetime in minutes.
    pub duration_minutes: f32,
    /// Descriptive outward signs of the emotion.
    pub manifestations: Vec<String>,
    /// Where the impact came from (message, action, ...).
    pub source: String,
    /// Insertion order, used to break intensity ties.
    pub seq: u64,
}

impl EmotionalImpact {
    /// Create an impact with an explicit fade rate (%/hour).
    #[must_use]
    pub fn new(emotion: Emotion, intensity: f32, fade_rate: f32, source: impl Into<String>) -> Self {
        let intensity = intensity.clamp(0.0, 100.0);
        Self {
            id: ImpactId::new(),
            emotion,
            original_intensity: intensity,
            intensity,
            fade_rate,
            duration_minutes: lifetime_minutes(fade_rate),
            manifestations: manifestations(emotion),
            source: source.into(),
            seq: 0,
        }
    }

    /// Create an impact that fades out after `minutes`.
    #[must_use]
    pub fn with_duration(
        emotion: Emotion,
        intensity: f32,
        minutes: f32,
        source: impl Into<String>,
    ) -> Self {
        let fade_rate = if minutes > 0.0 { 6000.0 / minutes } else { f32::INFINITY };
        Self::new(emotion, intensity, fade_rate, source)
    }

    /// Points lost over `minutes`.
    #[must_use]
    pub fn fade_amount(&self, minutes: f32) -> f32 {
        self.fade_rate / 60.0 * self.original_intensity / 100.0 * minutes
    }
}

fn lifetime_minutes(fade_rate: f32) -> f32 {
    if fade_rate > 0.0 { 6000.0 / fade_rate } else { f32::INFINITY }
}

/// Outcome of fading one impact.
#[derive(Debug, Default)]
pub struct FadeOutcome {
    /// Events produced by the recompute.
    pub events: Vec<DomainEvent>,
    /// True when the impact is gone and its timer should stop.
    pub finished: bool,
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// Owns the active impacts and resultant state of one character.
#[derive(Debug, Clone)]
pub struct EmotionEngine {
    character: CharacterId,
    baseline: EmotionalState,
    current: EmotionalState,
    impacts: Vec<EmotionalImpact>,
    next_seq: u64,
    config: EmotionConfig,
}

impl EmotionEngine {
    /// Engine starting from the neutral baseline.
    #[must_use]
    pub fn new(character: CharacterId, config: &EmotionConfig) -> Self {
        Self {
            character,
            baseline: EmotionalState::neutral(),
            current: EmotionalState::neutral(),
            impacts: Vec::new(),
            next_seq: 0,
            config: config.clone(),
        }
    }

    /// Engine restored from a snapshotted state, used as the baseline.
    #[must_use]
    pub fn restore(character: CharacterId, config: &EmotionConfig, state: EmotionalState) -> Self {
        let mut engine = Self::new(character, config);
        engine.baseline = state.clone();
        engine.current = state;
        engine
    }

    /// Resultant state.
    #[must_use]
    pub fn state(&self) -> &EmotionalState {
        &self.current
    }

    /// State shown while no impacts are active.
    #[must_use]
    pub fn baseline(&self) -> &EmotionalState {
        &self.baseline
    }

    /// Active impacts in insertion order.
    #[must_use]
    pub fn impacts(&self) -> &[EmotionalImpact] {
        &self.impacts
    }

    /// `min(100, Σ intensity)` on the internal scale.
    #[must_use]
    pub fn saturated_intensity(&self) -> f32 {
        self.impacts.iter().map(|i| i.intensity).sum::<f32>().min(100.0)
    }

    /// Add an impact and recompute. Returns the impact's ID so the caller
    /// can schedule its fade ticks.
    ///
    /// At capacity the weakest impact is dropped first.
    ///
    /// # Errors
    /// Returns `InvalidInput` for a NaN intensity or a non-positive fade rate.
    pub fn apply_impact(
        &mut self,
        mut impact: EmotionalImpact,
    ) -> Result<(ImpactId, Vec<DomainEvent>)> {
        if impact.intensity.is_nan() {
            return Err(AnimusError::InvalidInput("NaN impact intensity".into()));
        }
        if impact.fade_rate.is_nan() || impact.fade_rate <= 0.0 {
            return Err(AnimusError::InvalidInput(format!(
                "fade rate must be positive, got {}",
                impact.fade_rate
            )));
        }

        if self.impacts.len() >= self.config.max_active_impacts.max(1) {
            if let Some(weakest) = self
                .impacts
                .iter()
                .enumerate()
                .min_by(|a, b| a.1.intensity.total_cmp(&b.1.intensity))
                .map(|(i, _)| i)
            {
                let dropped = self.impacts.remove(weakest);
                debug!(character = %self.character, impact = %dropped.id, "impact capacity reached, dropping weakest");
            }
        }

        impact.seq = self.next_seq;
        self.next_seq += 1;
        let id = impact.id;
        let trigger = format!("impact:{}", impact.emotion);
        let source = impact.source.clone();
        self.impacts.push(impact);
        let events = self.recompute(&trigger, &source);
        Ok((id, events))
    }

    /// Fade one impact by `minutes`, removing it at extinction.
    pub fn fade_impact(&mut self, id: ImpactId, minutes: f32) -> FadeOutcome {
        let Some(pos) = self.impacts.iter().position(|i| i.id == id) else {
            return FadeOutcome {
                events: Vec::new(),
                finished: true,
            };
        };
        let impact = &mut self.impacts[pos];
        impact.intensity -= impact.fade_amount(minutes.max(0.0));
        let finished = impact.intensity.is_nan() || impact.intensity <= EXTINCT;
        if finished {
            let removed = self.impacts.remove(pos);
            debug!(character = %self.character, impact = %removed.id, emotion = %removed.emotion, "impact extinct");
        }
        let trigger = if finished { "impact_expired" } else { "fade" };
        FadeOutcome {
            events: self.recompute(trigger, "timer"),
            finished,
        }
    }

    /// Fade every impact by `minutes`. Returns events and the number removed.
    pub fn fade_all(&mut self, minutes: f32) -> (Vec<DomainEvent>, usize) {
        let before = self.impacts.len();
        for impact in &mut self.impacts {
            impact.intensity -= impact.fade_amount(minutes.max(0.0));
        }
        self.impacts.retain(|i| i.intensity > EXTINCT);
        let removed = before - self.impacts.len();
        let trigger = if removed > 0 { "impact_expired" } else { "fade" };
        (self.recompute(trigger, "timer"), removed)
    }

    /// Merge active impacts into the resultant state.
    ///
    /// Primary is the strongest impact, ties going to the most recent;
    /// secondary is the strongest impact of a different emotion.
    pub fn recompute(&mut self, trigger: &str, source: &str) -> Vec<DomainEvent> {
        let next = if self.impacts.is_empty() {
            self.baseline.clone()
        } else {
            let mut ranked: Vec<&EmotionalImpact> = self.impacts.iter().collect();
            ranked.sort_by(|a, b| {
                b.intensity
                    .total_cmp(&a.intensity)
                    .then_with(|| b.seq.cmp(&a.seq))
            });
            let primary = ranked[0].emotion;
            let secondary = ranked.iter().map(|i| i.emotion).find(|e| *e != primary);
            EmotionalState::new(primary, secondary, to_state_scale(self.saturated_intensity()))
        };
        self.transition(next, trigger, source)
    }

    /// Set the baseline from raw emotion magnitudes (0–100).
    ///
    /// Primary is the largest magnitude with the first-seen entry winning
    /// ties; secondary the next distinct emotion. Intensity is
    /// `clamp(round(max / 10), 1, 10)`.
    ///
    /// Only the baseline changes. While any impact is active the visible
    /// state is derived from the impacts alone, so the update shows once the
    /// last impact has faded.
    pub fn update_from_direct_emotions(
        &mut self,
        emotions: &[(Emotion, f32)],
        source: &str,
        description: Option<&str>,
    ) -> Vec<DomainEvent> {
        let mut primary: Option<(Emotion, f32)> = None;
        for &(emotion, magnitude) in emotions.iter().filter(|(_, m)| m.is_finite()) {
            if primary.is_none_or(|(_, best)| magnitude > best) {
                primary = Some((emotion, magnitude));
            }
        }
        let Some((primary, max)) = primary else {
            debug!(character = %self.character, "no usable direct emotions");
            return Vec::new();
        };
        let mut secondary: Option<(Emotion, f32)> = None;
        for &(emotion, magnitude) in emotions.iter().filter(|(_, m)| m.is_finite()) {
            if emotion != primary && secondary.is_none_or(|(_, best)| magnitude > best) {
                secondary = Some((emotion, magnitude));
            }
        }

        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let intensity = (max / 10.0).round().clamp(1.0, 10.0) as u8;
        let mut state = EmotionalState::new(primary, secondary.map(|(e, _)| e), intensity);
        if let Some(text) = description {
            state.description = text.to_string();
        }
        self.baseline = state;
        self.recompute("direct_update", source)
    }

    /// Clear every impact and return to the neutral baseline.
    pub fn normalize(&mut self) -> Vec<DomainEvent> {
        self.impacts.clear();
        self.baseline = EmotionalState::neutral();
        let mut events = self.recompute("normalize", "explicit");
        events.push(DomainEvent::EmotionalStateNormalized {
            character: self.character,
        });
        events
    }

    fn transition(&mut self, next: EmotionalState, trigger: &str, source: &str) -> Vec<DomainEvent> {
        if next == self.current {
            return Vec::new();
        }
        let old = std::mem::replace(&mut self.current, next);
        vec![DomainEvent::EmotionalStateChanged {
            character: self.character,
            old,
            new: self.current.clone(),
            trigger: trigger.to_string(),
            source: source.to_string(),
        }]
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn to_state_scale(saturated: f32) -> u8 {
    (saturated.clamp(0.0, 100.0) / 10.0).round() as u8
}

fn describe(primary: Emotion, secondary: Option<Emotion>, intensity: u8) -> String {
    if primary == Emotion::Neutral && intensity == 0 {
        return "even and composed".to_string();
    }
    let degree = match intensity {
        0..=3 => "slightly",
        4..=6 => "noticeably",
        7..=8 => "strongly",
        _ => "overwhelmingly",
    };
    match secondary {
        Some(s) => format!("{degree} {primary}, with an undertone of {s}"),
        None => format!("{degree} {primary}"),
    }
}

fn manifestations(emotion: Emotion) -> Vec<String> {
    let signs: &[&str] = match emotion {
        Emotion::Neutral | Emotion::Calm => &["steady tone"],
        Emotion::Joy | Emotion::Excitement => &["quick replies", "exclamations", "playful wording"],
        Emotion::Interest | Emotion::Surprise => &["follow-up questions"],
        Emotion::Affection => &["warm wording", "uses the user's name"],
        Emotion::Sadness | Emotion::Loneliness => &["short replies", "slower pace"],
        Emotion::Anger | Emotion::Disgust => &["curt phrasing", "pushback"],
        Emotion::Fear | Emotion::Anxiety => &["hedging", "asks for reassurance"],
        Emotion::Shame => &["apologetic tone", "avoids the topic"],
    };
    signs.iter().map(|s| (*s).to_string()).collect()
}
