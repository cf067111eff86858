//! Configuration for the animus state engine.
//!
//! Maps directly to `animus.toml`. Built once at startup and shared by
//! reference with every subsystem; nothing here is read from the environment.

use serde::{Deserialize, Serialize};

/// Top-level animus configuration, loadable from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnimusConfig {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,
    /// Need dynamics tuning.
    #[serde(default)]
    pub needs: NeedsConfig,
    /// Emotional impact tuning.
    #[serde(default)]
    pub emotion: EmotionConfig,
    /// Frustration scoring and debuff tuning.
    #[serde(default)]
    pub frustration: FrustrationConfig,
    /// Motivation and action execution.
    #[serde(default)]
    pub actions: ActionConfig,
    /// Background sweep periods.
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    /// Per-message coordination.
    #[serde(default)]
    pub coordinator: CoordinatorConfig,
    /// Snapshot persistence.
    #[serde(default)]
    pub persistence: PersistenceConfig,
}

impl AnimusConfig {
    /// Load configuration from a TOML string.
    ///
    /// # Errors
    /// Returns `AnimusError::Config` if the TOML is invalid or a value is out
    /// of range.
    pub fn from_toml(toml_str: &str) -> crate::error::Result<Self> {
        let config: Self =
            toml::from_str(toml_str).map_err(|e| crate::AnimusError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Check numeric ranges that the engine relies on.
    ///
    /// # Errors
    /// Returns `AnimusError::Config` naming the first offending field.
    pub fn validate(&self) -> crate::error::Result<()> {
        positive("needs.max_value", self.needs.max_value)?;
        non_negative("needs.frustrated_threshold", self.needs.frustrated_threshold)?;
        non_negative("needs.need_frustration_step", self.needs.need_frustration_step)?;
        non_negative(
            "needs.default_influence_coefficient",
            self.needs.default_influence_coefficient,
        )?;
        positive("emotion.default_fade_rate", self.emotion.default_fade_rate)?;
        if let Some(rate) = self.coordinator.message_impact_fade_rate {
            positive("coordinator.message_impact_fade_rate", rate)?;
        }
        non_negative(
            "frustration.negative_feedback_intensity",
            self.frustration.negative_feedback_intensity,
        )?;
        non_negative(
            "frustration.sustained_negative_minutes",
            self.frustration.sustained_negative_minutes,
        )?;
        non_negative("actions.initiative_intensity", self.actions.initiative_intensity)?;
        non_negative(
            "coordinator.action_urgency_threshold",
            self.coordinator.action_urgency_threshold,
        )?;
        for (field, secs) in [
            ("emotion.fade_tick_secs", self.emotion.fade_tick_secs),
            ("scheduler.short_period_secs", self.scheduler.short_period_secs),
            ("scheduler.medium_period_secs", self.scheduler.medium_period_secs),
            ("scheduler.long_period_secs", self.scheduler.long_period_secs),
        ] {
            if secs == 0 {
                return Err(crate::AnimusError::Config(format!("{field} must be at least 1")));
            }
        }
        Ok(())
    }

    /// Fade rate for impacts built from message analysis: the coordinator
    /// override if set, otherwise the emotion default.
    #[must_use]
    pub fn message_impact_fade_rate(&self) -> f32 {
        self.coordinator
            .message_impact_fade_rate
            .unwrap_or(self.emotion.default_fade_rate)
    }

    /// Load configuration from a TOML file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &std::path::Path) -> crate::error::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }
}

// ---------------------------------------------------------------------------
// Sub-configs
// ---------------------------------------------------------------------------

/// General system settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Log level: trace, debug, info, warn, error.
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Emit logs as JSON lines instead of human-readable text.
    #[serde(default)]
    pub json_logs: bool,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
        }
    }
}

/// Need dynamics configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NeedsConfig {
    /// Upper bound of every need value.
    #[serde(default = "default_100_f32")]
    pub max_value: f32,
    /// Need frustration level at which a need turns `frustrated`.
    #[serde(default = "default_50_f32")]
    pub frustrated_threshold: f32,
    /// Frustration points added to a need when an action on it fails.
    #[serde(default = "default_15_f32")]
    pub need_frustration_step: f32,
    /// Coefficient used for related needs that carry no explicit coefficient.
    #[serde(default = "default_0_5")]
    pub default_influence_coefficient: f32,
}

impl Default for NeedsConfig {
    fn default() -> Self {
        Self {
            max_value: 100.0,
            frustrated_threshold: 50.0,
            need_frustration_step: 15.0,
            default_influence_coefficient: 0.5,
        }
    }
}

/// Emotional impact configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmotionConfig {
    /// Fade rate applied when an impact does not specify one (%/hour).
    #[serde(default = "default_60_f32")]
    pub default_fade_rate: f32,
    /// Seconds between fade ticks of a single impact.
    #[serde(default = "default_60_u64")]
    pub fade_tick_secs: u64,
    /// Upper bound on concurrently active impacts per character.
    #[serde(default = "default_32")]
    pub max_active_impacts: usize,
}

impl Default for EmotionConfig {
    fn default() -> Self {
        Self {
            default_fade_rate: 60.0,
            fade_tick_secs: 60,
            max_active_impacts: 32,
        }
    }
}

/// Frustration scoring configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrustrationConfig {
    /// Window for counting failed actions and negative social signals.
    #[serde(default = "default_60_u64")]
    pub signal_window_minutes: u64,
    /// Saturated internal intensity above which a negative emotion feeds back.
    #[serde(default = "default_80_f32")]
    pub negative_feedback_intensity: f32,
    /// Minutes the negative emotion must persist before escalating.
    #[serde(default = "default_10_f32")]
    pub sustained_negative_minutes: f32,
}

impl Default for FrustrationConfig {
    fn default() -> Self {
        Self {
            signal_window_minutes: 60,
            negative_feedback_intensity: 80.0,
            sustained_negative_minutes: 10.0,
        }
    }
}

/// Motivation and action configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionConfig {
    /// Execute the top motivation automatically when a threshold is crossed.
    #[serde(default = "default_true")]
    pub auto_execute: bool,
    /// Motivation intensity (0–1) at which a social need requests initiative.
    #[serde(default = "default_0_8")]
    pub initiative_intensity: f32,
    /// Recent actions kept per character for snapshots and context.
    #[serde(default = "default_20_usize")]
    pub history_len: usize,
}

impl Default for ActionConfig {
    fn default() -> Self {
        Self {
            auto_execute: true,
            initiative_intensity: 0.8,
            history_len: 20,
        }
    }
}

/// Background sweep periods.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Need growth sweep.
    #[serde(default = "default_60_u64")]
    pub short_period_secs: u64,
    /// Frustration analysis and motivation sweep.
    #[serde(default = "default_900")]
    pub medium_period_secs: u64,
    /// Snapshot sweep.
    #[serde(default = "default_1800")]
    pub long_period_secs: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            short_period_secs: 60,
            medium_period_secs: 900,
            long_period_secs: 1800,
        }
    }
}

/// Per-message coordination settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoordinatorConfig {
    /// Text returned when the response generator fails.
    #[serde(default = "default_fallback")]
    pub fallback_response: String,
    /// Urgency (0–1) at or above which a message triggers a motivation pass.
    #[serde(default = "default_0_5")]
    pub action_urgency_threshold: f32,
    /// Fade rate for impacts created from message analysis (%/hour);
    /// `emotion.default_fade_rate` when unset.
    #[serde(default)]
    pub message_impact_fade_rate: Option<f32>,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            fallback_response: default_fallback(),
            action_urgency_threshold: 0.5,
            message_impact_fade_rate: None,
        }
    }
}

/// Persistence / snapshot configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistenceConfig {
    /// Path of the SQLite database; `None` disables snapshots.
    #[serde(default)]
    pub path: Option<String>,
    /// Use WAL mode for concurrent reads.
    #[serde(default = "default_true")]
    pub wal_mode: bool,
    /// Detect corruption via checksums.
    #[serde(default = "default_true")]
    pub checksum_enabled: bool,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            path: None,
            wal_mode: true,
            checksum_enabled: true,
        }
    }
}

fn positive(field: &str, value: f32) -> crate::error::Result<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(crate::AnimusError::Config(format!("{field} must be a positive number, got {value}")))
    }
}

fn non_negative(field: &str, value: f32) -> crate::error::Result<()> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(crate::AnimusError::Config(format!("{field} must be a non-negative number, got {value}")))
    }
}

// ---------------------------------------------------------------------------
// Serde default helpers
// ---------------------------------------------------------------------------

fn default_true() -> bool { true }
fn default_log_level() -> String { "info".to_string() }
fn default_fallback() -> String { "Sorry, I lost my train of thought. Could you say that again?".to_string() }
fn default_0_5() -> f32 { 0.5 }
fn default_0_8() -> f32 { 0.8 }
fn default_10_f32() -> f32 { 10.0 }
fn default_15_f32() -> f32 { 15.0 }
fn default_50_f32() -> f32 { 50.0 }
fn default_60_f32() -> f32 { 60.0 }
fn default_80_f32() -> f32 { 80.0 }
fn default_100_f32() -> f32 { 100.0 }
fn default_20_usize() -> usize { 20 }
fn default_32() -> usize { 32 }
fn default_60_u64() -> u64 { 60 }
fn default_900() -> u64 { 900 }
fn default_1800() -> u64 { 1800 }

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml_yields_defaults() {
        let config = AnimusConfig::from_toml("").expect("empty config");
        assert_eq!(config.scheduler.short_period_secs, 60);
        assert!((config.needs.max_value - 100.0).abs() < f32::EPSILON);
        assert!(config.persistence.path.is_none());
    }

    #[test]
    fn partial_toml_overrides_fields() {
        let config = AnimusConfig::from_toml(
            r#"
            [scheduler]
            medium_period_secs = 600

            [coordinator]
            fallback_response = "..."
            "#,
        )
        .expect("valid config");
        assert_eq!(config.scheduler.medium_period_secs, 600);
        assert_eq!(config.scheduler.long_period_secs, 1800);
        assert_eq!(config.coordinator.fallback_response, "...");
    }

    #[test]
    fn invalid_toml_is_config_error() {
        let err = AnimusConfig::from_toml("[needs\nmax_value = ").unwrap_err();
        assert!(matches!(err, crate::AnimusError::Config(_)));
    }

    #[test]
    fn out_of_range_values_are_config_errors() {
        for toml in [
            "[needs]\nmax_value = -1.0",
            "[needs]\nmax_value = nan",
            "[needs]\nfrustrated_threshold = inf",
            "[emotion]\ndefault_fade_rate = 0.0",
            "[coordinator]\nmessage_impact_fade_rate = -5.0",
            "[scheduler]\nshort_period_secs = 0",
        ] {
            let err = AnimusConfig::from_toml(toml).unwrap_err();
            assert!(matches!(err, crate::AnimusError::Config(_)), "{toml}");
        }
    }

    #[test]
    fn message_impact_fade_rate_falls_back_to_emotion_default() {
        let config = AnimusConfig::from_toml("[emotion]\ndefault_fade_rate = 30.0").expect("valid");
        assert!(config.coordinator.message_impact_fade_rate.is_none());
        assert!((config.message_impact_fade_rate() - 30.0).abs() < f32::EPSILON);

        let config = AnimusConfig::from_toml(
            "[emotion]\ndefault_fade_rate = 30.0\n[coordinator]\nmessage_impact_fade_rate = 90.0",
        )
        .expect("valid");
        assert!((config.message_impact_fade_rate() - 90.0).abs() < f32::EPSILON);
    }
}
