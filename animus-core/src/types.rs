//! Core type definitions shared by every animus subsystem.
//!
//! Identity, need and emotion vocabularies, and the character profile.
//! All types are serializable so that character snapshots round-trip.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::AnimusError;

// ---------------------------------------------------------------------------
// Identity Types
// ---------------------------------------------------------------------------

/// Unique identifier for a simulated character.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CharacterId(pub Uuid);

impl CharacterId {
    /// Create a new random character ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for CharacterId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CharacterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for an emotional impact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ImpactId(pub Uuid);

impl ImpactId {
    /// Create a new random impact ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ImpactId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ImpactId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a character action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ActionId(pub Uuid);

impl ActionId {
    /// Create a new random action ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ActionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ActionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Needs
// ---------------------------------------------------------------------------

/// Category of a character need.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NeedType {
    /// Recovery from exertion. Doubles as the character's energy pool.
    Rest,
    /// Talking with someone.
    Communication,
    /// Being noticed.
    Attention,
    /// Being accepted as one is.
    Acceptance,
    /// Growth, creative work, competence.
    SelfRealization,
    /// Autonomy over one's own choices.
    Freedom,
    /// Learning new things.
    Knowledge,
    /// Feeling safe and stable.
    Security,
}

impl NeedType {
    /// Every need type, in provisioning order.
    pub const ALL: [Self; 8] = [
        Self::Rest,
        Self::Communication,
        Self::Attention,
        Self::Acceptance,
        Self::SelfRealization,
        Self::Freedom,
        Self::Knowledge,
        Self::Security,
    ];

    /// Stable snake_case name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Rest => "rest",
            Self::Communication => "communication",
            Self::Attention => "attention",
            Self::Acceptance => "acceptance",
            Self::SelfRealization => "self_realization",
            Self::Freedom => "freedom",
            Self::Knowledge => "knowledge",
            Self::Security => "security",
        }
    }

    /// Whether acting on this need means reaching out to another person.
    #[must_use]
    pub fn is_social(self) -> bool {
        matches!(self, Self::Communication | Self::Attention | Self::Acceptance)
    }
}

impl fmt::Display for NeedType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NeedType {
    type Err = AnimusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|n| n.as_str() == s)
            .ok_or_else(|| AnimusError::InvalidInput(format!("unknown need type: {s}")))
    }
}

// ---------------------------------------------------------------------------
// Emotions
// ---------------------------------------------------------------------------

/// Discrete emotion vocabulary used for primary/secondary state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Emotion {
    /// Baseline with no dominant feeling.
    Neutral,
    /// Happiness, delight.
    Joy,
    /// Calm contentment.
    Calm,
    /// Curiosity and engagement.
    Interest,
    /// Warmth toward someone.
    Affection,
    /// Pleasant anticipation.
    Excitement,
    /// Unexpected input, valence-free.
    Surprise,
    /// Loss, disappointment.
    Sadness,
    /// Hostility, irritation.
    Anger,
    /// Threat response.
    Fear,
    /// Worry about what comes next.
    Anxiety,
    /// Rejection of something distasteful.
    Disgust,
    /// Isolation.
    Loneliness,
    /// Self-directed discomfort.
    Shame,
}

impl Emotion {
    /// Whether this emotion counts as negative for frustration feedback.
    #[must_use]
    pub fn is_negative(self) -> bool {
        matches!(
            self,
            Self::Sadness
                | Self::Anger
                | Self::Fear
                | Self::Anxiety
                | Self::Disgust
                | Self::Loneliness
                | Self::Shame
        )
    }

    /// Stable snake_case name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Neutral => "neutral",
            Self::Joy => "joy",
            Self::Calm => "calm",
            Self::Interest => "interest",
            Self::Affection => "affection",
            Self::Excitement => "excitement",
            Self::Surprise => "surprise",
            Self::Sadness => "sadness",
            Self::Anger => "anger",
            Self::Fear => "fear",
            Self::Anxiety => "anxiety",
            Self::Disgust => "disgust",
            Self::Loneliness => "loneliness",
            Self::Shame => "shame",
        }
    }
}

impl fmt::Display for Emotion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Emotion {
    type Err = AnimusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let e = match s.to_ascii_lowercase().as_str() {
            "neutral" => Self::Neutral,
            "joy" | "happiness" => Self::Joy,
            "calm" => Self::Calm,
            "interest" | "curiosity" => Self::Interest,
            "affection" => Self::Affection,
            "excitement" => Self::Excitement,
            "surprise" => Self::Surprise,
            "sadness" => Self::Sadness,
            "anger" => Self::Anger,
            "fear" => Self::Fear,
            "anxiety" => Self::Anxiety,
            "disgust" => Self::Disgust,
            "loneliness" => Self::Loneliness,
            "shame" => Self::Shame,
            other => {
                return Err(AnimusError::InvalidInput(format!("unknown emotion: {other}")));
            }
        };
        Ok(e)
    }
}

// ---------------------------------------------------------------------------
// Character profile
// ---------------------------------------------------------------------------

/// Static description of a character, handed to the response generator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CharacterProfile {
    /// Stable identity.
    pub id: CharacterId,
    /// Display name.
    pub name: String,
    /// Free-form persona description.
    pub persona: String,
}

impl CharacterProfile {
    /// Create a profile with a fresh ID.
    #[must_use]
    pub fn new(name: impl Into<String>, persona: impl Into<String>) -> Self {
        Self {
            id: CharacterId::new(),
            name: name.into(),
            persona: persona.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn need_type_round_trips_through_str() {
        for need in NeedType::ALL {
            let parsed: NeedType = need.as_str().parse().expect("known need");
            assert_eq!(parsed, need);
        }
    }

    #[test]
    fn unknown_need_type_is_invalid_input() {
        let err = "hunger".parse::<NeedType>().unwrap_err();
        assert!(matches!(err, AnimusError::InvalidInput(_)));
    }

    #[test]
    fn emotion_aliases_parse() {
        assert_eq!("Happiness".parse::<Emotion>().expect("alias"), Emotion::Joy);
        assert!(Emotion::Anger.is_negative());
        assert!(!Emotion::Surprise.is_negative());
    }
}
