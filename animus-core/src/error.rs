//! Error types for the animus core library.

use thiserror::Error;

use crate::types::{ActionId, CharacterId, NeedType};

/// Top-level error type for all animus operations.
#[derive(Error, Debug)]
pub enum AnimusError {
    /// No character with this ID is provisioned.
    #[error("Character not found: {0}")]
    CharacterNotFound(CharacterId),

    /// The character has no need of this type.
    #[error("Need not found: {need} for character {character}")]
    NeedNotFound {
        /// Owning character.
        character: CharacterId,
        /// Missing need type.
        need: NeedType,
    },

    /// A value that cannot be clamped into range (NaN, unknown name, ...).
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A caller broke an API contract (e.g. negative resource cost).
    #[error("Contract violation: {0}")]
    ContractViolation(String),

    /// The resource need does not hold enough value to pay for an action.
    #[error("Insufficient {resource}: need {required}, have {available}")]
    InsufficientResource {
        /// Need acting as the resource pool.
        resource: NeedType,
        /// Cost of the action.
        required: f32,
        /// Current value of the resource need.
        available: f32,
    },

    /// A second action was submitted while one is still executing.
    #[error("Character {character} already has action {in_flight} in progress")]
    ActionInProgress {
        /// Owning character.
        character: CharacterId,
        /// The action currently in flight.
        in_flight: ActionId,
    },

    /// An external collaborator (analysis, generation, storage) failed.
    #[error("External failure: {0}")]
    ExternalFailure(String),

    /// The character's actor has stopped and no longer accepts commands.
    #[error("Character actor unavailable: {0}")]
    ActorUnavailable(CharacterId),

    /// Serialization or deserialization failure.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// SQLite persistence error.
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Generic I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience Result type alias.
pub type Result<T> = std::result::Result<T, AnimusError>;
