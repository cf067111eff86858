//! # Animus Core Library
//!
//! Psychological state engine for simulated characters.
//!
//! Every character owns a [`CharacterState`] that ties four subsystems
//! together:
//!
//! - **Needs**: eight drives that grow over time and fire once when they
//!   cross their threshold ([`needs::NeedStore`])
//! - **Emotion**: stacked, fading impacts resolved into one primary and
//!   optional secondary emotion ([`emotion::EmotionEngine`])
//! - **Frustration**: a score over unmet needs, failures and social
//!   rejection, mapped to a level and behaviour patterns
//!   ([`frustration::FrustrationEngine`])
//! - **Motivation**: ranking pressing needs and gating the actions that
//!   serve them ([`motivation::MotivationPlanner`], [`motivation::ActionGate`])
//!
//! The core is synchronous and deterministic. Time is passed in and
//! randomness comes from a seeded generator, so every mutation can be
//! replayed in tests. Operations return [`character::Effects`]: the events
//! that happened and the timers the caller should arm.

#![deny(clippy::unwrap_used)]
#![deny(missing_docs)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod character;
pub mod config;
pub mod emotion;
pub mod error;
pub mod events;
pub mod frustration;
pub mod metrics;
pub mod motivation;
pub mod needs;
pub mod persistence;
pub mod types;

pub use character::{BehaviorContext, CharacterSnapshot, CharacterState, Effects, Timer};
pub use config::AnimusConfig;
pub use error::{AnimusError, Result};
pub use events::{DomainEvent, EventBus};
pub use types::*;
