//! # animus-runtime: Concurrency Shell
//!
//! Drives [`animus_core::CharacterState`] values from async code:
//!   - [`actor`]: one task per character; every mutation goes through its mailbox
//!   - [`registry`]: the live characters of the process
//!   - [`scheduler`]: short, medium and long background sweeps
//!   - [`coordinator`]: the per-message pipeline (analysis, four isolated
//!     update branches, reply)
//!   - [`telemetry`]: log subscriber setup
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! # async fn demo() {
//! use std::sync::Arc;
//! use animus_core::{AnimusConfig, CharacterProfile};
//! use animus_llm::StaticResponder;
//! use animus_runtime::{CharacterRegistry, MessageCoordinator};
//!
//! let registry = Arc::new(CharacterRegistry::new(Arc::new(AnimusConfig::default())));
//! let mira = registry.provision(CharacterProfile::new("Mira", "An archivist."), None);
//! let canned = Arc::new(StaticResponder::default().with_reply("Hello."));
//! let coordinator = MessageCoordinator::new(Arc::clone(&registry), canned.clone(), canned);
//! let outcome = coordinator.process_message(mira.id(), "user-1", "hi").await;
//! println!("{}", outcome.response);
//! # }
//! ```

#![deny(clippy::unwrap_used)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod actor;
pub mod clock;
pub mod coordinator;
pub mod registry;
pub mod scheduler;
pub mod telemetry;

pub use actor::{spawn_character, ActorContext, CharacterHandle};
pub use clock::Clock;
pub use coordinator::{Branch, BranchFailure, MessageCoordinator, MessageOutcome, Stage};
pub use registry::CharacterRegistry;
pub use scheduler::{Scheduler, Sweep, SweepReport};
pub use telemetry::init_tracing;
