//! # animus-llm: Analysis and Response Collaborators
//!
//! The message coordinator depends on two external collaborators:
//!   - an [`AnalysisProvider`] that reads a message for need deltas, user
//!     mood, evoked emotions and urgency
//!   - a [`ResponseGenerator`] that writes the character's reply from its
//!     emotional state and behaviour context
//!
//! Default implementations talk to an LLM through [`LlmClient`]:
//!   - **Ollama** (local)
//!   - **OpenAI-compatible API**
//!   - **None** (every call fails, callers fall back)
//!
//! Every failure here is recoverable. The coordinator substitutes
//! [`MessageAnalysis::neutral`] for a failed analysis and a fixed text for a
//! failed reply.

#![deny(clippy::unwrap_used)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod client;
pub mod error;
pub mod prompt;
pub mod provider;
pub mod types;

pub use client::{LlmClient, LlmProvider, LlmSettings};
pub use error::LlmError;
pub use provider::{
    AnalysisProvider, LlmAnalysisProvider, LlmResponseGenerator, ResponseGenerator,
    StaticResponder,
};
pub use types::{AnalysisRequest, MessageAnalysis, ResponseRequest, UserMood};
