//! Live characters, keyed by ID.
//!
//! Lookups clone the handle out of the map; no map guard is ever held
//! across an `.await`.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use animus_core::character::{CharacterSnapshot, CharacterState};
use animus_core::metrics::AnimusCounters;
use animus_core::{AnimusConfig, CharacterId, CharacterProfile, EventBus};

use crate::actor::{spawn_character, ActorContext, CharacterHandle};
use crate::clock::Clock;

/// Owns every character actor of the process.
#[derive(Debug)]
pub struct CharacterRegistry {
    config: Arc<AnimusConfig>,
    ctx: ActorContext,
    handles: DashMap<CharacterId, CharacterHandle>,
    tasks: DashMap<CharacterId, JoinHandle<()>>,
}

impl CharacterRegistry {
    /// Empty registry with a fresh bus, counters and clock.
    #[must_use]
    pub fn new(config: Arc<AnimusConfig>) -> Self {
        Self::with_context(config, ActorContext::default())
    }

    /// Empty registry publishing through `ctx`.
    #[must_use]
    pub fn with_context(config: Arc<AnimusConfig>, ctx: ActorContext) -> Self {
        Self {
            config,
            ctx,
            handles: DashMap::new(),
            tasks: DashMap::new(),
        }
    }

    /// Shared configuration.
    #[must_use]
    pub fn config(&self) -> &Arc<AnimusConfig> {
        &self.config
    }

    /// Event bus all actors publish to.
    #[must_use]
    pub fn bus(&self) -> &EventBus {
        &self.ctx.bus
    }

    /// Shared counters.
    #[must_use]
    pub fn counters(&self) -> &Arc<AnimusCounters> {
        &self.ctx.counters
    }

    /// Clock all actors read.
    #[must_use]
    pub fn clock(&self) -> Clock {
        self.ctx.clock
    }

    /// Provision a new character with default needs.
    ///
    /// `seed` fixes its success draws; `None` seeds from the OS.
    pub fn provision(&self, profile: CharacterProfile, seed: Option<u64>) -> CharacterHandle {
        let state = CharacterState::new(profile, Arc::clone(&self.config), self.ctx.clock.now(), seed);
        self.insert(state)
    }

    /// Bring a character back from a snapshot.
    pub fn restore(&self, snapshot: CharacterSnapshot, seed: Option<u64>) -> CharacterHandle {
        let state = CharacterState::from_snapshot(
            snapshot,
            Arc::clone(&self.config),
            self.ctx.clock.now(),
            seed,
        );
        self.insert(state)
    }

    fn insert(&self, state: CharacterState) -> CharacterHandle {
        let id = state.id();
        let name = state.profile().name.clone();
        let (handle, task) = spawn_character(state, self.ctx.clone());
        if self.handles.insert(id, handle.clone()).is_some() {
            warn!(character = %id, "character re-provisioned, previous actor aborted");
        }
        if let Some(old_task) = self.tasks.insert(id, task) {
            old_task.abort();
        }
        info!(character = %id, %name, "character provisioned");
        handle
    }

    /// Handle for `id`. Absence is logged and returned as `None`.
    #[must_use]
    pub fn get(&self, id: CharacterId) -> Option<CharacterHandle> {
        let handle = self.handles.get(&id).map(|h| h.value().clone());
        if handle.is_none() {
            warn!(character = %id, "character not found");
        }
        handle
    }

    /// Handles of every live character.
    #[must_use]
    pub fn handles(&self) -> Vec<CharacterHandle> {
        self.handles.iter().map(|h| h.value().clone()).collect()
    }

    /// IDs of every live character.
    #[must_use]
    pub fn ids(&self) -> Vec<CharacterId> {
        self.handles.iter().map(|h| *h.key()).collect()
    }

    /// Number of live characters.
    #[must_use]
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    /// Whether no character is live.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Stop one character and wait for its actor to finish.
    ///
    /// Returns `false` when the character is unknown.
    pub async fn remove(&self, id: CharacterId) -> bool {
        let Some((_, handle)) = self.handles.remove(&id) else {
            warn!(character = %id, "remove: character not found");
            return false;
        };
        if let Err(e) = handle.shutdown().await {
            warn!(character = %id, error = %e, "actor was already stopped");
        }
        if let Some((_, task)) = self.tasks.remove(&id) {
            if let Err(e) = task.await {
                warn!(character = %id, error = %e, "actor task ended abnormally");
            }
        }
        true
    }

    /// Stop every character. Characters shut down concurrently.
    pub async fn shutdown_all(&self) {
        let ids = self.ids();
        let mut set = tokio::task::JoinSet::new();
        for id in ids {
            let Some((_, handle)) = self.handles.remove(&id) else {
                continue;
            };
            let task = self.tasks.remove(&id).map(|(_, t)| t);
            set.spawn(async move {
                let _ = handle.shutdown().await;
                if let Some(task) = task {
                    let _ = task.await;
                }
            });
        }
        let stopped = set.len();
        while set.join_next().await.is_some() {}
        info!(stopped, "all characters shut down");
    }
}
