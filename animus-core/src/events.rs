//! Domain events emitted by the state engine.
//!
//! Every subsystem returns the events it produced instead of emitting them
//! into a global emitter. The character aggregate reacts to the ones that
//! cascade (threshold → motivation → action → frustration) and the runtime
//! forwards all of them to the [`EventBus`] for outside observers.
//!
//! | Event                                   | Producer          | Consumers                        |
//! |-----------------------------------------|-------------------|----------------------------------|
//! | `need.threshold_reached`                | NeedStore         | MotivationPlanner                |
//! | `need.updated` / `need.reset`           | NeedStore         | observers                        |
//! | `need.blocked` / `need.unblocked`       | NeedStore         | influence propagation            |
//! | `need.influenced`                       | NeedStore         | observers                        |
//! | `emotional_state.changed`               | EmotionEngine     | FrustrationEngine (feedback)     |
//! | `motivation.*`                          | Planner / Gate    | NeedStore (reset / frustration)  |
//! | `character.frustration_increased`       | NeedStore         | FrustrationEngine                |
//! | `behavior.pattern_activation_requested` | FrustrationEngine | response generation              |
//! | `message.initiative_requested`          | Planner / Frustr. | outer conversation layer         |

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::trace;

use crate::emotion::EmotionalState;
use crate::frustration::{FrustrationLevel, FrustrationType};
use crate::motivation::{ActionType, Motivation};
use crate::types::{CharacterId, NeedType};

/// A state-engine event, tagged by its dotted name.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum DomainEvent {
    /// A need crossed its threshold from below (edge-triggered).
    NeedThresholdReached {
        /// Owning character.
        character: CharacterId,
        /// Need that crossed.
        need: NeedType,
        /// Value after the crossing.
        value: f32,
        /// Threshold that was crossed.
        threshold: f32,
    },
    /// A need value was changed directly; the audit record of the change.
    NeedUpdated {
        /// Owning character.
        character: CharacterId,
        /// Updated need.
        need: NeedType,
        /// Value before the update.
        old_value: f32,
        /// Value after clamping.
        new_value: f32,
        /// Why the value changed.
        reason: String,
    },
    /// A need was satisfied and reset to zero.
    NeedReset {
        /// Owning character.
        character: CharacterId,
        /// Reset need.
        need: NeedType,
    },
    /// Growth of a need was suspended.
    NeedBlocked {
        /// Owning character.
        character: CharacterId,
        /// Blocked need.
        need: NeedType,
        /// When the block lapses.
        until: DateTime<Utc>,
        /// Why the need was blocked.
        reason: String,
    },
    /// Growth of a need resumed.
    NeedUnblocked {
        /// Owning character.
        character: CharacterId,
        /// Unblocked need.
        need: NeedType,
    },
    /// A need was removed from every sweep.
    NeedDeactivated {
        /// Owning character.
        character: CharacterId,
        /// Deactivated need.
        need: NeedType,
    },
    /// One need shifted another need's frustration level.
    NeedInfluenced {
        /// Owning character.
        character: CharacterId,
        /// Need whose state caused the shift.
        source: NeedType,
        /// Need whose frustration changed.
        target: NeedType,
        /// Applied change in frustration points (signed).
        delta: f32,
    },
    /// The resultant emotional state changed.
    EmotionalStateChanged {
        /// Owning character.
        character: CharacterId,
        /// State before the change.
        old: EmotionalState,
        /// State after the change.
        new: EmotionalState,
        /// What caused the change (impact, fade, direct update).
        trigger: String,
        /// Where the trigger came from.
        source: String,
    },
    /// The emotional state was forced back to neutral.
    EmotionalStateNormalized {
        /// Owning character.
        character: CharacterId,
    },
    /// A need past its threshold produced a motivation.
    MotivationThresholdReached {
        /// Owning character.
        character: CharacterId,
        /// Need behind the motivation.
        need: NeedType,
        /// Motivation intensity (0–1).
        intensity: f32,
    },
    /// A motivation was created and handed to the action gate.
    MotivationCreated {
        /// Owning character.
        character: CharacterId,
        /// The motivation.
        motivation: Motivation,
    },
    /// A motivated action finished.
    MotivationExecuted {
        /// Owning character.
        character: CharacterId,
        /// Need the action served.
        need: NeedType,
        /// Executed action.
        action: ActionType,
        /// Whether the success draw passed.
        success: bool,
    },
    /// A need's frustration level went up after a failure.
    FrustrationIncreased {
        /// Owning character.
        character: CharacterId,
        /// Frustrated need.
        need: NeedType,
        /// Need frustration level after the increase (0–100).
        level: f32,
    },
    /// The character-level frustration classification changed.
    FrustrationLevelChanged {
        /// Owning character.
        character: CharacterId,
        /// Previous level.
        old: FrustrationLevel,
        /// Current level.
        new: FrustrationLevel,
    },
    /// Behaviour patterns should be activated for response generation.
    BehaviorPatternActivationRequested {
        /// Owning character.
        character: CharacterId,
        /// Level driving the patterns.
        level: FrustrationLevel,
        /// Types that contributed a pattern.
        types: Vec<FrustrationType>,
    },
    /// The character wants to start a conversation on its own.
    InitiativeRequested {
        /// Owning character.
        character: CharacterId,
        /// Why the character wants to speak.
        reason: String,
        /// How pressing it is (0–1).
        urgency: f32,
    },
}

impl DomainEvent {
    /// Dotted event name used by observers and logs.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::NeedThresholdReached { .. } => "need.threshold_reached",
            Self::NeedUpdated { .. } => "need.updated",
            Self::NeedReset { .. } => "need.reset",
            Self::NeedBlocked { .. } => "need.blocked",
            Self::NeedUnblocked { .. } => "need.unblocked",
            Self::NeedDeactivated { .. } => "need.deactivated",
            Self::NeedInfluenced { .. } => "need.influenced",
            Self::EmotionalStateChanged { .. } => "emotional_state.changed",
            Self::EmotionalStateNormalized { .. } => "emotional_state.normalized",
            Self::MotivationThresholdReached { .. } => "motivation.threshold_reached",
            Self::MotivationCreated { .. } => "motivation.created",
            Self::MotivationExecuted { .. } => "motivation.executed",
            Self::FrustrationIncreased { .. } => "character.frustration_increased",
            Self::FrustrationLevelChanged { .. } => "character.frustration_level_changed",
            Self::BehaviorPatternActivationRequested { .. } => {
                "behavior.pattern_activation_requested"
            }
            Self::InitiativeRequested { .. } => "message.initiative_requested",
        }
    }

    /// Character the event concerns.
    #[must_use]
    pub fn character(&self) -> CharacterId {
        match self {
            Self::NeedThresholdReached { character, .. }
            | Self::NeedUpdated { character, .. }
            | Self::NeedReset { character, .. }
            | Self::NeedBlocked { character, .. }
            | Self::NeedUnblocked { character, .. }
            | Self::NeedDeactivated { character, .. }
            | Self::NeedInfluenced { character, .. }
            | Self::EmotionalStateChanged { character, .. }
            | Self::EmotionalStateNormalized { character }
            | Self::MotivationThresholdReached { character, .. }
            | Self::MotivationCreated { character, .. }
            | Self::MotivationExecuted { character, .. }
            | Self::FrustrationIncreased { character, .. }
            | Self::FrustrationLevelChanged { character, .. }
            | Self::BehaviorPatternActivationRequested { character, .. }
            | Self::InitiativeRequested { character, .. } => *character,
        }
    }
}

/// Fan-out channel for domain events.
///
/// Cloning shares the underlying channel. Slow subscribers lag and lose the
/// oldest events rather than stalling producers.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<DomainEvent>,
}

impl EventBus {
    /// Create a bus buffering up to `capacity` events per subscriber.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Publish a batch of events in order.
    pub fn publish(&self, events: impl IntoIterator<Item = DomainEvent>) {
        for event in events {
            trace!(event = event.name(), character = %event.character(), "publish");
            // No subscribers is fine.
            let _ = self.tx.send(event);
        }
    }

    /// Subscribe to every event published from now on.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<DomainEvent> {
        self.tx.subscribe()
    }

    /// Number of live subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(1024)
    }
}

/// Count events with a given dotted name.
#[must_use]
pub fn count_named(events: &[DomainEvent], name: &str) -> usize {
    events.iter().filter(|e| e.name() == name).count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_are_dotted() {
        let character = CharacterId::new();
        let event = DomainEvent::NeedReset {
            character,
            need: NeedType::Rest,
        };
        assert_eq!(event.name(), "need.reset");
        assert_eq!(event.character(), character);
    }

    #[tokio::test]
    async fn bus_delivers_in_order() {
        let bus = EventBus::new(8);
        let mut rx = bus.subscribe();
        let character = CharacterId::new();
        bus.publish([
            DomainEvent::NeedReset {
                character,
                need: NeedType::Rest,
            },
            DomainEvent::EmotionalStateNormalized { character },
        ]);
        assert_eq!(rx.recv().await.expect("first").name(), "need.reset");
        assert_eq!(
            rx.recv().await.expect("second").name(),
            "emotional_state.normalized"
        );
    }

    #[test]
    fn publish_without_subscribers_is_silent() {
        let bus = EventBus::default();
        bus.publish([DomainEvent::EmotionalStateNormalized {
            character: CharacterId::new(),
        }]);
        assert_eq!(bus.subscriber_count(), 0);
    }
}
