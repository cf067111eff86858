//! One actor per character.
//!
//! A character's [`CharacterState`] lives inside a single tokio task and is
//! only touched by that task. Sweeps, message branches and timers all post
//! [`Command`]s into its mailbox, so they never interleave on the same need
//! or emotional state while different characters run fully in parallel.
//!
//! Timers are one-shot tasks holding a weak sender: they sleep, then post
//! their command back. A fade timer re-arms itself until the impact is gone.
//! Dropping every [`CharacterHandle`] stops the actor.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, info, warn};

use animus_core::character::{BehaviorContext, CharacterSnapshot, CharacterState, Effects, Timer};
use animus_core::emotion::{EmotionalImpact, EmotionalState};
use animus_core::metrics::AnimusCounters;
use animus_core::motivation::CharacterAction;
use animus_core::{
    ActionId, AnimusError, CharacterId, CharacterProfile, Emotion, EventBus, ImpactId, NeedType,
    Result,
};

use crate::clock::Clock;

type ReadFn = Box<dyn FnOnce(&CharacterState) + Send>;

/// Mailbox message. Variants with a `reply` are asks, the rest are tells.
enum Command {
    TickNeeds,
    AnalyzeFrustration,
    EvaluateMotivations,
    UpdateNeed {
        need: NeedType,
        delta: f32,
        reason: String,
        reply: oneshot::Sender<Result<()>>,
    },
    ApplyNeedsImpact {
        impact: Vec<(NeedType, f32)>,
        reason: String,
        reply: oneshot::Sender<Result<()>>,
    },
    ResetNeed {
        need: NeedType,
    },
    BlockNeed {
        need: NeedType,
        hours: f32,
        reason: String,
        reply: oneshot::Sender<Result<()>>,
    },
    UnblockNeed {
        need: NeedType,
    },
    DeactivateNeed {
        need: NeedType,
    },
    ApplyImpact {
        impact: EmotionalImpact,
        reply: oneshot::Sender<Result<ImpactId>>,
    },
    DirectEmotions {
        emotions: Vec<(Emotion, f32)>,
        source: String,
        description: Option<String>,
    },
    NormalizeEmotion,
    SocialSignal {
        negative: bool,
    },
    StartAction {
        action: CharacterAction,
        reply: oneshot::Sender<Result<ActionId>>,
    },
    CancelAction {
        reply: oneshot::Sender<Option<CharacterAction>>,
    },
    Snapshot {
        reply: oneshot::Sender<CharacterSnapshot>,
    },
    Read(ReadFn),
    FadeTick {
        impact: ImpactId,
    },
    ExpirePatterns {
        generation: u64,
    },
    CompleteAction {
        action: ActionId,
    },
    Shutdown {
        reply: oneshot::Sender<()>,
    },
}

/// Shared collaborators every actor publishes to.
#[derive(Debug, Clone)]
pub struct ActorContext {
    /// Event fan-out.
    pub bus: EventBus,
    /// Activity counters.
    pub counters: Arc<AnimusCounters>,
    /// Source of "now".
    pub clock: Clock,
    /// Mailbox capacity.
    pub mailbox: usize,
}

impl Default for ActorContext {
    fn default() -> Self {
        Self {
            bus: EventBus::default(),
            counters: Arc::new(AnimusCounters::new()),
            clock: Clock::new(),
            mailbox: 64,
        }
    }
}

// ---------------------------------------------------------------------------
// Handle
// ---------------------------------------------------------------------------

/// Cloneable address of a character actor.
#[derive(Debug, Clone)]
pub struct CharacterHandle {
    id: CharacterId,
    tx: mpsc::Sender<Command>,
}

impl CharacterHandle {
    /// Character behind the handle.
    #[must_use]
    pub fn id(&self) -> CharacterId {
        self.id
    }

    /// Whether the actor still accepts commands.
    #[must_use]
    pub fn is_alive(&self) -> bool {
        !self.tx.is_closed()
    }

    async fn tell(&self, cmd: Command) -> Result<()> {
        self.tx
            .send(cmd)
            .await
            .map_err(|_| AnimusError::ActorUnavailable(self.id))
    }

    async fn ask<R>(&self, make: impl FnOnce(oneshot::Sender<R>) -> Command) -> Result<R> {
        let (reply, rx) = oneshot::channel();
        self.tell(make(reply)).await?;
        rx.await.map_err(|_| AnimusError::ActorUnavailable(self.id))
    }

    /// Run `f` against the current state inside the actor.
    ///
    /// # Errors
    /// `ActorUnavailable` once the actor has stopped.
    pub async fn read<R: Send + 'static>(
        &self,
        f: impl FnOnce(&CharacterState) -> R + Send + 'static,
    ) -> Result<R> {
        self.ask(|reply| {
            Command::Read(Box::new(move |state| {
                let _ = reply.send(f(state));
            }))
        })
        .await
    }

    /// Grow needs for the time since the last pass.
    ///
    /// # Errors
    /// `ActorUnavailable` once the actor has stopped.
    pub async fn tick_needs(&self) -> Result<()> {
        self.tell(Command::TickNeeds).await
    }

    /// Re-score frustration.
    ///
    /// # Errors
    /// `ActorUnavailable` once the actor has stopped.
    pub async fn analyze_frustration(&self) -> Result<()> {
        self.tell(Command::AnalyzeFrustration).await
    }

    /// Derive motivations and act on the strongest.
    ///
    /// # Errors
    /// `ActorUnavailable` once the actor has stopped.
    pub async fn evaluate_motivations(&self) -> Result<()> {
        self.tell(Command::EvaluateMotivations).await
    }

    /// Additive need update.
    ///
    /// # Errors
    /// `InvalidInput` for NaN, `ActorUnavailable` once stopped.
    pub async fn update_need(&self, need: NeedType, delta: f32, reason: &str) -> Result<()> {
        let reason = reason.to_string();
        self.ask(|reply| Command::UpdateNeed {
            need,
            delta,
            reason,
            reply,
        })
        .await?
    }

    /// Apply a batch of need deltas.
    ///
    /// # Errors
    /// `InvalidInput` if any delta is NaN, `ActorUnavailable` once stopped.
    pub async fn apply_needs_impact(&self, impact: Vec<(NeedType, f32)>, reason: &str) -> Result<()> {
        let reason = reason.to_string();
        self.ask(|reply| Command::ApplyNeedsImpact {
            impact,
            reason,
            reply,
        })
        .await?
    }

    /// Satisfy a need.
    ///
    /// # Errors
    /// `ActorUnavailable` once the actor has stopped.
    pub async fn reset_need(&self, need: NeedType) -> Result<()> {
        self.tell(Command::ResetNeed { need }).await
    }

    /// Suspend a need's growth for `hours`.
    ///
    /// # Errors
    /// `InvalidInput` for a bad duration, `ActorUnavailable` once stopped.
    pub async fn block_need(&self, need: NeedType, hours: f32, reason: &str) -> Result<()> {
        let reason = reason.to_string();
        self.ask(|reply| Command::BlockNeed {
            need,
            hours,
            reason,
            reply,
        })
        .await?
    }

    /// Resume a need's growth.
    ///
    /// # Errors
    /// `ActorUnavailable` once the actor has stopped.
    pub async fn unblock_need(&self, need: NeedType) -> Result<()> {
        self.tell(Command::UnblockNeed { need }).await
    }

    /// Remove a need from every sweep.
    ///
    /// # Errors
    /// `ActorUnavailable` once the actor has stopped.
    pub async fn deactivate_need(&self, need: NeedType) -> Result<()> {
        self.tell(Command::DeactivateNeed { need }).await
    }

    /// Add an emotional impact; its fade timer starts immediately.
    ///
    /// # Errors
    /// `InvalidInput` for a malformed impact, `ActorUnavailable` once stopped.
    pub async fn apply_impact(&self, impact: EmotionalImpact) -> Result<ImpactId> {
        self.ask(|reply| Command::ApplyImpact { impact, reply }).await?
    }

    /// Set the emotional baseline from raw magnitudes.
    ///
    /// # Errors
    /// `ActorUnavailable` once the actor has stopped.
    pub async fn update_from_direct_emotions(
        &self,
        emotions: Vec<(Emotion, f32)>,
        source: &str,
        description: Option<String>,
    ) -> Result<()> {
        self.tell(Command::DirectEmotions {
            emotions,
            source: source.to_string(),
            description,
        })
        .await
    }

    /// Force the neutral state.
    ///
    /// # Errors
    /// `ActorUnavailable` once the actor has stopped.
    pub async fn normalize_emotion(&self) -> Result<()> {
        self.tell(Command::NormalizeEmotion).await
    }

    /// Note a user reaction.
    ///
    /// # Errors
    /// `ActorUnavailable` once the actor has stopped.
    pub async fn record_social_signal(&self, negative: bool) -> Result<()> {
        self.tell(Command::SocialSignal { negative }).await
    }

    /// Start an action. Rejected, never queued, while another is in flight.
    ///
    /// # Errors
    /// `ActionInProgress`, `InsufficientResource`, `ContractViolation`, or
    /// `ActorUnavailable` once stopped.
    pub async fn start_action(&self, action: CharacterAction) -> Result<ActionId> {
        self.ask(|reply| Command::StartAction { action, reply }).await?
    }

    /// Abandon the in-flight action.
    ///
    /// # Errors
    /// `ActorUnavailable` once the actor has stopped.
    pub async fn cancel_action(&self) -> Result<Option<CharacterAction>> {
        self.ask(|reply| Command::CancelAction { reply }).await
    }

    /// Profile, emotional state and behaviour context in one read.
    ///
    /// # Errors
    /// `ActorUnavailable` once the actor has stopped.
    pub async fn response_view(&self) -> Result<(CharacterProfile, EmotionalState, BehaviorContext)> {
        self.read(|s| {
            (
                s.profile().clone(),
                s.emotion().state().clone(),
                s.behavior_context(),
            )
        })
        .await
    }

    /// Persistable image taken now.
    ///
    /// # Errors
    /// `ActorUnavailable` once the actor has stopped.
    pub async fn snapshot(&self) -> Result<CharacterSnapshot> {
        self.ask(|reply| Command::Snapshot { reply }).await
    }

    /// Stop the actor: cancel timers, apply queued commands, cancel the
    /// in-flight action. Returns once the actor has acknowledged.
    ///
    /// # Errors
    /// `ActorUnavailable` if the actor had already stopped.
    pub async fn shutdown(&self) -> Result<()> {
        self.ask(|reply| Command::Shutdown { reply }).await
    }
}

// ---------------------------------------------------------------------------
// Actor
// ---------------------------------------------------------------------------

/// Start an actor owning `state`.
///
/// Timers the state already needs (pattern expiry after a restore) are
/// armed before the first command. Must be called inside a tokio runtime.
#[must_use]
pub fn spawn_character(state: CharacterState, ctx: ActorContext) -> (CharacterHandle, JoinHandle<()>) {
    let (tx, rx) = mpsc::channel(ctx.mailbox.max(1));
    let id = state.id();
    let pending = state.pending_timers();
    let fade_tick = Duration::from_secs(state.config().emotion.fade_tick_secs.max(1));
    let mut actor = CharacterActor {
        state,
        rx,
        weak: tx.downgrade(),
        ctx,
        fade_tick,
        timers: JoinSet::new(),
        stopping: false,
    };
    for timer in pending {
        actor.arm(timer);
    }
    let join = tokio::spawn(actor.run());
    (CharacterHandle { id, tx }, join)
}

struct CharacterActor {
    state: CharacterState,
    rx: mpsc::Receiver<Command>,
    weak: mpsc::WeakSender<Command>,
    ctx: ActorContext,
    fade_tick: Duration,
    timers: JoinSet<()>,
    stopping: bool,
}

impl CharacterActor {
    async fn run(mut self) {
        let id = self.state.id();
        debug!(character = %id, "character actor started");
        loop {
            tokio::select! {
                cmd = self.rx.recv() => match cmd {
                    Some(Command::Shutdown { reply }) => {
                        self.shutdown().await;
                        let _ = reply.send(());
                        break;
                    }
                    Some(cmd) => self.handle(cmd),
                    None => break,
                },
                Some(joined) = self.timers.join_next(), if !self.timers.is_empty() => {
                    if let Err(e) = joined {
                        if e.is_panic() {
                            warn!(character = %id, error = %e, "timer task panicked");
                        }
                    }
                }
            }
        }
        self.timers.abort_all();
        debug!(character = %id, "character actor stopped");
    }

    async fn shutdown(&mut self) {
        self.stopping = true;
        self.timers.abort_all();
        self.rx.close();
        let mut drained = 0usize;
        while let Some(cmd) = self.rx.recv().await {
            match cmd {
                Command::Shutdown { reply } => {
                    let _ = reply.send(());
                }
                cmd => {
                    self.handle(cmd);
                    drained += 1;
                }
            }
        }
        let now = self.ctx.clock.now();
        if let Some(action) = self.state.cancel_action(now) {
            info!(character = %self.state.id(), action = %action.action_type, "in-flight action cancelled at shutdown");
        }
        info!(character = %self.state.id(), drained, "character actor shut down");
    }

    fn handle(&mut self, cmd: Command) {
        let now = self.ctx.clock.now();
        match cmd {
            Command::TickNeeds => {
                AnimusCounters::bump(&self.ctx.counters.growth_passes);
                let effects = self.state.tick_needs(now);
                self.absorb(effects);
            }
            Command::AnalyzeFrustration => {
                let effects = self.state.analyze_frustration(now);
                self.absorb(effects);
            }
            Command::EvaluateMotivations => {
                let effects = self.state.evaluate_motivations(now);
                self.absorb(effects);
            }
            Command::UpdateNeed {
                need,
                delta,
                reason,
                reply,
            } => {
                let result = self.state.update_need(need, delta, &reason, now);
                let _ = reply.send(self.settle(result));
            }
            Command::ApplyNeedsImpact {
                impact,
                reason,
                reply,
            } => {
                let result = self.state.apply_needs_impact(&impact, &reason, now);
                let _ = reply.send(self.settle(result));
            }
            Command::ResetNeed { need } => {
                let effects = self.state.reset_need(need, now);
                self.absorb(effects);
            }
            Command::BlockNeed {
                need,
                hours,
                reason,
                reply,
            } => {
                let result = self.state.block_need(need, hours, &reason, now);
                let _ = reply.send(self.settle(result));
            }
            Command::UnblockNeed { need } => {
                let effects = self.state.unblock_need(need, now);
                self.absorb(effects);
            }
            Command::DeactivateNeed { need } => {
                let effects = self.state.deactivate_need(need, now);
                self.absorb(effects);
            }
            Command::ApplyImpact { impact, reply } => {
                let id = impact.id;
                let result = self.state.apply_impact(impact, now);
                if result.is_ok() {
                    AnimusCounters::bump(&self.ctx.counters.impacts_applied);
                }
                let _ = reply.send(self.settle(result).map(|()| id));
            }
            Command::DirectEmotions {
                emotions,
                source,
                description,
            } => {
                let effects = self.state.update_from_direct_emotions(
                    &emotions,
                    &source,
                    description.as_deref(),
                    now,
                );
                self.absorb(effects);
            }
            Command::NormalizeEmotion => {
                let effects = self.state.normalize_emotion(now);
                self.absorb(effects);
            }
            Command::SocialSignal { negative } => self.state.record_social_signal(negative, now),
            Command::StartAction { action, reply } => {
                let id = action.id;
                let result = self.state.start_action(action, now);
                if matches!(
                    result,
                    Err(AnimusError::ActionInProgress { .. } | AnimusError::InsufficientResource { .. })
                ) {
                    AnimusCounters::bump(&self.ctx.counters.actions_rejected);
                }
                let _ = reply.send(self.settle(result).map(|()| id));
            }
            Command::CancelAction { reply } => {
                let _ = reply.send(self.state.cancel_action(now));
            }
            Command::Snapshot { reply } => {
                let _ = reply.send(self.state.snapshot(now));
            }
            Command::Read(f) => f(&self.state),
            Command::FadeTick { impact } => {
                let live = self.state.emotion().impacts().iter().any(|i| i.id == impact);
                #[allow(clippy::cast_precision_loss)]
                let minutes = self.fade_tick.as_secs_f32() / 60.0;
                let (effects, finished) = self.state.fade_impact(impact, minutes, now);
                self.absorb(effects);
                if !finished {
                    self.arm(Timer::Fade { impact });
                } else if live {
                    AnimusCounters::bump(&self.ctx.counters.impacts_expired);
                }
            }
            Command::ExpirePatterns { generation } => {
                let effects = self.state.expire_patterns(generation, now);
                self.absorb(effects);
            }
            Command::CompleteAction { action } => {
                let effects = self.state.complete_action(action, now);
                self.absorb(effects);
            }
            Command::Shutdown { reply } => {
                let _ = reply.send(());
            }
        }
    }

    fn settle(&mut self, result: Result<Effects>) -> Result<()> {
        result.map(|effects| self.absorb(effects))
    }

    fn absorb(&mut self, effects: Effects) {
        let Effects { events, timers } = effects;
        self.ctx.counters.observe(&events);
        for timer in timers {
            self.arm(timer);
        }
        self.ctx.bus.publish(events);
    }

    fn arm(&mut self, timer: Timer) {
        if self.stopping {
            return;
        }
        let (after, command) = match timer {
            Timer::Fade { impact } => (self.fade_tick, Command::FadeTick { impact }),
            Timer::ExpirePatterns(expiry) => (
                expiry.after,
                Command::ExpirePatterns {
                    generation: expiry.generation,
                },
            ),
            Timer::CompleteAction { action, after } => (after, Command::CompleteAction { action }),
        };
        let weak = self.weak.clone();
        self.timers.spawn(async move {
            tokio::time::sleep(after).await;
            if let Some(tx) = weak.upgrade() {
                let _ = tx.send(command).await;
            }
        });
    }
}
