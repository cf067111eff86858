//! Background sweeps at three fixed periods.
//!
//! | Sweep  | Default | Work per character                                  |
//! |--------|---------|-----------------------------------------------------|
//! | short  | 1 min   | need growth                                         |
//! | medium | 15 min  | frustration analysis, motivation evaluation         |
//! | long   | 30 min  | snapshot to the store (off the async threads)       |
//!
//! Sweeps only post commands into actor mailboxes, so a sweep over many
//! characters never holds one character's state while touching another.
//! Characters are visited concurrently and each visit is bounded by the
//! sweep's period, so a stalled mailbox delays nobody else.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use animus_core::config::SchedulerConfig;
use animus_core::metrics::{AnimusCounters, SweepTimings};
use animus_core::persistence::SnapshotStore;
use animus_core::Result;

use crate::actor::CharacterHandle;
use crate::registry::CharacterRegistry;

/// Which sweep to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sweep {
    /// Need growth.
    Short,
    /// Frustration and motivations.
    Medium,
    /// Snapshots.
    Long,
}

/// Result of one sweep.
#[derive(Debug, Clone, Copy)]
pub struct SweepReport {
    /// Sweep that ran.
    pub sweep: Sweep,
    /// Characters visited.
    pub characters: usize,
    /// Characters whose actor was gone or whose snapshot failed.
    pub failures: usize,
    /// Wall time spent.
    pub elapsed: Duration,
}

/// Drives the sweeps over a registry.
#[derive(Debug, Clone)]
pub struct Scheduler {
    registry: Arc<CharacterRegistry>,
    store: Option<Arc<SnapshotStore>>,
    config: SchedulerConfig,
    timings: Arc<SweepTimings>,
}

impl Scheduler {
    /// Scheduler over `registry`; `store` enables the long sweep.
    #[must_use]
    pub fn new(registry: Arc<CharacterRegistry>, store: Option<Arc<SnapshotStore>>) -> Self {
        let config = registry.config().scheduler.clone();
        Self {
            registry,
            store,
            config,
            timings: Arc::new(SweepTimings::default()),
        }
    }

    /// Recent sweep durations.
    #[must_use]
    pub fn timings(&self) -> &Arc<SweepTimings> {
        &self.timings
    }

    /// Run the sweep loop until `shutdown` turns true or its sender drops.
    #[must_use]
    pub fn spawn(self, mut shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut short = ticker(self.config.short_period_secs);
            let mut medium = ticker(self.config.medium_period_secs);
            let mut long = ticker(self.config.long_period_secs);
            info!(
                short_secs = self.config.short_period_secs,
                medium_secs = self.config.medium_period_secs,
                long_secs = self.config.long_period_secs,
                "scheduler started"
            );
            loop {
                tokio::select! {
                    changed = shutdown.changed() => {
                        if changed.is_err() || *shutdown.borrow() {
                            break;
                        }
                    }
                    _ = short.tick() => { self.run_sweep(Sweep::Short).await; }
                    _ = medium.tick() => { self.run_sweep(Sweep::Medium).await; }
                    _ = long.tick() => { self.run_sweep(Sweep::Long).await; }
                }
            }
            info!("scheduler stopped");
        })
    }

    /// Run one sweep over every live character.
    ///
    /// Characters are visited concurrently. A character that cannot take the
    /// work within the sweep's period is skipped and counted as a failure.
    pub async fn run_sweep(&self, sweep: Sweep) -> SweepReport {
        let start = std::time::Instant::now();
        let handles = self.registry.handles();
        let limit = self.period(sweep);

        let failures = match sweep {
            Sweep::Short => {
                fan_out(&handles, limit, |h| async move { h.tick_needs().await })
                    .await
                    .1
            }
            Sweep::Medium => {
                fan_out(&handles, limit, |h| async move {
                    h.analyze_frustration().await?;
                    h.evaluate_motivations().await
                })
                .await
                .1
            }
            Sweep::Long => self.snapshot_all(&handles, limit).await,
        };

        let elapsed = start.elapsed();
        self.timings.record(elapsed);
        let report = SweepReport {
            sweep,
            characters: handles.len(),
            failures,
            elapsed,
        };
        debug!(
            ?sweep,
            characters = report.characters,
            failures,
            elapsed_us = u64::try_from(elapsed.as_micros()).unwrap_or(u64::MAX),
            "sweep finished"
        );
        report
    }

    fn period(&self, sweep: Sweep) -> Duration {
        let secs = match sweep {
            Sweep::Short => self.config.short_period_secs,
            Sweep::Medium => self.config.medium_period_secs,
            Sweep::Long => self.config.long_period_secs,
        };
        Duration::from_secs(secs.max(1))
    }

    async fn snapshot_all(&self, handles: &[CharacterHandle], limit: Duration) -> usize {
        let Some(store) = &self.store else {
            return 0;
        };
        let (snapshots, failures) =
            fan_out(handles, limit, |h| async move { h.snapshot().await }).await;

        let store = Arc::clone(store);
        let counters = Arc::clone(self.registry.counters());
        let saved = tokio::task::spawn_blocking(move || {
            let mut failed = 0usize;
            for snapshot in &snapshots {
                match store.save(snapshot) {
                    Ok(()) => AnimusCounters::bump(&counters.snapshots_saved),
                    Err(e) => {
                        warn!(character = %snapshot.profile.id, error = %e, "snapshot save failed");
                        failed += 1;
                    }
                }
            }
            failed
        })
        .await;

        match saved {
            Ok(failed) => failures + failed,
            Err(e) => {
                warn!(error = %e, "snapshot task failed");
                handles.len()
            }
        }
    }
}

/// Run `op` for every handle concurrently, each bounded by `limit`.
/// Returns the successful results and the number of failures.
async fn fan_out<T, F, Fut>(handles: &[CharacterHandle], limit: Duration, op: F) -> (Vec<T>, usize)
where
    T: Send + 'static,
    F: Fn(CharacterHandle) -> Fut,
    Fut: Future<Output = Result<T>> + Send + 'static,
{
    let mut set = JoinSet::new();
    for handle in handles {
        let id = handle.id();
        let call = op(handle.clone());
        set.spawn(async move { (id, tokio::time::timeout(limit, call).await) });
    }

    let mut done = Vec::with_capacity(handles.len());
    let mut failures = 0usize;
    while let Some(joined) = set.join_next().await {
        match joined {
            Ok((_, Ok(Ok(value)))) => done.push(value),
            Ok((id, Ok(Err(e)))) => {
                warn!(character = %id, error = %e, "sweep work failed");
                failures += 1;
            }
            Ok((id, Err(_))) => {
                warn!(character = %id, limit_secs = limit.as_secs(), "character busy, sweep work skipped");
                failures += 1;
            }
            Err(e) => {
                warn!(error = %e, "sweep task failed");
                failures += 1;
            }
        }
    }
    (done, failures)
}

fn ticker(period_secs: u64) -> tokio::time::Interval {
    let period = Duration::from_secs(period_secs.max(1));
    let mut interval = interval_at(Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    interval
}
