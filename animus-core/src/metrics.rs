//! Runtime counters and sweep timings.
//!
//! Counters are lock-free `AtomicU64`s bumped on the hot path and read on
//! export. Sweep timings keep a small ring of recent durations behind a
//! `parking_lot::Mutex`; they are written once per sweep and read rarely.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use parking_lot::Mutex;

use crate::events::DomainEvent;

// ---------------------------------------------------------------------------
// Counters
// ---------------------------------------------------------------------------

/// Atomic counters for state-engine activity.
#[derive(Debug)]
pub struct AnimusCounters {
    /// Need growth passes.
    pub growth_passes: AtomicU64,
    /// Threshold crossings.
    pub thresholds_crossed: AtomicU64,
    /// Emotional impacts applied.
    pub impacts_applied: AtomicU64,
    /// Emotional impacts faded to extinction.
    pub impacts_expired: AtomicU64,
    /// Actions settled.
    pub actions_executed: AtomicU64,
    /// Actions whose draw passed.
    pub actions_succeeded: AtomicU64,
    /// Actions whose draw failed.
    pub actions_failed: AtomicU64,
    /// Actions refused by the gate.
    pub actions_rejected: AtomicU64,
    /// Frustration level increases.
    pub frustration_escalations: AtomicU64,
    /// Messages coordinated.
    pub messages_processed: AtomicU64,
    /// Coordinator branches that failed.
    pub branch_failures: AtomicU64,
    /// Fallback responses returned.
    pub fallback_responses: AtomicU64,
    /// Snapshots written.
    pub snapshots_saved: AtomicU64,
}

impl AnimusCounters {
    /// Zeroed counters.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            growth_passes: AtomicU64::new(0),
            thresholds_crossed: AtomicU64::new(0),
            impacts_applied: AtomicU64::new(0),
            impacts_expired: AtomicU64::new(0),
            actions_executed: AtomicU64::new(0),
            actions_succeeded: AtomicU64::new(0),
            actions_failed: AtomicU64::new(0),
            actions_rejected: AtomicU64::new(0),
            frustration_escalations: AtomicU64::new(0),
            messages_processed: AtomicU64::new(0),
            branch_failures: AtomicU64::new(0),
            fallback_responses: AtomicU64::new(0),
            snapshots_saved: AtomicU64::new(0),
        }
    }

    /// Increment a counter by one.
    pub fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Count what a batch of events says happened.
    pub fn observe(&self, events: &[DomainEvent]) {
        for event in events {
            match event {
                DomainEvent::NeedThresholdReached { .. } => Self::bump(&self.thresholds_crossed),
                DomainEvent::MotivationExecuted { success, .. } => {
                    Self::bump(&self.actions_executed);
                    if *success {
                        Self::bump(&self.actions_succeeded);
                    } else {
                        Self::bump(&self.actions_failed);
                    }
                }
                DomainEvent::FrustrationLevelChanged { old, new, .. } if new > old => {
                    Self::bump(&self.frustration_escalations);
                }
                _ => {}
            }
        }
    }

    /// Read every counter.
    #[must_use]
    pub fn snapshot(&self) -> CounterSnapshot {
        let r = |c: &AtomicU64| c.load(Ordering::Relaxed);
        CounterSnapshot {
            growth_passes: r(&self.growth_passes),
            thresholds_crossed: r(&self.thresholds_crossed),
            impacts_applied: r(&self.impacts_applied),
            impacts_expired: r(&self.impacts_expired),
            actions_executed: r(&self.actions_executed),
            actions_succeeded: r(&self.actions_succeeded),
            actions_failed: r(&self.actions_failed),
            actions_rejected: r(&self.actions_rejected),
            frustration_escalations: r(&self.frustration_escalations),
            messages_processed: r(&self.messages_processed),
            branch_failures: r(&self.branch_failures),
            fallback_responses: r(&self.fallback_responses),
            snapshots_saved: r(&self.snapshots_saved),
        }
    }
}

impl Default for AnimusCounters {
    fn default() -> Self {
        Self::new()
    }
}

/// Counter values at one point in time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[allow(missing_docs)]
pub struct CounterSnapshot {
    pub growth_passes: u64,
    pub thresholds_crossed: u64,
    pub impacts_applied: u64,
    pub impacts_expired: u64,
    pub actions_executed: u64,
    pub actions_succeeded: u64,
    pub actions_failed: u64,
    pub actions_rejected: u64,
    pub frustration_escalations: u64,
    pub messages_processed: u64,
    pub branch_failures: u64,
    pub fallback_responses: u64,
    pub snapshots_saved: u64,
}

impl CounterSnapshot {
    /// Prometheus text exposition.
    #[must_use]
    pub fn to_prometheus(&self) -> String {
        let rows: [(&str, &str, u64); 13] = [
            ("growth_passes", "Need growth passes", self.growth_passes),
            ("thresholds_crossed", "Need threshold crossings", self.thresholds_crossed),
            ("impacts_applied", "Emotional impacts applied", self.impacts_applied),
            ("impacts_expired", "Emotional impacts faded out", self.impacts_expired),
            ("actions_executed", "Actions settled", self.actions_executed),
            ("actions_succeeded", "Actions that succeeded", self.actions_succeeded),
            ("actions_failed", "Actions that failed", self.actions_failed),
            ("actions_rejected", "Actions refused by the gate", self.actions_rejected),
            ("frustration_escalations", "Frustration level increases", self.frustration_escalations),
            ("messages_processed", "Messages coordinated", self.messages_processed),
            ("branch_failures", "Coordinator branch failures", self.branch_failures),
            ("fallback_responses", "Fallback responses returned", self.fallback_responses),
            ("snapshots_saved", "Snapshots written", self.snapshots_saved),
        ];
        let mut out = String::new();
        for (name, help, value) in rows {
            out.push_str(&format!(
                "# HELP animus_{name}_total {help}\n\
                 # TYPE animus_{name}_total counter\n\
                 animus_{name}_total {value}\n"
            ));
        }
        out
    }
}

// ---------------------------------------------------------------------------
// Sweep timings
// ---------------------------------------------------------------------------

/// Ring of recent sweep durations.
#[derive(Debug)]
pub struct SweepTimings {
    inner: Mutex<Ring>,
}

#[derive(Debug)]
struct Ring {
    samples: Vec<Duration>,
    next: usize,
    filled: bool,
}

impl SweepTimings {
    /// Keep the last `capacity` samples.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(Ring {
                samples: vec![Duration::ZERO; capacity.max(1)],
                next: 0,
                filled: false,
            }),
        }
    }

    /// Record one sweep.
    pub fn record(&self, elapsed: Duration) {
        let mut ring = self.inner.lock();
        let idx = ring.next;
        ring.samples[idx] = elapsed;
        ring.next = (idx + 1) % ring.samples.len();
        if ring.next == 0 {
            ring.filled = true;
        }
    }

    /// Number of samples held.
    #[must_use]
    pub fn len(&self) -> usize {
        let ring = self.inner.lock();
        if ring.filled { ring.samples.len() } else { ring.next }
    }

    /// Whether nothing was recorded yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Slowest recorded sweep.
    #[must_use]
    pub fn max(&self) -> Duration {
        let ring = self.inner.lock();
        let n = if ring.filled { ring.samples.len() } else { ring.next };
        ring.samples[..n].iter().copied().max().unwrap_or_default()
    }

    /// Mean of the recorded sweeps.
    #[must_use]
    pub fn mean(&self) -> Duration {
        let ring = self.inner.lock();
        let n = if ring.filled { ring.samples.len() } else { ring.next };
        if n == 0 {
            return Duration::ZERO;
        }
        let total: Duration = ring.samples[..n].iter().sum();
        total / u32::try_from(n).unwrap_or(u32::MAX)
    }
}

impl Default for SweepTimings {
    fn default() -> Self {
        Self::new(64)
    }
}
