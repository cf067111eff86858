//! Wall-clock time that follows tokio's clock.
//!
//! The core takes `DateTime<Utc>` everywhere. The runtime derives it from a
//! fixed base plus elapsed `tokio::time::Instant`, so a paused test runtime
//! that advances tokio time also advances the character's notion of "now".

use chrono::{DateTime, Utc};
use tokio::time::Instant;

/// Monotonic UTC clock anchored at construction.
#[derive(Debug, Clone, Copy)]
pub struct Clock {
    base: DateTime<Utc>,
    start: Instant,
}

impl Clock {
    /// Clock anchored at the current wall time.
    #[must_use]
    pub fn new() -> Self {
        Self::starting_at(Utc::now())
    }

    /// Clock that reads `base` right now.
    #[must_use]
    pub fn starting_at(base: DateTime<Utc>) -> Self {
        Self {
            base,
            start: Instant::now(),
        }
    }

    /// Current time.
    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        let elapsed = chrono::Duration::from_std(self.start.elapsed()).unwrap_or_else(|_| chrono::Duration::zero());
        self.base + elapsed
    }
}

impl Default for Clock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn follows_paused_tokio_time() {
        let base = Utc::now();
        let clock = Clock::starting_at(base);
        tokio::time::advance(Duration::from_secs(90 * 60)).await;
        assert_eq!((clock.now() - base).num_minutes(), 90);
    }
}
