use std::time::Duration;

use tokio::time::Instant;

/// Tracks the most recent user interaction so the poll cadence can adapt to
/// idleness without the UI layer knowing anything about timers.
#[derive(Debug, Clone, Copy)]
pub struct ActivityMonitor {
    last: Instant,
}

impl ActivityMonitor {
    pub fn new(now: Instant) -> Self {
        Self { last: now }
    }

    pub fn record(&mut self, now: Instant) {
        self.last = now;
    }

    pub fn idle_for(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.last)
    }

    pub fn last_activity(&self) -> Instant {
        self.last
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn idle_duration_grows_until_recorded() {
        let mut monitor = ActivityMonitor::new(Instant::now());
        assert_eq!(monitor.idle_for(Instant::now()), Duration::ZERO);

        tokio::time::advance(Duration::from_secs(40)).await;
        assert_eq!(monitor.idle_for(Instant::now()), Duration::from_secs(40));

        monitor.record(Instant::now());
        assert_eq!(monitor.idle_for(Instant::now()), Duration::ZERO);
    }
}
