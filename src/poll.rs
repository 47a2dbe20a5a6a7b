use std::time::Duration;

use crate::schedule::Scheduler;
use crate::session::SessionCmd;

pub(crate) const POLL_TASK: &str = "poll";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cadence {
    Fast,
    Slow,
}

/// Periodic state fetches at one of two cadences. The scheduler owns no
/// timer of its own while the push stream is attached; callers must `stop`
/// it before attaching a stream so only one source ever drives fetches.
#[derive(Debug)]
pub struct PollScheduler {
    fast: Duration,
    slow: Duration,
    cadence: Option<Cadence>,
}

impl PollScheduler {
    pub fn new(fast: Duration, slow: Duration) -> Self {
        Self {
            fast,
            slow,
            cadence: None,
        }
    }

    pub fn cadence(&self) -> Option<Cadence> {
        self.cadence
    }

    pub fn is_running(&self) -> bool {
        self.cadence.is_some()
    }

    /// Start (or cancel-and-restart) fast polling. Used both for the initial
    /// fallback and for the immediate slow-to-fast jump on user activity.
    pub fn start_fast(&mut self, scheduler: &mut Scheduler) {
        self.cadence = Some(Cadence::Fast);
        scheduler.every(POLL_TASK, self.fast, || SessionCmd::PollTick);
    }

    /// Drop to the slow cadence. No-op when already slow.
    pub fn slow_down(&mut self, scheduler: &mut Scheduler) {
        if self.cadence == Some(Cadence::Slow) {
            return;
        }
        self.cadence = Some(Cadence::Slow);
        scheduler.every(POLL_TASK, self.slow, || SessionCmd::PollTick);
    }

    pub fn stop(&mut self, scheduler: &mut Scheduler) {
        self.cadence = None;
        scheduler.cancel(POLL_TASK);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc::{self, UnboundedReceiver};
    use tokio::time::advance;

    const FAST: Duration = Duration::from_secs(2);
    const SLOW: Duration = Duration::from_secs(30);

    fn setup() -> (PollScheduler, Scheduler, UnboundedReceiver<SessionCmd>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (PollScheduler::new(FAST, SLOW), Scheduler::new(tx), rx)
    }

    fn drain_ticks(rx: &mut UnboundedReceiver<SessionCmd>) -> usize {
        let mut count = 0;
        while let Ok(cmd) = rx.try_recv() {
            if matches!(cmd, SessionCmd::PollTick) {
                count += 1;
            }
        }
        count
    }

    #[tokio::test(start_paused = true)]
    async fn fast_cadence_ticks_every_fast_interval() {
        let (mut poll, mut scheduler, mut rx) = setup();
        poll.start_fast(&mut scheduler);
        assert_eq!(poll.cadence(), Some(Cadence::Fast));

        // Let the spawned task register its timer before the paused clock moves.
        tokio::task::yield_now().await;
        advance(FAST * 3).await;
        tokio::task::yield_now().await;
        assert_eq!(drain_ticks(&mut rx), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn slow_down_switches_the_interval() {
        let (mut poll, mut scheduler, mut rx) = setup();
        poll.start_fast(&mut scheduler);
        poll.slow_down(&mut scheduler);
        assert_eq!(poll.cadence(), Some(Cadence::Slow));

        advance(FAST * 4).await;
        tokio::task::yield_now().await;
        assert_eq!(drain_ticks(&mut rx), 0, "fast timer must be cancelled");

        advance(SLOW).await;
        tokio::task::yield_now().await;
        assert_eq!(drain_ticks(&mut rx), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn activity_restores_fast_without_waiting_for_the_slow_tick() {
        let (mut poll, mut scheduler, mut rx) = setup();
        poll.start_fast(&mut scheduler);
        poll.slow_down(&mut scheduler);

        // Partway into a slow period, a fast restart must tick after FAST,
        // not at the old slow deadline.
        advance(Duration::from_secs(10)).await;
        poll.start_fast(&mut scheduler);
        tokio::task::yield_now().await;
        advance(FAST).await;
        tokio::task::yield_now().await;
        assert_eq!(drain_ticks(&mut rx), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn stop_cancels_the_timer_entirely() {
        let (mut poll, mut scheduler, mut rx) = setup();
        poll.start_fast(&mut scheduler);
        poll.stop(&mut scheduler);
        assert!(!poll.is_running());

        advance(SLOW * 2).await;
        tokio::task::yield_now().await;
        assert_eq!(drain_ticks(&mut rx), 0);
    }
}
