//! # Kill timer: one-shot shutdown deadline.
//!
//! Armed at most once per run. The timer holds only a deadline; the run loop
//! awaits [`expired`] next to its input channel, so nothing is spawned and the
//! timer disappears with the run.

use std::future;
use std::time::Duration;

use tokio::time::{self, Instant};

/// Deadline guard forcing run completion when shutdown stalls.
#[derive(Debug)]
pub(crate) struct KillTimer {
    timeout: Duration,
    started: bool,
    deadline: Option<Instant>,
}

impl KillTimer {
    pub(crate) fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            started: false,
            deadline: None,
        }
    }

    /// Arms the timer. Returns `false` if it was already armed.
    ///
    /// A timeout too large to represent never expires.
    pub(crate) fn start(&mut self) -> bool {
        if self.started {
            return false;
        }
        self.started = true;
        self.deadline = Instant::now().checked_add(self.timeout);
        true
    }

    pub(crate) fn is_running(&self) -> bool {
        self.started
    }

    pub(crate) fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub(crate) fn timeout(&self) -> Duration {
        self.timeout
    }
}

/// Resolves at `deadline`; never resolves for `None`.
pub(crate) async fn expired(deadline: Option<Instant>) {
    match deadline {
        Some(at) => time::sleep_until(at).await,
        None => future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_start_is_idempotent() {
        let mut timer = KillTimer::new(Duration::from_secs(10));
        assert!(!timer.is_running());
        assert!(timer.start());
        let first = timer.deadline();

        time::advance(Duration::from_secs(3)).await;
        assert!(!timer.start());
        assert_eq!(timer.deadline(), first);
    }

    #[tokio::test(start_paused = true)]
    async fn test_expires_after_timeout() {
        let mut timer = KillTimer::new(Duration::from_secs(10));
        let armed_at = Instant::now();
        timer.start();

        expired(timer.deadline()).await;
        assert_eq!(armed_at.elapsed(), Duration::from_secs(10));
    }

    #[tokio::test(start_paused = true)]
    async fn test_unrepresentable_timeout_never_expires() {
        let mut timer = KillTimer::new(Duration::MAX);
        assert!(timer.start());
        assert!(timer.is_running());
        assert!(timer.deadline().is_none());

        let res = time::timeout(Duration::from_secs(3600), expired(timer.deadline())).await;
        assert!(res.is_err());
    }
}
