//! # Runner configuration.
//!
//! Provides [`RunnerConfig`], the settings of a single supervised run.
//!
//! ## Sentinel values
//! - `kill_timeout = 0s` → once the kill timer is armed the run completes on the next loop turn

use std::time::Duration;

/// Default shutdown deadline armed by the kill timer.
pub const DEFAULT_KILL_TIMEOUT: Duration = Duration::from_secs(10);

/// Configuration for one [`Runner`](crate::Runner).
///
/// ## Field semantics
/// - `kill_timeout`: deadline between arming the kill timer and forced completion
/// - `handle_signals`: listen for SIGINT/SIGTERM (Ctrl-C on non-unix) during the run
#[derive(Clone, Debug)]
pub struct RunnerConfig {
    /// Maximum time a stop may take once the kill timer is armed.
    ///
    /// When it expires the run completes with
    /// [`Cause::StopTimedOut`](crate::Cause::StopTimedOut), whether or not the
    /// application ever emits `Stopped`.
    pub kill_timeout: Duration,

    /// Whether OS termination signals request a graceful stop.
    ///
    /// Listeners are registered when the run starts and dropped when it completes.
    pub handle_signals: bool,
}

impl RunnerConfig {
    /// Config without OS signal handling (embedding, tests).
    pub fn without_signals() -> Self {
        Self {
            handle_signals: false,
            ..Self::default()
        }
    }
}

impl Default for RunnerConfig {
    /// Default configuration:
    ///
    /// - `kill_timeout = 10s`
    /// - `handle_signals = true`
    fn default() -> Self {
        Self {
            kill_timeout: DEFAULT_KILL_TIMEOUT,
            handle_signals: true,
        }
    }
}
