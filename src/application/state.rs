//! Lifecycle states of a supervised application.

/// State reported by [`Application::state`](crate::Application::state).
///
/// ```text
/// Stopped ──start()──► Starting ──► Started ──stop()──► Stopping ──► Stopped
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AppState {
    /// Not running (initial and final state).
    #[default]
    Stopped,
    /// `start()` was called; `Started` not emitted yet.
    Starting,
    /// Running.
    Started,
    /// `stop()` was called; `Stopped` not emitted yet.
    Stopping,
}

impl AppState {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            AppState::Stopped => "stopped",
            AppState::Starting => "starting",
            AppState::Started => "started",
            AppState::Stopping => "stopping",
        }
    }
}
