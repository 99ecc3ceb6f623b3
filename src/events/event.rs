//! # Lifecycle events emitted by a supervised application.
//!
//! ```text
//! start() ──► Started ─┬─► ... ──► stop() ──► Stopped
//!                      └─► Error { error, state }  (any time, any state)
//! ```
//!
//! An error event carries the state the application was in when it emitted
//! the event, so the runner never has to query `state()` after the fact.
//!
//! ## Example
//! ```rust
//! use appvisor::{AppError, AppEvent, AppState};
//!
//! let ev = AppEvent::Error {
//!     error: AppError::fail("disk full"),
//!     state: AppState::Started,
//! };
//! assert_eq!(ev.as_label(), "error");
//! assert_eq!(ev.error(), Some(&AppError::fail("disk full")));
//! ```

use crate::application::AppState;
use crate::error::AppError;

/// Event kinds an application emits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppEvent {
    /// The application finished starting.
    Started,
    /// The application has fully stopped.
    Stopped,
    /// The application hit an error while in `state`.
    Error {
        /// The reported failure.
        error: AppError,
        /// Application state at the moment the error was emitted.
        state: AppState,
    },
}

impl AppEvent {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            AppEvent::Started => "started",
            AppEvent::Stopped => "stopped",
            AppEvent::Error { .. } => "error",
        }
    }

    /// The carried error, for [`AppEvent::Error`].
    pub fn error(&self) -> Option<&AppError> {
        match self {
            AppEvent::Error { error, .. } => Some(error),
            _ => None,
        }
    }
}
