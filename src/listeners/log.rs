//! # Tracing-backed listener for debugging and demos.
//!
//! [`LogListener`] writes every application event through `tracing`.
//!
//! ## Output (fmt subscriber)
//! ```text
//! INFO appvisor::listeners::log: application started
//! WARN appvisor::listeners::log: application error label="app_failed" state="started" error=application failed: disk full
//! INFO appvisor::listeners::log: application stopped
//! ```

use tracing::{info, warn};

use crate::application::AppState;
use crate::error::AppError;
use crate::listeners::Listener;

/// Logs application events.
///
/// Enabled via the `logging` feature. Implement a custom [`Listener`] for
/// metrics or alerting.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogListener;

impl Listener for LogListener {
    fn on_started(&self) {
        info!("application started");
    }

    fn on_stopped(&self) {
        info!("application stopped");
    }

    fn on_error(&self, error: &AppError, state: AppState) {
        warn!(
            label = error.as_label(),
            state = state.as_label(),
            %error,
            "application error"
        );
    }

    fn on_listener_panicked(&self, listener: &'static str, panic: &AppError) {
        warn!(listener, %panic, "listener panicked");
    }

    fn name(&self) -> &'static str {
        "log"
    }
}
