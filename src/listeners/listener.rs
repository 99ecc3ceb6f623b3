//! # Core listener trait
//!
//! `Listener` is the observer capability an application's events are delivered
//! to. Every method has a no-op default, so implementations only override the
//! events they care about.
//!
//! ## Contract
//! - Methods are called synchronously from whatever code emits the event
//!   (inside `start()`/`stop()`, or from a scoped task) and must not block.
//! - A panic inside a listener is caught by [`ListenerSet`](crate::ListenerSet).
//!   It never reaches the emitter; the other listeners are told through
//!   [`Listener::on_listener_panicked`].

use crate::application::AppState;
use crate::error::AppError;

/// Observer of application lifecycle events.
pub trait Listener: Send + Sync + 'static {
    /// The application finished starting.
    fn on_started(&self) {}

    /// The application has fully stopped.
    fn on_stopped(&self) {}

    /// The application reported an error while in `state`.
    fn on_error(&self, error: &AppError, state: AppState) {
        let _ = (error, state);
    }

    /// Another listener in the same set panicked while handling an event.
    fn on_listener_panicked(&self, listener: &'static str, panic: &AppError) {
        let _ = (listener, panic);
    }

    /// Human-readable name (for logs).
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}
