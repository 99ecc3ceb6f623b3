//! # Application abstraction.
//!
//! The [`Application`] trait is the only thing the runner knows about the unit it
//! supervises. The application owns its state transitions; the runner observes
//! them through [`Application::state`] and the events it emits to subscribed
//! [`Listener`]s.
//!
//! `start` and `stop` return promptly. Work that completes later runs in tasks
//! spawned through the [`Scope`] handed to [`Application::create`], and reports
//! completion by emitting `Started`/`Stopped`/`Error`.
//!
//! # Example
//! ```
//! use std::sync::Arc;
//! use appvisor::{AppError, AppState, Application, Listener, ListenerSet, Scope};
//!
//! struct Noop {
//!     state: AppState,
//!     listeners: ListenerSet,
//! }
//!
//! impl Application for Noop {
//!     type Options = ();
//!
//!     fn create(_options: (), _scope: Scope) -> Result<Self, AppError> {
//!         Ok(Self { state: AppState::Stopped, listeners: ListenerSet::new() })
//!     }
//!
//!     fn subscribe(&mut self, listener: Arc<dyn Listener>) {
//!         self.listeners.add(listener);
//!     }
//!
//!     fn start(&mut self) -> Result<(), AppError> {
//!         self.state = AppState::Started;
//!         self.listeners.started();
//!         Ok(())
//!     }
//!
//!     fn stop(&mut self) -> Result<(), AppError> {
//!         self.state = AppState::Stopped;
//!         self.listeners.stopped();
//!         Ok(())
//!     }
//!
//!     fn state(&self) -> AppState {
//!         self.state
//!     }
//! }
//! ```

use std::sync::Arc;

use crate::core::Scope;
use crate::error::AppError;
use crate::listeners::Listener;

use super::AppState;

/// # Long-running unit supervised by a [`Runner`](crate::Runner).
///
/// Every call the runner makes into an implementation goes through the crash
/// isolation boundary: a panic is caught and handled like a reported error.
pub trait Application: Send + Sized + 'static {
    /// Construction options, passed through unmodified from [`Runner::new`](crate::Runner::new).
    type Options: Send + 'static;

    /// Builds the application. `scope` spawns crash-isolated background work.
    fn create(options: Self::Options, scope: Scope) -> Result<Self, AppError>;

    /// Registers a listener for `Started`, `Stopped` and `Error` events.
    fn subscribe(&mut self, listener: Arc<dyn Listener>);

    /// Begins startup. An `Err` is treated as a crash.
    fn start(&mut self) -> Result<(), AppError>;

    /// Begins shutdown. An `Err` completes the run immediately.
    fn stop(&mut self) -> Result<(), AppError>;

    /// Current lifecycle state.
    fn state(&self) -> AppState;

    /// True while starting.
    fn is_starting(&self) -> bool {
        self.state() == AppState::Starting
    }

    /// True while running.
    fn is_started(&self) -> bool {
        self.state() == AppState::Started
    }

    /// True while stopping.
    fn is_stopping(&self) -> bool {
        self.state() == AppState::Stopping
    }
}
