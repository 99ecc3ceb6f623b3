//! # ListenerSet: synchronous fan-out over registered listeners
//!
//! [`ListenerSet`] is the event registry an [`Application`](crate::Application)
//! keeps. The runner subscribes through `Application::subscribe`, which usually
//! forwards to [`ListenerSet::add`].
//!
//! ## Rules
//! - Listeners are called in registration order.
//! - A panic inside a listener is caught; the remaining listeners still receive
//!   the event.
//! - Once the event is delivered, every other listener gets
//!   [`Listener::on_listener_panicked`] for each caught panic. The runner's
//!   listener turns it into a crash of the run. Panics during that second
//!   round are only logged.
//! - The set is cheap to clone (`Arc` per listener), so an application can move a
//!   copy into a scoped task and emit from there.
//!
//! **Warning**: `AssertUnwindSafe` is used, which can leave shared state
//! inconsistent if a listener panics while holding a lock.

use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use tracing::warn;

use crate::application::AppState;
use crate::error::AppError;
use crate::events::AppEvent;

use super::Listener;

/// Registry of listeners with panic-isolated delivery.
#[derive(Clone, Default)]
pub struct ListenerSet {
    listeners: Vec<Arc<dyn Listener>>,
}

impl ListenerSet {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a listener.
    pub fn add(&mut self, listener: Arc<dyn Listener>) {
        self.listeners.push(listener);
    }

    /// Delivers one event to every listener.
    pub fn emit(&self, event: &AppEvent) {
        let mut panicked = Vec::new();
        for (idx, listener) in self.listeners.iter().enumerate() {
            let delivered = panic::catch_unwind(AssertUnwindSafe(|| match event {
                AppEvent::Started => listener.on_started(),
                AppEvent::Stopped => listener.on_stopped(),
                AppEvent::Error { error, state } => listener.on_error(error, *state),
            }));
            if let Err(payload) = delivered {
                let panic = AppError::from_panic(payload);
                warn!(
                    listener = listener.name(),
                    event = event.as_label(),
                    %panic,
                    "listener panicked"
                );
                panicked.push((idx, panic));
            }
        }

        for (culprit, panic) in &panicked {
            let name = self.listeners[*culprit].name();
            for (idx, listener) in self.listeners.iter().enumerate() {
                if idx == *culprit {
                    continue;
                }
                let notified = panic::catch_unwind(AssertUnwindSafe(|| {
                    listener.on_listener_panicked(name, panic);
                }));
                if notified.is_err() {
                    warn!(
                        listener = listener.name(),
                        culprit = name,
                        "listener panicked while handling a listener panic"
                    );
                }
            }
        }
    }

    /// Emits [`AppEvent::Started`].
    pub fn started(&self) {
        self.emit(&AppEvent::Started);
    }

    /// Emits [`AppEvent::Stopped`].
    pub fn stopped(&self) {
        self.emit(&AppEvent::Stopped);
    }

    /// Emits [`AppEvent::Error`], tagged with the emitter's current `state`.
    pub fn error(&self, state: AppState, error: AppError) {
        self.emit(&AppEvent::Error { error, state });
    }

    /// True if there are no listeners.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    /// Number of listeners.
    #[must_use]
    pub fn len(&self) -> usize {
        self.listeners.len()
    }
}

impl fmt::Debug for ListenerSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.listeners.iter().map(|l| l.name()))
            .finish()
    }
}
