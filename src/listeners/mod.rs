//! # Event listeners for supervised applications.
//!
//! This module provides the [`Listener`] capability trait and the [`ListenerSet`]
//! registry an application embeds to emit its lifecycle events.
//!
//! ## Architecture
//! ```text
//! Application ── emit(AppEvent) ──► ListenerSet ──┬──► runner forwarder ──► run loop
//!                                                 ├──► LogListener (feature "logging")
//!                                                 └──► custom listeners
//! ```
//!
//! ## Implementing custom listeners
//! ```
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use appvisor::{AppError, AppState, Listener};
//!
//! #[derive(Default)]
//! struct ErrorCounter(AtomicUsize);
//!
//! impl Listener for ErrorCounter {
//!     fn on_error(&self, _error: &AppError, _state: AppState) {
//!         self.0.fetch_add(1, Ordering::Relaxed);
//!     }
//! }
//! ```

mod listener;
#[cfg(feature = "logging")]
mod log;
mod set;

pub use listener::Listener;
#[cfg(feature = "logging")]
pub use log::LogListener;
pub use set::ListenerSet;
