//! Runtime core: the run loop and its collaborators.
//!
//! The only public API from this module is [`Runner`] and the [`Scope`] handle
//! applications receive.
//!
//! ```text
//! Runner::run()
//!   ├─► Scope (input tx + run token) ──► Application::create(options, scope)
//!   ├─► shutdown::spawn_signal_listener ──► Input::Signal ─┐
//!   ├─► RunnerListener (subscribed)     ──► Input::Event  ─┤
//!   ├─► Scope::spawn crashes            ──► Input::Crash  ─┤
//!   │                                                      ▼
//!   └─► loop { select! { rx.recv() ──► RunState::dispatch, kill_timer::expired ──► timeout } }
//!            until RunState delivers its outcome; then token.cancel()
//! ```
//!
//! Internal modules:
//! - [`runner`]: public entry point and the async run loop;
//! - [`state`]: synchronous single-run state machine;
//! - [`boundary`]: crash isolation (`guard`, [`Scope`]);
//! - [`kill_timer`]: one-shot shutdown deadline;
//! - [`shutdown`]: run-scoped OS signal listener.

mod boundary;
mod kill_timer;
mod runner;
mod shutdown;
mod state;

pub use boundary::Scope;
pub use runner::Runner;
