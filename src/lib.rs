//! # appvisor
//!
//! **Appvisor** supervises the lifecycle of a single long-running application
//! for a single run and reports how that run ended, exactly once.
//!
//! A run can end because the application stopped normally, an OS termination
//! signal requested a stop, the application failed while starting, running or
//! stopping, application code panicked, or shutdown stalled past the kill
//! timer. All of these are reconciled into one `Result<(), RunError>`.
//!
//! ## Architecture
//! ```text
//!        ┌──────────────────────────────┐
//!        │  Application (user type)     │
//!        │  start() / stop() / state()  │
//!        └──────┬───────────────▲───────┘
//!   ListenerSet │ AppEvent      │ guarded calls
//!   Scope::spawn│ crashes       │ (catch_unwind)
//!               ▼               │
//! ┌───────────────────────────────────────────────────────┐
//! │ Runner::run()                                         │
//! │  - mpsc input channel (events, signals, crashes)      │
//! │  - RunState (single-run state machine)                │
//! │  - KillTimer (one-shot deadline, default 10s)         │
//! │  - signal listener (SIGINT/SIGTERM, run-scoped)       │
//! └──────────────────────────┬────────────────────────────┘
//!                            ▼
//!              Ok(()) | Err(RunError::Application(causes...))
//! ```
//!
//! ### Error-state resolution
//! ```text
//! Error(e) while Starting          ─► complete: StartFailed(e)         (no stop())
//! Error(e) while Started/Stopping  ─► register e, stop(), arm kill timer
//! crash in scoped task / start()   ─► register e, stop(), arm kill timer
//! panic in an event listener       ─► register e, stop(), arm kill timer
//! SIGINT / SIGTERM                 ─► stop() (unless already stopping), arm kill timer
//! stop() returns Err / panics      ─► complete immediately
//! kill timer expires               ─► complete: StopTimedOut
//! Stopped                          ─► complete (with aggregate if any cause was registered)
//! ```
//!
//! ## Features
//! | Area              | Description                                              | Key types / traits                          |
//! |-------------------|----------------------------------------------------------|---------------------------------------------|
//! | **Supervision**   | One run, one outcome, bounded shutdown.                  | [`Runner`]                                  |
//! | **Contract**      | What a supervised unit implements.                       | [`Application`], [`AppState`]               |
//! | **Events**        | Observer registry for lifecycle events.                  | [`Listener`], [`ListenerSet`], [`AppEvent`] |
//! | **Isolation**     | Crash-isolated background work.                          | [`Scope`]                                   |
//! | **Errors**        | Aggregated, ordered causes.                              | [`RunError`], [`ApplicationException`]      |
//! | **Configuration** | Kill timeout and signal handling.                        | [`RunnerConfig`]                            |
//!
//! ## Optional features
//! - `logging`: exports a tracing-backed [`LogListener`] _(demo/reference only)_.

mod application;
mod config;
mod core;
mod error;
mod events;
mod listeners;

// ---- Public re-exports ----

pub use application::{AppState, Application};
pub use config::{DEFAULT_KILL_TIMEOUT, RunnerConfig};
pub use core::{Runner, Scope};
pub use error::{AppError, ApplicationException, Cause, RunError};
pub use events::AppEvent;
pub use listeners::{Listener, ListenerSet};

// Optional: expose a simple built-in logging listener (demo/reference).
// Enable with: `--features logging`
#[cfg(feature = "logging")]
pub use listeners::LogListener;
