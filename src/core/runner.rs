//! # Runner: supervises one application for one run.
//!
//! [`Runner::run`] builds the application, starts it, and drives the
//! [`RunState`] machine until exactly one outcome has been produced.
//!
//! ## Run sequence
//! ```text
//! run()
//!   ├─ run already called?  ──► Err(IllegalState)            (nothing else happens)
//!   ├─ Scope + signal listener (if cfg.handle_signals)
//!   ├─ guard(Application::create(options, scope))  ── Err/panic ──► Err(aggregate)
//!   ├─ app.subscribe(RunnerListener)
//!   ├─ RunState::start_application()
//!   └─ loop
//!        ├─ outcome delivered?           ──► break
//!        ├─ rx.recv()                    ──► RunState::dispatch(input)
//!        │    (closed: every handle dropped ──► RunState::on_inputs_closed())
//!        └─ kill_timer::expired(deadline) ──► RunState::on_kill_timer_expired()
//!
//! teardown: run token cancelled on every exit, including when the run future
//!           is dropped ──► signal listener exits, scoped tasks dropped
//! ```
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use appvisor::{AppError, AppState, Application, Listener, ListenerSet, Runner, RunnerConfig, Scope};
//!
//! struct OneShot {
//!     state: AppState,
//!     listeners: ListenerSet,
//!     scope: Scope,
//! }
//!
//! impl Application for OneShot {
//!     type Options = ();
//!
//!     fn create(_: (), scope: Scope) -> Result<Self, AppError> {
//!         Ok(Self { state: AppState::Stopped, listeners: ListenerSet::new(), scope })
//!     }
//!     fn subscribe(&mut self, listener: Arc<dyn Listener>) {
//!         self.listeners.add(listener);
//!     }
//!     fn start(&mut self) -> Result<(), AppError> {
//!         self.state = AppState::Started;
//!         self.listeners.started();
//!         // Work done: emit Stopped from a scoped task.
//!         let listeners = self.listeners.clone();
//!         self.scope.spawn(async move {
//!             listeners.stopped();
//!             Ok(())
//!         });
//!         Ok(())
//!     }
//!     fn stop(&mut self) -> Result<(), AppError> {
//!         self.state = AppState::Stopping;
//!         Ok(())
//!     }
//!     fn state(&self) -> AppState {
//!         self.state
//!     }
//! }
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() {
//!     let runner = Runner::<OneShot>::with_config((), RunnerConfig::without_signals());
//!     assert!(runner.run().await.is_ok());
//!     assert!(runner.run().await.is_err()); // IllegalState
//! }
//! ```

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::application::{AppState, Application};
use crate::config::RunnerConfig;
use crate::core::{
    boundary::{Scope, guard},
    kill_timer, shutdown,
    state::{Input, RunState},
};
use crate::error::{AppError, ApplicationException, Cause, RunError};
use crate::events::AppEvent;
use crate::listeners::Listener;

/// Supervises a single [`Application`] of type `A` from start to terminal outcome.
///
/// A runner is good for exactly one run. Construct a new one per run.
pub struct Runner<A: Application> {
    cfg: RunnerConfig,
    options: Mutex<Option<A::Options>>,
    run_called: AtomicBool,
}

impl<A: Application> Runner<A> {
    /// Creates a runner with [`RunnerConfig::default`].
    pub fn new(options: A::Options) -> Self {
        Self::with_config(options, RunnerConfig::default())
    }

    /// Creates a runner with an explicit configuration.
    pub fn with_config(options: A::Options, cfg: RunnerConfig) -> Self {
        Self {
            cfg,
            options: Mutex::new(Some(options)),
            run_called: AtomicBool::new(false),
        }
    }

    /// Runner configuration.
    pub fn config(&self) -> &RunnerConfig {
        &self.cfg
    }

    /// True once [`Runner::run`] has been called.
    pub fn was_run_called(&self) -> bool {
        self.run_called.load(Ordering::Acquire)
    }

    /// Runs the application until it has fully terminated.
    ///
    /// Resolves exactly once per runner with `Ok(())` for a clean stop or a
    /// [`RunError::Application`] carrying every cause collected during the run.
    /// Any later call resolves immediately to [`RunError::IllegalState`] without
    /// creating an application.
    pub async fn run(&self) -> Result<(), RunError> {
        if self.run_called.swap(true, Ordering::AcqRel) {
            warn!("run called more than once");
            return Err(RunError::IllegalState);
        }
        let options = self
            .options
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .ok_or(RunError::IllegalState)?;

        let (tx, mut rx) = mpsc::unbounded_channel::<Input>();
        let token = CancellationToken::new();
        let _teardown = token.clone().drop_guard();
        let scope = Scope::new(tx.clone(), token.clone());

        if self.cfg.handle_signals {
            if let Err(err) = shutdown::spawn_signal_listener(tx.clone(), token.child_token()) {
                warn!(%err, "signal registration failed; continuing without signal handling");
            }
        }

        info!(app = std::any::type_name::<A>(), "run started");
        let app = match guard(|| A::create(options, scope)) {
            Ok(Ok(app)) => app,
            Ok(Err(err)) | Err(err) => return Err(construction_failed(err)),
        };

        let mut state = RunState::new(app, self.cfg.kill_timeout);
        let listener: Arc<dyn Listener> = Arc::new(RunnerListener { tx });
        if let Err(err) = guard(|| state.app_mut().subscribe(listener)) {
            return Err(construction_failed(err));
        }
        state.start_application();

        let mut inputs_open = true;
        let outcome = loop {
            if let Some(outcome) = state.take_outcome() {
                break outcome;
            }
            let deadline = state.kill_deadline();
            tokio::select! {
                input = rx.recv(), if inputs_open => match input {
                    Some(input) => state.dispatch(input),
                    None => {
                        inputs_open = false;
                        state.on_inputs_closed();
                    }
                },
                () = kill_timer::expired(deadline) => state.on_kill_timer_expired(),
            }
        };

        debug!(
            kill_timer = state.is_kill_timer_running(),
            "run loop exited"
        );
        outcome
    }
}

impl<A: Application> fmt::Debug for Runner<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runner")
            .field("app", &std::any::type_name::<A>())
            .field("cfg", &self.cfg)
            .field("run_called", &self.was_run_called())
            .finish()
    }
}

/// Terminal error for an application that could not be constructed or wired.
fn construction_failed(err: AppError) -> RunError {
    warn!(label = err.as_label(), %err, "application construction failed");
    let mut agg = ApplicationException::new();
    agg.add_cause(Cause::Failed(err));
    RunError::Application(agg)
}

/// Listener the runner subscribes; forwards every event into the run loop.
///
/// Panics of sibling listeners are forwarded as crashes.
struct RunnerListener {
    tx: mpsc::UnboundedSender<Input>,
}

impl RunnerListener {
    fn forward(&self, ev: AppEvent) {
        // Closed once the run completed; late events are dropped.
        let _ = self.tx.send(Input::Event(ev));
    }
}

impl Listener for RunnerListener {
    fn on_started(&self) {
        self.forward(AppEvent::Started);
    }

    fn on_stopped(&self) {
        self.forward(AppEvent::Stopped);
    }

    fn on_error(&self, error: &AppError, state: AppState) {
        self.forward(AppEvent::Error {
            error: error.clone(),
            state,
        });
    }

    fn on_listener_panicked(&self, listener: &'static str, panic: &AppError) {
        debug!(listener, "forwarding listener panic");
        let _ = self.tx.send(Input::Crash(panic.clone()));
    }

    fn name(&self) -> &'static str {
        "runner"
    }
}
