//! # RunState: the single-run state machine.
//!
//! Reconciles every termination trigger of one run into a single outcome.
//! All methods are synchronous and are only called from the run loop, so the
//! fields need no locking.
//!
//! ## Transitions
//! ```text
//! Input::Event(Stopped)            ──► complete_run(None)
//! Input::Event(Started)            ──► (bookkeeping)
//! Input::Event(Error { e, state }), state as emitted:
//!     Starting                     ──► complete_run(StartFailed(e))          (no stop)
//!     Started | Stopping           ──► stop_application_with_cause(e)
//!     Stopped                      ──► complete_run(e)
//! Input::Crash(e)                  ──► stop_application_with_cause(e)
//! Input::Signal(_)                 ──► stop_application() + start_kill_timer()
//! kill timer expired               ──► complete_run(StopTimedOut)
//!
//! stop_application():
//!     state() == Stopping          ──► start_kill_timer()                     (no second stop())
//!     otherwise                    ──► stop(); Err/panic ──► complete_run(err)
//! ```
//!
//! ## Rules
//! - The outcome is produced **exactly once**; later `complete_run` calls only
//!   register their cause.
//! - The aggregate is created on the first failure and only appended to.
//! - The kill timer is armed at most once.

use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::application::{AppState, Application};
use crate::core::{boundary::guard, kill_timer::KillTimer, shutdown::ShutdownSignal};
use crate::error::{AppError, ApplicationException, Cause, RunError};
use crate::events::AppEvent;

/// Everything that can re-enter the run loop.
#[derive(Debug)]
pub(crate) enum Input {
    /// Event emitted by the application.
    Event(AppEvent),
    /// OS termination signal.
    Signal(ShutdownSignal),
    /// Failure caught at the boundary outside a direct call.
    Crash(AppError),
}

/// Per-run state owned by the run loop.
pub(crate) struct RunState<A: Application> {
    app: A,
    aggregate: Option<ApplicationException>,
    completed: bool,
    outcome: Option<Result<(), RunError>>,
    kill_timer: KillTimer,
}

impl<A: Application> RunState<A> {
    pub(crate) fn new(app: A, kill_timeout: Duration) -> Self {
        Self {
            app,
            aggregate: None,
            completed: false,
            outcome: None,
            kill_timer: KillTimer::new(kill_timeout),
        }
    }

    pub(crate) fn app_mut(&mut self) -> &mut A {
        &mut self.app
    }

    #[cfg(test)]
    pub(crate) fn is_completed(&self) -> bool {
        self.completed
    }

    /// Takes the delivered outcome. Returns `Some` at most once per run.
    pub(crate) fn take_outcome(&mut self) -> Option<Result<(), RunError>> {
        self.outcome.take()
    }

    pub(crate) fn kill_deadline(&self) -> Option<Instant> {
        self.kill_timer.deadline()
    }

    pub(crate) fn is_kill_timer_running(&self) -> bool {
        self.kill_timer.is_running()
    }

    /// Calls `start()` inside the boundary; a failure takes the crash path.
    pub(crate) fn start_application(&mut self) {
        match guard(|| self.app.start()) {
            Ok(Ok(())) => debug!("start requested"),
            Ok(Err(err)) | Err(err) => {
                warn!(label = err.as_label(), %err, "start failed");
                self.stop_application_with_cause(Cause::Failed(err));
            }
        }
    }

    pub(crate) fn dispatch(&mut self, input: Input) {
        match input {
            Input::Event(ev) => self.on_event(ev),
            Input::Signal(sig) => self.on_signal(sig),
            Input::Crash(err) => self.on_crash(err),
        }
    }

    pub(crate) fn on_event(&mut self, ev: AppEvent) {
        match ev {
            AppEvent::Started => debug!("application reported started"),
            AppEvent::Stopped => {
                info!("application reported stopped");
                self.complete_run(None);
            }
            AppEvent::Error { error, state } => self.on_error(error, state),
        }
    }

    /// `state` is the one the application reported when it emitted the error,
    /// not the one it is in by the time the event is dequeued.
    fn on_error(&mut self, err: AppError, state: AppState) {
        warn!(state = state.as_label(), label = err.as_label(), %err, "application error");

        match state {
            AppState::Starting => self.complete_run(Some(Cause::StartFailed { cause: err })),
            AppState::Started | AppState::Stopping => {
                self.stop_application_with_cause(Cause::Failed(err));
            }
            AppState::Stopped => self.complete_run(Some(Cause::Failed(err))),
        }
    }

    pub(crate) fn on_signal(&mut self, sig: ShutdownSignal) {
        info!(signal = sig.as_label(), "termination signal received");
        self.stop_application();
        self.start_kill_timer();
    }

    pub(crate) fn on_crash(&mut self, err: AppError) {
        warn!(label = err.as_label(), %err, "crash caught at boundary");
        self.stop_application_with_cause(Cause::Failed(err));
    }

    pub(crate) fn on_kill_timer_expired(&mut self) {
        let timeout = self.kill_timer.timeout();
        warn!(?timeout, "application stop timed out");
        self.complete_run(Some(Cause::StopTimedOut { timeout }));
    }

    /// Every sender is gone: no event, signal or crash can arrive any more, so
    /// only the kill timer can end the run.
    pub(crate) fn on_inputs_closed(&mut self) {
        warn!("application dropped every run handle; waiting for kill timer");
        self.start_kill_timer();
    }

    /// Requests a graceful stop unless one is already in flight.
    pub(crate) fn stop_application(&mut self) {
        match self.observe_state() {
            Ok(AppState::Stopping) => {
                debug!("stop already in flight");
                self.start_kill_timer();
            }
            Ok(_) => self.do_stop_application(),
            Err(panic) => self.complete_run(Some(Cause::Failed(panic))),
        }
    }

    fn do_stop_application(&mut self) {
        match guard(|| self.app.stop()) {
            Ok(Ok(())) => debug!("stop requested"),
            // No Stopped/Error event can follow a stop() that failed before transitioning.
            Ok(Err(err)) | Err(err) => {
                warn!(label = err.as_label(), %err, "stop failed");
                self.complete_run(Some(Cause::Failed(err)));
            }
        }
    }

    fn stop_application_with_cause(&mut self, cause: Cause) {
        self.register(cause);
        self.stop_application();
        self.start_kill_timer();
    }

    fn start_kill_timer(&mut self) {
        if self.kill_timer.start() {
            debug!(timeout = ?self.kill_timer.timeout(), "kill timer armed");
        }
    }

    fn register(&mut self, cause: Cause) {
        self.aggregate
            .get_or_insert_with(ApplicationException::new)
            .add_cause(cause);
    }

    /// Registers `cause` (if any) and delivers the outcome if not delivered yet.
    pub(crate) fn complete_run(&mut self, cause: Option<Cause>) {
        if let Some(cause) = cause {
            self.register(cause);
        }
        if self.completed {
            return;
        }
        self.completed = true;
        let outcome = match &self.aggregate {
            Some(agg) => Err(RunError::Application(agg.clone())),
            None => Ok(()),
        };
        match &outcome {
            Ok(()) => info!("run completed"),
            Err(err) => warn!(%err, "run completed with errors"),
        }
        self.outcome = Some(outcome);
    }

    fn observe_state(&self) -> Result<AppState, AppError> {
        guard(|| self.app.state())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex, MutexGuard};

    use crate::core::Scope;
    use crate::listeners::Listener;

    #[derive(Default)]
    struct Tracker {
        state: AppState,
        start_calls: usize,
        stop_calls: usize,
        start_error: Option<AppError>,
        stop_error: Option<AppError>,
        panic_on_stop: bool,
        panic_on_state: bool,
    }

    #[derive(Clone, Default)]
    struct FakeApp(Arc<Mutex<Tracker>>);

    impl FakeApp {
        fn tracker(&self) -> MutexGuard<'_, Tracker> {
            self.0.lock().unwrap_or_else(|e| e.into_inner())
        }

        fn set_state(&self, state: AppState) {
            self.tracker().state = state;
        }
    }

    impl Application for FakeApp {
        type Options = ();

        fn create(_options: (), _scope: Scope) -> Result<Self, AppError> {
            Ok(Self::default())
        }

        fn subscribe(&mut self, _listener: Arc<dyn Listener>) {}

        fn start(&mut self) -> Result<(), AppError> {
            let mut p = self.tracker();
            p.start_calls += 1;
            p.state = AppState::Starting;
            match p.start_error.take() {
                Some(err) => Err(err),
                None => Ok(()),
            }
        }

        fn stop(&mut self) -> Result<(), AppError> {
            let mut p = self.tracker();
            p.stop_calls += 1;
            if p.panic_on_stop {
                drop(p);
                panic!("stop exploded");
            }
            if let Some(err) = p.stop_error.take() {
                return Err(err);
            }
            p.state = AppState::Stopping;
            Ok(())
        }

        fn state(&self) -> AppState {
            let p = self.tracker();
            if p.panic_on_state {
                drop(p);
                panic!("state exploded");
            }
            p.state
        }
    }

    const KILL: Duration = Duration::from_secs(10);

    fn started() -> (RunState<FakeApp>, FakeApp) {
        let app = FakeApp::default();
        let mut run = RunState::new(app.clone(), KILL);
        run.start_application();
        app.set_state(AppState::Started);
        run.on_event(AppEvent::Started);
        (run, app)
    }

    fn error(msg: &str, state: AppState) -> AppEvent {
        AppEvent::Error {
            error: AppError::fail(msg),
            state,
        }
    }

    fn causes(outcome: Option<Result<(), RunError>>) -> Vec<Cause> {
        match outcome {
            Some(Err(RunError::Application(agg))) => agg.causes().to_vec(),
            other => panic!("expected aggregate, got {other:?}"),
        }
    }

    #[test]
    fn test_clean_stop_yields_ok() {
        let (mut run, app) = started();
        assert!(run.take_outcome().is_none());

        run.on_signal(ShutdownSignal::Interrupt);
        assert_eq!(app.tracker().stop_calls, 1);
        assert!(run.is_kill_timer_running());

        app.set_state(AppState::Stopped);
        run.on_event(AppEvent::Stopped);
        assert_eq!(run.take_outcome(), Some(Ok(())));
    }

    #[test]
    fn test_error_while_starting_fails_without_stop() {
        let app = FakeApp::default();
        let mut run = RunState::new(app.clone(), KILL);
        run.start_application();

        run.on_event(error("bind", AppState::Starting));

        assert_eq!(
            causes(run.take_outcome()),
            vec![Cause::StartFailed {
                cause: AppError::fail("bind")
            }]
        );
        assert_eq!(app.tracker().stop_calls, 0);
        assert!(!run.is_kill_timer_running());
    }

    #[test]
    fn test_error_emitted_while_starting_ignores_later_state() {
        for later in [AppState::Started, AppState::Stopped] {
            let app = FakeApp::default();
            let mut run = RunState::new(app.clone(), KILL);
            run.start_application();
            app.set_state(later);

            run.on_event(error("bind", AppState::Starting));
            run.on_event(AppEvent::Started);

            let agg = match run.take_outcome() {
                Some(Err(RunError::Application(agg))) => agg,
                other => panic!("expected aggregate, got {other:?}"),
            };
            assert_eq!(agg.start_failure(), Some(&AppError::fail("bind")));
            assert_eq!(app.tracker().stop_calls, 0, "later state {later:?}");
        }
    }

    #[test]
    fn test_errors_while_started_then_stopping_keep_order() {
        let (mut run, app) = started();

        run.on_event(error("e1", AppState::Started));
        assert_eq!(app.tracker().state, AppState::Stopping);
        assert!(run.is_kill_timer_running());

        run.on_event(error("e2", AppState::Stopping));
        assert_eq!(app.tracker().stop_calls, 1);
        assert!(run.take_outcome().is_none());

        app.set_state(AppState::Stopped);
        run.on_event(AppEvent::Stopped);
        assert_eq!(
            causes(run.take_outcome()),
            vec![
                Cause::Failed(AppError::fail("e1")),
                Cause::Failed(AppError::fail("e2")),
            ]
        );
    }

    #[test]
    fn test_stop_while_stopping_only_arms_kill_timer() {
        let (mut run, app) = started();
        app.set_state(AppState::Stopping);

        run.stop_application();

        assert_eq!(app.tracker().stop_calls, 0);
        assert!(run.is_kill_timer_running());
    }

    #[test]
    fn test_repeated_signals_stop_once() {
        let (mut run, app) = started();
        run.on_signal(ShutdownSignal::Terminate);
        let deadline = run.kill_deadline();
        run.on_signal(ShutdownSignal::Interrupt);

        assert_eq!(app.tracker().stop_calls, 1);
        assert_eq!(run.kill_deadline(), deadline);
    }

    #[test]
    fn test_outcome_delivered_exactly_once() {
        let (mut run, _app) = started();
        run.on_event(AppEvent::Stopped);
        run.on_kill_timer_expired();
        run.on_event(AppEvent::Stopped);

        assert_eq!(run.take_outcome(), Some(Ok(())));
        assert!(run.take_outcome().is_none());
        assert!(run.is_completed());
    }

    #[test]
    fn test_kill_timer_expiry_completes_with_timeout() {
        let (mut run, _app) = started();
        run.on_crash(AppError::fail("worker"));
        run.on_kill_timer_expired();

        assert_eq!(
            causes(run.take_outcome()),
            vec![
                Cause::Failed(AppError::fail("worker")),
                Cause::StopTimedOut { timeout: KILL },
            ]
        );

        run.on_event(AppEvent::Stopped);
        assert!(run.take_outcome().is_none());
    }

    #[test]
    fn test_stop_error_completes_immediately() {
        let (mut run, app) = started();
        app.tracker().stop_error = Some(AppError::fail("stop refused"));

        run.on_crash(AppError::fail("worker"));

        assert_eq!(
            causes(run.take_outcome()),
            vec![
                Cause::Failed(AppError::fail("worker")),
                Cause::Failed(AppError::fail("stop refused")),
            ]
        );
    }

    #[test]
    fn test_stop_panic_completes_immediately() {
        let (mut run, app) = started();
        app.tracker().panic_on_stop = true;

        run.on_signal(ShutdownSignal::Interrupt);

        assert_eq!(
            causes(run.take_outcome()),
            vec![Cause::Failed(AppError::Panicked {
                message: "stop exploded".into()
            })]
        );
    }

    #[test]
    fn test_start_error_takes_crash_path() {
        let app = FakeApp::default();
        app.tracker().start_error = Some(AppError::fail("no config"));
        let mut run = RunState::new(app.clone(), KILL);

        run.start_application();

        assert_eq!(app.tracker().stop_calls, 1);
        assert!(run.is_kill_timer_running());
        assert!(run.take_outcome().is_none());
    }

    #[test]
    fn test_error_in_stopped_state_completes_with_cause() {
        let (mut run, app) = started();
        app.set_state(AppState::Stopped);

        run.on_event(error("late", AppState::Stopped));

        assert_eq!(
            causes(run.take_outcome()),
            vec![Cause::Failed(AppError::fail("late"))]
        );
        assert_eq!(app.tracker().stop_calls, 0);
    }

    #[test]
    fn test_signal_after_error_stops_once() {
        let (mut run, app) = started();
        run.on_event(error("e1", AppState::Started));
        let deadline = run.kill_deadline();
        assert!(deadline.is_some());

        run.on_signal(ShutdownSignal::Terminate);
        assert_eq!(app.tracker().stop_calls, 1);
        assert_eq!(run.kill_deadline(), deadline);
        assert!(run.take_outcome().is_none());

        app.set_state(AppState::Stopped);
        run.on_event(AppEvent::Stopped);
        assert_eq!(
            causes(run.take_outcome()),
            vec![Cause::Failed(AppError::fail("e1"))]
        );
    }

    #[test]
    fn test_state_panic_during_stop_completes() {
        let (mut run, app) = started();
        app.tracker().panic_on_state = true;

        run.on_signal(ShutdownSignal::Interrupt);

        assert_eq!(
            causes(run.take_outcome()),
            vec![Cause::Failed(AppError::Panicked {
                message: "state exploded".into()
            })]
        );
        assert_eq!(app.tracker().stop_calls, 0);
    }

    #[test]
    fn test_closed_inputs_arm_kill_timer() {
        let (mut run, app) = started();
        run.on_inputs_closed();

        assert!(run.is_kill_timer_running());
        assert_eq!(app.tracker().stop_calls, 0);
        assert!(run.take_outcome().is_none());
    }

    #[test]
    fn test_dispatch_routes_inputs() {
        let (mut run, app) = started();
        run.dispatch(Input::Crash(AppError::fail("boom")));
        assert_eq!(app.tracker().stop_calls, 1);

        app.set_state(AppState::Stopped);
        run.dispatch(Input::Event(AppEvent::Stopped));
        assert_eq!(
            causes(run.take_outcome()),
            vec![Cause::Failed(AppError::fail("boom"))]
        );
    }
}
