//! # Crash isolation boundary.
//!
//! Everything the application drives runs behind this boundary:
//!
//! ```text
//! synchronous calls (create/start/stop/state) ──► guard() ──► Result<T, AppError>
//!
//! Scope::spawn(fut) ──► tokio task ──► catch_unwind(fut)
//!                                        ├─ Ok(Ok(()))  → done
//!                                        ├─ Ok(Err(e))  → Input::Crash(e)     ─┐
//!                                        └─ Err(panic)  → Input::Crash(panic) ─┴─► run loop
//!                                                                                  stop_application_with_cause
//! ```
//!
//! ## Rules
//! - A crash never escapes to the host process and never bypasses the run's
//!   single outcome.
//! - Scoped tasks still running when the run completes are dropped (their
//!   [`Scope::token`] is cancelled first).
//!
//! **Warning**: `AssertUnwindSafe` is used, which can leave application state
//! inconsistent after a panic. The runner only ever stops such an application.

use std::future::Future;
use std::panic::{self, AssertUnwindSafe};

use futures::FutureExt;
use tokio::{sync::mpsc, task::JoinHandle};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::core::state::Input;
use crate::error::AppError;

/// Runs `f`, converting a panic into [`AppError::Panicked`].
pub(crate) fn guard<T>(f: impl FnOnce() -> T) -> Result<T, AppError> {
    panic::catch_unwind(AssertUnwindSafe(f)).map_err(AppError::from_panic)
}

/// Handle an application uses to schedule crash-isolated work.
///
/// Cheap to clone. Every clone reports into the same run.
#[derive(Clone, Debug)]
pub struct Scope {
    tx: mpsc::UnboundedSender<Input>,
    token: CancellationToken,
}

impl Scope {
    pub(crate) fn new(tx: mpsc::UnboundedSender<Input>, token: CancellationToken) -> Self {
        Self { tx, token }
    }

    /// Spawns `fut` on the current tokio runtime inside the boundary.
    ///
    /// A panic or an `Err` return is reported to the runner as a crash, which
    /// registers the error, requests a graceful stop and arms the kill timer.
    pub fn spawn<F>(&self, fut: F) -> JoinHandle<()>
    where
        F: Future<Output = Result<(), AppError>> + Send + 'static,
    {
        let tx = self.tx.clone();
        let token = self.token.clone();
        tokio::spawn(async move {
            let outcome = tokio::select! {
                _ = token.cancelled() => return,
                res = AssertUnwindSafe(fut).catch_unwind() => res,
            };
            let err = match outcome {
                Ok(Ok(())) => return,
                Ok(Err(err)) => err,
                Err(payload) => AppError::from_panic(payload),
            };
            debug!(label = err.as_label(), %err, "scoped task crashed");
            let _ = tx.send(Input::Crash(err));
        })
    }

    /// Reports a failure caught outside of [`Scope::spawn`] (threads, FFI callbacks).
    ///
    /// Takes the same path as a crashed scoped task. Ignored once the run completed.
    pub fn report(&self, error: AppError) {
        let _ = self.tx.send(Input::Crash(error));
    }

    /// Token cancelled when the run completes.
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// True once the run has completed.
    pub fn is_closed(&self) -> bool {
        self.token.is_cancelled()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn scope() -> (Scope, mpsc::UnboundedReceiver<Input>, CancellationToken) {
        let (tx, rx) = mpsc::unbounded_channel();
        let token = CancellationToken::new();
        (Scope::new(tx, token.clone()), rx, token)
    }

    fn explode() -> Result<(), AppError> {
        panic!("worker died")
    }

    #[test]
    fn test_guard_passes_value_through() {
        assert_eq!(guard(|| 7), Ok(7));
    }

    #[test]
    fn test_guard_catches_panic() {
        let res: Result<(), AppError> = guard(|| panic!("inside start"));
        assert_eq!(
            res,
            Err(AppError::Panicked {
                message: "inside start".into()
            })
        );
    }

    #[tokio::test]
    async fn test_spawn_routes_panic_as_crash() {
        let (scope, mut rx, _token) = scope();
        let handle = scope.spawn(async { explode() });
        handle.await.unwrap();

        match rx.recv().await {
            Some(Input::Crash(err)) => assert_eq!(
                err,
                AppError::Panicked {
                    message: "worker died".into()
                }
            ),
            other => panic!("unexpected input: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_spawn_routes_error_return_as_crash() {
        let (scope, mut rx, _token) = scope();
        scope
            .spawn(async { Err(AppError::fail("io")) })
            .await
            .unwrap();

        assert!(matches!(
            rx.recv().await,
            Some(Input::Crash(AppError::Fail { .. }))
        ));
    }

    #[tokio::test]
    async fn test_spawn_success_reports_nothing() {
        let (scope, mut rx, _token) = scope();
        scope.spawn(async { Ok(()) }).await.unwrap();
        drop(scope);
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_scope_drops_task() {
        let (scope, mut rx, token) = scope();
        let handle = scope.spawn(async {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Err(AppError::fail("too late"))
        });
        token.cancel();
        handle.await.unwrap();

        assert!(scope.is_closed());
        drop(scope);
        assert!(rx.recv().await.is_none());
    }
}
