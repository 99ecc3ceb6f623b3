//! # OS signal listener scoped to one run.
//!
//! Forwards termination signals into the run loop until the run's token is
//! cancelled. Dropping the listener task drops the signal streams, so signal
//! listeners do not accumulate across sequential runs in one process.
//!
//! ## Signals
//! **Unix platforms:**
//! - `SIGINT` (Ctrl-C in terminal)
//! - `SIGTERM` (default kill signal, used by systemd/Kubernetes)
//!
//! **Other platforms:**
//! - `Ctrl-C` via [`tokio::signal::ctrl_c`]
//!
//! Note: tokio keeps its process-level handler installed after the first
//! registration; once the streams are dropped a signal is no longer delivered
//! anywhere rather than restored to the default disposition.

use tokio::{sync::mpsc, task::JoinHandle};
use tokio_util::sync::CancellationToken;

use crate::core::state::Input;

/// Termination signal observed during a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ShutdownSignal {
    Interrupt,
    Terminate,
}

impl ShutdownSignal {
    pub(crate) fn as_label(&self) -> &'static str {
        match self {
            ShutdownSignal::Interrupt => "sigint",
            ShutdownSignal::Terminate => "sigterm",
        }
    }
}

/// Registers signal streams and spawns the forwarding task.
///
/// Returns `Err` if signal registration fails.
#[cfg(unix)]
pub(crate) fn spawn_signal_listener(
    tx: mpsc::UnboundedSender<Input>,
    token: CancellationToken,
) -> std::io::Result<JoinHandle<()>> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;

    Ok(tokio::spawn(async move {
        loop {
            let sig = tokio::select! {
                _ = token.cancelled() => break,
                Some(()) = sigint.recv() => ShutdownSignal::Interrupt,
                Some(()) = sigterm.recv() => ShutdownSignal::Terminate,
            };
            if tx.send(Input::Signal(sig)).is_err() {
                break;
            }
        }
    }))
}

/// Registers signal streams and spawns the forwarding task.
///
/// Returns `Err` if signal registration fails.
#[cfg(not(unix))]
pub(crate) fn spawn_signal_listener(
    tx: mpsc::UnboundedSender<Input>,
    token: CancellationToken,
) -> std::io::Result<JoinHandle<()>> {
    Ok(tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = token.cancelled() => break,
                res = tokio::signal::ctrl_c() => {
                    if res.is_err() || tx.send(Input::Signal(ShutdownSignal::Interrupt)).is_err() {
                        break;
                    }
                }
            }
        }
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_listener_exits_on_cancel() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let token = CancellationToken::new();
        let handle = spawn_signal_listener(tx, token.clone()).unwrap();

        token.cancel();
        handle.await.unwrap();
    }
}
