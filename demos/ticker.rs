//! # Demo: ticker
//!
//! A small application supervised by [`Runner`]: it ticks every 500ms until it
//! is asked to stop (Ctrl-C / SIGTERM) or fails on its own.
//!
//! Shows how to:
//! - Implement the [`Application`] contract.
//! - Emit lifecycle events through a [`ListenerSet`].
//! - Schedule crash-isolated work with [`Scope::spawn`].
//! - Attach the built-in [`LogListener`].
//!
//! ## Flow
//! ```text
//! Runner::run()
//!     ├─► Ticker::create(options, scope)
//!     ├─► subscribe(runner listener) + LogListener
//!     ├─► start() ──► Started, spawn tick loop
//!     ├─► Ctrl-C ──► stop() ──► tick loop drains ──► Stopped
//!     └─► Ok(())        (or StopTimedOut if the drain exceeds the kill timer)
//! ```
//!
//! ## Run
//! ```bash
//! RUST_LOG=debug cargo run --example ticker --features logging
//! # optional: fail after N ticks to see error aggregation
//! TICKER_FAIL_AFTER=5 cargo run --example ticker --features logging
//! ```

use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Context;
use appvisor::{
    AppError, AppState, Application, Listener, ListenerSet, LogListener, Runner, RunnerConfig,
    Scope,
};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

/// Construction options.
struct TickerOptions {
    interval: Duration,
    drain: Duration,
    fail_after: Option<u64>,
}

struct Ticker {
    opts: TickerOptions,
    scope: Scope,
    listeners: ListenerSet,
    state: Arc<Mutex<AppState>>,
    stop: CancellationToken,
}

impl Ticker {
    fn set_state(state: &Mutex<AppState>, next: AppState) {
        if let Ok(mut s) = state.lock() {
            *s = next;
        }
    }

    fn current(state: &Mutex<AppState>) -> AppState {
        state.lock().map(|s| *s).unwrap_or(AppState::Stopped)
    }
}

impl Application for Ticker {
    type Options = TickerOptions;

    fn create(opts: TickerOptions, scope: Scope) -> Result<Self, AppError> {
        if opts.interval.is_zero() {
            return Err(AppError::fail("tick interval must be non-zero"));
        }
        let mut listeners = ListenerSet::new();
        listeners.add(Arc::new(LogListener));
        Ok(Self {
            opts,
            scope,
            listeners,
            state: Arc::new(Mutex::new(AppState::Stopped)),
            stop: CancellationToken::new(),
        })
    }

    fn subscribe(&mut self, listener: Arc<dyn Listener>) {
        self.listeners.add(listener);
    }

    fn start(&mut self) -> Result<(), AppError> {
        Self::set_state(&self.state, AppState::Starting);

        let interval = self.opts.interval;
        let drain = self.opts.drain;
        let fail_after = self.opts.fail_after;
        let state = Arc::clone(&self.state);
        let listeners = self.listeners.clone();
        let stop = self.stop.clone();

        self.scope.spawn(async move {
            Self::set_state(&state, AppState::Started);
            listeners.started();

            let mut ticks: u64 = 0;
            let mut timer = tokio::time::interval(interval);
            loop {
                tokio::select! {
                    _ = stop.cancelled() => break,
                    _ = timer.tick() => {
                        ticks += 1;
                        tracing::info!(ticks, "tick");
                        if fail_after == Some(ticks) {
                            let err = AppError::fail(format!("gave up after {ticks} ticks"));
                            listeners.error(Self::current(&state), err);
                        }
                    }
                }
            }

            tokio::time::sleep(drain).await;
            Self::set_state(&state, AppState::Stopped);
            listeners.stopped();
            Ok(())
        });
        Ok(())
    }

    fn stop(&mut self) -> Result<(), AppError> {
        Self::set_state(&self.state, AppState::Stopping);
        self.stop.cancel();
        Ok(())
    }

    fn state(&self) -> AppState {
        Self::current(&self.state)
    }
}

fn fail_after_from_env() -> anyhow::Result<Option<u64>> {
    match std::env::var("TICKER_FAIL_AFTER") {
        Ok(raw) => {
            let n = raw
                .parse::<u64>()
                .with_context(|| format!("TICKER_FAIL_AFTER={raw:?} is not a number"))?;
            Ok(Some(n))
        }
        Err(_) => Ok(None),
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let opts = TickerOptions {
        interval: Duration::from_millis(500),
        drain: Duration::from_millis(300),
        fail_after: fail_after_from_env()?,
    };
    let runner = Runner::<Ticker>::with_config(opts, RunnerConfig::default());

    match runner.run().await {
        Ok(()) => {
            tracing::info!("ticker exited cleanly");
            Ok(())
        }
        Err(err) => {
            tracing::error!(label = err.as_label(), %err, "ticker failed");
            Err(err.into())
        }
    }
}
