//! Error types used by the runner and by supervised applications.
//!
//! This module defines:
//!
//! - [`AppError`] - a failure raised by the application (reported or panicked).
//! - [`Cause`] - one entry of the run's aggregate, classified by where it surfaced.
//! - [`ApplicationException`] - the ordered aggregate of every cause seen during a run.
//! - [`RunError`] - the single terminal error returned by [`Runner::run`](crate::Runner::run).
//!
//! All types provide `as_label` for logs/metrics, matching the stable snake_case
//! labels used across the crate.

use std::any::Any;
use std::fmt;
use std::time::Duration;

use thiserror::Error;

/// # Failures raised by the supervised application.
///
/// `Fail` is reported by application code (an `Err` from `start`/`stop`/a scoped
/// task, or an [`AppEvent::Error`](crate::AppEvent::Error)). `Panicked` is produced
/// by the crash isolation boundary when application code unwinds.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AppError {
    /// Application reported a failure.
    #[error("application failed: {error}")]
    Fail {
        /// The underlying error message.
        error: String,
    },

    /// Application code panicked and the panic was caught at the boundary.
    #[error("application panicked: {message}")]
    Panicked {
        /// Panic payload rendered as text.
        message: String,
    },
}

impl AppError {
    /// Shorthand for [`AppError::Fail`].
    ///
    /// # Example
    /// ```
    /// use appvisor::AppError;
    ///
    /// let err = AppError::fail("port in use");
    /// assert_eq!(err.to_string(), "application failed: port in use");
    /// ```
    pub fn fail(error: impl Into<String>) -> Self {
        AppError::Fail {
            error: error.into(),
        }
    }

    /// Builds [`AppError::Panicked`] from a `catch_unwind` payload.
    pub fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&'static str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "non-string panic payload".to_string()
        };
        AppError::Panicked { message }
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            AppError::Fail { .. } => "app_failed",
            AppError::Panicked { .. } => "app_panicked",
        }
    }

    /// True if this error was produced by catching a panic.
    pub fn is_panic(&self) -> bool {
        matches!(self, AppError::Panicked { .. })
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Fail {
            error: format!("{err:#}"),
        }
    }
}

/// # One cause inside the run aggregate.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Cause {
    /// An error was observed while the application was still starting.
    #[error("application failed to start: {cause}")]
    StartFailed {
        /// The original failure.
        #[source]
        cause: AppError,
    },

    /// An error raised while running or stopping, or caught at the boundary.
    #[error(transparent)]
    Failed(#[from] AppError),

    /// Shutdown did not finish before the kill timer expired.
    #[error("application stop timed out after {timeout:?}")]
    StopTimedOut {
        /// The configured kill timeout.
        timeout: Duration,
    },
}

impl Cause {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use appvisor::Cause;
    /// use std::time::Duration;
    ///
    /// let cause = Cause::StopTimedOut { timeout: Duration::from_secs(10) };
    /// assert_eq!(cause.as_label(), "stop_timed_out");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            Cause::StartFailed { .. } => "start_failed",
            Cause::Failed(err) => err.as_label(),
            Cause::StopTimedOut { .. } => "stop_timed_out",
        }
    }

    /// Returns the wrapped application error, if any.
    pub fn app_error(&self) -> Option<&AppError> {
        match self {
            Cause::StartFailed { cause } => Some(cause),
            Cause::Failed(err) => Some(err),
            Cause::StopTimedOut { .. } => None,
        }
    }
}

/// # Aggregate of every failure seen during one run.
///
/// Causes are kept in discovery order. The aggregate is created on the first
/// failure of a run and then only appended to.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApplicationException {
    causes: Vec<Cause>,
}

impl ApplicationException {
    /// Creates an empty aggregate.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a cause.
    pub fn add_cause(&mut self, cause: Cause) {
        self.causes.push(cause);
    }

    /// All causes in discovery order.
    pub fn causes(&self) -> &[Cause] {
        &self.causes
    }

    /// Number of causes.
    pub fn len(&self) -> usize {
        self.causes.len()
    }

    /// True if no cause was added yet.
    pub fn is_empty(&self) -> bool {
        self.causes.is_empty()
    }

    /// The wrapped error of the first [`Cause::StartFailed`], if the run failed to start.
    pub fn start_failure(&self) -> Option<&AppError> {
        self.causes.iter().find_map(|c| match c {
            Cause::StartFailed { cause } => Some(cause),
            _ => None,
        })
    }

    /// True if the kill timer forced completion.
    pub fn timed_out(&self) -> bool {
        self.causes
            .iter()
            .any(|c| matches!(c, Cause::StopTimedOut { .. }))
    }
}

impl fmt::Display for ApplicationException {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "an error occurred in the application")?;
        for (i, cause) in self.causes.iter().enumerate() {
            let sep = if i == 0 { ": " } else { "; " };
            write!(f, "{sep}[{}] {cause}", i + 1)?;
        }
        Ok(())
    }
}

impl std::error::Error for ApplicationException {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.causes
            .first()
            .map(|c| c as &(dyn std::error::Error + 'static))
    }
}

/// # Terminal error of a run.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RunError {
    /// `run` was called more than once on the same runner.
    #[error("run already called on Runner; run may only be called once")]
    IllegalState,

    /// One or more failures were collected during the run.
    #[error(transparent)]
    Application(#[from] ApplicationException),
}

impl RunError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use appvisor::RunError;
    ///
    /// assert_eq!(RunError::IllegalState.as_label(), "illegal_state");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            RunError::IllegalState => "illegal_state",
            RunError::Application(_) => "application_exception",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            RunError::IllegalState => "run already called".to_string(),
            RunError::Application(agg) => {
                let labels: Vec<&str> = agg.causes().iter().map(Cause::as_label).collect();
                format!("{} cause(s): {labels:?}", agg.len())
            }
        }
    }

    /// Returns the aggregate, if this is an application failure.
    pub fn aggregate(&self) -> Option<&ApplicationException> {
        match self {
            RunError::Application(agg) => Some(agg),
            RunError::IllegalState => None,
        }
    }
}
