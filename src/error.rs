//! Error types used by supervised runs.
//!
//! This module defines:
//!
//! - [`TaskError`] — what a task returns when it fails.
//! - [`UsageError`] — the caller misused the command; reported with a usage hint.
//! - [`ExitError`] — the task asks for a specific exit code and message.
//! - [`MainError`] — the terminal error of a whole supervised run.
//!
//! Each enum provides `as_label` for logs/metrics. Classification helpers
//! ([`TaskError::exit_error`], [`TaskError::usage_error`]) also look inside
//! opaque errors' source chains, so wrapping an `ExitError` in a custom error
//! type does not lose its exit code.

use std::error::Error as StdError;
use std::fmt;

use thiserror::Error;

use crate::context::ContextError;
use crate::signal::Signal;

/// Boxed, thread-safe error used for opaque failures.
pub type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// The command was invoked incorrectly.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("bad usage: {message}")]
pub struct UsageError {
    /// What was wrong with the invocation.
    pub message: String,
}

impl UsageError {
    /// Usage error with `message`.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Request to exit the process with `code`, printing `message` if non-empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExitError {
    /// Process exit code.
    pub code: i32,
    /// Message printed at error level; empty means "print nothing".
    pub message: String,
}

impl ExitError {
    /// Exit request with `code` and `message`.
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for ExitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "exiting with code {}", self.code)?;
        if !self.message.is_empty() {
            write!(f, ": {}", self.message)?;
        }
        Ok(())
    }
}

impl StdError for ExitError {}

/// # Errors returned by a task.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum TaskError {
    /// Misuse of the command line.
    #[error(transparent)]
    Usage(#[from] UsageError),

    /// Explicit exit code request.
    #[error(transparent)]
    Exit(#[from] ExitError),

    /// The task stopped because its context finished.
    #[error(transparent)]
    Context(#[from] ContextError),

    /// The task panicked; the payload message is kept when it is a string.
    #[error("task panicked: {message}")]
    Panicked {
        /// Panic payload, or a placeholder for non-string payloads.
        message: String,
    },

    /// Anything else.
    #[error(transparent)]
    Other(BoxError),
}

impl TaskError {
    /// Wraps an arbitrary error.
    pub fn other(err: impl Into<BoxError>) -> Self {
        TaskError::Other(err.into())
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use gracevisor::{TaskError, UsageError};
    ///
    /// let err = TaskError::from(UsageError::new("missing flag"));
    /// assert_eq!(err.as_label(), "task_usage");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            TaskError::Usage(_) => "task_usage",
            TaskError::Exit(_) => "task_exit",
            TaskError::Context(ContextError::Canceled) => "task_canceled",
            TaskError::Context(ContextError::DeadlineExceeded) => "task_deadline_exceeded",
            TaskError::Panicked { .. } => "task_panicked",
            TaskError::Other(_) => "task_failed",
        }
    }

    /// `true` when the task merely acknowledged cancellation.
    ///
    /// Such errors are not failures when they follow a shutdown request.
    pub fn is_canceled(&self) -> bool {
        match self {
            TaskError::Context(ContextError::Canceled) => true,
            TaskError::Other(err) => find_in_chain::<ContextError>(err.as_ref())
                .is_some_and(|e| *e == ContextError::Canceled),
            _ => false,
        }
    }

    /// The [`ExitError`] this error is or wraps, if any.
    pub fn exit_error(&self) -> Option<&ExitError> {
        match self {
            TaskError::Exit(e) => Some(e),
            TaskError::Other(err) => find_in_chain(err.as_ref()),
            _ => None,
        }
    }

    /// The [`UsageError`] this error is or wraps, if any.
    pub fn usage_error(&self) -> Option<&UsageError> {
        match self {
            TaskError::Usage(e) => Some(e),
            TaskError::Other(err) => find_in_chain(err.as_ref()),
            _ => None,
        }
    }
}

impl From<std::io::Error> for TaskError {
    fn from(err: std::io::Error) -> Self {
        TaskError::Other(Box::new(err))
    }
}

/// Walks `err` and its sources looking for a `T`.
fn find_in_chain<'a, T: StdError + 'static>(err: &'a (dyn StdError + 'static)) -> Option<&'a T> {
    let mut cur = Some(err);
    while let Some(e) = cur {
        if let Some(found) = e.downcast_ref::<T>() {
            return Some(found);
        }
        cur = e.source();
    }
    None
}

/// # Terminal error of a supervised run.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum MainError {
    /// The task failed before any signal arrived.
    #[error(transparent)]
    Task(TaskError),

    /// The task failed while shutting down after a signal.
    #[error("failed to shutdown: {0}")]
    Shutdown(#[source] TaskError),

    /// The task shut down cleanly after a non-terminate signal.
    #[error("interrupted by signal: {signal}")]
    Interrupted {
        /// The signal that started the shutdown.
        signal: Signal,
    },

    /// The task did not finish within the shutdown grace period.
    #[error("took longer than 1 minute to shutdown: exiting forcefully")]
    ForcedTimeout,
}

impl MainError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            MainError::Task(_) => "main_task_failed",
            MainError::Shutdown(_) => "main_shutdown_failed",
            MainError::Interrupted { .. } => "main_interrupted",
            MainError::ForcedTimeout => "main_forced_timeout",
        }
    }

    /// The task error behind this run failure, if there is one.
    pub fn task_error(&self) -> Option<&TaskError> {
        match self {
            MainError::Task(e) | MainError::Shutdown(e) => Some(e),
            _ => None,
        }
    }
}
