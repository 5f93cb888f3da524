//! # Outcome of a supervised run and its translation.
//!
//! [`Outcome`] is the single terminal result of [`Supervisor::run`](crate::Supervisor::run).
//! It is translated either into a `Result<(), MainError>` (for callers that
//! want an error) or into an [`ExitStatus`] (for the process entry point).
//!
//! ## Translation
//! ```text
//! Outcome                          exit  message
//! Clean                              0   ""
//! CancelledClean(terminate)          0   ""
//! CancelledClean(other signal)       1   ""
//! TaskError(usage)                   1   error text + usage hint
//! TaskError(exit error)            code  exit error's message
//! TaskError(other)                   1   error text
//! ForcedTimeout                      1   "took longer than 1 minute to shutdown: exiting forcefully"
//! ```
//! Both translations are pure: the same outcome always yields the same result.

use crate::error::{MainError, TaskError};
use crate::signal::Signal;

/// Message reported when the task ignores cancellation past the grace period.
pub const FORCED_SHUTDOWN_MESSAGE: &str = "took longer than 1 minute to shutdown: exiting forcefully";

/// Second line printed after a usage error.
pub const USAGE_HINT: &str = "Run with --help to see usage.";

/// Terminal result of one supervised run.
#[derive(Debug)]
pub enum Outcome {
    /// The task finished successfully before any signal.
    Clean,

    /// A signal arrived and the task then stopped cleanly (or acknowledged cancellation).
    CancelledClean {
        /// Signal that started the shutdown.
        signal: Signal,
    },

    /// A signal arrived and the task did not stop within the grace period.
    ForcedTimeout {
        /// Signal that started the shutdown.
        signal: Signal,
    },

    /// The task failed.
    TaskError {
        /// What the task returned.
        error: TaskError,
        /// Signal that preceded the failure, if any.
        signal: Option<Signal>,
    },
}

impl Outcome {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            Outcome::Clean => "clean",
            Outcome::CancelledClean { .. } => "cancelled_clean",
            Outcome::ForcedTimeout { .. } => "forced_timeout",
            Outcome::TaskError { .. } => "task_error",
        }
    }

    /// Signal that started the shutdown, if any.
    pub fn signal(&self) -> Option<Signal> {
        match self {
            Outcome::Clean => None,
            Outcome::CancelledClean { signal } | Outcome::ForcedTimeout { signal } => Some(*signal),
            Outcome::TaskError { signal, .. } => *signal,
        }
    }

    /// Converts the outcome into the run's terminal error, if it is one.
    pub fn into_result(self) -> Result<(), MainError> {
        match self {
            Outcome::Clean => Ok(()),
            Outcome::CancelledClean { signal } if signal.is_terminate() => Ok(()),
            Outcome::CancelledClean { signal } => Err(MainError::Interrupted { signal }),
            Outcome::ForcedTimeout { .. } => Err(MainError::ForcedTimeout),
            Outcome::TaskError {
                error,
                signal: None,
            } => Err(MainError::Task(error)),
            Outcome::TaskError {
                error,
                signal: Some(_),
            } => Err(MainError::Shutdown(error)),
        }
    }

    /// Process exit status for this outcome.
    pub fn exit_status(self) -> ExitStatus {
        ExitStatus::from_result(&self.into_result())
    }
}

/// Exit code plus what to print before exiting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExitStatus {
    /// Process exit code.
    pub code: i32,
    /// Error-level message; empty means print nothing.
    pub message: String,
    /// Whether [`USAGE_HINT`] follows the message.
    pub usage: bool,
}

impl ExitStatus {
    /// Successful exit, nothing printed.
    pub fn success() -> Self {
        Self {
            code: 0,
            message: String::new(),
            usage: false,
        }
    }

    /// Translates a run result.
    pub fn from_result(res: &Result<(), MainError>) -> Self {
        match res {
            Ok(()) => Self::success(),
            Err(err) => Self::from_error(err),
        }
    }

    /// Translates a run failure.
    pub fn from_error(err: &MainError) -> Self {
        let failure = |message: String, usage: bool| Self {
            code: 1,
            message,
            usage,
        };
        match err {
            MainError::Interrupted { .. } => failure(String::new(), false),
            MainError::ForcedTimeout => failure(FORCED_SHUTDOWN_MESSAGE.to_string(), false),
            MainError::Task(task) | MainError::Shutdown(task) => {
                if let Some(exit) = task.exit_error() {
                    Self {
                        code: exit.code,
                        message: exit.message.clone(),
                        usage: false,
                    }
                } else {
                    failure(err.to_string(), task.usage_error().is_some())
                }
            }
        }
    }

    /// Lines to print at error level, in order.
    pub fn lines(&self) -> Vec<&str> {
        if self.message.is_empty() {
            return Vec::new();
        }
        let mut lines = vec![self.message.as_str()];
        if self.usage {
            lines.push(USAGE_HINT);
        }
        lines
    }

    /// `true` for exit code 0.
    pub fn is_success(&self) -> bool {
        self.code == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::ContextError;
    use crate::error::{ExitError, UsageError};

    fn status(outcome: Outcome) -> (i32, String, bool) {
        let s = outcome.exit_status();
        (s.code, s.message, s.usage)
    }

    #[test]
    fn clean_exits_zero() {
        assert_eq!(status(Outcome::Clean), (0, String::new(), false));
    }

    #[test]
    fn terminate_and_interrupt_differ() {
        let term = Outcome::CancelledClean {
            signal: Signal::Terminate,
        };
        let int = Outcome::CancelledClean {
            signal: Signal::Interrupt,
        };
        assert_eq!(status(term), (0, String::new(), false));
        assert_eq!(status(int), (1, String::new(), false));
    }

    #[test]
    fn forced_timeout_message() {
        let forced = Outcome::ForcedTimeout {
            signal: Signal::Interrupt,
        };
        assert_eq!(status(forced), (1, FORCED_SHUTDOWN_MESSAGE.to_string(), false));
        assert_eq!(
            MainError::ForcedTimeout.to_string(),
            FORCED_SHUTDOWN_MESSAGE
        );
    }

    #[test]
    fn usage_error_adds_hint() {
        let outcome = Outcome::TaskError {
            error: UsageError::new("$HELLO_FLAG or -flag missing").into(),
            signal: None,
        };
        let s = outcome.exit_status();
        assert_eq!(s.code, 1);
        assert_eq!(
            s.lines(),
            vec![
                "bad usage: $HELLO_FLAG or -flag missing",
                "Run with --help to see usage."
            ]
        );
    }

    #[test]
    fn exit_error_carries_its_code() {
        let outcome = Outcome::TaskError {
            error: ExitError::new(42, "custom").into(),
            signal: Some(Signal::Interrupt),
        };
        assert_eq!(status(outcome), (42, "custom".to_string(), false));
    }

    #[test]
    fn generic_error_after_signal_is_wrapped() {
        let outcome = Outcome::TaskError {
            error: TaskError::other("disk full"),
            signal: Some(Signal::Terminate),
        };
        assert_eq!(
            status(outcome),
            (1, "failed to shutdown: disk full".to_string(), false)
        );
    }

    #[test]
    fn deadline_is_not_cancellation() {
        let outcome = Outcome::TaskError {
            error: ContextError::DeadlineExceeded.into(),
            signal: None,
        };
        assert_eq!(
            status(outcome),
            (1, "context deadline exceeded".to_string(), false)
        );
    }
}
