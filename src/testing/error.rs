//! Errors reported by the test harness.
//!
//! A harness call fails either because of the harness itself (the caller's
//! context finished, the lock could not be taken) or because the run it
//! drives is over. [`HarnessError`] names the operation; [`HarnessCause`]
//! says what happened.

use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use crate::context::ContextError;
use crate::error::MainError;
use crate::mutex::LockError;

/// A run that ended with an error, plus whatever it wrote to captured stderr.
#[derive(Debug)]
pub struct RunFailure {
    /// Terminal error of the run.
    pub error: MainError,
    /// Captured stderr; `None` when stderr was supplied by the test or empty.
    pub stderr: Option<String>,
}

impl fmt::Display for RunFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)?;
        if let Some(stderr) = &self.stderr {
            write!(f, "; stderr: {stderr}")?;
        }
        Ok(())
    }
}

impl std::error::Error for RunFailure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

/// What went wrong in a harness call.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum HarnessCause {
    /// The harness lock could not be taken before the caller's context finished.
    #[error(transparent)]
    Lock(#[from] LockError),

    /// The caller's context finished first.
    #[error(transparent)]
    Context(#[from] ContextError),

    /// The run had already finished; carries its failure, if it failed.
    #[error("testing main done{}", done_suffix(.0))]
    Done(Option<Arc<RunFailure>>),

    /// The run finished with an error; every `wait` after completion returns it.
    #[error(transparent)]
    Exited(Arc<RunFailure>),

    /// The run's driver went away without reporting a result.
    #[error("testing main stopped without a result")]
    Lost,
}

fn done_suffix(failure: &Option<Arc<RunFailure>>) -> String {
    match failure {
        Some(failure) => format!(": {failure}"),
        None => String::new(),
    }
}

impl HarnessCause {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            HarnessCause::Lock(_) => "harness_lock",
            HarnessCause::Context(_) => "harness_context",
            HarnessCause::Done(_) => "harness_done",
            HarnessCause::Exited(_) => "harness_exited",
            HarnessCause::Lost => "harness_lost",
        }
    }
}

/// # Errors returned by [`TestState`](super::TestState).
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum HarnessError {
    /// Delivering a signal failed.
    #[error("failed to signal testing main: {name}: {source}")]
    Signal {
        /// Name of the run.
        name: String,
        #[source]
        source: HarnessCause,
    },

    /// Waiting for the run failed, or the run itself failed.
    #[error("failed to wait testing main: {name}: {source}")]
    Wait {
        /// Name of the run.
        name: String,
        #[source]
        source: HarnessCause,
    },
}

impl HarnessError {
    /// What went wrong.
    pub fn cause(&self) -> &HarnessCause {
        match self {
            HarnessError::Signal { source, .. } | HarnessError::Wait { source, .. } => source,
        }
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            HarnessError::Signal { .. } => "harness_signal_failed",
            HarnessError::Wait { .. } => "harness_wait_failed",
        }
    }

    /// `true` when the caller's deadline passed, waiting or locking.
    pub fn is_deadline_exceeded(&self) -> bool {
        matches!(
            self.cause(),
            HarnessCause::Context(ContextError::DeadlineExceeded)
                | HarnessCause::Lock(LockError {
                    source: ContextError::DeadlineExceeded
                })
        )
    }

    /// `true` when the run had already finished before this call.
    pub fn is_done(&self) -> bool {
        matches!(self.cause(), HarnessCause::Done(_))
    }

    /// The run's failure, when this error reports one.
    pub fn run_failure(&self) -> Option<&Arc<RunFailure>> {
        match self.cause() {
            HarnessCause::Done(Some(failure)) | HarnessCause::Exited(failure) => Some(failure),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{TaskError, UsageError};

    fn failure(stderr: Option<&str>) -> Arc<RunFailure> {
        Arc::new(RunFailure {
            error: MainError::Task(TaskError::from(UsageError::new("$HELLO_FLAG or -flag missing"))),
            stderr: stderr.map(str::to_string),
        })
    }

    #[test]
    fn wait_error_names_run_and_cause() {
        let err = HarnessError::Wait {
            name: "hello".into(),
            source: HarnessCause::Exited(failure(None)),
        };
        assert_eq!(
            err.to_string(),
            "failed to wait testing main: hello: bad usage: $HELLO_FLAG or -flag missing"
        );
        assert!(err.run_failure().is_some());
        assert!(!err.is_done());
    }

    #[test]
    fn done_error_appends_stderr() {
        let err = HarnessError::Signal {
            name: "hello".into(),
            source: HarnessCause::Done(Some(failure(Some("panic: oops")))),
        };
        assert_eq!(
            err.to_string(),
            "failed to signal testing main: hello: testing main done: \
             bad usage: $HELLO_FLAG or -flag missing; stderr: panic: oops"
        );
        assert!(err.is_done());
    }

    #[test]
    fn deadline_detection() {
        let ctx_err = HarnessError::Wait {
            name: "x".into(),
            source: ContextError::DeadlineExceeded.into(),
        };
        let lock_err = HarnessError::Signal {
            name: "x".into(),
            source: LockError {
                source: ContextError::DeadlineExceeded,
            }
            .into(),
        };
        let canceled = HarnessError::Wait {
            name: "x".into(),
            source: ContextError::Canceled.into(),
        };
        assert!(ctx_err.is_deadline_exceeded());
        assert!(lock_err.is_deadline_exceeded());
        assert!(!canceled.is_deadline_exceeded());
    }
}
