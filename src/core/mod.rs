//! Runtime core: supervision and exit translation.
//!
//! The only entry point most callers need is [`Supervisor`], which runs one
//! task, reacts to the first stop signal and bounds how long shutdown may take.
//!
//! Internal modules:
//! - [`runner`]: spawns the task and publishes its result exactly once;
//! - [`supervisor`]: the start → signal → cancel → bounded wait protocol;
//! - [`outcome`]: terminal result of a run and its exit status;
//! - [`state`]: per-run process state handed to the task.

mod outcome;
mod runner;
mod state;
mod supervisor;

pub use outcome::{ExitStatus, FORCED_SHUTDOWN_MESSAGE, Outcome, USAGE_HINT};
pub use state::{Reader, State, Writer};
pub use supervisor::Supervisor;
