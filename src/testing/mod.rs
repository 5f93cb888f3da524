//! # In-process test harness for supervised runs.
//!
//! Drives a task through the same [`Supervisor`](crate::Supervisor) the
//! process entry point uses, without spawning a process:
//!
//! ```text
//! TestMain (not started) ──start(ctx)──► TestState (running) ──► done
//!   env / args / pwd                        signal(ctx, sig)
//!   stdin / stdout / stderr                 wait(ctx)
//!   *_pipe() test-side ends                 exit_error()
//!                                           cleanup()
//! ```
//!
//! ## Rules
//! - `signal` and `wait` are serialized by a [`ContextMutex`](crate::ContextMutex);
//!   whichever observes completion first caches the terminal result.
//! - Once done, every call returns the cached result without blocking.
//! - Unless the test supplies stderr, it is captured into a bounded buffer
//!   and appended to a failing result.
//!
//! ## Example
//! ```rust
//! use gracevisor::testing::TestMain;
//! use gracevisor::{Context, State, TaskError, TaskFn};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let ctx = Context::background();
//! let ts = TestMain::new(TaskFn::arc("noop", |_ctx: Context, _state: State| async {
//!     Ok::<(), TaskError>(())
//! }))
//! .args(["noop"])
//! .start(&ctx)?;
//!
//! ts.wait(&ctx).await?;
//! # Ok(())
//! # }
//! ```

mod builder;
mod error;
mod saver;
mod state;
mod stdin;

pub use builder::{PIPE_BUFFER, TestMain};
pub use error::{HarnessCause, HarnessError, RunFailure};
pub use saver::{Capture, PrefixSuffixSaver, STDERR_LIMIT};
pub use state::{Terminal, TestState};
