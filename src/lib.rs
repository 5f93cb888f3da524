//! # gracevisor
//!
//! **Gracevisor** runs one long-lived task under a bounded graceful-shutdown
//! protocol: start the task, wait for it or for a stop request, cancel it
//! cooperatively, and give it a fixed grace period before reporting a forced
//! termination.
//!
//! The same protocol is offered in three shapes:
//! - [`process::main`]: the whole process, from OS signals to exit code;
//! - [`serve::serve`]: a network server, from context cancellation to a
//!   shutdown error;
//! - [`testing`]: an in-process harness that drives a run without an OS
//!   process and serializes concurrent `signal`/`wait` calls.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!   OS signals ──► signal::notify ──┐        TestState::signal ──┐
//!                                   ▼                            ▼
//!                          ┌──────────────────────────────────────────┐
//!                          │  mpsc::Receiver<Signal>  (one slot)      │
//!                          └───────────────────┬──────────────────────┘
//!                                              ▼
//! ┌──────────────┐   ┌────────────────────────────────────────────────┐
//! │ State        │──►│  Supervisor::run(ctx, sigs, state, task)       │
//! │ stdio, env,  │   │  - runner::spawn (catch_unwind, one result)    │
//! │ opts, log,   │   │  - select: completion | signal                 │
//! │ pwd          │   │  - cancel child context, warn once             │
//! └──────────────┘   │  - select: completion | SHUTDOWN_GRACE         │
//!                    └───────────────────────┬────────────────────────┘
//!                                            ▼
//!                 Outcome { Clean | CancelledClean | ForcedTimeout | TaskError }
//!                          │                                  │
//!                          ▼                                  ▼
//!              into_result() → MainError          exit_status() → ExitStatus
//!              (harness, callers)                 (process::main → exit code)
//! ```
//!
//! ### Lifecycle
//! ```text
//! run
//!   ├─► spawn task(child ctx, state)
//!   ├─► task returns first
//!   │     ├─ Ok  ──► Clean                      exit 0
//!   │     └─ Err ──► TaskError                  exit 1 / usage / ExitError code
//!   └─► signal first ──► warn, cancel
//!         ├─ task returns Ok or canceled
//!         │     ├─ terminate ──► CancelledClean exit 0
//!         │     └─ other     ──► CancelledClean exit 1
//!         ├─ task returns other Err ──► TaskError "failed to shutdown: ..."
//!         └─ grace elapsed ──► ForcedTimeout    exit 1, "exiting forcefully"
//! ```
//!
//! ## Features
//! | Area              | Description                                                   | Key types / traits                       |
//! |-------------------|---------------------------------------------------------------|------------------------------------------|
//! | **Supervision**   | Run a task, react to the first signal, bound the shutdown.    | [`Supervisor`], [`Outcome`]              |
//! | **Tasks**         | Define tasks as closures or trait objects.                    | [`Task`], [`TaskFn`], [`TaskRef`]        |
//! | **Context**       | Cancellation, deadlines, values; detach from cancellation.    | [`Context`], [`ContextMutex`]            |
//! | **Process state** | Streams, env, options, logger and working directory.          | [`State`], [`Env`], [`Opts`], [`Logger`] |
//! | **Errors**        | Typed errors and their exit-code translation.                 | [`TaskError`], [`MainError`], [`ExitStatus`] |
//! | **Serving**       | Bounded server shutdown and a draining TCP accept loop.       | [`serve::serve`], [`serve::TcpServer`]   |
//! | **Testing**       | In-process harness with pipes and idempotent wait.            | [`testing::TestMain`], [`testing::TestState`] |
//!
//! ## Optional features
//! - `testing` _(default)_: the [`testing`] harness; pulls in `tempfile`.
//!
//! ## Example
//! ```rust,no_run
//! use clap::Parser;
//! use gracevisor::{Context, Parsed, State, TaskError, TaskFn, UsageError};
//! use tokio::io::AsyncWriteExt;
//!
//! #[derive(Parser)]
//! struct Args {
//!     #[arg(short, long)]
//!     flag: Option<String>,
//! }
//!
//! fn main() {
//!     gracevisor::process::main(TaskFn::arc("hello", |_ctx: Context, mut state: State| async move {
//!         let args = match state.opts.parse::<Args>()? {
//!             Parsed::Args(args) => args,
//!             Parsed::Help(help) => {
//!                 state.stdout.write_all(help.as_bytes()).await?;
//!                 return Ok(());
//!             }
//!         };
//!         let flag = state
//!             .opts
//!             .or_env(args.flag, "HELLO_FLAG")
//!             .ok_or_else(|| UsageError::new("$HELLO_FLAG or -flag missing"))?;
//!         state.stdout.write_all(flag.as_bytes()).await?;
//!         Ok::<(), TaskError>(())
//!     }))
//! }
//! ```
mod config;
mod context;
mod core;
mod env;
mod error;
mod log;
mod mutex;
mod opts;
mod tasks;

pub mod process;
pub mod serve;
pub mod signal;

#[cfg(feature = "testing")]
pub mod testing;

// ---- Public re-exports ----

pub use config::{Config, KILL_GRACE, LOCK_PROBE, SHUTDOWN_GRACE};
pub use context::{Context, ContextError};
pub use crate::core::{
    ExitStatus, FORCED_SHUTDOWN_MESSAGE, Outcome, Reader, State, Supervisor, USAGE_HINT, Writer,
};
pub use env::{Env, EnvError};
pub use error::{BoxError, ExitError, MainError, TaskError, UsageError};
pub use log::{Level, LogInitError, LogSink, Logger, MemorySink, TracingSink, init as init_logging};
pub use mutex::{ContextMutex, ContextMutexGuard, LockError};
pub use opts::{Opts, Parsed};
pub use signal::Signal;
pub use tasks::{BoxTaskFuture, Task, TaskFn, TaskRef};
