//! # Process entry point.
//!
//! [`main`] is what a binary's `fn main` delegates to. It wires the real
//! process into a supervised run and never returns:
//!
//! ```text
//! main(task)
//!   ├─► runtime        multi-thread tokio runtime
//!   ├─► Env::from_os   → Config::from_env → log::init
//!   ├─► State          argv, stdio, Logger::tracing, current dir
//!   ├─► signal::notify SIGINT / SIGTERM → channel
//!   ├─► Supervisor::run(background, sigs, state, task) → Outcome
//!   └─► ExitStatus     error lines → logger, then exit(code)
//! ```
//!
//! Setup failures (bad `DEBUG`/`COLOR`, no working directory, signal
//! registration) are reported on stderr and exit with code 1.

use std::io;

use thiserror::Error;
use tracing::debug;

use crate::config::Config;
use crate::context::Context;
use crate::core::{ExitStatus, State, Supervisor};
use crate::env::{Env, EnvError};
use crate::log::{self, LogInitError, Logger};
use crate::opts::Opts;
use crate::signal;
use crate::tasks::TaskRef;

/// Why the process could not even start the task.
#[derive(Error, Debug)]
enum SetupError {
    #[error("failed to build runtime: {0}")]
    Runtime(#[source] io::Error),

    #[error(transparent)]
    Env(#[from] EnvError),

    #[error(transparent)]
    Log(#[from] LogInitError),

    #[error("failed to get working directory: {0}")]
    Pwd(#[source] io::Error),

    #[error("failed to listen for signals: {0}")]
    Signals(#[source] io::Error),
}

/// Runs `task` as the whole process and exits with its translated status.
///
/// # Example
/// ```rust,no_run
/// use gracevisor::{Context, State, TaskError, TaskFn};
///
/// fn main() {
///     gracevisor::process::main(TaskFn::arc("app", |ctx: Context, _state: State| async move {
///         ctx.done().await;
///         Ok::<(), TaskError>(())
///     }))
/// }
/// ```
pub fn main(task: TaskRef) -> ! {
    let code = match run(task) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("err: {err}");
            1
        }
    };
    std::process::exit(code)
}

fn run(task: TaskRef) -> Result<i32, SetupError> {
    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(SetupError::Runtime)?;

    let env = Env::from_os();
    let config = Config::from_env(&env)?;
    log::init(&config)?;

    let mut argv = std::env::args_os().map(|a| a.to_string_lossy().into_owned());
    let name = argv.next().unwrap_or_else(|| task.name().to_string());
    let args: Vec<String> = argv.collect();
    let pwd = std::env::current_dir().map_err(SetupError::Pwd)?;
    let logger = Logger::tracing(config.debug);

    let status = rt.block_on(async {
        let mut sigs = signal::notify().map_err(SetupError::Signals)?;
        let state = State {
            name: name.clone(),
            stdin: Box::new(tokio::io::stdin()),
            stdout: Box::new(tokio::io::stdout()),
            stderr: Box::new(tokio::io::stderr()),
            log: logger.clone(),
            opts: Opts::new(env.clone(), name, args),
            env,
            pwd,
        };

        let outcome = Supervisor::new(logger.clone())
            .run(&Context::background(), &mut sigs, state, &task)
            .await;
        debug!(task = task.name(), outcome = outcome.as_label(), "run finished");
        Ok::<ExitStatus, SetupError>(outcome.exit_status())
    })?;

    for line in status.lines() {
        logger.error(line);
    }
    Ok(status.code)
}
