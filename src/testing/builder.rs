//! # Harness builder.
//!
//! [`TestMain`] collects what a run should see (task, environment, argv,
//! working directory, standard streams) and [`start`](TestMain::start)s it.

use std::fmt;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncWrite, DuplexStream};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::config::SHUTDOWN_GRACE;
use crate::context::Context;
use crate::core::{Reader, State, Supervisor, Writer};
use crate::env::Env;
use crate::log::{Logger, MemorySink};
use crate::opts::Opts;
use crate::signal;
use crate::tasks::TaskRef;
use crate::testing::error::RunFailure;
use crate::testing::saver::Capture;
use crate::testing::state::{Terminal, TestState};
use crate::testing::stdin::ClosableStdin;

/// Buffer size of the in-memory pipes returned by the `*_pipe` helpers.
pub const PIPE_BUFFER: usize = 64 * 1024;

/// A run that has not been started yet.
///
/// ## Defaults
/// - `env`: empty
/// - `args`: empty, so the run's name is `""`
/// - `pwd`: a fresh temporary directory, removed when the run ends
/// - `stdin`: empty; `stdout`: discarded; `stderr`: captured
/// - `shutdown_grace`: [`SHUTDOWN_GRACE`]
pub struct TestMain {
    task: TaskRef,
    env: Env,
    args: Vec<String>,
    pwd: Option<PathBuf>,
    stdin: Option<Reader>,
    stdout: Option<Writer>,
    stderr: Option<Writer>,
    grace: Duration,
    debug: bool,
}

impl TestMain {
    /// Prepares a run of `task`.
    pub fn new(task: TaskRef) -> Self {
        Self {
            task,
            env: Env::default(),
            args: Vec::new(),
            pwd: None,
            stdin: None,
            stdout: None,
            stderr: None,
            grace: SHUTDOWN_GRACE,
            debug: false,
        }
    }

    /// Environment of the run; clones share storage with the test's handle.
    pub fn env(mut self, env: Env) -> Self {
        self.env = env;
        self
    }

    /// Full argv; the first element is the run's name.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Working directory of the run; nothing is created or removed.
    pub fn pwd(mut self, pwd: impl Into<PathBuf>) -> Self {
        self.pwd = Some(pwd.into());
        self
    }

    /// Stdin of the run. [`TestState::cleanup`] closes it before stopping the run.
    pub fn stdin(mut self, stdin: impl AsyncRead + Send + Unpin + 'static) -> Self {
        self.stdin = Some(Box::new(stdin));
        self
    }

    /// Stdout of the run.
    pub fn stdout(mut self, stdout: impl AsyncWrite + Send + Unpin + 'static) -> Self {
        self.stdout = Some(Box::new(stdout));
        self
    }

    /// Replaces the captured stderr; failures then carry no stderr text.
    pub fn stderr(mut self, stderr: impl AsyncWrite + Send + Unpin + 'static) -> Self {
        self.stderr = Some(Box::new(stderr));
        self
    }

    /// How long the run may take to return after a signal before it is
    /// reported as forced.
    pub fn shutdown_grace(mut self, grace: Duration) -> Self {
        self.grace = grace;
        self
    }

    /// Emits the run's debug log lines.
    pub fn log_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Connects the run's stdin to a pipe and returns the writing end.
    pub fn stdin_pipe(&mut self) -> DuplexStream {
        let (ours, theirs) = tokio::io::duplex(PIPE_BUFFER);
        self.stdin = Some(Box::new(theirs));
        ours
    }

    /// Connects the run's stdout to a pipe and returns the reading end.
    ///
    /// The pipe reaches EOF once the run closes or drops its stdout.
    pub fn stdout_pipe(&mut self) -> DuplexStream {
        let (ours, theirs) = tokio::io::duplex(PIPE_BUFFER);
        self.stdout = Some(Box::new(theirs));
        ours
    }

    /// Connects the run's stderr to a pipe and returns the reading end.
    pub fn stderr_pipe(&mut self) -> DuplexStream {
        let (ours, theirs) = tokio::io::duplex(PIPE_BUFFER);
        self.stderr = Some(Box::new(theirs));
        ours
    }

    /// Starts the run in the background and returns its handle.
    ///
    /// Must be called from within a Tokio runtime. Fails only when the
    /// temporary working directory cannot be created.
    pub fn start(self, ctx: &Context) -> io::Result<TestState> {
        let (tempdir, pwd) = match self.pwd {
            Some(pwd) => (None, pwd),
            None => {
                let dir = tempfile::tempdir()?;
                let pwd = dir.path().to_path_buf();
                (Some(dir), pwd)
            }
        };

        let mut argv = self.args.into_iter();
        let name = argv.next().unwrap_or_default();
        let args: Vec<String> = argv.collect();

        let logs = Arc::new(MemorySink::default());
        let log = Logger::new(logs.clone(), self.debug);

        let (stderr, capture): (Writer, Option<Capture>) = match self.stderr {
            Some(stderr) => (stderr, None),
            None => {
                let capture = Capture::default();
                (Box::new(capture.clone()), Some(capture))
            }
        };

        let stdin_closed = CancellationToken::new();
        let stdin: Reader = self.stdin.unwrap_or_else(|| Box::new(tokio::io::empty()));

        let state = State {
            name: name.clone(),
            stdin: Box::new(ClosableStdin::new(stdin, stdin_closed.clone())),
            stdout: self.stdout.unwrap_or_else(|| Box::new(tokio::io::sink())),
            stderr,
            log: log.clone(),
            opts: Opts::new(self.env.clone(), name.clone(), args),
            env: self.env,
            pwd,
        };

        let (sig_tx, mut sig_rx) = signal::channel();
        let (done_tx, done_rx) = mpsc::channel::<Terminal>(1);
        let task = self.task;
        let ctx = ctx.clone();
        let run_name = name.clone();
        let grace = self.grace;

        tokio::spawn(async move {
            let _tempdir = tempdir;
            let outcome = Supervisor::new(log)
                .with_grace(grace)
                .run(&ctx, &mut sig_rx, state, &task)
                .await;
            debug!(name = %run_name, outcome = outcome.as_label(), "testing main finished");

            let terminal = outcome.into_result().map_err(|error| {
                let stderr = capture
                    .map(|c| c.to_string_lossy())
                    .filter(|s| !s.is_empty());
                Arc::new(RunFailure { error, stderr })
            });
            // Capacity 1 and a single send: never waits.
            let _ = done_tx.send(terminal).await;
        });

        Ok(TestState::new(name, sig_tx, done_rx, stdin_closed, logs))
    }
}

impl fmt::Debug for TestMain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestMain")
            .field("task", &self.task.name())
            .field("args", &self.args)
            .field("pwd", &self.pwd)
            .field("grace", &self.grace)
            .field("debug", &self.debug)
            .finish_non_exhaustive()
    }
}
