//! # Supervisor: runs one task, handles stop signals, bounds shutdown.
//!
//! The [`Supervisor`] runs a single task in the background and turns
//! whatever happens next into exactly one [`Outcome`].
//!
//! ## Protocol
//! ```text
//! run(ctx, sigs, state, task)
//!   ├─► child = ctx.with_cancel()
//!   ├─► completion = runner::spawn(task, child, state)
//!   │
//!   ├─► select: completion | sigs.recv()
//!   │     ├─ completion Ok   ─► Clean
//!   │     ├─ completion Err  ─► TaskError { signal: None }
//!   │     └─ signal          ─► log.warn("received signal ..."), child.cancel()
//!   │
//!   └─► select: completion | sleep(SHUTDOWN_GRACE)
//!         ├─ Ok / canceled   ─► CancelledClean { signal }
//!         ├─ other Err       ─► TaskError { signal: Some(_) }
//!         └─ grace elapsed   ─► ForcedTimeout { signal }   (task left detached)
//! ```
//!
//! ## Rules
//! - The child context is cancelled **at most once**, only after a signal.
//! - Exactly one warn line is written per received signal; later signals are not read.
//! - A closed signal channel is not a signal: the supervisor keeps waiting
//!   for the task.
//! - The grace period is measured from signal receipt, not from task start.
//! - The task is never retried or aborted.
//!
//! ## Example
//! ```rust,no_run
//! use gracevisor::{Context, State, Supervisor, TaskError, TaskFn, TaskRef};
//!
//! async fn run(state: State) {
//!     let task: TaskRef = TaskFn::arc("worker", |ctx: Context, _state: State| async move {
//!         ctx.done().await;
//!         Ok::<(), TaskError>(())
//!     });
//!     let (_tx, mut sigs) = gracevisor::signal::channel();
//!     let sup = Supervisor::new(state.log.clone());
//!     let outcome = sup.run(&Context::background(), &mut sigs, state, &task).await;
//!     println!("{}", outcome.as_label());
//! }
//! ```

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time;
use tracing::debug;

use crate::config::SHUTDOWN_GRACE;
use crate::context::Context;
use crate::core::outcome::Outcome;
use crate::core::runner;
use crate::core::State;
use crate::error::TaskError;
use crate::log::Logger;
use crate::signal::Signal;
use crate::tasks::TaskRef;

/// What the supervisor has observed so far in one run.
#[derive(Debug, Default)]
struct RunState {
    signal: Option<Signal>,
    cancelled: bool,
    task_done: bool,
}

impl RunState {
    /// Folds the task's result into the final outcome.
    fn complete(&mut self, res: Result<(), TaskError>) -> Outcome {
        self.task_done = true;
        match (self.signal, res) {
            (None, Ok(())) => Outcome::Clean,
            (None, Err(error)) => Outcome::TaskError {
                error,
                signal: None,
            },
            (Some(signal), Ok(())) => Outcome::CancelledClean { signal },
            (Some(signal), Err(error)) if error.is_canceled() => {
                Outcome::CancelledClean { signal }
            }
            (Some(signal), Err(error)) => Outcome::TaskError {
                error,
                signal: Some(signal),
            },
        }
    }
}

/// Runs a task under the start → signal → cancel → bounded wait protocol.
#[derive(Debug, Clone)]
pub struct Supervisor {
    log: Logger,
    grace: Duration,
}

impl Supervisor {
    /// Creates a supervisor that reports signal receipt to `log`.
    pub fn new(log: Logger) -> Self {
        Self {
            log,
            grace: SHUTDOWN_GRACE,
        }
    }

    /// Overrides how long a cancelled task may take to return
    /// (default [`SHUTDOWN_GRACE`]).
    pub fn with_grace(mut self, grace: Duration) -> Self {
        self.grace = grace;
        self
    }

    /// Runs `task` until it finishes or, after a signal, until the grace period ends.
    pub async fn run(
        &self,
        ctx: &Context,
        sigs: &mut mpsc::Receiver<Signal>,
        state: State,
        task: &TaskRef,
    ) -> Outcome {
        let ctx = ctx.with_cancel();
        let mut run = RunState::default();
        let mut completion = runner::spawn(task, ctx.clone(), state);
        debug!(task = task.name(), "task started");

        let signal = tokio::select! {
            res = &mut completion => {
                let outcome = run.complete(res);
                debug!(task = task.name(), outcome = outcome.as_label(), "task finished");
                return outcome;
            }
            Some(sig) = sigs.recv() => sig,
        };

        run.signal = Some(signal);
        self.log
            .warn(format!("received signal {signal}: shutting down..."));
        ctx.cancel();
        run.cancelled = true;

        tokio::select! {
            res = &mut completion => {
                let outcome = run.complete(res);
                debug!(
                    task = task.name(),
                    signal = signal.as_label(),
                    outcome = outcome.as_label(),
                    "task finished after cancellation"
                );
                outcome
            }
            _ = time::sleep(self.grace) => {
                debug!(
                    task = task.name(),
                    signal = signal.as_label(),
                    grace = ?self.grace,
                    cancelled = run.cancelled,
                    task_done = run.task_done,
                    "grace period elapsed; abandoning task"
                );
                Outcome::ForcedTimeout { signal }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::context::ContextError;
    use crate::core::outcome::FORCED_SHUTDOWN_MESSAGE;
    use crate::env::Env;
    use crate::error::{MainError, TaskError};
    use crate::log::{Level, MemorySink};
    use crate::opts::Opts;
    use crate::signal;
    use crate::tasks::TaskFn;

    fn state(log: &Logger) -> State {
        let env = Env::default();
        State {
            name: "test".into(),
            stdin: Box::new(tokio::io::empty()),
            stdout: Box::new(tokio::io::sink()),
            stderr: Box::new(tokio::io::sink()),
            log: log.clone(),
            opts: Opts::new(env.clone(), "test", Vec::new()),
            env,
            pwd: std::env::temp_dir(),
        }
    }

    fn until_cancelled() -> TaskRef {
        TaskFn::arc("until-cancelled", |ctx: Context, _state: State| async move {
            ctx.done().await;
            Err::<(), _>(TaskError::from(ContextError::Canceled))
        })
    }

    async fn run_with(task: TaskRef, sig: Option<Signal>) -> (Outcome, Arc<MemorySink>) {
        let sink = Arc::new(MemorySink::default());
        let log = Logger::new(sink.clone(), false);
        let (tx, mut rx) = signal::channel();
        if let Some(sig) = sig {
            tx.send(sig).await.unwrap();
        }
        let outcome = Supervisor::new(log.clone())
            .run(&Context::background(), &mut rx, state(&log), &task)
            .await;
        drop(tx);
        (outcome, sink)
    }

    #[tokio::test(start_paused = true)]
    async fn clean_without_signal() {
        let task: TaskRef = TaskFn::arc("ok", |_ctx: Context, _state: State| async {
            Ok::<(), TaskError>(())
        });
        let (outcome, sink) = run_with(task, None).await;
        assert!(matches!(outcome, Outcome::Clean));
        assert!(outcome.into_result().is_ok());
        assert!(sink.lines().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn error_without_signal() {
        let task: TaskRef = TaskFn::arc("boom", |_ctx: Context, _state: State| async {
            Err::<(), _>(TaskError::other("boom"))
        });
        let (outcome, _) = run_with(task, None).await;
        let err = outcome.into_result().unwrap_err();
        assert!(matches!(err, MainError::Task(_)));
        assert_eq!(err.to_string(), "boom");
    }

    #[tokio::test(start_paused = true)]
    async fn interrupt_then_cancelled_exits_one() {
        let (outcome, sink) = run_with(until_cancelled(), Some(Signal::Interrupt)).await;
        assert!(matches!(
            outcome,
            Outcome::CancelledClean {
                signal: Signal::Interrupt
            }
        ));
        assert_eq!(outcome.exit_status().code, 1);
        assert_eq!(
            sink.lines(),
            vec![(
                Level::Warn,
                "received signal interrupt: shutting down...".to_string()
            )]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn terminate_then_cancelled_exits_zero() {
        let (outcome, _) = run_with(until_cancelled(), Some(Signal::Terminate)).await;
        assert_eq!(outcome.exit_status().code, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn task_ignoring_cancellation_is_forced() {
        let stubborn: TaskRef = TaskFn::arc("stubborn", |_ctx: Context, _state: State| async {
            std::future::pending::<()>().await;
            Ok::<(), TaskError>(())
        });
        let start = time::Instant::now();
        let (outcome, _) = run_with(stubborn, Some(Signal::Interrupt)).await;

        assert!(matches!(outcome, Outcome::ForcedTimeout { .. }));
        assert!(start.elapsed() >= SHUTDOWN_GRACE);
        let status = outcome.exit_status();
        assert_eq!(status.code, 1);
        assert_eq!(status.message, FORCED_SHUTDOWN_MESSAGE);
    }

    #[tokio::test(start_paused = true)]
    async fn custom_grace_bounds_the_wait() {
        let stubborn: TaskRef = TaskFn::arc("stubborn", |_ctx: Context, _state: State| async {
            std::future::pending::<()>().await;
            Ok::<(), TaskError>(())
        });
        let log = Logger::new(Arc::new(MemorySink::default()), false);
        let (tx, mut rx) = signal::channel();
        tx.try_send(Signal::Terminate).unwrap();

        let start = time::Instant::now();
        let outcome = Supervisor::new(log.clone())
            .with_grace(Duration::from_secs(2))
            .run(&Context::background(), &mut rx, state(&log), &stubborn)
            .await;
        assert!(matches!(outcome, Outcome::ForcedTimeout { .. }));
        assert!(start.elapsed() >= Duration::from_secs(2));
        assert!(start.elapsed() < SHUTDOWN_GRACE);
    }

    #[tokio::test(start_paused = true)]
    async fn late_success_within_grace_is_clean() {
        let slow: TaskRef = TaskFn::arc("slow", |ctx: Context, _state: State| async move {
            ctx.done().await;
            time::sleep(Duration::from_secs(30)).await;
            Ok::<(), TaskError>(())
        });
        let (outcome, _) = run_with(slow, Some(Signal::Terminate)).await;
        assert!(matches!(outcome, Outcome::CancelledClean { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn failure_during_shutdown_is_reported() {
        let failing: TaskRef = TaskFn::arc("failing", |ctx: Context, _state: State| async move {
            ctx.done().await;
            Err::<(), _>(TaskError::other("flush failed"))
        });
        let (outcome, _) = run_with(failing, Some(Signal::Terminate)).await;
        let err = outcome.into_result().unwrap_err();
        assert_eq!(err.to_string(), "failed to shutdown: flush failed");
    }

    #[tokio::test(start_paused = true)]
    async fn closed_signal_channel_is_not_a_signal() {
        let sleepy: TaskRef = TaskFn::arc("sleepy", |_ctx: Context, _state: State| async {
            time::sleep(Duration::from_secs(1)).await;
            Ok::<(), TaskError>(())
        });
        let sink = Arc::new(MemorySink::default());
        let log = Logger::new(sink.clone(), false);
        let (tx, mut rx) = signal::channel();
        drop(tx);

        let outcome = Supervisor::new(log.clone())
            .run(&Context::background(), &mut rx, state(&log), &sleepy)
            .await;
        assert!(matches!(outcome, Outcome::Clean));
        assert!(sink.lines().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn panic_is_a_task_error() {
        let panicky: TaskRef = TaskFn::arc("panicky", |_ctx: Context, _state: State| async {
            if true {
                panic!("kaboom");
            }
            Ok::<(), TaskError>(())
        });
        let (outcome, _) = run_with(panicky, None).await;
        match outcome {
            Outcome::TaskError {
                error: TaskError::Panicked { message },
                signal: None,
            } => assert_eq!(message, "kaboom"),
            other => panic!("unexpected outcome: {other:?}"),
        }
    }
}
