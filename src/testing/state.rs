//! # Handle of a running harness.
//!
//! ## Rules
//! - `signal` and `wait` hold the harness gate for their whole duration.
//! - Every select prefers the done channel, so a run that has finished is
//!   reported as done even if the caller's context finished at the same time.
//! - The terminal result is cached exactly once, by whichever call observes it.
//! - `wait` reports a finished run identically on every call.

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::{Mutex as AsyncMutex, mpsc};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::config::{KILL_GRACE, LOCK_PROBE, SHUTDOWN_GRACE};
use crate::context::{Context, ContextError};
use crate::error::MainError;
use crate::log::MemorySink;
use crate::mutex::ContextMutex;
use crate::signal::Signal;
use crate::testing::error::{HarnessCause, HarnessError, RunFailure};

/// Terminal result of a harness run.
pub type Terminal = Result<(), Arc<RunFailure>>;

/// A started run.
pub struct TestState {
    name: String,
    mu: ContextMutex,
    sigs: mpsc::Sender<Signal>,
    done: AsyncMutex<mpsc::Receiver<Terminal>>,
    cached: Mutex<Option<Terminal>>,
    stdin_closed: CancellationToken,
    logs: Arc<MemorySink>,
}

impl TestState {
    pub(crate) fn new(
        name: String,
        sigs: mpsc::Sender<Signal>,
        done: mpsc::Receiver<Terminal>,
        stdin_closed: CancellationToken,
        logs: Arc<MemorySink>,
    ) -> Self {
        Self {
            name,
            mu: ContextMutex::new(),
            sigs,
            done: AsyncMutex::new(done),
            cached: Mutex::new(None),
            stdin_closed,
            logs,
        }
    }

    /// The run's name (`argv[0]`).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Log lines written by the run, rendered as `level: message`.
    pub fn logs(&self) -> Vec<String> {
        self.logs.rendered()
    }

    /// Delivers `sig` to the run.
    ///
    /// Returns a [`HarnessCause::Done`] error, without blocking, once the run
    /// has finished; that includes the case where it finishes while this
    /// call is waiting to deliver.
    pub async fn signal(&self, ctx: &Context, sig: Signal) -> Result<(), HarnessError> {
        let fail = |source: HarnessCause| HarnessError::Signal {
            name: self.name.clone(),
            source,
        };

        let _guard = self.mu.guard(ctx).await.map_err(|e| fail(e.into()))?;
        if let Some(terminal) = self.cached() {
            return Err(fail(HarnessCause::Done(terminal.err())));
        }

        let mut done = self.done.lock().await;
        tokio::select! {
            biased;
            terminal = done.recv() => {
                let terminal = terminal.ok_or_else(|| fail(HarnessCause::Lost))?;
                self.store(terminal.clone());
                Err(fail(HarnessCause::Done(terminal.err())))
            }
            _ = ctx.done() => Err(fail(ctx_cause(ctx))),
            sent = self.sigs.send(sig) => {
                sent.map_err(|_| fail(HarnessCause::Lost))?;
                debug!(name = %self.name, signal = sig.as_label(), "signal delivered");
                Ok(())
            }
        }
    }

    /// Waits for the run to finish.
    ///
    /// A failed run is returned as [`HarnessCause::Exited`] carrying the same
    /// `Arc` on every call; a successful run is `Ok(())` every time.
    pub async fn wait(&self, ctx: &Context) -> Result<(), HarnessError> {
        let fail = |source: HarnessCause| HarnessError::Wait {
            name: self.name.clone(),
            source,
        };

        let _guard = self.mu.guard(ctx).await.map_err(|e| fail(e.into()))?;
        if let Some(terminal) = self.cached() {
            return terminal.map_err(|failure| fail(HarnessCause::Exited(failure)));
        }

        let mut done = self.done.lock().await;
        tokio::select! {
            biased;
            terminal = done.recv() => {
                let terminal = terminal.ok_or_else(|| fail(HarnessCause::Lost))?;
                self.store(terminal.clone());
                terminal.map_err(|failure| fail(HarnessCause::Exited(failure)))
            }
            _ = ctx.done() => Err(fail(ctx_cause(ctx))),
        }
    }

    /// The cached terminal result, if a `signal` or `wait` has observed one.
    ///
    /// Gives up (returning `None`) if the harness gate stays busy for
    /// [`LOCK_PROBE`].
    pub async fn exit_error(&self) -> Option<Terminal> {
        let probe = Context::background().with_timeout(LOCK_PROBE);
        let _guard = self.mu.guard(&probe).await.ok()?;
        self.cached()
    }

    /// Stops the run if it is still going and reports how it ended.
    ///
    /// Closes the run's stdin first. A run whose result was already observed
    /// by `signal` or `wait` is left alone and counts as success. Otherwise
    /// sends an interrupt and waits up to [`SHUTDOWN_GRACE`]; if that runs
    /// out, sends a kill and waits [`KILL_GRACE`] more. A run ended by this
    /// interrupt counts as success.
    pub async fn cleanup(&self) -> Result<(), HarnessError> {
        self.stdin_closed.cancel();
        if self.exit_error().await.is_some() {
            debug!(name = %self.name, "run already observed; nothing to clean up");
            return Ok(());
        }

        let ctx = Context::background().with_timeout(SHUTDOWN_GRACE);
        let mut interrupted = false;
        match self.signal(&ctx, Signal::Interrupt).await {
            Ok(()) => interrupted = true,
            Err(err) if err.is_done() => {}
            Err(err) => return Err(err),
        }

        let mut res = self.wait(&ctx).await;
        if matches!(&res, Err(err) if err.is_deadline_exceeded()) {
            debug!(name = %self.name, "run ignored interrupt; escalating to kill");
            let kill_ctx = Context::background().with_timeout(KILL_GRACE);
            if let Err(err) = self.signal(&kill_ctx, Signal::Kill).await {
                debug!(name = %self.name, error = %err, "failed to deliver kill");
            }
            res = self.wait(&kill_ctx).await;
        }

        match res {
            Err(err) if interrupted && ended_by_interrupt(&err) => Ok(()),
            other => other,
        }
    }

    fn cached(&self) -> Option<Terminal> {
        self.cached
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn store(&self, terminal: Terminal) {
        let mut cached = self.cached.lock().unwrap_or_else(PoisonError::into_inner);
        if cached.is_none() {
            *cached = Some(terminal);
        }
    }
}

impl fmt::Debug for TestState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestState")
            .field("name", &self.name)
            .field("done", &self.cached().is_some())
            .finish_non_exhaustive()
    }
}

fn ctx_cause(ctx: &Context) -> HarnessCause {
    HarnessCause::Context(ctx.err().unwrap_or(ContextError::Canceled))
}

fn ended_by_interrupt(err: &HarnessError) -> bool {
    err.run_failure().is_some_and(|failure| {
        matches!(
            failure.error,
            MainError::Interrupted {
                signal: Signal::Interrupt
            }
        )
    })
}
