//! # Run a task in the background and publish its completion once.
//!
//! [`spawn`] starts the task's future on the runtime and returns a
//! [`Completion`]: a one-shot handle that resolves to the task's result.
//!
//! ## Rules
//! - The result is produced **exactly once**; it is buffered by the runtime,
//!   so it is not lost if nobody is waiting yet when the task finishes.
//! - Panics inside the task are caught and reported as [`TaskError::Panicked`].
//! - Dropping a `Completion` detaches the task; it is never aborted.

use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::pin::Pin;
use std::task::{Context as PollContext, Poll};

use futures::FutureExt;
use tokio::task::JoinHandle;

use crate::context::{Context, ContextError};
use crate::core::State;
use crate::error::TaskError;
use crate::tasks::TaskRef;

/// One-shot completion of a spawned task.
#[derive(Debug)]
pub struct Completion {
    handle: JoinHandle<Result<(), TaskError>>,
}

/// Spawns `task` with `ctx` and `state`.
pub fn spawn(task: &TaskRef, ctx: Context, state: State) -> Completion {
    let task = TaskRef::clone(task);
    let handle = tokio::spawn(async move {
        let run = AssertUnwindSafe(async move { task.spawn(ctx, state).await });
        match run.catch_unwind().await {
            Ok(res) => res,
            Err(payload) => Err(TaskError::Panicked {
                message: panic_message(payload.as_ref()),
            }),
        }
    });
    Completion { handle }
}

impl Future for Completion {
    type Output = Result<(), TaskError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut PollContext<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.handle).poll(cx).map(|joined| match joined {
            Ok(res) => res,
            // The runtime is shutting down underneath the task.
            Err(err) if err.is_cancelled() => Err(TaskError::Context(ContextError::Canceled)),
            Err(err) => Err(TaskError::Panicked {
                message: err.to_string(),
            }),
        })
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
