//! # Task abstraction.
//!
//! A task receives a [`Context`] and the run's [`State`], and should watch
//! the context to stop cooperatively during shutdown.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::context::Context;
use crate::core::State;
use crate::error::TaskError;

/// Boxed future produced by [`Task::spawn`].
pub type BoxTaskFuture = Pin<Box<dyn Future<Output = Result<(), TaskError>> + Send + 'static>>;

/// Shared handle to a task.
pub type TaskRef = Arc<dyn Task>;

/// # Asynchronous, cancelable unit.
///
/// A `Task` has a stable [`name`](Task::name) and produces a fresh future per
/// run through [`spawn`](Task::spawn). The future owns the [`State`] for the
/// duration of the run.
///
/// # Example
/// ```
/// use gracevisor::{BoxTaskFuture, Context, State, Task, TaskError};
///
/// struct Demo;
///
/// impl Task for Demo {
///     fn name(&self) -> &str { "demo" }
///
///     fn spawn(&self, ctx: Context, _state: State) -> BoxTaskFuture {
///         Box::pin(async move {
///             ctx.done().await;
///             Err::<(), _>(TaskError::from(gracevisor::ContextError::Canceled))
///         })
///     }
/// }
/// ```
pub trait Task: Send + Sync + 'static {
    /// Returns a stable, human-readable task name.
    fn name(&self) -> &str;

    /// Creates the future that runs the task until completion or cancellation.
    ///
    /// Implementations should watch `ctx` and return promptly once it is done.
    fn spawn(&self, ctx: Context, state: State) -> BoxTaskFuture;
}
