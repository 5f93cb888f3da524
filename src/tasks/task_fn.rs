//! # Function-backed task (`TaskFn`)
//!
//! [`TaskFn`] wraps a closure `F: Fn(Context, State) -> Fut`, producing a fresh
//! future per spawn. No state is shared between spawns; if a run needs shared
//! state, capture an `Arc<...>` explicitly.
//!
//! ## Example
//! ```rust
//! use gracevisor::{Context, State, TaskError, TaskFn, TaskRef};
//! use tokio::io::AsyncWriteExt;
//!
//! let t: TaskRef = TaskFn::arc("hello", |_ctx: Context, mut state: State| async move {
//!     state.stdout.write_all(b"hello").await?;
//!     Ok::<_, TaskError>(())
//! });
//!
//! assert_eq!(t.name(), "hello");
//! ```

use std::borrow::Cow;
use std::future::Future;
use std::sync::Arc;

use crate::context::Context;
use crate::core::State;
use crate::error::TaskError;
use crate::tasks::task::{BoxTaskFuture, Task};

/// Function-backed task implementation.
#[derive(Debug)]
pub struct TaskFn<F> {
    name: Cow<'static, str>,
    f: F,
}

impl<F> TaskFn<F> {
    /// Creates a new function-backed task.
    ///
    /// Prefer [`TaskFn::arc`] when you immediately need a [`TaskRef`](crate::TaskRef).
    pub fn new(name: impl Into<Cow<'static, str>>, f: F) -> Self {
        Self {
            name: name.into(),
            f,
        }
    }

    /// Creates the task and returns it as a shared handle.
    pub fn arc(name: impl Into<Cow<'static, str>>, f: F) -> Arc<Self> {
        Arc::new(Self::new(name, f))
    }
}

impl<F, Fut> Task for TaskFn<F>
where
    F: Fn(Context, State) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), TaskError>> + Send + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn spawn(&self, ctx: Context, state: State) -> BoxTaskFuture {
        Box::pin((self.f)(ctx, state))
    }
}
