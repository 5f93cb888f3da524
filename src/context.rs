//! # Request-scoped context: cancellation, deadline and typed values.
//!
//! [`Context`] bundles a [`CancellationToken`], an optional deadline and an
//! immutable chain of typed values. Derivations never mutate the parent:
//!
//! ```text
//! background()
//!   ├─► with_cancel()    child token, same deadline, same values
//!   ├─► with_timeout(d)  child token, deadline = min(parent, now + d)
//!   ├─► with_value(v)    same token, same deadline, values + v
//!   ├─► without_cancel() fresh token, no deadline, same values
//!   └─► without_values() same token, same deadline, no values
//! ```
//!
//! `without_cancel` is what lets a shutdown deadline be applied on top of a
//! context that is already cancelled: the result keeps the parent's values but
//! none of its cancellation, and a new timeout can be layered over it.
//!
//! ## Rules
//! - Deadlines are evaluated lazily; no timer task is spawned.
//! - [`Context::err`] reports `Canceled` once the token fires, otherwise
//!   `DeadlineExceeded` once the deadline has passed.
//! - Values are keyed by type; the nearest value of a type shadows older ones.

use std::any::{Any, TypeId};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::time::{self, Instant};
use tokio_util::sync::CancellationToken;

/// Reason a [`Context`] is done.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextError {
    /// The context (or one of its ancestors) was cancelled.
    #[error("context canceled")]
    Canceled,

    /// The context deadline passed.
    #[error("context deadline exceeded")]
    DeadlineExceeded,
}

impl ContextError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            ContextError::Canceled => "context_canceled",
            ContextError::DeadlineExceeded => "context_deadline_exceeded",
        }
    }
}

struct Value {
    key: TypeId,
    value: Box<dyn Any + Send + Sync>,
    parent: Option<Arc<Value>>,
}

/// Cancellation, deadline and values shared by everything working on behalf of one run.
///
/// Cheap to clone: clones share the same token and value chain.
#[derive(Clone)]
pub struct Context {
    token: CancellationToken,
    deadline: Option<Instant>,
    values: Option<Arc<Value>>,
}

impl Context {
    /// Root context: never cancelled unless [`cancel`](Context::cancel) is called on it, no deadline, no values.
    pub fn background() -> Self {
        Self {
            token: CancellationToken::new(),
            deadline: None,
            values: None,
        }
    }

    /// Derives a child that is cancelled with its parent and can be cancelled on its own.
    pub fn with_cancel(&self) -> Self {
        Self {
            token: self.token.child_token(),
            deadline: self.deadline,
            values: self.values.clone(),
        }
    }

    /// Derives a cancellable child whose deadline is the earlier of `at` and the parent's.
    pub fn with_deadline(&self, at: Instant) -> Self {
        let deadline = match self.deadline {
            Some(parent) if parent <= at => parent,
            _ => at,
        };
        Self {
            token: self.token.child_token(),
            deadline: Some(deadline),
            values: self.values.clone(),
        }
    }

    /// Shorthand for `with_deadline(Instant::now() + timeout)`.
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    /// Derives a context carrying `value`; it shares cancellation with `self`.
    pub fn with_value<T: Any + Send + Sync>(&self, value: T) -> Self {
        Self {
            token: self.token.clone(),
            deadline: self.deadline,
            values: Some(Arc::new(Value {
                key: TypeId::of::<T>(),
                value: Box::new(value),
                parent: self.values.clone(),
            })),
        }
    }

    /// Derives a context that inherits values but neither cancellation nor deadline.
    pub fn without_cancel(&self) -> Self {
        Self {
            token: CancellationToken::new(),
            deadline: None,
            values: self.values.clone(),
        }
    }

    /// Derives a context that inherits cancellation and deadline but no values.
    pub fn without_values(&self) -> Self {
        Self {
            token: self.token.clone(),
            deadline: self.deadline,
            values: None,
        }
    }

    /// Returns the nearest value of type `T`, if any.
    pub fn value<T: Any + Send + Sync>(&self) -> Option<&T> {
        let key = TypeId::of::<T>();
        let mut node = self.values.as_deref();
        while let Some(v) = node {
            if v.key == key {
                return v.value.downcast_ref::<T>();
            }
            node = v.parent.as_deref();
        }
        None
    }

    /// Cancels this context and every context derived from it.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Deadline, if one applies.
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// `None` while the context is live; the reason once it is done.
    pub fn err(&self) -> Option<ContextError> {
        if self.token.is_cancelled() {
            return Some(ContextError::Canceled);
        }
        match self.deadline {
            Some(at) if Instant::now() >= at => Some(ContextError::DeadlineExceeded),
            _ => None,
        }
    }

    /// `true` once [`err`](Context::err) would return `Some`.
    pub fn is_done(&self) -> bool {
        self.err().is_some()
    }

    /// Completes when the context is cancelled or its deadline passes.
    pub async fn done(&self) {
        match self.deadline {
            Some(at) => {
                tokio::select! {
                    _ = self.token.cancelled() => {}
                    _ = time::sleep_until(at) => {}
                }
            }
            None => self.token.cancelled().await,
        }
    }

    /// Underlying token, for APIs that speak [`CancellationToken`] directly.
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::background()
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("cancelled", &self.token.is_cancelled())
            .field("deadline", &self.deadline)
            .field("has_values", &self.values.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Meow(&'static str);

    #[tokio::test]
    async fn without_cancel_keeps_values_and_drops_cancellation() {
        let parent = Context::background().with_value(Meow("meow")).with_cancel();

        let detached = parent.without_cancel();
        parent.cancel();

        assert_eq!(parent.err(), Some(ContextError::Canceled));
        assert_eq!(detached.err(), None);
        assert_eq!(detached.value::<Meow>(), Some(&Meow("meow")));
    }

    #[tokio::test]
    async fn without_cancel_on_already_cancelled_parent() {
        let parent = Context::background().with_value(Meow("meow")).with_cancel();
        parent.cancel();

        let detached = parent.without_cancel();
        assert!(!detached.is_done());
        assert!(detached.deadline().is_none());
        assert_eq!(detached.value::<Meow>(), Some(&Meow("meow")));
    }

    #[tokio::test]
    async fn without_values_passes_cancellation() {
        let parent = Context::background().with_value(Meow("meow")).with_cancel();
        let bare = parent.without_values();

        assert!(bare.value::<Meow>().is_none());
        assert!(!bare.is_done());

        parent.cancel();
        assert_eq!(bare.err(), Some(ContextError::Canceled));

        let shadowed = bare.with_value(Meow("purr"));
        assert_eq!(shadowed.value::<Meow>(), Some(&Meow("purr")));
    }

    #[tokio::test]
    async fn nearest_value_shadows() {
        let ctx = Context::background()
            .with_value(Meow("first"))
            .with_value(7u32)
            .with_value(Meow("second"));
        assert_eq!(ctx.value::<Meow>(), Some(&Meow("second")));
        assert_eq!(ctx.value::<u32>(), Some(&7));
        assert!(ctx.value::<String>().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_reports_deadline_exceeded() {
        let ctx = Context::background().with_timeout(Duration::from_secs(5));
        assert!(!ctx.is_done());

        ctx.done().await;
        assert_eq!(ctx.err(), Some(ContextError::DeadlineExceeded));
    }

    #[tokio::test(start_paused = true)]
    async fn child_deadline_never_extends_parent() {
        let parent = Context::background().with_timeout(Duration::from_secs(1));
        let child = parent.with_timeout(Duration::from_secs(60));
        assert_eq!(child.deadline(), parent.deadline());

        let detached = parent.without_cancel().with_timeout(Duration::from_secs(60));
        assert!(detached.deadline() > parent.deadline());
    }

    #[tokio::test]
    async fn child_cancel_does_not_affect_parent() {
        let parent = Context::background();
        let child = parent.with_cancel();
        child.cancel();

        assert!(child.is_done());
        assert!(!parent.is_done());
        child.done().await;
    }
}
