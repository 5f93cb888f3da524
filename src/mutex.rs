//! # Context-aware binary gate.
//!
//! [`ContextMutex`] guards no data; it serializes critical sections that span
//! `.await` points and must give up when the caller's [`Context`] is done.
//!
//! ## Rules
//! - [`try_lock`](ContextMutex::try_lock) never waits.
//! - [`lock`](ContextMutex::lock) waits until the gate is free or `ctx` is done.
//! - [`unlock`](ContextMutex::unlock) without a matching lock is a bug and panics.
//! - [`guard`](ContextMutex::guard) pairs lock and unlock through a drop guard.

use std::sync::atomic::{AtomicBool, Ordering};

use thiserror::Error;
use tokio::sync::Notify;

use crate::context::{Context, ContextError};

/// Lock acquisition gave up because the caller's context finished first.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("failed to acquire lock: {source}")]
pub struct LockError {
    /// Why the caller's context is done.
    #[source]
    pub source: ContextError,
}

/// Binary gate with a non-blocking try, a context-bounded lock and a loud unlock.
#[derive(Debug, Default)]
pub struct ContextMutex {
    locked: AtomicBool,
    released: Notify,
}

impl ContextMutex {
    /// Creates an unlocked gate.
    pub fn new() -> Self {
        Self::default()
    }

    /// Takes the gate if it is free.
    pub fn try_lock(&self) -> bool {
        self.locked
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_ok()
    }

    /// Waits for the gate, giving up when `ctx` is done.
    pub async fn lock(&self, ctx: &Context) -> Result<(), LockError> {
        loop {
            let released = self.released.notified();
            tokio::pin!(released);
            released.as_mut().enable();

            if self.try_lock() {
                return Ok(());
            }
            if let Some(source) = ctx.err() {
                return Err(LockError { source });
            }

            tokio::select! {
                _ = &mut released => {}
                _ = ctx.done() => {
                    let source = ctx.err().unwrap_or(ContextError::Canceled);
                    return Err(LockError { source });
                }
            }
        }
    }

    /// Releases the gate.
    ///
    /// # Panics
    /// If the gate is not locked.
    pub fn unlock(&self) {
        if !self.locked.swap(false, Ordering::AcqRel) {
            panic!("ContextMutex: unlock before lock");
        }
        self.released.notify_one();
    }

    /// Locks and returns a guard that unlocks on drop.
    pub async fn guard(&self, ctx: &Context) -> Result<ContextMutexGuard<'_>, LockError> {
        self.lock(ctx).await?;
        Ok(ContextMutexGuard { mu: self })
    }
}

/// Holds a [`ContextMutex`] until dropped.
#[must_use = "the gate is released as soon as the guard is dropped"]
#[derive(Debug)]
pub struct ContextMutexGuard<'a> {
    mu: &'a ContextMutex,
}

impl Drop for ContextMutexGuard<'_> {
    fn drop(&mut self) {
        self.mu.unlock();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use super::*;

    #[test]
    fn try_lock_is_exclusive() {
        let mu = ContextMutex::new();
        assert!(mu.try_lock());
        assert!(!mu.try_lock());
        mu.unlock();
        assert!(mu.try_lock());
    }

    #[test]
    #[should_panic(expected = "unlock before lock")]
    fn unlock_without_lock_panics() {
        ContextMutex::new().unlock();
    }

    #[tokio::test(start_paused = true)]
    async fn lock_gives_up_at_deadline() {
        let mu = ContextMutex::new();
        assert!(mu.try_lock());

        let ctx = Context::background().with_timeout(Duration::from_secs(5));
        let err = mu.lock(&ctx).await.unwrap_err();
        assert_eq!(err.source, ContextError::DeadlineExceeded);
        assert_eq!(
            err.to_string(),
            "failed to acquire lock: context deadline exceeded"
        );
    }

    #[tokio::test]
    async fn lock_on_cancelled_context_fails_fast() {
        let mu = ContextMutex::new();
        assert!(mu.try_lock());

        let ctx = Context::background();
        ctx.cancel();
        let err = mu.lock(&ctx).await.unwrap_err();
        assert_eq!(err.source, ContextError::Canceled);
    }

    #[tokio::test]
    async fn waiter_acquires_after_release() {
        let mu = Arc::new(ContextMutex::new());
        assert!(mu.try_lock());

        let waiter = {
            let mu = Arc::clone(&mu);
            tokio::spawn(async move {
                let _guard = mu.guard(&Context::background()).await.unwrap();
            })
        };
        tokio::task::yield_now().await;
        mu.unlock();

        waiter.await.unwrap();
        assert!(mu.try_lock());
    }
}
