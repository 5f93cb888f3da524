//! Run stdin that the harness can close from outside the run.

use std::future::Future;
use std::io;
use std::pin::Pin;
use std::task::{Context as TaskContext, Poll};

use tokio::io::{AsyncRead, ReadBuf};
use tokio_util::sync::{CancellationToken, WaitForCancellationFutureOwned};

use crate::core::Reader;

/// Reader handed to the run as its stdin.
///
/// Once `closed` is cancelled the wrapped reader is dropped and every read,
/// including one already pending, reports EOF.
pub(crate) struct ClosableStdin {
    inner: Option<Reader>,
    closed: Pin<Box<WaitForCancellationFutureOwned>>,
}

impl ClosableStdin {
    pub(crate) fn new(inner: Reader, closed: CancellationToken) -> Self {
        Self {
            inner: Some(inner),
            closed: Box::pin(closed.cancelled_owned()),
        }
    }
}

impl AsyncRead for ClosableStdin {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut TaskContext<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = &mut *self;
        if this.inner.is_some() && this.closed.as_mut().poll(cx).is_ready() {
            this.inner = None;
        }
        match this.inner.as_mut() {
            Some(inner) => Pin::new(inner).poll_read(cx, buf),
            None => Poll::Ready(Ok(())),
        }
    }
}
