//! # Bounded capture of a run's stderr.
//!
//! [`PrefixSuffixSaver`] keeps the first and the last `limit` bytes written
//! to it and counts what falls in between, so a chatty run cannot exhaust
//! memory while its most useful output is still kept.

use std::collections::VecDeque;
use std::io;
use std::pin::Pin;
use std::sync::{Arc, Mutex, PoisonError};
use std::task::{Context as PollContext, Poll};

use tokio::io::AsyncWrite;

/// Bytes kept at each end of captured stderr.
pub const STDERR_LIMIT: usize = 1 << 25;

/// Keeps a prefix and a suffix of everything written, dropping the middle.
#[derive(Debug, Clone, Default)]
pub struct PrefixSuffixSaver {
    limit: usize,
    prefix: Vec<u8>,
    suffix: VecDeque<u8>,
    skipped: u64,
}

impl PrefixSuffixSaver {
    /// Creates a saver keeping up to `limit` bytes at each end.
    pub fn new(limit: usize) -> Self {
        Self {
            limit,
            ..Self::default()
        }
    }

    /// Records `p`.
    pub fn write(&mut self, mut p: &[u8]) {
        let room = self.limit.saturating_sub(self.prefix.len());
        let head = room.min(p.len());
        self.prefix.extend_from_slice(&p[..head]);
        p = &p[head..];

        if p.len() > self.limit {
            let extra = p.len() - self.limit;
            self.skipped += (self.suffix.len() + extra) as u64;
            self.suffix.clear();
            p = &p[extra..];
        }
        self.suffix.extend(p);

        let overflow = self.suffix.len().saturating_sub(self.limit);
        if overflow > 0 {
            self.suffix.drain(..overflow);
            self.skipped += overflow as u64;
        }
    }

    /// Number of bytes dropped from the middle.
    pub fn skipped(&self) -> u64 {
        self.skipped
    }

    /// Prefix, an omission marker if anything was dropped, then suffix.
    pub fn bytes(&self) -> Vec<u8> {
        let mut out = self.prefix.clone();
        if self.skipped > 0 {
            out.extend_from_slice(format!("\n... omitting {} bytes ...\n", self.skipped).as_bytes());
        }
        out.extend(self.suffix.iter());
        out
    }
}

/// Shared [`AsyncWrite`] handle onto a [`PrefixSuffixSaver`].
///
/// Writes never block or fail; clones share the same buffer.
#[derive(Debug, Clone)]
pub struct Capture {
    saver: Arc<Mutex<PrefixSuffixSaver>>,
}

impl Capture {
    /// Creates a capture keeping up to `limit` bytes at each end.
    pub fn new(limit: usize) -> Self {
        Self {
            saver: Arc::new(Mutex::new(PrefixSuffixSaver::new(limit))),
        }
    }

    /// Everything kept so far.
    pub fn contents(&self) -> Vec<u8> {
        self.saver
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .bytes()
    }

    /// [`contents`](Capture::contents) as text, invalid UTF-8 replaced.
    pub fn to_string_lossy(&self) -> String {
        String::from_utf8_lossy(&self.contents()).into_owned()
    }
}

impl Default for Capture {
    fn default() -> Self {
        Self::new(STDERR_LIMIT)
    }
}

impl AsyncWrite for Capture {
    fn poll_write(
        self: Pin<&mut Self>,
        _cx: &mut PollContext<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        self.saver
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .write(buf);
        Poll::Ready(Ok(buf.len()))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut PollContext<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut PollContext<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}
