//! # TCP accept loop with connection draining.
//!
//! [`TcpServer`] accepts connections and runs a [`Handler`] for each one on
//! its own task. Shutdown is sticky: once [`shutdown`](Server::shutdown) has
//! been called the server never accepts again.
//!
//! ## Rules
//! - Only one `serve` may run at a time; a concurrent one returns
//!   [`ServeError::AlreadyRunning`].
//! - Every connection gets a child of the `serve` context; cancelling that
//!   context is how handlers learn about shutdown.
//! - Aborted, reset and interrupted accepts are retried; any other accept
//!   error ends `serve`.
//! - `shutdown` waits for in-flight connections until its context is done.

use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::net::{TcpListener, TcpStream};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::debug;

use crate::context::{Context, ContextError};
use crate::error::BoxError;
use crate::serve::{ServeError, Server};

/// # Per-connection logic.
///
/// Implemented for any `Fn(Context, TcpStream, SocketAddr) -> Future`
/// returning `Result<(), BoxError>`. Errors are logged at debug level and
/// otherwise dropped; they never stop the accept loop.
#[async_trait]
pub trait Handler: Send + Sync + 'static {
    /// Serves one accepted connection.
    async fn handle(&self, ctx: Context, stream: TcpStream, peer: SocketAddr)
    -> Result<(), BoxError>;
}

#[async_trait]
impl<F, Fut> Handler for F
where
    F: Fn(Context, TcpStream, SocketAddr) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), BoxError>> + Send + 'static,
{
    async fn handle(
        &self,
        ctx: Context,
        stream: TcpStream,
        peer: SocketAddr,
    ) -> Result<(), BoxError> {
        (self)(ctx, stream, peer).await
    }
}

/// Accept loop over a [`TcpListener`].
#[derive(Debug)]
pub struct TcpServer<H> {
    handler: Arc<H>,
    closing: CancellationToken,
    conns: TaskTracker,
    running: AtomicBool,
}

impl<H: Handler> TcpServer<H> {
    /// Creates a server that runs `handler` for every connection.
    pub fn new(handler: H) -> Self {
        Self {
            handler: Arc::new(handler),
            closing: CancellationToken::new(),
            conns: TaskTracker::new(),
            running: AtomicBool::new(false),
        }
    }

    /// Number of connections currently being handled.
    pub fn connections(&self) -> usize {
        self.conns.len()
    }

    /// `true` once shutdown has started.
    pub fn is_closed(&self) -> bool {
        self.closing.is_cancelled()
    }

    fn spawn_conn(&self, ctx: Context, stream: TcpStream, peer: SocketAddr) {
        let handler = Arc::clone(&self.handler);
        self.conns.spawn(async move {
            if let Err(err) = handler.handle(ctx, stream, peer).await {
                debug!(%peer, error = %err, "connection handler failed");
            }
        });
    }
}

/// Clears the running flag when `serve` returns.
struct Running<'a>(&'a AtomicBool);

impl Drop for Running<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

fn is_retryable(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::ConnectionAborted
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::Interrupted
    )
}

#[async_trait]
impl<H: Handler> Server for TcpServer<H> {
    async fn serve(&self, ctx: Context, listener: TcpListener) -> Result<(), ServeError> {
        if self.closing.is_cancelled() {
            return Err(ServeError::Closed);
        }
        if self
            .running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(ServeError::AlreadyRunning);
        }
        let _running = Running(&self.running);

        loop {
            let (stream, peer) = tokio::select! {
                biased;
                _ = self.closing.cancelled() => return Err(ServeError::Closed),
                res = listener.accept() => match res {
                    Ok(conn) => conn,
                    Err(err) if is_retryable(&err) => {
                        debug!(error = %err, "retrying accept");
                        continue;
                    }
                    Err(err) => return Err(ServeError::Accept(err)),
                },
            };
            debug!(%peer, "accepted connection");
            self.spawn_conn(ctx.with_cancel(), stream, peer);
        }
    }

    async fn shutdown(&self, ctx: &Context) -> Result<(), ServeError> {
        self.closing.cancel();
        self.conns.close();
        debug!(connections = self.conns.len(), "draining connections");

        tokio::select! {
            biased;
            _ = self.conns.wait() => Ok(()),
            _ = ctx.done() => {
                let cause = ctx.err().unwrap_or(ContextError::DeadlineExceeded);
                Err(ServeError::Shutdown(cause))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    use super::*;

    fn echo() -> TcpServer<impl Handler> {
        TcpServer::new(
            |_ctx: Context, mut stream: TcpStream, _peer: SocketAddr| async move {
                let mut buf = [0u8; 64];
                let n = stream.read(&mut buf).await?;
                stream.write_all(&buf[..n]).await?;
                Ok::<(), BoxError>(())
            },
        )
    }

    #[tokio::test]
    async fn second_serve_is_rejected() {
        let server = Arc::new(echo());
        let first = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let second = TcpListener::bind("127.0.0.1:0").await.unwrap();

        let running = Arc::clone(&server);
        let ctx = Context::background();
        let loop_ctx = ctx.clone();
        let accept = tokio::spawn(async move { running.serve(loop_ctx, first).await });
        while !server.running.load(Ordering::Acquire) {
            tokio::task::yield_now().await;
        }

        let err = server.serve(ctx.clone(), second).await.unwrap_err();
        assert!(matches!(err, ServeError::AlreadyRunning));

        server.shutdown(&ctx).await.unwrap();
        assert!(accept.await.unwrap().unwrap_err().is_closed());
    }

    #[tokio::test]
    async fn shutdown_is_sticky() {
        let server = echo();
        server.shutdown(&Context::background()).await.unwrap();
        assert!(server.is_closed());

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let err = server.serve(Context::background(), listener).await.unwrap_err();
        assert!(err.is_closed());
    }

    #[tokio::test]
    async fn echoes_one_message() {
        let server = Arc::new(echo());
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let running = Arc::clone(&server);
        let accept =
            tokio::spawn(async move { running.serve(Context::background(), listener).await });

        let mut client = TcpStream::connect(addr).await.unwrap();
        client.write_all(b"ping").await.unwrap();
        let mut got = [0u8; 4];
        client.read_exact(&mut got).await.unwrap();
        assert_eq!(&got, b"ping");

        let ctx = Context::background().with_timeout(Duration::from_secs(5));
        server.shutdown(&ctx).await.unwrap();
        assert!(accept.await.unwrap().unwrap_err().is_closed());
        assert_eq!(server.connections(), 0);
    }
}
