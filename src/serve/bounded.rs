use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tracing::debug;

use crate::context::Context;
use crate::serve::{ServeError, Server};

/// Serves `listener` with `server` until `ctx` is done, then shuts the server
/// down within `shutdown_timeout`.
///
/// Never returns while the accept loop is still running. A shutdown that
/// fails (for example by running out of time) returns the server's shutdown
/// error. Otherwise the accept loop's own result is returned, which after a
/// clean shutdown is [`ServeError::Closed`]; check it with
/// [`ServeError::is_closed`].
///
/// # Example
/// ```rust,no_run
/// use std::sync::Arc;
/// use std::time::Duration;
///
/// use gracevisor::serve::{serve, TcpServer};
/// use gracevisor::{BoxError, Context};
/// use tokio::net::{TcpListener, TcpStream};
///
/// # async fn demo(ctx: Context) -> Result<(), Box<dyn std::error::Error>> {
/// let listener = TcpListener::bind("127.0.0.1:0").await?;
/// let server = Arc::new(TcpServer::new(
///     |_ctx: Context, _stream: TcpStream, _peer: std::net::SocketAddr| async move {
///         Ok::<(), BoxError>(())
///     },
/// ));
/// match serve(&ctx, Duration::from_secs(30), server, listener).await {
///     Err(err) if !err.is_closed() => return Err(err.into()),
///     _ => {}
/// }
/// # Ok(())
/// # }
/// ```
pub async fn serve<S>(
    ctx: &Context,
    shutdown_timeout: Duration,
    server: Arc<S>,
    listener: TcpListener,
) -> Result<(), ServeError>
where
    S: Server + ?Sized,
{
    let accept_ctx = ctx.clone();
    let accepting = Arc::clone(&server);
    let mut accept = tokio::spawn(async move { accepting.serve(accept_ctx, listener).await });

    tokio::select! {
        joined = &mut accept => {
            let res = joined?;
            debug!(ok = res.is_ok(), "accept loop returned before cancellation");
            return res;
        }
        _ = ctx.done() => {}
    }

    let shutdown_ctx = ctx.without_cancel().with_timeout(shutdown_timeout);
    debug!(timeout = ?shutdown_timeout, "context done; shutting down server");
    let shutdown = server.shutdown(&shutdown_ctx).await;
    let served = accept.await?;

    if let Err(err) = shutdown {
        debug!(error = %err, label = err.as_label(), "server shutdown failed");
        return Err(err);
    }
    served
}
