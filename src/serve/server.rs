//! # Server abstraction driven by [`serve`](super::serve).

use async_trait::async_trait;
use tokio::net::TcpListener;

use crate::context::Context;
use crate::serve::ServeError;

/// # Something that accepts connections until told to stop.
///
/// `serve` runs the accept loop and returns once the listener fails or the
/// server is shut down (then with [`ServeError::Closed`]). `shutdown` stops
/// the accept loop and waits for in-flight work, giving up when `ctx` is
/// done. Both are called concurrently from different tasks.
#[async_trait]
pub trait Server: Send + Sync + 'static {
    /// Accepts connections from `listener`; `ctx` is the base context of every connection.
    async fn serve(&self, ctx: Context, listener: TcpListener) -> Result<(), ServeError>;

    /// Stops accepting and drains in-flight connections within `ctx`.
    async fn shutdown(&self, ctx: &Context) -> Result<(), ServeError>;
}
