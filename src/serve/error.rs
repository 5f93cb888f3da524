use std::io;

use thiserror::Error;
use tokio::task::JoinError;

use crate::context::ContextError;

/// # Errors produced while serving.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum ServeError {
    /// The server was shut down; also returned by `serve` after a shutdown.
    #[error("server closed")]
    Closed,

    /// `serve` was called while another `serve` on the same server is active.
    #[error("server is already running")]
    AlreadyRunning,

    /// The listener failed with a non-retryable error.
    #[error("failed to accept connection: {0}")]
    Accept(#[source] io::Error),

    /// Connections did not drain before the shutdown context was done.
    #[error("failed to shutdown server: {0}")]
    Shutdown(#[source] ContextError),

    /// The accept loop task panicked or was cancelled by the runtime.
    #[error("accept loop failed: {0}")]
    Join(#[from] JoinError),
}

impl ServeError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            ServeError::Closed => "serve_closed",
            ServeError::AlreadyRunning => "serve_already_running",
            ServeError::Accept(_) => "serve_accept_failed",
            ServeError::Shutdown(_) => "serve_shutdown_failed",
            ServeError::Join(_) => "serve_join_failed",
        }
    }

    /// `true` for the after-shutdown sentinel.
    pub fn is_closed(&self) -> bool {
        matches!(self, ServeError::Closed)
    }
}
