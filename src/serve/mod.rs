//! # Network serving with a bounded shutdown.
//!
//! The same start → cancel → bounded wait protocol as the
//! [`Supervisor`](crate::Supervisor), with context cancellation in place of
//! signals and a [`ServeError`] in place of an exit code.
//!
//! ```text
//! serve(ctx, timeout, server, listener)
//!   ├─► spawn server.serve(ctx, listener)          (accept loop)
//!   ├─► select: accept loop returns | ctx.done()
//!   │     └─ accept loop first ─► its result
//!   └─► shutdown_ctx = ctx.without_cancel().with_timeout(timeout)
//!         ├─► server.shutdown(&shutdown_ctx)
//!         ├─► wait for the accept loop            (always)
//!         └─► shutdown error, else accept result  (Closed after a clean shutdown)
//! ```
//!
//! - [`Server`]: what `serve` drives.
//! - [`TcpServer`]: accept loop over a TCP listener that drains its
//!   connections on shutdown.
//! - [`Handler`]: per-connection logic for a `TcpServer`.

mod bounded;
mod error;
mod server;
mod tcp;

pub use bounded::serve;
pub use error::ServeError;
pub use server::Server;
pub use tcp::{Handler, TcpServer};
