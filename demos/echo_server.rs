//! # Example: echo_server
//!
//! TCP echo server that shuts down gracefully on Ctrl-C or SIGTERM.
//!
//! Demonstrates how to:
//! - Run a server under [`process::main`](gracevisor::process::main).
//! - Bound its shutdown with [`serve`] and drain open connections.
//! - Watch the connection context to end handlers promptly.
//!
//! ## Flow
//! ```text
//! SIGTERM ──► Supervisor ──► ctx.cancel()
//!                               │
//!                               ▼
//!                  serve(ctx, 10s, server, listener)
//!                     ├─► TcpServer::shutdown (stop accepting)
//!                     ├─► handlers see ctx.done() and return
//!                     └─► Err(Closed) ──► task Ok ──► exit 0
//! ```
//!
//! ## Run
//! ```bash
//! cargo run --example echo_server -- --addr 127.0.0.1:7878
//! # in another terminal
//! nc 127.0.0.1 7878
//! ```

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use gracevisor::serve::{TcpServer, serve};
use gracevisor::{BoxError, Context, Parsed, State, TaskError, TaskFn};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(10);

/// Echoes every line it receives. $ECHO_ADDR is equivalent to --addr.
#[derive(Parser, Debug)]
struct Args {
    /// Address to listen on.
    #[arg(long)]
    addr: Option<String>,
}

async fn echo(ctx: Context, mut stream: TcpStream, _peer: SocketAddr) -> Result<(), BoxError> {
    let mut buf = vec![0u8; 4096];
    loop {
        let n = tokio::select! {
            _ = ctx.done() => return Ok(()),
            n = stream.read(&mut buf) => n?,
        };
        if n == 0 {
            return Ok(());
        }
        stream.write_all(&buf[..n]).await?;
    }
}

async fn run(ctx: Context, mut state: State) -> Result<(), TaskError> {
    let args = match state.opts.parse::<Args>()? {
        Parsed::Args(args) => args,
        Parsed::Help(help) => {
            state.stdout.write_all(help.as_bytes()).await?;
            return Ok(());
        }
    };
    let addr = state
        .opts
        .or_env(args.addr, "ECHO_ADDR")
        .unwrap_or_else(|| "127.0.0.1:7878".to_string());

    let listener = TcpListener::bind(&addr).await?;
    state.log.info(format!("listening on {}", listener.local_addr()?));

    let server = Arc::new(TcpServer::new(echo));
    match serve(&ctx, SHUTDOWN_TIMEOUT, server, listener).await {
        Err(err) if !err.is_closed() => return Err(TaskError::other(err)),
        _ => {}
    }

    state.log.info("all connections closed");
    Ok(())
}

fn main() {
    gracevisor::process::main(TaskFn::arc("echo_server", run))
}
