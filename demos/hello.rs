//! # Example: hello
//!
//! Smallest command run under the process entry point.
//!
//! Demonstrates how to:
//! - Parse arguments with [`Opts::parse`] and print `--help` text.
//! - Fall back to an environment variable for a missing flag.
//! - Report a usage error (exit 1 plus a usage hint).
//!
//! ## Flow
//! ```text
//! process::main(task)
//!     ├─► Opts::parse::<Args>()
//!     │     ├─ Help   ─► stdout, exit 0
//!     │     └─ Args
//!     ├─► --flag or $HELLO_FLAG
//!     │     └─ missing ─► "bad usage: ..." + hint, exit 1
//!     └─► write flag to stdout, exit 0
//! ```
//!
//! ## Run
//! ```bash
//! cargo run --example hello -- --flag world
//! HELLO_FLAG=world cargo run --example hello
//! ```

use clap::Parser;
use gracevisor::{Context, Opts, Parsed, State, TaskError, TaskFn, UsageError};
use tokio::io::AsyncWriteExt;

/// Prints the value of --flag to stdout. $HELLO_FLAG is equivalent to --flag.
#[derive(Parser, Debug)]
struct Args {
    /// Value to print.
    #[arg(short, long)]
    flag: Option<String>,
}

async fn run(_ctx: Context, mut state: State) -> Result<(), TaskError> {
    let opts: &Opts = &state.opts;
    let args = match opts.parse::<Args>()? {
        Parsed::Args(args) => args,
        Parsed::Help(help) => {
            state.stdout.write_all(help.as_bytes()).await?;
            return Ok(());
        }
    };

    let flag = opts
        .or_env(args.flag, "HELLO_FLAG")
        .ok_or_else(|| UsageError::new("$HELLO_FLAG or -flag missing"))?;

    state.log.debug(format!("printing {} bytes", flag.len()));
    state.stdout.write_all(flag.as_bytes()).await?;
    state.stdout.flush().await?;
    Ok(())
}

fn main() {
    gracevisor::process::main(TaskFn::arc("hello", run))
}
