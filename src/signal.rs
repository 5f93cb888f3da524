//! # Stop requests delivered from outside a run.
//!
//! [`Signal`] names the requests a supervised run understands, and
//! [`notify`] forwards the process's OS signals into a bounded channel of
//! them. Tests create the same kind of channel with [`channel`] and inject
//! signals by hand.
//!
//! ## Signals
//! **Unix platforms:**
//! - `SIGINT` (Ctrl-C in terminal) → [`Signal::Interrupt`]
//! - `SIGTERM` (default kill signal, used by systemd/Kubernetes) → [`Signal::Terminate`]
//!
//! **Windows platforms:**
//! - `Ctrl-C` via [`tokio::signal::ctrl_c`] → [`Signal::Interrupt`]
//!
//! ## Rules
//! - The channel holds one pending signal; delivery never blocks, extra
//!   signals are dropped while one is pending.
//! - The forwarder stops once the receiver is dropped.

use std::fmt;

use tokio::sync::mpsc;

/// Capacity of a signal channel.
pub const SIGNAL_BUFFER: usize = 1;

/// External stop request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Signal {
    /// User interrupt (`SIGINT`, Ctrl-C).
    Interrupt,
    /// Orchestrator termination request (`SIGTERM`).
    Terminate,
    /// Unconditional kill; never handled by the supervisor itself.
    Kill,
}

impl Signal {
    /// `true` for the orchestrator termination request.
    ///
    /// A run that shuts down cleanly after this signal exits successfully;
    /// after any other signal the same clean shutdown exits with code 1.
    pub fn is_terminate(&self) -> bool {
        matches!(self, Signal::Terminate)
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            Signal::Interrupt => "interrupt",
            Signal::Terminate => "terminate",
            Signal::Kill => "kill",
        }
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Signal::Interrupt => "interrupt",
            Signal::Terminate => "terminated",
            Signal::Kill => "killed",
        })
    }
}

/// Creates a signal channel with room for one pending signal.
pub fn channel() -> (mpsc::Sender<Signal>, mpsc::Receiver<Signal>) {
    mpsc::channel(SIGNAL_BUFFER)
}

/// Starts forwarding OS signals into a new channel.
///
/// Must be called from within a Tokio runtime. Returns `Err` if signal
/// registration fails.
#[cfg(unix)]
pub fn notify() -> std::io::Result<mpsc::Receiver<Signal>> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;
    let (tx, rx) = channel();

    tokio::spawn(async move {
        loop {
            let sig = tokio::select! {
                Some(()) = sigint.recv() => Signal::Interrupt,
                Some(()) = sigterm.recv() => Signal::Terminate,
                _ = tx.closed() => break,
                else => break,
            };
            if let Err(mpsc::error::TrySendError::Closed(_)) = tx.try_send(sig) {
                break;
            }
        }
    });
    Ok(rx)
}

/// Starts forwarding OS signals into a new channel.
///
/// Must be called from within a Tokio runtime.
#[cfg(not(unix))]
pub fn notify() -> std::io::Result<mpsc::Receiver<Signal>> {
    let (tx, rx) = channel();

    tokio::spawn(async move {
        loop {
            tokio::select! {
                res = tokio::signal::ctrl_c() => {
                    if res.is_err() {
                        break;
                    }
                }
                _ = tx.closed() => break,
            }
            if let Err(mpsc::error::TrySendError::Closed(_)) = tx.try_send(Signal::Interrupt) {
                break;
            }
        }
    });
    Ok(rx)
}
