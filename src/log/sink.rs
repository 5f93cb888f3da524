//! # Log sinks.
//!
//! `LogSink` is the extension point behind [`Logger`](super::Logger). It is
//! called synchronously from whichever task logs, so implementations must not
//! block for long.

use std::sync::{Mutex, PoisonError};

use super::Level;

/// Destination for logger lines.
pub trait LogSink: Send + Sync + 'static {
    /// Records one line at `level`.
    fn write(&self, level: Level, message: &str);

    /// Human-readable name (for debugging).
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

/// Forwards lines to the `tracing` subscriber installed by [`init`](super::init).
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl LogSink for TracingSink {
    fn write(&self, level: Level, message: &str) {
        match level {
            Level::Debug => tracing::debug!("{message}"),
            Level::Info => tracing::info!("{message}"),
            Level::Warn => tracing::warn!("{message}"),
            Level::Error => tracing::error!("{message}"),
        }
    }

    fn name(&self) -> &'static str {
        "tracing"
    }
}

/// Keeps every line in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    lines: Mutex<Vec<(Level, String)>>,
}

impl MemorySink {
    /// Copy of the recorded lines, oldest first.
    pub fn lines(&self) -> Vec<(Level, String)> {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Recorded lines rendered as `level: message`.
    pub fn rendered(&self) -> Vec<String> {
        self.lines()
            .into_iter()
            .map(|(level, msg)| format!("{level}: {msg}"))
            .collect()
    }
}

impl LogSink for MemorySink {
    fn write(&self, level: Level, message: &str) {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((level, message.to_string()));
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
