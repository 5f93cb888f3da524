//! # Leveled logger handed to supervised runs.
//!
//! [`Logger`] is the sink a run (and the supervisor) writes human-facing
//! lines to. Where the lines end up is decided by a [`LogSink`]:
//!
//! ```text
//! Logger::warn("received signal ...")
//!     │
//!     ├──► TracingSink  → tracing::warn!  → fmt subscriber → stderr
//!     └──► MemorySink   → Vec<(Level, String)>              (tests)
//! ```
//!
//! Process-wide `tracing` output is installed once by [`init`] from the
//! process entry point.
//!
//! ## Rules
//! - Debug lines are dropped unless the logger was built with debug enabled.
//! - Cloning a logger shares its sink.

mod init;
mod sink;

use std::fmt;
use std::sync::Arc;

pub use init::{LogInitError, init};
pub use sink::{LogSink, MemorySink, TracingSink};

/// Severity of a logged line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Level {
    /// Diagnostics, only emitted with `DEBUG` set.
    Debug,
    /// Progress information.
    Info,
    /// Something the user should notice.
    Warn,
    /// Failure report.
    Error,
}

impl Level {
    /// Lowercase name used as a line prefix.
    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Debug => "debug",
            Level::Info => "info",
            Level::Warn => "warn",
            Level::Error => "err",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Cloneable leveled logger backed by a [`LogSink`].
#[derive(Clone)]
pub struct Logger {
    sink: Arc<dyn LogSink>,
    debug: bool,
}

impl Logger {
    /// Creates a logger writing to `sink`.
    pub fn new(sink: Arc<dyn LogSink>, debug: bool) -> Self {
        Self { sink, debug }
    }

    /// Logger forwarding to the process-wide `tracing` subscriber.
    pub fn tracing(debug: bool) -> Self {
        Self::new(Arc::new(TracingSink), debug)
    }

    /// Whether debug lines are emitted.
    pub fn is_debug(&self) -> bool {
        self.debug
    }

    /// Writes `msg` at debug level; dropped unless debug is enabled.
    pub fn debug(&self, msg: impl AsRef<str>) {
        if self.debug {
            self.sink.write(Level::Debug, msg.as_ref());
        }
    }

    /// Writes `msg` at info level.
    pub fn info(&self, msg: impl AsRef<str>) {
        self.sink.write(Level::Info, msg.as_ref());
    }

    /// Writes `msg` at warn level.
    pub fn warn(&self, msg: impl AsRef<str>) {
        self.sink.write(Level::Warn, msg.as_ref());
    }

    /// Writes `msg` at error level.
    pub fn error(&self, msg: impl AsRef<str>) {
        self.sink.write(Level::Error, msg.as_ref());
    }
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger")
            .field("sink", &self.sink.name())
            .field("debug", &self.debug)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_lines_need_debug_enabled() {
        let sink = Arc::new(MemorySink::default());
        let quiet = Logger::new(sink.clone(), false);
        quiet.debug("hidden");
        quiet.warn("shown");

        let loud = Logger::new(sink.clone(), true);
        loud.debug("visible");

        assert_eq!(
            sink.lines(),
            vec![
                (Level::Warn, "shown".to_string()),
                (Level::Debug, "visible".to_string()),
            ]
        );
    }
}
