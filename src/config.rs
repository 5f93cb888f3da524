//! # Runtime configuration.
//!
//! Provides [`Config`], the settings read once at startup from the
//! environment, and the fixed shutdown policy constants.
//!
//! ## Environment
//! - `DEBUG` enables debug-level logging.
//! - `COLOR` forces ANSI colour on or off; unset means "only on a terminal".
//!
//! ## Shutdown policy
//! The deadlines are policy, not per-call knobs:
//! - [`SHUTDOWN_GRACE`]: how long a task may take to honour cancellation
//!   after a signal before the run is reported as forcefully terminated.
//! - [`KILL_GRACE`]: how long the test harness waits after escalating to
//!   a kill.
//! - [`LOCK_PROBE`]: how long a non-blocking harness query may wait for the
//!   harness lock.

use std::io::IsTerminal;
use std::time::Duration;

use crate::env::{Env, EnvError};

/// Grace period between the first signal and forced termination.
pub const SHUTDOWN_GRACE: Duration = Duration::from_secs(60);

/// Grace period after the harness escalates to a kill.
pub const KILL_GRACE: Duration = Duration::from_secs(5);

/// Upper bound on waiting for the harness lock in non-blocking queries.
pub const LOCK_PROBE: Duration = Duration::from_secs(5);

/// Settings resolved from the environment.
///
/// ## Field semantics
/// - `debug`: emit debug-level lines (`DEBUG`)
/// - `color`: `Some(_)` forces ANSI on/off, `None` = detect (`COLOR`)
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Config {
    /// Debug-level logging.
    pub debug: bool,

    /// Forced colour setting, if any.
    pub color: Option<bool>,
}

impl Config {
    /// Reads `DEBUG` and `COLOR` from `env`.
    pub fn from_env(env: &Env) -> Result<Self, EnvError> {
        Ok(Self {
            debug: env.bool("DEBUG")?.unwrap_or(false),
            color: env.bool("COLOR")?,
        })
    }

    /// Whether ANSI colour should be used on stderr.
    #[inline]
    pub fn color_enabled(&self) -> bool {
        self.color.unwrap_or_else(|| std::io::stderr().is_terminal())
    }

    /// Default log filter directive when `RUST_LOG` is unset.
    #[inline]
    pub fn default_directive(&self) -> &'static str {
        if self.debug { "debug" } else { "info" }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_when_unset() {
        let cfg = Config::from_env(&Env::default()).unwrap();
        assert_eq!(cfg, Config::default());
        assert_eq!(cfg.default_directive(), "info");
    }

    #[test]
    fn reads_debug_and_color() {
        let env = Env::new(["DEBUG=1", "COLOR=false"]);
        let cfg = Config::from_env(&env).unwrap();
        assert!(cfg.debug);
        assert_eq!(cfg.color, Some(false));
        assert!(!cfg.color_enabled());
        assert_eq!(cfg.default_directive(), "debug");
    }

    #[test]
    fn rejects_malformed_bool() {
        let env = Env::new(["COLOR=maybe"]);
        let err = Config::from_env(&env).unwrap_err();
        assert_eq!(err.name, "COLOR");
    }
}
