//! One-time installation of the process-wide `tracing` subscriber.

use thiserror::Error;
use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::error::BoxError;

/// The global subscriber could not be installed (usually: one already is).
#[derive(Error, Debug)]
#[error("failed to install log subscriber: {0}")]
pub struct LogInitError(#[source] pub BoxError);

/// Installs a `fmt` subscriber writing to stderr.
///
/// Call once from the process entry point. `RUST_LOG` overrides the level
/// derived from `DEBUG`.
pub fn init(config: &Config) -> Result<(), LogInitError> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.default_directive()));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(config.color_enabled())
        .with_target(false)
        .try_init()
        .map_err(LogInitError)
}
