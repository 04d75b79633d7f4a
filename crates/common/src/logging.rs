//! Logging setup and configuration
//!
//! Log output goes to stderr; stdout is reserved for device status lines
//! and the interactive device list.

use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Parse a level or directive list such as `info` or `monitor=debug,warn`
pub fn parse_filter(directives: &str) -> crate::Result<EnvFilter> {
    EnvFilter::try_new(directives)
        .map_err(|e| crate::Error::LogFilter(format!("'{}': {}", directives, e)))
}

/// Install the global tracing subscriber
///
/// `RUST_LOG` takes precedence over `default_level` when it is set.
pub fn setup_logging(default_level: &str) -> crate::Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => parse_filter(default_level)?,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .try_init()
        .map_err(|e| crate::Error::Logging(e.to_string()))?;

    Ok(())
}
