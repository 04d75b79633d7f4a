//! Errors raised while setting up the process environment

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// A global subscriber is already installed
    #[error("Logging error: {0}")]
    Logging(String),

    #[error("Invalid log filter {0}")]
    LogFilter(String),
}

pub type Result<T> = std::result::Result<T, Error>;
