//! Common utilities for usb-watch
//!
//! This crate provides the ambient pieces shared by the monitor library and
//! binary: error handling, tracing setup, timestamp formatting, and test
//! helpers for building mock descriptors.

pub mod error;
pub mod logging;
pub mod test_utils;
pub mod timestamp;

pub use error::{Error, Result};
pub use logging::{parse_filter, setup_logging};
pub use timestamp::{format_iso8601, format_iso8601_millis};
