//! Monitor error types
//!
//! Faults are split by how the monitor recovers from them: permission faults
//! degrade a single field, transient faults skip a device or a cycle, and an
//! unavailable backend stops the process.

use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MonitorError {
    /// Reading a descriptor field was refused by the OS
    #[error("Access denied ({0}); try running with elevated privileges")]
    PermissionOrAccess(String),

    /// Device disappeared between enumeration and descriptor read
    #[error("Device disappeared: {0}")]
    TransientDevice(String),

    /// The USB access layer cannot be initialized at all
    #[error("USB access layer unavailable: {0}")]
    BackendUnavailable(String),

    /// Interactive selection was not a valid device number
    #[error("{0}")]
    MalformedInput(String),

    /// An enumeration pass did not finish in time
    #[error("Enumeration pass exceeded {0:?}")]
    PassTimeout(Duration),

    /// Any other USB access layer failure
    #[error("USB error: {0}")]
    Usb(String),

    /// Device log could not be written
    #[error("Report error: {0}")]
    Report(String),

    #[error("I/O error: {0}")]
    Io(String),
}

impl MonitorError {
    /// Whether the process must stop
    pub fn is_fatal(&self) -> bool {
        matches!(self, MonitorError::BackendUnavailable(_))
    }

    /// Whether the next poll cycle may succeed where this one failed
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            MonitorError::TransientDevice(_) | MonitorError::PassTimeout(_) | MonitorError::Usb(_)
        )
    }
}

impl From<rusb::Error> for MonitorError {
    fn from(err: rusb::Error) -> Self {
        match err {
            rusb::Error::Access => MonitorError::PermissionOrAccess(err.to_string()),
            rusb::Error::NoDevice | rusb::Error::NotFound => {
                MonitorError::TransientDevice(err.to_string())
            }
            _ => MonitorError::Usb(err.to_string()),
        }
    }
}

impl From<std::io::Error> for MonitorError {
    fn from(err: std::io::Error) -> Self {
        MonitorError::Io(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, MonitorError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_map_rusb_error() {
        assert!(matches!(
            MonitorError::from(rusb::Error::Access),
            MonitorError::PermissionOrAccess(_)
        ));
        assert!(matches!(
            MonitorError::from(rusb::Error::NoDevice),
            MonitorError::TransientDevice(_)
        ));
        assert!(matches!(
            MonitorError::from(rusb::Error::NotFound),
            MonitorError::TransientDevice(_)
        ));
        assert!(matches!(
            MonitorError::from(rusb::Error::Pipe),
            MonitorError::Usb(_)
        ));
    }

    #[test]
    fn test_fatal_classification() {
        assert!(MonitorError::BackendUnavailable("no libusb".into()).is_fatal());
        assert!(!MonitorError::TransientDevice("gone".into()).is_fatal());
        assert!(MonitorError::PassTimeout(Duration::from_secs(5)).is_transient());
        assert!(!MonitorError::MalformedInput("abc".into()).is_transient());
    }

    #[test]
    fn test_error_display() {
        let msg = MonitorError::PermissionOrAccess("Access denied".into()).to_string();
        assert!(msg.contains("elevated privileges"));
    }
}
