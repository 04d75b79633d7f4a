//! USB subsystem
//!
//! Talks to the host's USB access layer: enumerating attached devices and
//! decoding their descriptors. Every call here blocks, so the monitor runs
//! them on the Tokio blocking pool.

pub mod backend;
pub mod device;
pub mod enumerator;
pub mod mock;

// Re-export public types
pub use backend::{StringSource, UsbBackend, UsbDeviceSource};
pub use device::{RusbBackend, RusbDevice};
pub use enumerator::{Enumerator, Snapshot, describe};
pub use mock::{MockBackend, MockDevice, MockFaults};
