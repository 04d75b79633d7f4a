//! Device inventory model for usb-watch
//!
//! This crate holds the pure parts of the monitor: device identities and
//! decoded descriptors, the inventory snapshot and its differ, the USB class
//! table with the device-type heuristic, and VID:PID filters. Nothing here
//! talks to the USB access layer.
//!
//! # Example
//!
//! ```
//! use inventory::{DeviceIdentity, Inventory, diff};
//!
//! let previous = Inventory::new();
//! let current: Inventory = [DeviceIdentity::new(0x1234, 0x5678, 1, 2)]
//!     .into_iter()
//!     .collect();
//!
//! let change = diff(&previous, &current);
//! assert_eq!(change.arrived.len(), 1);
//! assert!(change.departed.is_empty());
//! ```

pub mod class;
pub mod diff;
pub mod filter;
pub mod types;

pub use class::{DeviceType, class_name, classify, classify_codes};
pub use diff::{Inventory, InventoryChange, diff};
pub use filter::{DeviceFilter, FilterError, IdPattern, is_allowed, parse_filters};
pub use types::{
    ConfigurationInfo, DeviceDescriptor, DeviceIdentity, DeviceSpeed, Direction, EndpointInfo,
    EndpointTransferType, FieldValue, InterfaceInfo, RawDeviceDescriptor, format_bcd,
};
