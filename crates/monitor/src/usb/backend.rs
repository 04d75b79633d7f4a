//! USB access layer seam
//!
//! The monitor only needs three primitives from the host: enumerate the
//! attached devices, read their fixed descriptor fields, and resolve string
//! descriptor indexes. [`RusbBackend`](super::RusbBackend) provides them on
//! libusb; [`MockBackend`](super::MockBackend) provides them in tests.

use crate::error::Result;
use inventory::{ConfigurationInfo, DeviceSpeed, RawDeviceDescriptor};

/// Resolves string descriptor indexes on an opened device
pub trait StringSource {
    fn read_string(&self, index: u8) -> Result<String>;
}

/// One attached device as reported by the USB access layer
pub trait UsbDeviceSource {
    fn bus_number(&self) -> u8;

    fn address(&self) -> u8;

    fn speed(&self) -> DeviceSpeed;

    /// Fixed-size device descriptor fields
    ///
    /// Fails when the device has gone away since enumeration.
    fn device_descriptor(&self) -> Result<RawDeviceDescriptor>;

    /// bConfigurationValue of the active configuration
    fn active_configuration(&self) -> Result<u8>;

    /// All configuration descriptors with their interfaces and endpoints
    fn configurations(&self, count: u8) -> Result<Vec<ConfigurationInfo>>;

    /// Open the device for string descriptor reads
    fn open_strings(&self) -> Result<Box<dyn StringSource + '_>>;
}

/// Entry point of the USB access layer
///
/// Shared with the blocking pool, so it must be `Send + Sync`.
pub trait UsbBackend: Send + Sync + 'static {
    type Device: UsbDeviceSource;

    /// Every currently attached device, in host-controller order
    fn devices(&self) -> Result<Vec<Self::Device>>;
}
