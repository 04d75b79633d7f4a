//! Test utilities for usb-watch
//!
//! Provides descriptor builders and helper functions for testing across crates.
//!
//! # Example
//!
//! ```
//! use common::test_utils::create_mock_descriptor;
//!
//! let device = create_mock_descriptor(0x1234, 0x5678, 1, 2);
//! assert_eq!(device.vendor_id, 0x1234);
//! assert_eq!(device.identity().address, 2);
//! ```

use inventory::{
    ConfigurationInfo, DeviceDescriptor, DeviceSpeed, Direction, EndpointInfo,
    EndpointTransferType, FieldValue, InterfaceInfo,
};
use std::future::Future;
use std::time::{Duration, SystemTime};

/// Default test timeout (5 seconds)
pub const DEFAULT_TEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Create a single-interface configuration with one IN endpoint
pub fn create_mock_configuration(interface_class: u8) -> ConfigurationInfo {
    let transfer_type = if interface_class == 0x03 {
        EndpointTransferType::Interrupt
    } else {
        EndpointTransferType::Bulk
    };

    ConfigurationInfo {
        value: 1,
        max_power_ma: 100,
        self_powered: false,
        remote_wakeup: false,
        interfaces: vec![InterfaceInfo {
            number: 0,
            alternate_setting: 0,
            class: interface_class,
            subclass: 0x00,
            protocol: 0x00,
            endpoints: vec![EndpointInfo {
                address: 0x81,
                direction: Direction::In,
                transfer_type,
                max_packet_size: 64,
                interval: 10,
            }],
        }],
    }
}

/// Create a fully readable mock descriptor
///
/// # Arguments
/// * `vendor_id` - USB Vendor ID
/// * `product_id` - USB Product ID
/// * `bus` - Bus number
/// * `address` - Device address
pub fn create_mock_descriptor(
    vendor_id: u16,
    product_id: u16,
    bus: u8,
    address: u8,
) -> DeviceDescriptor {
    create_mock_descriptor_with_class(vendor_id, product_id, bus, address, 0x00, 0xFF)
}

/// Create a mock descriptor with a specific device and interface class
pub fn create_mock_descriptor_with_class(
    vendor_id: u16,
    product_id: u16,
    bus: u8,
    address: u8,
    device_class: u8,
    interface_class: u8,
) -> DeviceDescriptor {
    DeviceDescriptor {
        vendor_id,
        product_id,
        bus,
        address,
        manufacturer: FieldValue::Present(format!("Test Manufacturer {:04x}", vendor_id)),
        product: FieldValue::Present(format!("Test Product {:04x}", product_id)),
        serial_number: FieldValue::Present(format!("SN{:03}{:03}", bus, address)),
        device_class,
        device_subclass: 0x00,
        protocol: 0x00,
        configuration: FieldValue::Present(1),
        usb_version: 0x0200,
        device_version: 0x0100,
        speed: DeviceSpeed::High,
        max_packet_size: 64,
        configurations: FieldValue::Present(vec![create_mock_configuration(interface_class)]),
        observed_at: SystemTime::now(),
    }
}

/// Create a mock mass storage descriptor
pub fn create_mock_mass_storage_descriptor(bus: u8, address: u8) -> DeviceDescriptor {
    create_mock_descriptor_with_class(0x0781, 0x5581, bus, address, 0x00, 0x08)
}

/// Create a mock HID descriptor (keyboard/mouse)
pub fn create_mock_hid_descriptor(bus: u8, address: u8) -> DeviceDescriptor {
    create_mock_descriptor_with_class(0x046d, 0xc52b, bus, address, 0x00, 0x03)
}

/// Create a mock hub descriptor
pub fn create_mock_hub_descriptor(bus: u8, address: u8) -> DeviceDescriptor {
    create_mock_descriptor_with_class(0x05e3, 0x0608, bus, address, 0x09, 0x09)
}

/// Create a descriptor whose string fields could not be read
pub fn create_mock_partial_descriptor(
    vendor_id: u16,
    product_id: u16,
    bus: u8,
    address: u8,
) -> DeviceDescriptor {
    DeviceDescriptor {
        manufacturer: FieldValue::unreadable("Access denied (insufficient permissions)"),
        product: FieldValue::unreadable("Access denied (insufficient permissions)"),
        serial_number: FieldValue::Absent,
        ..create_mock_descriptor(vendor_id, product_id, bus, address)
    }
}

/// Run an async operation with a timeout
///
/// # Example
/// ```ignore
/// use common::test_utils::{with_timeout, DEFAULT_TEST_TIMEOUT};
///
/// #[tokio::test]
/// async fn test_with_timeout() {
///     let result = with_timeout(DEFAULT_TEST_TIMEOUT, async { 42 }).await.unwrap();
///     assert_eq!(result, 42);
/// }
/// ```
pub async fn with_timeout<T, F>(duration: Duration, future: F) -> Result<T, TimeoutError>
where
    F: Future<Output = T>,
{
    tokio::time::timeout(duration, future)
        .await
        .map_err(|_| TimeoutError { duration })
}

/// Error returned when a test times out
#[derive(Debug)]
pub struct TimeoutError {
    /// The timeout duration that was exceeded
    pub duration: Duration,
}

impl std::fmt::Display for TimeoutError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Test timed out after {:?}", self.duration)
    }
}

impl std::error::Error for TimeoutError {}
