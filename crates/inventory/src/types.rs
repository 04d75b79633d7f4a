//! USB device identity and descriptor types
//!
//! This module defines the values produced by one enumeration pass: the
//! identity used for change detection and the decoded descriptor that is
//! printed or written to the device log.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::SystemTime;

/// Identity of an attached device as seen by the host controller
///
/// Two devices present at the same time never share an identity. The same
/// physical device may come back with a different address after a replug.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct DeviceIdentity {
    /// USB Vendor ID
    pub vendor_id: u16,
    /// USB Product ID
    pub product_id: u16,
    /// Bus number assigned by the host controller
    pub bus: u8,
    /// Device address on the bus
    pub address: u8,
}

impl DeviceIdentity {
    pub fn new(vendor_id: u16, product_id: u16, bus: u8, address: u8) -> Self {
        Self {
            vendor_id,
            product_id,
            bus,
            address,
        }
    }
}

impl fmt::Display for DeviceIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:04x}:{:04x}@{:03}:{:03}",
            self.vendor_id, self.product_id, self.bus, self.address
        )
    }
}

/// Outcome of reading one optional descriptor field
///
/// Keeps "the device does not declare this field" apart from "the field
/// exists but could not be read", so a partial descriptor is never shown as
/// complete.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldValue<T> {
    /// Field was read successfully
    Present(T),
    /// Device declares no value for this field (string index 0)
    Absent,
    /// Field exists but reading it failed
    Unreadable { reason: String },
}

impl<T> FieldValue<T> {
    /// Build an unreadable field from any displayable fault
    pub fn unreadable(reason: impl fmt::Display) -> Self {
        FieldValue::Unreadable {
            reason: reason.to_string(),
        }
    }

    /// True for both `Absent` and `Unreadable`
    pub fn is_unavailable(&self) -> bool {
        !matches!(self, FieldValue::Present(_))
    }

    pub fn is_unreadable(&self) -> bool {
        matches!(self, FieldValue::Unreadable { .. })
    }

    pub fn as_present(&self) -> Option<&T> {
        match self {
            FieldValue::Present(value) => Some(value),
            _ => None,
        }
    }

    /// Fault message when the field could not be read
    pub fn unreadable_reason(&self) -> Option<&str> {
        match self {
            FieldValue::Unreadable { reason } => Some(reason),
            _ => None,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> FieldValue<U> {
        match self {
            FieldValue::Present(value) => FieldValue::Present(f(value)),
            FieldValue::Absent => FieldValue::Absent,
            FieldValue::Unreadable { reason } => FieldValue::Unreadable { reason },
        }
    }
}

impl<T, E: fmt::Display> From<Result<T, E>> for FieldValue<T> {
    fn from(result: Result<T, E>) -> Self {
        match result {
            Ok(value) => FieldValue::Present(value),
            Err(e) => FieldValue::unreadable(e),
        }
    }
}

impl<T: fmt::Display> fmt::Display for FieldValue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Present(value) => write!(f, "{}", value),
            FieldValue::Absent => f.write_str("Unknown"),
            FieldValue::Unreadable { reason } => write!(f, "Not Accessible: {}", reason),
        }
    }
}

/// USB device speed
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum DeviceSpeed {
    /// Low speed - 1.5 Mbps (USB 1.0)
    Low,
    /// Full speed - 12 Mbps (USB 1.1)
    Full,
    /// High speed - 480 Mbps (USB 2.0)
    High,
    /// SuperSpeed - 5 Gbps (USB 3.0)
    Super,
    /// SuperSpeed+ - 10 Gbps (USB 3.1)
    SuperPlus,
    /// Backend did not report a speed
    Unknown,
}

impl fmt::Display for DeviceSpeed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DeviceSpeed::Low => "Low (1.5 Mbps)",
            DeviceSpeed::Full => "Full (12 Mbps)",
            DeviceSpeed::High => "High (480 Mbps)",
            DeviceSpeed::Super => "Super (5 Gbps)",
            DeviceSpeed::SuperPlus => "SuperPlus (10 Gbps)",
            DeviceSpeed::Unknown => "Unknown",
        };
        f.write_str(name)
    }
}

/// Endpoint direction, from bit 7 of the endpoint address
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    In,
    Out,
}

/// Endpoint transfer type, from bits 0..1 of bmAttributes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EndpointTransferType {
    Control,
    Isochronous,
    Bulk,
    Interrupt,
}

impl EndpointTransferType {
    /// Decode from the raw bmAttributes byte
    pub fn from_attributes(attributes: u8) -> Self {
        match attributes & 0x03 {
            0 => EndpointTransferType::Control,
            1 => EndpointTransferType::Isochronous,
            2 => EndpointTransferType::Bulk,
            _ => EndpointTransferType::Interrupt,
        }
    }
}

impl fmt::Display for EndpointTransferType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Endpoint sub-descriptor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointInfo {
    /// Endpoint address including the direction bit
    pub address: u8,
    pub direction: Direction,
    pub transfer_type: EndpointTransferType,
    pub max_packet_size: u16,
    /// Polling interval in frames
    pub interval: u8,
}

/// Interface (alternate setting) sub-descriptor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterfaceInfo {
    pub number: u8,
    pub alternate_setting: u8,
    pub class: u8,
    pub subclass: u8,
    pub protocol: u8,
    pub endpoints: Vec<EndpointInfo>,
}

/// Configuration sub-descriptor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigurationInfo {
    /// bConfigurationValue
    pub value: u8,
    /// Maximum bus power draw in milliamps
    pub max_power_ma: u16,
    pub self_powered: bool,
    pub remote_wakeup: bool,
    pub interfaces: Vec<InterfaceInfo>,
}

/// Fixed-size fields of the standard device descriptor
///
/// These come straight from the USB access layer and never require a
/// request to the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawDeviceDescriptor {
    pub vendor_id: u16,
    pub product_id: u16,
    pub class: u8,
    pub subclass: u8,
    pub protocol: u8,
    /// bcdUSB
    pub usb_version: u16,
    /// bcdDevice
    pub device_version: u16,
    pub max_packet_size: u8,
    pub num_configurations: u8,
    pub manufacturer_index: Option<u8>,
    pub product_index: Option<u8>,
    pub serial_number_index: Option<u8>,
}

/// Decoded descriptor for one attached device
///
/// Built fresh on each enumeration pass and never mutated afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceDescriptor {
    pub vendor_id: u16,
    pub product_id: u16,
    pub bus: u8,
    pub address: u8,
    pub manufacturer: FieldValue<String>,
    pub product: FieldValue<String>,
    pub serial_number: FieldValue<String>,
    pub device_class: u8,
    pub device_subclass: u8,
    pub protocol: u8,
    /// Active configuration value
    pub configuration: FieldValue<u8>,
    pub usb_version: u16,
    pub device_version: u16,
    pub speed: DeviceSpeed,
    pub max_packet_size: u8,
    pub configurations: FieldValue<Vec<ConfigurationInfo>>,
    /// When the descriptor was captured
    pub observed_at: SystemTime,
}

impl DeviceDescriptor {
    pub fn identity(&self) -> DeviceIdentity {
        DeviceIdentity::new(self.vendor_id, self.product_id, self.bus, self.address)
    }

    /// Interface class codes across every configuration
    pub fn interface_classes(&self) -> impl Iterator<Item = u8> + '_ {
        self.configurations
            .as_present()
            .into_iter()
            .flatten()
            .flat_map(|config| config.interfaces.iter().map(|intf| intf.class))
    }

    /// Names and fault reasons for every field that could not be read
    pub fn unreadable_fields(&self) -> Vec<(&'static str, &str)> {
        [
            ("manufacturer", self.manufacturer.unreadable_reason()),
            ("product", self.product.unreadable_reason()),
            ("serial_number", self.serial_number.unreadable_reason()),
            ("configuration", self.configuration.unreadable_reason()),
            ("configurations", self.configurations.unreadable_reason()),
        ]
        .into_iter()
        .filter_map(|(name, reason)| reason.map(|r| (name, r)))
        .collect()
    }

    /// True when at least one field carries a fault annotation
    pub fn is_partial(&self) -> bool {
        !self.unreadable_fields().is_empty()
    }
}

/// Format a BCD version (bcdUSB / bcdDevice) as `major.minor`
pub fn format_bcd(bcd: u16) -> String {
    let major = ((bcd >> 12) & 0x0f) * 10 + ((bcd >> 8) & 0x0f);
    let minor = (bcd >> 4) & 0x0f;
    let sub = bcd & 0x0f;
    if sub == 0 {
        format!("{}.{}", major, minor)
    } else {
        format!("{}.{}{}", major, minor, sub)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_display() {
        let id = DeviceIdentity::new(0x1234, 0x5678, 1, 2);
        assert_eq!(id.to_string(), "1234:5678@001:002");
    }

    #[test]
    fn test_field_value_display() {
        assert_eq!(FieldValue::Present("Acme".to_string()).to_string(), "Acme");
        assert_eq!(FieldValue::<String>::Absent.to_string(), "Unknown");
        assert_eq!(
            FieldValue::<String>::unreadable("Access denied").to_string(),
            "Not Accessible: Access denied"
        );
    }

    #[test]
    fn test_field_value_serde() {
        let json = serde_json::to_string(&FieldValue::<String>::unreadable("Pipe error")).unwrap();
        assert_eq!(json, r#"{"unreadable":{"reason":"Pipe error"}}"#);

        let parsed: FieldValue<String> = serde_json::from_str(r#"{"present":"Acme"}"#).unwrap();
        assert_eq!(parsed, FieldValue::Present("Acme".to_string()));
        assert_eq!(serde_json::to_string(&FieldValue::<u8>::Absent).unwrap(), r#""absent""#);
    }

    #[test]
    fn test_field_value_unavailable() {
        assert!(!FieldValue::Present(1u8).is_unavailable());
        assert!(FieldValue::<u8>::Absent.is_unavailable());
        assert!(FieldValue::<u8>::unreadable("x").is_unavailable());
        assert!(!FieldValue::<u8>::Absent.is_unreadable());
    }

    #[test]
    fn test_field_value_from_result() {
        let ok: Result<u8, String> = Ok(1);
        let err: Result<u8, String> = Err("Pipe error".to_string());
        assert_eq!(FieldValue::from(ok), FieldValue::Present(1));
        assert_eq!(
            FieldValue::from(err).unreadable_reason(),
            Some("Pipe error")
        );
    }

    #[test]
    fn test_transfer_type_from_attributes() {
        assert_eq!(
            EndpointTransferType::from_attributes(0x00),
            EndpointTransferType::Control
        );
        assert_eq!(
            EndpointTransferType::from_attributes(0x05),
            EndpointTransferType::Isochronous
        );
        assert_eq!(
            EndpointTransferType::from_attributes(0x02),
            EndpointTransferType::Bulk
        );
        assert_eq!(
            EndpointTransferType::from_attributes(0x03),
            EndpointTransferType::Interrupt
        );
    }

    #[test]
    fn test_format_bcd() {
        assert_eq!(format_bcd(0x0200), "2.0");
        assert_eq!(format_bcd(0x0110), "1.1");
        assert_eq!(format_bcd(0x0320), "3.2");
        assert_eq!(format_bcd(0x0201), "2.01");
        assert_eq!(format_bcd(0x1000), "10.0");
    }
}
