//! USB class codes and device-type heuristic

use crate::types::DeviceDescriptor;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;

pub const CLASS_PER_INTERFACE: u8 = 0x00;
pub const CLASS_HID: u8 = 0x03;
pub const CLASS_MASS_STORAGE: u8 = 0x08;
pub const CLASS_HUB: u8 = 0x09;
pub const CLASS_VENDOR_SPECIFIC: u8 = 0xFF;

/// Human-readable name for a USB class code
pub fn class_name(code: u8) -> Cow<'static, str> {
    let name = match code {
        0x00 => "Per Interface",
        0x01 => "Audio",
        0x02 => "Communications",
        0x03 => "HID (Human Interface Device)",
        0x05 => "Physical",
        0x06 => "Image",
        0x07 => "Printer",
        0x08 => "Mass Storage",
        0x09 => "Hub",
        0x0A => "CDC-Data",
        0x0B => "Smart Card",
        0x0D => "Content Security",
        0x0E => "Video",
        0x0F => "Personal Healthcare",
        0x10 => "Audio/Video Devices",
        0x11 => "Billboard Device",
        0xDC => "Diagnostic Device",
        0xE0 => "Wireless Controller",
        0xEF => "Miscellaneous",
        0xFE => "Application Specific",
        0xFF => "Vendor Specific",
        other => return Cow::Owned(format!("Unknown (0x{:02x})", other)),
    };
    Cow::Borrowed(name)
}

/// Coarse device category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceType {
    MassStorage,
    Hid,
    Hub,
    VendorSpecific,
    Other,
}

impl fmt::Display for DeviceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DeviceType::MassStorage => "Mass Storage Device",
            DeviceType::Hid => "HID (e.g., Keyboard, Mouse, or Dongle)",
            DeviceType::Hub => "USB Hub",
            DeviceType::VendorSpecific => {
                "Vendor-Specific (Possible Dongle or Specialized Device)"
            }
            DeviceType::Other => "Other/Unknown Device Type",
        };
        f.write_str(name)
    }
}

/// Classify from the device class and the interface classes
///
/// First match wins: storage, HID, hub, vendor-specific, other. Storage and
/// HID also match on any interface class; hub and vendor-specific only on
/// the device class.
pub fn classify_codes(
    device_class: u8,
    interface_classes: impl IntoIterator<Item = u8>,
) -> DeviceType {
    let interface_classes: Vec<u8> = interface_classes.into_iter().collect();
    let matches = |class: u8| device_class == class || interface_classes.contains(&class);

    if matches(CLASS_MASS_STORAGE) {
        DeviceType::MassStorage
    } else if matches(CLASS_HID) {
        DeviceType::Hid
    } else if device_class == CLASS_HUB {
        DeviceType::Hub
    } else if device_class == CLASS_VENDOR_SPECIFIC {
        DeviceType::VendorSpecific
    } else {
        DeviceType::Other
    }
}

/// Classify a decoded descriptor
pub fn classify(descriptor: &DeviceDescriptor) -> DeviceType {
    classify_codes(descriptor.device_class, descriptor.interface_classes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_class_name_known() {
        assert_eq!(class_name(0x08), "Mass Storage");
        assert_eq!(class_name(0xFF), "Vendor Specific");
        assert_eq!(class_name(0x00), "Per Interface");
    }

    #[test]
    fn test_class_name_unknown() {
        assert_eq!(class_name(0x42), "Unknown (0x42)");
    }

    #[test]
    fn test_classify_device_class() {
        assert_eq!(classify_codes(0x08, []), DeviceType::MassStorage);
        assert_eq!(classify_codes(0x03, []), DeviceType::Hid);
        assert_eq!(classify_codes(0x09, []), DeviceType::Hub);
        assert_eq!(classify_codes(0xFF, []), DeviceType::VendorSpecific);
        assert_eq!(classify_codes(0x0E, []), DeviceType::Other);
    }

    #[test]
    fn test_classify_interface_class() {
        assert_eq!(classify_codes(0x00, [0x08]), DeviceType::MassStorage);
        assert_eq!(classify_codes(0x00, [0x01, 0x03]), DeviceType::Hid);
        // Hub and vendor-specific are device-class only
        assert_eq!(classify_codes(0x00, [0x09]), DeviceType::Other);
        assert_eq!(classify_codes(0x00, [0xFF]), DeviceType::Other);
    }

    #[test]
    fn test_classify_first_match_order() {
        assert_eq!(classify_codes(0x00, [0x03, 0x08]), DeviceType::MassStorage);
        assert_eq!(classify_codes(0xFF, [0x03]), DeviceType::Hid);
        assert_eq!(classify_codes(0x09, [0x08]), DeviceType::MassStorage);
    }
}
