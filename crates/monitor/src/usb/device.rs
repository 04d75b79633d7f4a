//! libusb-backed USB access layer
//!
//! This module wraps `rusb` devices and converts their descriptors into the
//! inventory types.

use crate::error::{MonitorError, Result};
use crate::usb::backend::{StringSource, UsbBackend, UsbDeviceSource};
use inventory::{
    ConfigurationInfo, DeviceSpeed, Direction, EndpointInfo, EndpointTransferType, InterfaceInfo,
    RawDeviceDescriptor,
};
use rusb::{Context, Device, DeviceHandle, Language, UsbContext};
use std::time::Duration;
use tracing::{debug, trace};

/// USB access layer on a libusb context
pub struct RusbBackend {
    context: Context,
    /// Timeout for each string descriptor request
    string_timeout: Duration,
}

impl RusbBackend {
    /// Initialize libusb
    ///
    /// Failure here means the USB access layer is unavailable and the
    /// process cannot do anything useful.
    pub fn new(string_timeout: Duration) -> Result<Self> {
        let context = Context::new().map_err(|e| {
            MonitorError::BackendUnavailable(format!("failed to initialize libusb: {}", e))
        })?;

        debug!("libusb context initialized");
        Ok(Self {
            context,
            string_timeout,
        })
    }
}

impl UsbBackend for RusbBackend {
    type Device = RusbDevice;

    fn devices(&self) -> Result<Vec<RusbDevice>> {
        let list = self.context.devices()?;
        Ok(list
            .iter()
            .map(|device| RusbDevice {
                device,
                string_timeout: self.string_timeout,
            })
            .collect())
    }
}

/// One libusb device
pub struct RusbDevice {
    device: Device<Context>,
    string_timeout: Duration,
}

impl UsbDeviceSource for RusbDevice {
    fn bus_number(&self) -> u8 {
        self.device.bus_number()
    }

    fn address(&self) -> u8 {
        self.device.address()
    }

    fn speed(&self) -> DeviceSpeed {
        map_device_speed(self.device.speed())
    }

    fn device_descriptor(&self) -> Result<RawDeviceDescriptor> {
        let desc = self.device.device_descriptor()?;

        Ok(RawDeviceDescriptor {
            vendor_id: desc.vendor_id(),
            product_id: desc.product_id(),
            class: desc.class_code(),
            subclass: desc.sub_class_code(),
            protocol: desc.protocol_code(),
            usb_version: version_to_bcd(desc.usb_version()),
            device_version: version_to_bcd(desc.device_version()),
            max_packet_size: desc.max_packet_size(),
            num_configurations: desc.num_configurations(),
            manufacturer_index: desc.manufacturer_string_index(),
            product_index: desc.product_string_index(),
            serial_number_index: desc.serial_number_string_index(),
        })
    }

    fn active_configuration(&self) -> Result<u8> {
        Ok(self.device.active_config_descriptor()?.number())
    }

    fn configurations(&self, count: u8) -> Result<Vec<ConfigurationInfo>> {
        (0..count)
            .map(|index| -> Result<ConfigurationInfo> {
                let config = self.device.config_descriptor(index)?;
                Ok(convert_config(&config))
            })
            .collect()
    }

    fn open_strings(&self) -> Result<Box<dyn StringSource + '_>> {
        let handle = self.device.open()?;

        // Devices without a language table still answer ASCII reads
        let language = match handle.read_languages(self.string_timeout) {
            Ok(languages) => languages.first().copied(),
            Err(e) => {
                trace!(
                    "No language table on bus={} addr={}: {}",
                    self.device.bus_number(),
                    self.device.address(),
                    e
                );
                None
            }
        };

        Ok(Box::new(RusbStrings {
            handle,
            language,
            timeout: self.string_timeout,
        }))
    }
}

/// Opened device handle used only for string reads
struct RusbStrings {
    handle: DeviceHandle<Context>,
    language: Option<Language>,
    timeout: Duration,
}

impl StringSource for RusbStrings {
    fn read_string(&self, index: u8) -> Result<String> {
        let value = match self.language {
            Some(language) => self
                .handle
                .read_string_descriptor(language, index, self.timeout)?,
            None => self.handle.read_string_descriptor_ascii(index)?,
        };
        Ok(value.trim_end_matches('\0').trim().to_string())
    }
}

fn convert_config(config: &rusb::ConfigDescriptor) -> ConfigurationInfo {
    let interfaces = config
        .interfaces()
        .flat_map(|interface| interface.descriptors())
        .map(|desc| InterfaceInfo {
            number: desc.interface_number(),
            alternate_setting: desc.setting_number(),
            class: desc.class_code(),
            subclass: desc.sub_class_code(),
            protocol: desc.protocol_code(),
            endpoints: desc
                .endpoint_descriptors()
                .map(|ep| EndpointInfo {
                    address: ep.address(),
                    direction: match ep.direction() {
                        rusb::Direction::In => Direction::In,
                        rusb::Direction::Out => Direction::Out,
                    },
                    transfer_type: map_transfer_type(ep.transfer_type()),
                    max_packet_size: ep.max_packet_size(),
                    interval: ep.interval(),
                })
                .collect(),
        })
        .collect();

    ConfigurationInfo {
        value: config.number(),
        max_power_ma: config.max_power(),
        self_powered: config.self_powered(),
        remote_wakeup: config.remote_wakeup(),
        interfaces,
    }
}

/// Map rusb device speed to inventory DeviceSpeed
fn map_device_speed(speed: rusb::Speed) -> DeviceSpeed {
    match speed {
        rusb::Speed::Low => DeviceSpeed::Low,
        rusb::Speed::Full => DeviceSpeed::Full,
        rusb::Speed::High => DeviceSpeed::High,
        rusb::Speed::Super => DeviceSpeed::Super,
        rusb::Speed::SuperPlus => DeviceSpeed::SuperPlus,
        _ => DeviceSpeed::Unknown,
    }
}

fn map_transfer_type(transfer_type: rusb::TransferType) -> EndpointTransferType {
    match transfer_type {
        rusb::TransferType::Control => EndpointTransferType::Control,
        rusb::TransferType::Isochronous => EndpointTransferType::Isochronous,
        rusb::TransferType::Bulk => EndpointTransferType::Bulk,
        rusb::TransferType::Interrupt => EndpointTransferType::Interrupt,
    }
}

/// Re-encode a decoded rusb version as BCD
fn version_to_bcd(version: rusb::Version) -> u16 {
    let major = version.major() as u16;
    ((major / 10) << 12)
        | ((major % 10) << 8)
        | ((version.minor() as u16 & 0x0f) << 4)
        | (version.sub_minor() as u16 & 0x0f)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_map_device_speed() {
        assert_eq!(map_device_speed(rusb::Speed::Low), DeviceSpeed::Low);
        assert_eq!(map_device_speed(rusb::Speed::Full), DeviceSpeed::Full);
        assert_eq!(map_device_speed(rusb::Speed::High), DeviceSpeed::High);
        assert_eq!(map_device_speed(rusb::Speed::Super), DeviceSpeed::Super);
        assert_eq!(
            map_device_speed(rusb::Speed::SuperPlus),
            DeviceSpeed::SuperPlus
        );
        assert_eq!(map_device_speed(rusb::Speed::Unknown), DeviceSpeed::Unknown);
    }

    #[test]
    fn test_version_to_bcd() {
        assert_eq!(version_to_bcd(rusb::Version::from_bcd(0x0200)), 0x0200);
        assert_eq!(version_to_bcd(rusb::Version::from_bcd(0x0110)), 0x0110);
        assert_eq!(version_to_bcd(rusb::Version::from_bcd(0x0320)), 0x0320);
        assert_eq!(version_to_bcd(rusb::Version::from_bcd(0x1234)), 0x1234);
    }

    #[test]
    fn test_backend_creation() {
        // libusb may be missing or inaccessible in the test environment
        match RusbBackend::new(Duration::from_millis(200)) {
            Ok(backend) => {
                let _ = backend.devices();
            }
            Err(e) => {
                assert!(e.is_fatal());
                eprintln!("USB backend unavailable (expected without libusb): {}", e);
            }
        }
    }
}
