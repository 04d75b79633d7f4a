//! In-memory USB access layer for tests
//!
//! A [`MockBackend`] is a cheap handle to shared state, so a test can keep
//! one clone to plug and unplug devices while the monitor polls another.

use crate::error::{MonitorError, Result};
use crate::usb::backend::{StringSource, UsbBackend, UsbDeviceSource};
use inventory::{ConfigurationInfo, DeviceIdentity, DeviceSpeed, RawDeviceDescriptor};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

/// Faults injected into a single mock device
#[derive(Debug, Clone, Default)]
pub struct MockFaults {
    /// Returned by every device descriptor read (device vanished)
    pub descriptor: Option<MonitorError>,
    /// Returned when opening the device for string reads
    pub open: Option<MonitorError>,
    /// Returned when reading the given string index
    pub strings: HashMap<u8, MonitorError>,
    /// Returned by configuration descriptor reads
    pub configuration: Option<MonitorError>,
}

/// A device that the mock backend reports as attached
#[derive(Debug, Clone)]
pub struct MockDevice {
    pub bus: u8,
    pub address: u8,
    pub raw: RawDeviceDescriptor,
    pub speed: DeviceSpeed,
    pub strings: HashMap<u8, String>,
    pub active_configuration: u8,
    pub configurations: Vec<ConfigurationInfo>,
    pub faults: MockFaults,
}

impl MockDevice {
    /// Device with manufacturer, product and serial strings at indexes 1..=3
    pub fn new(vendor_id: u16, product_id: u16, bus: u8, address: u8) -> Self {
        let raw = RawDeviceDescriptor {
            vendor_id,
            product_id,
            class: 0x00,
            subclass: 0x00,
            protocol: 0x00,
            usb_version: 0x0200,
            device_version: 0x0100,
            max_packet_size: 64,
            num_configurations: 1,
            manufacturer_index: Some(1),
            product_index: Some(2),
            serial_number_index: Some(3),
        };

        let strings = HashMap::from([
            (1, format!("Manufacturer {:04x}", vendor_id)),
            (2, format!("Product {:04x}", product_id)),
            (3, format!("SN-{:03}-{:03}", bus, address)),
        ]);

        Self {
            bus,
            address,
            raw,
            speed: DeviceSpeed::High,
            strings,
            active_configuration: 1,
            configurations: vec![ConfigurationInfo {
                value: 1,
                max_power_ma: 100,
                self_powered: false,
                remote_wakeup: false,
                interfaces: Vec::new(),
            }],
            faults: MockFaults::default(),
        }
    }

    pub fn identity(&self) -> DeviceIdentity {
        DeviceIdentity::new(
            self.raw.vendor_id,
            self.raw.product_id,
            self.bus,
            self.address,
        )
    }

    pub fn with_class(mut self, class: u8, subclass: u8, protocol: u8) -> Self {
        self.raw.class = class;
        self.raw.subclass = subclass;
        self.raw.protocol = protocol;
        self
    }

    /// Drop all string indexes, as a device that declares no strings
    pub fn without_strings(mut self) -> Self {
        self.raw.manufacturer_index = None;
        self.raw.product_index = None;
        self.raw.serial_number_index = None;
        self.strings.clear();
        self
    }

    pub fn with_faults(mut self, faults: MockFaults) -> Self {
        self.faults = faults;
        self
    }
}

#[derive(Debug, Default)]
struct MockState {
    devices: Vec<MockDevice>,
    enumeration_error: Option<MonitorError>,
    enumeration_delay: Duration,
    enumerations: usize,
    string_opens: HashMap<DeviceIdentity, usize>,
}

/// Scriptable USB access layer
#[derive(Debug, Clone, Default)]
pub struct MockBackend {
    state: Arc<Mutex<MockState>>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_devices(devices: Vec<MockDevice>) -> Self {
        let backend = Self::new();
        backend.lock().devices = devices;
        backend
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Attach a device
    pub fn plug(&self, device: MockDevice) {
        self.lock().devices.push(device);
    }

    /// Detach every device with this identity
    pub fn unplug(&self, identity: DeviceIdentity) {
        self.lock().devices.retain(|d| d.identity() != identity);
    }

    /// Fail the next `devices()` call with this error
    pub fn fail_next_enumeration(&self, error: MonitorError) {
        self.lock().enumeration_error = Some(error);
    }

    /// Block every `devices()` call for this long
    pub fn set_enumeration_delay(&self, delay: Duration) {
        self.lock().enumeration_delay = delay;
    }

    /// Number of completed `devices()` calls
    pub fn enumerations(&self) -> usize {
        self.lock().enumerations
    }

    /// Number of times a device was opened for string reads
    pub fn string_opens(&self, identity: DeviceIdentity) -> usize {
        self.lock()
            .string_opens
            .get(&identity)
            .copied()
            .unwrap_or(0)
    }
}

impl UsbBackend for MockBackend {
    type Device = MockDeviceHandle;

    fn devices(&self) -> Result<Vec<MockDeviceHandle>> {
        let delay = self.lock().enumeration_delay;
        if !delay.is_zero() {
            std::thread::sleep(delay);
        }

        let mut state = self.lock();
        state.enumerations += 1;
        if let Some(error) = state.enumeration_error.take() {
            return Err(error);
        }

        Ok(state
            .devices
            .iter()
            .cloned()
            .map(|device| MockDeviceHandle {
                device,
                backend: self.clone(),
            })
            .collect())
    }
}

/// Device returned from a mock enumeration pass
pub struct MockDeviceHandle {
    device: MockDevice,
    backend: MockBackend,
}

impl UsbDeviceSource for MockDeviceHandle {
    fn bus_number(&self) -> u8 {
        self.device.bus
    }

    fn address(&self) -> u8 {
        self.device.address
    }

    fn speed(&self) -> DeviceSpeed {
        self.device.speed
    }

    fn device_descriptor(&self) -> Result<RawDeviceDescriptor> {
        match &self.device.faults.descriptor {
            Some(error) => Err(error.clone()),
            None => Ok(self.device.raw),
        }
    }

    fn active_configuration(&self) -> Result<u8> {
        match &self.device.faults.configuration {
            Some(error) => Err(error.clone()),
            None => Ok(self.device.active_configuration),
        }
    }

    fn configurations(&self, count: u8) -> Result<Vec<ConfigurationInfo>> {
        match &self.device.faults.configuration {
            Some(error) => Err(error.clone()),
            None => Ok(self
                .device
                .configurations
                .iter()
                .take(count as usize)
                .cloned()
                .collect()),
        }
    }

    fn open_strings(&self) -> Result<Box<dyn StringSource + '_>> {
        *self
            .backend
            .lock()
            .string_opens
            .entry(self.device.identity())
            .or_default() += 1;

        match &self.device.faults.open {
            Some(error) => Err(error.clone()),
            None => Ok(Box::new(MockStrings {
                device: &self.device,
            })),
        }
    }
}

struct MockStrings<'a> {
    device: &'a MockDevice,
}

impl StringSource for MockStrings<'_> {
    fn read_string(&self, index: u8) -> Result<String> {
        if let Some(error) = self.device.faults.strings.get(&index) {
            return Err(error.clone());
        }
        self.device
            .strings
            .get(&index)
            .cloned()
            .ok_or_else(|| MonitorError::Usb(format!("no string descriptor at index {}", index)))
    }
}
