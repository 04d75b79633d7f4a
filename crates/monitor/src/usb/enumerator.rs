//! Device enumeration and descriptor decoding
//!
//! Runs on the blocking pool. One call to [`Enumerator::snapshot`] is one
//! pass over the USB access layer; [`describe`] turns a device from that pass
//! into a [`DeviceDescriptor`] without failing on missing or unreadable
//! string descriptors.

use crate::error::{MonitorError, Result};
use crate::usb::backend::{StringSource, UsbBackend, UsbDeviceSource};
use inventory::{
    DeviceDescriptor, DeviceFilter, DeviceIdentity, FieldValue, Inventory, RawDeviceDescriptor,
    is_allowed,
};
use std::sync::Arc;
use std::time::SystemTime;
use tracing::{debug, warn};

/// Linux Foundation root hubs
const ROOT_HUB_VENDOR_ID: u16 = 0x1d6b;
const HUB_CLASS: u8 = 0x09;

/// Devices seen in one enumeration pass, in host-controller order
pub struct Snapshot<D> {
    devices: Vec<(DeviceIdentity, D)>,
    /// Devices that vanished before their descriptor could be read
    skipped: usize,
}

impl<D: UsbDeviceSource> Snapshot<D> {
    pub fn inventory(&self) -> Inventory {
        self.devices.iter().map(|(id, _)| *id).collect()
    }

    pub fn identities(&self) -> impl Iterator<Item = &DeviceIdentity> {
        self.devices.iter().map(|(id, _)| id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&DeviceIdentity, &D)> {
        self.devices.iter().map(|(id, device)| (id, device))
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    pub fn skipped(&self) -> usize {
        self.skipped
    }
}

/// Enumerates attached devices through a USB access layer
pub struct Enumerator<B: UsbBackend> {
    backend: Arc<B>,
    filters: Vec<DeviceFilter>,
    skip_root_hubs: bool,
}

impl<B: UsbBackend> Clone for Enumerator<B> {
    fn clone(&self) -> Self {
        Self {
            backend: Arc::clone(&self.backend),
            filters: self.filters.clone(),
            skip_root_hubs: self.skip_root_hubs,
        }
    }
}

impl<B: UsbBackend> Enumerator<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend: Arc::new(backend),
            filters: Vec::new(),
            skip_root_hubs: false,
        }
    }

    /// Track only devices matching one of these filters (empty = all)
    pub fn with_filters(mut self, filters: Vec<DeviceFilter>) -> Self {
        self.filters = filters;
        self
    }

    pub fn with_skip_root_hubs(mut self, skip: bool) -> Self {
        self.skip_root_hubs = skip;
        self
    }

    /// Enumerate every attached device and compute its identity
    ///
    /// A device whose descriptor cannot be read is skipped for this pass;
    /// only a failure of the enumeration call itself is returned.
    pub fn snapshot(&self) -> Result<Snapshot<B::Device>> {
        let mut devices = Vec::new();
        let mut skipped = 0;

        for device in self.backend.devices()? {
            let raw = match device.device_descriptor() {
                Ok(raw) => raw,
                Err(e) => {
                    warn!(
                        "Skipping device on bus={} addr={}: {}",
                        device.bus_number(),
                        device.address(),
                        e
                    );
                    skipped += 1;
                    continue;
                }
            };

            if !is_allowed(&self.filters, raw.vendor_id, raw.product_id) {
                debug!(
                    "Device ignored by filter: bus={}, addr={}, vid={:#06x}, pid={:#06x}",
                    device.bus_number(),
                    device.address(),
                    raw.vendor_id,
                    raw.product_id
                );
                continue;
            }

            if self.skip_root_hubs && is_root_hub(&raw) {
                debug!(
                    "Skipping root hub: bus={}, addr={}, pid={:#06x}",
                    device.bus_number(),
                    device.address(),
                    raw.product_id
                );
                continue;
            }

            let identity = DeviceIdentity::new(
                raw.vendor_id,
                raw.product_id,
                device.bus_number(),
                device.address(),
            );
            devices.push((identity, device));
        }

        debug!("Enumerated {} devices ({} skipped)", devices.len(), skipped);
        Ok(Snapshot { devices, skipped })
    }

    /// Enumerate and describe every attached device
    ///
    /// Devices that vanish while being described are left out.
    pub fn describe_all(&self) -> Result<Vec<DeviceDescriptor>> {
        let snapshot = self.snapshot()?;
        let observed_at = SystemTime::now();

        Ok(snapshot
            .iter()
            .filter_map(|(id, device)| match describe(device, observed_at) {
                Ok(descriptor) => Some(descriptor),
                Err(e) => {
                    warn!("Could not describe {}: {}", id, e);
                    None
                }
            })
            .collect())
    }
}

fn is_root_hub(raw: &RawDeviceDescriptor) -> bool {
    raw.vendor_id == ROOT_HUB_VENDOR_ID && raw.class == HUB_CLASS
}

/// Decode the full descriptor of one device
///
/// String and configuration faults are folded into the affected fields.
/// Only a failed device descriptor read is an error, meaning the device is
/// gone and should be skipped for this cycle.
pub fn describe<D: UsbDeviceSource>(
    device: &D,
    observed_at: SystemTime,
) -> Result<DeviceDescriptor> {
    let raw = device.device_descriptor().map_err(|e| match e {
        MonitorError::PermissionOrAccess(_) | MonitorError::TransientDevice(_) => e,
        other => MonitorError::TransientDevice(other.to_string()),
    })?;

    let (manufacturer, product, serial_number) = read_strings(device, &raw);

    let configuration = FieldValue::from(device.active_configuration());
    let configurations = FieldValue::from(device.configurations(raw.num_configurations));

    let descriptor = DeviceDescriptor {
        vendor_id: raw.vendor_id,
        product_id: raw.product_id,
        bus: device.bus_number(),
        address: device.address(),
        manufacturer,
        product,
        serial_number,
        device_class: raw.class,
        device_subclass: raw.subclass,
        protocol: raw.protocol,
        configuration,
        usb_version: raw.usb_version,
        device_version: raw.device_version,
        speed: device.speed(),
        max_packet_size: raw.max_packet_size,
        configurations,
        observed_at,
    };

    if descriptor.is_partial() {
        debug!(
            "Partial descriptor for {}: {:?}",
            descriptor.identity(),
            descriptor.unreadable_fields()
        );
    }

    Ok(descriptor)
}

type StringFields = (FieldValue<String>, FieldValue<String>, FieldValue<String>);

fn read_strings<D: UsbDeviceSource>(device: &D, raw: &RawDeviceDescriptor) -> StringFields {
    let indexes = [
        raw.manufacturer_index,
        raw.product_index,
        raw.serial_number_index,
    ];

    // Skip opening the device when it declares no strings at all
    if indexes.iter().all(Option::is_none) {
        return (FieldValue::Absent, FieldValue::Absent, FieldValue::Absent);
    }

    match device.open_strings() {
        Ok(source) => {
            let [manufacturer, product, serial_number] =
                indexes.map(|index| read_string(source.as_ref(), index));
            (manufacturer, product, serial_number)
        }
        Err(e) => {
            let field = |index: Option<u8>| match index {
                Some(_) => FieldValue::unreadable(&e),
                None => FieldValue::Absent,
            };
            (
                field(raw.manufacturer_index),
                field(raw.product_index),
                field(raw.serial_number_index),
            )
        }
    }
}

fn read_string(source: &dyn StringSource, index: Option<u8>) -> FieldValue<String> {
    match index {
        None => FieldValue::Absent,
        Some(index) => match source.read_string(index) {
            Ok(value) if value.is_empty() => FieldValue::Absent,
            Ok(value) => FieldValue::Present(value),
            Err(e) => FieldValue::unreadable(e),
        },
    }
}
