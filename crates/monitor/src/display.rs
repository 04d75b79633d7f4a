//! Text rendering for device lists, status lines and detail blocks

use inventory::{
    ConfigurationInfo, DeviceDescriptor, DeviceIdentity, Direction, FieldValue, class_name,
    classify, format_bcd,
};
use std::fmt::Write;

/// Compact form of a string field for one-line output
fn short(field: &FieldValue<String>) -> &str {
    match field {
        FieldValue::Present(value) => value.as_str(),
        FieldValue::Absent => "Unknown",
        FieldValue::Unreadable { .. } => "Not Accessible",
    }
}

/// ` [partial: a, b]` naming every unreadable field, empty when complete
fn partial_marker(desc: &DeviceDescriptor) -> String {
    let names: Vec<&str> = desc
        .unreadable_fields()
        .into_iter()
        .map(|(name, _)| name)
        .collect();
    if names.is_empty() {
        String::new()
    } else {
        format!(" [partial: {}]", names.join(", "))
    }
}

/// One numbered line of the device list
pub fn list_line(number: usize, desc: &DeviceDescriptor) -> String {
    if desc.manufacturer.is_unreadable() && desc.product.is_unreadable() {
        return format!(
            "{}. Unknown Device (VendorID: {:04x}, ProductID: {:04x}){}",
            number,
            desc.vendor_id,
            desc.product_id,
            partial_marker(desc)
        );
    }

    format!(
        "{}. {} - {} (VendorID: {:04x}, ProductID: {:04x}){}",
        number,
        short(&desc.manufacturer),
        short(&desc.product),
        desc.vendor_id,
        desc.product_id,
        partial_marker(desc)
    )
}

/// Status line for a device that appeared
pub fn arrival_line(desc: &DeviceDescriptor) -> String {
    format!(
        "[+] {} {} - {}{}",
        desc.identity(),
        short(&desc.manufacturer),
        short(&desc.product),
        partial_marker(desc)
    )
}

/// Status line for a device that went away
pub fn departure_line(identity: &DeviceIdentity) -> String {
    format!("[-] {}", identity)
}

/// Heading printed above the detail block
pub fn detail_title(desc: &DeviceDescriptor) -> String {
    let name = desc
        .product
        .as_present()
        .map(String::as_str)
        .unwrap_or("Unknown Device");
    format!("Detailed Information for {}:", name)
}

/// Full descriptor detail for one device
pub fn detail_block(desc: &DeviceDescriptor) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "Device ID: {:04x}:{:04x}", desc.vendor_id, desc.product_id);
    let _ = writeln!(out, "Bus {:03} Device {:03}", desc.bus, desc.address);
    let _ = writeln!(out, "Manufacturer: {}", desc.manufacturer);
    let _ = writeln!(out, "Product: {}", desc.product);
    let _ = writeln!(out, "Serial Number: {}", desc.serial_number);
    let _ = writeln!(out, "Device Class: {}", class_name(desc.device_class));
    let _ = writeln!(out, "Device Type: {}", classify(desc));
    let _ = writeln!(out, "Firmware/Product Version: {}", firmware_version(desc));
    let _ = writeln!(out, "USB Version: {}", format_bcd(desc.usb_version));
    let _ = writeln!(out, "Device Version: {}", format_bcd(desc.device_version));
    let _ = writeln!(out, "Device Speed: {}", desc.speed);
    let _ = writeln!(out, "Max Packet Size (EP0): {} bytes", desc.max_packet_size);
    let _ = writeln!(out, "Max Power: {}", max_power(desc));

    match &desc.configurations {
        FieldValue::Present(configs) => {
            for config in configs {
                write_configuration(&mut out, config, desc.configuration.as_present());
            }
        }
        other => {
            let status = match other.unreadable_reason() {
                Some(reason) => format!("Not Accessible: {}", reason),
                None => "Unknown".to_string(),
            };
            let _ = writeln!(out, "\nConfigurations: {}", status);
        }
    }

    let _ = write!(
        out,
        "OS: {} ({})",
        std::env::consts::OS,
        std::env::consts::ARCH
    );
    out
}

/// Product string as the closest thing to a firmware label
fn firmware_version(desc: &DeviceDescriptor) -> String {
    match &desc.product {
        FieldValue::Absent => "Not Available".to_string(),
        other => other.to_string(),
    }
}

fn max_power(desc: &DeviceDescriptor) -> String {
    let active = desc.configuration.as_present();
    desc.configurations
        .as_present()
        .and_then(|configs| {
            configs
                .iter()
                .find(|c| Some(&c.value) == active)
                .or_else(|| configs.first())
        })
        .map(|c| format!("{}mA", c.max_power_ma))
        .unwrap_or_else(|| "Unknown".to_string())
}

fn write_configuration(out: &mut String, config: &ConfigurationInfo, active: Option<&u8>) {
    let marker = if Some(&config.value) == active {
        " (active)"
    } else {
        ""
    };
    let mut numbers: Vec<u8> = config.interfaces.iter().map(|i| i.number).collect();
    numbers.dedup();

    let _ = writeln!(out, "\nConfiguration {}{}:", config.value, marker);
    let _ = writeln!(out, "  Max Power: {}mA", config.max_power_ma);
    let _ = writeln!(
        out,
        "  Attributes: {}{}",
        if config.self_powered {
            "Self Powered"
        } else {
            "Bus Powered"
        },
        if config.remote_wakeup {
            ", Remote Wakeup"
        } else {
            ""
        }
    );
    let _ = writeln!(out, "  Number of Interfaces: {}", numbers.len());

    for intf in &config.interfaces {
        if intf.alternate_setting == 0 {
            let _ = writeln!(out, "    Interface {}:", intf.number);
        } else {
            let _ = writeln!(
                out,
                "    Interface {} (alternate {}):",
                intf.number, intf.alternate_setting
            );
        }
        let _ = writeln!(out, "      Class: {}", class_name(intf.class));
        let _ = writeln!(out, "      Subclass: 0x{:02x}", intf.subclass);
        let _ = writeln!(out, "      Protocol: 0x{:02x}", intf.protocol);

        for ep in &intf.endpoints {
            let direction = match ep.direction {
                Direction::In => "IN",
                Direction::Out => "OUT",
            };
            let _ = writeln!(out, "      Endpoint Address: 0x{:02x} ({})", ep.address, direction);
            let _ = writeln!(out, "      Max Packet Size: {} bytes", ep.max_packet_size);
            let _ = writeln!(out, "      Endpoint Type: {}", ep.transfer_type);
        }
    }
}
