//! Interactive inspection tests
//!
//! Drives the list / select / detail exchange with in-memory input and
//! output buffers.

use common::test_utils::{create_mock_descriptor, create_mock_hid_descriptor};
use inventory::{DeviceDescriptor, DeviceIdentity};
use monitor::usb::{Enumerator, MockBackend, MockDevice};
use monitor::{MonitorError, SelectionOutcome, run_selection};
use std::io::Cursor;

fn run(
    devices: &[DeviceDescriptor],
    input: &str,
) -> (Result<SelectionOutcome, MonitorError>, String) {
    let mut output = Vec::new();
    let result = run_selection(devices, Cursor::new(input.as_bytes()), &mut output);
    (result, String::from_utf8(output).unwrap())
}

fn two_devices() -> Vec<DeviceDescriptor> {
    vec![
        create_mock_descriptor(0x1234, 0x5678, 1, 2),
        create_mock_hid_descriptor(1, 3),
    ]
}

#[test]
fn test_zero_exits_cleanly() {
    let (result, output) = run(&two_devices(), "0\n");

    let outcome = result.unwrap();
    assert_eq!(outcome, SelectionOutcome::Exited);
    assert_eq!(outcome.exit_code(), 0);
    assert!(output.contains("Connected USB Devices:"));
    assert!(output.contains("1. Test Manufacturer 1234 - Test Product 5678"));
    assert!(output.trim_end().ends_with("Exiting..."));
}

#[test]
fn test_non_numeric_input_fails() {
    let (result, output) = run(&two_devices(), "abc\n");

    assert!(matches!(result, Err(MonitorError::MalformedInput(_))));
    assert!(output.contains("Please enter a valid number."));
}

#[test]
fn test_out_of_range_selection_fails() {
    let (result, output) = run(&two_devices(), "3\n");

    assert!(matches!(result, Err(MonitorError::MalformedInput(_))));
    assert!(output.contains("Invalid selection."));
    assert!(!output.contains("Detailed Information"));
}

#[test]
fn test_oversized_number_is_out_of_range() {
    let (result, output) = run(&two_devices(), "99999999999999999999\n");

    assert!(matches!(result, Err(MonitorError::MalformedInput(_))));
    assert!(output.contains("Invalid selection."));
    assert!(!output.contains("Please enter a valid number."));
}

#[test]
fn test_valid_selection_prints_detail() {
    let (result, output) = run(&two_devices(), "2\n");

    assert_eq!(
        result.unwrap(),
        SelectionOutcome::Shown(DeviceIdentity::new(0x046d, 0xc52b, 1, 3))
    );
    assert!(output.contains("Detailed Information for Test Product c52b:"));
    assert!(output.contains("Device ID: 046d:c52b"));
    assert!(output.contains("Device Type: HID (e.g., Keyboard, Mouse, or Dongle)"));
    assert!(output.contains("Firmware/Product Version: Test Product c52b"));
    assert!(output.contains("Endpoint Type: Interrupt"));
    assert!(output.contains("OS: "));
}

#[test]
fn test_no_devices() {
    let (result, output) = run(&[], "1\n");

    let outcome = result.unwrap();
    assert_eq!(outcome, SelectionOutcome::NoDevices);
    assert_eq!(outcome.exit_code(), 1);
    assert!(output.contains("No USB devices found."));
    assert!(!output.contains("Select a device"));
}

#[test]
fn test_selection_over_mock_enumeration() {
    let backend = MockBackend::with_devices(vec![
        MockDevice::new(0x1234, 0x5678, 1, 2),
        MockDevice::new(0x0781, 0x5581, 2, 1).without_strings(),
    ]);
    let devices = Enumerator::new(backend).describe_all().unwrap();

    let (result, output) = run(&devices, "2\n");
    assert!(result.is_ok());
    assert!(output.contains("2. Unknown - Unknown (VendorID: 0781, ProductID: 5581)"));
    assert!(output.contains("Detailed Information for Unknown Device:"));
    assert!(output.contains("Serial Number: Unknown"));
}
