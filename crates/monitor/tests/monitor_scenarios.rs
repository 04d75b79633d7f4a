//! End-to-end monitoring loop tests against the mock USB access layer
//!
//! Covers:
//! - Arrival detection and the device log line it produces
//! - Steady state producing no records
//! - Departures never touching the departed device

use common::test_utils::{DEFAULT_TEST_TIMEOUT, with_timeout};
use inventory::DeviceIdentity;
use monitor::usb::{Enumerator, MockBackend, MockDevice, MockFaults};
use monitor::{Monitor, MonitorError, MonitorOptions, ReportConfig, Reporter, stop_channel};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::TempDir;

fn options() -> MonitorOptions {
    MonitorOptions {
        poll_interval: Duration::from_millis(20),
        pass_timeout: Duration::from_secs(2),
        report_initial: true,
        print_status: false,
    }
}

fn log_reporter(dir: &TempDir) -> (Reporter, PathBuf) {
    let path = dir.path().join("devices.jsonl");
    let reporter = Reporter::new(&ReportConfig {
        enabled: true,
        path: path.clone(),
    });
    (reporter, path)
}

fn read_lines(path: &Path) -> Vec<String> {
    match std::fs::read_to_string(path) {
        Ok(content) => content.lines().map(str::to_string).collect(),
        Err(_) => Vec::new(),
    }
}

mod arrivals {
    use super::*;

    #[tokio::test]
    async fn test_new_device_is_reported_and_logged() {
        let dir = TempDir::new().unwrap();
        let (reporter, path) = log_reporter(&dir);
        let backend = MockBackend::new();
        let mut monitor = Monitor::new(Enumerator::new(backend.clone()), reporter.clone(), options());

        let report = monitor.poll_once().await.unwrap();
        assert!(report.is_empty());

        backend.plug(MockDevice::new(0x1234, 0x5678, 1, 2));
        let report = monitor.poll_once().await.unwrap();

        assert_eq!(report.arrived.len(), 1);
        assert!(report.departed.is_empty());
        assert_eq!(
            report.arrived[0].identity(),
            DeviceIdentity::new(0x1234, 0x5678, 1, 2)
        );

        reporter.shutdown().await;
        let lines = read_lines(&path);
        assert_eq!(lines.len(), 1);
        assert!(lines[0].contains("\"0x1234\""));
        assert!(lines[0].contains("\"0x5678\""));

        let record: serde_json::Value = serde_json::from_str(&lines[0]).unwrap();
        assert_eq!(record["bus"], 1);
        assert_eq!(record["address"], 2);
        assert_eq!(record["manufacturer"], "Manufacturer 1234");
        assert_eq!(record["serial_number"], "SN-001-002");
    }

    #[tokio::test]
    async fn test_one_record_per_arrival_in_batch() {
        let dir = TempDir::new().unwrap();
        let (reporter, path) = log_reporter(&dir);
        let backend = MockBackend::with_devices(vec![
            MockDevice::new(0x1234, 0x5678, 1, 2),
            MockDevice::new(0x046d, 0xc52b, 1, 3),
            MockDevice::new(0x0781, 0x5581, 2, 1),
        ]);
        let mut monitor = Monitor::new(Enumerator::new(backend), reporter.clone(), options());

        let report = monitor.poll_once().await.unwrap();
        assert_eq!(report.arrived.len(), 3);

        reporter.shutdown().await;
        let lines = read_lines(&path);
        assert_eq!(lines.len(), 3);
        for line in &lines {
            let value: serde_json::Value = serde_json::from_str(line).unwrap();
            assert!(value.is_object());
        }
    }

    #[tokio::test]
    async fn test_unreadable_strings_are_annotated() {
        let dir = TempDir::new().unwrap();
        let (reporter, path) = log_reporter(&dir);
        let locked = MockDevice::new(0x1234, 0x5678, 1, 2).with_faults(MockFaults {
            open: Some(MonitorError::PermissionOrAccess("Access denied".into())),
            ..Default::default()
        });
        let backend = MockBackend::with_devices(vec![locked]);
        let mut monitor = Monitor::new(Enumerator::new(backend), reporter.clone(), options());

        let report = monitor.poll_once().await.unwrap();
        assert_eq!(report.arrived.len(), 1);
        assert!(report.arrived[0].is_partial());

        reporter.shutdown().await;
        let lines = read_lines(&path);
        let record: serde_json::Value = serde_json::from_str(&lines[0]).unwrap();
        assert!(
            record["manufacturer"]
                .as_str()
                .unwrap()
                .starts_with("Not Accessible")
        );
        assert!(record["unavailable"]["serial_number"].is_string());
        assert_eq!(record["vendor_id"], "0x1234");
    }
}

mod steady_state {
    use super::*;

    #[tokio::test]
    async fn test_unchanged_devices_produce_no_records() {
        let dir = TempDir::new().unwrap();
        let (reporter, path) = log_reporter(&dir);
        let backend = MockBackend::with_devices(vec![MockDevice::new(0x1234, 0x5678, 1, 2)]);
        let mut monitor = Monitor::new(Enumerator::new(backend), reporter.clone(), options());

        let first = monitor.poll_once().await.unwrap();
        assert_eq!(first.arrived.len(), 1);

        let second = monitor.poll_once().await.unwrap();
        assert!(second.is_empty());

        reporter.shutdown().await;
        assert_eq!(read_lines(&path).len(), 1);
    }

    #[tokio::test]
    async fn test_address_reuse_is_departure_plus_arrival() {
        let backend = MockBackend::with_devices(vec![MockDevice::new(0x1234, 0x5678, 1, 2)]);
        let mut monitor = Monitor::new(
            Enumerator::new(backend.clone()),
            Reporter::disabled(),
            options(),
        );
        monitor.poll_once().await.unwrap();

        backend.unplug(DeviceIdentity::new(0x1234, 0x5678, 1, 2));
        backend.plug(MockDevice::new(0x046d, 0xc52b, 1, 2));

        let report = monitor.poll_once().await.unwrap();
        assert_eq!(report.departed, vec![DeviceIdentity::new(0x1234, 0x5678, 1, 2)]);
        assert_eq!(report.arrived.len(), 1);
        assert_eq!(report.arrived[0].vendor_id, 0x046d);
    }
}

mod departures {
    use super::*;

    #[tokio::test]
    async fn test_removed_device_is_not_described() {
        let dir = TempDir::new().unwrap();
        let (reporter, path) = log_reporter(&dir);
        let id = DeviceIdentity::new(0x1234, 0x5678, 1, 2);
        let backend = MockBackend::with_devices(vec![MockDevice::new(0x1234, 0x5678, 1, 2)]);
        let mut monitor = Monitor::new(Enumerator::new(backend.clone()), reporter.clone(), options());

        monitor.poll_once().await.unwrap();
        let opens_before = backend.string_opens(id);
        assert_eq!(opens_before, 1);

        backend.unplug(id);
        let report = monitor.poll_once().await.unwrap();

        assert_eq!(report.departed, vec![id]);
        assert!(report.arrived.is_empty());
        assert_eq!(backend.string_opens(id), opens_before);
        assert!(monitor.inventory().is_empty());

        reporter.shutdown().await;
        assert_eq!(read_lines(&path).len(), 1);
    }
}

mod run_loop {
    use super::*;

    #[tokio::test]
    async fn test_run_picks_up_hotplug_and_stops() {
        let dir = TempDir::new().unwrap();
        let (reporter, path) = log_reporter(&dir);
        let backend = MockBackend::new();
        let mut monitor = Monitor::new(Enumerator::new(backend.clone()), reporter.clone(), options());
        let (stop, signal) = stop_channel();

        let task = tokio::spawn(async move { monitor.run(signal).await });

        tokio::time::sleep(Duration::from_millis(60)).await;
        backend.plug(MockDevice::new(0x1234, 0x5678, 1, 2));
        tokio::time::sleep(Duration::from_millis(150)).await;
        stop.stop();

        with_timeout(DEFAULT_TEST_TIMEOUT, task)
            .await
            .expect("monitor did not stop")
            .unwrap()
            .unwrap();

        reporter.shutdown().await;
        let lines = read_lines(&path);
        assert_eq!(lines.len(), 1);
        assert!(lines[0].contains("\"0x1234\""));
    }
}
