//! USB device monitor
//!
//! Polls the USB access layer on a fixed interval, diffs the attached-device
//! inventory against the previous poll, prints arrivals and departures, and
//! appends one JSON record per arrived device to a device log. Also provides
//! one-shot listing and an interactive inspection mode.

pub mod config;
pub mod display;
pub mod error;
pub mod interactive;
pub mod monitor;
pub mod reporter;
pub mod shutdown;
pub mod usb;

pub use config::{MonitorConfig, MonitorSettings, ReportConfig};
pub use error::{MonitorError, Result};
pub use interactive::{Selection, SelectionOutcome, parse_selection, run_selection};
pub use monitor::{CycleReport, Monitor, MonitorOptions, MonitorState};
pub use reporter::{DeviceRecord, Reporter};
pub use shutdown::{StopHandle, StopSignal, stop_channel, stop_on_signal};
