//! Device log reporter
//!
//! Appends one self-contained JSON object per detected device to an
//! append-only log file, one line per object. A single background writer
//! owns the file; [`Reporter`] handles are cheap clones that send batches to
//! it, so any number of monitors can share one log without interleaving.

use crate::config::ReportConfig;
use crate::error::{MonitorError, Result};
use anyhow::Context;
use common::format_iso8601_millis;
use inventory::DeviceDescriptor;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info};

/// One line of the device log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceRecord {
    /// ISO 8601 capture time (UTC)
    pub timestamp: String,
    /// Vendor ID as a hex string, e.g. "0x1234"
    pub vendor_id: String,
    /// Product ID as a hex string
    pub product_id: String,
    pub manufacturer: String,
    pub product: String,
    pub serial_number: String,
    pub bus: u8,
    pub address: u8,
    /// Active configuration value, null when unreadable
    pub configuration: Option<u8>,
    pub device_class: String,
    pub device_subclass: String,
    pub protocol: String,
    /// Field name -> fault, for every field that could not be read
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub unavailable: BTreeMap<String, String>,
}

impl From<&DeviceDescriptor> for DeviceRecord {
    fn from(desc: &DeviceDescriptor) -> Self {
        let unavailable = desc
            .unreadable_fields()
            .into_iter()
            .map(|(field, reason)| (field.to_string(), reason.to_string()))
            .collect();

        Self {
            timestamp: format_iso8601_millis(desc.observed_at),
            vendor_id: format!("{:#x}", desc.vendor_id),
            product_id: format!("{:#x}", desc.product_id),
            manufacturer: desc.manufacturer.to_string(),
            product: desc.product.to_string(),
            serial_number: desc.serial_number.to_string(),
            bus: desc.bus,
            address: desc.address,
            configuration: desc.configuration.as_present().copied(),
            device_class: format!("{:#x}", desc.device_class),
            device_subclass: format!("{:#x}", desc.device_subclass),
            protocol: format!("{:#x}", desc.protocol),
            unavailable,
        }
    }
}

/// Serialize a batch as newline-terminated JSON objects
pub fn encode_batch(records: &[DeviceRecord]) -> serde_json::Result<String> {
    let mut out = String::new();
    for record in records {
        out.push_str(&serde_json::to_string(record)?);
        out.push('\n');
    }
    Ok(out)
}

/// Message sent to the log writer
enum ReportMessage {
    /// Append a batch in one write
    Batch(Vec<DeviceRecord>),
    /// Flush, stop, and acknowledge
    Shutdown(oneshot::Sender<()>),
}

impl std::fmt::Debug for ReportMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReportMessage::Batch(records) => write!(f, "Batch({})", records.len()),
            ReportMessage::Shutdown(_) => f.write_str("Shutdown"),
        }
    }
}

/// Handle for appending device records to the log
#[derive(Debug, Clone)]
pub struct Reporter {
    sender: Option<mpsc::UnboundedSender<ReportMessage>>,
    path: Option<PathBuf>,
}

impl Reporter {
    /// Create a reporter and spawn its writer task
    ///
    /// Must be called from within a Tokio runtime. Returns a disabled
    /// reporter when the config turns reporting off.
    pub fn new(config: &ReportConfig) -> Self {
        if !config.enabled {
            return Self::disabled();
        }

        let path = config.expanded_path();
        let (sender, receiver) = mpsc::unbounded_channel();
        let writer = ReportWriter::new(path.clone());

        tokio::spawn(async move {
            writer.run(receiver).await;
        });

        Self {
            sender: Some(sender),
            path: Some(path),
        }
    }

    /// A reporter that drops every batch
    pub fn disabled() -> Self {
        Self {
            sender: None,
            path: None,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.sender.is_some()
    }

    /// Log file path, if reporting is enabled
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Append one record per descriptor as a single batch
    pub fn report(&self, descriptors: &[DeviceDescriptor]) -> Result<()> {
        if descriptors.is_empty() {
            return Ok(());
        }

        let Some(sender) = &self.sender else {
            debug!("Reporting disabled, dropping {} records", descriptors.len());
            return Ok(());
        };

        let records = descriptors.iter().map(DeviceRecord::from).collect();
        sender
            .send(ReportMessage::Batch(records))
            .map_err(|_| MonitorError::Report("log writer has stopped".to_string()))
    }

    /// Wait until every batch sent so far is written, then stop the writer
    ///
    /// Other clones of this reporter can no longer write afterwards.
    pub async fn shutdown(&self) {
        let Some(sender) = &self.sender else {
            return;
        };

        let (ack_tx, ack_rx) = oneshot::channel();
        if sender.send(ReportMessage::Shutdown(ack_tx)).is_err() {
            return;
        }
        let _ = ack_rx.await;
    }
}

/// Background writer owning the log file
struct ReportWriter {
    path: PathBuf,
    file: Option<BufWriter<File>>,
    records_written: u64,
}

impl ReportWriter {
    fn new(path: PathBuf) -> Self {
        Self {
            path,
            file: None,
            records_written: 0,
        }
    }

    /// Open the log in append mode, creating it if needed
    fn open_file(&mut self) -> anyhow::Result<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create log directory: {:?}", parent))?;
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("Failed to open device log: {:?}", self.path))?;

        self.file = Some(BufWriter::new(file));
        debug!("Opened device log: {:?}", self.path);
        Ok(())
    }

    fn write_batch(&mut self, records: &[DeviceRecord]) -> anyhow::Result<()> {
        if self.file.is_none() {
            self.open_file()?;
        }

        let batch = encode_batch(records).context("Failed to serialize device records")?;

        if let Some(ref mut writer) = self.file {
            let result = writer
                .write_all(batch.as_bytes())
                .and_then(|_| writer.flush());

            if let Err(e) = result {
                // Reopen on the next batch; earlier lines are already on disk
                self.file = None;
                return Err(e).context("Failed to write device log");
            }

            self.records_written += records.len() as u64;
        }

        Ok(())
    }

    /// Flush whatever is buffered, logging a failure instead of dropping it
    fn flush(&mut self) -> bool {
        let Some(ref mut writer) = self.file else {
            return true;
        };
        match writer.flush() {
            Ok(()) => true,
            Err(e) => {
                error!("Failed to flush device log {}: {}", self.path.display(), e);
                self.file = None;
                false
            }
        }
    }

    async fn run(mut self, mut receiver: mpsc::UnboundedReceiver<ReportMessage>) {
        while let Some(message) = receiver.recv().await {
            match message {
                ReportMessage::Batch(records) => match self.write_batch(&records) {
                    Ok(()) => info!(
                        "Saved {} device record(s) to {}",
                        records.len(),
                        self.path.display()
                    ),
                    Err(e) => error!("Failed to append to device log: {:#}", e),
                },
                ReportMessage::Shutdown(ack) => {
                    receiver.close();
                    debug!(
                        "Device log writer stopping after {} records",
                        self.records_written
                    );
                    self.flush();
                    let _ = ack.send(());
                    return;
                }
            }
        }

        self.flush();
    }
}
