//! USB change-detection loop
//!
//! Each cycle enumerates attached devices on the blocking pool, diffs the
//! resulting inventory against the previous one, describes arrivals and hands
//! them to the reporter. The previous inventory is replaced only when a cycle
//! completes, so a failed or timed-out pass leaves it untouched and the next
//! cycle retries against the same baseline.

use crate::config::MonitorSettings;
use crate::display::{arrival_line, departure_line};
use crate::error::{MonitorError, Result};
use crate::reporter::Reporter;
use crate::shutdown::StopSignal;
use crate::usb::{Enumerator, UsbBackend, describe};
use inventory::{DeviceDescriptor, DeviceIdentity, Inventory, diff};
use std::time::{Duration, SystemTime};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Where the loop is in its cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorState {
    Idle,
    Polling,
    Reporting,
    Cancelled,
}

/// Loop timing and reporting options
#[derive(Debug, Clone)]
pub struct MonitorOptions {
    pub poll_interval: Duration,
    /// Upper bound on one enumeration pass
    pub pass_timeout: Duration,
    /// Report devices present at the first cycle as arrivals
    pub report_initial: bool,
    /// Print `[+]` / `[-]` lines to stdout from [`Monitor::run`]
    pub print_status: bool,
}

impl Default for MonitorOptions {
    fn default() -> Self {
        Self::from(&MonitorSettings::default())
    }
}

impl From<&MonitorSettings> for MonitorOptions {
    fn from(settings: &MonitorSettings) -> Self {
        Self {
            poll_interval: settings.poll_interval(),
            pass_timeout: settings.pass_timeout(),
            report_initial: settings.report_initial,
            print_status: true,
        }
    }
}

/// Outcome of one completed cycle
#[derive(Debug, Clone, Default)]
pub struct CycleReport {
    /// Descriptors of newly attached devices, in enumeration order
    pub arrived: Vec<DeviceDescriptor>,
    /// Identities of devices no longer attached
    pub departed: Vec<DeviceIdentity>,
    /// Devices that vanished mid-pass and were left for the next cycle
    pub skipped: usize,
}

impl CycleReport {
    pub fn is_empty(&self) -> bool {
        self.arrived.is_empty() && self.departed.is_empty()
    }
}

/// Result of one enumeration pass, computed on the blocking pool
struct PassOutcome {
    inventory: Inventory,
    arrived: Vec<DeviceDescriptor>,
    departed: Vec<DeviceIdentity>,
    skipped: usize,
}

/// Polls the USB access layer and reports inventory changes
pub struct Monitor<B: UsbBackend> {
    enumerator: Enumerator<B>,
    reporter: Reporter,
    options: MonitorOptions,
    previous: Inventory,
    state: MonitorState,
    cycles: u64,
    /// A pass that exceeded its timeout and is still running
    in_flight: Option<JoinHandle<Result<PassOutcome>>>,
}

impl<B: UsbBackend> Monitor<B> {
    pub fn new(enumerator: Enumerator<B>, reporter: Reporter, options: MonitorOptions) -> Self {
        Self {
            enumerator,
            reporter,
            options,
            previous: Inventory::new(),
            state: MonitorState::Idle,
            cycles: 0,
            in_flight: None,
        }
    }

    pub fn state(&self) -> MonitorState {
        self.state
    }

    /// Inventory as of the last completed cycle
    pub fn inventory(&self) -> &Inventory {
        &self.previous
    }

    /// Number of completed cycles
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    /// Run a single poll cycle
    ///
    /// On error the previous inventory is kept. A pass that timed out keeps
    /// running on the blocking pool; until it finishes, further calls fail
    /// with [`MonitorError::PassTimeout`] instead of starting another pass.
    pub async fn poll_once(&mut self) -> Result<CycleReport> {
        if let Some(handle) = &self.in_flight {
            if !handle.is_finished() {
                debug!("Previous enumeration pass still running, skipping cycle");
                return Err(MonitorError::PassTimeout(self.options.pass_timeout));
            }
            // Its result was computed against a baseline we never adopted
            self.in_flight = None;
        }

        self.state = MonitorState::Polling;
        let seeding = self.cycles == 0 && !self.options.report_initial;

        let enumerator = self.enumerator.clone();
        let previous = self.previous.clone();
        let mut handle =
            tokio::task::spawn_blocking(move || run_pass(&enumerator, &previous, !seeding));

        let waited = tokio::time::timeout(self.options.pass_timeout, &mut handle).await;
        let outcome = match waited {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => Err(MonitorError::Usb(format!("enumeration pass failed: {}", e))),
            Err(_) => {
                self.in_flight = Some(handle);
                Err(MonitorError::PassTimeout(self.options.pass_timeout))
            }
        };

        let outcome = match outcome {
            Ok(outcome) => outcome,
            Err(e) => {
                self.state = MonitorState::Idle;
                return Err(e);
            }
        };

        self.cycles += 1;
        self.previous = outcome.inventory;

        if seeding {
            info!("Tracking {} attached device(s)", self.previous.len());
            self.state = MonitorState::Idle;
            return Ok(CycleReport {
                skipped: outcome.skipped,
                ..Default::default()
            });
        }

        if !outcome.arrived.is_empty() {
            self.state = MonitorState::Reporting;
            info!("{} new USB device(s) detected", outcome.arrived.len());
            if let Err(e) = self.reporter.report(&outcome.arrived) {
                error!("Failed to report arrivals: {}", e);
            }
        }
        if !outcome.departed.is_empty() {
            info!("{} USB device(s) removed", outcome.departed.len());
        }

        self.state = MonitorState::Idle;
        Ok(CycleReport {
            arrived: outcome.arrived,
            departed: outcome.departed,
            skipped: outcome.skipped,
        })
    }

    /// Poll until the stop signal fires or the USB access layer goes away
    pub async fn run(&mut self, mut stop: StopSignal) -> Result<()> {
        info!(
            "Monitoring USB ports every {:?}",
            self.options.poll_interval
        );

        while !stop.is_stopped() {
            let result = tokio::select! {
                biased;
                _ = stop.stopped() => None,
                result = self.poll_once() => Some(result),
            };

            match result {
                None => break,
                Some(Ok(report)) => self.print_report(&report),
                Some(Err(e)) if e.is_fatal() => {
                    error!("Monitoring stopped: {}", e);
                    self.state = MonitorState::Cancelled;
                    return Err(e);
                }
                Some(Err(e)) => warn!("Poll cycle failed, keeping previous inventory: {}", e),
            }

            tokio::select! {
                biased;
                _ = stop.stopped() => break,
                _ = tokio::time::sleep(self.options.poll_interval) => {}
            }
        }

        self.state = MonitorState::Cancelled;
        info!("Stopped monitoring USB ports after {} cycles", self.cycles);
        Ok(())
    }

    fn print_report(&self, report: &CycleReport) {
        if !self.options.print_status {
            return;
        }
        for desc in &report.arrived {
            println!("{}", arrival_line(desc));
        }
        for identity in &report.departed {
            println!("{}", departure_line(identity));
        }
    }
}

/// Enumerate, diff against `previous`, and describe arrivals
fn run_pass<B: UsbBackend>(
    enumerator: &Enumerator<B>,
    previous: &Inventory,
    describe_arrivals: bool,
) -> Result<PassOutcome> {
    let snapshot = enumerator.snapshot()?;
    let current = snapshot.inventory();
    let change = diff(previous, &current);
    let mut skipped = snapshot.skipped();

    if !describe_arrivals {
        return Ok(PassOutcome {
            inventory: current,
            arrived: Vec::new(),
            departed: Vec::new(),
            skipped,
        });
    }

    let observed_at = SystemTime::now();
    let mut arrived = Vec::with_capacity(change.arrived.len());
    let mut vanished = Vec::new();

    for (identity, device) in snapshot.iter() {
        if !change.arrived.contains(identity) {
            continue;
        }
        match describe(device, observed_at) {
            Ok(desc) => arrived.push(desc),
            Err(e) => {
                warn!("Device {} vanished before it could be described: {}", identity, e);
                vanished.push(*identity);
                skipped += 1;
            }
        }
    }

    // Leave vanished arrivals out so a device that is still there gets
    // picked up again next cycle
    let inventory = if vanished.is_empty() {
        current
    } else {
        current
            .iter()
            .filter(|id| !vanished.contains(id))
            .copied()
            .collect()
    };

    Ok(PassOutcome {
        inventory,
        arrived,
        departed: change.departed_sorted(),
        skipped,
    })
}
