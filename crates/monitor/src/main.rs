//! usb-watch
//!
//! Watches USB ports for device arrivals and departures and records every
//! newly attached device to an append-only JSON Lines log.

use anyhow::{Context, Result, anyhow};
use clap::Parser;
use common::setup_logging;
use monitor::display::list_line;
use monitor::usb::{Enumerator, RusbBackend};
use monitor::{
    Monitor, MonitorConfig, MonitorError, MonitorOptions, Reporter, run_selection, stop_channel,
    stop_on_signal,
};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "usb-watch")]
#[command(
    author,
    version,
    about = "Watch USB ports and log newly attached devices"
)]
#[command(long_about = "
Polls the attached USB devices on a fixed interval, prints arrivals and
departures, and appends one JSON record per new device to a device log.

EXAMPLES:
    # Watch with default config
    usb-watch

    # Poll every 250 ms and log to a custom file
    usb-watch --interval-ms 250 --log-file ~/usb.jsonl

    # List USB devices and exit
    usb-watch --list-devices

    # Pick a device and show its full descriptor
    usb-watch --inspect

CONFIGURATION:
    usb-watch looks for configuration files in the following order:
    1. Path specified with --config
    2. ~/.config/usb-watch/monitor.toml
    3. /etc/usb-watch/monitor.toml
    4. Built-in defaults
")]
struct Args {
    /// Path to configuration file
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Save default configuration (to --config or the default location) and exit
    #[arg(long)]
    save_config: bool,

    /// List USB devices and exit
    #[arg(long, conflicts_with = "inspect")]
    list_devices: bool,

    /// Select a device interactively and print its descriptor detail
    #[arg(long)]
    inspect: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, value_name = "LEVEL")]
    log_level: Option<String>,

    /// Poll interval in milliseconds
    #[arg(long, value_name = "MS")]
    interval_ms: Option<u64>,

    /// Device log path
    #[arg(long, value_name = "PATH")]
    log_file: Option<PathBuf>,

    /// Do not write the device log
    #[arg(long)]
    no_report: bool,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let args = Args::parse();

    if args.save_config {
        let config = MonitorConfig::default();
        let path = args.config.clone().unwrap_or_else(MonitorConfig::default_path);
        config.save(&path).context("Failed to save configuration")?;
        println!("Configuration saved to: {}", path.display());
        return Ok(ExitCode::SUCCESS);
    }

    let mut config = if let Some(ref path) = args.config {
        MonitorConfig::load(Some(path.clone())).context("Failed to load configuration")?
    } else {
        MonitorConfig::load_or_default()
    };

    if let Some(interval) = args.interval_ms {
        config.monitor.poll_interval_ms = interval;
    }
    if let Some(ref path) = args.log_file {
        config.report.path = path.clone();
    }
    if args.no_report {
        config.report.enabled = false;
    }
    if let Some(ref level) = args.log_level {
        config.monitor.log_level = level.clone();
    }
    config.validate().context("Invalid configuration")?;

    setup_logging(&config.monitor.log_level).context("Failed to setup logging")?;

    info!("usb-watch v{}", env!("CARGO_PKG_VERSION"));
    info!("Log level: {}", config.monitor.log_level);

    let backend = RusbBackend::new(config.monitor.string_timeout())
        .context("Failed to initialize USB access")?;
    let enumerator = Enumerator::new(backend)
        .with_filters(config.monitor.device_filters()?)
        .with_skip_root_hubs(config.monitor.skip_root_hubs);

    if args.list_devices {
        list_devices_mode(enumerator).await?;
        return Ok(ExitCode::SUCCESS);
    }

    if args.inspect {
        return inspect_mode(enumerator).await;
    }

    watch_mode(config, enumerator).await?;
    Ok(ExitCode::SUCCESS)
}

/// List USB devices and exit
async fn list_devices_mode(enumerator: Enumerator<RusbBackend>) -> Result<()> {
    info!("Listing USB devices...");

    let devices = tokio::task::spawn_blocking(move || enumerator.describe_all())
        .await
        .context("Device listing task failed")?
        .context("Failed to enumerate USB devices")?;

    if devices.is_empty() {
        println!("No USB devices found.");
        return Ok(());
    }

    println!("Found {} USB device(s):\n", devices.len());
    for (i, device) in devices.iter().enumerate() {
        println!("  {}", list_line(i + 1, device));
        println!(
            "      Bus {:03} Device {:03} Speed: {}",
            device.bus, device.address, device.speed
        );
        if let Some(serial) = device.serial_number.as_present() {
            println!("      Serial: {}", serial);
        }
    }

    Ok(())
}

/// Interactive selection over stdin / stdout
async fn inspect_mode(enumerator: Enumerator<RusbBackend>) -> Result<ExitCode> {
    let result = tokio::task::spawn_blocking(move || {
        let devices = enumerator.describe_all()?;
        let stdin = std::io::stdin();
        let stdout = std::io::stdout();
        run_selection(&devices, stdin.lock(), stdout.lock())
    })
    .await
    .context("Inspection task failed")?;

    match result {
        Ok(outcome) => Ok(ExitCode::from(outcome.exit_code())),
        // Already printed to the user
        Err(MonitorError::MalformedInput(_)) => Ok(ExitCode::FAILURE),
        Err(e) if e.is_fatal() => Err(anyhow!(e)),
        Err(e) => {
            println!("Error: {}", e);
            Ok(ExitCode::FAILURE)
        }
    }
}

/// Watch for arrivals and departures until Ctrl+C
async fn watch_mode(config: MonitorConfig, enumerator: Enumerator<RusbBackend>) -> Result<()> {
    let reporter = Reporter::new(&config.report);
    let mut monitor = Monitor::new(
        enumerator,
        reporter.clone(),
        MonitorOptions::from(&config.monitor),
    );

    let (stop, signal) = stop_channel();
    let signal_task = stop_on_signal(stop);

    println!("Monitoring USB ports... Press Ctrl+C to stop.");
    if let Some(path) = reporter.path() {
        println!("New devices are logged to {}", path.display());
    }

    let result = monitor.run(signal).await;

    // Drain pending records before exiting
    reporter.shutdown().await;
    signal_task.abort();

    match result {
        Ok(()) => {
            println!("Stopped monitoring USB ports.");
            Ok(())
        }
        Err(e) => {
            error!("Monitor error: {}", e);
            Err(anyhow!(e)).context("USB monitoring failed")
        }
    }
}
