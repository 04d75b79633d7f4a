//! Monitor configuration management

use anyhow::{Context, Result, anyhow};
use inventory::{DeviceFilter, parse_filters};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MonitorConfig {
    #[serde(default)]
    pub monitor: MonitorSettings,
    /// Device log configuration
    #[serde(default)]
    pub report: ReportConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorSettings {
    #[serde(default = "MonitorSettings::default_log_level")]
    pub log_level: String,
    /// Delay between enumeration passes
    #[serde(default = "MonitorSettings::default_poll_interval")]
    pub poll_interval_ms: u64,
    /// Upper bound on a single enumeration pass
    #[serde(default = "MonitorSettings::default_pass_timeout")]
    pub pass_timeout_ms: u64,
    /// Timeout for each string descriptor request
    #[serde(default = "MonitorSettings::default_string_timeout")]
    pub string_timeout_ms: u64,
    /// Ignore Linux Foundation root hubs (0x1d6b, class 9)
    #[serde(default)]
    pub skip_root_hubs: bool,
    /// Report devices already attached at startup as arrivals
    #[serde(default = "MonitorSettings::default_report_initial")]
    pub report_initial: bool,
    /// Only track devices matching one of these VID:PID patterns
    #[serde(default)]
    pub filters: Vec<String>,
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            log_level: Self::default_log_level(),
            poll_interval_ms: Self::default_poll_interval(),
            pass_timeout_ms: Self::default_pass_timeout(),
            string_timeout_ms: Self::default_string_timeout(),
            skip_root_hubs: false,
            report_initial: Self::default_report_initial(),
            filters: Vec::new(),
        }
    }
}

impl MonitorSettings {
    fn default_log_level() -> String {
        "info".to_string()
    }

    fn default_poll_interval() -> u64 {
        1000
    }

    fn default_pass_timeout() -> u64 {
        5000
    }

    fn default_string_timeout() -> u64 {
        200
    }

    fn default_report_initial() -> bool {
        true
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn pass_timeout(&self) -> Duration {
        Duration::from_millis(self.pass_timeout_ms)
    }

    pub fn string_timeout(&self) -> Duration {
        Duration::from_millis(self.string_timeout_ms)
    }

    /// Parsed VID:PID filters
    pub fn device_filters(&self) -> Result<Vec<DeviceFilter>> {
        parse_filters(&self.filters).map_err(|e| anyhow!("Invalid device filter: {}", e))
    }
}

/// Device log configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Append device records to the log
    #[serde(default = "ReportConfig::default_enabled")]
    pub enabled: bool,
    /// Path to the device log (`~` is expanded)
    #[serde(default = "ReportConfig::default_path")]
    pub path: PathBuf,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            enabled: Self::default_enabled(),
            path: Self::default_path(),
        }
    }
}

impl ReportConfig {
    fn default_enabled() -> bool {
        true
    }

    fn default_path() -> PathBuf {
        if let Some(data_dir) = dirs::data_local_dir() {
            data_dir.join("usb-watch").join("devices.jsonl")
        } else {
            PathBuf::from("usb_devices.jsonl")
        }
    }

    /// Log path with a leading `~` expanded
    pub fn expanded_path(&self) -> PathBuf {
        let raw = self.path.to_string_lossy();
        PathBuf::from(shellexpand::tilde(&raw).into_owned())
    }
}

impl MonitorConfig {
    /// Load configuration from the specified path
    pub fn load(path: Option<PathBuf>) -> Result<Self> {
        let config_path = if let Some(p) = path {
            PathBuf::from(shellexpand::tilde(&p.to_string_lossy()).into_owned())
        } else {
            // Try standard locations in order
            let candidates = vec![
                Self::default_path(),
                PathBuf::from("/etc/usb-watch/monitor.toml"),
            ];

            candidates
                .into_iter()
                .find(|p| p.exists())
                .ok_or_else(|| anyhow!("No configuration file found"))?
        };

        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;

        let config: MonitorConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", config_path.display()))?;

        config.validate()?;

        tracing::info!("Loaded configuration from: {}", config_path.display());
        Ok(config)
    }

    /// Load configuration or return defaults if not found
    pub fn load_or_default() -> Self {
        match Self::load(None) {
            Ok(config) => config,
            Err(e) => {
                tracing::debug!("Failed to load config: {}, using defaults", e);
                Self::default()
            }
        }
    }

    /// Save configuration to the specified path
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize configuration")?;

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        tracing::info!("Saved configuration to: {}", path.display());
        Ok(())
    }

    /// Get the default configuration file path
    pub fn default_path() -> PathBuf {
        if let Some(config_dir) = dirs::config_dir() {
            config_dir.join("usb-watch").join("monitor.toml")
        } else {
            PathBuf::from(".config/usb-watch/monitor.toml")
        }
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.monitor.log_level.as_str()) {
            return Err(anyhow!(
                "Invalid log level '{}', must be one of: {}",
                self.monitor.log_level,
                valid_levels.join(", ")
            ));
        }

        for (name, value) in [
            ("poll_interval_ms", self.monitor.poll_interval_ms),
            ("pass_timeout_ms", self.monitor.pass_timeout_ms),
            ("string_timeout_ms", self.monitor.string_timeout_ms),
        ] {
            if value == 0 {
                return Err(anyhow!("Invalid {} '0', must be greater than 0", name));
            }
        }

        self.monitor.device_filters()?;

        if self.report.enabled && self.report.path.as_os_str().is_empty() {
            return Err(anyhow!("Report path must not be empty when reporting is enabled"));
        }

        Ok(())
    }
}
