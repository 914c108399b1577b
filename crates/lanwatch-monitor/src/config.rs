//! Configuration for the lanwatch presence monitor.

use std::net::IpAddr;
use std::path::PathBuf;
use std::time::Duration;

use ipnet::IpNet;
use lanwatch_core::AddressKind;
use serde::Deserialize;

use crate::error::{MonitorError, Result};
use crate::normalize::IdentityPolicy;

/// Top-level monitor configuration.
///
/// Loaded from the `[watch]` section of `lanwatch.toml` or
/// `LANWATCH__WATCH__` environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct WatchConfig {
    /// Network range to sweep (CIDR notation or a single address).
    #[serde(default = "default_target")]
    pub target: String,

    /// Seconds to wait after a cycle completes before the next one starts.
    #[serde(default = "default_interval")]
    pub interval_secs: u64,

    /// Where nmap writes its XML report.
    #[serde(default = "default_output_path")]
    pub output_path: PathBuf,

    /// Path to the nmap binary (default: "nmap").
    #[serde(default = "default_nmap_path")]
    pub nmap_path: String,

    /// Kill the scan if it runs longer than this.
    #[serde(default = "default_scan_timeout")]
    pub scan_timeout_secs: u64,

    /// Desktop notification command (default: "notify-send").
    #[serde(default = "default_notify_command")]
    pub notify_command: String,

    /// Auto-dismiss delay for desktop notifications.
    #[serde(default = "default_notification_timeout")]
    pub notification_timeout_ms: u64,

    /// What a failed scan does to the known hosts.
    #[serde(default)]
    pub failure_policy: FailurePolicy,

    /// Address family a host must report to be tracked.
    #[serde(default = "default_primary_address")]
    pub primary_address: AddressKind,

    /// Address family attached to the identity when present.
    #[serde(default = "default_secondary_address")]
    pub secondary_address: AddressKind,
}

/// Handling of a cycle whose scan failed.
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Treat the failed scan as an empty report: diff, notify and commit it.
    #[default]
    CommitEmpty,
    /// Skip diff and notification, keep the previous hosts.
    RetainPrevious,
}

impl WatchConfig {
    /// Reject settings the monitor cannot run with.
    pub fn validate(&self) -> Result<()> {
        let target = self.target.trim();
        if target.parse::<IpNet>().is_err() && target.parse::<IpAddr>().is_err() {
            return Err(MonitorError::Config(format!(
                "Invalid target: {target}. Expected CIDR (10.0.1.0/24) or an address"
            )));
        }
        if self.interval_secs == 0 {
            return Err(MonitorError::Config(
                "interval_secs must be greater than zero".to_string(),
            ));
        }
        if self.scan_timeout_secs == 0 {
            return Err(MonitorError::Config(
                "scan_timeout_secs must be greater than zero".to_string(),
            ));
        }
        if self.primary_address == self.secondary_address {
            return Err(MonitorError::Config(format!(
                "primary_address and secondary_address are both {}",
                self.primary_address
            )));
        }
        Ok(())
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn scan_timeout(&self) -> Duration {
        Duration::from_secs(self.scan_timeout_secs)
    }

    pub fn notification_timeout(&self) -> Duration {
        Duration::from_millis(self.notification_timeout_ms)
    }

    pub fn identity_policy(&self) -> IdentityPolicy {
        IdentityPolicy {
            primary: self.primary_address,
            secondary: self.secondary_address,
        }
    }
}

/// Load the `[watch]` section from `<file_prefix>.toml` (optional) layered
/// under `LANWATCH__` environment variables. A missing section yields the
/// defaults.
pub fn load_watch_config(file_prefix: &str) -> Result<WatchConfig> {
    let cfg = config::Config::builder()
        .add_source(config::File::with_name(file_prefix).required(false))
        .add_source(
            config::Environment::with_prefix("LANWATCH")
                .separator("__")
                .try_parsing(true),
        )
        .build()
        .map_err(|e| MonitorError::Config(e.to_string()))?;

    match cfg.get::<WatchConfig>("watch") {
        Ok(c) => Ok(c),
        Err(config::ConfigError::NotFound(_)) => Ok(WatchConfig::default()),
        Err(e) => Err(MonitorError::Config(e.to_string())),
    }
}

fn default_target() -> String {
    "192.168.1.0/24".to_string()
}

fn default_interval() -> u64 {
    60
}

fn default_output_path() -> PathBuf {
    std::env::temp_dir().join("lanwatch-scan.xml")
}

fn default_nmap_path() -> String {
    "nmap".to_string()
}

fn default_scan_timeout() -> u64 {
    120
}

fn default_notify_command() -> String {
    "notify-send".to_string()
}

fn default_notification_timeout() -> u64 {
    5000
}

fn default_primary_address() -> AddressKind {
    AddressKind::Ipv4
}

fn default_secondary_address() -> AddressKind {
    AddressKind::Mac
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            target: default_target(),
            interval_secs: default_interval(),
            output_path: default_output_path(),
            nmap_path: default_nmap_path(),
            scan_timeout_secs: default_scan_timeout(),
            notify_command: default_notify_command(),
            notification_timeout_ms: default_notification_timeout(),
            failure_policy: FailurePolicy::default(),
            primary_address: default_primary_address(),
            secondary_address: default_secondary_address(),
        }
    }
}
