//! Error types for the lanwatch-monitor crate.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum MonitorError {
    #[error("Nmap not found at path: {path}")]
    NmapNotFound { path: String },

    #[error("Failed to start nmap at {path}: {source}")]
    ScanSpawn {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Nmap exited with code {code}: {stderr}")]
    ScanFailed { code: i32, stderr: String },

    #[error("Nmap did not finish within {secs}s")]
    ScanTimeout { secs: u64 },

    #[error("Failed to read scan report {path}: {source}")]
    ReportRead {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse nmap XML output: {0}")]
    XmlParse(String),

    #[error("Notification via {command} failed: {reason}")]
    Notify { command: String, reason: String },

    #[error("Config error: {0}")]
    Config(String),
}

impl MonitorError {
    /// Whether this error came from a cycle's scan step (invocation or
    /// output). `NmapNotFound` is a startup error from the installation
    /// check and is not counted.
    pub fn is_scan_failure(&self) -> bool {
        matches!(
            self,
            Self::ScanSpawn { .. }
                | Self::ScanFailed { .. }
                | Self::ScanTimeout { .. }
                | Self::ReportRead { .. }
                | Self::XmlParse(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, MonitorError>;
