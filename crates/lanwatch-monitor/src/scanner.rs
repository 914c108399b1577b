//! Nmap process wrapper.
//!
//! Executes an nmap ping sweep as a child process via
//! `tokio::process::Command`, writing the XML report to the configured
//! output path, then reads and parses that report.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use tokio::process::Command;

use crate::config::WatchConfig;
use crate::error::{MonitorError, Result};
use crate::nmap_xml::{self, NmapRun};

/// Something that can sweep a target and return the raw report.
pub trait Scanner {
    fn scan(&self, target: &str) -> impl Future<Output = Result<NmapRun>> + Send;
}

/// Wrapper around the nmap binary.
pub struct NmapScanner {
    nmap_path: String,
    output_path: PathBuf,
    timeout: Duration,
}

impl NmapScanner {
    pub fn new(nmap_path: &str, output_path: &Path, timeout: Duration) -> Self {
        Self {
            nmap_path: nmap_path.to_string(),
            output_path: output_path.to_path_buf(),
            timeout,
        }
    }

    pub fn from_config(config: &WatchConfig) -> Self {
        Self::new(
            &config.nmap_path,
            &config.output_path,
            config.scan_timeout(),
        )
    }

    pub fn output_path(&self) -> &Path {
        &self.output_path
    }

    /// Verify nmap is installed and accessible.
    pub async fn verify_installation(&self) -> Result<String> {
        let output = Command::new(&self.nmap_path)
            .arg("--version")
            .output()
            .await
            .map_err(|_| MonitorError::NmapNotFound {
                path: self.nmap_path.clone(),
            })?;

        String::from_utf8(output.stdout).map_err(|e| MonitorError::XmlParse(e.to_string()))
    }

    /// Read and parse the report nmap left at the output path.
    pub async fn read_report(&self) -> Result<NmapRun> {
        let xml = tokio::fs::read(&self.output_path)
            .await
            .map_err(|source| MonitorError::ReportRead {
                path: self.output_path.display().to_string(),
                source,
            })?;

        nmap_xml::parse_nmap_xml(&xml)
    }
}

impl Scanner for NmapScanner {
    /// Run `nmap -sn <target> -oX <output_path>`.
    ///
    /// A report left over from an earlier cycle is removed first so a run
    /// that writes nothing is reported as unreadable output. The child is
    /// killed if it outlives the timeout or the cycle is cancelled.
    async fn scan(&self, target: &str) -> Result<NmapRun> {
        let start = Instant::now();

        match tokio::fs::remove_file(&self.output_path).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                tracing::warn!(
                    path = %self.output_path.display(),
                    error = %e,
                    "Could not remove previous scan report"
                );
            }
        }

        tracing::debug!(target = %target, path = %self.output_path.display(), "Starting nmap sweep");

        let run = Command::new(&self.nmap_path)
            .arg("-sn")
            .arg("-oX")
            .arg(&self.output_path)
            .arg("--noninteractive")
            .arg(target)
            .kill_on_drop(true)
            .output();

        let output = tokio::time::timeout(self.timeout, run)
            .await
            .map_err(|_| MonitorError::ScanTimeout {
                secs: self.timeout.as_secs(),
            })?
            .map_err(|source| MonitorError::ScanSpawn {
                path: self.nmap_path.clone(),
                source,
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(MonitorError::ScanFailed {
                code: output.status.code().unwrap_or(-1),
                stderr,
            });
        }

        let nmap_run = self.read_report().await?;
        let hosts_up = nmap_run.hosts.iter().filter(|h| h.is_up()).count();

        tracing::debug!(
            target = %target,
            hosts_up,
            reported_up = ?nmap_run.reported_up(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Nmap sweep complete"
        );

        Ok(nmap_run)
    }
}
