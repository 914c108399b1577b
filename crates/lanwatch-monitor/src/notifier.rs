//! Notification delivery.
//!
//! The monitor only needs a fire-and-forget "show this title and body"
//! capability. [`DesktopNotifier`] shells out to `notify-send` (or a
//! compatible command) via `tokio::process::Command`; [`LogNotifier`] writes
//! the notification to the log instead.

use std::future::Future;
use std::time::Duration;

use tokio::process::Command;

use crate::error::{MonitorError, Result};

const APP_NAME: &str = "lanwatch";

/// Something that can put a notification in front of a human.
pub trait Notifier {
    /// Show `title` and `body` (which may contain line breaks), dismissed
    /// automatically after `dismiss_after`.
    fn notify(
        &self,
        title: &str,
        body: &str,
        dismiss_after: Duration,
    ) -> impl Future<Output = Result<()>> + Send;
}

/// Desktop notifications through a `notify-send` compatible command.
pub struct DesktopNotifier {
    command: String,
}

impl DesktopNotifier {
    pub fn new(command: &str) -> Self {
        Self {
            command: command.to_string(),
        }
    }
}

impl Notifier for DesktopNotifier {
    async fn notify(&self, title: &str, body: &str, dismiss_after: Duration) -> Result<()> {
        let output = Command::new(&self.command)
            .arg("--app-name")
            .arg(APP_NAME)
            .arg("--expire-time")
            .arg(dismiss_after.as_millis().to_string())
            .arg(title)
            .arg(body)
            .output()
            .await
            .map_err(|e| MonitorError::Notify {
                command: self.command.clone(),
                reason: e.to_string(),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(MonitorError::Notify {
                command: self.command.clone(),
                reason: format!(
                    "exited with code {}: {}",
                    output.status.code().unwrap_or(-1),
                    stderr.trim()
                ),
            });
        }

        Ok(())
    }
}

/// Writes notifications to the log. Used with `--no-notify`.
#[derive(Debug, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    async fn notify(&self, title: &str, body: &str, _dismiss_after: Duration) -> Result<()> {
        tracing::info!(title, body, "Notification");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_log_notifier_never_fails() {
        let result = LogNotifier
            .notify("New devices", "10.0.0.9 (No MAC)", Duration::from_secs(5))
            .await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_missing_command_is_notify_error() {
        let notifier = DesktopNotifier::new("/nonexistent/lanwatch-notify-send");
        let err = notifier
            .notify("title", "body", Duration::from_millis(100))
            .await
            .unwrap_err();
        assert!(matches!(err, MonitorError::Notify { ref command, .. } if command.contains("nonexistent")));
        assert!(!err.is_scan_failure());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_non_zero_exit_is_notify_error() {
        let notifier = DesktopNotifier::new("false");
        let err = notifier
            .notify("title", "body", Duration::from_millis(100))
            .await
            .unwrap_err();
        assert!(matches!(err, MonitorError::Notify { ref reason, .. } if reason.contains("exited")));
    }
}
