//! Change reporting: turn a change set into log lines and notifications.

use std::time::Duration;

use lanwatch_core::{ChangeSet, HostIdentity};

use crate::notifier::Notifier;

pub const NEW_DEVICES_TITLE: &str = "New devices on the network";
pub const DEVICES_LEFT_TITLE: &str = "Devices left the network";

/// A notification to deliver: one per direction per cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub title: String,
    pub body: String,
}

/// Everything a cycle wants to say about its change set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeReport {
    pub log_lines: Vec<String>,
    pub notifications: Vec<Notification>,
}

/// Delivery counts for one cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeliveryStats {
    pub sent: u32,
    pub failed: u32,
}

/// Build log lines and notifications for a change set.
///
/// Logs one line per arrival and departure, or a single summary line when
/// nothing changed. The first cycle never notifies: every host already on
/// the network would otherwise show up as an arrival.
pub fn report(changes: &ChangeSet, current_count: usize) -> ChangeReport {
    let mut log_lines: Vec<String> = changes
        .arrivals
        .iter()
        .map(|host| format!("new device: {host}"))
        .chain(
            changes
                .departures
                .iter()
                .map(|host| format!("device left: {host}")),
        )
        .collect();

    if log_lines.is_empty() {
        log_lines.push(format!("{current_count} hosts active."));
    }

    let mut notifications = Vec::new();
    if !changes.is_first_cycle {
        if !changes.arrivals.is_empty() {
            notifications.push(Notification {
                title: NEW_DEVICES_TITLE.to_string(),
                body: list_body(&changes.arrivals),
            });
        }
        if !changes.departures.is_empty() {
            notifications.push(Notification {
                title: DEVICES_LEFT_TITLE.to_string(),
                body: list_body(&changes.departures),
            });
        }
    }

    ChangeReport {
        log_lines,
        notifications,
    }
}

fn list_body(hosts: &[HostIdentity]) -> String {
    hosts
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Write the log lines and send every notification.
///
/// A failed notification is logged and counted; it never stops the other
/// notification from being sent.
pub async fn deliver<N: Notifier>(
    report: &ChangeReport,
    notifier: &N,
    dismiss_after: Duration,
) -> DeliveryStats {
    for line in &report.log_lines {
        tracing::info!("{line}");
    }

    let mut stats = DeliveryStats::default();
    for notification in &report.notifications {
        match notifier
            .notify(&notification.title, &notification.body, dismiss_after)
            .await
        {
            Ok(()) => stats.sent += 1,
            Err(e) => {
                stats.failed += 1;
                tracing::warn!(
                    title = %notification.title,
                    error = %e,
                    "Failed to deliver notification"
                );
            }
        }
    }

    stats
}
