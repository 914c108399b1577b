//! Poll scheduling engine.
//!
//! A single [`PresenceMonitor`] owns the presence state and runs one cycle
//! at a time: scan, normalize, diff, report, commit. The interval sleep
//! starts only after a cycle has finished, so cycles never overlap.

use std::future::Future;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::time::Instant;
use uuid::Uuid;

use lanwatch_core::{HostIdentity, PresenceEvent, PresenceState, ScanReport};

use crate::config::{FailurePolicy, WatchConfig};
use crate::diff::diff;
use crate::normalize::{normalize, IdentityPolicy};
use crate::notifier::Notifier;
use crate::report::{self, DeliveryStats};
use crate::scanner::Scanner;

/// What a single cycle observed and did.
#[derive(Debug, Clone, Serialize)]
pub struct CycleOutcome {
    pub cycle_id: Uuid,
    pub target: String,
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
    pub hosts_active: usize,
    pub first_cycle: bool,
    pub scan_failed: bool,
    /// The scan failed and the previous hosts were kept unchanged.
    pub state_retained: bool,
    pub arrivals: Vec<HostIdentity>,
    pub departures: Vec<HostIdentity>,
    pub events: Vec<PresenceEvent>,
    pub notifications_sent: u32,
    pub notifications_failed: u32,
}

/// The presence monitor: scanner, notifier and the state between cycles.
pub struct PresenceMonitor<S, N> {
    target: String,
    interval: Duration,
    dismiss_after: Duration,
    failure_policy: FailurePolicy,
    identity: IdentityPolicy,
    scanner: S,
    notifier: N,
    state: PresenceState,
}

impl<S: Scanner, N: Notifier> PresenceMonitor<S, N> {
    pub fn new(config: &WatchConfig, scanner: S, notifier: N) -> Self {
        Self {
            target: config.target.clone(),
            interval: config.interval(),
            dismiss_after: config.notification_timeout(),
            failure_policy: config.failure_policy,
            identity: config.identity_policy(),
            scanner,
            notifier,
            state: PresenceState::new(),
        }
    }

    pub fn state(&self) -> &PresenceState {
        &self.state
    }

    /// Run cycles until `shutdown` resolves.
    ///
    /// The first cycle starts immediately. Shutdown while a cycle is in
    /// flight abandons it without committing its report.
    pub async fn run<F>(&mut self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        tracing::info!(
            target = %self.target,
            interval_secs = self.interval.as_secs(),
            "Presence monitor started"
        );

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    tracing::info!("Shutdown requested, abandoning cycle in flight");
                    break;
                }
                _ = self.run_cycle() => {}
            }

            tokio::select! {
                _ = &mut shutdown => break,
                _ = tokio::time::sleep(self.interval) => {}
            }
        }

        tracing::info!(
            cycles = self.state.cycles_completed(),
            "Presence monitor stopped"
        );
    }

    /// Execute a single cycle: scan → normalize → diff → report → commit.
    ///
    /// Never fails. A scan error is logged and handled per the failure
    /// policy: either an empty report is diffed and committed, or the cycle
    /// keeps the previous hosts and reports nothing.
    pub async fn run_cycle(&mut self) -> CycleOutcome {
        let cycle_id = Uuid::new_v4();
        let started_at = Utc::now();
        let start = Instant::now();

        let (current, scan_failed) = match self.scanner.scan(&self.target).await {
            Ok(nmap_run) => (normalize(&nmap_run, &self.identity), false),
            Err(e) => {
                tracing::error!(
                    cycle_id = %cycle_id,
                    target = %self.target,
                    error = %e,
                    "Scan failed"
                );
                (ScanReport::new(), true)
            }
        };

        if scan_failed && self.failure_policy == FailurePolicy::RetainPrevious {
            self.state.retain();
            tracing::warn!(
                cycle_id = %cycle_id,
                hosts_active = self.state.hosts().len(),
                "Keeping previous hosts after failed scan"
            );

            return CycleOutcome {
                cycle_id,
                target: self.target.clone(),
                started_at,
                duration_ms: start.elapsed().as_millis() as u64,
                hosts_active: self.state.hosts().len(),
                first_cycle: self.state.hosts().is_empty(),
                scan_failed,
                state_retained: true,
                arrivals: Vec::new(),
                departures: Vec::new(),
                events: Vec::new(),
                notifications_sent: 0,
                notifications_failed: 0,
            };
        }

        let changes = diff(self.state.hosts(), &current);
        let change_report = report::report(&changes, current.len());
        let DeliveryStats { sent, failed } =
            report::deliver(&change_report, &self.notifier, self.dismiss_after).await;

        let hosts_active = current.len();
        self.state.commit(current);

        let events = changes.events();
        let arrival_count = changes.arrivals.len();
        let departure_count = changes.departures.len();

        let outcome = CycleOutcome {
            cycle_id,
            target: self.target.clone(),
            started_at,
            duration_ms: start.elapsed().as_millis() as u64,
            hosts_active,
            first_cycle: changes.is_first_cycle,
            scan_failed,
            state_retained: false,
            arrivals: changes.arrivals,
            departures: changes.departures,
            events,
            notifications_sent: sent,
            notifications_failed: failed,
        };

        tracing::info!(
            cycle_id = %cycle_id,
            target = %self.target,
            hosts_active,
            arrivals = arrival_count,
            departures = departure_count,
            notifications = sent,
            duration_ms = outcome.duration_ms,
            "Cycle complete"
        );

        outcome
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use tokio::sync::{mpsc, oneshot};

    use super::*;
    use crate::error::{MonitorError, Result};
    use crate::nmap_xml::{parse_nmap_xml, NmapRun};
    use crate::report::{DEVICES_LEFT_TITLE, NEW_DEVICES_TITLE};

    const ACME_UP: &str = r#"<nmaprun scanner="nmap">
  <host>
    <status state="up" reason="arp-response"/>
    <address addr="10.0.0.5" addrtype="ipv4"/>
    <address addr="AA:BB:CC:DD:EE:FF" addrtype="mac" vendor="Acme"/>
  </host>
</nmaprun>"#;

    const ACME_DOWN_NEW_UP: &str = r#"<nmaprun scanner="nmap">
  <host>
    <status state="down" reason="no-response"/>
    <address addr="10.0.0.5" addrtype="ipv4"/>
    <address addr="AA:BB:CC:DD:EE:FF" addrtype="mac" vendor="Acme"/>
  </host>
  <host>
    <status state="up" reason="syn-ack"/>
    <address addr="10.0.0.9" addrtype="ipv4"/>
  </host>
</nmaprun>"#;

    fn xml(doc: &str) -> Option<NmapRun> {
        Some(parse_nmap_xml(doc.as_bytes()).unwrap())
    }

    /// Replays scripted reports; `None` entries fail the scan.
    struct ScriptedScanner {
        script: Mutex<VecDeque<Option<NmapRun>>>,
        calls: Option<mpsc::UnboundedSender<Instant>>,
    }

    impl ScriptedScanner {
        fn new(script: Vec<Option<NmapRun>>) -> Self {
            Self {
                script: Mutex::new(script.into()),
                calls: None,
            }
        }

        fn with_calls(mut self, tx: mpsc::UnboundedSender<Instant>) -> Self {
            self.calls = Some(tx);
            self
        }
    }

    impl Scanner for ScriptedScanner {
        async fn scan(&self, _target: &str) -> Result<NmapRun> {
            if let Some(tx) = &self.calls {
                let _ = tx.send(Instant::now());
            }
            let next = self.script.lock().unwrap().pop_front();
            match next {
                Some(Some(run)) => Ok(run),
                Some(None) => Err(MonitorError::ScanFailed {
                    code: 1,
                    stderr: "Failed to resolve target".to_string(),
                }),
                None => Ok(NmapRun::default()),
            }
        }
    }

    /// Answers the first sweep, then never finishes another.
    struct StallingScanner {
        first: Mutex<Option<NmapRun>>,
        calls: mpsc::UnboundedSender<Instant>,
    }

    impl Scanner for StallingScanner {
        async fn scan(&self, _target: &str) -> Result<NmapRun> {
            let _ = self.calls.send(Instant::now());
            let first = self.first.lock().unwrap().take();
            match first {
                Some(run) => Ok(run),
                None => std::future::pending().await,
            }
        }
    }

    #[derive(Default)]
    struct RecordingNotifier {
        sent: Mutex<Vec<(String, String)>>,
    }

    impl Notifier for RecordingNotifier {
        async fn notify(&self, title: &str, body: &str, _dismiss_after: Duration) -> Result<()> {
            self.sent
                .lock()
                .unwrap()
                .push((title.to_string(), body.to_string()));
            Ok(())
        }
    }

    fn config(policy: FailurePolicy) -> WatchConfig {
        WatchConfig {
            target: "10.0.0.0/24".to_string(),
            interval_secs: 30,
            failure_policy: policy,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_first_cycle_establishes_baseline_silently() {
        let mut monitor = PresenceMonitor::new(
            &config(FailurePolicy::CommitEmpty),
            ScriptedScanner::new(vec![xml(ACME_UP)]),
            RecordingNotifier::default(),
        );

        let outcome = monitor.run_cycle().await;
        assert!(outcome.first_cycle);
        assert!(!outcome.scan_failed);
        assert_eq!(outcome.hosts_active, 1);
        assert_eq!(outcome.events.len(), 1);
        assert_eq!(outcome.notifications_sent, 0);
        assert!(monitor.notifier.sent.lock().unwrap().is_empty());

        let hosts: Vec<String> = monitor.state().hosts().iter().map(ToString::to_string).collect();
        assert_eq!(hosts, vec!["10.0.0.5 (AA:BB:CC:DD:EE:FF - Acme)"]);
    }

    #[tokio::test]
    async fn test_arrival_and_departure_notify_once_each() {
        let mut monitor = PresenceMonitor::new(
            &config(FailurePolicy::CommitEmpty),
            ScriptedScanner::new(vec![xml(ACME_UP), xml(ACME_DOWN_NEW_UP)]),
            RecordingNotifier::default(),
        );

        monitor.run_cycle().await;
        let outcome = monitor.run_cycle().await;

        assert!(!outcome.first_cycle);
        assert_eq!(outcome.notifications_sent, 2);
        assert_eq!(
            outcome.arrivals,
            vec![HostIdentity::without_secondary(
                "10.0.0.9",
                lanwatch_core::AddressKind::Mac
            )]
        );
        assert_eq!(outcome.departures.len(), 1);

        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["arrivals"].as_array().unwrap().len(), 1);
        assert_eq!(json["departures"].as_array().unwrap().len(), 1);
        assert_eq!(json["events"].as_array().unwrap().len(), 2);
        assert!(outcome.events.contains(&PresenceEvent::Departed {
            host: HostIdentity::with_secondary(
                "10.0.0.5",
                "AA:BB:CC:DD:EE:FF",
                Some("Acme")
            ),
        }));

        let sent = monitor.notifier.sent.lock().unwrap();
        assert_eq!(sent.len(), 2);
        assert!(sent
            .iter()
            .any(|(t, b)| t == NEW_DEVICES_TITLE && b == "10.0.0.9 (No MAC)"));
        assert!(sent.iter().any(|(t, b)| t == DEVICES_LEFT_TITLE
            && b == "10.0.0.5 (AA:BB:CC:DD:EE:FF - Acme)"));
    }

    #[tokio::test]
    async fn test_failed_scan_commits_empty_report() {
        let mut monitor = PresenceMonitor::new(
            &config(FailurePolicy::CommitEmpty),
            ScriptedScanner::new(vec![xml(ACME_UP), None]),
            RecordingNotifier::default(),
        );

        monitor.run_cycle().await;
        let outcome = monitor.run_cycle().await;

        assert!(outcome.scan_failed);
        assert!(!outcome.state_retained);
        assert_eq!(outcome.hosts_active, 0);
        assert_eq!(outcome.notifications_sent, 1);
        assert!(monitor.state().hosts().is_empty());
        assert_eq!(monitor.state().cycles_completed(), 2);
    }

    #[tokio::test]
    async fn test_failed_scan_can_retain_previous() {
        let mut monitor = PresenceMonitor::new(
            &config(FailurePolicy::RetainPrevious),
            ScriptedScanner::new(vec![xml(ACME_UP), None, xml(ACME_UP)]),
            RecordingNotifier::default(),
        );

        monitor.run_cycle().await;
        let failed = monitor.run_cycle().await;
        assert!(failed.scan_failed);
        assert!(failed.state_retained);
        assert_eq!(failed.hosts_active, 1);
        assert!(failed.events.is_empty());
        assert_eq!(monitor.state().hosts().len(), 1);

        let recovered = monitor.run_cycle().await;
        assert!(recovered.events.is_empty());
        assert!(monitor.notifier.sent.lock().unwrap().is_empty());
        assert_eq!(monitor.state().cycles_completed(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_sleeps_interval_after_each_cycle() {
        let (calls_tx, mut calls_rx) = mpsc::unbounded_channel();
        let (stop_tx, stop_rx) = oneshot::channel::<()>();
        let started = Instant::now();

        let mut monitor = PresenceMonitor::new(
            &config(FailurePolicy::CommitEmpty),
            ScriptedScanner::new(vec![xml(ACME_UP), None, xml(ACME_UP)]).with_calls(calls_tx),
            RecordingNotifier::default(),
        );

        let driver = async {
            let mut seen = Vec::new();
            for _ in 0..3 {
                seen.push(calls_rx.recv().await.unwrap());
            }
            let _ = stop_tx.send(());
            seen
        };
        let run = monitor.run(async {
            let _ = stop_rx.await;
        });

        let ((), seen) = tokio::join!(run, driver);

        let interval = Duration::from_secs(30);
        assert_eq!(seen[0] - started, Duration::ZERO);
        assert_eq!(seen[1] - seen[0], interval);
        assert_eq!(seen[2] - seen[1], interval);
        assert_eq!(monitor.state().cycles_completed(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_abandons_cycle_in_flight() {
        let (calls_tx, mut calls_rx) = mpsc::unbounded_channel();
        let (stop_tx, stop_rx) = oneshot::channel::<()>();

        let mut monitor = PresenceMonitor::new(
            &config(FailurePolicy::CommitEmpty),
            StallingScanner {
                first: Mutex::new(xml(ACME_UP)),
                calls: calls_tx,
            },
            RecordingNotifier::default(),
        );

        let driver = async {
            let first = calls_rx.recv().await.unwrap();
            let second = calls_rx.recv().await.unwrap();
            let _ = stop_tx.send(());
            second - first
        };
        let run = monitor.run(async {
            let _ = stop_rx.await;
        });

        let ((), gap) = tokio::join!(run, driver);

        assert_eq!(gap, Duration::from_secs(30));
        assert_eq!(monitor.state().cycles_completed(), 1);
        let hosts: Vec<String> = monitor.state().hosts().iter().map(ToString::to_string).collect();
        assert_eq!(hosts, vec!["10.0.0.5 (AA:BB:CC:DD:EE:FF - Acme)"]);
        assert!(monitor.notifier.sent.lock().unwrap().is_empty());
    }
}
