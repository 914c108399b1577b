//! CLI entry point for the lanwatch presence monitor.

use clap::{Parser, ValueEnum};
use tracing_subscriber::{fmt, EnvFilter};

use lanwatch_core::AddressKind;

use lanwatch_monitor::config::{load_watch_config, WatchConfig};
use lanwatch_monitor::notifier::{DesktopNotifier, LogNotifier, Notifier};
use lanwatch_monitor::scanner::NmapScanner;
use lanwatch_monitor::scheduler::PresenceMonitor;

#[derive(Parser)]
#[command(name = "lanwatch")]
#[command(about = "Watch a network for hosts arriving and leaving")]
struct Cli {
    /// Target to sweep (CIDR notation, e.g., 192.168.1.0/24).
    #[arg(short, long)]
    target: Option<String>,

    /// Seconds between the end of one sweep and the start of the next.
    #[arg(short, long)]
    interval: Option<u64>,

    /// Address family every tracked host must report (ipv4, ipv6).
    #[arg(long)]
    primary_address: Option<String>,

    /// Run a single cycle, print its outcome as JSON and exit.
    #[arg(long)]
    once: bool,

    /// Log notifications instead of showing them on the desktop.
    #[arg(long)]
    no_notify: bool,

    /// Config file prefix (default: lanwatch).
    #[arg(short, long, default_value = "lanwatch")]
    config: String,

    /// Log output format.
    #[arg(long, value_enum, default_value_t = LogFormat::Json)]
    log_format: LogFormat,
}

#[derive(Clone, Copy, ValueEnum)]
enum LogFormat {
    Json,
    Pretty,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_format);

    let mut watch_config = load_watch_config(&cli.config)?;
    if let Some(target) = &cli.target {
        watch_config.target = target.clone();
    }
    if let Some(interval) = cli.interval {
        watch_config.interval_secs = interval;
    }
    if let Some(family) = &cli.primary_address {
        watch_config.primary_address = family.parse::<AddressKind>()?;
    }
    watch_config.validate()?;

    // Verify nmap installation.
    let scanner = NmapScanner::from_config(&watch_config);
    let version = scanner.verify_installation().await?;
    tracing::info!(
        nmap_version = %version.lines().next().unwrap_or_default().trim(),
        "Nmap verified"
    );

    if cli.no_notify {
        run(&cli, &watch_config, scanner, LogNotifier).await
    } else {
        let notifier = DesktopNotifier::new(&watch_config.notify_command);
        run(&cli, &watch_config, scanner, notifier).await
    }
}

async fn run<N: Notifier>(
    cli: &Cli,
    watch_config: &WatchConfig,
    scanner: NmapScanner,
    notifier: N,
) -> anyhow::Result<()> {
    let mut monitor = PresenceMonitor::new(watch_config, scanner, notifier);

    if cli.once {
        let outcome = monitor.run_cycle().await;
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    } else {
        monitor.run(shutdown_signal()).await;
    }

    Ok(())
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    match format {
        LogFormat::Json => fmt().with_env_filter(filter).json().init(),
        LogFormat::Pretty => fmt().with_env_filter(filter).init(),
    }
}

/// Resolves on Ctrl-C, or SIGTERM on unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
