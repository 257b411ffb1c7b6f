//! Station daemon entry point.
//!
//! Wires the lifecycle bus, the cloud client and the coordinator, announces
//! the storage root, and relays SIGINT/SIGTERM as a shutdown signal.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use station_core::StationStatus;
use station_daemon::bus::{EventBus, LifecycleSignal};
use station_daemon::config::StationConfig;
use station_daemon::coordinator::Coordinator;
use station_daemon::registration::CloudClient;
use station_daemon::tickets::TicketBridge;
use tokio::signal;
use tracing_subscriber::EnvFilter;

/// Station daemon - device identity and cloud pairing
#[derive(Parser)]
#[command(name = "station-daemon", version, about)]
struct Cli {
    /// Device storage root (defaults to STATION_ROOT or the platform data
    /// directory)
    #[arg(long)]
    root: Option<PathBuf>,

    /// Cloud control-plane endpoint (defaults to STATION_CLOUD_ENDPOINT or
    /// the production endpoint)
    #[arg(long)]
    cloud: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = StationConfig::resolve(cli.root, cli.cloud);
    tracing::info!(
        root = %config.storage_root.display(),
        cloud = %config.cloud_endpoint,
        "station daemon starting"
    );

    let bus = EventBus::new();
    let cloud = CloudClient::new(config.cloud_endpoint.clone());
    let tickets = Arc::new(TicketBridge::new());

    let coordinator = Coordinator::new(bus.clone(), cloud, tickets);
    let handle = coordinator.handle();

    // Mirror outbound events into the log; other subsystems subscribe the
    // same way.
    let mut events = bus.subscribe_events();
    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            tracing::info!(%event, "lifecycle event");
        }
    });

    let worker = tokio::spawn(coordinator.run());

    // The file subsystem is not part of this daemon; its readiness signal is
    // the storage root resolved above.
    bus.emit_signal(LifecycleSignal::StorageReady {
        root: config.storage_root.clone(),
    });

    wait_for_terminate().await;
    tracing::info!("terminating; stopping station");
    bus.emit_signal(LifecycleSignal::Shutdown);

    // Give the coordinator a moment to unwind before the process exits.
    let drained = tokio::time::timeout(std::time::Duration::from_secs(5), async {
        while handle.status().await != StationStatus::Uninitialized {
            tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        }
    })
    .await;
    if drained.is_err() {
        tracing::warn!("station did not unwind in time; exiting anyway");
    }

    worker.abort();
    tracing::info!("station daemon shutdown complete");
    Ok(())
}

/// Wait for SIGINT or, on Unix, SIGTERM.
async fn wait_for_terminate() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("received SIGINT"),
        _ = terminate => tracing::info!("received SIGTERM"),
    }
}
