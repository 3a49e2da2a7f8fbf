//! Periscope binary entry point.
//!
//! Loads the YAML configuration, starts collectors for every enabled
//! auto-collect device, and appends pass outcomes to the JSON-lines
//! history file until the process is signalled to stop.

use std::sync::Arc;

use clap::Parser;
use periscope::{
    catalog::default_catalog,
    collector::CollectorRegistry,
    config::AppConfig,
    session::SnmpSessionFactory,
    sink::JsonlSink,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Periscope - SNMP device polling engine
#[derive(Parser, Debug)]
#[command(name = "periscope", version, about, long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(
        short,
        long,
        default_value = "configs/periscope.yaml",
        env = "PERISCOPE_CONFIG"
    )]
    config: String,

    /// History file path (overrides config file)
    #[arg(long, env = "PERISCOPE_HISTORY")]
    history: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,periscope=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Periscope - SNMP device polling engine");

    let cli = Cli::parse();

    tracing::info!("Loading configuration from: {}", cli.config);
    let mut config = AppConfig::load(&cli.config)?;

    // CLI > ENV > config file
    if let Some(history) = cli.history {
        config.history_path = history;
    }

    tracing::info!(
        devices = config.devices.len(),
        fast = %humantime::format_duration(config.tiers.fast),
        standard = %humantime::format_duration(config.tiers.standard),
        slow = %humantime::format_duration(config.tiers.slow),
        "configuration loaded"
    );

    let sink = Arc::new(JsonlSink::open(&config.history_path)?);
    tracing::info!(path = %sink.path().display(), "history sink ready");

    let registry = CollectorRegistry::new(
        config.devices,
        default_catalog(),
        config.tiers,
        Arc::new(SnmpSessionFactory),
        sink,
    );

    let started = registry.initialize_all().await;
    if started == 0 {
        tracing::warn!("no collectors started, check device configuration");
    }

    tracing::info!("Press Ctrl+C to shutdown");
    shutdown_signal().await;

    tracing::info!("Shutting down collectors...");
    registry.shutdown_all().await;

    tracing::info!("Shutdown complete");
    Ok(())
}

/// Wait for Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C signal");
        }
        _ = terminate => {
            tracing::info!("Received terminate signal");
        }
    }
}
