//! Ban management guard.
//!
//! # Architecture Overview
//!
//! ```text
//!                      ┌──────────────────────────────────────────────────────────┐
//!                      │                      BAN GUARD                           │
//!                      │                                                          │
//!   Client Request     │  ┌──────────┐   ┌───────────────────────────────────┐    │
//!   ───────────────────┼─▶│   http   │──▶│        admission pipeline         │    │
//!                      │  │ boundary │   │ firewall → throttle → cookie ban  │    │
//!                      │  └────┬─────┘   │          → banned email           │    │
//!                      │       │         └──────────────┬────────────────────┘    │
//!                      │       │ allowed                │ blocked                 │
//!                      │       ▼                        ▼                         │
//!                      │  ┌──────────┐           ┌─────────────┐                  │
//!   Response           │  │   app    │           │ Banned event│─▶ cookie listener│
//!   ◀──────────────────┼──│ handler  │           └─────────────┘                  │
//!                      │  └──────────┘                                            │
//!                      │                                                          │
//!                      │  ┌────────────────────────────────────────────────────┐  │
//!                      │  │ rules repository · config · observability · admin │  │
//!                      │  └────────────────────────────────────────────────────┘  │
//!                      └──────────────────────────────────────────────────────────┘
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;

use ban_management::config::{load_config, GuardConfig};
use ban_management::lifecycle::{import_seed, signals};
use ban_management::observability::{logging, metrics};
use ban_management::rules::MemoryStore;
use ban_management::{HttpServer, Shutdown};

#[derive(Debug, Parser)]
#[command(name = "ban-management", version, about = "Admission-control guard for HTTP applications")]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => GuardConfig::default(),
    };

    if let Err(e) = logging::init(&config.observability) {
        eprintln!("logging already initialised: {e}");
    }

    tracing::info!("ban-management v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        firewall_entries = config.firewall.entries.len(),
        throttle_limit = config.throttle.limit,
        throttle_window_secs = config.throttle.window_secs,
        ddos_enabled = config.ddos.enabled,
        cookie_tracking = config.cookie.tracking,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let store = Arc::new(MemoryStore::new());
    let mut server = HttpServer::new(config.clone(), store)?;
    if let Some(path) = &cli.config {
        server = server.with_config_path(path);
    }

    if let Some(seed) = &config.store.seed_path {
        import_seed(&server.components().repository, Path::new(seed)).await?;
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    tokio::spawn(signals::shutdown_on_signal(shutdown.clone()));

    server.run(listener, shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
