//! StormPath server - main entry point
//!
//! Road-condition reporting service: loads the road catalog, opens the
//! reports database, and serves the submission API plus the viewer sync
//! stream.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};

use stormpath_server::config::Config;
use stormpath_server::db::{changes, init::init_database};
use stormpath_server::roads::RoadCatalog;
use stormpath_server::{build_router, AppState};

/// Command-line arguments for stormpath-server
#[derive(Parser, Debug)]
#[command(name = "stormpath-server")]
#[command(about = "Road condition reporting and sync service")]
#[command(version)]
struct Args {
    /// Port to listen on
    #[arg(short, long, env = "STORMPATH_PORT")]
    port: Option<u16>,

    /// Data folder holding the reports database and road files
    #[arg(long, env = "STORMPATH_DATA")]
    data_folder: Option<PathBuf>,

    /// Road catalog file (.json envelope or .jsonl)
    #[arg(long, env = "STORMPATH_ROADS")]
    roads_file: Option<PathBuf>,

    /// Optional TOML config file
    #[arg(short, long, env = "STORMPATH_CONFIG")]
    config: Option<PathBuf>,

    /// Prune change-log entries older than this many days at startup
    #[arg(long, env = "STORMPATH_CHANGE_RETENTION_DAYS")]
    change_retention_days: Option<i64>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    info!(
        "Starting StormPath server v{}",
        env!("CARGO_PKG_VERSION")
    );

    let args = Args::parse();

    let data_folder =
        stormpath_common::config::resolve_data_folder(args.data_folder.as_deref(), "STORMPATH_DATA");
    let mut config = Config::new(data_folder);
    if let Some(path) = &args.config {
        config
            .apply_file(path)
            .with_context(|| format!("Failed to load config file {}", path.display()))?;
    }
    if let Some(port) = args.port {
        config.port = port;
    }
    if let Some(roads_file) = args.roads_file {
        config.roads_file = roads_file;
    }

    info!("Data folder: {}", config.data_folder.display());

    let catalog = RoadCatalog::load(&config.roads_file)
        .with_context(|| format!("Failed to load roads from {}", config.roads_file.display()))?;
    if catalog.is_empty() {
        warn!("Road catalog is empty; all submissions will be rejected");
    }

    let pool = init_database(&config.db_path())
        .await
        .context("Failed to initialize database")?;

    // Optional retention window for the change log. Connected viewers
    // resync from a fresh init on reconnect, so pruning only at startup
    // cannot outrun a live watermark.
    if let Some(days) = args.change_retention_days {
        let cutoff = chrono::Utc::now() - chrono::Duration::days(days);
        let pruned = changes::prune_changes_before(&pool, cutoff)
            .await
            .context("Failed to prune change log")?;
        if pruned > 0 {
            info!("Pruned {pruned} change-log entries older than {days} days");
        }
    }

    let state = AppState::new(pool, Arc::new(catalog), config.poll_interval());
    let app = build_router(state);

    let addr: SocketAddr = config
        .bind_addr()
        .parse()
        .with_context(|| format!("Invalid bind address {}", config.bind_addr()))?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {addr}"))?;

    info!("stormpath-server listening on http://{addr}");
    info!("Health check: http://{addr}/health");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
