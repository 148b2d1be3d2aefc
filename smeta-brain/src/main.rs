//! smeta-brain - consensus catalog service
//!
//! Serves the consensus items and raw records behind the cost-estimation
//! dashboard and applies operator edits atomically per item.

use anyhow::{Context, Result};
use clap::Parser;
use smeta_common::config::resolve_config_path;
use smeta_common::TomlConfig;
use smeta_brain::{build_router, db, AppState};
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Command-line arguments; each overrides the matching config file value
#[derive(Debug, Parser)]
#[command(name = "smeta-brain", version, about = "Price consensus catalog service")]
struct Args {
    /// Path to TOML config file
    #[arg(long, env = "SMETA_CONFIG")]
    config: Option<PathBuf>,

    /// HTTP port
    #[arg(long)]
    port: Option<u16>,

    /// SQLite database file
    #[arg(long)]
    database: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = TomlConfig::load_or_default(args.config.as_deref());

    let level = args
        .log_level
        .clone()
        .unwrap_or_else(|| config.logging.level.clone());
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&level)),
        )
        .init();

    info!(
        "Starting Smeta Brain (smeta-brain) v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    match resolve_config_path(args.config.as_deref()) {
        Some(path) => info!("Config file: {}", path.display()),
        None => info!("No config file, using compiled defaults"),
    }
    info!(
        "Consensus: variance threshold {}%, outlier multiple {}",
        config.consensus.price_variance_threshold, config.consensus.outlier_multiple
    );

    let db_path = args.database.clone().unwrap_or_else(|| config.database_path());
    info!("Database path: {}", db_path.display());

    let pool = match db::connect(&db_path).await {
        Ok(pool) => pool,
        Err(e) => {
            error!("Failed to open database: {}", e);
            return Err(e).context("Failed to open database");
        }
    };

    let state = AppState::new(pool, config.consensus.clone());
    let app = build_router(state);

    let port = args.port.unwrap_or(config.port);
    let addr = format!("{}:{}", config.host, port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("smeta-brain listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
