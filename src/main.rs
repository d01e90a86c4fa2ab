//! netwatch - per-device traffic accounting for home routers
//!
//! Collects cumulative per-station byte counters and DHCP leases from one or
//! more routers, turns them into daily per-device deltas with reboot-safe
//! reconciliation, and serves the aggregated views over a small JSON API.

mod client;
mod collector;
mod config;
mod db;
mod parser;
mod reconcile;
mod web;

use anyhow::Result;
use chrono::Utc;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "netwatch", version, about = "Per-device router traffic accounting")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one collection cycle and exit (meant for a cron/systemd timer).
    Collect,
    /// Serve the read-only JSON API.
    Serve,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (before any other initialization)
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    // Invalid or missing configuration is fatal here, never mid-cycle
    let config = config::Config::load()?;

    // RUST_LOG wins over the configured level when set
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.logging.level.clone()));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let db = db::Database::new(&config.database).await?;
    db.run_migrations().await?;
    info!("Database ready at {}", config.database.url);

    match cli.command {
        Commands::Collect => {
            let stats = collector::run_cycle(&config, &db, Utc::now()).await?;
            info!(
                "Cycle complete: {} routers ok, {} failed, {} devices, {} new leases, {} samples pruned",
                stats.routers_ok,
                stats.routers_failed,
                stats.devices_seen,
                stats.new_leases,
                stats.samples_pruned
            );
        }
        Commands::Serve => {
            web::start_server(&config, db).await?;
        }
    }

    Ok(())
}
