//! Collection cycle orchestration

use anyhow::Result;
use chrono::{DateTime, Timelike, Utc};
use futures::future::join_all;
use std::time::Duration;
use tracing::{info, warn};

use crate::client::RouterClient;
use crate::config::Config;
use crate::db::Database;
use crate::parser;

/// Outcome of one collection cycle, for the end-of-cycle summary
#[derive(Debug, Default)]
pub struct CycleStats {
    pub routers_ok: usize,
    pub routers_failed: usize,
    pub devices_seen: usize,
    pub new_leases: u64,
    pub samples_pruned: u64,
}

/// Run one full fetch, reconcile, and prune pass across all configured
/// routers.
///
/// Router endpoints are fetched concurrently but merged into the store one
/// router at a time. A router that is unreachable or returns garbage is
/// skipped for the cycle; only storage failures abort it. Lease endpoints
/// are polled only in the cycle whose hour matches `daily_hour`, and
/// pruning runs last so the cycle's own writes are never trimmed.
pub async fn run_cycle(config: &Config, db: &Database, now: DateTime<Utc>) -> Result<CycleStats> {
    let client = RouterClient::new(Duration::from_secs(config.collector.fetch_timeout_secs))?;
    let mut stats = CycleStats::default();

    let fetches = join_all(config.collector.traffic_urls.iter().map(|url| {
        let client = client.clone();
        async move { (url, client.fetch_text(url).await) }
    }))
    .await;

    for (url, fetched) in fetches {
        let body = match fetched {
            Ok(body) => body,
            Err(e) => {
                warn!("Router unreachable this cycle: {}", e);
                stats.routers_failed += 1;
                continue;
            }
        };

        let observed = parser::parse_traffic(&body);
        if observed.is_empty() {
            warn!("No parseable traffic data from {}", url);
            stats.routers_failed += 1;
            continue;
        }

        db.record_observations(now, &observed).await?;
        info!("Recorded {} devices from {}", observed.len(), url);
        stats.routers_ok += 1;
        stats.devices_seen += observed.len();
    }

    if now.hour() == config.collector.daily_hour {
        for url in &config.collector.lease_urls {
            match client.fetch_text(url).await {
                Ok(body) => {
                    let leases = parser::parse_leases(&body);
                    let new_leases = db.ingest_leases(&leases, now).await?;
                    info!(
                        "Lease sweep of {}: {} entries, {} new",
                        url,
                        leases.len(),
                        new_leases
                    );
                    stats.new_leases += new_leases;
                }
                Err(e) => {
                    warn!("Lease endpoint unavailable this cycle: {}", e);
                }
            }
        }
    }

    stats.samples_pruned = db
        .prune_samples(now.date_naive(), config.collector.retention_days)
        .await?;

    Ok(stats)
}
