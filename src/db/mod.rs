//! SQLite storage for traffic samples, counter state, and DHCP leases

mod schema;

use anyhow::Result;
use chrono::{DateTime, Days, NaiveDate, Utc};
use serde::Serialize;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{Pool, Sqlite};
use std::collections::BTreeMap;

use crate::config::DatabaseConfig;
use crate::parser::{Counters, LeaseRecord};
use crate::reconcile;

/// One device's traffic for one calendar day
#[derive(Debug, Clone, Serialize)]
pub struct TrafficSample {
    pub device_id: String,
    pub day: NaiveDate,
    pub rx_delta: i64,
    pub tx_delta: i64,
}

/// Summed traffic for one device across the retained window
#[derive(Debug, Clone, Serialize)]
pub struct DeviceTotal {
    pub hostname: String,
    pub device_id: String,
    pub total_rx: i64,
    pub total_tx: i64,
}

#[derive(Clone)]
pub struct Database {
    pool: Pool<Sqlite>,
}

impl Database {
    pub async fn new(config: &DatabaseConfig) -> Result<Self> {
        Self::open(&format!("sqlite:{}?mode=rwc", config.url)).await
    }

    /// Open a database from a raw sqlx connection URL.
    pub async fn open(url: &str) -> Result<Self> {
        // One connection: writes stay serialized, and every connection to
        // sqlite::memory: would otherwise see its own empty database
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect(url)
            .await?;
        Ok(Self { pool })
    }

    pub async fn run_migrations(&self) -> Result<()> {
        // Enable WAL mode for better concurrency
        sqlx::query("PRAGMA journal_mode=WAL")
            .execute(&self.pool)
            .await?;
        sqlx::query("PRAGMA synchronous=NORMAL")
            .execute(&self.pool)
            .await?;

        sqlx::query(schema::CREATE_TRAFFIC_TABLE)
            .execute(&self.pool)
            .await?;
        sqlx::query(schema::CREATE_COUNTER_STATE_TABLE)
            .execute(&self.pool)
            .await?;
        sqlx::query(schema::CREATE_LEASES_TABLE)
            .execute(&self.pool)
            .await?;
        sqlx::query(schema::CREATE_INDEX_DAY)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Apply one router's cumulative readings in a single transaction.
    ///
    /// For each device the last known cumulative reading is turned into this
    /// period's delta, the delta is accumulated into the device's row for the
    /// current day, and the stored reading is replaced with the new one. The
    /// transaction keeps a half-merged router from ever becoming visible.
    pub async fn record_observations(
        &self,
        now: DateTime<Utc>,
        observed: &BTreeMap<String, Counters>,
    ) -> Result<()> {
        let day = now.date_naive();
        let now_ms = now.timestamp_millis();

        let mut txn = self.pool.begin().await?;

        for (device_id, counters) in observed {
            let last: Option<(i64, i64)> =
                sqlx::query_as("SELECT rx_total, tx_total FROM counter_state WHERE device_id = ?")
                    .bind(device_id)
                    .fetch_optional(&mut *txn)
                    .await?;
            let last = last.map(|(rx, tx)| Counters {
                rx: rx as u64,
                tx: tx as u64,
            });

            let delta = reconcile::period_delta(*counters, last);

            sqlx::query(
                r#"
                INSERT INTO traffic_samples (device_id, day, rx_delta, tx_delta, updated_at)
                VALUES (?, ?, ?, ?, ?)
                ON CONFLICT(device_id, day) DO UPDATE SET
                    rx_delta = rx_delta + excluded.rx_delta,
                    tx_delta = tx_delta + excluded.tx_delta,
                    updated_at = excluded.updated_at
                "#,
            )
            .bind(device_id)
            .bind(day)
            .bind(delta.rx as i64)
            .bind(delta.tx as i64)
            .bind(now_ms)
            .execute(&mut *txn)
            .await?;

            sqlx::query(
                "INSERT OR REPLACE INTO counter_state (device_id, rx_total, tx_total) VALUES (?, ?, ?)",
            )
            .bind(device_id)
            .bind(counters.rx as i64)
            .bind(counters.tx as i64)
            .execute(&mut *txn)
            .await?;
        }

        txn.commit().await?;
        Ok(())
    }

    /// Last cumulative reading recorded for a device, if any.
    pub async fn get_counter_state(&self, device_id: &str) -> Result<Option<Counters>> {
        let row: Option<(i64, i64)> =
            sqlx::query_as("SELECT rx_total, tx_total FROM counter_state WHERE device_id = ?")
                .bind(device_id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.map(|(rx, tx)| Counters {
            rx: rx as u64,
            tx: tx as u64,
        }))
    }

    /// Insert previously unseen MAC addresses, returning how many were new.
    ///
    /// A MAC already on file keeps its first-seen hostname and IP; later
    /// observations are ignored rather than updated.
    pub async fn ingest_leases(&self, leases: &[LeaseRecord], now: DateTime<Utc>) -> Result<u64> {
        let now_ms = now.timestamp_millis();
        let mut inserted = 0;

        let mut txn = self.pool.begin().await?;
        for lease in leases {
            let result = sqlx::query(
                "INSERT OR IGNORE INTO dhcp_leases (mac_address, ip_address, hostname, first_seen) VALUES (?, ?, ?, ?)",
            )
            .bind(&lease.mac_address)
            .bind(&lease.ip_address)
            .bind(&lease.hostname)
            .bind(now_ms)
            .execute(&mut *txn)
            .await?;
            inserted += result.rows_affected();
        }
        txn.commit().await?;

        Ok(inserted)
    }

    /// Delete samples older than the retention horizon, returning the number
    /// of rows removed. A sample dated exactly `retention_days` ago is kept.
    pub async fn prune_samples(&self, today: NaiveDate, retention_days: u32) -> Result<u64> {
        let cutoff = today - Days::new(u64::from(retention_days));
        let result = sqlx::query("DELETE FROM traffic_samples WHERE day < ?")
            .bind(cutoff)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    pub async fn get_traffic_samples(&self) -> Result<Vec<TrafficSample>> {
        let rows: Vec<(String, NaiveDate, i64, i64)> = sqlx::query_as(
            "SELECT device_id, day, rx_delta, tx_delta FROM traffic_samples ORDER BY day, device_id",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(device_id, day, rx_delta, tx_delta)| TrafficSample {
                device_id,
                day,
                rx_delta,
                tx_delta,
            })
            .collect())
    }

    pub async fn get_leases(&self) -> Result<Vec<LeaseRecord>> {
        let rows: Vec<(String, String, String)> = sqlx::query_as(
            "SELECT mac_address, ip_address, hostname FROM dhcp_leases ORDER BY mac_address",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(mac_address, ip_address, hostname)| LeaseRecord {
                mac_address,
                ip_address,
                hostname,
            })
            .collect())
    }

    /// Per-device totals over every retained sample, with hostnames resolved
    /// through the lease table. Devices without a lease (the WAN interface
    /// included) are reported under their raw identifier.
    pub async fn get_device_totals(&self) -> Result<Vec<DeviceTotal>> {
        let rows: Vec<(String, String, i64, i64)> = sqlx::query_as(
            r#"
            SELECT s.device_id,
                   COALESCE(l.hostname, s.device_id) AS hostname,
                   SUM(s.rx_delta) AS total_rx,
                   SUM(s.tx_delta) AS total_tx
            FROM traffic_samples s
            LEFT JOIN dhcp_leases l ON l.mac_address = s.device_id
            GROUP BY s.device_id
            ORDER BY s.device_id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(device_id, hostname, total_rx, total_tx)| DeviceTotal {
                hostname,
                device_id,
                total_rx,
                total_tx,
            })
            .collect())
    }

    /// When the store last absorbed a traffic write, if ever.
    pub async fn last_updated(&self) -> Result<Option<DateTime<Utc>>> {
        let row: (Option<i64>,) = sqlx::query_as("SELECT MAX(updated_at) FROM traffic_samples")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.0.and_then(DateTime::from_timestamp_millis))
    }
}
