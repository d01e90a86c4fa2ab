//! Database schema definitions

// One row per device per calendar day; re-collection within the same day
// accumulates into the existing row via upsert.
pub const CREATE_TRAFFIC_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS traffic_samples (
    device_id TEXT NOT NULL,
    day TEXT NOT NULL,
    rx_delta BIGINT NOT NULL DEFAULT 0,
    tx_delta BIGINT NOT NULL DEFAULT 0,
    updated_at BIGINT NOT NULL,
    PRIMARY KEY (device_id, day)
)
"#;

// Last cumulative reading per device, kept durable so collector restarts
// don't lose reconciliation state.
pub const CREATE_COUNTER_STATE_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS counter_state (
    device_id TEXT PRIMARY KEY,
    rx_total BIGINT NOT NULL,
    tx_total BIGINT NOT NULL
)
"#;

// Insert-once: a MAC's first-seen hostname and IP are never overwritten.
pub const CREATE_LEASES_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS dhcp_leases (
    mac_address TEXT PRIMARY KEY,
    ip_address TEXT NOT NULL,
    hostname TEXT NOT NULL,
    first_seen BIGINT NOT NULL
)
"#;

// For retention pruning by day
pub const CREATE_INDEX_DAY: &str =
    "CREATE INDEX IF NOT EXISTS idx_samples_day ON traffic_samples(day)";
