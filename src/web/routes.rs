//! HTTP routes with response caching

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use cached::proc_macro::cached;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::AppState;
use crate::db::{Database, DeviceTotal, TrafficSample};
use crate::parser::LeaseRecord;

#[derive(Debug, Deserialize)]
pub struct DataQuery {
    /// One of "traffic", "leases", "final"
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct TrafficResponse {
    pub last_updated: Option<DateTime<Utc>>,
    pub samples: Vec<TrafficSample>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FinalResponse {
    pub last_updated: Option<DateTime<Utc>>,
    pub devices: Vec<DeviceTotal>,
}

/// Cached hostname-resolved totals - 5 minute TTL (data changes hourly)
#[cached(time = 300, key = "()", convert = r#"{ () }"#)]
async fn get_cached_final(db: Database) -> FinalResponse {
    let (last_updated, devices) = tokio::join!(db.last_updated(), db.get_device_totals());

    FinalResponse {
        last_updated: last_updated.unwrap_or(None),
        devices: devices.unwrap_or_default(),
    }
}

/// API: single data endpoint, view selected by `?type=`
pub async fn api_data(
    State(state): State<Arc<AppState>>,
    Query(query): Query<DataQuery>,
) -> Response {
    match query.kind.as_str() {
        "traffic" => {
            let (last_updated, samples) =
                tokio::join!(state.db.last_updated(), state.db.get_traffic_samples());
            Json(TrafficResponse {
                last_updated: last_updated.unwrap_or(None),
                samples: samples.unwrap_or_default(),
            })
            .into_response()
        }
        "leases" => {
            let leases: Vec<LeaseRecord> = state.db.get_leases().await.unwrap_or_default();
            Json(leases).into_response()
        }
        "final" => Json(get_cached_final(state.db.clone()).await).into_response(),
        other => (
            StatusCode::BAD_REQUEST,
            format!("unknown type '{}': expected traffic, leases or final", other),
        )
            .into_response(),
    }
}
