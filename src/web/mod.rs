//! Web server module

mod routes;

use anyhow::Result;
use axum::{routing::get, Router};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::info;

use crate::config::Config;
use crate::db::Database;

pub struct AppState {
    pub db: Database,
}

pub async fn start_server(config: &Config, db: Database) -> Result<()> {
    let state = Arc::new(AppState { db });

    let app = Router::new()
        .route("/api/data", get(routes::api_data))
        .layer(CorsLayer::permissive())
        .with_state(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    info!("API server starting on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
