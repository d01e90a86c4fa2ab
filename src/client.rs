//! HTTP client for the router data endpoints

use anyhow::Result;
use std::time::Duration;
use thiserror::Error;

/// A fetch failed for one router endpoint.
///
/// Callers treat this as "this router has no data this cycle" and move on;
/// the next scheduled cycle is the retry mechanism.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} returned HTTP {status}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
    },
}

/// Thin wrapper around a shared HTTP client with a bounded per-request
/// timeout. The routers serve plain text from shell scripts, so there is no
/// content negotiation to speak of.
#[derive(Clone)]
pub struct RouterClient {
    http: reqwest::Client,
}

impl RouterClient {
    pub fn new(timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { http })
    }

    /// Fetch one endpoint's response body as text.
    pub async fn fetch_text(&self, url: &str) -> Result<String, FetchError> {
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|source| FetchError::Transport {
                url: url.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status,
            });
        }

        response.text().await.map_err(|source| FetchError::Transport {
            url: url.to_string(),
            source,
        })
    }
}
