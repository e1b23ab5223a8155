//! Remote API access.
//!
//! The pipeline consumes exactly two read-only endpoints, modeled as the
//! [`ElectionApi`] trait so stages can run against fixtures in tests.
//! Implementations return the raw JSON body; shape validation happens at the
//! caller's trust boundary.

use crate::config::Config;
use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
    #[error("GET {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("GET {url} returned {status}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
    },
}

pub type Result<T> = std::result::Result<T, TransportError>;

#[async_trait]
pub trait ElectionApi: Send + Sync {
    /// Full LGA/ward listing for one state.
    async fn fetch_state_listing(&self, state_id: u32) -> Result<Value>;

    /// Polling-unit listing for one ward, keyed by the ward's remote
    /// correlation id.
    async fn fetch_polling_units(&self, ward_remote_id: &str) -> Result<Value>;
}

/// reqwest-backed client with bounded retries and exponential backoff.
pub struct HttpApi {
    http: reqwest::Client,
    api_base: String,
    election_id: String,
    retries: u32,
    retry_base_delay: Duration,
}

impl HttpApi {
    pub fn new(config: &Config) -> Result<HttpApi> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(TransportError::Client)?;
        Ok(HttpApi {
            http,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            election_id: config.election_id.clone(),
            retries: config.retries,
            retry_base_delay: Duration::from_millis(config.retry_base_delay_ms),
        })
    }

    async fn get_json(&self, url: String) -> Result<Value> {
        let mut attempt = 0u32;
        loop {
            match self.try_get(&url).await {
                Ok(value) => return Ok(value),
                Err(err) if attempt < self.retries => {
                    let delay = self.retry_base_delay * 2u32.saturating_pow(attempt);
                    eprintln!("retrying {} in {:?}: {}", url, delay, err);
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }

    async fn try_get(&self, url: &str) -> Result<Value> {
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|source| TransportError::Request {
                url: url.to_string(),
                source,
            })?;
        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Status {
                url: url.to_string(),
                status,
            });
        }
        response.json().await.map_err(|source| TransportError::Request {
            url: url.to_string(),
            source,
        })
    }
}

#[async_trait]
impl ElectionApi for HttpApi {
    async fn fetch_state_listing(&self, state_id: u32) -> Result<Value> {
        self.get_json(format!(
            "{}/elections/{}/lga/state/{}",
            self.api_base, self.election_id, state_id
        ))
        .await
    }

    async fn fetch_polling_units(&self, ward_remote_id: &str) -> Result<Value> {
        self.get_json(format!(
            "{}/elections/{}/pus?ward={}",
            self.api_base, self.election_id, ward_remote_id
        ))
        .await
    }
}
