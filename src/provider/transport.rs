//! HTTP transport for the report endpoint.
//!
//! The transport owns the session and timeout settings and returns the raw
//! JSON body; envelope decoding happens one layer up.

use crate::provider::query::ReportQuery;
use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// Failures that prevent a response from being read at all.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Request timed out after {0}s")]
    Timeout(u64),

    #[error("Cannot connect to data provider at {0}")]
    Connect(String),

    #[error("Failed to send request: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Data provider returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Failed to decode provider response: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Issues one parameterized GET against the report endpoint.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn get_json(&self, query: &ReportQuery) -> Result<Value, TransportError>;
}

/// Connection settings for [`HttpTransport`].
#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub base_url: String,
    pub timeout_seconds: u64,
    /// Value of the `source` tag sent with every request.
    pub source: String,
    /// Value of the `client` tag sent with every request.
    pub client: String,
    pub user_agent: String,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            base_url: "https://datacenter.eastmoney.com/securities/api/data/v1/get".to_string(),
            timeout_seconds: 10,
            source: "HSF10".to_string(),
            client: "PC".to_string(),
            user_agent: concat!("valprobe/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

/// `reqwest`-backed transport.
pub struct HttpTransport {
    config: TransportConfig,
    http_client: reqwest::Client,
}

impl HttpTransport {
    /// Build a transport with a pooled client honoring the configured timeout.
    pub fn new(config: TransportConfig) -> Result<Self, TransportError> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .user_agent(config.user_agent.clone())
            .build()?;

        Ok(Self {
            config,
            http_client,
        })
    }

    fn params(&self, query: &ReportQuery) -> Vec<(&'static str, String)> {
        let mut params = query.to_params();
        params.push(("source", self.config.source.clone()));
        params.push(("client", self.config.client.clone()));
        params
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get_json(&self, query: &ReportQuery) -> Result<Value, TransportError> {
        let params = self.params(query);

        debug!(
            "GET {} report={} filter={}",
            self.config.base_url,
            query.report_name,
            query.filter.render()
        );

        let response = self
            .http_client
            .get(&self.config.base_url)
            .query(&params)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    TransportError::Timeout(self.config.timeout_seconds)
                } else if e.is_connect() {
                    TransportError::Connect(self.config.base_url.clone())
                } else {
                    TransportError::Request(e)
                }
            })?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(TransportError::Status { status, body });
        }

        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }
}
