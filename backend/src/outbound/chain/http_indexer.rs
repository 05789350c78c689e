//! Reqwest-backed chain indexer adapter.
//!
//! This adapter owns transport details only: URL construction, the bearer
//! API key, timeout and HTTP error mapping, and JSON decoding into
//! [`ChainTransaction`].

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderValue};
use reqwest::{Client, StatusCode};
use tracing::debug;

use super::dto::TransactionDto;
use crate::domain::ports::{ChainIndexer, ChainIndexerError};
use crate::domain::{ChainTransaction, SecretKey, TxHash};

const USER_AGENT: &str = concat!("zimbeat-backend/", env!("CARGO_PKG_VERSION"));

/// Connection settings for [`HttpChainIndexer`].
#[derive(Debug, Clone)]
pub struct ChainIndexerConfig {
    /// Base URL, e.g. `https://tonapi.io/v2`.
    pub endpoint: String,
    pub timeout: Duration,
    pub api_key: Option<SecretKey>,
}

/// Construction failures.
#[derive(Debug, thiserror::Error)]
pub enum HttpChainIndexerBuildError {
    #[error("chain indexer API key is not a valid header value")]
    InvalidApiKey,
    #[error("failed to build chain indexer client: {0}")]
    Client(#[from] reqwest::Error),
}

/// Chain indexer adapter issuing one GET per lookup.
pub struct HttpChainIndexer {
    client: Client,
    endpoint: String,
}

impl HttpChainIndexer {
    /// Build an adapter with a bounded request timeout.
    ///
    /// # Errors
    ///
    /// Returns an error when the API key cannot be sent as a header or the
    /// reqwest client cannot be constructed.
    pub fn new(config: ChainIndexerConfig) -> Result<Self, HttpChainIndexerBuildError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        if let Some(key) = &config.api_key {
            let mut bearer = b"Bearer ".to_vec();
            bearer.extend_from_slice(key.expose());
            let mut value = HeaderValue::from_bytes(&bearer)
                .map_err(|_| HttpChainIndexerBuildError::InvalidApiKey)?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }
        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .build()?;
        Ok(Self {
            client,
            endpoint: config.endpoint.trim_end_matches('/').to_owned(),
        })
    }

    fn transaction_url(&self, tx_hash: &TxHash) -> String {
        format!("{}/blockchain/transactions/{tx_hash}", self.endpoint)
    }
}

#[async_trait]
impl ChainIndexer for HttpChainIndexer {
    async fn fetch_transaction(
        &self,
        tx_hash: &TxHash,
    ) -> Result<Option<ChainTransaction>, ChainIndexerError> {
        let response = self
            .client
            .get(self.transaction_url(tx_hash))
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        let body = response.bytes().await.map_err(map_transport_error)?;
        debug!(%tx_hash, status = status.as_u16(), "chain indexer answered");
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(map_status_error(status, body.as_ref()));
        }
        parse_transaction(body.as_ref(), tx_hash).map(Some)
    }
}

fn parse_transaction(body: &[u8], tx_hash: &TxHash) -> Result<ChainTransaction, ChainIndexerError> {
    let decoded: TransactionDto = serde_json::from_slice(body)
        .map_err(|error| ChainIndexerError::decode(format!("invalid transaction JSON: {error}")))?;
    decoded
        .into_domain(tx_hash.as_ref())
        .map_err(ChainIndexerError::decode)
}

fn map_transport_error(error: reqwest::Error) -> ChainIndexerError {
    if error.is_timeout() {
        ChainIndexerError::timeout(error.to_string())
    } else {
        ChainIndexerError::transport(error.to_string())
    }
}

fn map_status_error(status: StatusCode, body: &[u8]) -> ChainIndexerError {
    let body_preview = body_preview(body);
    let message = if body_preview.is_empty() {
        format!("status {}", status.as_u16())
    } else {
        format!("status {}: {}", status.as_u16(), body_preview)
    };

    match status {
        StatusCode::TOO_MANY_REQUESTS => ChainIndexerError::rate_limited(message),
        StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => {
            ChainIndexerError::timeout(message)
        }
        _ if status.is_client_error() => ChainIndexerError::invalid_request(message),
        _ => ChainIndexerError::transport(message),
    }
}

fn body_preview(body: &[u8]) -> String {
    const PREVIEW_CHAR_LIMIT: usize = 120;

    let compact = String::from_utf8_lossy(body)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    let mut preview: String = compact.chars().take(PREVIEW_CHAR_LIMIT).collect();
    if compact.chars().count() > PREVIEW_CHAR_LIMIT {
        preview.push_str("...");
    }
    preview
}
