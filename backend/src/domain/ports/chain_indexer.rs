//! Port for looking up chain transactions by hash.

use async_trait::async_trait;

use crate::domain::{ChainTransaction, TxHash};

use super::define_port_error;

define_port_error! {
    /// Errors raised by chain indexer adapters.
    pub enum ChainIndexerError {
        /// The indexer did not answer within the configured timeout.
        Timeout { message: String } => "chain indexer timed out: {message}",
        /// Network or unexpected HTTP failure.
        Transport { message: String } => "chain indexer transport failed: {message}",
        /// The indexer throttled the request.
        RateLimited { message: String } => "chain indexer rate limited: {message}",
        /// The indexer refused the request as malformed.
        InvalidRequest { message: String } => "chain indexer rejected request: {message}",
        /// The response body could not be decoded.
        Decode { message: String } => "chain indexer response invalid: {message}",
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ChainIndexer: Send + Sync {
    /// Fetch a transaction. `Ok(None)` means the indexer does not know the
    /// hash (yet).
    async fn fetch_transaction(
        &self,
        tx_hash: &TxHash,
    ) -> Result<Option<ChainTransaction>, ChainIndexerError>;
}
