//! Chain indexer outbound adapters.
//!
//! This module provides a thin HTTP implementation of the `ChainIndexer`
//! port against a TON API style `/blockchain/transactions/{hash}` endpoint.

mod dto;
mod http_indexer;

pub use http_indexer::{ChainIndexerConfig, HttpChainIndexer, HttpChainIndexerBuildError};
