//! Port abstraction for credited transaction records.

use async_trait::async_trait;

use crate::domain::{TransactionRecord, TxHash};

use super::define_port_error;

define_port_error! {
    /// Errors raised by transaction repository adapters.
    pub enum TransactionRepositoryError {
        /// Repository connection could not be established.
        Connection { message: String } => "transaction repository connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } => "transaction repository query failed: {message}",
        /// A record with this hash already exists.
        DuplicateHash { tx_hash: String } => "transaction {tx_hash} already recorded",
        /// The quiz session was already credited by another transaction.
        DuplicateClaim { session_id: String } => "quiz session {session_id} already claimed",
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TransactionRepository: Send + Sync {
    async fn find_by_hash(
        &self,
        tx_hash: &TxHash,
    ) -> Result<Option<TransactionRecord>, TransactionRepositoryError>;

    /// Insert a record. Uniqueness of `tx_hash` and of `claim_session_id`
    /// is enforced here and reported through the `Duplicate*` variants.
    async fn insert(&self, record: &TransactionRecord) -> Result<(), TransactionRepositoryError>;
}
