//! Driving port for transaction verification.

use async_trait::async_trait;
use serde_json::Value;

use crate::domain::{Error, TransactionKind, TransactionStatus, TxHash, UserId};

#[derive(Debug, Clone, PartialEq)]
pub struct VerifyTransactionRequest {
    pub user_id: UserId,
    pub tx_hash: TxHash,
    pub kind: TransactionKind,
    pub metadata: Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VerifyTransactionResponse {
    pub status: TransactionStatus,
    /// The hash was already credited to this user by an earlier call.
    pub replayed: bool,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TransactionVerification: Send + Sync {
    /// Confirm a chain transaction and credit it exactly once.
    async fn verify(
        &self,
        request: VerifyTransactionRequest,
    ) -> Result<VerifyTransactionResponse, Error>;
}
