//! PostgreSQL-backed `TransactionRepository` implementation using Diesel ORM.
//!
//! The unique constraints on `tx_hash` and `claim_session_id` are the replay
//! boundary. Violations are reported by constraint name so the verifier can
//! tell a replayed hash from a second claim on one session.

use std::str::FromStr;

use async_trait::async_trait;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use crate::domain::ports::{TransactionRepository, TransactionRepositoryError};
use crate::domain::{
    QuizSessionId, TransactionKind, TransactionRecord, TransactionStatus, TxHash, UserId,
};

use super::diesel_basic_error_mapping::{
    map_basic_diesel_error, map_basic_pool_error, unique_violation,
};
use super::models::{NewTransactionRow, TransactionRow};
use super::pool::{DbPool, PoolError};
use super::schema::transactions;

const TX_HASH_CONSTRAINT: &str = "transactions_tx_hash_key";
const CLAIM_SESSION_CONSTRAINT: &str = "transactions_claim_session_id_key";

/// Diesel-backed implementation of the transaction repository port.
#[derive(Clone)]
pub struct DieselTransactionRepository {
    pool: DbPool,
}

impl DieselTransactionRepository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn map_pool_error(error: PoolError) -> TransactionRepositoryError {
    map_basic_pool_error(error, TransactionRepositoryError::connection)
}

fn map_diesel_error(error: diesel::result::Error) -> TransactionRepositoryError {
    map_basic_diesel_error(
        error,
        TransactionRepositoryError::query,
        TransactionRepositoryError::connection,
    )
}

fn map_insert_error(
    error: diesel::result::Error,
    record: &TransactionRecord,
) -> TransactionRepositoryError {
    match (unique_violation(&error), record.claim_session_id) {
        (Some(CLAIM_SESSION_CONSTRAINT), Some(session_id)) => {
            TransactionRepositoryError::duplicate_claim(session_id.to_string())
        }
        (Some(TX_HASH_CONSTRAINT | ""), _) => {
            TransactionRepositoryError::duplicate_hash(record.tx_hash.to_string())
        }
        _ => map_diesel_error(error),
    }
}

fn row_to_record(row: TransactionRow) -> Result<TransactionRecord, TransactionRepositoryError> {
    let tx_hash = TxHash::new(row.tx_hash)
        .map_err(|err| TransactionRepositoryError::query(err.to_string()))?;
    let kind = TransactionKind::from_str(&row.kind).map_err(TransactionRepositoryError::query)?;
    let status =
        TransactionStatus::from_str(&row.status).map_err(TransactionRepositoryError::query)?;
    let amount = u128::try_from(row.amount)
        .map_err(|_| TransactionRepositoryError::query("negative amount in transactions row"))?;

    Ok(TransactionRecord {
        tx_hash,
        user_id: UserId::from_uuid(row.user_id),
        kind,
        metadata: row.metadata,
        amount,
        status,
        claim_session_id: row.claim_session_id.map(QuizSessionId::from_uuid),
        created_at: row.created_at,
    })
}

#[async_trait]
impl TransactionRepository for DieselTransactionRepository {
    async fn find_by_hash(
        &self,
        tx_hash: &TxHash,
    ) -> Result<Option<TransactionRecord>, TransactionRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let row = transactions::table
            .filter(transactions::tx_hash.eq(tx_hash.as_ref()))
            .select(TransactionRow::as_select())
            .first::<TransactionRow>(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;

        row.map(row_to_record).transpose()
    }

    async fn insert(&self, record: &TransactionRecord) -> Result<(), TransactionRepositoryError> {
        let amount = i64::try_from(record.amount).map_err(|_| {
            TransactionRepositoryError::query(format!("amount out of range: {}", record.amount))
        })?;
        let new_row = NewTransactionRow {
            tx_hash: record.tx_hash.as_ref(),
            user_id: *record.user_id.as_uuid(),
            kind: record.kind.as_str(),
            metadata: &record.metadata,
            amount,
            status: record.status.as_str(),
            claim_session_id: record.claim_session_id.map(|id| *id.as_uuid()),
            created_at: record.created_at,
        };
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        diesel::insert_into(transactions::table)
            .values(&new_row)
            .execute(&mut conn)
            .await
            .map(|_| ())
            .map_err(|err| map_insert_error(err, record))
    }
}
