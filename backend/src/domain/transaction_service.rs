//! Transaction verification service.
//!
//! Order of checks: request shape, tip rate limit, replay lookup, chain
//! lookup, type-specific validation, insert. Records are keyed by the
//! canonical form of the hash the indexer reports. The insert's uniqueness
//! constraints are the final authority; a duplicate-hash conflict for the
//! same user is reported as an idempotent success.

use std::sync::Arc;

use async_trait::async_trait;
use mockable::Clock;
use serde_json::json;
use tracing::{info, warn};

use crate::domain::ports::{
    ChainIndexer, ChainIndexerError, QuestionRepository, QuestionRepositoryError,
    QuizSessionRepository, QuizSessionRepositoryError, RateLimitGate, TransactionRepository,
    TransactionRepositoryError, TransactionVerification, VerifyTransactionRequest,
    VerifyTransactionResponse,
};
use crate::domain::rate_limit::enforce;
use crate::domain::reward::CLAIM_PAYLOAD_PREFIX;
use crate::domain::{
    ActionKind, ChainTransaction, ClaimSigner, Error, QuestionId, QuizSessionId,
    REQUIREMENT_NOT_MET, TransactionKind, TransactionRecord, TransactionStatus, TxHash, UserId,
    VerificationTarget, tip_marker,
};

/// Minimum value for tips and claim transactions (0.01 TON).
pub const DEFAULT_MIN_AMOUNT_NANOTONS: u128 = 10_000_000;

/// Amount floors and destination rules.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationPolicy {
    pub tip_floor_nanotons: u128,
    pub claim_floor_nanotons: u128,
    /// When set, claim transactions must be addressed here, in the form the
    /// indexer reports destinations.
    pub treasury_destination: Option<String>,
}

impl Default for VerificationPolicy {
    fn default() -> Self {
        Self {
            tip_floor_nanotons: DEFAULT_MIN_AMOUNT_NANOTONS,
            claim_floor_nanotons: DEFAULT_MIN_AMOUNT_NANOTONS,
            treasury_destination: None,
        }
    }
}

fn map_transaction_error(error: TransactionRepositoryError) -> Error {
    match error {
        TransactionRepositoryError::Connection { message } => {
            Error::upstream_unavailable(format!("transaction store unavailable: {message}"))
        }
        TransactionRepositoryError::Query { message } => {
            Error::internal(format!("transaction store error: {message}"))
        }
        TransactionRepositoryError::DuplicateHash { .. } => {
            Error::conflict("Transaction already processed.")
        }
        TransactionRepositoryError::DuplicateClaim { session_id } => {
            warn!(%session_id, "claim session already credited");
            Error::integrity_violation(REQUIREMENT_NOT_MET)
        }
    }
}

fn map_session_error(error: QuizSessionRepositoryError) -> Error {
    match error {
        QuizSessionRepositoryError::Connection { message } => {
            Error::upstream_unavailable(format!("quiz session store unavailable: {message}"))
        }
        other => Error::internal(format!("quiz session store error: {other}")),
    }
}

fn map_question_error(error: QuestionRepositoryError) -> Error {
    match error {
        QuestionRepositoryError::Connection { message } => {
            Error::upstream_unavailable(format!("question store unavailable: {message}"))
        }
        QuestionRepositoryError::Query { message } => {
            Error::internal(format!("question store error: {message}"))
        }
    }
}

fn map_indexer_error(error: ChainIndexerError) -> Error {
    warn!(%error, "chain indexer lookup failed");
    match error {
        ChainIndexerError::InvalidRequest { .. } => Error::rejected(
            "Transaction could not be looked up on chain.",
        )
        .with_details(json!({ "reason": "indexer_rejected", "retryable": true })),
        ChainIndexerError::RateLimited { .. } => {
            Error::upstream_unavailable("Blockchain API busy, please try again shortly.")
                .with_details(json!({ "retryable": true }))
        }
        _ => Error::upstream_unavailable("Blockchain API unavailable, please try again shortly.")
            .with_details(json!({ "retryable": true })),
    }
}

fn reject(reason: &'static str, message: &str) -> Error {
    Error::rejected(message).with_details(json!({ "reason": reason }))
}

/// Transaction verifier over transaction, session, and question stores.
pub struct TransactionService<T, S, Q> {
    transactions: Arc<T>,
    sessions: Arc<S>,
    questions: Arc<Q>,
    indexer: Arc<dyn ChainIndexer>,
    gate: Arc<dyn RateLimitGate>,
    signer: Arc<ClaimSigner>,
    policy: VerificationPolicy,
    clock: Arc<dyn Clock>,
}

/// Collaborators of [`TransactionService`] that are not repositories.
pub struct TransactionServiceDeps {
    pub indexer: Arc<dyn ChainIndexer>,
    pub gate: Arc<dyn RateLimitGate>,
    pub signer: Arc<ClaimSigner>,
    pub policy: VerificationPolicy,
    pub clock: Arc<dyn Clock>,
}

impl<T, S, Q> TransactionService<T, S, Q> {
    pub fn new(
        transactions: Arc<T>,
        sessions: Arc<S>,
        questions: Arc<Q>,
        deps: TransactionServiceDeps,
    ) -> Self {
        Self {
            transactions,
            sessions,
            questions,
            indexer: deps.indexer,
            gate: deps.gate,
            signer: deps.signer,
            policy: deps.policy,
            clock: deps.clock,
        }
    }
}

impl<T, S, Q> TransactionService<T, S, Q>
where
    T: TransactionRepository,
    S: QuizSessionRepository,
    Q: QuestionRepository,
{
    /// Replay verdict for an existing record.
    fn replay(
        existing: &TransactionRecord,
        user_id: &UserId,
    ) -> Result<VerifyTransactionResponse, Error> {
        if existing.status == TransactionStatus::Confirmed && existing.user_id == *user_id {
            info!(tx_hash = %existing.tx_hash, "transaction already confirmed");
            return Ok(VerifyTransactionResponse {
                status: TransactionStatus::Confirmed,
                replayed: true,
            });
        }
        warn!(
            tx_hash = %existing.tx_hash,
            %user_id,
            owner = %existing.user_id,
            "transaction hash claimed by another verification"
        );
        Err(Error::conflict("Transaction already processed."))
    }

    async fn find_existing(&self, tx_hash: &TxHash) -> Result<Option<TransactionRecord>, Error> {
        self.transactions
            .find_by_hash(tx_hash)
            .await
            .map_err(map_transaction_error)
    }

    async fn fetch(&self, tx_hash: &TxHash) -> Result<ChainTransaction, Error> {
        let chain_tx = self
            .indexer
            .fetch_transaction(tx_hash)
            .await
            .map_err(map_indexer_error)?
            .ok_or_else(|| {
                Error::rejected("Transaction not found on chain yet.")
                    .with_details(json!({ "reason": "not_indexed", "retryable": true }))
            })?;
        if !chain_tx.success {
            return Err(reject("failed_on_chain", "Transaction failed on chain."));
        }
        Ok(chain_tx)
    }

    fn check_tip(&self, chain_tx: &ChainTransaction, post_id: &str) -> Result<(), Error> {
        let marker = tip_marker(post_id);
        let has_marker = chain_tx
            .comment
            .as_deref()
            .is_some_and(|comment| comment.contains(&marker));
        if !has_marker {
            return Err(reject("comment_mismatch", "Tip comment does not match post."));
        }
        if chain_tx.amount < self.policy.tip_floor_nanotons {
            return Err(reject("amount_too_low", "Tip amount below minimum."));
        }
        Ok(())
    }

    /// Re-derive the claim signature from stored truth and compare.
    async fn check_claim(
        &self,
        chain_tx: &ChainTransaction,
        user_id: &UserId,
        question_id: &QuestionId,
    ) -> Result<QuizSessionId, Error> {
        if let Some(treasury) = &self.policy.treasury_destination {
            let addressed_to_treasury = chain_tx
                .destination
                .as_deref()
                .is_some_and(|destination| destination.eq_ignore_ascii_case(treasury));
            if !addressed_to_treasury {
                return Err(reject("wrong_destination", "Claim not sent to treasury."));
            }
        }

        let presented = chain_tx
            .comment
            .as_deref()
            .map(str::trim)
            .and_then(|comment| comment.strip_prefix(CLAIM_PAYLOAD_PREFIX))
            .ok_or_else(|| reject("comment_mismatch", "Invalid claim payload."))?;

        let session = self
            .sessions
            .latest_rewarded(user_id, question_id)
            .await
            .map_err(map_session_error)?
            .ok_or_else(|| reject("no_eligible_session", "No reward-eligible quiz session."))?;
        let question = self
            .questions
            .find_by_id(question_id)
            .await
            .map_err(map_question_error)?
            .ok_or_else(|| Error::not_found("Question not found."))?;

        if !self
            .signer
            .verify_claim(user_id, question.reward_amount, &session.id, presented)
        {
            info!(%user_id, %question_id, "claim signature mismatch");
            return Err(reject("signature_mismatch", "Invalid claim signature."));
        }
        if chain_tx.amount < self.policy.claim_floor_nanotons {
            return Err(reject("amount_too_low", "Claim fee below minimum."));
        }
        Ok(session.id)
    }

    async fn persist(
        &self,
        record: TransactionRecord,
    ) -> Result<VerifyTransactionResponse, Error> {
        match self.transactions.insert(&record).await {
            Ok(()) => {
                info!(
                    tx_hash = %record.tx_hash,
                    user_id = %record.user_id,
                    kind = %record.kind,
                    "transaction confirmed"
                );
                Ok(VerifyTransactionResponse {
                    status: TransactionStatus::Confirmed,
                    replayed: false,
                })
            }
            Err(TransactionRepositoryError::DuplicateHash { .. }) => {
                // Lost an insert race; the winner's row decides.
                let existing = self
                    .transactions
                    .find_by_hash(&record.tx_hash)
                    .await
                    .map_err(map_transaction_error)?
                    .ok_or_else(|| Error::conflict("Transaction already processed."))?;
                Self::replay(&existing, &record.user_id)
            }
            Err(error) => Err(map_transaction_error(error)),
        }
    }
}

#[async_trait]
impl<T, S, Q> TransactionVerification for TransactionService<T, S, Q>
where
    T: TransactionRepository,
    S: QuizSessionRepository,
    Q: QuestionRepository,
{
    async fn verify(
        &self,
        request: VerifyTransactionRequest,
    ) -> Result<VerifyTransactionResponse, Error> {
        let target = VerificationTarget::from_metadata(request.kind, &request.metadata)
            .map_err(|err| Error::invalid_request(err.to_string()))?;
        if request.kind == TransactionKind::Tip {
            enforce(self.gate.as_ref(), &request.user_id, ActionKind::Tip).await?;
        }

        let requested_key = request.tx_hash.canonical();
        if let Some(existing) = self.find_existing(&requested_key).await? {
            return Self::replay(&existing, &request.user_id);
        }

        let chain_tx = self.fetch(&request.tx_hash).await?;
        // The indexer's hash is authoritative for the stored key.
        let tx_hash = TxHash::new(chain_tx.hash.as_str())
            .map_or_else(|_| requested_key.clone(), |hash| hash.canonical());
        let indexed = if tx_hash == requested_key {
            None
        } else {
            self.find_existing(&tx_hash).await?
        };
        if let Some(existing) = indexed {
            return Self::replay(&existing, &request.user_id);
        }

        let claim_session_id = match &target {
            VerificationTarget::Tip { post_id } => {
                self.check_tip(&chain_tx, post_id)?;
                None
            }
            VerificationTarget::QuizReward { question_id } => Some(
                self.check_claim(&chain_tx, &request.user_id, question_id)
                    .await?,
            ),
        };

        self.persist(TransactionRecord {
            tx_hash,
            user_id: request.user_id,
            kind: request.kind,
            metadata: request.metadata,
            amount: chain_tx.amount,
            status: TransactionStatus::Confirmed,
            claim_session_id,
            created_at: self.clock.utc(),
        })
        .await
    }
}

#[cfg(test)]
#[path = "transaction_service_tests.rs"]
mod tests;
