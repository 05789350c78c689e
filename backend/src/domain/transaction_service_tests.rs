//! Tests for the transaction verification service.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use rstest::{fixture, rstest};
use serde_json::{Value, json};

use super::*;
use crate::domain::ports::{
    FixtureRateLimitGate, MockRateLimitGate, MockTransactionRepository,
};
use crate::domain::{
    ClaimTemplateConfig, ErrorCode, Question, QuizSession, RateLimitDecision, SecretKey,
    SessionStatus,
};
use crate::outbound::memory::InMemoryStore;
use crate::test_support::{MutableClock, ScriptedChainIndexer, chain_transfer};

const TIP_HASH: &str = "tiphash001";
const CLAIM_HASH: &str = "claimhash001";

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 6, 1, 12, 0, 0)
        .single()
        .expect("valid timestamp")
}

fn question_id() -> QuestionId {
    QuestionId::new("Q1").expect("valid question id")
}

struct Harness {
    store: Arc<InMemoryStore>,
    indexer: Arc<ScriptedChainIndexer>,
    signer: Arc<ClaimSigner>,
    user: UserId,
    session_id: QuizSessionId,
}

impl Harness {
    fn service(&self, policy: VerificationPolicy) -> TransactionService<InMemoryStore, InMemoryStore, InMemoryStore> {
        self.service_with_gate(policy, Arc::new(FixtureRateLimitGate))
    }

    fn service_with_gate(
        &self,
        policy: VerificationPolicy,
        gate: Arc<dyn RateLimitGate>,
    ) -> TransactionService<InMemoryStore, InMemoryStore, InMemoryStore> {
        TransactionService::new(
            Arc::clone(&self.store),
            Arc::clone(&self.store),
            Arc::clone(&self.store),
            TransactionServiceDeps {
                indexer: Arc::clone(&self.indexer) as Arc<dyn ChainIndexer>,
                gate,
                signer: Arc::clone(&self.signer),
                policy,
                clock: Arc::new(MutableClock::new(now())),
            },
        )
    }

    fn claim_signature(&self, amount: u64) -> String {
        self.signer
            .signature(&self.user, amount, &self.session_id)
            .expect("unambiguous claim")
    }

    fn request(&self, hash: &str, kind: TransactionKind, metadata: Value) -> VerifyTransactionRequest {
        VerifyTransactionRequest {
            user_id: self.user,
            tx_hash: TxHash::new(hash).expect("valid hash"),
            kind,
            metadata,
        }
    }
}

#[fixture]
fn harness() -> Harness {
    let store = Arc::new(InMemoryStore::default());
    store.put_question(Question {
        id: question_id(),
        correct_option_index: 2,
        media_duration_secs: 15,
        reward_amount: 10,
    });
    let user = UserId::random();
    let mut session = QuizSession::start(user, question_id(), now());
    session.status = SessionStatus::Completed;
    session.completed_at = Some(now());
    session.is_correct = Some(true);
    session.reward_granted = true;
    let session_id = session.id;
    store.put_session(session);

    let clock = Arc::new(MutableClock::new(now()));
    let signer = Arc::new(ClaimSigner::new(
        SecretKey::from("claim-secret"),
        ClaimTemplateConfig {
            treasury_address: Some("EQTreasury".into()),
            fee_nanotons: 50_000_000,
            validity: Duration::from_secs(600),
        },
        clock,
    ));
    Harness {
        store,
        indexer: Arc::new(ScriptedChainIndexer::default()),
        signer,
        user,
        session_id,
    }
}

#[rstest]
#[tokio::test]
async fn valid_claim_is_confirmed_then_replayed_idempotently(harness: Harness) {
    let signature = harness.claim_signature(10);
    harness.indexer.insert(chain_transfer(
        CLAIM_HASH,
        50_000_000,
        &format!("claim:{signature}"),
    ));
    let service = harness.service(VerificationPolicy::default());
    let metadata = json!({ "questionId": "Q1" });

    let first = service
        .verify(harness.request(CLAIM_HASH, TransactionKind::QuizReward, metadata.clone()))
        .await
        .expect("claim confirmed");
    assert_eq!(first.status, TransactionStatus::Confirmed);
    assert!(!first.replayed);

    let second = service
        .verify(harness.request(CLAIM_HASH, TransactionKind::QuizReward, metadata))
        .await
        .expect("replay is idempotent");
    assert_eq!(second.status, TransactionStatus::Confirmed);
    assert!(second.replayed);

    assert_eq!(harness.store.transaction_count(), 1);
    assert_eq!(harness.indexer.calls().len(), 1);
    let record = harness
        .store
        .transaction(CLAIM_HASH)
        .expect("record stored");
    assert_eq!(record.claim_session_id, Some(harness.session_id));
    assert_eq!(record.amount, 50_000_000);
}

#[rstest]
#[tokio::test]
async fn claim_signed_over_a_different_amount_is_rejected(harness: Harness) {
    let forged = harness.claim_signature(1_000);
    harness.indexer.insert(chain_transfer(
        CLAIM_HASH,
        50_000_000,
        &format!("claim:{forged}"),
    ));
    let err = harness
        .service(VerificationPolicy::default())
        .verify(harness.request(
            CLAIM_HASH,
            TransactionKind::QuizReward,
            json!({ "questionId": "Q1" }),
        ))
        .await
        .expect_err("forged amount");
    assert_eq!(err.code(), ErrorCode::Rejected);
    assert_eq!(harness.store.transaction_count(), 0);
}

#[rstest]
#[case::plausible_hex("abababababababababababababababababababababababababababababababab")]
#[case::not_hex("definitely-not-a-signature")]
#[tokio::test]
async fn made_up_signature_is_rejected(harness: Harness, #[case] signature: &str) {
    harness.indexer.insert(chain_transfer(
        CLAIM_HASH,
        50_000_000,
        &format!("claim:{signature}"),
    ));
    let err = harness
        .service(VerificationPolicy::default())
        .verify(harness.request(
            CLAIM_HASH,
            TransactionKind::QuizReward,
            json!({ "questionId": "Q1" }),
        ))
        .await
        .expect_err("made-up signature");
    assert_eq!(err.code(), ErrorCode::Rejected);
}

#[rstest]
#[tokio::test]
async fn claim_for_another_question_is_rejected(harness: Harness) {
    harness.store.put_question(Question {
        id: QuestionId::new("Q2").expect("valid id"),
        correct_option_index: 0,
        media_duration_secs: 10,
        reward_amount: 10,
    });
    let signature = harness.claim_signature(10);
    harness.indexer.insert(chain_transfer(
        CLAIM_HASH,
        50_000_000,
        &format!("claim:{signature}"),
    ));
    let err = harness
        .service(VerificationPolicy::default())
        .verify(harness.request(
            CLAIM_HASH,
            TransactionKind::QuizReward,
            json!({ "questionId": "Q2" }),
        ))
        .await
        .expect_err("no rewarded session for Q2");
    assert_eq!(err.code(), ErrorCode::Rejected);
}

#[rstest]
#[tokio::test]
async fn claim_below_fee_floor_is_rejected(harness: Harness) {
    let signature = harness.claim_signature(10);
    harness.indexer.insert(chain_transfer(
        CLAIM_HASH,
        9_999_999,
        &format!("claim:{signature}"),
    ));
    let err = harness
        .service(VerificationPolicy::default())
        .verify(harness.request(
            CLAIM_HASH,
            TransactionKind::QuizReward,
            json!({ "questionId": "Q1" }),
        ))
        .await
        .expect_err("fee too low");
    assert_eq!(err.code(), ErrorCode::Rejected);
}

#[rstest]
#[tokio::test]
async fn claim_to_wrong_destination_is_rejected(harness: Harness) {
    let signature = harness.claim_signature(10);
    let mut transfer = chain_transfer(CLAIM_HASH, 50_000_000, &format!("claim:{signature}"));
    transfer.destination = Some("0:elsewhere".into());
    harness.indexer.insert(transfer);

    let policy = VerificationPolicy {
        treasury_destination: Some("0:TREASURY".into()),
        ..VerificationPolicy::default()
    };
    let err = harness
        .service(policy)
        .verify(harness.request(
            CLAIM_HASH,
            TransactionKind::QuizReward,
            json!({ "questionId": "Q1" }),
        ))
        .await
        .expect_err("wrong destination");
    assert_eq!(err.code(), ErrorCode::Rejected);
}

#[rstest]
#[tokio::test]
async fn second_hash_for_same_claim_is_an_integrity_violation(harness: Harness) {
    let signature = harness.claim_signature(10);
    let comment = format!("claim:{signature}");
    harness
        .indexer
        .insert(chain_transfer(CLAIM_HASH, 50_000_000, &comment));
    harness
        .indexer
        .insert(chain_transfer("claimhash002", 50_000_000, &comment));
    let service = harness.service(VerificationPolicy::default());
    let metadata = json!({ "questionId": "Q1" });

    service
        .verify(harness.request(CLAIM_HASH, TransactionKind::QuizReward, metadata.clone()))
        .await
        .expect("first claim confirmed");
    let err = service
        .verify(harness.request("claimhash002", TransactionKind::QuizReward, metadata))
        .await
        .expect_err("double claim");
    assert_eq!(err.code(), ErrorCode::IntegrityViolation);
    assert_eq!(err.message(), REQUIREMENT_NOT_MET);
}

#[rstest]
#[tokio::test]
async fn tip_with_marker_and_amount_is_confirmed(harness: Harness) {
    harness
        .indexer
        .insert(chain_transfer(TIP_HASH, 10_000_000, "Tip for post p-7 from a fan"));
    let response = harness
        .service(VerificationPolicy::default())
        .verify(harness.request(TIP_HASH, TransactionKind::Tip, json!({ "postId": "p-7" })))
        .await
        .expect("tip confirmed");
    assert_eq!(response.status, TransactionStatus::Confirmed);
}

#[rstest]
#[case::wrong_post("Tip for post p-8", 10_000_000)]
#[case::no_marker("hello", 10_000_000)]
#[case::too_small("Tip for post p-7", 9_999_999)]
#[tokio::test]
async fn tip_mismatches_are_rejected(
    harness: Harness,
    #[case] comment: &str,
    #[case] amount: u128,
) {
    harness
        .indexer
        .insert(chain_transfer(TIP_HASH, amount, comment));
    let err = harness
        .service(VerificationPolicy::default())
        .verify(harness.request(TIP_HASH, TransactionKind::Tip, json!({ "postId": "p-7" })))
        .await
        .expect_err("tip rejected");
    assert_eq!(err.code(), ErrorCode::Rejected);
}

#[rstest]
#[tokio::test]
async fn tips_pass_the_rate_limiter_first(harness: Harness) {
    let mut gate = MockRateLimitGate::new();
    gate.expect_check()
        .withf(|_, action| *action == ActionKind::Tip)
        .return_once(|_, _| RateLimitDecision::Deny {
            retry_after_seconds: 9,
        });
    let err = harness
        .service_with_gate(VerificationPolicy::default(), Arc::new(gate))
        .verify(harness.request(TIP_HASH, TransactionKind::Tip, json!({ "postId": "p-7" })))
        .await
        .expect_err("rate limited");
    assert_eq!(err.code(), ErrorCode::RateLimited);
    assert!(harness.indexer.calls().is_empty());
}

#[rstest]
#[tokio::test]
async fn unknown_hash_is_a_retryable_rejection(harness: Harness) {
    let err = harness
        .service(VerificationPolicy::default())
        .verify(harness.request(TIP_HASH, TransactionKind::Tip, json!({ "postId": "p-7" })))
        .await
        .expect_err("not indexed");
    assert_eq!(err.code(), ErrorCode::Rejected);
    assert_eq!(
        err.details().and_then(|d| d.get("retryable")),
        Some(&json!(true))
    );
}

#[rstest]
#[case::throttled(ChainIndexerError::rate_limited("429"))]
#[case::timeout(ChainIndexerError::timeout("5s"))]
#[case::transport(ChainIndexerError::transport("reset"))]
#[tokio::test]
async fn indexer_failures_are_upstream_unavailable(
    #[case] error: ChainIndexerError,
    harness: Harness,
) {
    let harness = Harness {
        indexer: Arc::new(ScriptedChainIndexer::default().with_error(TIP_HASH, error)),
        ..harness
    };
    let err = harness
        .service(VerificationPolicy::default())
        .verify(harness.request(TIP_HASH, TransactionKind::Tip, json!({ "postId": "p-7" })))
        .await
        .expect_err("indexer failure");
    assert_eq!(err.code(), ErrorCode::UpstreamUnavailable);
    assert!(err.code().is_retryable());
}

#[rstest]
#[tokio::test]
async fn indexer_refusal_is_a_retryable_rejection(harness: Harness) {
    let harness = Harness {
        indexer: Arc::new(
            ScriptedChainIndexer::default()
                .with_error(TIP_HASH, ChainIndexerError::invalid_request("status 400")),
        ),
        ..harness
    };
    let err = harness
        .service(VerificationPolicy::default())
        .verify(harness.request(TIP_HASH, TransactionKind::Tip, json!({ "postId": "p-7" })))
        .await
        .expect_err("indexer refused");
    assert_eq!(err.code(), ErrorCode::Rejected);
    assert_eq!(
        err.details().and_then(|d| d.get("retryable")),
        Some(&json!(true))
    );
}

#[rstest]
#[tokio::test]
async fn hex_hash_in_another_case_is_replayed(harness: Harness) {
    for hash in ["abcdef0123", "ABCDEF0123"] {
        harness
            .indexer
            .insert(chain_transfer(hash, 10_000_000, "Tip for post p-7"));
    }
    let service = harness.service(VerificationPolicy::default());
    let metadata = json!({ "postId": "p-7" });

    let first = service
        .verify(harness.request("abcdef0123", TransactionKind::Tip, metadata.clone()))
        .await
        .expect("tip confirmed");
    let second = service
        .verify(harness.request("ABCDEF0123", TransactionKind::Tip, metadata))
        .await
        .expect("same tip replayed");

    assert!(!first.replayed);
    assert!(second.replayed);
    assert_eq!(harness.store.transaction_count(), 1);
    assert_eq!(harness.indexer.calls().len(), 1);
}

#[rstest]
#[tokio::test]
async fn record_is_keyed_by_the_indexer_hash(harness: Harness) {
    harness
        .indexer
        .insert(chain_transfer("ABCDEF0123", 10_000_000, "Tip for post p-7"));
    let response = harness
        .service(VerificationPolicy::default())
        .verify(harness.request("ABCDEF0123", TransactionKind::Tip, json!({ "postId": "p-7" })))
        .await
        .expect("tip confirmed");
    assert_eq!(response.status, TransactionStatus::Confirmed);

    assert!(harness.store.transaction("abcdef0123").is_some());
    assert!(harness.store.transaction("ABCDEF0123").is_none());
}

#[rstest]
#[tokio::test]
async fn failed_chain_transaction_is_rejected(harness: Harness) {
    let mut transfer = chain_transfer(TIP_HASH, 10_000_000, "Tip for post p-7");
    transfer.success = false;
    harness.indexer.insert(transfer);
    let err = harness
        .service(VerificationPolicy::default())
        .verify(harness.request(TIP_HASH, TransactionKind::Tip, json!({ "postId": "p-7" })))
        .await
        .expect_err("failed on chain");
    assert_eq!(err.code(), ErrorCode::Rejected);
}

#[rstest]
#[tokio::test]
async fn hash_credited_to_another_user_is_a_conflict(harness: Harness) {
    harness
        .indexer
        .insert(chain_transfer(TIP_HASH, 10_000_000, "Tip for post p-7"));
    let service = harness.service(VerificationPolicy::default());
    service
        .verify(harness.request(TIP_HASH, TransactionKind::Tip, json!({ "postId": "p-7" })))
        .await
        .expect("first user credited");

    let mut other = harness.request(TIP_HASH, TransactionKind::Tip, json!({ "postId": "p-7" }));
    other.user_id = UserId::random();
    let err = service.verify(other).await.expect_err("foreign hash");
    assert_eq!(err.code(), ErrorCode::Conflict);
}

#[rstest]
#[tokio::test]
async fn lost_insert_race_reports_winner_verdict(harness: Harness) {
    harness
        .indexer
        .insert(chain_transfer(TIP_HASH, 10_000_000, "Tip for post p-7"));
    let user = harness.user;
    let mut transactions = MockTransactionRepository::new();
    let mut seq = mockall::Sequence::new();
    transactions
        .expect_find_by_hash()
        .times(1)
        .in_sequence(&mut seq)
        .return_once(|_| Ok(None));
    transactions
        .expect_insert()
        .times(1)
        .in_sequence(&mut seq)
        .return_once(|_| Err(TransactionRepositoryError::duplicate_hash(TIP_HASH)));
    transactions
        .expect_find_by_hash()
        .times(1)
        .in_sequence(&mut seq)
        .return_once(move |_| {
            Ok(Some(TransactionRecord {
                tx_hash: TxHash::new(TIP_HASH).expect("valid hash"),
                user_id: user,
                kind: TransactionKind::Tip,
                metadata: json!({ "postId": "p-7" }),
                amount: 10_000_000,
                status: TransactionStatus::Confirmed,
                claim_session_id: None,
                created_at: now(),
            }))
        });

    let service = TransactionService::new(
        Arc::new(transactions),
        Arc::clone(&harness.store),
        Arc::clone(&harness.store),
        TransactionServiceDeps {
            indexer: Arc::clone(&harness.indexer) as Arc<dyn ChainIndexer>,
            gate: Arc::new(FixtureRateLimitGate),
            signer: Arc::clone(&harness.signer),
            policy: VerificationPolicy::default(),
            clock: Arc::new(MutableClock::new(now())),
        },
    );
    let response = service
        .verify(harness.request(TIP_HASH, TransactionKind::Tip, json!({ "postId": "p-7" })))
        .await
        .expect("treated as already processed");
    assert!(response.replayed);
}

#[rstest]
#[case(TransactionKind::Tip, json!({}))]
#[case(TransactionKind::QuizReward, json!({ "questionId": 7 }))]
#[tokio::test]
async fn missing_metadata_is_invalid_request(
    harness: Harness,
    #[case] kind: TransactionKind,
    #[case] metadata: Value,
) {
    let err = harness
        .service(VerificationPolicy::default())
        .verify(harness.request(TIP_HASH, kind, metadata))
        .await
        .expect_err("metadata missing");
    assert_eq!(err.code(), ErrorCode::InvalidRequest);
}
