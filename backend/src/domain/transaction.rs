//! Transaction records and the shapes the verifier reasons about.
//!
//! A [`TransactionRecord`] exists at most once per [`TxHash`]; that
//! uniqueness is the replay-protection boundary and is enforced by the store.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

use crate::domain::{QuestionId, QuizSessionId, UserId};

/// Longest accepted transaction hash.
pub const TX_HASH_MAX: usize = 128;

/// Validation errors for verification requests.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransactionValidationError {
    #[error("transaction hash must not be empty")]
    EmptyHash,
    #[error("transaction hash must be at most {max} characters")]
    HashTooLong { max: usize },
    #[error("transaction hash may only contain letters, digits, '-', '_', or '='")]
    HashInvalidCharacters,
    #[error("metadata.postId is required for tips")]
    MissingPostId,
    #[error("metadata.questionId is required for quiz rewards")]
    MissingQuestionId,
    #[error("metadata.questionId is invalid: {0}")]
    InvalidQuestionId(String),
}

/// Chain transaction hash as reported by the client.
///
/// # Examples
/// ```
/// use zimbeat_backend::domain::TxHash;
///
/// assert!(TxHash::new("9f2c0a").is_ok());
/// assert!(TxHash::new("../etc").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TxHash(String);

impl TxHash {
    pub fn new(value: impl Into<String>) -> Result<Self, TransactionValidationError> {
        let value = value.into();
        if value.is_empty() {
            return Err(TransactionValidationError::EmptyHash);
        }
        if value.len() > TX_HASH_MAX {
            return Err(TransactionValidationError::HashTooLong { max: TX_HASH_MAX });
        }
        if !value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '='))
        {
            return Err(TransactionValidationError::HashInvalidCharacters);
        }
        Ok(Self(value))
    }

    /// Storage key for this hash. Hex hashes are case-insensitive on chain,
    /// so they are lowercased; other encodings are kept verbatim.
    ///
    /// ```
    /// use zimbeat_backend::domain::TxHash;
    ///
    /// let upper = TxHash::new("ABCDEF0123").expect("valid hash");
    /// assert_eq!(upper.canonical().as_ref(), "abcdef0123");
    /// ```
    #[must_use]
    pub fn canonical(&self) -> Self {
        if self.0.chars().all(|c| c.is_ascii_hexdigit()) {
            Self(self.0.to_ascii_lowercase())
        } else {
            self.clone()
        }
    }
}

impl AsRef<str> for TxHash {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TxHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for TxHash {
    type Error = TransactionValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<TxHash> for String {
    fn from(value: TxHash) -> Self {
        value.0
    }
}

/// Declared purpose of a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    Tip,
    QuizReward,
}

impl TransactionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Tip => "tip",
            Self::QuizReward => "quiz_reward",
        }
    }
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "tip" => Ok(Self::Tip),
            "quiz_reward" => Ok(Self::QuizReward),
            other => Err(format!("unknown transaction type: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    Pending,
    Confirmed,
    Failed,
}

impl TransactionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::Failed => "failed",
        }
    }
}

impl FromStr for TransactionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "confirmed" => Ok(Self::Confirmed),
            "failed" => Ok(Self::Failed),
            other => Err(format!("unknown transaction status: {other}")),
        }
    }
}

/// Persisted, credited transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionRecord {
    pub tx_hash: TxHash,
    pub user_id: UserId,
    pub kind: TransactionKind,
    pub metadata: Value,
    /// Nanotons.
    pub amount: u128,
    pub status: TransactionStatus,
    /// Quiz session a `quiz_reward` credits. Unique across records.
    pub claim_session_id: Option<QuizSessionId>,
    pub created_at: DateTime<Utc>,
}

/// Transaction as the chain indexer reports it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainTransaction {
    pub hash: String,
    pub success: bool,
    /// Value of the incoming message in nanotons.
    pub amount: u128,
    pub comment: Option<String>,
    pub destination: Option<String>,
}

/// Type-specific fields extracted from request metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerificationTarget {
    Tip { post_id: String },
    QuizReward { question_id: QuestionId },
}

impl VerificationTarget {
    /// Pull the fields the declared kind requires out of `metadata`.
    ///
    /// `postId` may be a string or a number; blank strings count as missing.
    pub fn from_metadata(
        kind: TransactionKind,
        metadata: &Value,
    ) -> Result<Self, TransactionValidationError> {
        match kind {
            TransactionKind::Tip => {
                let post_id = match metadata.get("postId") {
                    Some(Value::String(text)) if !text.trim().is_empty() => text.trim().to_owned(),
                    Some(Value::Number(number)) => number.to_string(),
                    _ => return Err(TransactionValidationError::MissingPostId),
                };
                Ok(Self::Tip { post_id })
            }
            TransactionKind::QuizReward => {
                let raw = metadata
                    .get("questionId")
                    .and_then(Value::as_str)
                    .ok_or(TransactionValidationError::MissingQuestionId)?;
                let question_id = QuestionId::new(raw).map_err(|err| {
                    TransactionValidationError::InvalidQuestionId(err.to_string())
                })?;
                Ok(Self::QuizReward { question_id })
            }
        }
    }
}

/// Comment marker a tip transaction must carry.
pub fn tip_marker(post_id: &str) -> String {
    format!("Tip for post {post_id}")
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    #[rstest]
    #[case("")]
    #[case("has space")]
    #[case("slash/")]
    fn tx_hash_rejects_unsafe_input(#[case] raw: &str) {
        assert!(TxHash::new(raw).is_err());
    }

    #[test]
    fn tx_hash_accepts_base64url_and_hex() {
        assert!(TxHash::new("a1B2-c3_d4=").is_ok());
        assert!(TxHash::new("f".repeat(64)).is_ok());
        assert!(TxHash::new("f".repeat(TX_HASH_MAX + 1)).is_err());
    }

    #[rstest]
    #[case("ABCDEF0123", "abcdef0123")]
    #[case("abcdef0123", "abcdef0123")]
    #[case("a1B2-c3_d4=", "a1B2-c3_d4=")]
    fn canonical_hash_folds_hex_case_only(#[case] raw: &str, #[case] expected: &str) {
        let hash = TxHash::new(raw).expect("valid hash");
        assert_eq!(hash.canonical().as_ref(), expected);
    }

    #[rstest]
    #[case(json!({"postId": "p-9"}), "p-9")]
    #[case(json!({"postId": 42}), "42")]
    #[case(json!({"postId": "  p-9 "}), "p-9")]
    fn tip_metadata_accepts_string_or_number(#[case] metadata: Value, #[case] expected: &str) {
        let target = VerificationTarget::from_metadata(TransactionKind::Tip, &metadata)
            .expect("post id present");
        assert_eq!(
            target,
            VerificationTarget::Tip {
                post_id: expected.to_owned()
            }
        );
    }

    #[rstest]
    #[case(json!({}))]
    #[case(json!({"postId": " "}))]
    #[case(json!({"postId": null}))]
    fn tip_metadata_requires_post_id(#[case] metadata: Value) {
        assert_eq!(
            VerificationTarget::from_metadata(TransactionKind::Tip, &metadata),
            Err(TransactionValidationError::MissingPostId)
        );
    }

    #[test]
    fn quiz_metadata_validates_question_id() {
        let err = VerificationTarget::from_metadata(
            TransactionKind::QuizReward,
            &json!({"questionId": "q:1"}),
        )
        .expect_err("delimiter refused");
        assert!(matches!(err, TransactionValidationError::InvalidQuestionId(_)));
    }

    #[test]
    fn kind_text_round_trips() {
        for kind in [TransactionKind::Tip, TransactionKind::QuizReward] {
            assert_eq!(kind.as_str().parse::<TransactionKind>(), Ok(kind));
        }
    }
}
