//! Quiz session state and the watch-time rule.
//!
//! A session moves `Active → Completed` exactly once. Completion records the
//! answer, the reported watch duration, correctness, and whether this
//! session earned the reward for its question.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::UserId;

/// Fraction of the media duration that must be watched.
pub const WATCH_RATIO: f64 = 0.8;
/// Longest accepted question identifier.
pub const QUESTION_ID_MAX: usize = 128;

/// Validation errors for quiz identifiers.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QuizValidationError {
    #[error("question id must not be empty")]
    EmptyQuestionId,
    #[error("question id must be at most {max} characters")]
    QuestionIdTooLong { max: usize },
    #[error("question id must not contain ':' or whitespace")]
    QuestionIdInvalidCharacters,
}

/// Content-store question identifier.
///
/// Question ids take part in signed messages, so the delimiter and
/// whitespace are refused up front.
///
/// # Examples
/// ```
/// use zimbeat_backend::domain::QuestionId;
///
/// assert!(QuestionId::new("q-101").is_ok());
/// assert!(QuestionId::new("q:101").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct QuestionId(String);

impl QuestionId {
    pub fn new(value: impl Into<String>) -> Result<Self, QuizValidationError> {
        let value = value.into();
        if value.is_empty() {
            return Err(QuizValidationError::EmptyQuestionId);
        }
        if value.chars().count() > QUESTION_ID_MAX {
            return Err(QuizValidationError::QuestionIdTooLong {
                max: QUESTION_ID_MAX,
            });
        }
        if value.chars().any(|c| c == ':' || c.is_whitespace()) {
            return Err(QuizValidationError::QuestionIdInvalidCharacters);
        }
        Ok(Self(value))
    }
}

impl AsRef<str> for QuestionId {
    fn as_ref(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for QuestionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for QuestionId {
    type Error = QuizValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<QuestionId> for String {
    fn from(value: QuestionId) -> Self {
        value.0
    }
}

/// Quiz session identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QuizSessionId(Uuid);

impl QuizSessionId {
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for QuizSessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for QuizSessionId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// Read-only question owned by the content store.
///
/// `correct_option_index` only leaves the backend in the reveal for an
/// incorrect answer.
#[derive(Debug, Clone, PartialEq)]
pub struct Question {
    pub id: QuestionId,
    pub correct_option_index: u32,
    pub media_duration_secs: u32,
    pub reward_amount: u64,
}

impl Question {
    /// Seconds of playback required before an answer counts.
    pub fn required_watch_secs(&self) -> f64 {
        f64::from(self.media_duration_secs) * WATCH_RATIO
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Active,
    Completed,
}

impl SessionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Completed => "completed",
        }
    }
}

impl FromStr for SessionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(Self::Active),
            "completed" => Ok(Self::Completed),
            other => Err(format!("unknown session status: {other}")),
        }
    }
}

/// One attempt at one question by one user.
#[derive(Debug, Clone, PartialEq)]
pub struct QuizSession {
    pub id: QuizSessionId,
    pub user_id: UserId,
    pub question_id: QuestionId,
    pub status: SessionStatus,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub is_correct: Option<bool>,
    pub answer_index: Option<u32>,
    pub duration_watched: Option<f64>,
    pub reward_granted: bool,
}

impl QuizSession {
    /// Open a new active session.
    pub fn start(user_id: UserId, question_id: QuestionId, now: DateTime<Utc>) -> Self {
        Self {
            id: QuizSessionId::random(),
            user_id,
            question_id,
            status: SessionStatus::Active,
            started_at: now,
            completed_at: None,
            is_correct: None,
            answer_index: None,
            duration_watched: None,
            reward_granted: false,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == SessionStatus::Active
    }

    /// Wall-clock seconds since the session started, never negative.
    pub fn elapsed_secs(&self, now: DateTime<Utc>) -> f64 {
        let elapsed_ms = (now - self.started_at).num_milliseconds().max(0);
        // Millisecond counts stay far below 2^53.
        elapsed_ms as f64 / 1000.0
    }
}

/// Terminal values written by the `Active → Completed` transition.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionCompletion {
    pub completed_at: DateTime<Utc>,
    pub is_correct: bool,
    pub answer_index: u32,
    pub duration_watched: f64,
    pub reward_granted: bool,
}

/// Whether both the reported and the measured watch time reach the
/// requirement.
pub fn watch_requirement_met(question: &Question, reported_secs: f64, elapsed_secs: f64) -> bool {
    let required = question.required_watch_secs();
    reported_secs >= required && elapsed_secs >= required
}
