//! Driving port for quiz rounds.

use async_trait::async_trait;

use crate::domain::{ClaimTemplate, Error, QuestionId, QuizSessionId, UserId};

/// Answer submission for an active session.
#[derive(Debug, Clone, PartialEq)]
pub struct SubmitAnswerRequest {
    pub user_id: UserId,
    pub session_id: QuizSessionId,
    pub question_id: QuestionId,
    pub answer_index: u32,
    /// Client-reported playback seconds.
    pub duration_watched: f64,
}

/// Result of a submission that reached a terminal state.
#[derive(Debug, Clone, PartialEq)]
pub enum SubmitAnswerOutcome {
    /// Watch-time check failed; the session is completed as incorrect.
    RequirementNotMet,
    /// Wrong answer; the correct index is revealed.
    Incorrect { correct_answer_index: u32 },
    /// Correct and first for this question; a claim was signed.
    Rewarded {
        reward_amount: u64,
        signature: String,
        claim: Option<ClaimTemplate>,
    },
    /// Correct, but an earlier session already earned the reward.
    AlreadyClaimed,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait QuizCommand: Send + Sync {
    /// Open an active session for `question_id`.
    async fn start(
        &self,
        user_id: &UserId,
        question_id: &QuestionId,
    ) -> Result<QuizSessionId, Error>;

    /// Complete a session with an answer.
    async fn submit(&self, request: SubmitAnswerRequest) -> Result<SubmitAnswerOutcome, Error>;
}
