//! Port abstraction for quiz session persistence.

use async_trait::async_trait;

use crate::domain::{QuestionId, QuizSession, QuizSessionId, SessionCompletion, UserId};

use super::define_port_error;

define_port_error! {
    /// Errors raised by quiz session repository adapters.
    pub enum QuizSessionRepositoryError {
        /// Repository connection could not be established.
        Connection { message: String } => "quiz session repository connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } => "quiz session repository query failed: {message}",
        /// Another session for the same user and question already holds the
        /// reward.
        RewardAlreadyGranted => "reward already granted for this question",
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait QuizSessionRepository: Send + Sync {
    /// Persist a newly started session.
    async fn create(&self, session: &QuizSession) -> Result<(), QuizSessionRepositoryError>;

    async fn find_by_id(
        &self,
        id: &QuizSessionId,
    ) -> Result<Option<QuizSession>, QuizSessionRepositoryError>;

    /// Move an active session to completed.
    ///
    /// Returns `false` without writing when the session is no longer active.
    /// A `reward_granted` completion fails with
    /// [`QuizSessionRepositoryError::RewardAlreadyGranted`] when another
    /// session for the same user and question already holds the reward; the
    /// session stays active in that case.
    async fn complete(
        &self,
        id: &QuizSessionId,
        completion: &SessionCompletion,
    ) -> Result<bool, QuizSessionRepositoryError>;

    /// Whether a session other than `excluding` answered this question
    /// correctly for this user.
    async fn has_other_correct(
        &self,
        user_id: &UserId,
        question_id: &QuestionId,
        excluding: &QuizSessionId,
    ) -> Result<bool, QuizSessionRepositoryError>;

    /// Most recently completed session that was correct and earned the
    /// reward.
    async fn latest_rewarded(
        &self,
        user_id: &UserId,
        question_id: &QuestionId,
    ) -> Result<Option<QuizSession>, QuizSessionRepositoryError>;
}
