//! Quiz integrity service.
//!
//! Implements [`QuizCommand`]: rate-limited session start, and submission
//! that enforces the watch-time rule, completes the session exactly once,
//! and signs a reward claim only for the first correct answer per question.

use std::sync::Arc;

use async_trait::async_trait;
use mockable::Clock;
use tracing::{info, warn};

use crate::domain::ports::{
    QuestionRepository, QuestionRepositoryError, QuizCommand, QuizSessionRepository,
    QuizSessionRepositoryError, RateLimitGate, SubmitAnswerOutcome, SubmitAnswerRequest,
};
use crate::domain::rate_limit::enforce;
use crate::domain::{
    ActionKind, ClaimSigner, Error, QuestionId, QuizSession, QuizSessionId, SessionCompletion,
    UserId, watch_requirement_met,
};

/// Client-facing message for every integrity failure. The cause is logged.
pub const REQUIREMENT_NOT_MET: &str = "Playback requirement not met.";

fn map_session_error(error: QuizSessionRepositoryError) -> Error {
    match error {
        QuizSessionRepositoryError::Connection { message } => {
            Error::upstream_unavailable(format!("quiz session store unavailable: {message}"))
        }
        QuizSessionRepositoryError::Query { message } => {
            Error::internal(format!("quiz session store error: {message}"))
        }
        QuizSessionRepositoryError::RewardAlreadyGranted => {
            Error::integrity_violation(REQUIREMENT_NOT_MET)
        }
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

fn session_not_found() -> Error {
    Error::not_found("Quiz session not found.")
}

/// Quiz service over session and question repositories.
pub struct QuizService<S, Q> {
    sessions: Arc<S>,
    questions: Arc<Q>,
    gate: Arc<dyn RateLimitGate>,
    signer: Arc<ClaimSigner>,
    clock: Arc<dyn Clock>,
}

impl<S, Q> QuizService<S, Q> {
    pub fn new(
        sessions: Arc<S>,
        questions: Arc<Q>,
        gate: Arc<dyn RateLimitGate>,
        signer: Arc<ClaimSigner>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            sessions,
            questions,
            gate,
            signer,
            clock,
        }
    }
}

impl<S, Q> QuizService<S, Q>
where
    S: QuizSessionRepository,
    Q: QuestionRepository,
{
    /// Load a session the caller owns for the declared question.
    ///
    /// Foreign sessions and question mismatches read as "not found" so
    /// session ids cannot be probed.
    async fn owned_session(&self, request: &SubmitAnswerRequest) -> Result<QuizSession, Error> {
        let session = self
            .sessions
            .find_by_id(&request.session_id)
            .await
            .map_err(map_session_error)?
            .ok_or_else(session_not_found)?;

        if session.user_id != request.user_id || session.question_id != request.question_id {
            warn!(
                session_id = %request.session_id,
                user_id = %request.user_id,
                "quiz session does not match caller or question"
            );
            return Err(session_not_found());
        }
        if !session.is_active() {
            info!(session_id = %session.id, "submission for completed quiz session");
            return Err(Error::integrity_violation(REQUIREMENT_NOT_MET));
        }
        Ok(session)
    }

    /// Apply the terminal transition; losing a concurrent completion is an
    /// integrity violation.
    async fn complete(
        &self,
        session_id: &QuizSessionId,
        completion: &SessionCompletion,
    ) -> Result<(), Error> {
        let transitioned = self
            .sessions
            .complete(session_id, completion)
            .await
            .map_err(map_session_error)?;
        if transitioned {
            Ok(())
        } else {
            info!(%session_id, "quiz session completed concurrently");
            Err(Error::integrity_violation(REQUIREMENT_NOT_MET))
        }
    }

    /// Complete a correct session, granting the reward unless another
    /// session holds it. Returns whether this session got the reward.
    async fn complete_correct(
        &self,
        request: &SubmitAnswerRequest,
        mut completion: SessionCompletion,
    ) -> Result<bool, Error> {
        let already_correct = self
            .sessions
            .has_other_correct(&request.user_id, &request.question_id, &request.session_id)
            .await
            .map_err(map_session_error)?;
        completion.reward_granted = !already_correct;

        match self.sessions.complete(&request.session_id, &completion).await {
            Ok(true) => Ok(completion.reward_granted),
            Ok(false) => {
                info!(session_id = %request.session_id, "quiz session completed concurrently");
                Err(Error::integrity_violation(REQUIREMENT_NOT_MET))
            }
            Err(QuizSessionRepositoryError::RewardAlreadyGranted) => {
                info!(
                    session_id = %request.session_id,
                    "reward granted to a concurrent session; completing without reward"
                );
                completion.reward_granted = false;
                self.complete(&request.session_id, &completion).await?;
                Ok(false)
            }
            Err(error) => Err(map_session_error(error)),
        }
    }
}

#[async_trait]
impl<S, Q> QuizCommand for QuizService<S, Q>
where
    S: QuizSessionRepository,
    Q: QuestionRepository,
{
    async fn start(
        &self,
        user_id: &UserId,
        question_id: &QuestionId,
    ) -> Result<QuizSessionId, Error> {
        enforce(self.gate.as_ref(), user_id, ActionKind::QuizStart).await?;

        self.questions
            .find_by_id(question_id)
            .await
            .map_err(map_question_error)?
            .ok_or_else(|| Error::not_found("Question not found."))?;

        let session = QuizSession::start(*user_id, question_id.clone(), self.clock.utc());
        self.sessions
            .create(&session)
            .await
            .map_err(map_session_error)?;
        info!(session_id = %session.id, %user_id, %question_id, "quiz session started");
        Ok(session.id)
    }

    async fn submit(&self, request: SubmitAnswerRequest) -> Result<SubmitAnswerOutcome, Error> {
        if !request.duration_watched.is_finite() || request.duration_watched < 0.0 {
            return Err(Error::invalid_request(
                "durationWatched must be a non-negative number",
            ));
        }
        enforce(self.gate.as_ref(), &request.user_id, ActionKind::QuizSubmit).await?;

        let session = self.owned_session(&request).await?;
        let question = self
            .questions
            .find_by_id(&request.question_id)
            .await
            .map_err(map_question_error)?
            .ok_or_else(|| Error::not_found("Question not found."))?;

        let now = self.clock.utc();
        let elapsed = session.elapsed_secs(now);
        let mut completion = SessionCompletion {
            completed_at: now,
            is_correct: false,
            answer_index: request.answer_index,
            duration_watched: request.duration_watched,
            reward_granted: false,
        };

        if !watch_requirement_met(&question, request.duration_watched, elapsed) {
            info!(
                session_id = %session.id,
                required_secs = question.required_watch_secs(),
                reported_secs = request.duration_watched,
                elapsed_secs = elapsed,
                "watch-time requirement not met"
            );
            self.complete(&session.id, &completion).await?;
            return Ok(SubmitAnswerOutcome::RequirementNotMet);
        }

        if request.answer_index != question.correct_option_index {
            self.complete(&session.id, &completion).await?;
            return Ok(SubmitAnswerOutcome::Incorrect {
                correct_answer_index: question.correct_option_index,
            });
        }

        completion.is_correct = true;
        if !self.complete_correct(&request, completion).await? {
            return Ok(SubmitAnswerOutcome::AlreadyClaimed);
        }

        let claim = self
            .signer
            .sign_claim(&request.user_id, question.reward_amount, &session.id)
            .map_err(|err| Error::internal(format!("claim message rejected: {err}")))?;
        info!(session_id = %session.id, user_id = %request.user_id, "reward claim signed");
        Ok(SubmitAnswerOutcome::Rewarded {
            reward_amount: claim.reward_amount,
            signature: claim.signature,
            claim: claim.template,
        })
    }
}

#[cfg(test)]
#[path = "quiz_service_tests.rs"]
mod tests;
