//! PostgreSQL-backed `QuizSessionRepository` implementation using Diesel ORM.
//!
//! Completion is a conditional `UPDATE ... WHERE status = 'active'`; the
//! partial unique index `quiz_sessions_single_reward_idx` rejects a second
//! rewarded session for the same user and question.

use std::str::FromStr;

use async_trait::async_trait;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use crate::domain::ports::{QuizSessionRepository, QuizSessionRepositoryError};
use crate::domain::{
    QuestionId, QuizSession, QuizSessionId, SessionCompletion, SessionStatus, UserId,
};

use super::diesel_basic_error_mapping::{
    map_basic_diesel_error, map_basic_pool_error, unique_violation,
};
use super::models::{QuizSessionCompletion, QuizSessionRow};
use super::pool::{DbPool, PoolError};
use super::schema::quiz_sessions;

const SINGLE_REWARD_INDEX: &str = "quiz_sessions_single_reward_idx";

/// Diesel-backed implementation of the quiz session repository port.
#[derive(Clone)]
pub struct DieselQuizSessionRepository {
    pool: DbPool,
}

impl DieselQuizSessionRepository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn map_pool_error(error: PoolError) -> QuizSessionRepositoryError {
    map_basic_pool_error(error, QuizSessionRepositoryError::connection)
}

fn map_diesel_error(error: diesel::result::Error) -> QuizSessionRepositoryError {
    map_basic_diesel_error(
        error,
        QuizSessionRepositoryError::query,
        QuizSessionRepositoryError::connection,
    )
}

fn map_complete_error(error: diesel::result::Error) -> QuizSessionRepositoryError {
    match unique_violation(&error) {
        Some(SINGLE_REWARD_INDEX | "") => QuizSessionRepositoryError::reward_already_granted(),
        _ => map_diesel_error(error),
    }
}

fn to_column_int(value: u32, field: &str) -> Result<i32, QuizSessionRepositoryError> {
    i32::try_from(value)
        .map_err(|_| QuizSessionRepositoryError::query(format!("{field} out of range: {value}")))
}

fn session_to_row(session: &QuizSession) -> Result<QuizSessionRow, QuizSessionRepositoryError> {
    Ok(QuizSessionRow {
        id: *session.id.as_uuid(),
        user_id: *session.user_id.as_uuid(),
        question_id: session.question_id.to_string(),
        status: session.status.as_str().to_owned(),
        started_at: session.started_at,
        completed_at: session.completed_at,
        is_correct: session.is_correct,
        answer_index: session
            .answer_index
            .map(|index| to_column_int(index, "answer_index"))
            .transpose()?,
        duration_watched: session.duration_watched,
        reward_granted: session.reward_granted,
    })
}

fn row_to_session(row: QuizSessionRow) -> Result<QuizSession, QuizSessionRepositoryError> {
    let question_id = QuestionId::new(row.question_id)
        .map_err(|err| QuizSessionRepositoryError::query(err.to_string()))?;
    let status = SessionStatus::from_str(&row.status).map_err(QuizSessionRepositoryError::query)?;
    let answer_index = row
        .answer_index
        .map(u32::try_from)
        .transpose()
        .map_err(|_| QuizSessionRepositoryError::query("negative answer_index in quiz_sessions"))?;

    Ok(QuizSession {
        id: QuizSessionId::from_uuid(row.id),
        user_id: UserId::from_uuid(row.user_id),
        question_id,
        status,
        started_at: row.started_at,
        completed_at: row.completed_at,
        is_correct: row.is_correct,
        answer_index,
        duration_watched: row.duration_watched,
        reward_granted: row.reward_granted,
    })
}

#[async_trait]
impl QuizSessionRepository for DieselQuizSessionRepository {
    async fn create(&self, session: &QuizSession) -> Result<(), QuizSessionRepositoryError> {
        let row = session_to_row(session)?;
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        diesel::insert_into(quiz_sessions::table)
            .values(&row)
            .execute(&mut conn)
            .await
            .map(|_| ())
            .map_err(map_diesel_error)
    }

    async fn find_by_id(
        &self,
        id: &QuizSessionId,
    ) -> Result<Option<QuizSession>, QuizSessionRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let row = quiz_sessions::table
            .filter(quiz_sessions::id.eq(id.as_uuid()))
            .select(QuizSessionRow::as_select())
            .first::<QuizSessionRow>(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;

        row.map(row_to_session).transpose()
    }

    async fn complete(
        &self,
        id: &QuizSessionId,
        completion: &SessionCompletion,
    ) -> Result<bool, QuizSessionRepositoryError> {
        let changes = QuizSessionCompletion {
            status: SessionStatus::Completed.as_str(),
            completed_at: completion.completed_at,
            is_correct: completion.is_correct,
            answer_index: to_column_int(completion.answer_index, "answer_index")?,
            duration_watched: completion.duration_watched,
            reward_granted: completion.reward_granted,
        };
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let updated = diesel::update(
            quiz_sessions::table.filter(
                quiz_sessions::id
                    .eq(id.as_uuid())
                    .and(quiz_sessions::status.eq(SessionStatus::Active.as_str())),
            ),
        )
        .set(&changes)
        .execute(&mut conn)
        .await
        .map_err(map_complete_error)?;

        Ok(updated == 1)
    }

    async fn has_other_correct(
        &self,
        user_id: &UserId,
        question_id: &QuestionId,
        excluding: &QuizSessionId,
    ) -> Result<bool, QuizSessionRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        diesel::select(diesel::dsl::exists(
            quiz_sessions::table.filter(
                quiz_sessions::user_id
                    .eq(user_id.as_uuid())
                    .and(quiz_sessions::question_id.eq(question_id.as_ref()))
                    .and(quiz_sessions::id.ne(excluding.as_uuid()))
                    .and(quiz_sessions::is_correct.eq(true)),
            ),
        ))
        .get_result::<bool>(&mut conn)
        .await
        .map_err(map_diesel_error)
    }

    async fn latest_rewarded(
        &self,
        user_id: &UserId,
        question_id: &QuestionId,
    ) -> Result<Option<QuizSession>, QuizSessionRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let row = quiz_sessions::table
            .filter(
                quiz_sessions::user_id
                    .eq(user_id.as_uuid())
                    .and(quiz_sessions::question_id.eq(question_id.as_ref()))
                    .and(quiz_sessions::is_correct.eq(true))
                    .and(quiz_sessions::reward_granted.eq(true)),
            )
            .order(quiz_sessions::completed_at.desc().nulls_last())
            .select(QuizSessionRow::as_select())
            .first::<QuizSessionRow>(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;

        row.map(row_to_session).transpose()
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    use super::*;
    use chrono::Utc;
    use diesel::result::{DatabaseErrorKind, Error as DieselError};
    use rstest::rstest;

    #[rstest]
    fn session_survives_row_conversion() {
        let mut session =
            QuizSession::start(UserId::random(), QuestionId::new("q-1").expect("id"), Utc::now());
        session.status = SessionStatus::Completed;
        session.answer_index = Some(2);
        session.is_correct = Some(true);

        let row = session_to_row(&session).expect("row");
        assert_eq!(row.status, "completed");
        assert_eq!(row_to_session(row).expect("session"), session);
    }

    #[rstest]
    fn oversized_answer_index_is_rejected() {
        let err = to_column_int(u32::MAX, "answer_index").expect_err("out of range");
        assert!(matches!(err, QuizSessionRepositoryError::Query { .. }));
    }

    #[rstest]
    fn reward_index_violation_maps_to_reward_already_granted() {
        let error = DieselError::DatabaseError(
            DatabaseErrorKind::UniqueViolation,
            Box::new("duplicate key".to_owned()),
        );
        assert_eq!(
            map_complete_error(error),
            QuizSessionRepositoryError::RewardAlreadyGranted
        );
    }
}
