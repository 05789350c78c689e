//! PostgreSQL-backed `QuestionRepository` over the read-only content table.

use async_trait::async_trait;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use crate::domain::ports::{QuestionRepository, QuestionRepositoryError};
use crate::domain::{Question, QuestionId};

use super::diesel_basic_error_mapping::{map_basic_diesel_error, map_basic_pool_error};
use super::models::QuestionRow;
use super::pool::{DbPool, PoolError};
use super::schema::questions;

/// Diesel-backed implementation of the question repository port.
#[derive(Clone)]
pub struct DieselQuestionRepository {
    pool: DbPool,
}

impl DieselQuestionRepository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn map_pool_error(error: PoolError) -> QuestionRepositoryError {
    map_basic_pool_error(error, QuestionRepositoryError::connection)
}

fn map_diesel_error(error: diesel::result::Error) -> QuestionRepositoryError {
    map_basic_diesel_error(
        error,
        QuestionRepositoryError::query,
        QuestionRepositoryError::connection,
    )
}

fn row_to_question(row: QuestionRow) -> Result<Question, QuestionRepositoryError> {
    let QuestionRow {
        id,
        correct_option_index,
        media_duration_secs,
        reward_amount,
    } = row;
    let negative =
        |field: &str| QuestionRepositoryError::query(format!("negative {field} for question {id}"));
    let correct_option_index =
        u32::try_from(correct_option_index).map_err(|_| negative("correct_option_index"))?;
    let media_duration_secs =
        u32::try_from(media_duration_secs).map_err(|_| negative("media_duration_secs"))?;
    let reward_amount = u64::try_from(reward_amount).map_err(|_| negative("reward_amount"))?;
    let id = QuestionId::new(id).map_err(|err| QuestionRepositoryError::query(err.to_string()))?;

    Ok(Question {
        id,
        correct_option_index,
        media_duration_secs,
        reward_amount,
    })
}

#[async_trait]
impl QuestionRepository for DieselQuestionRepository {
    async fn find_by_id(&self, id: &QuestionId) -> Result<Option<Question>, QuestionRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let row = questions::table
            .filter(questions::id.eq(id.as_ref()))
            .select(QuestionRow::as_select())
            .first::<QuestionRow>(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;

        row.map(row_to_question).transpose()
    }
}
