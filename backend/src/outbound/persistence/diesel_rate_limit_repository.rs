//! PostgreSQL-backed `RateLimitRepository` implementation using Diesel ORM.
//!
//! `record_attempt` is a single upsert and `record_violation` a single
//! `violation_count + 1` update, so concurrent writers never lose counts.

use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel::upsert::excluded;
use diesel_async::RunQueryDsl;

use crate::domain::ports::{RateLimitRepository, RateLimitRepositoryError};
use crate::domain::{ActionKind, RateLimitRecord, UserId};

use super::diesel_basic_error_mapping::{map_basic_diesel_error, map_basic_pool_error};
use super::models::{NewRateLimitRow, RateLimitRow};
use super::pool::{DbPool, PoolError};
use super::schema::user_rate_limits;

/// Diesel-backed implementation of the rate-limit repository port.
#[derive(Clone)]
pub struct DieselRateLimitRepository {
    pool: DbPool,
}

impl DieselRateLimitRepository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn map_pool_error(error: PoolError) -> RateLimitRepositoryError {
    map_basic_pool_error(error, RateLimitRepositoryError::connection)
}

fn map_diesel_error(error: diesel::result::Error) -> RateLimitRepositoryError {
    map_basic_diesel_error(
        error,
        RateLimitRepositoryError::query,
        RateLimitRepositoryError::connection,
    )
}

fn row_to_record(row: RateLimitRow) -> Result<RateLimitRecord, RateLimitRepositoryError> {
    let action = ActionKind::from_str(&row.action).map_err(RateLimitRepositoryError::query)?;
    Ok(RateLimitRecord {
        user_id: UserId::from_uuid(row.user_id),
        action,
        last_attempt_at: row.last_attempt_at,
        violation_count: row.violation_count,
    })
}

#[async_trait]
impl RateLimitRepository for DieselRateLimitRepository {
    async fn find(
        &self,
        user_id: &UserId,
        action: ActionKind,
    ) -> Result<Option<RateLimitRecord>, RateLimitRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let row = user_rate_limits::table
            .filter(
                user_rate_limits::user_id
                    .eq(user_id.as_uuid())
                    .and(user_rate_limits::action.eq(action.as_str())),
            )
            .select(RateLimitRow::as_select())
            .first::<RateLimitRow>(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;

        row.map(row_to_record).transpose()
    }

    async fn record_attempt(
        &self,
        user_id: &UserId,
        action: ActionKind,
        at: DateTime<Utc>,
    ) -> Result<(), RateLimitRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let new_row = NewRateLimitRow {
            user_id: *user_id.as_uuid(),
            action: action.as_str(),
            last_attempt_at: at,
            violation_count: 0,
        };

        diesel::insert_into(user_rate_limits::table)
            .values(&new_row)
            .on_conflict((user_rate_limits::user_id, user_rate_limits::action))
            .do_update()
            .set(user_rate_limits::last_attempt_at.eq(excluded(user_rate_limits::last_attempt_at)))
            .execute(&mut conn)
            .await
            .map(|_| ())
            .map_err(map_diesel_error)
    }

    async fn record_violation(
        &self,
        user_id: &UserId,
        action: ActionKind,
    ) -> Result<(), RateLimitRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        diesel::update(
            user_rate_limits::table.filter(
                user_rate_limits::user_id
                    .eq(user_id.as_uuid())
                    .and(user_rate_limits::action.eq(action.as_str())),
            ),
        )
        .set(user_rate_limits::violation_count.eq(user_rate_limits::violation_count + 1))
        .execute(&mut conn)
        .await
        .map(|_| ())
        .map_err(map_diesel_error)
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    use super::*;
    use rstest::rstest;
    use uuid::Uuid;

    #[rstest]
    #[case("quiz_submit", ActionKind::QuizSubmit)]
    #[case("tip", ActionKind::Tip)]
    fn row_action_is_parsed(#[case] stored: &str, #[case] expected: ActionKind) {
        let record = row_to_record(RateLimitRow {
            user_id: Uuid::nil(),
            action: stored.to_owned(),
            last_attempt_at: Utc::now(),
            violation_count: 3,
        })
        .expect("valid row");
        assert_eq!(record.action, expected);
        assert_eq!(record.violation_count, 3);
    }

    #[rstest]
    fn unknown_action_is_a_query_error() {
        let err = row_to_record(RateLimitRow {
            user_id: Uuid::nil(),
            action: "dance".to_owned(),
            last_attempt_at: Utc::now(),
            violation_count: 0,
        })
        .expect_err("unknown action");
        assert!(matches!(err, RateLimitRepositoryError::Query { .. }));
    }
}
