//! PostgreSQL-backed `UserRepository` implementation using Diesel ORM.

use std::str::FromStr;

use async_trait::async_trait;
use chrono::Utc;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use tracing::warn;

use crate::domain::ports::{UserPersistenceError, UserRepository};
use crate::domain::{HostProfile, HostUserId, Role, User, UserId};

use super::diesel_basic_error_mapping::{
    map_basic_diesel_error, map_basic_pool_error, unique_violation,
};
use super::models::{NewUserRow, UserProfileUpdate, UserRow};
use super::pool::{DbPool, PoolError};
use super::schema::users;

const HOST_USER_ID_CONSTRAINT: &str = "users_host_user_id_key";

/// Diesel-backed implementation of the user repository port.
#[derive(Clone)]
pub struct DieselUserRepository {
    pool: DbPool,
}

impl DieselUserRepository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn map_pool_error(error: PoolError) -> UserPersistenceError {
    map_basic_pool_error(error, UserPersistenceError::connection)
}

fn map_diesel_error(error: diesel::result::Error) -> UserPersistenceError {
    map_basic_diesel_error(
        error,
        UserPersistenceError::query,
        UserPersistenceError::connection,
    )
}

fn map_insert_error(error: diesel::result::Error, host_user_id: HostUserId) -> UserPersistenceError {
    match unique_violation(&error) {
        Some(HOST_USER_ID_CONSTRAINT | "") => {
            UserPersistenceError::duplicate_host_user(host_user_id.get())
        }
        _ => map_diesel_error(error),
    }
}

fn row_to_user(row: UserRow) -> Result<User, UserPersistenceError> {
    let role = Role::from_str(&row.role).map_err(|err| {
        warn!(user_id = %row.id, role = %row.role, "unknown role in users row");
        UserPersistenceError::query(err.to_string())
    })?;
    Ok(User {
        id: UserId::from_uuid(row.id),
        host_user_id: HostUserId::new(row.host_user_id),
        role,
        wallet_address: row.wallet_address,
        profile: HostProfile {
            first_name: row.first_name,
            last_name: row.last_name,
            username: row.username,
            language_code: row.language_code,
            is_premium: row.is_premium,
        },
    })
}

#[async_trait]
impl UserRepository for DieselUserRepository {
    async fn find_by_host_id(
        &self,
        host_user_id: HostUserId,
    ) -> Result<Option<User>, UserPersistenceError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let row = users::table
            .filter(users::host_user_id.eq(host_user_id.get()))
            .select(UserRow::as_select())
            .first::<UserRow>(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;

        row.map(row_to_user).transpose()
    }

    async fn insert(&self, user: &User) -> Result<(), UserPersistenceError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let profile = &user.profile;
        let new_row = NewUserRow {
            id: *user.id.as_uuid(),
            host_user_id: user.host_user_id.get(),
            role: user.role.as_str(),
            wallet_address: user.wallet_address.as_deref(),
            first_name: &profile.first_name,
            last_name: profile.last_name.as_deref(),
            username: profile.username.as_deref(),
            language_code: profile.language_code.as_deref(),
            is_premium: profile.is_premium,
        };

        diesel::insert_into(users::table)
            .values(&new_row)
            .execute(&mut conn)
            .await
            .map(|_| ())
            .map_err(|err| map_insert_error(err, user.host_user_id))
    }

    async fn update_profile(
        &self,
        id: &UserId,
        profile: &HostProfile,
    ) -> Result<(), UserPersistenceError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let changes = UserProfileUpdate {
            first_name: &profile.first_name,
            last_name: profile.last_name.as_deref(),
            username: profile.username.as_deref(),
            language_code: profile.language_code.as_deref(),
            is_premium: profile.is_premium,
            updated_at: Utc::now(),
        };

        diesel::update(users::table.filter(users::id.eq(id.as_uuid())))
            .set(&changes)
            .execute(&mut conn)
            .await
            .map(|_| ())
            .map_err(map_diesel_error)
    }
}
