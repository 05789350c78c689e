//! Port abstraction for user persistence adapters and their errors.
use async_trait::async_trait;

use crate::domain::{HostProfile, HostUserId, User, UserId};

use super::define_port_error;

define_port_error! {
    /// Persistence errors raised by user repository adapters.
    pub enum UserPersistenceError {
        /// Repository connection could not be established.
        Connection { message: String } => "user repository connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } => "user repository query failed: {message}",
        /// Another handshake inserted the same host account first.
        DuplicateHostUser { host_user_id: i64 } => "host user {host_user_id} already exists",
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Fetch a user by the host-assigned account id.
    async fn find_by_host_id(
        &self,
        host_user_id: HostUserId,
    ) -> Result<Option<User>, UserPersistenceError>;

    /// Insert a first-seen user.
    ///
    /// Fails with [`UserPersistenceError::DuplicateHostUser`] when the host
    /// account already has a row.
    async fn insert(&self, user: &User) -> Result<(), UserPersistenceError>;

    /// Overwrite the display fields of an existing user. Role and wallet are
    /// left alone.
    async fn update_profile(
        &self,
        id: &UserId,
        profile: &HostProfile,
    ) -> Result<(), UserPersistenceError>;
}
