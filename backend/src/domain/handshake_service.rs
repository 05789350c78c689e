//! Identity handshake service.
//!
//! Verifies the host assertion, finds or creates the user, refreshes display
//! fields in the background, and mints a session.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, warn};

use crate::domain::ports::{
    BackgroundTasks, HandshakeOutcome, IdentityHandshake, UserPersistenceError, UserRepository,
};
use crate::domain::{Error, IdentityError, IdentityVerifier, SessionTokens, User, VerifiedIdentity};

fn map_user_error(error: UserPersistenceError) -> Error {
    match error {
        UserPersistenceError::Connection { message } => {
            Error::upstream_unavailable(format!("user repository unavailable: {message}"))
        }
        UserPersistenceError::Query { message } => {
            Error::internal(format!("user repository error: {message}"))
        }
        UserPersistenceError::DuplicateHostUser { host_user_id } => {
            Error::internal(format!("user {host_user_id} vanished after insert conflict"))
        }
    }
}

fn map_identity_error(error: IdentityError) -> Error {
    match error {
        IdentityError::Empty | IdentityError::TooLong { .. } => {
            Error::invalid_request(error.to_string())
        }
        other => {
            info!(reason = %other, "identity assertion rejected");
            Error::unauthorized("Identity verification failed.")
        }
    }
}

/// Handshake service over a user repository.
pub struct HandshakeService<U> {
    verifier: Arc<IdentityVerifier>,
    users: Arc<U>,
    tokens: Arc<SessionTokens>,
    tasks: Arc<dyn BackgroundTasks>,
}

impl<U> HandshakeService<U> {
    pub fn new(
        verifier: Arc<IdentityVerifier>,
        users: Arc<U>,
        tokens: Arc<SessionTokens>,
        tasks: Arc<dyn BackgroundTasks>,
    ) -> Self {
        Self {
            verifier,
            users,
            tokens,
            tasks,
        }
    }
}

impl<U> HandshakeService<U>
where
    U: UserRepository + 'static,
{
    async fn find_or_create(&self, identity: &VerifiedIdentity) -> Result<User, Error> {
        if let Some(mut existing) = self
            .users
            .find_by_host_id(identity.host_user_id)
            .await
            .map_err(map_user_error)?
        {
            self.refresh_profile(&existing, identity);
            existing.profile = identity.profile.clone();
            return Ok(existing);
        }

        let user = User::first_seen(identity.host_user_id, identity.profile.clone());
        match self.users.insert(&user).await {
            Ok(()) => {
                info!(user_id = %user.id, host_user_id = %user.host_user_id, "user created");
                Ok(user)
            }
            Err(UserPersistenceError::DuplicateHostUser { host_user_id }) => {
                // A concurrent handshake created the row first.
                self.users
                    .find_by_host_id(identity.host_user_id)
                    .await
                    .map_err(map_user_error)?
                    .ok_or_else(|| {
                        map_user_error(UserPersistenceError::duplicate_host_user(host_user_id))
                    })
            }
            Err(error) => Err(map_user_error(error)),
        }
    }

    fn refresh_profile(&self, existing: &User, identity: &VerifiedIdentity) {
        if existing.profile == identity.profile {
            return;
        }
        let users = Arc::clone(&self.users);
        let user_id = existing.id;
        let profile = identity.profile.clone();
        self.tasks.dispatch(
            "users.update_profile",
            Box::pin(async move {
                if let Err(error) = users.update_profile(&user_id, &profile).await {
                    warn!(%user_id, %error, "profile refresh failed");
                }
            }),
        );
    }
}

#[async_trait]
impl<U> IdentityHandshake for HandshakeService<U>
where
    U: UserRepository + 'static,
{
    async fn handshake(&self, init_data: &str) -> Result<HandshakeOutcome, Error> {
        let identity = self.verifier.verify(init_data).map_err(map_identity_error)?;
        let user = self.find_or_create(&identity).await?;
        let session = self
            .tokens
            .issue(&user)
            .map_err(|err| Error::internal(err.to_string()))?;
        Ok(HandshakeOutcome { session, user })
    }
}

#[cfg(test)]
#[path = "handshake_service_tests.rs"]
mod tests;
