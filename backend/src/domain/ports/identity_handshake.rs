//! Driving port for the identity handshake.
//!
//! Inbound adapters hand over the raw host assertion and get back a bearer
//! session; verification, user upsert, and token minting stay behind the
//! port.

use async_trait::async_trait;

use crate::domain::{Error, IssuedSession, User};

/// Successful handshake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandshakeOutcome {
    pub session: IssuedSession,
    pub user: User,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait IdentityHandshake: Send + Sync {
    /// Verify `init_data`, upsert the user, and mint a session.
    async fn handshake(&self, init_data: &str) -> Result<HandshakeOutcome, Error>;
}
