//! Port abstraction for rate-limit bookkeeping.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::{ActionKind, RateLimitDecision, RateLimitRecord, UserId};

use super::define_port_error;

define_port_error! {
    /// Errors raised by rate-limit store adapters.
    pub enum RateLimitRepositoryError {
        /// Store connection could not be established.
        Connection { message: String } => "rate limit store connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } => "rate limit store query failed: {message}",
    }
}

/// Durable `(user, action)` attempt records.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RateLimitRepository: Send + Sync {
    /// Fetch the record for `(user_id, action)`.
    async fn find(
        &self,
        user_id: &UserId,
        action: ActionKind,
    ) -> Result<Option<RateLimitRecord>, RateLimitRepositoryError>;

    /// Upsert `last_attempt_at`, leaving `violation_count` untouched on
    /// existing rows and starting it at zero on new ones.
    async fn record_attempt(
        &self,
        user_id: &UserId,
        action: ActionKind,
        at: DateTime<Utc>,
    ) -> Result<(), RateLimitRepositoryError>;

    /// Atomically increment `violation_count`.
    async fn record_violation(
        &self,
        user_id: &UserId,
        action: ActionKind,
    ) -> Result<(), RateLimitRepositoryError>;
}

/// Driving port used by services that gate actions on a cooldown.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RateLimitGate: Send + Sync {
    /// Allow or deny `action` for `user_id`. Never fails.
    async fn check(&self, user_id: &UserId, action: ActionKind) -> RateLimitDecision;
}

/// Gate that allows everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixtureRateLimitGate;

#[async_trait]
impl RateLimitGate for FixtureRateLimitGate {
    async fn check(&self, _user_id: &UserId, _action: ActionKind) -> RateLimitDecision {
        RateLimitDecision::Allow
    }
}
