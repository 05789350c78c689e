//! Bearer session tokens.
//!
//! Sessions are HS256 JWTs carrying the internal user id, application role,
//! and host user id. Nothing is stored server-side: a token is valid when its
//! signature checks out and the clock is before `exp`.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use mockable::Clock;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::{HostUserId, Role, SecretKey, User, UserId};

/// Default session lifetime.
pub const SESSION_TTL: Duration = Duration::from_secs(24 * 60 * 60);

const AUDIENCE: &str = "authenticated";

/// Why a token was refused.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("session token is malformed or its signature is invalid")]
    Invalid,
    #[error("session token has expired")]
    Expired,
    #[error("session token could not be signed: {0}")]
    Signing(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct TokenClaims {
    sub: UserId,
    aud: String,
    /// Fixed database-facing role; the application role is `app_role`.
    role: String,
    app_role: Role,
    host_user_id: HostUserId,
    iat: i64,
    exp: i64,
}

/// Claims of a validated session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionClaims {
    pub user_id: UserId,
    pub role: Role,
    pub host_user_id: HostUserId,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// A freshly minted session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedSession {
    pub token: String,
    pub claims: SessionClaims,
}

/// Mints and validates session tokens.
pub struct SessionTokens {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl SessionTokens {
    pub fn new(secret: &SecretKey, ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.expose()),
            decoding: DecodingKey::from_secret(secret.expose()),
            ttl,
            clock,
        }
    }

    /// Mint a session for `user`.
    pub fn issue(&self, user: &User) -> Result<IssuedSession, SessionError> {
        let issued_at = self.clock.utc();
        let ttl_secs = i64::try_from(self.ttl.as_secs()).unwrap_or(i64::MAX);
        let exp = issued_at.timestamp().saturating_add(ttl_secs);
        let claims = TokenClaims {
            sub: user.id,
            aud: AUDIENCE.to_owned(),
            role: AUDIENCE.to_owned(),
            app_role: user.role,
            host_user_id: user.host_user_id,
            iat: issued_at.timestamp(),
            exp,
        };
        let token = jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|err| SessionError::Signing(err.to_string()))?;
        Ok(IssuedSession {
            token,
            claims: to_session_claims(&claims)?,
        })
    }

    /// Check signature and expiry.
    pub fn validate(&self, token: &str) -> Result<SessionClaims, SessionError> {
        let mut validation = Validation::new(Algorithm::HS256);
        // Expiry is compared against the injected clock below.
        validation.validate_exp = false;
        validation.set_audience(&[AUDIENCE]);
        validation.set_required_spec_claims(&["exp", "sub", "aud"]);

        let data = jsonwebtoken::decode::<TokenClaims>(token, &self.decoding, &validation)
            .map_err(|err| {
                debug!(error = %err, "session token rejected");
                SessionError::Invalid
            })?;
        if self.clock.utc().timestamp() >= data.claims.exp {
            return Err(SessionError::Expired);
        }
        to_session_claims(&data.claims)
    }
}

fn to_session_claims(claims: &TokenClaims) -> Result<SessionClaims, SessionError> {
    let issued_at = DateTime::from_timestamp(claims.iat, 0).ok_or(SessionError::Invalid)?;
    let expires_at = DateTime::from_timestamp(claims.exp, 0).ok_or(SessionError::Invalid)?;
    Ok(SessionClaims {
        user_id: claims.sub,
        role: claims.app_role,
        host_user_id: claims.host_user_id,
        issued_at,
        expires_at,
    })
}
