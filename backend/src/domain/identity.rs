//! Host identity assertion verification.
//!
//! The messaging host hands the mini-app a URL-encoded `initData` string.
//! Its `hash` field is an HMAC-SHA256 over the remaining fields, keyed with
//! `HMAC-SHA256(key = "WebAppData", message = bot_token)`. A verified
//! assertion yields the host user id and display profile; nothing is
//! persisted here.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use mockable::Clock;
use serde::Deserialize;
use tracing::debug;

use crate::domain::signature::{hmac_sha256, verify_bytes};
use crate::domain::{HostProfile, HostUserId, SecretKey};

/// Longest accepted `initData` payload in bytes.
pub const MAX_ASSERTION_BYTES: usize = 2000;
/// Assertions older than this are stale.
pub const MAX_ASSERTION_AGE_SECS: i64 = 86_400;
/// Tolerated forward clock skew on `auth_date`.
pub const MAX_FUTURE_SKEW_SECS: i64 = 300;

const KEY_DERIVATION_LABEL: &[u8] = b"WebAppData";

/// Reasons an assertion is refused.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdentityError {
    #[error("identity assertion is empty")]
    Empty,
    #[error("identity assertion exceeds {max} bytes")]
    TooLong { max: usize },
    #[error("identity assertion has no hash")]
    MissingHash,
    #[error("identity assertion is stale")]
    Stale,
    #[error("identity assertion is dated in the future")]
    FromFuture,
    #[error("identity assertion signature mismatch")]
    SignatureMismatch,
    #[error("identity assertion has no user")]
    MissingUser,
    #[error("identity assertion user is malformed")]
    MalformedUser,
}

/// Identity extracted from a verified assertion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedIdentity {
    pub host_user_id: HostUserId,
    pub profile: HostProfile,
    pub auth_date: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
struct HostUserPayload {
    id: i64,
    #[serde(default)]
    first_name: String,
    last_name: Option<String>,
    username: Option<String>,
    language_code: Option<String>,
    #[serde(default)]
    is_premium: bool,
}

/// Verifies `initData` assertions for one bot deployment.
pub struct IdentityVerifier {
    derived_key: SecretKey,
    clock: Arc<dyn Clock>,
}

impl IdentityVerifier {
    pub fn new(bot_token: &SecretKey, clock: Arc<dyn Clock>) -> Self {
        let derived = hmac_sha256(KEY_DERIVATION_LABEL, bot_token.expose());
        Self {
            derived_key: SecretKey::new(derived.to_vec()),
            clock,
        }
    }

    /// Verify `init_data` and extract the host identity.
    ///
    /// The user payload is only parsed after the signature matches.
    pub fn verify(&self, init_data: &str) -> Result<VerifiedIdentity, IdentityError> {
        if init_data.trim().is_empty() {
            return Err(IdentityError::Empty);
        }
        if init_data.len() > MAX_ASSERTION_BYTES {
            return Err(IdentityError::TooLong {
                max: MAX_ASSERTION_BYTES,
            });
        }

        let mut hash = None;
        let mut fields: Vec<(String, String)> = Vec::new();
        for (key, value) in url::form_urlencoded::parse(init_data.as_bytes()) {
            if key == "hash" {
                hash = Some(value.into_owned());
            } else {
                fields.push((key.into_owned(), value.into_owned()));
            }
        }
        let hash = hash.ok_or(IdentityError::MissingHash)?;

        let auth_date = fields
            .iter()
            .find(|(key, _)| key == "auth_date")
            .and_then(|(_, value)| value.parse::<i64>().ok())
            .unwrap_or(0);
        let now = self.clock.utc().timestamp();
        if now.saturating_sub(auth_date) > MAX_ASSERTION_AGE_SECS {
            return Err(IdentityError::Stale);
        }
        if auth_date.saturating_sub(now) > MAX_FUTURE_SKEW_SECS {
            return Err(IdentityError::FromFuture);
        }

        fields.sort_by(|left, right| left.0.cmp(&right.0));
        let check_string = fields
            .iter()
            .map(|(key, value)| format!("{key}={value}"))
            .collect::<Vec<_>>()
            .join("\n");

        if !verify_bytes(self.derived_key.expose(), check_string.as_bytes(), &hash) {
            debug!("identity assertion signature mismatch");
            return Err(IdentityError::SignatureMismatch);
        }

        let raw_user = fields
            .iter()
            .find(|(key, _)| key == "user")
            .map(|(_, value)| value.as_str())
            .ok_or(IdentityError::MissingUser)?;
        let payload: HostUserPayload =
            serde_json::from_str(raw_user).map_err(|_| IdentityError::MalformedUser)?;

        Ok(VerifiedIdentity {
            host_user_id: HostUserId::new(payload.id),
            profile: HostProfile {
                first_name: payload.first_name,
                last_name: payload.last_name,
                username: payload.username,
                language_code: payload.language_code,
                is_premium: payload.is_premium,
            },
            auth_date: DateTime::from_timestamp(auth_date, 0).unwrap_or_default(),
        })
    }
}
