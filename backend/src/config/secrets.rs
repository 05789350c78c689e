//! Secret loading and validation.
//!
//! Secrets come from the process environment through [`mockable::Env`] so
//! the rules can be tested without touching real variables. Values are
//! wrapped in [`SecretKey`] immediately and never logged.

use mockable::Env;
use rand::RngCore;
use tracing::warn;

use crate::domain::SecretKey;

const BOT_TOKEN_ENV: &str = "BOT_TOKEN";
const SESSION_SECRET_ENV: &str = "SESSION_SECRET";
const CLAIM_SECRET_ENV: &str = "CLAIM_SECRET";
const CHAIN_API_KEY_ENV: &str = "CHAIN_API_KEY";
const ALLOW_EPHEMERAL_ENV: &str = "ZIMBEAT_ALLOW_EPHEMERAL_SECRETS";
const SECRET_MIN_LEN: usize = 32;
const BOOL_EXPECTED: &str = "1|0|true|false|yes|no|y|n";

/// Build mode for secret validation.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum BuildMode {
    /// Debug builds tolerate short secrets and may opt into ephemeral ones.
    Debug,
    /// Release builds require every signing secret at full length.
    Release,
}

impl BuildMode {
    /// Determine the build mode from `cfg!(debug_assertions)`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use zimbeat_backend::config::BuildMode;
    ///
    /// let mode = BuildMode::from_debug_assertions();
    /// if cfg!(debug_assertions) {
    ///     assert_eq!(mode, BuildMode::Debug);
    /// } else {
    ///     assert_eq!(mode, BuildMode::Release);
    /// }
    /// ```
    #[must_use]
    pub fn from_debug_assertions() -> Self {
        if cfg!(debug_assertions) {
            Self::Debug
        } else {
            Self::Release
        }
    }

    fn is_debug(self) -> bool {
        matches!(self, Self::Debug)
    }
}

/// Secrets the process needs at start-up.
pub struct SecretSettings {
    /// Host bot token; the identity verifier derives its key from it.
    pub bot_token: SecretKey,
    /// HS256 key for bearer sessions.
    pub session_secret: SecretKey,
    /// HMAC key for reward claim signatures.
    pub claim_secret: SecretKey,
    /// Optional bearer key for the chain indexer.
    pub chain_api_key: Option<SecretKey>,
}

/// Errors raised while validating secrets.
#[derive(thiserror::Error, Debug)]
pub enum SecretsConfigError {
    /// A required environment variable is missing or blank.
    #[error("missing required environment variable: {name}")]
    MissingEnv { name: &'static str },
    /// A variable is present but contains an invalid value.
    #[error("invalid value for {name}; expected {expected}")]
    InvalidEnv {
        name: &'static str,
        expected: &'static str,
    },
    /// A signing secret is too short for release builds.
    #[error("{name} too short: need >= {min_len} bytes, got {length}")]
    SecretTooShort {
        name: &'static str,
        length: usize,
        min_len: usize,
    },
    /// Release builds must not generate secrets.
    #[error("ZIMBEAT_ALLOW_EPHEMERAL_SECRETS must be 0 in release builds")]
    EphemeralNotAllowed,
}

/// Read and validate every secret.
///
/// # Examples
///
/// ```rust
/// use zimbeat_backend::config::{BuildMode, secrets_from_env};
/// use mockable::MockEnv;
///
/// let mut env = MockEnv::new();
/// env.expect_string().returning(|name| match name {
///     "BOT_TOKEN" => Some("123456:bot-token".to_owned()),
///     "SESSION_SECRET" => Some("s".repeat(32)),
///     "CLAIM_SECRET" => Some("c".repeat(32)),
///     _ => None,
/// });
///
/// let secrets = secrets_from_env(&env, BuildMode::Release).expect("valid secrets");
/// assert!(secrets.chain_api_key.is_none());
/// ```
///
/// # Errors
///
/// Returns [`SecretsConfigError`] when a required secret is missing, a
/// release-build secret is too short, or the ephemeral toggle is invalid.
pub fn secrets_from_env<E: Env>(
    env: &E,
    mode: BuildMode,
) -> Result<SecretSettings, SecretsConfigError> {
    let allow_ephemeral = allow_ephemeral_from_env(env, mode)?;
    let bot_token = non_blank(env, BOT_TOKEN_ENV).ok_or(SecretsConfigError::MissingEnv {
        name: BOT_TOKEN_ENV,
    })?;

    Ok(SecretSettings {
        bot_token: SecretKey::from(bot_token),
        session_secret: signing_secret(env, SESSION_SECRET_ENV, mode, allow_ephemeral)?,
        claim_secret: signing_secret(env, CLAIM_SECRET_ENV, mode, allow_ephemeral)?,
        chain_api_key: non_blank(env, CHAIN_API_KEY_ENV).map(SecretKey::from),
    })
}

fn non_blank<E: Env>(env: &E, name: &str) -> Option<String> {
    env.string(name).filter(|value| !value.trim().is_empty())
}

fn allow_ephemeral_from_env<E: Env>(env: &E, mode: BuildMode) -> Result<bool, SecretsConfigError> {
    let Some(value) = env.string(ALLOW_EPHEMERAL_ENV) else {
        return Ok(false);
    };
    match parse_bool(&value) {
        Some(true) if mode.is_debug() => Ok(true),
        Some(true) => Err(SecretsConfigError::EphemeralNotAllowed),
        Some(false) => Ok(false),
        None if mode.is_debug() => {
            warn!(value = %value, "invalid ZIMBEAT_ALLOW_EPHEMERAL_SECRETS; defaulting to disabled");
            Ok(false)
        }
        None => Err(SecretsConfigError::InvalidEnv {
            name: ALLOW_EPHEMERAL_ENV,
            expected: BOOL_EXPECTED,
        }),
    }
}

fn signing_secret<E: Env>(
    env: &E,
    name: &'static str,
    mode: BuildMode,
    allow_ephemeral: bool,
) -> Result<SecretKey, SecretsConfigError> {
    match non_blank(env, name) {
        Some(value) => {
            let key = SecretKey::from(value);
            if key.len() >= SECRET_MIN_LEN {
                return Ok(key);
            }
            if mode.is_debug() {
                warn!(secret = name, length = key.len(), "signing secret shorter than recommended");
                return Ok(key);
            }
            Err(SecretsConfigError::SecretTooShort {
                name,
                length: key.len(),
                min_len: SECRET_MIN_LEN,
            })
        }
        None if allow_ephemeral => {
            warn!(secret = name, "using ephemeral signing secret (dev only)");
            Ok(ephemeral_secret())
        }
        None => Err(SecretsConfigError::MissingEnv { name }),
    }
}

fn ephemeral_secret() -> SecretKey {
    let mut bytes = vec![0_u8; SECRET_MIN_LEN];
    rand::thread_rng().fill_bytes(&mut bytes);
    SecretKey::new(bytes)
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "y" => Some(true),
        "0" | "false" | "no" | "n" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests;
