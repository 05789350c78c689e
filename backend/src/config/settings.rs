//! Application settings loaded via OrthoConfig.

use std::net::SocketAddr;
use std::time::Duration;

use ortho_config::OrthoConfig;
use serde::Deserialize;

use crate::domain::{
    ActionKind, ClaimTemplateConfig, DEFAULT_MIN_AMOUNT_NANOTONS, RateLimitPolicy, SESSION_TTL,
    SecretKey, VerificationPolicy,
};
use crate::outbound::chain::ChainIndexerConfig;

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
const DEFAULT_CHAIN_ENDPOINT: &str = "https://testnet.tonapi.io/v2";
const DEFAULT_CHAIN_TIMEOUT_MS: u64 = 10_000;
const DEFAULT_CLAIM_FEE_NANOTONS: u64 = 50_000_000;
const DEFAULT_CLAIM_VALIDITY_SECS: u64 = 600;

/// Non-secret runtime settings.
///
/// Every field is optional; accessors apply the defaults.
#[derive(Debug, Clone, Default, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "ZIMBEAT")]
pub struct AppSettings {
    /// Socket address to listen on.
    pub bind_addr: Option<String>,
    /// PostgreSQL URL. Without it the server runs on the in-memory store.
    pub database_url: Option<String>,
    /// Maximum pooled database connections.
    pub db_max_connections: Option<u32>,
    /// Chain indexer base URL.
    pub chain_endpoint: Option<String>,
    /// Chain indexer request timeout in milliseconds.
    pub chain_timeout_ms: Option<u64>,
    /// Treasury address placed in claim templates.
    pub treasury_address: Option<String>,
    /// Destination reward claims must be addressed to, as the indexer reports it.
    pub treasury_destination: Option<String>,
    pub tip_floor_nanotons: Option<u64>,
    pub claim_floor_nanotons: Option<u64>,
    /// Fee the wallet attaches to a claim transaction.
    pub claim_fee_nanotons: Option<u64>,
    /// Seconds a claim template stays valid.
    pub claim_validity_secs: Option<u64>,
    /// Bearer session lifetime in seconds.
    pub session_ttl_secs: Option<u64>,
    pub cooldown_comment_ms: Option<u64>,
    pub cooldown_like_ms: Option<u64>,
    pub cooldown_post_ms: Option<u64>,
    pub cooldown_tip_ms: Option<u64>,
    pub cooldown_quiz_start_ms: Option<u64>,
    pub cooldown_quiz_submit_ms: Option<u64>,
}

impl AppSettings {
    /// Parse the bind address, falling back to `0.0.0.0:8080`.
    ///
    /// # Errors
    ///
    /// Returns the parse error when the configured value is not a socket
    /// address.
    pub fn bind_addr(&self) -> Result<SocketAddr, std::net::AddrParseError> {
        self.bind_addr.as_deref().unwrap_or(DEFAULT_BIND_ADDR).parse()
    }

    /// Configured database URL, ignoring blank values.
    pub fn database_url(&self) -> Option<&str> {
        self.database_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
    }

    pub fn session_ttl(&self) -> Duration {
        self.session_ttl_secs
            .map(Duration::from_secs)
            .unwrap_or(SESSION_TTL)
    }

    /// Cooldowns with per-action overrides applied over the defaults.
    pub fn rate_limit_policy(&self) -> RateLimitPolicy {
        let overrides = [
            (ActionKind::Comment, self.cooldown_comment_ms),
            (ActionKind::Like, self.cooldown_like_ms),
            (ActionKind::Post, self.cooldown_post_ms),
            (ActionKind::Tip, self.cooldown_tip_ms),
            (ActionKind::QuizStart, self.cooldown_quiz_start_ms),
            (ActionKind::QuizSubmit, self.cooldown_quiz_submit_ms),
        ];
        overrides
            .into_iter()
            .fold(RateLimitPolicy::default(), |policy, (action, ms)| match ms {
                Some(ms) => policy.with_cooldown(action, Duration::from_millis(ms)),
                None => policy,
            })
    }

    pub fn claim_template(&self) -> ClaimTemplateConfig {
        ClaimTemplateConfig {
            treasury_address: non_blank(self.treasury_address.as_deref()),
            fee_nanotons: u128::from(
                self.claim_fee_nanotons
                    .unwrap_or(DEFAULT_CLAIM_FEE_NANOTONS),
            ),
            validity: Duration::from_secs(
                self.claim_validity_secs
                    .unwrap_or(DEFAULT_CLAIM_VALIDITY_SECS),
            ),
        }
    }

    pub fn verification_policy(&self) -> VerificationPolicy {
        let floor = |value: Option<u64>| value.map_or(DEFAULT_MIN_AMOUNT_NANOTONS, u128::from);
        VerificationPolicy {
            tip_floor_nanotons: floor(self.tip_floor_nanotons),
            claim_floor_nanotons: floor(self.claim_floor_nanotons),
            treasury_destination: non_blank(self.treasury_destination.as_deref()),
        }
    }

    /// Indexer connection settings; the API key comes from the secrets.
    pub fn chain_indexer(&self, api_key: Option<SecretKey>) -> ChainIndexerConfig {
        ChainIndexerConfig {
            endpoint: self
                .chain_endpoint
                .clone()
                .unwrap_or_else(|| DEFAULT_CHAIN_ENDPOINT.to_owned()),
            timeout: Duration::from_millis(self.chain_timeout_ms.unwrap_or(DEFAULT_CHAIN_TIMEOUT_MS)),
            api_key,
        }
    }
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .map(str::to_owned)
}
