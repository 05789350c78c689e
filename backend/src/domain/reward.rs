//! Reward claim signing.
//!
//! A claim signature attests that `(user, amount, quiz session)` earned a
//! reward at the moment of signing. The client embeds it in the comment of
//! a transaction to the treasury as `claim:<signature>`; the transaction
//! verifier recomputes it from stored truth before crediting anything.

use std::sync::Arc;
use std::time::Duration;

use mockable::Clock;
use serde::Serialize;
use utoipa::ToSchema;

use crate::domain::signature::{self, AmbiguousField, CanonicalMessage};
use crate::domain::{QuizSessionId, SecretKey, UserId};

/// Comment prefix carried by claim transactions.
pub const CLAIM_PAYLOAD_PREFIX: &str = "claim:";

/// One outgoing message of the claim transaction template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ClaimMessage {
    /// Treasury address the wallet sends to.
    pub address: String,
    /// Fee in nanotons, as a decimal string.
    pub amount: String,
    /// Transaction comment, `claim:<signature>`.
    pub payload: String,
}

/// Unsigned transaction the client's wallet co-signs and broadcasts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ClaimTemplate {
    /// Unix seconds after which the wallet should refuse the template.
    pub valid_until: i64,
    pub messages: Vec<ClaimMessage>,
}

/// A freshly signed claim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedClaim {
    pub reward_amount: u64,
    pub signature: String,
    /// Absent when no treasury address is configured.
    pub template: Option<ClaimTemplate>,
}

/// Treasury and fee parameters for claim templates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClaimTemplateConfig {
    pub treasury_address: Option<String>,
    pub fee_nanotons: u128,
    pub validity: Duration,
}

/// Signs and re-derives reward claims with the claim secret.
pub struct ClaimSigner {
    secret: SecretKey,
    template: ClaimTemplateConfig,
    clock: Arc<dyn Clock>,
}

impl ClaimSigner {
    pub fn new(secret: SecretKey, template: ClaimTemplateConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            secret,
            template,
            clock,
        }
    }

    fn message(
        user_id: &UserId,
        amount: u64,
        session_id: &QuizSessionId,
    ) -> Result<String, AmbiguousField> {
        Ok(CanonicalMessage::new()
            .field("user_id", user_id)?
            .field("reward_amount", amount)?
            .field("quiz_session_id", session_id)?
            .finish())
    }

    /// Hex signature over `{user_id}:{amount}:{quiz_session_id}`.
    pub fn signature(
        &self,
        user_id: &UserId,
        amount: u64,
        session_id: &QuizSessionId,
    ) -> Result<String, AmbiguousField> {
        let message = Self::message(user_id, amount, session_id)?;
        Ok(signature::sign(self.secret.expose(), &message))
    }

    /// Sign a claim and build its transaction template.
    pub fn sign_claim(
        &self,
        user_id: &UserId,
        amount: u64,
        session_id: &QuizSessionId,
    ) -> Result<SignedClaim, AmbiguousField> {
        let signature = self.signature(user_id, amount, session_id)?;
        let template = self.template.treasury_address.as_ref().map(|address| {
            let validity_secs = i64::try_from(self.template.validity.as_secs()).unwrap_or(i64::MAX);
            let valid_until = self.clock.utc().timestamp().saturating_add(validity_secs);
            ClaimTemplate {
                valid_until,
                messages: vec![ClaimMessage {
                    address: address.clone(),
                    amount: self.template.fee_nanotons.to_string(),
                    payload: format!("{CLAIM_PAYLOAD_PREFIX}{signature}"),
                }],
            }
        });
        Ok(SignedClaim {
            reward_amount: amount,
            signature,
            template,
        })
    }

    /// Constant-time check of a presented claim signature.
    pub fn verify_claim(
        &self,
        user_id: &UserId,
        amount: u64,
        session_id: &QuizSessionId,
        candidate: &str,
    ) -> bool {
        match Self::message(user_id, amount, session_id) {
            Ok(message) => signature::verify(self.secret.expose(), &message, candidate),
            Err(_) => false,
        }
    }
}
