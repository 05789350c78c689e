//! DTOs for decoding indexer transaction payloads.
//!
//! Only the fields the verifier needs are decoded; everything else in the
//! indexer response is ignored.

use serde::Deserialize;

use crate::domain::ChainTransaction;

#[derive(Debug, Deserialize)]
pub(super) struct TransactionDto {
    #[serde(default)]
    pub(super) hash: Option<String>,
    #[serde(default)]
    pub(super) success: bool,
    pub(super) in_msg: Option<MessageDto>,
}

#[derive(Debug, Deserialize)]
pub(super) struct MessageDto {
    #[serde(default)]
    pub(super) value: Option<NanotonsDto>,
    pub(super) destination: Option<AccountDto>,
    pub(super) decoded_body: Option<DecodedBodyDto>,
    pub(super) message_content: Option<MessageContentDto>,
}

/// Nanoton amounts arrive as decimal strings or plain integers.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(super) enum NanotonsDto {
    Integer(u64),
    Text(String),
}

#[derive(Debug, Deserialize)]
pub(super) struct AccountDto {
    pub(super) address: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(super) struct DecodedBodyDto {
    pub(super) text: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(super) struct MessageContentDto {
    pub(super) decoded: Option<DecodedCommentDto>,
}

#[derive(Debug, Deserialize)]
pub(super) struct DecodedCommentDto {
    pub(super) comment: Option<String>,
}

impl NanotonsDto {
    fn into_amount(self) -> Result<u128, String> {
        match self {
            Self::Integer(value) => Ok(u128::from(value)),
            Self::Text(text) => text
                .trim()
                .parse::<u128>()
                .map_err(|err| format!("invalid message value {text:?}: {err}")),
        }
    }
}

impl MessageDto {
    fn comment(&self) -> Option<String> {
        let from_body = self
            .decoded_body
            .as_ref()
            .and_then(|body| body.text.as_deref());
        let from_content = self
            .message_content
            .as_ref()
            .and_then(|content| content.decoded.as_ref())
            .and_then(|decoded| decoded.comment.as_deref());
        from_body
            .filter(|text| !text.is_empty())
            .or(from_content)
            .map(str::to_owned)
    }
}

impl TransactionDto {
    /// Map into the domain record. `requested_hash` fills in a missing
    /// `hash` field.
    pub(super) fn into_domain(self, requested_hash: &str) -> Result<ChainTransaction, String> {
        let message = self
            .in_msg
            .ok_or_else(|| "transaction has no incoming message".to_owned())?;
        let comment = message.comment();
        let amount = message
            .value
            .map(NanotonsDto::into_amount)
            .transpose()?
            .unwrap_or(0);
        let destination = message.destination.and_then(|account| account.address);

        Ok(ChainTransaction {
            hash: self.hash.unwrap_or_else(|| requested_hash.to_owned()),
            success: self.success,
            amount,
            comment,
            destination,
        })
    }
}
