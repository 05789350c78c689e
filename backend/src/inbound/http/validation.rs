//! Shared validation helpers for inbound HTTP adapters.
//!
//! Every failure becomes `invalid_request` with `details.field` and
//! `details.code` so clients can highlight the offending input.

use std::str::FromStr;

use serde_json::json;

use crate::domain::{Error, QuestionId, QuizSessionId, TransactionKind, TxHash};

/// Validation error codes for HTTP request failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ErrorCode {
    InvalidUuid,
    InvalidIdentifier,
    UnknownVariant,
    OutOfRange,
}

impl ErrorCode {
    fn as_str(self) -> &'static str {
        match self {
            ErrorCode::InvalidUuid => "invalid_uuid",
            ErrorCode::InvalidIdentifier => "invalid_identifier",
            ErrorCode::UnknownVariant => "unknown_variant",
            ErrorCode::OutOfRange => "out_of_range",
        }
    }
}

/// Newtype wrapper for HTTP field names to provide type safety.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct FieldName(&'static str);

impl FieldName {
    pub(crate) const fn new(name: &'static str) -> Self {
        Self(name)
    }

    fn as_str(&self) -> &'static str {
        self.0
    }
}

fn field_error(field: FieldName, code: ErrorCode, message: String) -> Error {
    Error::invalid_request(message).with_details(json!({
        "field": field.as_str(),
        "code": code.as_str(),
    }))
}

pub(crate) fn parse_question_id(value: String, field: FieldName) -> Result<QuestionId, Error> {
    QuestionId::new(value).map_err(|err| {
        field_error(
            field,
            ErrorCode::InvalidIdentifier,
            format!("{}: {err}", field.as_str()),
        )
    })
}

pub(crate) fn parse_session_id(value: &str, field: FieldName) -> Result<QuizSessionId, Error> {
    QuizSessionId::from_str(value).map_err(|_| {
        field_error(
            field,
            ErrorCode::InvalidUuid,
            format!("{} must be a valid UUID", field.as_str()),
        )
    })
}

/// Answer indices must fit the stored column.
pub(crate) fn parse_answer_index(value: u32, field: FieldName) -> Result<u32, Error> {
    if i32::try_from(value).is_err() {
        return Err(field_error(
            field,
            ErrorCode::OutOfRange,
            format!("{} must be at most {}", field.as_str(), i32::MAX),
        ));
    }
    Ok(value)
}

pub(crate) fn parse_tx_hash(value: String, field: FieldName) -> Result<TxHash, Error> {
    TxHash::new(value).map_err(|err| {
        field_error(
            field,
            ErrorCode::InvalidIdentifier,
            format!("{}: {err}", field.as_str()),
        )
    })
}

pub(crate) fn parse_transaction_kind(
    value: &str,
    field: FieldName,
) -> Result<TransactionKind, Error> {
    TransactionKind::from_str(value)
        .map_err(|message| field_error(field, ErrorCode::UnknownVariant, message))
}
