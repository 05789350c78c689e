//! Tests for domain error construction and wire formatting.

use super::*;
use rstest::{fixture, rstest};
use serde_json::json;

const TRACE_ID: &str = "00000000-0000-0000-0000-000000000000";

#[fixture]
fn base_error() -> Error {
    Error::invalid_request("bad")
}

#[rstest]
fn invalid_request_constructor_sets_code() {
    let err = Error::invalid_request("bad");
    assert_eq!(err.code(), ErrorCode::InvalidRequest);
}

#[rstest]
fn try_new_rejects_empty_messages() {
    let result = Error::try_new(ErrorCode::InvalidRequest, "   ");
    assert!(matches!(result, Err(ErrorValidationError::EmptyMessage)));
}

#[rstest]
fn try_with_trace_id_rejects_empty_values(base_error: Error) {
    let result = base_error.try_with_trace_id("   ");
    assert!(matches!(result, Err(ErrorValidationError::EmptyTraceId)));
}

#[rstest]
fn new_returns_none_when_trace_id_out_of_scope() {
    let error = Error::internal("boom");
    assert!(error.trace_id().is_none());
}

#[rstest]
#[tokio::test]
async fn new_captures_trace_id_in_scope() {
    let trace_id: TraceId = TRACE_ID.parse().expect("valid uuid");
    let error = TraceId::scope(trace_id, async { Error::not_found("missing") }).await;
    assert_eq!(error.trace_id(), Some(TRACE_ID));
}

#[rstest]
fn rate_limited_carries_retry_hint() {
    let error = Error::rate_limited(4);
    assert_eq!(error.code(), ErrorCode::RateLimited);
    assert_eq!(error.retry_after_seconds(), Some(4));
    assert!(error.message().contains("4s"));
}

#[rstest]
#[case(ErrorCode::RateLimited, true)]
#[case(ErrorCode::UpstreamUnavailable, true)]
#[case(ErrorCode::Unauthorized, false)]
#[case(ErrorCode::IntegrityViolation, false)]
#[case(ErrorCode::NotFound, false)]
fn retryable_codes(#[case] code: ErrorCode, #[case] expected: bool) {
    assert_eq!(code.is_retryable(), expected);
}

#[rstest]
fn serialises_with_success_flag_and_snake_case_code() {
    let error = Error::rate_limited(2).with_trace_id(TRACE_ID);
    let value = serde_json::to_value(&error).expect("serialise error");
    assert_eq!(value["success"], json!(false));
    assert_eq!(value["code"], json!("rate_limited"));
    assert_eq!(value["retry_after_seconds"], json!(2));
    assert_eq!(value["traceId"], json!(TRACE_ID));
}

#[rstest]
fn omits_absent_optional_fields() {
    let value = serde_json::to_value(Error::unauthorized("expired")).expect("serialise error");
    let object = value.as_object().expect("object payload");
    assert!(!object.contains_key("details"));
    assert!(!object.contains_key("retry_after_seconds"));
    assert!(!object.contains_key("traceId"));
}

#[rstest]
fn deserialise_rejects_blank_message() {
    let payload = json!({ "success": false, "code": "not_found", "message": "  " });
    let result = serde_json::from_value::<Error>(payload);
    assert!(result.is_err());
}

#[rstest]
fn round_trips_details() {
    let error = Error::integrity_violation("Requirement not met.")
        .with_details(json!({ "reason": "session_completed" }));
    let value = serde_json::to_value(&error).expect("serialise");
    let decoded: Error = serde_json::from_value(value).expect("deserialise");
    assert_eq!(decoded.code(), ErrorCode::IntegrityViolation);
    assert_eq!(decoded.details(), Some(&json!({ "reason": "session_completed" })));
}
