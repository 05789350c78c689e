//! Regression coverage for this module.

use super::*;
use crate::domain::Error;
use actix_web::ResponseError;
use actix_web::body::to_bytes;
use actix_web::http::StatusCode;
use rstest::{fixture, rstest};
use serde_json::{Value, json};

const TRACE_ID: &str = "00000000-0000-0000-0000-000000000000";

#[fixture]
fn expected_trace_id() -> String {
    TRACE_ID.to_owned()
}

#[fixture]
fn internal_error_case(expected_trace_id: String) -> Error {
    Error::internal("pool exhausted while claiming")
        .with_trace_id(expected_trace_id)
        .with_details(json!({"secret": "x"}))
}

#[fixture]
fn invalid_request_case(expected_trace_id: String) -> Error {
    Error::invalid_request("bad")
        .with_trace_id(expected_trace_id)
        .with_details(json!({"field": "questionId"}))
}

#[rstest]
#[case(Error::invalid_request("bad"), StatusCode::BAD_REQUEST)]
#[case(Error::unauthorized("no auth"), StatusCode::UNAUTHORIZED)]
#[case(Error::forbidden("denied"), StatusCode::FORBIDDEN)]
#[case(Error::not_found("missing"), StatusCode::NOT_FOUND)]
#[case(Error::integrity_violation("done"), StatusCode::CONFLICT)]
#[case(Error::conflict("owned elsewhere"), StatusCode::CONFLICT)]
#[case(Error::rejected("wrong comment"), StatusCode::UNPROCESSABLE_ENTITY)]
#[case(Error::rate_limited(4), StatusCode::TOO_MANY_REQUESTS)]
#[case(Error::upstream_unavailable("indexer"), StatusCode::SERVICE_UNAVAILABLE)]
#[case(Error::internal("boom"), StatusCode::INTERNAL_SERVER_ERROR)]
fn status_code_matches_error_code(#[case] err: Error, #[case] status: StatusCode) {
    assert_eq!(ResponseError::status_code(&err), status);
}

async fn response_body(
    error: Error,
    expected_status: StatusCode,
    expected_trace_id: Option<&str>,
) -> Value {
    let response = ResponseError::error_response(&error);
    assert_eq!(response.status(), expected_status);

    let header = response.headers().get(TRACE_ID_HEADER);
    match expected_trace_id {
        Some(expected) => {
            let trace_id = header
                .expect("trace-id header is set by error_response")
                .to_str()
                .expect("trace-id is valid UTF-8");
            assert_eq!(trace_id, expected);
        }
        None => assert!(header.is_none(), "trace-id header should not be present"),
    }

    let bytes = to_bytes(response.into_body())
        .await
        .expect("reading response body succeeds");
    serde_json::from_slice(&bytes).expect("error body is JSON")
}

#[rstest]
#[actix_web::test]
async fn internal_errors_are_redacted(
    #[from(internal_error_case)] internal_error: Error,
    expected_trace_id: String,
) {
    let body = response_body(
        internal_error,
        StatusCode::INTERNAL_SERVER_ERROR,
        Some(expected_trace_id.as_str()),
    )
    .await;

    assert_eq!(body["success"], json!(false));
    assert_eq!(body["code"], json!("internal_error"));
    assert_eq!(body["message"], json!("Internal server error"));
    assert!(body.get("details").is_none());
}

#[rstest]
#[actix_web::test]
async fn client_errors_keep_message_and_details(
    #[from(invalid_request_case)] invalid_request: Error,
    expected_trace_id: String,
) {
    let body = response_body(
        invalid_request,
        StatusCode::BAD_REQUEST,
        Some(expected_trace_id.as_str()),
    )
    .await;

    assert_eq!(body["success"], json!(false));
    assert_eq!(body["message"], json!("bad"));
    assert_eq!(body["traceId"], json!(TRACE_ID));
    assert_eq!(body["details"], json!({"field": "questionId"}));
}

#[rstest]
#[actix_web::test]
async fn rate_limited_errors_carry_retry_after() {
    let response = ResponseError::error_response(&Error::rate_limited(3));
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(
        response
            .headers()
            .get(RETRY_AFTER)
            .and_then(|value| value.to_str().ok()),
        Some("3")
    );

    let bytes = to_bytes(response.into_body()).await.expect("body");
    let body: Value = serde_json::from_slice(&bytes).expect("JSON");
    assert_eq!(body["retry_after_seconds"], json!(3));
}

#[rstest]
#[actix_web::test]
async fn error_without_trace_id_omits_trace_header() {
    let body = response_body(Error::not_found("gone"), StatusCode::NOT_FOUND, None).await;
    assert!(body.get("traceId").is_none());
}

#[rstest]
fn redaction_leaves_client_errors_untouched() {
    let error = Error::rejected("comment mismatch").with_trace_id(TRACE_ID);
    assert_eq!(redact_if_internal(&error), error);
}

#[rstest]
fn from_actix_error_is_redacted_internal_error() {
    let err: Error = actix_web::error::ErrorBadRequest("boom").into();

    assert_eq!(err.code(), ErrorCode::InternalError);
    assert_eq!(err.message(), "Internal server error");
    assert_eq!(err.details(), None);
}
