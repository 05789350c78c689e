//! OpenAPI schema definitions for domain types.
//!
//! Domain error types remain framework-agnostic by not deriving `ToSchema`.
//! The wrappers here mirror their wire shape and live in the inbound adapter
//! layer where framework concerns belong.

use utoipa::ToSchema;

/// OpenAPI schema for [`crate::domain::ErrorCode`].
///
/// Stable machine-readable error codes returned in API error responses.
#[derive(ToSchema)]
#[schema(as = crate::domain::ErrorCode)]
pub enum ErrorCodeSchema {
    /// The request is malformed or fails validation.
    #[schema(rename = "invalid_request")]
    InvalidRequest,
    /// The session or identity assertion is missing, invalid, or expired.
    #[schema(rename = "unauthorized")]
    Unauthorized,
    /// Authenticated but not permitted to perform this action.
    #[schema(rename = "forbidden")]
    Forbidden,
    /// The requested session, question, or transaction does not exist.
    #[schema(rename = "not_found")]
    NotFound,
    /// A terminal integrity rule was broken.
    #[schema(rename = "integrity_violation")]
    IntegrityViolation,
    /// The resource belongs to another verification attempt.
    #[schema(rename = "conflict")]
    Conflict,
    /// The chain transaction does not match what it claims to be.
    #[schema(rename = "rejected")]
    Rejected,
    /// The per-action cooldown has not elapsed.
    #[schema(rename = "rate_limited")]
    RateLimited,
    /// The store or chain indexer is temporarily unavailable.
    #[schema(rename = "upstream_unavailable")]
    UpstreamUnavailable,
    /// An unexpected error occurred on the server.
    #[schema(rename = "internal_error")]
    InternalError,
}

/// OpenAPI schema for [`crate::domain::Error`].
#[derive(ToSchema)]
#[schema(as = crate::domain::Error, rename_all = "camelCase")]
#[expect(
    dead_code,
    reason = "Used only for OpenAPI schema generation via utoipa"
)]
pub struct ErrorSchema {
    /// Always `false` for errors.
    #[schema(example = false)]
    success: bool,
    /// Stable machine-readable error code.
    #[schema(example = "rate_limited")]
    code: ErrorCodeSchema,
    /// Human-readable message returned to clients.
    #[schema(example = "Rate limit exceeded. Wait 3s.")]
    message: String,
    /// Correlation identifier, also sent as the `trace-id` header.
    #[schema(example = "3fa85f64-5717-4562-b3fc-2c963f66afa6")]
    trace_id: Option<String>,
    /// Supplementary error details for clients.
    details: Option<serde_json::Value>,
    /// Seconds to wait; present on `rate_limited` only.
    #[schema(rename = "retry_after_seconds", example = 3)]
    retry_after_seconds: Option<u64>,
}
