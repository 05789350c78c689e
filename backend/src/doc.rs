//! OpenAPI documentation configuration.
//!
//! This module defines the [`ApiDoc`] struct which generates the OpenAPI
//! specification for the REST API. It registers:
//!
//! - **Paths**: the handshake, quiz, transaction verification, and health
//!   endpoints from the inbound layer
//! - **Schemas**: request/response DTOs plus the domain error wrappers
//!   ([`ErrorSchema`], [`ErrorCodeSchema`]) that keep domain types free of
//!   utoipa derives
//! - **Security**: bearer session token issued by `POST /auth`
//!
//! The generated specification is used by Swagger UI (debug builds) and
//! exported via `cargo run --bin openapi-dump` for external tooling.

use crate::inbound::http::auth::{AuthRequest, AuthResponseBody, AuthUserBody};
use crate::inbound::http::quiz::{
    StartQuizRequest, StartQuizResponse, SubmitAnswerBody, SubmitAnswerResponse,
};
use crate::inbound::http::schemas::{ErrorCodeSchema, ErrorSchema};
use crate::inbound::http::transactions::{VerifyTransactionBody, VerifyTransactionResponseBody};
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

/// Security scheme name referenced by authenticated operations.
pub const BEARER_SESSION_SCHEME: &str = "BearerSession";

/// Enrich the generated document with the bearer session security scheme.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi
            .components
            .get_or_insert_with(utoipa::openapi::Components::default);

        components.add_security_scheme(
            BEARER_SESSION_SCHEME,
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .description(Some("Session token issued by POST /auth."))
                    .build(),
            ),
        );
    }
}

/// OpenAPI document for the REST API.
/// Swagger UI is enabled in debug builds only and used by tooling.
#[derive(OpenApi)]
#[openapi(
    modifiers(&SecurityAddon),
    info(
        title = "Zimbeat backend API",
        description = "Host identity handshake, watch-gated quiz rewards, and on-chain transaction verification."
    ),
    servers(
        (url = "/", description = "Relative to the deployment base URL")
    ),
    security(("BearerSession" = [])),
    paths(
        crate::inbound::http::auth::authenticate,
        crate::inbound::http::quiz::start_session,
        crate::inbound::http::quiz::submit_answer,
        crate::inbound::http::transactions::verify_transaction,
        crate::inbound::http::health::ready,
        crate::inbound::http::health::live,
    ),
    components(schemas(
        AuthRequest,
        AuthUserBody,
        AuthResponseBody,
        StartQuizRequest,
        StartQuizResponse,
        SubmitAnswerBody,
        SubmitAnswerResponse,
        VerifyTransactionBody,
        VerifyTransactionResponseBody,
        ErrorSchema,
        ErrorCodeSchema
    )),
    tags(
        (name = "auth", description = "Host identity handshake"),
        (name = "quiz", description = "Watch-gated quiz sessions and rewards"),
        (name = "transactions", description = "On-chain transaction verification"),
        (name = "health", description = "Endpoints for health checks")
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    //! Tests verifying OpenAPI schema field structure.

    use super::*;
    use rstest::rstest;
    use utoipa::openapi::schema::Schema;
    use utoipa::openapi::RefOr;
    use utoipa::OpenApi;

    // Note: utoipa replaces :: with . in schema names
    const ERROR_SCHEMA_NAME: &str = "crate.domain.Error";

    /// Assert that an Object schema contains a field with the given name.
    fn assert_object_schema_has_field(schema: &RefOr<Schema>, field: &str) {
        match schema {
            RefOr::T(Schema::Object(obj)) => {
                assert!(
                    obj.properties.contains_key(field),
                    "schema should have field '{field}'"
                );
            }
            _ => panic!("expected Object schema"),
        }
    }

    #[rstest]
    #[case("success")]
    #[case("code")]
    #[case("message")]
    #[case("traceId")]
    #[case("retry_after_seconds")]
    fn openapi_error_schema_has_wire_fields(#[case] field: &str) {
        let doc = ApiDoc::openapi();
        let schemas = &doc.components.as_ref().expect("components").schemas;
        let error_schema = schemas.get(ERROR_SCHEMA_NAME).expect("Error schema");

        assert_object_schema_has_field(error_schema, field);
    }

    #[test]
    fn openapi_auth_response_uses_camel_case() {
        let doc = ApiDoc::openapi();
        let schemas = &doc.components.as_ref().expect("components").schemas;
        let auth = schemas.get("AuthResponseBody").expect("auth response schema");

        assert_object_schema_has_field(auth, "accessToken");
        assert_object_schema_has_field(auth, "expiresAt");
        assert_object_schema_has_field(auth, "user");
    }

    #[rstest]
    #[case("/auth")]
    #[case("/quiz/session")]
    #[case("/quiz/submit")]
    #[case("/transactions/verify")]
    #[case("/health/ready")]
    #[case("/health/live")]
    fn openapi_registers_path(#[case] path: &str) {
        let doc = ApiDoc::openapi();
        assert!(doc.paths.paths.contains_key(path), "missing path {path}");
    }

    #[test]
    fn openapi_declares_bearer_scheme() {
        let doc = ApiDoc::openapi();
        let components = doc.components.as_ref().expect("components");
        assert!(components.security_schemes.contains_key(BEARER_SESSION_SCHEME));
    }
}
