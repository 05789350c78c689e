//! Identity handshake endpoint.
//!
//! `POST /auth` exchanges a host-signed identity assertion for a bearer
//! session. Every later call on a protected route carries that session in
//! `Authorization: Bearer <token>`.

use actix_web::{post, web};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::Error;
use crate::domain::ports::HandshakeOutcome;
use crate::inbound::http::ApiResult;
use crate::inbound::http::schemas::ErrorSchema;
use crate::inbound::http::state::HttpState;

/// Handshake request body.
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AuthRequest {
    /// URL-encoded identity assertion exactly as the host delivered it.
    #[schema(example = "query_id=AAH...&user=%7B%22id%22%3A42%7D&auth_date=1768478400&hash=...")]
    pub init_data: String,
}

/// Authenticated user summary.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AuthUserBody {
    #[schema(example = "3fa85f64-5717-4562-b3fc-2c963f66afa6")]
    pub id: String,
    #[schema(example = "user")]
    pub role: String,
    #[schema(example = 42)]
    pub host_user_id: i64,
}

/// Handshake response body.
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponseBody {
    pub access_token: String,
    /// RFC 3339 expiry of `access_token`.
    pub expires_at: String,
    pub user: AuthUserBody,
}

impl From<HandshakeOutcome> for AuthResponseBody {
    fn from(value: HandshakeOutcome) -> Self {
        let HandshakeOutcome { session, user } = value;
        Self {
            access_token: session.token,
            expires_at: session.claims.expires_at.to_rfc3339(),
            user: AuthUserBody {
                id: user.id.to_string(),
                role: user.role.to_string(),
                host_user_id: user.host_user_id.get(),
            },
        }
    }
}

/// Verify a host identity assertion and open a session.
#[utoipa::path(
    post,
    path = "/auth",
    request_body = AuthRequest,
    responses(
        (status = 200, description = "Session issued", body = AuthResponseBody),
        (status = 400, description = "Malformed assertion", body = ErrorSchema),
        (status = 401, description = "Assertion rejected", body = ErrorSchema),
        (status = 503, description = "User store unavailable", body = ErrorSchema)
    ),
    tags = ["auth"],
    operation_id = "authenticate",
    security([])
)]
#[post("/auth")]
pub async fn authenticate(
    state: web::Data<HttpState>,
    payload: web::Json<AuthRequest>,
) -> ApiResult<web::Json<AuthResponseBody>> {
    let AuthRequest { init_data } = payload.into_inner();
    if init_data.trim().is_empty() {
        return Err(Error::invalid_request("initData is required"));
    }
    let outcome = state.handshake.handshake(&init_data).await?;
    Ok(web::Json(AuthResponseBody::from(outcome)))
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    use super::*;
    use crate::domain::ports::MockIdentityHandshake;
    use crate::domain::{HostProfile, HostUserId, User};
    use crate::inbound::http::test_utils::{TestPorts, session_tokens, test_clock};
    use actix_web::http::StatusCode;
    use actix_web::{App, test};
    use serde_json::{Value, json};
    use std::sync::Arc;

    #[actix_web::test]
    async fn returns_token_and_user_summary() {
        let clock = test_clock();
        let tokens = session_tokens(&clock);
        let user = User::first_seen(HostUserId::new(42), HostProfile::default());
        let session = tokens.issue(&user).expect("token issues");
        let outcome = HandshakeOutcome {
            session: session.clone(),
            user: user.clone(),
        };

        let mut handshake = MockIdentityHandshake::new();
        handshake
            .expect_handshake()
            .withf(|init_data| init_data == "user=...&hash=abc")
            .times(1)
            .return_once(move |_| Ok(outcome));
        let state = TestPorts {
            handshake: Arc::new(handshake),
            ..TestPorts::default()
        }
        .into_state(tokens);

        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state))
                .service(authenticate),
        )
        .await;
        let request = test::TestRequest::post()
            .uri("/auth")
            .set_json(json!({ "initData": "user=...&hash=abc" }))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, request).await;

        assert_eq!(body["accessToken"], json!(session.token));
        assert_eq!(body["user"]["id"], json!(user.id.to_string()));
        assert_eq!(body["user"]["role"], json!("user"));
        assert_eq!(body["user"]["hostUserId"], json!(42));
        assert_eq!(
            body["expiresAt"],
            json!(session.claims.expires_at.to_rfc3339())
        );
    }

    #[actix_web::test]
    async fn rejected_assertion_is_unauthorized() {
        let clock = test_clock();
        let mut handshake = MockIdentityHandshake::new();
        handshake
            .expect_handshake()
            .return_once(|_| Err(Error::unauthorized("Invalid identity assertion.")));
        let state = TestPorts {
            handshake: Arc::new(handshake),
            ..TestPorts::default()
        }
        .into_state(session_tokens(&clock));

        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state))
                .service(authenticate),
        )
        .await;
        let request = test::TestRequest::post()
            .uri("/auth")
            .set_json(json!({ "initData": "hash=forged" }))
            .to_request();
        let response = test::call_service(&app, request).await;

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[actix_web::test]
    async fn blank_init_data_never_reaches_the_port() {
        let clock = test_clock();
        let state = TestPorts::default().into_state(session_tokens(&clock));
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state))
                .service(authenticate),
        )
        .await;
        let request = test::TestRequest::post()
            .uri("/auth")
            .set_json(json!({ "initData": "  " }))
            .to_request();
        let response = test::call_service(&app, request).await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
