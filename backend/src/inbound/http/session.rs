//! Bearer session extractor.
//!
//! Protected handlers take a [`SessionContext`] argument; extraction reads
//! `Authorization: Bearer <token>`, validates it against the shared
//! [`SessionTokens`](crate::domain::SessionTokens), and fails with
//! `401 Unauthorized` otherwise.

use std::future::{Ready, ready};

use actix_web::http::header::AUTHORIZATION;
use actix_web::{FromRequest, HttpRequest, dev::Payload, web};
use tracing::debug;

use crate::domain::{Error, SessionClaims, SessionError, UserId};

use super::state::HttpState;

const BEARER_PREFIX: &str = "Bearer ";

/// Claims of the authenticated caller.
#[derive(Debug, Clone, Copy)]
pub struct SessionContext(SessionClaims);

impl SessionContext {
    /// Wrap already validated claims.
    pub fn new(claims: SessionClaims) -> Self {
        Self(claims)
    }

    pub fn user_id(&self) -> UserId {
        self.0.user_id
    }

    pub fn claims(&self) -> &SessionClaims {
        &self.0
    }
}

fn bearer_token(req: &HttpRequest) -> Option<&str> {
    let value = req.headers().get(AUTHORIZATION)?.to_str().ok()?;
    let token = value.strip_prefix(BEARER_PREFIX)?.trim();
    (!token.is_empty()).then_some(token)
}

fn authenticate(req: &HttpRequest) -> Result<SessionContext, Error> {
    let state = req
        .app_data::<web::Data<HttpState>>()
        .ok_or_else(|| Error::internal("HTTP state is not registered"))?;
    let token = bearer_token(req).ok_or_else(|| Error::unauthorized("Missing bearer session."))?;

    match state.session_tokens.validate(token) {
        Ok(claims) => Ok(SessionContext::new(claims)),
        Err(SessionError::Expired) => Err(Error::unauthorized("Session expired.")),
        Err(error) => {
            debug!(%error, "bearer session refused");
            Err(Error::unauthorized("Invalid session."))
        }
    }
}

impl FromRequest for SessionContext {
    type Error = Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(authenticate(req))
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    use super::*;
    use crate::domain::{HostProfile, HostUserId, SESSION_TTL, User};
    use crate::inbound::http::test_utils::{TestPorts, session_tokens, test_clock};
    use actix_web::http::StatusCode;
    use actix_web::{App, HttpResponse, test};
    use rstest::rstest;
    use serde_json::Value;

    fn whoami_app(
        state: HttpState,
    ) -> App<
        impl actix_web::dev::ServiceFactory<
            actix_web::dev::ServiceRequest,
            Config = (),
            Response = actix_web::dev::ServiceResponse,
            Error = actix_web::Error,
            InitError = (),
        >,
    > {
        App::new().app_data(web::Data::new(state)).route(
            "/whoami",
            web::get().to(|session: SessionContext| async move {
                HttpResponse::Ok().body(session.user_id().to_string())
            }),
        )
    }

    fn fixture_user() -> User {
        User::first_seen(HostUserId::new(42), HostProfile::default())
    }

    #[actix_web::test]
    async fn valid_bearer_yields_user_id() {
        let clock = test_clock();
        let tokens = session_tokens(&clock);
        let user = fixture_user();
        let issued = tokens.issue(&user).expect("token issues");
        let app = test::init_service(whoami_app(TestPorts::default().into_state(tokens))).await;

        let request = test::TestRequest::get()
            .uri("/whoami")
            .insert_header((AUTHORIZATION, format!("Bearer {}", issued.token)))
            .to_request();
        let body = test::call_and_read_body(&app, request).await;

        assert_eq!(body, user.id.to_string().as_bytes());
    }

    #[rstest]
    #[case::missing(None)]
    #[case::wrong_scheme(Some("Basic dXNlcjpwYXNz"))]
    #[case::empty_token(Some("Bearer   "))]
    #[case::garbage(Some("Bearer not-a-jwt"))]
    #[actix_web::test]
    async fn bad_headers_are_unauthorized(#[case] header: Option<&str>) {
        let clock = test_clock();
        let state = TestPorts::default().into_state(session_tokens(&clock));
        let app = test::init_service(whoami_app(state)).await;

        let mut request = test::TestRequest::get().uri("/whoami");
        if let Some(value) = header {
            request = request.insert_header((AUTHORIZATION, value));
        }
        let response = test::call_service(&app, request.to_request()).await;

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let body: Value = test::read_body_json(response).await;
        assert_eq!(body["code"], "unauthorized");
        assert_eq!(body["success"], false);
    }

    #[actix_web::test]
    async fn expired_session_is_unauthorized() {
        let clock = test_clock();
        let tokens = session_tokens(&clock);
        let issued = tokens.issue(&fixture_user()).expect("token issues");
        let app = test::init_service(whoami_app(TestPorts::default().into_state(tokens))).await;
        clock.advance(SESSION_TTL);

        let request = test::TestRequest::get()
            .uri("/whoami")
            .insert_header((AUTHORIZATION, format!("Bearer {}", issued.token)))
            .to_request();
        let response = test::call_service(&app, request).await;

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let body: Value = test::read_body_json(response).await;
        assert_eq!(body["message"], "Session expired.");
    }
}
