//! Handshake transport used by the client companion.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, StatusCode};
use tracing::debug;

use super::session_state::ClientSession;
use crate::domain::Error;
use crate::domain::ports::define_port_error;
use crate::inbound::http::auth::{AuthRequest, AuthResponseBody};

const USER_AGENT: &str = concat!("zimbeat-client/", env!("CARGO_PKG_VERSION"));

define_port_error! {
    /// Failures while exchanging an identity assertion for a session.
    pub enum AuthTransportError {
        Transport { message: String } => "auth transport failed: {message}",
        Rejected { status: u16, message: String } =>
            "handshake rejected with status {status}: {message}",
        Decode { message: String } => "invalid handshake response: {message}",
        MissingAssertion => "no identity assertion available for the handshake",
    }
}

impl AuthTransportError {
    /// The backend refused the assertion itself; retrying will not help.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Rejected { status: 401, .. })
    }
}

/// Performs the `POST /auth` handshake.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AuthTransport: Send + Sync {
    async fn handshake(&self, init_data: &str) -> Result<ClientSession, AuthTransportError>;
}

/// [`AuthTransport`] over HTTP.
pub struct ReqwestAuthTransport {
    client: Client,
    auth_url: String,
}

impl ReqwestAuthTransport {
    /// Build a transport for the backend at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns [`AuthTransportError::Transport`] when the reqwest client
    /// cannot be constructed.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, AuthTransportError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|err| AuthTransportError::transport(err.to_string()))?;
        Ok(Self {
            client,
            auth_url: format!("{}/auth", base_url.trim_end_matches('/')),
        })
    }
}

#[async_trait]
impl AuthTransport for ReqwestAuthTransport {
    async fn handshake(&self, init_data: &str) -> Result<ClientSession, AuthTransportError> {
        let request = AuthRequest {
            init_data: init_data.to_owned(),
        };
        let response = self
            .client
            .post(&self.auth_url)
            .json(&request)
            .send()
            .await
            .map_err(|err| AuthTransportError::transport(err.to_string()))?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|err| AuthTransportError::transport(err.to_string()))?;
        debug!(status = status.as_u16(), "handshake answered");
        if !status.is_success() {
            return Err(rejection(status, body.as_ref()));
        }
        decode_session(body.as_ref())
    }
}

fn rejection(status: StatusCode, body: &[u8]) -> AuthTransportError {
    let message = serde_json::from_slice::<Error>(body)
        .map(|error| error.message().to_owned())
        .unwrap_or_else(|_| {
            status
                .canonical_reason()
                .unwrap_or("unexpected status")
                .to_owned()
        });
    AuthTransportError::rejected(status.as_u16(), message)
}

fn decode_session(body: &[u8]) -> Result<ClientSession, AuthTransportError> {
    let decoded: AuthResponseBody = serde_json::from_slice(body)
        .map_err(|err| AuthTransportError::decode(err.to_string()))?;
    let expires_at = DateTime::parse_from_rfc3339(&decoded.expires_at)
        .map_err(|err| AuthTransportError::decode(format!("expiresAt: {err}")))?
        .with_timezone(&Utc);
    Ok(ClientSession::new(
        decoded.access_token,
        expires_at,
        decoded.user,
    ))
}
