//! Shared HTTP adapter state.
//!
//! HTTP handlers accept this state via `actix_web::web::Data` so they only
//! depend on domain ports (use-cases) and remain testable without I/O.

use std::sync::Arc;

use crate::domain::SessionTokens;
use crate::domain::ports::{IdentityHandshake, QuizCommand, TransactionVerification};

/// Parameter object bundling the driving ports.
#[derive(Clone)]
pub struct HttpStatePorts {
    pub handshake: Arc<dyn IdentityHandshake>,
    pub quiz: Arc<dyn QuizCommand>,
    pub transactions: Arc<dyn TransactionVerification>,
}

/// Dependency bundle for HTTP handlers.
#[derive(Clone)]
pub struct HttpState {
    pub handshake: Arc<dyn IdentityHandshake>,
    pub quiz: Arc<dyn QuizCommand>,
    pub transactions: Arc<dyn TransactionVerification>,
    /// Validates bearer tokens on protected routes.
    pub session_tokens: Arc<SessionTokens>,
}

impl HttpState {
    /// Construct state from the driving ports and the token validator.
    pub fn new(ports: HttpStatePorts, session_tokens: Arc<SessionTokens>) -> Self {
        let HttpStatePorts {
            handshake,
            quiz,
            transactions,
        } = ports;
        Self {
            handshake,
            quiz,
            transactions,
            session_tokens,
        }
    }
}
