//! Test helpers for inbound HTTP components.

use std::sync::Arc;

use chrono::{TimeZone, Utc};

use crate::domain::SESSION_TTL;
use crate::domain::SessionTokens;
use crate::domain::ports::{
    IdentityHandshake, MockIdentityHandshake, MockQuizCommand, MockTransactionVerification,
    QuizCommand, TransactionVerification,
};
use crate::test_support::MutableClock;

use super::state::{HttpState, HttpStatePorts};

/// Session secret used by handler tests.
pub const TEST_SESSION_SECRET: &str = "handler-tests-session-secret-0123456789";

/// Clock pinned to a fixed instant.
pub fn test_clock() -> Arc<MutableClock> {
    let start = Utc
        .with_ymd_and_hms(2026, 1, 15, 12, 0, 0)
        .single()
        .expect("valid fixture instant");
    Arc::new(MutableClock::new(start))
}

/// Token minter/validator sharing `clock`.
pub fn session_tokens(clock: &Arc<MutableClock>) -> Arc<SessionTokens> {
    Arc::new(SessionTokens::new(
        &TEST_SESSION_SECRET.into(),
        SESSION_TTL,
        clock.clone(),
    ))
}

/// Driving ports for handler tests.
///
/// Defaults are mocks without expectations, so an unexpected call fails the
/// test.
pub struct TestPorts {
    pub handshake: Arc<dyn IdentityHandshake>,
    pub quiz: Arc<dyn QuizCommand>,
    pub transactions: Arc<dyn TransactionVerification>,
}

impl Default for TestPorts {
    fn default() -> Self {
        Self {
            handshake: Arc::new(MockIdentityHandshake::new()),
            quiz: Arc::new(MockQuizCommand::new()),
            transactions: Arc::new(MockTransactionVerification::new()),
        }
    }
}

impl TestPorts {
    pub fn into_state(self, session_tokens: Arc<SessionTokens>) -> HttpState {
        HttpState::new(
            HttpStatePorts {
                handshake: self.handshake,
                quiz: self.quiz,
                transactions: self.transactions,
            },
            session_tokens,
        )
    }
}
