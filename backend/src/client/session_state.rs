//! Injected holder for the current bearer session.

use std::fmt;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};
use mockable::Clock;

use crate::inbound::http::auth::AuthUserBody;

/// A session as the client sees it.
#[derive(Clone, PartialEq, Eq)]
pub struct ClientSession {
    access_token: String,
    expires_at: DateTime<Utc>,
    user: AuthUserBody,
}

impl ClientSession {
    pub fn new(access_token: String, expires_at: DateTime<Utc>, user: AuthUserBody) -> Self {
        Self {
            access_token,
            expires_at,
            user,
        }
    }

    pub fn access_token(&self) -> &str {
        &self.access_token
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    pub fn user(&self) -> &AuthUserBody {
        &self.user
    }

    /// True once `now` has reached the expiry instant.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

impl fmt::Debug for ClientSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientSession")
            .field("access_token", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .field("user", &self.user)
            .finish()
    }
}

/// Shared handle to the current session.
///
/// Set on login, cleared on logout, and dropped on read once expired.
/// Clones share the same slot.
#[derive(Clone)]
pub struct SessionState {
    slot: Arc<RwLock<Option<ClientSession>>>,
    clock: Arc<dyn Clock>,
}

impl SessionState {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            slot: Arc::new(RwLock::new(None)),
            clock,
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, Option<ClientSession>> {
        match self.slot.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn write(&self) -> RwLockWriteGuard<'_, Option<ClientSession>> {
        match self.slot.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    pub fn set(&self, session: ClientSession) {
        *self.write() = Some(session);
    }

    pub fn clear(&self) {
        *self.write() = None;
    }

    /// The live session, if any. An expired session is cleared and
    /// reported as absent.
    pub fn current(&self) -> Option<ClientSession> {
        let now = self.clock.utc();
        {
            let guard = self.read();
            match guard.as_ref() {
                None => return None,
                Some(session) if !session.is_expired_at(now) => return Some(session.clone()),
                Some(_) => {}
            }
        }
        let mut guard = self.write();
        if guard.as_ref().is_some_and(|session| session.is_expired_at(now)) {
            *guard = None;
        }
        guard.clone()
    }

    /// `Authorization` header value for outgoing calls.
    pub fn bearer(&self) -> Option<String> {
        self.current()
            .map(|session| format!("Bearer {}", session.access_token))
    }

    pub(crate) fn now(&self) -> DateTime<Utc> {
        self.clock.utc()
    }
}
