//! Proactive session refresh.
//!
//! Sessions are replaced before they lapse by re-running the handshake with
//! the identity assertion captured at login. Freshness is checked on a
//! fixed interval and whenever the host app returns to the foreground.
//! Concurrent refreshes share one in-flight handshake: a caller that had to
//! wait for another caller's handshake takes that result instead of issuing
//! its own.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chrono::TimeDelta;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::session_state::{ClientSession, SessionState};
use super::transport::{AuthTransport, AuthTransportError};

/// Refresh once a session has this long left.
pub const REFRESH_WINDOW: Duration = Duration::from_secs(5 * 60);
/// Period of the background freshness check.
pub const CHECK_INTERVAL: Duration = Duration::from_secs(30 * 60);

/// What a freshness check did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// The current session is outside the refresh window.
    StillFresh,
    /// This call ran the handshake.
    Refreshed(ClientSession),
    /// Another caller's handshake finished while this one waited.
    Joined(ClientSession),
}

#[derive(Default)]
struct Flight {
    last: Option<Result<ClientSession, AuthTransportError>>,
}

/// Keeps a [`SessionState`] fresh.
pub struct SessionRefresher {
    transport: Arc<dyn AuthTransport>,
    state: SessionState,
    assertion: Mutex<Option<String>>,
    flight: tokio::sync::Mutex<Flight>,
    completed: AtomicU64,
}

impl SessionRefresher {
    pub fn new(transport: Arc<dyn AuthTransport>, state: SessionState) -> Self {
        Self {
            transport,
            state,
            assertion: Mutex::new(None),
            flight: tokio::sync::Mutex::new(Flight::default()),
            completed: AtomicU64::new(0),
        }
    }

    fn assertion(&self) -> MutexGuard<'_, Option<String>> {
        match self.assertion.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Authenticate with a fresh identity assertion and keep it for later
    /// refreshes.
    ///
    /// # Errors
    ///
    /// Propagates the transport failure; the previous session is left as is.
    pub async fn login(&self, init_data: String) -> Result<ClientSession, AuthTransportError> {
        let mut flight = self.flight.lock().await;
        let session = self.transport.handshake(&init_data).await?;
        *self.assertion() = Some(init_data);
        self.state.set(session.clone());
        flight.last = Some(Ok(session.clone()));
        self.completed.fetch_add(1, Ordering::AcqRel);
        info!(user_id = %session.user().id, "session established");
        Ok(session)
    }

    /// Forget the session and the assertion behind it.
    pub fn logout(&self) {
        self.assertion().take();
        self.state.clear();
    }

    /// True when there is no live session or it lapses within
    /// [`REFRESH_WINDOW`].
    pub fn needs_refresh(&self) -> bool {
        let Some(session) = self.state.current() else {
            return true;
        };
        let window = TimeDelta::from_std(REFRESH_WINDOW).unwrap_or(TimeDelta::MAX);
        session.expires_at() - self.state.now() <= window
    }

    /// Refresh the session if it is missing or about to lapse.
    ///
    /// # Errors
    ///
    /// Returns [`AuthTransportError::MissingAssertion`] before any login, or
    /// the handshake failure. A `401` from the backend also clears the
    /// session and the stored assertion.
    pub async fn refresh_if_needed(&self) -> Result<RefreshOutcome, AuthTransportError> {
        if !self.needs_refresh() {
            return Ok(RefreshOutcome::StillFresh);
        }

        let seen = self.completed.load(Ordering::Acquire);
        let mut flight = self.flight.lock().await;
        if self.completed.load(Ordering::Acquire) != seen {
            debug!("joined in-flight session refresh");
            return match flight.last.clone() {
                Some(Ok(session)) => Ok(RefreshOutcome::Joined(session)),
                Some(Err(err)) => Err(err),
                None => Ok(RefreshOutcome::StillFresh),
            };
        }

        let init_data = self
            .assertion()
            .clone()
            .ok_or_else(AuthTransportError::missing_assertion)?;
        let result = self.transport.handshake(&init_data).await;
        match &result {
            Ok(session) => {
                self.state.set(session.clone());
                debug!(expires_at = %session.expires_at(), "session refreshed");
            }
            Err(err) if err.is_unauthorized() => {
                warn!(error = %err, "identity assertion no longer accepted");
                self.logout();
            }
            Err(err) => warn!(error = %err, "session refresh failed"),
        }
        flight.last = Some(result.clone());
        self.completed.fetch_add(1, Ordering::AcqRel);
        result.map(RefreshOutcome::Refreshed)
    }

    /// Foreground hook for the host app.
    ///
    /// # Errors
    ///
    /// See [`refresh_if_needed`](Self::refresh_if_needed).
    pub async fn on_foreground(&self) -> Result<RefreshOutcome, AuthTransportError> {
        self.refresh_if_needed().await
    }

    /// Spawn the periodic freshness check on the current Tokio runtime.
    pub fn spawn_periodic(self: &Arc<Self>) -> JoinHandle<()> {
        let refresher = Arc::clone(self);
        tokio::spawn(async move { refresher.run_periodic(CHECK_INTERVAL).await })
    }

    /// Check freshness every `period` until the task is dropped.
    pub async fn run_periodic(&self, period: Duration) {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            match self.refresh_if_needed().await {
                Ok(_) | Err(AuthTransportError::MissingAssertion) => {}
                Err(err) => debug!(error = %err, "periodic refresh will retry"),
            }
        }
    }
}
