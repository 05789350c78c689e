//! Client-side session companion.
//!
//! A caller that talks to the backend keeps its bearer session in an
//! explicit [`SessionState`] handle, obtains it through an
//! [`AuthTransport`], and lets a [`SessionRefresher`] replace it before it
//! lapses.

mod refresher;
mod session_state;
mod transport;

pub use refresher::{CHECK_INTERVAL, REFRESH_WINDOW, RefreshOutcome, SessionRefresher};
pub use session_state::{ClientSession, SessionState};
#[cfg(test)]
pub use transport::MockAuthTransport;
pub use transport::{AuthTransport, AuthTransportError, ReqwestAuthTransport};
