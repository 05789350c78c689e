//! Domain primitives, aggregates, and services.
//!
//! Purpose: Define strongly typed domain entities and the trust checks that
//! guard them: host identity verification, session tokens, per-action
//! cooldowns, the quiz state machine, reward claim signatures, and chain
//! transaction verification. Adapters reach the domain only through
//! [`ports`].
//!
//! Public surface:
//! - Error (alias to `error::Error`) — API error response payload.
//! - ErrorCode (alias to `error::ErrorCode`) — stable error identifier.
//! - User (alias to `user::User`) — platform user keyed by host identity.
//! - HandshakeService, QuizService, TransactionService — driving port
//!   implementations wired by the server.

pub mod error;
mod handshake_service;
mod identity;
pub mod ports;
mod quiz;
mod quiz_service;
pub mod rate_limit;
pub mod reward;
mod secret;
mod session;
pub mod signature;
pub mod trace_id;
mod transaction;
mod transaction_service;
mod user;

pub use self::error::{Error, ErrorCode, ErrorValidationError};
pub use self::handshake_service::HandshakeService;
pub use self::identity::{
    IdentityError, IdentityVerifier, MAX_ASSERTION_AGE_SECS, MAX_ASSERTION_BYTES,
    MAX_FUTURE_SKEW_SECS, VerifiedIdentity,
};
pub use self::quiz::{
    QUESTION_ID_MAX, Question, QuestionId, QuizSession, QuizSessionId, QuizValidationError,
    SessionCompletion, SessionStatus, WATCH_RATIO, watch_requirement_met,
};
pub use self::quiz_service::{QuizService, REQUIREMENT_NOT_MET};
pub use self::rate_limit::{
    ActionKind, RateLimitDecision, RateLimitPolicy, RateLimitRecord, RateLimiter,
};
pub use self::reward::{ClaimMessage, ClaimSigner, ClaimTemplate, ClaimTemplateConfig, SignedClaim};
pub use self::secret::SecretKey;
pub use self::session::{
    IssuedSession, SESSION_TTL, SessionClaims, SessionError, SessionTokens,
};
pub use self::trace_id::TraceId;
pub use self::transaction::{
    ChainTransaction, TX_HASH_MAX, TransactionKind, TransactionRecord, TransactionStatus,
    TransactionValidationError, TxHash, VerificationTarget, tip_marker,
};
pub use self::transaction_service::{
    DEFAULT_MIN_AMOUNT_NANOTONS, TransactionService, TransactionServiceDeps, VerificationPolicy,
};
pub use self::user::{HostProfile, HostUserId, Role, UnknownRole, User, UserId};

/// Convenient API result alias.
///
/// # Examples
/// ```
/// use actix_web::HttpResponse;
/// use zimbeat_backend::domain::{ApiResult, Error};
///
/// fn handler() -> ApiResult<HttpResponse> {
///     Err(Error::forbidden("nope"))
/// }
/// ```
pub type ApiResult<T> = Result<T, Error>;
