//! Per-user, per-action cooldown gate.
//!
//! The limiter reads the last attempt for `(user, action)`, denies when the
//! action's cooldown has not elapsed, and otherwise records the attempt.
//! Read-then-write is not atomic: two concurrent requests can both pass.
//! Nothing that moves value relies on this gate alone; transaction replay
//! protection is enforced by store uniqueness instead.
//!
//! Store failures never deny. A failed read allows the action, a failed
//! write is logged, and violation counting runs as a background task.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::domain::ports::{BackgroundTasks, RateLimitGate, RateLimitRepository};
use crate::domain::{Error, UserId};

/// Action kinds with independent cooldowns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Comment,
    Like,
    Post,
    Tip,
    QuizStart,
    QuizSubmit,
}

impl ActionKind {
    pub const ALL: [ActionKind; 6] = [
        Self::Comment,
        Self::Like,
        Self::Post,
        Self::Tip,
        Self::QuizStart,
        Self::QuizSubmit,
    ];

    /// Storage key for the action.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Comment => "comment",
            Self::Like => "like",
            Self::Post => "post",
            Self::Tip => "tip",
            Self::QuizStart => "quiz_start",
            Self::QuizSubmit => "quiz_submit",
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| format!("unknown action kind: {s}"))
    }
}

/// Cooldown per action kind.
///
/// # Examples
/// ```
/// use std::time::Duration;
/// use zimbeat_backend::domain::{ActionKind, RateLimitPolicy};
///
/// let policy = RateLimitPolicy::default().with_cooldown(ActionKind::Tip, Duration::from_secs(30));
/// assert_eq!(policy.cooldown(ActionKind::Tip), Duration::from_secs(30));
/// assert_eq!(policy.cooldown(ActionKind::Like), Duration::from_millis(500));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitPolicy {
    comment: Duration,
    like: Duration,
    post: Duration,
    tip: Duration,
    quiz_start: Duration,
    quiz_submit: Duration,
}

impl Default for RateLimitPolicy {
    fn default() -> Self {
        Self {
            comment: Duration::from_secs(5),
            like: Duration::from_millis(500),
            post: Duration::from_secs(60),
            tip: Duration::from_secs(10),
            quiz_start: Duration::from_secs(5),
            quiz_submit: Duration::from_secs(2),
        }
    }
}

impl RateLimitPolicy {
    pub fn cooldown(&self, action: ActionKind) -> Duration {
        match action {
            ActionKind::Comment => self.comment,
            ActionKind::Like => self.like,
            ActionKind::Post => self.post,
            ActionKind::Tip => self.tip,
            ActionKind::QuizStart => self.quiz_start,
            ActionKind::QuizSubmit => self.quiz_submit,
        }
    }

    #[must_use]
    pub fn with_cooldown(mut self, action: ActionKind, cooldown: Duration) -> Self {
        let slot = match action {
            ActionKind::Comment => &mut self.comment,
            ActionKind::Like => &mut self.like,
            ActionKind::Post => &mut self.post,
            ActionKind::Tip => &mut self.tip,
            ActionKind::QuizStart => &mut self.quiz_start,
            ActionKind::QuizSubmit => &mut self.quiz_submit,
        };
        *slot = cooldown;
        self
    }
}

/// Stored attempt bookkeeping for one `(user, action)` pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitRecord {
    pub user_id: UserId,
    pub action: ActionKind,
    pub last_attempt_at: DateTime<Utc>,
    /// Passive telemetry. Incremented on each denial, never consulted.
    pub violation_count: i32,
}

/// Outcome of a limiter check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitDecision {
    Allow,
    Deny { retry_after_seconds: u64 },
}

/// Seconds to wait, rounded up so a denial never advertises zero.
fn retry_after_seconds(cooldown: Duration, elapsed: chrono::TimeDelta) -> u64 {
    let cooldown_ms = i64::try_from(cooldown.as_millis()).unwrap_or(i64::MAX);
    let elapsed_ms = elapsed.num_milliseconds().max(0);
    let remaining_ms = cooldown_ms.saturating_sub(elapsed_ms).max(1);
    u64::try_from(remaining_ms).unwrap_or(u64::MAX).div_ceil(1000)
}

/// Store-backed cooldown limiter.
pub struct RateLimiter<R> {
    repo: Arc<R>,
    policy: RateLimitPolicy,
    clock: Arc<dyn Clock>,
    tasks: Arc<dyn BackgroundTasks>,
}

impl<R> RateLimiter<R> {
    pub fn new(
        repo: Arc<R>,
        policy: RateLimitPolicy,
        clock: Arc<dyn Clock>,
        tasks: Arc<dyn BackgroundTasks>,
    ) -> Self {
        Self {
            repo,
            policy,
            clock,
            tasks,
        }
    }
}

impl<R> RateLimiter<R>
where
    R: RateLimitRepository + 'static,
{
    fn record_violation(&self, user_id: UserId, action: ActionKind) {
        let repo = Arc::clone(&self.repo);
        self.tasks.dispatch(
            "rate_limit.record_violation",
            Box::pin(async move {
                if let Err(error) = repo.record_violation(&user_id, action).await {
                    warn!(%user_id, %action, %error, "failed to record rate limit violation");
                }
            }),
        );
    }
}

#[async_trait]
impl<R> RateLimitGate for RateLimiter<R>
where
    R: RateLimitRepository + 'static,
{
    async fn check(&self, user_id: &UserId, action: ActionKind) -> RateLimitDecision {
        let now = self.clock.utc();
        let cooldown = self.policy.cooldown(action);

        match self.repo.find(user_id, action).await {
            Ok(Some(record)) => {
                let elapsed = now - record.last_attempt_at;
                let within_cooldown = elapsed
                    .to_std()
                    .map(|elapsed| elapsed < cooldown)
                    .unwrap_or(true);
                if within_cooldown {
                    let retry_after_seconds = retry_after_seconds(cooldown, elapsed);
                    debug!(%user_id, %action, retry_after_seconds, "rate limit denied");
                    self.record_violation(*user_id, action);
                    return RateLimitDecision::Deny {
                        retry_after_seconds,
                    };
                }
            }
            Ok(None) => {}
            Err(error) => {
                warn!(%user_id, %action, %error, "rate limit read failed; allowing");
                return RateLimitDecision::Allow;
            }
        }

        if let Err(error) = self.repo.record_attempt(user_id, action, now).await {
            warn!(%user_id, %action, %error, "rate limit write failed; allowing");
        }
        RateLimitDecision::Allow
    }
}

/// Map a denial into the domain error, for services that gate on the limiter.
pub async fn enforce(
    gate: &dyn RateLimitGate,
    user_id: &UserId,
    action: ActionKind,
) -> Result<(), Error> {
    match gate.check(user_id, action).await {
        RateLimitDecision::Allow => Ok(()),
        RateLimitDecision::Deny {
            retry_after_seconds,
        } => Err(Error::rate_limited(retry_after_seconds)),
    }
}

#[cfg(test)]
#[path = "rate_limit_tests.rs"]
mod tests;
