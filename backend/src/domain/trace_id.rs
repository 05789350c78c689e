//! Request-scoped correlation identifier.
//!
//! Handlers run inside [`TraceId::scope`], so errors and log lines can read
//! the active identifier through [`TraceId::current`] without threading it
//! through every call. Tokio task-locals do not follow `tokio::spawn`; work
//! dispatched to the background must be wrapped with [`TraceId::carry`].

use std::future::Future;
use std::pin::Pin;

use tokio::task_local;
use uuid::Uuid;

task_local! {
    static TRACE_ID: TraceId;
}

/// Correlation identifier attached to every request.
///
/// # Examples
/// ```
/// use zimbeat_backend::domain::TraceId;
///
/// # tokio::runtime::Runtime::new().unwrap().block_on(async {
/// let trace_id: TraceId = "00000000-0000-0000-0000-000000000000"
///     .parse()
///     .expect("valid UUID");
/// let observed = TraceId::scope(trace_id, async { TraceId::current() }).await;
/// assert_eq!(observed, Some(trace_id));
/// # });
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TraceId(Uuid);

impl TraceId {
    /// Generate a new random trace identifier.
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    #[must_use]
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the identifier of the enclosing scope, if any.
    #[must_use]
    pub fn current() -> Option<Self> {
        TRACE_ID.try_with(|id| *id).ok()
    }

    #[must_use]
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }

    /// Run `fut` with `trace_id` in scope.
    pub async fn scope<Fut>(trace_id: TraceId, fut: Fut) -> Fut::Output
    where
        Fut: Future,
    {
        TRACE_ID.scope(trace_id, fut).await
    }

    /// Wrap `fut` so it runs under the identifier active at call time.
    ///
    /// Used before handing work to a spawned task. Returns the future
    /// unchanged when no identifier is in scope.
    pub fn carry<Fut>(fut: Fut) -> Pin<Box<dyn Future<Output = Fut::Output> + Send>>
    where
        Fut: Future + Send + 'static,
        Fut::Output: Send,
    {
        match Self::current() {
            Some(trace_id) => Box::pin(TRACE_ID.scope(trace_id, fut)),
            None => Box::pin(fut),
        }
    }
}

impl std::fmt::Display for TraceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for TraceId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}
