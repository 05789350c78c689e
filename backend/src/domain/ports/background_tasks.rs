//! Port for best-effort, non-blocking side effects.
//!
//! Violation counters and profile refreshes must never delay or fail the
//! request that triggers them. Callers hand a job to [`BackgroundTasks`] and
//! move on; the job logs its own failure and nothing is reported back.

use std::future::Future;
use std::pin::Pin;

/// A detached unit of work. It owns everything it touches.
pub type BackgroundJob = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

/// Dispatcher for fire-and-forget jobs.
pub trait BackgroundTasks: Send + Sync {
    /// Queue `job` for execution. Must return without awaiting it.
    fn dispatch(&self, label: &'static str, job: BackgroundJob);
}
