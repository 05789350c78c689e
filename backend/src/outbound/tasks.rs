//! Tokio-backed dispatcher for best-effort background work.
//!
//! Jobs run on the ambient runtime under the dispatching request's trace
//! identifier. Nothing awaits them; a job reports its own failures through
//! logs.

use tracing::debug;

use crate::domain::TraceId;
use crate::domain::ports::{BackgroundJob, BackgroundTasks};

/// Spawns each job onto the current Tokio runtime.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioBackgroundTasks;

impl BackgroundTasks for TokioBackgroundTasks {
    fn dispatch(&self, label: &'static str, job: BackgroundJob) {
        debug!(job = label, "dispatching background job");
        drop(tokio::spawn(TraceId::carry(job)));
    }
}
