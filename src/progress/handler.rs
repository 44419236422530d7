//! Progress handler trait and events

use std::time::Duration;

/// Events emitted while a batch runs
#[derive(Debug, Clone)]
pub enum ProgressEvent {
    /// Batch started with this many projects
    Started { total: usize },

    ProjectStarted { project: String },

    /// One project's retry loop finished
    ProjectFinished {
        project: String,
        status: String,
        attempts: usize,
        elapsed: Duration,
    },

    Completed {
        total: usize,
        successes: usize,
        elapsed: Duration,
    },
}

/// Trait for handling progress events during a batch
pub trait ProgressHandler: Send + Sync {
    fn on_progress(&self, event: &ProgressEvent);
}

/// No-op handler that ignores all events
#[derive(Debug, Default, Clone, Copy)]
pub struct NoOpHandler;

impl ProgressHandler for NoOpHandler {
    fn on_progress(&self, _event: &ProgressEvent) {}
}
