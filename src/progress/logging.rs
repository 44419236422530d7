//! Logging-based progress handler

use super::{ProgressEvent, ProgressHandler};
use tracing::{debug, info, warn};

/// Handler that logs progress events using tracing
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingHandler;

impl ProgressHandler for LoggingHandler {
    fn on_progress(&self, event: &ProgressEvent) {
        match event {
            ProgressEvent::Started { total } => {
                info!(total, "Starting batch");
            }
            ProgressEvent::ProjectStarted { project } => {
                debug!(project = %project, "Starting project");
            }
            ProgressEvent::ProjectFinished {
                project,
                status,
                attempts,
                elapsed,
            } => {
                if status == "success" {
                    info!(
                        project = %project,
                        attempts,
                        duration_ms = elapsed.as_millis() as u64,
                        "Project built"
                    );
                } else {
                    warn!(
                        project = %project,
                        status = %status,
                        attempts,
                        duration_ms = elapsed.as_millis() as u64,
                        "Project did not build"
                    );
                }
            }
            ProgressEvent::Completed {
                total,
                successes,
                elapsed,
            } => {
                info!(
                    total,
                    successes,
                    duration_ms = elapsed.as_millis() as u64,
                    "Batch complete"
                );
            }
        }
    }
}
