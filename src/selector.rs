//! Strategy selection
//!
//! Strategies are consulted in a fixed priority order and the first one that
//! detects is built. When that build fails, the other detecting strategies may
//! be built as well, but only to record which of them would have worked: the
//! primary outcome is never replaced.

use crate::project::Project;
use crate::runner::CommandRunner;
use crate::strategy::{BuildOutcome, DetectOptions, Detection, Strategy, StrategyRegistry};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy)]
pub struct SelectorOptions {
    /// Per-command timeout; `None` disables it
    pub timeout: Option<Duration>,
    pub probe_alternates: bool,
    pub detect: DetectOptions,
}

impl Default for SelectorOptions {
    fn default() -> Self {
        Self {
            timeout: Some(Duration::from_secs(1800)),
            probe_alternates: true,
            detect: DetectOptions::default(),
        }
    }
}

pub struct StrategySelector {
    registry: Arc<StrategyRegistry>,
    runner: Arc<dyn CommandRunner>,
    options: SelectorOptions,
}

impl StrategySelector {
    pub fn new(
        registry: Arc<StrategyRegistry>,
        runner: Arc<dyn CommandRunner>,
        options: SelectorOptions,
    ) -> Self {
        Self {
            registry,
            runner,
            options,
        }
    }

    pub fn with_defaults(runner: Arc<dyn CommandRunner>) -> Self {
        Self::new(
            Arc::new(StrategyRegistry::with_defaults()),
            runner,
            SelectorOptions::default(),
        )
    }

    pub fn runner(&self) -> &Arc<dyn CommandRunner> {
        &self.runner
    }

    pub fn options(&self) -> &SelectorOptions {
        &self.options
    }

    /// Every applicable strategy, highest priority first. Runs no commands.
    pub fn detect_all(&self, project: &Project) -> Vec<(Arc<Strategy>, Detection)> {
        self.registry.detect_all(project, &self.options.detect)
    }

    pub async fn select_and_build(&self, project: &Project) -> BuildOutcome {
        let mut detected = self.detect_all(project).into_iter();

        let Some((primary, detection)) = detected.next() else {
            info!(project = %project.name, "No build system detected");
            return BuildOutcome::undetectable();
        };

        info!(
            project = %project.name,
            strategy = %primary.id(),
            build_root = %detection.build_root.display(),
            "Building"
        );
        let start = Instant::now();
        let mut outcome = primary
            .build(&detection, self.runner.as_ref(), self.options.timeout)
            .await;

        if outcome.is_success() {
            info!(
                project = %project.name,
                strategy = %primary.id(),
                duration_ms = start.elapsed().as_millis() as u64,
                "Build succeeded"
            );
            return outcome;
        }

        if outcome.is_cancelled() {
            info!(project = %project.name, strategy = %primary.id(), "Build cancelled");
            return outcome;
        }

        warn!(
            project = %project.name,
            strategy = %primary.id(),
            reason = outcome.reason().unwrap_or_default(),
            symbols = outcome.unresolved_symbols.len(),
            "Build failed"
        );

        if !self.options.probe_alternates {
            return outcome;
        }

        for (alternate, alt_detection) in detected {
            debug!(project = %project.name, strategy = %alternate.id(), "Probing alternate strategy");
            let alt_outcome = alternate
                .build(&alt_detection, self.runner.as_ref(), self.options.timeout)
                .await;
            if alt_outcome.is_cancelled() {
                break;
            }
            if alt_outcome.is_success() {
                info!(
                    project = %project.name,
                    strategy = %alternate.id(),
                    "Alternate strategy succeeded"
                );
                outcome.alternate_successes.push(alternate.id());
            }
        }

        outcome
    }
}
