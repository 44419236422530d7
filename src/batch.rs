//! Batch orchestration
//!
//! Projects run through their own retry loop inside a bounded worker pool.
//! Finished reports travel over a channel to one aggregator task, which is
//! the only owner of [`RunStats`].

use crate::progress::{NoOpHandler, ProgressEvent, ProgressHandler};
use crate::project::Project;
use crate::remediation::{Advisor, RetryLoop, DEFAULT_INSTALL_COMMAND};
use crate::runner::{CommandRunner, TranscriptRunner};
use crate::selector::{SelectorOptions, StrategySelector};
use crate::stats::{BatchSummary, ProjectReport, RunStats};
use crate::strategy::StrategyRegistry;
use crate::toolchain::{self, ToolNotFound};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tokio::sync::{mpsc, watch, Semaphore};
use tokio::task::JoinSet;
use tracing::{error, info, warn};

#[derive(Debug, Error)]
pub enum BatchError {
    #[error(transparent)]
    ToolNotFound(#[from] ToolNotFound),

    #[error("cannot read repositories directory {}: {source}", path.display())]
    ReposDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot create transcript directory {}: {source}", path.display())]
    TranscriptDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("result aggregator failed: {0}")]
    Aggregator(String),
}

#[derive(Debug, Clone)]
pub struct BatchSettings {
    pub jobs: usize,
    pub max_attempts: usize,
    pub selector: SelectorOptions,
    pub install_command: String,
    pub transcript_dir: Option<PathBuf>,
    pub required_tools: Vec<String>,
}

impl Default for BatchSettings {
    fn default() -> Self {
        Self {
            jobs: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1),
            max_attempts: 4,
            selector: SelectorOptions::default(),
            install_command: DEFAULT_INSTALL_COMMAND.to_string(),
            transcript_dir: None,
            required_tools: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchResult {
    /// Sorted by project name
    pub reports: Vec<ProjectReport>,
    pub summary: BatchSummary,
    /// Cancellation stopped the batch; unfinished projects have no report
    pub cancelled: bool,
}

pub struct BatchRunner {
    settings: BatchSettings,
    registry: Arc<StrategyRegistry>,
    runner: Arc<dyn CommandRunner>,
    advisor: Arc<dyn Advisor>,
    progress: Arc<dyn ProgressHandler>,
    cancel: Option<watch::Receiver<bool>>,
}

impl BatchRunner {
    pub fn new(
        settings: BatchSettings,
        runner: Arc<dyn CommandRunner>,
        advisor: Arc<dyn Advisor>,
    ) -> Self {
        Self {
            settings,
            registry: Arc::new(StrategyRegistry::with_defaults()),
            runner,
            advisor,
            progress: Arc::new(NoOpHandler),
            cancel: None,
        }
    }

    pub fn with_registry(mut self, registry: Arc<StrategyRegistry>) -> Self {
        self.registry = registry;
        self
    }

    pub fn with_progress(mut self, progress: Arc<dyn ProgressHandler>) -> Self {
        self.progress = progress;
        self
    }

    /// Projects not yet started are skipped once `cancel` turns true
    pub fn with_cancellation(mut self, cancel: watch::Receiver<bool>) -> Self {
        self.cancel = Some(cancel);
        self
    }

    /// Every subdirectory of `repos_dir`
    pub async fn run_dir(&self, repos_dir: &Path) -> Result<BatchResult, BatchError> {
        let projects = Project::discover(repos_dir).map_err(|source| BatchError::ReposDir {
            path: repos_dir.to_path_buf(),
            source,
        })?;
        self.run(projects).await
    }

    pub async fn run(&self, projects: Vec<Project>) -> Result<BatchResult, BatchError> {
        toolchain::preflight(
            &self.settings.required_tools,
            self.runner.as_ref(),
            &std::env::temp_dir(),
        )
        .await?;

        if let Some(dir) = &self.settings.transcript_dir {
            std::fs::create_dir_all(dir).map_err(|source| BatchError::TranscriptDir {
                path: dir.clone(),
                source,
            })?;
        }

        let start = Instant::now();
        let total = projects.len();
        let jobs = self.settings.jobs.max(1);
        info!(total, jobs, "Starting batch");
        self.progress.on_progress(&ProgressEvent::Started { total });

        let (tx, mut rx) = mpsc::channel::<ProjectReport>(jobs * 2);
        let aggregator = tokio::spawn(async move {
            let mut stats = RunStats::new();
            let mut reports = Vec::new();
            while let Some(report) = rx.recv().await {
                stats.record(&report);
                stats.log_running_totals();
                reports.push(report);
            }
            (stats, reports)
        });

        let semaphore = Arc::new(Semaphore::new(jobs));
        let mut tasks = JoinSet::new();

        for project in projects {
            let semaphore = Arc::clone(&semaphore);
            let tx = tx.clone();
            let retry = self.retry_loop_for(&project);
            let progress = Arc::clone(&self.progress);
            let cancel = self.cancel.clone();
            let max_attempts = self.settings.max_attempts;

            tasks.spawn(async move {
                let _permit = semaphore.acquire_owned().await.ok();

                if cancel.as_ref().map(|c| *c.borrow()).unwrap_or(false) {
                    return;
                }

                progress.on_progress(&ProgressEvent::ProjectStarted {
                    project: project.name.clone(),
                });
                let started = Instant::now();
                let result = retry.retry_build(&project, max_attempts).await;
                if result.outcome.is_cancelled() {
                    info!(project = %project.name, "Project cancelled, no report recorded");
                    return;
                }
                let report = ProjectReport::new(&project, &result);

                progress.on_progress(&ProgressEvent::ProjectFinished {
                    project: project.name.clone(),
                    status: report.status.clone(),
                    attempts: report.attempts,
                    elapsed: started.elapsed(),
                });

                if tx.send(report).await.is_err() {
                    warn!(project = %project.name, "Aggregator gone, dropping report");
                }
            });
        }
        drop(tx);

        while let Some(joined) = tasks.join_next().await {
            if let Err(e) = joined {
                error!(error = %e, "Project task failed");
            }
        }

        let (stats, mut reports) = aggregator
            .await
            .map_err(|e| BatchError::Aggregator(e.to_string()))?;
        reports.sort_by(|a, b| a.project.cmp(&b.project));

        let cancel_requested = self.cancel.as_ref().map(|c| *c.borrow()).unwrap_or(false);
        let cancelled = cancel_requested || reports.len() < total;
        if cancelled {
            warn!(finished = reports.len(), total, "Batch cancelled");
        }

        self.progress.on_progress(&ProgressEvent::Completed {
            total: stats.total(),
            successes: stats.successes(),
            elapsed: start.elapsed(),
        });

        Ok(BatchResult {
            reports,
            summary: stats.summary(),
            cancelled,
        })
    }

    fn retry_loop_for(&self, project: &Project) -> RetryLoop {
        let runner = project_runner(
            Arc::clone(&self.runner),
            self.settings.transcript_dir.as_deref(),
            &project.name,
        );
        let selector = StrategySelector::new(
            Arc::clone(&self.registry),
            runner,
            self.settings.selector,
        );
        RetryLoop::new(Arc::new(selector), Arc::clone(&self.advisor))
            .with_install_command(self.settings.install_command.clone())
    }
}

/// `base`, wrapped in a transcript writer when a transcript directory is set
pub fn project_runner(
    base: Arc<dyn CommandRunner>,
    transcript_dir: Option<&Path>,
    project_name: &str,
) -> Arc<dyn CommandRunner> {
    match transcript_dir {
        Some(dir) => Arc::new(TranscriptRunner::new(
            base,
            TranscriptRunner::transcript_path(dir, project_name),
        )),
        None => base,
    }
}
