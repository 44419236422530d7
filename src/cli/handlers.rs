//! Command handlers. Each returns the process exit code.
//!
//! 0 means success, 2 means the build (or detection) came back negative, and
//! 1 means the command itself could not run.

use super::commands::{BatchArgs, BuildArgs, DetectArgs, ResolveArgs, RunArgs};
use super::output::{DetectionEntry, OutputFormatter, ResolveEntry, ResolveReport};
use crate::batch::{project_runner, BatchRunner};
use crate::config::BuildsieveConfig;
use crate::progress::{BarHandler, LoggingHandler, ProgressHandler};
use crate::project::Project;
use crate::remediation::{guess_package_name, AptCacheResolver, PackageResolver, RetryLoop};
use crate::runner::{CommandRunner, ShellRunner};
use crate::selector::StrategySelector;
use crate::stats::ProjectReport;
use crate::strategy::{DetectOptions, StrategyRegistry};
use crate::toolchain;
use anyhow::{bail, Context, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_ERROR: i32 = 1;
pub const EXIT_NEGATIVE: i32 = 2;

pub async fn handle_detect(args: &DetectArgs) -> i32 {
    exit_code(run_detect(args).await)
}

pub async fn handle_build(args: &BuildArgs) -> i32 {
    exit_code(run_build(args).await)
}

pub async fn handle_batch(args: &BatchArgs, quiet: bool) -> i32 {
    exit_code(run_batch(args, quiet).await)
}

pub async fn handle_resolve(args: &ResolveArgs) -> i32 {
    exit_code(run_resolve(args).await)
}

fn exit_code(result: Result<i32>) -> i32 {
    result.unwrap_or_else(|e| {
        error!("{:#}", e);
        eprintln!("Error: {:#}", e);
        EXIT_ERROR
    })
}

async fn run_detect(args: &DetectArgs) -> Result<i32> {
    let config = BuildsieveConfig::default();
    let options = DetectOptions {
        solution_depth: args.solution_depth.unwrap_or(config.solution_depth),
    };
    if options.solution_depth == 0 {
        bail!("Solution search depth must be at least 1");
    }

    let project = Project::from_path(project_path(args.path.as_deref())?);
    let detections: Vec<_> = StrategyRegistry::with_defaults()
        .detect_all(&project, &options)
        .into_iter()
        .map(|(_, detection)| detection)
        .collect();
    debug!(project = %project.name, count = detections.len(), "Detection finished");

    let entries = DetectionEntry::from_detections(&detections);
    let formatter = OutputFormatter::new(args.format.into());
    println!("{}", formatter.format_detections(&project.name, &entries)?);

    Ok(if entries.is_empty() {
        EXIT_NEGATIVE
    } else {
        EXIT_SUCCESS
    })
}

async fn run_build(args: &BuildArgs) -> Result<i32> {
    let config = load_config(&args.run, None)?;
    let project = Project::from_path(project_path(args.path.as_deref())?);

    let base: Arc<dyn CommandRunner> = Arc::new(ShellRunner::new());
    toolchain::preflight(&config.required_tools, base.as_ref(), &project.root).await?;

    if let Some(dir) = &config.transcript_dir {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create transcript directory {}", dir.display()))?;
    }

    let advisor = config
        .create_advisor(Arc::clone(&base))
        .context("Failed to create advisor")?;
    let runner = project_runner(base, config.transcript_dir.as_deref(), &project.name);
    let selector = StrategySelector::new(
        Arc::new(StrategyRegistry::with_defaults()),
        runner,
        config.selector_options(),
    );
    let retry = RetryLoop::new(Arc::new(selector), advisor)
        .with_install_command(config.install_command.clone());

    info!(project = %project.name, advisor = %config.advisor, "Building project");
    let result = retry.retry_build(&project, config.max_attempts).await;
    let report = ProjectReport::new(&project, &result);

    let formatter = OutputFormatter::new(args.format.into());
    println!("{}", formatter.format_report(&report, args.show_output)?);

    Ok(if report.is_success() {
        EXIT_SUCCESS
    } else {
        EXIT_NEGATIVE
    })
}

async fn run_batch(args: &BatchArgs, quiet: bool) -> Result<i32> {
    let config = load_config(&args.run, args.jobs)?;

    let (cancel_tx, cancel_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, stopping running builds");
            let _ = cancel_tx.send(true);
        }
    });

    let base: Arc<dyn CommandRunner> =
        Arc::new(ShellRunner::new().with_cancellation(cancel_rx.clone()));
    let advisor = config
        .create_advisor(Arc::clone(&base))
        .context("Failed to create advisor")?;
    let progress: Arc<dyn ProgressHandler> = if quiet || args.no_progress {
        Arc::new(LoggingHandler)
    } else {
        Arc::new(BarHandler::new())
    };

    let result = BatchRunner::new(config.batch_settings(), base, advisor)
        .with_progress(progress)
        .with_cancellation(cancel_rx)
        .run_dir(&args.repos_dir)
        .await?;

    if let Some(path) = &args.output {
        let json = serde_json::to_string_pretty(&result).context("Failed to serialize batch result")?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write results to {}", path.display()))?;
        info!(path = %path.display(), reports = result.reports.len(), "Results written");
    }

    let formatter = OutputFormatter::new(args.format.into());
    println!("{}", formatter.format_batch(&result)?);

    Ok(if result.cancelled {
        EXIT_NEGATIVE
    } else {
        EXIT_SUCCESS
    })
}

async fn run_resolve(args: &ResolveArgs) -> Result<i32> {
    let resolver = AptCacheResolver::new(Arc::new(ShellRunner::new()));
    let report = resolve_headers(&args.headers, &resolver).await;

    let formatter = OutputFormatter::new(args.format.into());
    println!("{}", formatter.format_resolve(&report)?);
    Ok(EXIT_SUCCESS)
}

async fn resolve_headers(headers: &[String], resolver: &dyn PackageResolver) -> ResolveReport {
    let mut entries = Vec::with_capacity(headers.len());
    for header in headers {
        let package = guess_package_name(header);
        let resolvable = match &package {
            Some(package) => resolver.can_resolve(package).await,
            None => false,
        };
        entries.push(ResolveEntry {
            header: header.clone(),
            package,
            resolvable,
        });
    }
    ResolveReport::new(entries)
}

/// Environment configuration with command-line overrides applied, validated
fn load_config(run: &RunArgs, jobs: Option<usize>) -> Result<BuildsieveConfig> {
    let mut config = BuildsieveConfig::default();
    apply_overrides(&mut config, run, jobs);
    config.validate().context("Invalid configuration")?;
    debug!("Configuration:\n{}", config);
    Ok(config)
}

fn apply_overrides(config: &mut BuildsieveConfig, run: &RunArgs, jobs: Option<usize>) {
    if let Some(max_attempts) = run.max_attempts {
        config.max_attempts = max_attempts;
    }
    if let Some(timeout) = run.timeout {
        config.command_timeout_secs = timeout;
    }
    if let Some(advisor) = run.advisor {
        config.advisor = advisor;
    }
    if run.no_probe {
        config.probe_alternates = false;
    }
    if let Some(dir) = &run.transcript_dir {
        config.transcript_dir = Some(dir.clone());
    }
    if let Some(jobs) = jobs {
        config.jobs = jobs;
    }
}

fn project_path(path: Option<&Path>) -> Result<PathBuf> {
    let path = path.unwrap_or_else(|| Path::new("."));
    let canonical = path
        .canonicalize()
        .with_context(|| format!("Project path {} does not exist", path.display()))?;
    if !canonical.is_dir() {
        bail!("Project path {} is not a directory", canonical.display());
    }
    Ok(canonical)
}
