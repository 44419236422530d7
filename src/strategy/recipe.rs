//! Ordered build steps and the engine that runs them
//!
//! A recipe is plain data: each step is either a shell command or a small
//! filesystem action, runs relative to the detected build root, and is either
//! tolerated (failure logged, sequence continues) or fatal (failure ends the
//! attempt with a fixed reason).

use super::{BuildOutcome, StrategyId};
use crate::runner::{CommandRunner, CommandStatus};
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Passed verbatim to the shell
    Shell(String),
    /// Delete files or directories; missing entries are fine
    Remove(Vec<String>),
    CreateDir(String),
    MakeExecutable(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Tolerance {
    Tolerated,
    Fatal(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    pub action: Action,
    /// Directory relative to the build root; `None` is the root itself
    pub subdir: Option<String>,
    pub tolerance: Tolerance,
    /// Only run when this path (relative to the build root) exists
    pub only_if_exists: Option<String>,
}

impl Step {
    fn new(action: Action) -> Self {
        Self {
            action,
            subdir: None,
            tolerance: Tolerance::Tolerated,
            only_if_exists: None,
        }
    }

    pub fn shell(command: impl Into<String>) -> Self {
        Self::new(Action::Shell(command.into()))
    }

    pub fn remove(paths: &[&str]) -> Self {
        Self::new(Action::Remove(paths.iter().map(|p| p.to_string()).collect()))
    }

    pub fn create_dir(path: impl Into<String>) -> Self {
        Self::new(Action::CreateDir(path.into()))
    }

    pub fn make_executable(path: impl Into<String>) -> Self {
        Self::new(Action::MakeExecutable(path.into()))
    }

    pub fn fatal(mut self, reason: impl Into<String>) -> Self {
        self.tolerance = Tolerance::Fatal(reason.into());
        self
    }

    pub fn in_dir(mut self, subdir: impl Into<String>) -> Self {
        self.subdir = Some(subdir.into());
        self
    }

    pub fn when_exists(mut self, path: impl Into<String>) -> Self {
        self.only_if_exists = Some(path.into());
        self
    }

    pub fn describe(&self) -> String {
        match &self.action {
            Action::Shell(command) => command.clone(),
            Action::Remove(paths) => format!("rm -rf {}", paths.join(" ")),
            Action::CreateDir(path) => format!("mkdir -p {}", path),
            Action::MakeExecutable(path) => format!("chmod 755 {}", path),
        }
    }

    fn working_dir(&self, build_root: &Path) -> PathBuf {
        match &self.subdir {
            Some(subdir) => build_root.join(subdir),
            None => build_root.to_path_buf(),
        }
    }
}

struct StepResult {
    success: bool,
    cancelled: bool,
    output: String,
}

/// Run `steps` in order from `build_root` and fold the results into an outcome
pub async fn execute(
    strategy: StrategyId,
    steps: &[Step],
    build_root: &Path,
    runner: &dyn CommandRunner,
    timeout: Option<Duration>,
) -> BuildOutcome {
    let mut transcript = String::new();

    for step in steps {
        if let Some(required) = &step.only_if_exists {
            if !build_root.join(required).exists() {
                debug!(strategy = %strategy, step = %step.describe(), "Skipping optional step");
                continue;
            }
        }

        let working_dir = step.working_dir(build_root);
        let result = match &step.action {
            Action::Shell(command) => {
                let result = runner.run(command, &working_dir, timeout).await;
                StepResult {
                    success: result.success(),
                    cancelled: result.status == CommandStatus::Cancelled,
                    output: result.output,
                }
            }
            Action::Remove(paths) => filesystem_step(remove_all(&working_dir, paths)),
            Action::CreateDir(path) => filesystem_step(std::fs::create_dir_all(working_dir.join(path))),
            Action::MakeExecutable(path) => filesystem_step(make_executable(&working_dir.join(path))),
        };

        transcript.push_str(&format!("$ {}\n", step.describe()));
        transcript.push_str(&result.output);
        if !result.output.is_empty() && !result.output.ends_with('\n') {
            transcript.push('\n');
        }

        if result.success {
            continue;
        }

        if result.cancelled {
            warn!(strategy = %strategy, step = %step.describe(), "Build cancelled");
            return BuildOutcome::cancelled(strategy, transcript);
        }

        match &step.tolerance {
            Tolerance::Tolerated => {
                info!(strategy = %strategy, step = %step.describe(), "Tolerated step failed, continuing");
            }
            Tolerance::Fatal(reason) => {
                warn!(strategy = %strategy, step = %step.describe(), reason = %reason, "Build step failed");
                return BuildOutcome::failed(strategy, reason.clone(), transcript, &result.output);
            }
        }
    }

    BuildOutcome::success(strategy, transcript)
}

fn filesystem_step(outcome: io::Result<()>) -> StepResult {
    match outcome {
        Ok(()) => StepResult {
            success: true,
            cancelled: false,
            output: String::new(),
        },
        Err(e) => StepResult {
            success: false,
            cancelled: false,
            output: format!("{}\n", e),
        },
    }
}

fn remove_all(dir: &Path, paths: &[String]) -> io::Result<()> {
    for path in paths {
        let target = dir.join(path);
        let removed = match std::fs::symlink_metadata(&target) {
            Ok(meta) if meta.is_dir() => std::fs::remove_dir_all(&target),
            Ok(_) => std::fs::remove_file(&target),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e),
        };
        removed.map_err(|e| io::Error::new(e.kind(), format!("{}: {}", target.display(), e)))?;
    }
    Ok(())
}

#[cfg(unix)]
fn make_executable(path: &Path) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755))
}

#[cfg(not(unix))]
fn make_executable(path: &Path) -> io::Result<()> {
    std::fs::metadata(path).map(|_| ())
}

/// Quote `value` for a POSIX shell
pub fn shell_quote(value: &str) -> String {
    if !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "._-/+=:@".contains(c))
    {
        return value.to_string();
    }
    format!("'{}'", value.replace('\'', r"'\''"))
}
