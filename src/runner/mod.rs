//! Command execution
//!
//! Every build step goes through a [`CommandRunner`]. The working directory is
//! always passed explicitly; command strings are handed to the shell verbatim
//! and never prefixed with `cd`.

mod mock;
mod shell;
mod transcript;

pub use mock::{MockRunner, RecordedInvocation};
pub use shell::ShellRunner;
pub use transcript::TranscriptRunner;

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// How a command ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandStatus {
    /// Process exited on its own with this code
    Exited(i32),
    /// Process was terminated by a signal it did not ask for
    Signalled,
    /// Deadline elapsed; the process group was killed
    TimedOut,
    /// Cancellation was requested; the process group was killed
    Cancelled,
    /// The process could not be started at all
    SpawnFailed,
}

/// Result of running one command. Never mutated after creation.
#[derive(Debug, Clone)]
pub struct CommandResult {
    pub command: String,
    pub working_dir: PathBuf,
    pub status: CommandStatus,
    /// Combined stdout and stderr in arrival order
    pub output: String,
    pub duration: Duration,
}

impl CommandResult {
    pub fn success(&self) -> bool {
        self.status == CommandStatus::Exited(0)
    }

    pub fn exit_code(&self) -> Option<i32> {
        match self.status {
            CommandStatus::Exited(code) => Some(code),
            _ => None,
        }
    }

    /// Exit code in the shell convention (-1 when the process did not exit normally)
    pub fn return_code(&self) -> i32 {
        self.exit_code().unwrap_or(-1)
    }

    pub(crate) fn spawn_failed(
        command: &str,
        working_dir: &Path,
        error: impl std::fmt::Display,
        duration: Duration,
    ) -> Self {
        Self {
            command: command.to_string(),
            working_dir: working_dir.to_path_buf(),
            status: CommandStatus::SpawnFailed,
            output: format!("failed to start `{}`: {}\n", command, error),
            duration,
        }
    }
}

/// Executes shell commands on behalf of build strategies.
///
/// Implementations never fail: problems starting or supervising the process
/// are reported through [`CommandResult::status`] so that callers treat them
/// like any other failed step.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(
        &self,
        command: &str,
        working_dir: &Path,
        timeout: Option<Duration>,
    ) -> CommandResult;
}

#[async_trait]
impl<T: CommandRunner + ?Sized> CommandRunner for std::sync::Arc<T> {
    async fn run(
        &self,
        command: &str,
        working_dir: &Path,
        timeout: Option<Duration>,
    ) -> CommandResult {
        (**self).run(command, working_dir, timeout).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(status: CommandStatus) -> CommandResult {
        CommandResult {
            command: "make".to_string(),
            working_dir: PathBuf::from("/tmp"),
            status,
            output: String::new(),
            duration: Duration::from_millis(5),
        }
    }

    #[test]
    fn test_only_zero_exit_is_success() {
        assert!(result(CommandStatus::Exited(0)).success());
        assert!(!result(CommandStatus::Exited(2)).success());
        assert!(!result(CommandStatus::TimedOut).success());
        assert!(!result(CommandStatus::Cancelled).success());
        assert!(!result(CommandStatus::SpawnFailed).success());
    }

    #[test]
    fn test_return_code_for_abnormal_termination() {
        assert_eq!(result(CommandStatus::Exited(3)).return_code(), 3);
        assert_eq!(result(CommandStatus::Signalled).return_code(), -1);
        assert_eq!(result(CommandStatus::TimedOut).exit_code(), None);
    }

    #[test]
    fn test_spawn_failed_keeps_error_text() {
        let r = CommandResult::spawn_failed(
            "make",
            Path::new("/nope"),
            "No such file or directory",
            Duration::ZERO,
        );
        assert_eq!(r.status, CommandStatus::SpawnFailed);
        assert!(r.output.contains("No such file or directory"));
    }
}
