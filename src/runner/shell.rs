use super::{CommandResult, CommandRunner, CommandStatus};
use async_trait::async_trait;
use std::path::Path;
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::{mpsc, watch};
use tracing::{debug, trace, warn};

const DEFAULT_SHELL: &str = "sh";

/// How long output is still collected after the shell itself has exited
const EXIT_DRAIN_GRACE: Duration = Duration::from_millis(250);

/// Upper bound for collecting output once the process group is killed
const KILL_DRAIN_LIMIT: Duration = Duration::from_secs(1);

/// Runs commands through `sh -c` in their own process group.
///
/// stdout and stderr are drained concurrently into a single buffer so that
/// diagnostics keep their relative order. On timeout or cancellation the whole
/// process group is killed and whatever output was captured is still returned.
/// The status follows the shell's own exit: background processes it leaves
/// behind are killed after a short grace period.
#[derive(Debug, Clone)]
pub struct ShellRunner {
    shell: String,
    cancel: Option<watch::Receiver<bool>>,
}

enum Termination {
    Exited(CommandStatus),
    TimedOut,
    Cancelled,
}

impl ShellRunner {
    pub fn new() -> Self {
        Self {
            shell: DEFAULT_SHELL.to_string(),
            cancel: None,
        }
    }

    /// Kill running commands once `cancel` flips to `true`
    pub fn with_cancellation(mut self, cancel: watch::Receiver<bool>) -> Self {
        self.cancel = Some(cancel);
        self
    }

    pub fn with_shell(mut self, shell: impl Into<String>) -> Self {
        self.shell = shell.into();
        self
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().map(|rx| *rx.borrow()).unwrap_or(false)
    }
}

impl Default for ShellRunner {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CommandRunner for ShellRunner {
    async fn run(
        &self,
        command: &str,
        working_dir: &Path,
        timeout: Option<Duration>,
    ) -> CommandResult {
        let start = Instant::now();
        debug!(command, dir = %working_dir.display(), "Running command");

        if self.is_cancelled() {
            return CommandResult {
                command: command.to_string(),
                working_dir: working_dir.to_path_buf(),
                status: CommandStatus::Cancelled,
                output: String::new(),
                duration: start.elapsed(),
            };
        }

        let mut cmd = Command::new(&self.shell);
        cmd.arg("-c")
            .arg(command)
            .current_dir(working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        #[cfg(unix)]
        cmd.process_group(0);

        let mut child = match cmd.spawn() {
            Ok(child) => child,
            Err(e) => {
                warn!(command, error = %e, "Failed to start command");
                return CommandResult::spawn_failed(command, working_dir, e, start.elapsed());
            }
        };

        let (tx, mut rx) = mpsc::unbounded_channel();
        if let Some(stdout) = child.stdout.take() {
            forward_lines(stdout, tx.clone());
        }
        if let Some(stderr) = child.stderr.take() {
            forward_lines(stderr, tx.clone());
        }
        drop(tx);

        let pgid = child.id();
        let deadline = timeout.map(|t| tokio::time::Instant::now() + t);
        let mut cancel = self.cancel.clone();
        let mut output = String::new();
        let mut streams_open = true;

        let termination = loop {
            tokio::select! {
                line = rx.recv(), if streams_open => match line {
                    Some(line) => {
                        trace!(target: "buildsieve::runner", "{}", line.trim_end());
                        output.push_str(&line);
                    }
                    None => streams_open = false,
                },
                waited = child.wait() => break Termination::Exited(exit_status(waited)),
                _ = sleep_until(deadline) => break Termination::TimedOut,
                _ = cancelled(&mut cancel) => break Termination::Cancelled,
            }
        };

        let status = match termination {
            Termination::Exited(status) => {
                drain_output(&mut rx, &mut output, EXIT_DRAIN_GRACE).await;
                // Stragglers still holding the pipes open.
                kill_group(pgid);
                status
            }
            Termination::TimedOut => {
                kill_process_group(&mut child).await;
                CommandStatus::TimedOut
            }
            Termination::Cancelled => {
                kill_process_group(&mut child).await;
                CommandStatus::Cancelled
            }
        };
        drain_output(&mut rx, &mut output, KILL_DRAIN_LIMIT).await;

        let duration = start.elapsed();
        match status {
            CommandStatus::Exited(0) => {
                debug!(command, duration_ms = duration.as_millis() as u64, "Command succeeded")
            }
            CommandStatus::TimedOut => warn!(
                command,
                timeout_secs = timeout.map(|t| t.as_secs()).unwrap_or_default(),
                "Command timed out, process group killed"
            ),
            CommandStatus::Cancelled => warn!(command, "Command cancelled, process group killed"),
            other => debug!(command, status = ?other, duration_ms = duration.as_millis() as u64, "Command failed"),
        }

        CommandResult {
            command: command.to_string(),
            working_dir: working_dir.to_path_buf(),
            status,
            output,
            duration,
        }
    }
}

fn forward_lines<R>(stream: R, tx: mpsc::UnboundedSender<String>)
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut reader = BufReader::new(stream);
        let mut buf = Vec::new();
        loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf).await {
                Ok(0) => break,
                Ok(_) => {
                    if tx.send(String::from_utf8_lossy(&buf).into_owned()).is_err() {
                        break;
                    }
                }
                Err(e) => {
                    debug!(error = %e, "Stopped reading command output");
                    break;
                }
            }
        }
    });
}

async fn sleep_until(deadline: Option<tokio::time::Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

async fn cancelled(cancel: &mut Option<watch::Receiver<bool>>) {
    let Some(rx) = cancel else {
        return std::future::pending().await;
    };
    loop {
        if *rx.borrow_and_update() {
            return;
        }
        if rx.changed().await.is_err() {
            // Sender gone: nobody can cancel any more.
            return std::future::pending().await;
        }
    }
}

/// Collect forwarded lines until both pipes close or `limit` elapses
async fn drain_output(rx: &mut mpsc::UnboundedReceiver<String>, output: &mut String, limit: Duration) {
    let deadline = tokio::time::Instant::now() + limit;
    while let Ok(Some(line)) = tokio::time::timeout_at(deadline, rx.recv()).await {
        output.push_str(&line);
    }
}

fn exit_status(waited: std::io::Result<std::process::ExitStatus>) -> CommandStatus {
    match waited {
        Ok(status) => match status.code() {
            Some(code) => CommandStatus::Exited(code),
            None => CommandStatus::Signalled,
        },
        Err(e) => {
            warn!(error = %e, "Failed to wait for command");
            CommandStatus::Signalled
        }
    }
}

fn kill_group(pgid: Option<u32>) {
    #[cfg(unix)]
    if let Some(pgid) = pgid {
        // SAFETY: killpg only sends a signal; the group was created for this child.
        unsafe {
            libc::killpg(pgid as libc::pid_t, libc::SIGKILL);
        }
    }
    #[cfg(not(unix))]
    let _ = pgid;
}

async fn kill_process_group(child: &mut Child) {
    kill_group(child.id());
    if let Err(e) = child.start_kill() {
        debug!(error = %e, "Child already gone");
    }
    let _ = child.wait().await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_runs_in_working_directory() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("marker.txt"), "here").unwrap();

        let result = ShellRunner::new()
            .run("cat marker.txt", dir.path(), None)
            .await;

        assert!(result.success());
        assert_eq!(result.output, "here");
        assert_eq!(result.working_dir, dir.path());
    }

    #[tokio::test]
    async fn test_captures_both_streams_in_order() {
        let dir = TempDir::new().unwrap();
        let result = ShellRunner::new()
            .run(
                "echo first; sleep 0.1; echo second >&2; sleep 0.1; echo third",
                dir.path(),
                None,
            )
            .await;

        assert!(result.success());
        assert_eq!(result.output, "first\nsecond\nthird\n");
    }

    #[tokio::test]
    async fn test_non_zero_exit_is_reported() {
        let dir = TempDir::new().unwrap();
        let result = ShellRunner::new().run("echo oops; exit 3", dir.path(), None).await;

        assert!(!result.success());
        assert_eq!(result.status, CommandStatus::Exited(3));
        assert!(result.output.contains("oops"));
    }

    #[tokio::test]
    async fn test_timeout_keeps_partial_output() {
        let dir = TempDir::new().unwrap();
        let result = ShellRunner::new()
            .run(
                "echo 'fatal error: late.h: No such file or directory'; sleep 30",
                dir.path(),
                Some(Duration::from_millis(500)),
            )
            .await;

        assert_eq!(result.status, CommandStatus::TimedOut);
        assert!(result.output.contains("late.h"));
        assert!(result.duration < Duration::from_secs(10));
    }

    #[tokio::test]
    async fn test_background_child_does_not_hold_up_exit() {
        let dir = TempDir::new().unwrap();
        let result = ShellRunner::new()
            .run("echo built; sleep 20 & exit 0", dir.path(), Some(Duration::from_secs(3)))
            .await;

        assert_eq!(result.status, CommandStatus::Exited(0));
        assert_eq!(result.output, "built\n");
        assert!(result.duration < Duration::from_secs(3));
    }

    #[tokio::test]
    async fn test_background_child_without_timeout_returns() {
        let dir = TempDir::new().unwrap();
        let runner = ShellRunner::new();
        let run = runner.run("sleep 20 & exit 4", dir.path(), None);

        let result = tokio::time::timeout(Duration::from_secs(10), run)
            .await
            .expect("runner returns once the shell exits");
        assert_eq!(result.status, CommandStatus::Exited(4));
    }

    #[tokio::test]
    async fn test_output_after_kill_is_kept() {
        let dir = TempDir::new().unwrap();
        let result = ShellRunner::new()
            .run(
                "for i in 1 2 3 4 5; do echo line$i; done; sleep 30",
                dir.path(),
                Some(Duration::from_millis(300)),
            )
            .await;

        assert_eq!(result.status, CommandStatus::TimedOut);
        assert_eq!(result.output, "line1\nline2\nline3\nline4\nline5\n");
    }

    #[tokio::test]
    async fn test_missing_working_directory_is_a_failed_result() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("does-not-exist");
        let result = ShellRunner::new().run("true", &missing, None).await;

        assert_eq!(result.status, CommandStatus::SpawnFailed);
        assert!(!result.output.is_empty());
    }

    #[tokio::test]
    async fn test_cancellation_kills_running_command() {
        let dir = TempDir::new().unwrap();
        let (tx, rx) = watch::channel(false);
        let runner = ShellRunner::new().with_cancellation(rx);

        let handle = tokio::spawn({
            let path = dir.path().to_path_buf();
            async move { runner.run("sleep 30", &path, None).await }
        });
        tokio::time::sleep(Duration::from_millis(200)).await;
        tx.send(true).unwrap();

        let result = handle.await.unwrap();
        assert_eq!(result.status, CommandStatus::Cancelled);
        assert!(result.duration < Duration::from_secs(10));
    }

    #[tokio::test]
    async fn test_already_cancelled_runner_does_not_spawn() {
        let dir = TempDir::new().unwrap();
        let (_tx, rx) = watch::channel(true);
        let runner = ShellRunner::new().with_cancellation(rx);

        let result = runner.run("touch created", dir.path(), None).await;
        assert_eq!(result.status, CommandStatus::Cancelled);
        assert!(!dir.path().join("created").exists());
    }
}
