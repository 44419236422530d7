use super::{CommandResult, CommandRunner};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tracing::warn;

/// Appends every command and its output to a per-project transcript file.
///
/// Transcript problems are logged and otherwise ignored; they never change the
/// result handed back to the caller.
pub struct TranscriptRunner {
    inner: Arc<dyn CommandRunner>,
    path: PathBuf,
}

impl TranscriptRunner {
    pub fn new(inner: Arc<dyn CommandRunner>, path: impl Into<PathBuf>) -> Self {
        Self {
            inner,
            path: path.into(),
        }
    }

    /// Transcript location for a project inside `dir`
    pub fn transcript_path(dir: &Path, project_name: &str) -> PathBuf {
        let safe_name = project_name.replace(['/', '\\', ':', '*', '?', '"', '<', '>', '|'], "_");
        dir.join(format!("{}_build.log", safe_name))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn append(&self, result: &CommandResult) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;

        let mut entry = format!(
            "Running command: {} (in {})\n",
            result.command,
            result.working_dir.display()
        );
        entry.push_str(&result.output);
        if !result.output.is_empty() && !result.output.ends_with('\n') {
            entry.push('\n');
        }
        entry.push_str(&format!(
            "Command finished with return code: {}\n\n",
            result.return_code()
        ));

        file.write_all(entry.as_bytes()).await?;
        file.flush().await
    }
}

#[async_trait]
impl CommandRunner for TranscriptRunner {
    async fn run(
        &self,
        command: &str,
        working_dir: &Path,
        timeout: Option<Duration>,
    ) -> CommandResult {
        let result = self.inner.run(command, working_dir, timeout).await;
        if let Err(e) = self.append(&result).await {
            warn!(path = %self.path.display(), error = %e, "Failed to write command transcript");
        }
        result
    }
}
