//! Startup check for required build tools

use crate::runner::CommandRunner;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error};

const VERSION_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Error, PartialEq, Eq)]
#[error("required tool '{tool}' is not available: {detail}")]
pub struct ToolNotFound {
    pub tool: String,
    pub detail: String,
}

/// Run `<tool> --version` for every tool; the first one that fails is returned
pub async fn preflight(
    tools: &[String],
    runner: &dyn CommandRunner,
    working_dir: &Path,
) -> Result<(), ToolNotFound> {
    for tool in tools.iter().map(|t| t.trim()).filter(|t| !t.is_empty()) {
        let result = runner
            .run(&format!("{} --version", tool), working_dir, Some(VERSION_TIMEOUT))
            .await;

        if !result.success() {
            let detail = result
                .output
                .lines()
                .find(|l| !l.trim().is_empty())
                .map(str::to_string)
                .unwrap_or_else(|| format!("exit code {}", result.return_code()));
            error!(tool, detail = %detail, "Required tool missing");
            return Err(ToolNotFound {
                tool: tool.to_string(),
                detail,
            });
        }

        debug!(
            tool,
            version = result.output.lines().next().unwrap_or_default(),
            "Tool available"
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::{MockRunner, ShellRunner};

    #[tokio::test]
    async fn test_all_tools_present() {
        let runner = MockRunner::new();
        let tools = vec!["make".to_string(), " cmake ".to_string(), "".to_string()];

        preflight(&tools, &runner, Path::new("/")).await.unwrap();

        assert_eq!(runner.commands(), vec!["make --version", "cmake --version"]);
    }

    #[tokio::test]
    async fn test_missing_tool_stops_preflight() {
        let runner = MockRunner::new().on("bazel", 127, "sh: 1: bazel: not found\n");
        let tools = vec!["bazel".to_string(), "make".to_string()];

        let err = preflight(&tools, &runner, Path::new("/")).await.unwrap_err();

        assert_eq!(err.tool, "bazel");
        assert_eq!(err.detail, "sh: 1: bazel: not found");
        assert_eq!(runner.invocation_count(), 1);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_real_shell_missing_binary() {
        let tools = vec!["definitely-not-a-real-tool-xyz".to_string()];
        let result = preflight(&tools, &ShellRunner::new(), &std::env::temp_dir()).await;
        assert!(result.is_err());
    }
}
