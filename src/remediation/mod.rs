//! Remediation of missing-dependency failures
//!
//! An [`Advisor`] turns one unresolved symbol (plus the failing log) into a
//! [`Remedy`]; the [`RetryLoop`] applies remedies and rebuilds until the
//! project succeeds, the attempt budget runs out, or no new remedy helps.

mod advisor;
mod package;
mod retry;

pub use advisor::{ChainAdvisor, HeuristicAdvisor, LlmAdvisor, NoAdvisor};
pub use package::{guess_package_name, AptCacheResolver, PackageResolver};
pub use retry::{RetryLoop, RetryOutcome, DEFAULT_INSTALL_COMMAND};

use crate::llm::LlmError;
use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

/// A corrective action proposed by an advisor
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "kebab-case")]
pub enum Remedy {
    /// Shell command run verbatim from the project root
    Command(String),
    /// System package to install
    Package(String),
}

/// Everything an advisor may look at for one unresolved symbol
#[derive(Debug, Clone, Default)]
pub struct AdviceRequest {
    pub project: String,
    pub symbol: String,
    /// Output of the failed build
    pub log_content: String,
    /// Remedy command applied in the previous iteration, if any
    pub prior_command: Option<String>,
    pub prior_output: Option<String>,
    /// 1-based build attempt that produced `log_content`
    pub attempt: usize,
    pub max_attempts: usize,
}

/// One remedy and whether it was applied successfully
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemediationAction {
    pub symbol: String,
    pub remedy: Remedy,
    /// The shell command the remedy expanded to
    pub command: String,
    pub applied: bool,
    pub output: String,
}

#[derive(Debug, Error)]
pub enum AdvisorError {
    #[error("LLM advisor failed: {0}")]
    Llm(#[from] LlmError),
}

/// Suggests a remedy for an unresolved symbol. `Ok(None)` means no idea.
#[async_trait]
pub trait Advisor: Send + Sync {
    async fn suggest(&self, request: &AdviceRequest) -> Result<Option<Remedy>, AdvisorError>;

    fn name(&self) -> &str;
}
