use super::StrategyId;
use crate::diagnostics;
use serde::{Deserialize, Serialize};

/// Why a build attempt failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailureCategory {
    /// A fatal step failed without any recognisable missing dependency
    ToolFailure,
    /// A fatal step failed and its output named missing headers or packages
    MissingDependency,
}

/// Terminal status of one top-level build attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum BuildStatus {
    Success,
    Failed {
        reason: String,
        category: FailureCategory,
    },
    Undetectable,
    /// A command was killed because the run was cancelled
    Cancelled,
}

/// Record of one top-level build attempt.
///
/// Build failures are data: strategies and the selector always hand back an
/// outcome and never an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildOutcome {
    pub strategy: Option<StrategyId>,
    pub status: BuildStatus,
    /// Sorted, de-duplicated
    pub unresolved_symbols: Vec<String>,
    pub output: String,
    /// Other detected strategies whose own build succeeded after this one failed
    pub alternate_successes: Vec<StrategyId>,
}

impl BuildOutcome {
    pub fn success(strategy: StrategyId, output: String) -> Self {
        Self {
            strategy: Some(strategy),
            status: BuildStatus::Success,
            unresolved_symbols: Vec::new(),
            output,
            alternate_successes: Vec::new(),
        }
    }

    /// Failed attempt; `failing_output` is the fatal step's own output and is
    /// the only text scanned for missing dependencies.
    pub fn failed(
        strategy: StrategyId,
        reason: impl Into<String>,
        output: String,
        failing_output: &str,
    ) -> Self {
        let unresolved_symbols: Vec<String> =
            diagnostics::extract(failing_output).into_iter().collect();
        let category = if unresolved_symbols.is_empty() {
            FailureCategory::ToolFailure
        } else {
            FailureCategory::MissingDependency
        };

        Self {
            strategy: Some(strategy),
            status: BuildStatus::Failed {
                reason: reason.into(),
                category,
            },
            unresolved_symbols,
            output,
            alternate_successes: Vec::new(),
        }
    }

    pub fn undetectable() -> Self {
        Self {
            strategy: None,
            status: BuildStatus::Undetectable,
            unresolved_symbols: Vec::new(),
            output: String::new(),
            alternate_successes: Vec::new(),
        }
    }

    /// Attempt cut short by cancellation; carries the output captured so far
    pub fn cancelled(strategy: StrategyId, output: String) -> Self {
        Self {
            strategy: Some(strategy),
            status: BuildStatus::Cancelled,
            unresolved_symbols: Vec::new(),
            output,
            alternate_successes: Vec::new(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == BuildStatus::Success
    }

    pub fn is_undetectable(&self) -> bool {
        self.status == BuildStatus::Undetectable
    }

    pub fn is_cancelled(&self) -> bool {
        self.status == BuildStatus::Cancelled
    }

    pub fn is_missing_dependency(&self) -> bool {
        matches!(
            self.status,
            BuildStatus::Failed {
                category: FailureCategory::MissingDependency,
                ..
            }
        )
    }

    /// Failure reason such as `make failed`
    pub fn reason(&self) -> Option<&str> {
        match &self.status {
            BuildStatus::Failed { reason, .. } => Some(reason),
            _ => None,
        }
    }

    /// One of `success`, `missing-dependency`, `tool-failure`, `undetectable`,
    /// `cancelled`
    pub fn status_label(&self) -> &'static str {
        match &self.status {
            BuildStatus::Success => "success",
            BuildStatus::Failed {
                category: FailureCategory::MissingDependency,
                ..
            } => "missing-dependency",
            BuildStatus::Failed {
                category: FailureCategory::ToolFailure,
                ..
            } => "tool-failure",
            BuildStatus::Undetectable => "undetectable",
            BuildStatus::Cancelled => "cancelled",
        }
    }

    /// Tag used when aggregating; undetectable projects count under `unknown`
    pub fn strategy_tag(&self) -> &'static str {
        self.strategy.map(|s| s.tag()).unwrap_or("unknown")
    }
}
