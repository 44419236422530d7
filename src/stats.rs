//! Per-project records and batch aggregation

use crate::project::Project;
use crate::remediation::RetryOutcome;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::info;

/// Everything recorded about one project once its retry loop has finished
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectReport {
    pub project: String,
    pub path: String,
    /// Strategy tag, `unknown` when nothing was detected
    pub strategy: String,
    pub status: String,
    pub reason: Option<String>,
    pub unresolved_symbols: Vec<String>,
    pub alternate_successes: Vec<String>,
    pub attempts: usize,
    pub raw_output: String,
    pub finished_at: DateTime<Utc>,
}

impl ProjectReport {
    pub fn new(project: &Project, result: &RetryOutcome) -> Self {
        let outcome = &result.outcome;
        Self {
            project: project.name.clone(),
            path: project.root.display().to_string(),
            strategy: outcome.strategy_tag().to_string(),
            status: outcome.status_label().to_string(),
            reason: outcome.reason().map(str::to_string),
            unresolved_symbols: outcome.unresolved_symbols.clone(),
            alternate_successes: outcome
                .alternate_successes
                .iter()
                .map(|s| s.tag().to_string())
                .collect(),
            attempts: result.attempts,
            raw_output: outcome.output.clone(),
            finished_at: Utc::now(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == "success"
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrategyCounts {
    pub success: usize,
    pub total: usize,
}

/// Running totals for one batch. Owned by a single aggregator.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunStats {
    per_strategy: BTreeMap<String, StrategyCounts>,
    total: usize,
    successes: usize,
    missing_dependency: usize,
    tool_failure: usize,
    undetectable: usize,
    symbols: BTreeSet<String>,
}

impl RunStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, report: &ProjectReport) {
        self.total += 1;
        let counts = self.per_strategy.entry(report.strategy.clone()).or_default();
        counts.total += 1;

        match report.status.as_str() {
            "success" => {
                self.successes += 1;
                counts.success += 1;
            }
            "missing-dependency" => self.missing_dependency += 1,
            "undetectable" => self.undetectable += 1,
            _ => self.tool_failure += 1,
        }

        self.symbols
            .extend(report.unresolved_symbols.iter().cloned());
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn successes(&self) -> usize {
        self.successes
    }

    pub fn strategy(&self, tag: &str) -> StrategyCounts {
        self.per_strategy.get(tag).copied().unwrap_or_default()
    }

    /// Log overall and per-strategy success rates
    pub fn log_running_totals(&self) {
        info!(
            successes = self.successes,
            total = self.total,
            undetectable = self.undetectable,
            missing_dependency = self.missing_dependency,
            tool_failure = self.tool_failure,
            "Overall success rate {}/{}",
            self.successes,
            self.total
        );
        for (strategy, counts) in &self.per_strategy {
            info!(
                strategy = %strategy,
                success = counts.success,
                total = counts.total,
                "Success rate for {}: {}/{}",
                strategy,
                counts.success,
                counts.total
            );
        }
    }

    pub fn summary(&self) -> BatchSummary {
        BatchSummary {
            total: self.total,
            successes: self.successes,
            per_strategy: self.per_strategy.clone(),
            undetectable: self.undetectable,
            missing_dependency: self.missing_dependency,
            tool_failure: self.tool_failure,
            unresolved_symbols: self.symbols.iter().cloned().collect(),
        }
    }
}

/// Final aggregate of a batch
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub total: usize,
    pub successes: usize,
    pub per_strategy: BTreeMap<String, StrategyCounts>,
    pub undetectable: usize,
    pub missing_dependency: usize,
    pub tool_failure: usize,
    pub unresolved_symbols: Vec<String>,
}
