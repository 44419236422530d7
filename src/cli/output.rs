//! Output formatting for multiple formats
//!
//! Every command result renders as JSON, YAML or human-readable text. Reports
//! go to stdout; logs go to stderr.
//!
//! # Example
//!
//! ```ignore
//! use buildsieve::cli::output::{OutputFormat, OutputFormatter};
//!
//! let formatter = OutputFormatter::new(OutputFormat::Json);
//! println!("{}", formatter.format_report(&report, false)?);
//! ```

use anyhow::{Context, Result};
use serde::Serialize;

use crate::batch::BatchResult;
use crate::stats::{BatchSummary, ProjectReport};
use crate::strategy::Detection;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// JSON format (machine-readable)
    Json,
    /// YAML format
    Yaml,
    /// Human-readable formatted text
    Human,
}

/// One applicable strategy as printed by `detect`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DetectionEntry {
    pub priority: usize,
    pub strategy: String,
    pub name: String,
    pub build_root: String,
    pub signal: String,
}

impl DetectionEntry {
    pub fn from_detections(detections: &[Detection]) -> Vec<Self> {
        detections
            .iter()
            .enumerate()
            .map(|(i, d)| Self {
                priority: i + 1,
                strategy: d.strategy.tag().to_string(),
                name: d.strategy.name().to_string(),
                build_root: d.build_root.display().to_string(),
                signal: d.signal.display().to_string(),
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolveEntry {
    pub header: String,
    pub package: Option<String>,
    pub resolvable: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolveReport {
    pub entries: Vec<ResolveEntry>,
    pub resolved: usize,
    pub total: usize,
    /// Fraction of headers whose guessed package resolves
    pub rate: f64,
}

impl ResolveReport {
    pub fn new(entries: Vec<ResolveEntry>) -> Self {
        let total = entries.len();
        let resolved = entries.iter().filter(|e| e.resolvable).count();
        let rate = if total == 0 {
            0.0
        } else {
            resolved as f64 / total as f64
        };
        Self {
            entries,
            resolved,
            total,
            rate,
        }
    }
}

pub struct OutputFormatter {
    format: OutputFormat,
}

impl OutputFormatter {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    pub fn format_detections(&self, project: &str, entries: &[DetectionEntry]) -> Result<String> {
        match self.format {
            OutputFormat::Json => to_json(&entries, "detections"),
            OutputFormat::Yaml => to_yaml(&entries, "detections"),
            OutputFormat::Human => Ok(self.format_detections_human(project, entries)),
        }
    }

    /// Raw build output is dropped unless `include_output` is set
    pub fn format_report(&self, report: &ProjectReport, include_output: bool) -> Result<String> {
        let mut report = report.clone();
        if !include_output {
            report.raw_output.clear();
        }
        match self.format {
            OutputFormat::Json => to_json(&report, "project report"),
            OutputFormat::Yaml => to_yaml(&report, "project report"),
            OutputFormat::Human => Ok(self.format_report_human(&report, include_output)),
        }
    }

    pub fn format_batch(&self, result: &BatchResult) -> Result<String> {
        match self.format {
            OutputFormat::Json => to_json(&result.summary, "batch summary"),
            OutputFormat::Yaml => to_yaml(&result.summary, "batch summary"),
            OutputFormat::Human => Ok(self.format_summary_human(&result.summary, result.cancelled)),
        }
    }

    pub fn format_resolve(&self, report: &ResolveReport) -> Result<String> {
        match self.format {
            OutputFormat::Json => to_json(report, "resolve report"),
            OutputFormat::Yaml => to_yaml(report, "resolve report"),
            OutputFormat::Human => Ok(self.format_resolve_human(report)),
        }
    }

    // Human-readable formatting methods

    fn format_detections_human(&self, project: &str, entries: &[DetectionEntry]) -> String {
        let mut output = String::new();

        if entries.is_empty() {
            output.push_str(&format!("\u{26A0} No build system detected for {}\n", project));
            return output;
        }

        output.push_str(&format!("\u{2713} Build Strategies for {}\n", project));
        output.push_str(&rule());

        for (i, entry) in entries.iter().enumerate() {
            let connector = if i == entries.len() - 1 { "\u{2514}" } else { "\u{251C}" };
            output.push_str(&format!(
                "{}\u{2500} {}. {:<18} {} ({})\n",
                connector, entry.priority, entry.name, entry.build_root, entry.signal
            ));
        }

        output
    }

    fn format_report_human(&self, report: &ProjectReport, include_output: bool) -> String {
        let mut output = String::new();

        let symbol = if report.is_success() { "\u{2713}" } else { "\u{2717}" };
        output.push_str(&format!("{} {}\n", symbol, report.project));
        output.push_str(&rule());

        output.push_str(&format!("Path:      {}\n", report.path));
        output.push_str(&format!("Strategy:  {}\n", report.strategy));
        output.push_str(&format!("Status:    {}\n", report.status));
        if let Some(reason) = &report.reason {
            output.push_str(&format!("Reason:    {}\n", reason));
        }
        output.push_str(&format!("Attempts:  {}\n", report.attempts));

        if !report.unresolved_symbols.is_empty() {
            output.push_str("\nUnresolved:\n");
            push_tree(&mut output, &report.unresolved_symbols);
        }

        if !report.alternate_successes.is_empty() {
            output.push_str("\nAlternates that built:\n");
            push_tree(&mut output, &report.alternate_successes);
        }

        if include_output && !report.raw_output.is_empty() {
            output.push_str("\nBuild Output:\n");
            output.push_str(&report.raw_output);
            if !report.raw_output.ends_with('\n') {
                output.push('\n');
            }
        }

        output
    }

    fn format_summary_human(&self, summary: &BatchSummary, cancelled: bool) -> String {
        let mut output = String::new();

        output.push_str("Batch Summary\n");
        output.push_str(&rule());

        output.push_str(&format!(
            "Overall:             {}/{} ({})\n",
            summary.successes,
            summary.total,
            percent(summary.successes, summary.total)
        ));
        output.push_str(&format!("Undetectable:        {}\n", summary.undetectable));
        output.push_str(&format!("Missing dependency:  {}\n", summary.missing_dependency));
        output.push_str(&format!("Tool failure:        {}\n", summary.tool_failure));

        if !summary.per_strategy.is_empty() {
            output.push_str("\nPer Strategy:\n");
            let last = summary.per_strategy.len() - 1;
            for (i, (strategy, counts)) in summary.per_strategy.iter().enumerate() {
                let connector = if i == last { "\u{2514}" } else { "\u{251C}" };
                output.push_str(&format!(
                    "{}\u{2500} {:<15} {}/{} ({})\n",
                    connector,
                    strategy,
                    counts.success,
                    counts.total,
                    percent(counts.success, counts.total)
                ));
            }
        }

        if !summary.unresolved_symbols.is_empty() {
            output.push_str(&format!(
                "\nUnresolved symbols ({}):\n",
                summary.unresolved_symbols.len()
            ));
            push_tree(&mut output, &summary.unresolved_symbols);
        }

        if cancelled {
            output.push_str("\n\u{26A0} Batch was cancelled before every project ran\n");
        }

        output
    }

    fn format_resolve_human(&self, report: &ResolveReport) -> String {
        let mut output = String::new();

        output.push_str("Package Resolution\n");
        output.push_str(&rule());

        for entry in &report.entries {
            let symbol = if entry.resolvable { "\u{2713}" } else { "\u{2717}" };
            let package = entry.package.as_deref().unwrap_or("(no guess)");
            output.push_str(&format!("{} {:<30} {}\n", symbol, entry.header, package));
        }

        output.push_str(&format!(
            "\nResolved {}/{} ({})\n",
            report.resolved,
            report.total,
            percent(report.resolved, report.total)
        ));

        output
    }
}

fn to_json<T: Serialize + ?Sized>(value: &T, what: &str) -> Result<String> {
    serde_json::to_string_pretty(value).with_context(|| format!("Failed to serialize {} to JSON", what))
}

fn to_yaml<T: Serialize + ?Sized>(value: &T, what: &str) -> Result<String> {
    serde_yaml::to_string(value).with_context(|| format!("Failed to serialize {} to YAML", what))
}

fn rule() -> String {
    format!("{}\n\n", "\u{2501}".repeat(42))
}

fn push_tree(output: &mut String, items: &[String]) {
    for (i, item) in items.iter().enumerate() {
        let connector = if i == items.len() - 1 { "\u{2514}" } else { "\u{251C}" };
        output.push_str(&format!("{}\u{2500} {}\n", connector, item));
    }
}

fn percent(part: usize, total: usize) -> String {
    if total == 0 {
        return "n/a".to_string();
    }
    format!("{:.1}%", part as f64 * 100.0 / total as f64)
}
