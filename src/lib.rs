//! buildsieve - build-system detection and orchestration for source checkouts
//!
//! Given a directory holding a checked-out project, buildsieve decides which
//! toolchain the project uses, runs that toolchain's canonical build sequence,
//! classifies the result, and when headers are missing asks an advisor for a
//! remedy and tries again. Batches of projects run on a bounded worker pool and
//! feed a single statistics aggregator.
//!
//! # Core Concepts
//!
//! - **Strategy**: one toolchain family (CMake, Autotools, Make, ...). Knows how
//!   to detect itself from signal files and which steps build it.
//! - **Selector**: consults strategies in a fixed priority order, builds the
//!   first match and optionally probes the others after a failure.
//! - **Remediation**: advisors turn unresolved symbols into install commands,
//!   and the retry loop re-runs the selector after applying them.
//! - **Command runner**: the seam through which every external process runs.
//!
//! # Example Usage
//!
//! ```no_run
//! use buildsieve::{Project, ShellRunner, StrategySelector};
//! use std::sync::Arc;
//!
//! # async fn example() {
//! let selector = StrategySelector::with_defaults(Arc::new(ShellRunner::new()));
//! let outcome = selector.select_and_build(&Project::from_path("/src/zlib")).await;
//!
//! println!("{}: {}", outcome.strategy_tag(), outcome.status_label());
//! for symbol in &outcome.unresolved_symbols {
//!     println!("missing {}", symbol);
//! }
//! # }
//! ```
//!
//! # Project Structure
//!
//! - [`strategy`]: strategy table, step engine and outcomes
//! - [`selector`]: priority selection and alternate probing
//! - [`remediation`]: advisors, package guessing and the retry loop
//! - [`batch`]: worker pool and aggregation over a directory of projects
//! - [`runner`]: shell execution with timeouts, cancellation and transcripts

pub mod batch;
pub mod cli;
pub mod config;
pub mod diagnostics;
pub mod llm;
pub mod progress;
pub mod project;
pub mod remediation;
pub mod runner;
pub mod selector;
pub mod stats;
pub mod strategy;
pub mod toolchain;
pub mod util;

pub use batch::{BatchError, BatchResult, BatchRunner, BatchSettings};
pub use config::{AdvisorKind, BuildsieveConfig, ConfigError};
pub use project::Project;
pub use remediation::{Advisor, RetryLoop, RetryOutcome};
pub use runner::{CommandResult, CommandRunner, ShellRunner};
pub use selector::{SelectorOptions, StrategySelector};
pub use stats::{BatchSummary, ProjectReport, RunStats};
pub use strategy::{BuildOutcome, BuildStatus, FailureCategory, StrategyId, StrategyRegistry};
pub use util::{init_from_env, init_logging, LoggingConfig};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
