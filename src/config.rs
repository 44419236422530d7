//! Configuration management for buildsieve
//!
//! Settings load from environment variables with defaults; CLI flags override
//! individual fields afterwards.
//!
//! # Environment Variables
//!
//! - `BUILDSIEVE_COMMAND_TIMEOUT`: per-command timeout in seconds, 0 disables - default: "1800"
//! - `BUILDSIEVE_MAX_ATTEMPTS`: selector invocations per project - default: "4"
//! - `BUILDSIEVE_JOBS`: worker pool size - default: available parallelism
//! - `BUILDSIEVE_PROBE_ALTERNATES`: build other detected strategies after a failure - default: "true"
//! - `BUILDSIEVE_ADVISOR`: none|heuristic|llm|chain - default: "heuristic"
//! - `BUILDSIEVE_PROVIDER`: genai provider for the LLM advisor - default: "ollama"
//! - `BUILDSIEVE_MODEL`: model for the LLM advisor - default: "qwen2.5-coder:7b"
//! - `BUILDSIEVE_LLM_TIMEOUT`: LLM request timeout in seconds - default: "60"
//! - `BUILDSIEVE_API_BASE_URL`: custom endpoint for the LLM provider - optional
//! - `BUILDSIEVE_INSTALL_COMMAND`: package install template - default: "sudo apt-get install -y {package}"
//! - `BUILDSIEVE_REQUIRED_TOOLS`: comma separated binaries checked at startup - default: empty
//! - `BUILDSIEVE_SOLUTION_DEPTH`: walk depth for `.sln` discovery - default: "3"
//! - `BUILDSIEVE_TRANSCRIPT_DIR`: per-project command transcripts - optional
//! - `BUILDSIEVE_LOG_LEVEL`: logging level - default: "info"
//!
//! Provider credentials (`OPENAI_API_KEY`, `ANTHROPIC_API_KEY`, `OLLAMA_HOST`, ...)
//! are read by the genai library itself.

use crate::batch::BatchSettings;
use crate::llm::{parse_provider, GenAIClient, LLMClient};
use crate::remediation::{
    Advisor, AptCacheResolver, ChainAdvisor, HeuristicAdvisor, LlmAdvisor, NoAdvisor,
    DEFAULT_INSTALL_COMMAND,
};
use crate::runner::CommandRunner;
use crate::selector::SelectorOptions;
use crate::strategy::DetectOptions;
use std::env;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

const DEFAULT_COMMAND_TIMEOUT_SECS: u64 = 1800;
const DEFAULT_MAX_ATTEMPTS: usize = 4;
const DEFAULT_PROVIDER: &str = "ollama";
const DEFAULT_MODEL: &str = "qwen2.5-coder:7b";
const DEFAULT_LLM_TIMEOUT_SECS: u64 = 60;
const DEFAULT_SOLUTION_DEPTH: usize = 3;
const DEFAULT_LOG_LEVEL: &str = "info";

const MAX_ATTEMPTS_LIMIT: usize = 20;
const MAX_JOBS: usize = 256;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid provider: {0}. Valid options include ollama, openai, anthropic, gemini, groq, xai")]
    InvalidProvider(String),

    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),

    #[error("Failed to parse {field}: {error}")]
    ParseError { field: String, error: String },
}

/// Which advisor proposes remedies for missing dependencies
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdvisorKind {
    None,
    Heuristic,
    Llm,
    /// Heuristic first, LLM second
    Chain,
}

impl AdvisorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AdvisorKind::None => "none",
            AdvisorKind::Heuristic => "heuristic",
            AdvisorKind::Llm => "llm",
            AdvisorKind::Chain => "chain",
        }
    }

    pub fn uses_llm(&self) -> bool {
        matches!(self, AdvisorKind::Llm | AdvisorKind::Chain)
    }
}

impl FromStr for AdvisorKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "none" | "off" => Ok(AdvisorKind::None),
            "heuristic" => Ok(AdvisorKind::Heuristic),
            "llm" => Ok(AdvisorKind::Llm),
            "chain" => Ok(AdvisorKind::Chain),
            other => Err(ConfigError::ParseError {
                field: "advisor".to_string(),
                error: format!("unknown advisor '{}' (none|heuristic|llm|chain)", other),
            }),
        }
    }
}

impl fmt::Display for AdvisorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct BuildsieveConfig {
    /// Per-command timeout in seconds; 0 disables the timeout
    pub command_timeout_secs: u64,
    pub max_attempts: usize,
    pub jobs: usize,
    pub probe_alternates: bool,
    pub advisor: AdvisorKind,
    pub provider: String,
    pub model: String,
    pub llm_timeout_secs: u64,
    pub api_base_url: Option<String>,
    /// Must contain `{package}`
    pub install_command: String,
    pub required_tools: Vec<String>,
    pub solution_depth: usize,
    pub transcript_dir: Option<PathBuf>,
    pub log_level: String,
}

fn env_parse<T: FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|v| v.trim().parse::<T>().ok())
}

fn default_jobs() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

impl Default for BuildsieveConfig {
    /// Loads from `BUILDSIEVE_*` environment variables. Unparseable values fall
    /// back to the default.
    fn default() -> Self {
        let required_tools = env::var("BUILDSIEVE_REQUIRED_TOOLS")
            .map(|v| {
                v.split(',')
                    .map(|t| t.trim().to_string())
                    .filter(|t| !t.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        Self {
            command_timeout_secs: env_parse("BUILDSIEVE_COMMAND_TIMEOUT")
                .unwrap_or(DEFAULT_COMMAND_TIMEOUT_SECS),
            max_attempts: env_parse("BUILDSIEVE_MAX_ATTEMPTS").unwrap_or(DEFAULT_MAX_ATTEMPTS),
            jobs: env_parse("BUILDSIEVE_JOBS").unwrap_or_else(default_jobs),
            probe_alternates: env_parse("BUILDSIEVE_PROBE_ALTERNATES").unwrap_or(true),
            advisor: env_parse("BUILDSIEVE_ADVISOR").unwrap_or(AdvisorKind::Heuristic),
            provider: env::var("BUILDSIEVE_PROVIDER")
                .unwrap_or_else(|_| DEFAULT_PROVIDER.to_string())
                .to_lowercase(),
            model: env::var("BUILDSIEVE_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string()),
            llm_timeout_secs: env_parse("BUILDSIEVE_LLM_TIMEOUT")
                .unwrap_or(DEFAULT_LLM_TIMEOUT_SECS),
            api_base_url: env::var("BUILDSIEVE_API_BASE_URL").ok(),
            install_command: env::var("BUILDSIEVE_INSTALL_COMMAND")
                .unwrap_or_else(|_| DEFAULT_INSTALL_COMMAND.to_string()),
            required_tools,
            solution_depth: env_parse("BUILDSIEVE_SOLUTION_DEPTH")
                .unwrap_or(DEFAULT_SOLUTION_DEPTH),
            transcript_dir: env::var("BUILDSIEVE_TRANSCRIPT_DIR").ok().map(PathBuf::from),
            log_level: env::var("BUILDSIEVE_LOG_LEVEL")
                .unwrap_or_else(|_| DEFAULT_LOG_LEVEL.to_string())
                .to_lowercase(),
        }
    }
}

impl BuildsieveConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_attempts == 0 || self.max_attempts > MAX_ATTEMPTS_LIMIT {
            return Err(ConfigError::ValidationFailed(format!(
                "Max attempts must be between 1 and {}",
                MAX_ATTEMPTS_LIMIT
            )));
        }

        if self.jobs == 0 || self.jobs > MAX_JOBS {
            return Err(ConfigError::ValidationFailed(format!(
                "Jobs must be between 1 and {}",
                MAX_JOBS
            )));
        }

        if self.solution_depth == 0 {
            return Err(ConfigError::ValidationFailed(
                "Solution search depth must be at least 1".to_string(),
            ));
        }

        if !self.install_command.contains("{package}") {
            return Err(ConfigError::ValidationFailed(
                "Install command must contain {package}".to_string(),
            ));
        }

        if self.advisor.uses_llm() {
            if self.llm_timeout_secs == 0 {
                return Err(ConfigError::ValidationFailed(
                    "LLM timeout must be at least 1 second".to_string(),
                ));
            }
            parse_provider(&self.provider)
                .map_err(|_| ConfigError::InvalidProvider(self.provider.clone()))?;
        }

        match self.log_level.as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => {
                return Err(ConfigError::ValidationFailed(format!(
                    "Invalid log level: {}. Valid options: trace, debug, info, warn, error",
                    self.log_level
                )))
            }
        }

        Ok(())
    }

    pub fn command_timeout(&self) -> Option<Duration> {
        (self.command_timeout_secs > 0).then(|| Duration::from_secs(self.command_timeout_secs))
    }

    pub fn selector_options(&self) -> SelectorOptions {
        SelectorOptions {
            timeout: self.command_timeout(),
            probe_alternates: self.probe_alternates,
            detect: DetectOptions {
                solution_depth: self.solution_depth,
            },
        }
    }

    pub fn batch_settings(&self) -> BatchSettings {
        BatchSettings {
            jobs: self.jobs,
            max_attempts: self.max_attempts,
            selector: self.selector_options(),
            install_command: self.install_command.clone(),
            transcript_dir: self.transcript_dir.clone(),
            required_tools: self.required_tools.clone(),
        }
    }

    pub fn create_llm_client(&self) -> Result<Arc<dyn LLMClient>, ConfigError> {
        let provider = parse_provider(&self.provider)
            .map_err(|_| ConfigError::InvalidProvider(self.provider.clone()))?;
        Ok(Arc::new(GenAIClient::new(
            provider,
            self.model.clone(),
            Duration::from_secs(self.llm_timeout_secs),
            self.api_base_url.clone(),
        )))
    }

    /// Build the configured advisor; package lookups go through `runner`
    pub fn create_advisor(
        &self,
        runner: Arc<dyn CommandRunner>,
    ) -> Result<Arc<dyn Advisor>, ConfigError> {
        let heuristic = || -> Arc<dyn Advisor> {
            Arc::new(HeuristicAdvisor::with_resolver(Arc::new(
                AptCacheResolver::new(Arc::clone(&runner)),
            )))
        };
        let llm = || -> Result<Arc<dyn Advisor>, ConfigError> {
            Ok(Arc::new(LlmAdvisor::new(self.create_llm_client()?)))
        };

        let advisor: Arc<dyn Advisor> = match self.advisor {
            AdvisorKind::None => Arc::new(NoAdvisor),
            AdvisorKind::Heuristic => heuristic(),
            AdvisorKind::Llm => llm()?,
            AdvisorKind::Chain => Arc::new(ChainAdvisor::new(vec![heuristic(), llm()?])),
        };
        Ok(advisor)
    }

    pub fn to_display_map(&self) -> std::collections::HashMap<String, String> {
        let mut map = std::collections::HashMap::new();

        map.insert(
            "command_timeout_secs".to_string(),
            self.command_timeout_secs.to_string(),
        );
        map.insert("max_attempts".to_string(), self.max_attempts.to_string());
        map.insert("jobs".to_string(), self.jobs.to_string());
        map.insert(
            "probe_alternates".to_string(),
            self.probe_alternates.to_string(),
        );
        map.insert("advisor".to_string(), self.advisor.to_string());
        if self.advisor.uses_llm() {
            map.insert("provider".to_string(), self.provider.clone());
            map.insert("model".to_string(), self.model.clone());
            map.insert(
                "llm_timeout_secs".to_string(),
                self.llm_timeout_secs.to_string(),
            );
            if let Some(ref url) = self.api_base_url {
                map.insert("api_base_url".to_string(), url.clone());
            }
        }
        map.insert("install_command".to_string(), self.install_command.clone());
        map.insert(
            "required_tools".to_string(),
            self.required_tools.join(","),
        );
        map.insert("solution_depth".to_string(), self.solution_depth.to_string());
        if let Some(ref dir) = self.transcript_dir {
            map.insert("transcript_dir".to_string(), dir.display().to_string());
        }
        map.insert("log_level".to_string(), self.log_level.clone());

        map
    }
}

impl fmt::Display for BuildsieveConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Buildsieve Configuration:")?;
        match self.command_timeout() {
            Some(t) => writeln!(f, "  Command Timeout: {}s", t.as_secs())?,
            None => writeln!(f, "  Command Timeout: disabled")?,
        }
        writeln!(f, "  Max Attempts: {}", self.max_attempts)?;
        writeln!(f, "  Jobs: {}", self.jobs)?;
        writeln!(f, "  Probe Alternates: {}", self.probe_alternates)?;
        writeln!(f, "  Advisor: {}", self.advisor)?;
        if self.advisor.uses_llm() {
            writeln!(f, "  Provider: {}", self.provider)?;
            writeln!(f, "  Model: {}", self.model)?;
        }
        writeln!(f, "  Install Command: {}", self.install_command)?;
        if !self.required_tools.is_empty() {
            writeln!(f, "  Required Tools: {}", self.required_tools.join(", "))?;
        }
        if let Some(ref dir) = self.transcript_dir {
            writeln!(f, "  Transcript Dir: {}", dir.display())?;
        }
        writeln!(f, "  Log Level: {}", self.log_level)?;
        Ok(())
    }
}
