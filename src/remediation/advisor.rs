use super::package::{guess_package_name, PackageResolver};
use super::{AdviceRequest, Advisor, AdvisorError, Remedy};
use crate::llm::{ChatMessage, LLMClient, LLMRequest};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, warn};

/// Tail of the build log sent to the model
const MAX_LOG_CHARS: usize = 12_000;
const MAX_RESPONSE_TOKENS: u32 = 512;

const SYSTEM_PROMPT: &str = "You are helping to finish building a source repository whose build failed. \
Reply with shell commands only, one per line, that fix the failure so the build can be rerun. \
Do not explain.";

/// Never suggests anything; used when remediation is disabled
#[derive(Debug, Default)]
pub struct NoAdvisor;

#[async_trait]
impl Advisor for NoAdvisor {
    async fn suggest(&self, _request: &AdviceRequest) -> Result<Option<Remedy>, AdvisorError> {
        Ok(None)
    }

    fn name(&self) -> &str {
        "none"
    }
}

/// Maps a header to its likely development package by name
#[derive(Default)]
pub struct HeuristicAdvisor {
    resolver: Option<Arc<dyn PackageResolver>>,
}

impl HeuristicAdvisor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Only suggest packages `resolver` knows about
    pub fn with_resolver(resolver: Arc<dyn PackageResolver>) -> Self {
        Self {
            resolver: Some(resolver),
        }
    }
}

#[async_trait]
impl Advisor for HeuristicAdvisor {
    async fn suggest(&self, request: &AdviceRequest) -> Result<Option<Remedy>, AdvisorError> {
        let Some(package) = guess_package_name(&request.symbol) else {
            debug!(symbol = %request.symbol, "No package name guess");
            return Ok(None);
        };

        if let Some(resolver) = &self.resolver {
            if !resolver.can_resolve(&package).await {
                debug!(symbol = %request.symbol, package = %package, "Guessed package does not resolve");
                return Ok(None);
            }
        }

        Ok(Some(Remedy::Package(package)))
    }

    fn name(&self) -> &str {
        "heuristic"
    }
}

/// Asks a language model for a fix command
pub struct LlmAdvisor {
    client: Arc<dyn LLMClient>,
}

impl LlmAdvisor {
    pub fn new(client: Arc<dyn LLMClient>) -> Self {
        Self { client }
    }

    fn prompt(request: &AdviceRequest) -> String {
        let mut prompt = format!(
            "Repository: {}\nMissing: {}\nAttempt: {}/{}\n",
            request.project, request.symbol, request.attempt, request.max_attempts
        );
        if let Some(command) = &request.prior_command {
            prompt.push_str(&format!("Previously tried: {}\n", command));
            if let Some(output) = &request.prior_output {
                prompt.push_str(&format!("Its output:\n{}\n", tail(output, MAX_LOG_CHARS / 4)));
            }
        }
        prompt.push_str(&format!(
            "Build log:\n{}\nSuggest a fix so the repository builds.",
            tail(&request.log_content, MAX_LOG_CHARS)
        ));
        prompt
    }
}

#[async_trait]
impl Advisor for LlmAdvisor {
    async fn suggest(&self, request: &AdviceRequest) -> Result<Option<Remedy>, AdvisorError> {
        let llm_request = LLMRequest::new(vec![
            ChatMessage::system(SYSTEM_PROMPT),
            ChatMessage::user(Self::prompt(request)),
        ])
        .with_temperature(0.0)
        .with_max_tokens(MAX_RESPONSE_TOKENS);

        let response = self.client.chat(llm_request).await?;
        debug!(
            client = self.client.name(),
            model = %self.client.model_info().unwrap_or_default(),
            response_ms = response.response_time.as_millis() as u64,
            "LLM suggestion received"
        );

        Ok(normalize_suggestion(&response.content).map(Remedy::Command))
    }

    fn name(&self) -> &str {
        "llm"
    }
}

/// Strip Markdown fences and back-ticks, then join the remaining lines with `&&`
pub fn normalize_suggestion(text: &str) -> Option<String> {
    let commands: Vec<&str> = text
        .lines()
        .map(str::trim)
        .filter(|line| !line.starts_with("```"))
        .map(|line| line.trim_matches('`').trim())
        .filter(|line| !line.is_empty())
        .collect();

    if commands.is_empty() {
        None
    } else {
        Some(commands.join(" && ").replace('`', ""))
    }
}

fn tail(text: &str, max_chars: usize) -> &str {
    let count = text.chars().count();
    if count <= max_chars {
        return text;
    }
    let skip = count - max_chars;
    text.char_indices()
        .nth(skip)
        .map(|(idx, _)| &text[idx..])
        .unwrap_or(text)
}

/// Tries each advisor in order; the first suggestion wins
pub struct ChainAdvisor {
    advisors: Vec<Arc<dyn Advisor>>,
}

impl ChainAdvisor {
    pub fn new(advisors: Vec<Arc<dyn Advisor>>) -> Self {
        Self { advisors }
    }
}

#[async_trait]
impl Advisor for ChainAdvisor {
    async fn suggest(&self, request: &AdviceRequest) -> Result<Option<Remedy>, AdvisorError> {
        let mut first_error = None;

        for advisor in &self.advisors {
            match advisor.suggest(request).await {
                Ok(Some(remedy)) => return Ok(Some(remedy)),
                Ok(None) => {}
                Err(e) => {
                    warn!(advisor = advisor.name(), error = %e, "Advisor failed");
                    first_error.get_or_insert(e);
                }
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(None),
        }
    }

    fn name(&self) -> &str {
        "chain"
    }
}
