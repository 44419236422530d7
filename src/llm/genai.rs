//! GenAI-based LLM client
//!
//! Uses the `genai` crate so any of its providers (Ollama, OpenAI, Anthropic,
//! Gemini, Groq, ...) can back the remediation advisor.

use super::client::LLMClient;
use super::error::LlmError;
use super::types::{ChatMessage, LLMRequest, LLMResponse, MessageRole};
use async_trait::async_trait;
use genai::adapter::AdapterKind;
use genai::chat::{ChatMessage as GenAIChatMessage, ChatOptions, ChatRequest as GenAIChatRequest};
use genai::resolver::{AuthData, Endpoint, ServiceTargetResolver};
use genai::{Client, ModelIden, ServiceTarget};
use std::time::Duration;
use tracing::{debug, error};

pub struct GenAIClient {
    client: Client,
    model: String,
    provider: AdapterKind,
    timeout: Duration,
}

impl GenAIClient {
    /// Creates a client for `model` on `provider`.
    ///
    /// With `endpoint` set, every request goes to that base URL instead of the
    /// provider default; the provider's usual API key variable still applies.
    pub fn new(
        provider: AdapterKind,
        model: impl Into<String>,
        timeout: Duration,
        endpoint: Option<String>,
    ) -> Self {
        let model = model.into();

        let client = if let Some(endpoint_url) = endpoint {
            debug!(provider = provider.as_str(), endpoint = %endpoint_url, "Using custom LLM endpoint");

            let model_clone = model.clone();
            let resolver = ServiceTargetResolver::from_resolver_fn(
                move |_service_target: ServiceTarget| -> Result<ServiceTarget, genai::resolver::Error>
                {
                    let auth = match provider.default_key_env_name() {
                        Some(api_key_var) => AuthData::from_env(api_key_var),
                        None => AuthData::from_single(""),
                    };

                    Ok(ServiceTarget {
                        endpoint: Endpoint::from_owned(endpoint_url.clone()),
                        auth,
                        model: ModelIden::new(provider, &model_clone),
                    })
                },
            );

            Client::builder()
                .with_service_target_resolver(resolver)
                .build()
        } else {
            Client::default()
        };

        debug!(provider = provider.as_str(), model = %model, "Created GenAI client");

        Self {
            client,
            model,
            provider,
            timeout,
        }
    }

    fn convert_message(msg: &ChatMessage) -> GenAIChatMessage {
        match msg.role {
            MessageRole::System => GenAIChatMessage::system(&msg.content),
            MessageRole::User => GenAIChatMessage::user(&msg.content),
            MessageRole::Assistant => GenAIChatMessage::assistant(&msg.content),
        }
    }
}

#[async_trait]
impl LLMClient for GenAIClient {
    async fn chat(&self, request: LLMRequest) -> Result<LLMResponse, LlmError> {
        let start = std::time::Instant::now();

        let messages: Vec<GenAIChatMessage> =
            request.messages.iter().map(Self::convert_message).collect();
        let genai_request = GenAIChatRequest::new(messages);

        let mut options = ChatOptions::default();
        if let Some(temp) = request.temperature {
            options = options.with_temperature(temp as f64);
        }
        if let Some(max_tokens) = request.max_tokens {
            options = options.with_max_tokens(max_tokens);
        }

        let response = match tokio::time::timeout(
            self.timeout,
            self.client
                .exec_chat(&self.model, genai_request, Some(&options)),
        )
        .await
        {
            Ok(Ok(resp)) => resp,
            Ok(Err(e)) => {
                error!(provider = self.provider.as_str(), error = %e, "LLM API error");
                return Err(LlmError::Api {
                    provider: self.provider.as_str().to_string(),
                    message: e.to_string(),
                });
            }
            Err(_) => {
                error!(
                    provider = self.provider.as_str(),
                    seconds = self.timeout.as_secs(),
                    "LLM request timed out"
                );
                return Err(LlmError::Timeout {
                    seconds: self.timeout.as_secs(),
                });
            }
        };

        let content = response.first_text().unwrap_or_default().to_string();
        Ok(LLMResponse::text(content, start.elapsed()))
    }

    fn name(&self) -> &str {
        self.provider.as_str()
    }

    fn model_info(&self) -> Option<String> {
        Some(self.model.clone())
    }
}

impl std::fmt::Debug for GenAIClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GenAIClient")
            .field("provider", &self.provider)
            .field("model", &self.model)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Parse a provider name such as `ollama` or `openai`
pub fn parse_provider(name: &str) -> Result<AdapterKind, LlmError> {
    AdapterKind::from_lower_str(&name.to_lowercase())
        .ok_or_else(|| LlmError::UnknownProvider(name.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_genai_client_creation() {
        let client = GenAIClient::new(
            AdapterKind::Ollama,
            "qwen2.5-coder:7b",
            Duration::from_secs(30),
            None,
        );

        assert_eq!(client.name(), "Ollama");
        assert_eq!(client.model_info(), Some("qwen2.5-coder:7b".to_string()));
    }

    #[test]
    fn test_custom_endpoint_client() {
        let client = GenAIClient::new(
            AdapterKind::OpenAI,
            "gpt-4o-mini",
            Duration::from_secs(5),
            Some("http://localhost:8080/v1/".to_string()),
        );
        assert_eq!(client.model_info(), Some("gpt-4o-mini".to_string()));
    }

    #[test]
    fn test_parse_provider() {
        assert_eq!(parse_provider("ollama").unwrap(), AdapterKind::Ollama);
        assert_eq!(parse_provider("OpenAI").unwrap(), AdapterKind::OpenAI);
        assert!(matches!(
            parse_provider("nope"),
            Err(LlmError::UnknownProvider(_))
        ));
    }
}
