//! LLM client abstraction layer
//!
//! A trait-based seam so the remediation advisor can talk to any `genai`
//! provider in production and to a scripted mock in tests.

mod client;
mod error;
mod genai;
mod mock;
mod types;

pub use client::LLMClient;
pub use error::LlmError;
pub use self::genai::{parse_provider, GenAIClient};
pub use mock::{MockLLMClient, MockResponse};
pub use types::{ChatMessage, LLMRequest, LLMResponse, MessageRole};
