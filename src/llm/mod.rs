//! LLM integration for AR Assist.
//!
//! One backend: an OpenAI-shaped chat-completions endpoint, reached over
//! reqwest. The `LlmProvider` trait is the seam the pipeline depends on, so
//! tests can inject canned responses without any network.

pub mod openai;
pub mod provider;

pub use openai::OpenAiProvider;
pub use provider::{ChatMessage, CompletionRequest, CompletionResponse, LlmProvider, Role};

use std::sync::Arc;

use crate::config::LlmSecrets;

/// Create the LLM provider from a credential bundle.
pub fn create_provider(secrets: &LlmSecrets) -> Arc<dyn LlmProvider> {
    tracing::info!("Using OpenAI (model: {})", secrets.model);
    Arc::new(OpenAiProvider::new(secrets.api_key.clone(), &secrets.model))
}
