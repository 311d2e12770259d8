//! LLM provider trait and request/response types.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::LlmError;

/// Role of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// A single chat message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// Request for a completion.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub messages: Vec<ChatMessage>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

impl CompletionRequest {
    pub fn new(messages: Vec<ChatMessage>) -> Self {
        Self {
            messages,
            temperature: None,
            max_tokens: None,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

/// Response from a completion call.
#[derive(Debug, Clone)]
pub struct CompletionResponse {
    /// Raw text content of the first choice.
    pub content: String,
    pub input_tokens: u32,
    pub output_tokens: u32,
}

impl CompletionResponse {
    /// Total tokens consumed by the call.
    pub fn total_tokens(&self) -> u32 {
        self.input_tokens + self.output_tokens
    }
}

/// Abstraction over a chat-completion backend.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Model identifier used for requests.
    fn model_name(&self) -> &str;

    /// Run a completion. Blocks the run until the remote call returns or
    /// times out.
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chat_message_constructors() {
        let sys = ChatMessage::system("be terse");
        assert_eq!(sys.role, Role::System);
        assert_eq!(sys.content, "be terse");

        let user = ChatMessage::user("hello");
        assert_eq!(user.role, Role::User);
    }

    #[test]
    fn role_serializes_lowercase() {
        let msg = ChatMessage::user("hi");
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["role"], "user");
    }

    #[test]
    fn completion_request_builder() {
        let req = CompletionRequest::new(vec![ChatMessage::user("x")])
            .with_temperature(0.1)
            .with_max_tokens(256);
        assert_eq!(req.temperature, Some(0.1));
        assert_eq!(req.max_tokens, Some(256));
    }

    #[test]
    fn completion_response_totals_tokens() {
        let resp = CompletionResponse {
            content: "ok".into(),
            input_tokens: 100,
            output_tokens: 50,
        };
        assert_eq!(resp.total_tokens(), 150);
    }
}
