use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::config::SecretString;

use super::models::Provider;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// A message in the conversation. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    role: Role,
    content: String,
    created_at: DateTime<Utc>,
}

impl ChatMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            created_at: Utc::now(),
        }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self::new(Role::User, text)
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self::new(Role::Assistant, text)
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

/// Everything the completion collaborator needs for one reply
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    /// Correlates the request with the completion event it produces
    pub id: Uuid,
    pub provider: Provider,
    pub model: String,
    pub credential: SecretString,
    /// System prompt (positioned appropriately per provider)
    pub system: Option<String>,
    /// Full conversation history, oldest first, ending with the new user message
    pub messages: Vec<ChatMessage>,
}

/// Completed assistant reply
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionResponse {
    pub text: String,
    pub model: String,
}

/// Completion-specific errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LLMError {
    #[error("No API key configured for {provider}")]
    MissingCredential { provider: String },

    #[error("Authentication failed: {message}")]
    AuthError { message: String },

    #[error("Rate limited: {message}")]
    RateLimit { message: String },

    #[error("Invalid request: {message}")]
    InvalidRequest { message: String },

    #[error("Model not found: {model}")]
    ModelNotFound { model: String },

    #[error("Content filtered: {reason}")]
    ContentFiltered { reason: String },

    #[error("Provider error: {status} - {message}")]
    ProviderError { status: u16, message: String },

    #[error("Network error: {message}")]
    NetworkError { message: String },

    #[error("Timeout after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    #[error("Parse error: {message}")]
    ParseError { message: String },

    #[error("The model returned an empty response")]
    EmptyResponse,

    #[error("Internal error: {message}")]
    Internal { message: String },
}
