//! Text-completion gateway.
//!
//! The orchestrator talks to the model through [`CompletionGateway`]; the
//! Ollama implementation lives in [`ollama`].

pub mod ollama;

#[cfg(test)]
pub(crate) mod scripted;

pub use ollama::{OllamaGateway, OllamaGatewayConfig};

use async_trait::async_trait;
use std::time::Duration;

/// Routing hint passed to the gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskKind {
    /// Multi-step expert reasoning. All role calls use this.
    ComplexReasoning,
    /// Short, cheap completions.
    Quick,
}

/// One completion request.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub task_kind: TaskKind,
    pub system_prompt: String,
    pub user_prompt: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout: Duration,
}

/// Errors returned by a gateway.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("request timed out after {}ms", .0.as_millis())]
    Timeout(Duration),

    #[error("cannot connect to model backend at {url}")]
    Connect { url: String },

    #[error("model backend returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("failed to send request: {0}")]
    Transport(String),

    #[error("invalid response from model backend: {0}")]
    InvalidResponse(String),

    #[error("model returned an empty answer")]
    EmptyAnswer,
}

/// A black-box text-completion service.
#[async_trait]
pub trait CompletionGateway: Send + Sync {
    /// Run one completion and return the answer text.
    async fn complete(&self, request: CompletionRequest) -> Result<String, GatewayError>;

    /// Identifier of the model serving requests.
    fn model_name(&self) -> &str;
}
