// LLM integration: the streaming Claude client and prompt construction.

pub mod client;
pub mod prompt;

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("LLM not configured")]
    Disabled,

    #[error("{0}")]
    Api(String),

    #[error("stream ended without a reply")]
    NoReply,
}

/// The "ask the model" capability: one system prompt, one user message,
/// one complete text reply.
#[async_trait]
pub trait Reasoner: Send + Sync {
    async fn complete(&self, system: &str, prompt: &str, max_tokens: u32)
        -> Result<String, LlmError>;
}
