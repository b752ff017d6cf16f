use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// Failure of a single call to the upstream model. Every variant is treated as
/// transient by the retry policy.
#[derive(Debug, Error)]
pub enum InvokeError {
    #[error("model request timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },
    #[error("transport error: {0}")]
    Transport(String),
    #[error("model service returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("could not decode model response: {0}")]
    Decode(String),
    #[error("model returned no text")]
    EmptyResponse,
}

/// The external generative-AI boundary: `invoke(promptText, deadline) -> text | error`.
#[async_trait]
pub trait ModelInvoker: Send + Sync {
    async fn invoke(&self, prompt: &str, deadline: Duration) -> Result<String, InvokeError>;
}
