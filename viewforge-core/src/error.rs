use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ViewforgeError {
    #[error("LLM provider failed: {0}")]
    LlmProvider(String),
    #[error("LLM context length exceeded: {0}")]
    ContextLengthExceeded(String),
    #[error("Tool call failed for '{tool_name}': {reason}")]
    ToolCallFailed { tool_name: String, reason: String },
    #[error("Parsing failed on output '{output}': {reason}")]
    ParseFailed { output: String, reason: String },
    #[error("Operation timed out after {0:?}")]
    Timeout(Duration),
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("Serialization/deserialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("{0}")]
    Custom(String),
}

impl ViewforgeError {
    /// Errors after which re-sending the same conversation cannot succeed.
    pub fn is_context_exhausted(&self) -> bool {
        matches!(self, ViewforgeError::ContextLengthExceeded(_))
    }
}
