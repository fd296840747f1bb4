//! Language-model clients for viewforge.
//!
//! Any provider speaking OpenAI's chat-completions format (OpenAI, Azure
//! deployments behind a gateway, DeepSeek, local vLLM or Ollama servers)
//! works through [`OpenAiCompatibleClient`].

pub mod openai_compatible;

pub use openai_compatible::{OpenAiCompatibleBuilder, OpenAiCompatibleClient};
pub use viewforge_core::{LlmRequest, LlmResponse, Message, Role, ToolCall, ToolCallingLlm, ToolSpec};
