use std::sync::Arc;

use viewforge_core::{LlmRequest, Message, ToolCallingLlm, ViewforgeError};

use crate::Transcript;

pub const REFLECTION_PROMPT: &str =
    "Summarize the takeaway from the conversation. Do not add any introductory phrases.";

/// Condenses a finished session into the note carried into later sessions.
#[derive(Clone)]
pub struct ReflectionSummarizer {
    llm: Arc<dyn ToolCallingLlm>,
    model: String,
    prompt: String,
}

impl ReflectionSummarizer {
    pub fn new(llm: Arc<dyn ToolCallingLlm>, model: impl Into<String>) -> Self {
        Self {
            llm,
            model: model.into(),
            prompt: REFLECTION_PROMPT.to_string(),
        }
    }

    pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = prompt.into();
        self
    }

    pub async fn summarize(&self, transcript: &Transcript) -> Result<String, ViewforgeError> {
        let request = LlmRequest {
            model: self.model.clone(),
            messages: vec![
                Message::system(self.prompt.clone()),
                Message::user(transcript.render()),
            ],
            tools: Vec::new(),
        };
        let response = self.llm.invoke(request).await?;
        Ok(response.content.trim().to_string())
    }
}

impl std::fmt::Debug for ReflectionSummarizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReflectionSummarizer")
            .field("model", &self.model)
            .finish_non_exhaustive()
    }
}
