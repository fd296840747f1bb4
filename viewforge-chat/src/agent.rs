use std::sync::Arc;

use viewforge_core::{LlmRequest, Message, Tool, ToolCall, ToolCallingLlm, ToolSpec, ViewforgeError};
use viewforge_views::{MaterializeViewTool, MaterializeViews, MATERIALIZE_VIEW_TOOL};

use crate::{AgentInstructions, AgentRole, ConfigError, SessionConfig, ToolResponse, Transcript};

const VERIFIER_REMINDER: &str =
    "No view definitions were submitted. Call materialize_view_tool with the view definitions to verify them.";

/// What a participant said in one turn.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Reply {
    pub content: String,
    pub tool_calls: Vec<ToolCall>,
    pub tool_responses: Vec<ToolResponse>,
}

#[async_trait::async_trait]
pub trait Participant: Send + Sync {
    fn role(&self) -> AgentRole;

    async fn respond(&self, transcript: &Transcript) -> Result<Reply, ViewforgeError>;
}

/// A participant backed by the language model.
#[derive(Clone)]
pub struct LlmAgent {
    role: AgentRole,
    instructions: String,
    llm: Arc<dyn ToolCallingLlm>,
    model: String,
    tools: Vec<ToolSpec>,
}

impl LlmAgent {
    pub fn new(
        role: AgentRole,
        instructions: impl Into<String>,
        llm: Arc<dyn ToolCallingLlm>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            role,
            instructions: instructions.into(),
            llm,
            model: model.into(),
            tools: Vec::new(),
        }
    }

    pub fn with_tool(mut self, spec: ToolSpec) -> Self {
        self.tools.push(spec);
        self
    }

    /// The transcript as this agent sees it: its own turns as assistant
    /// messages, tool results addressed to it as tool messages, everyone
    /// else's turns as user messages prefixed with the speaker.
    pub fn build_request(&self, transcript: &Transcript) -> LlmRequest {
        let mut messages = Vec::with_capacity(transcript.len() + 1);
        messages.push(Message::system(self.instructions.clone()));

        let mut previous: Option<AgentRole> = None;
        for turn in transcript.iter() {
            if turn.speaker == self.role {
                messages.push(Message::assistant(turn.content.clone(), turn.tool_calls.clone()));
            } else if previous == Some(self.role) && !turn.tool_responses.is_empty() {
                for response in &turn.tool_responses {
                    messages.push(Message::tool(response.call_id.clone(), response.content.clone()));
                }
            } else {
                messages.push(Message::user(format!("{}: {}", turn.speaker, turn.content)));
            }
            previous = Some(turn.speaker);
        }

        LlmRequest {
            model: self.model.clone(),
            messages,
            tools: self.tools.clone(),
        }
    }
}

impl std::fmt::Debug for LlmAgent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmAgent")
            .field("role", &self.role)
            .field("model", &self.model)
            .field("tools", &self.tools.len())
            .finish_non_exhaustive()
    }
}

#[async_trait::async_trait]
impl Participant for LlmAgent {
    fn role(&self) -> AgentRole {
        self.role
    }

    async fn respond(&self, transcript: &Transcript) -> Result<Reply, ViewforgeError> {
        let response = self.llm.invoke(self.build_request(transcript)).await?;
        Ok(Reply {
            content: response.content,
            tool_calls: response.tool_calls,
            tool_responses: Vec::new(),
        })
    }
}

/// Executes the Coder's `materialize_view_tool` calls and nothing else. It
/// never talks to the language model.
#[derive(Clone, Debug)]
pub struct VerifierAgent {
    tool: MaterializeViewTool,
    reminder: String,
}

impl VerifierAgent {
    pub fn new(views: Arc<dyn MaterializeViews>) -> Self {
        Self {
            tool: MaterializeViewTool::new(views),
            reminder: VERIFIER_REMINDER.to_string(),
        }
    }

    /// Reply used when the previous turn requested no tool call.
    pub fn with_reminder(mut self, reminder: impl Into<String>) -> Self {
        self.reminder = reminder.into();
        self
    }

    async fn call(&self, call: &ToolCall) -> String {
        if call.name != MATERIALIZE_VIEW_TOOL {
            return format!(
                "Unknown tool {}. The only available tool is {MATERIALIZE_VIEW_TOOL}.",
                call.name
            );
        }
        match self.tool.invoke(call.args.clone()).await {
            Ok(serde_json::Value::Array(feedback)) => feedback
                .iter()
                .map(|item| item.as_str().map(str::to_string).unwrap_or_else(|| item.to_string()))
                .collect::<Vec<_>>()
                .join("\n"),
            Ok(other) => other.to_string(),
            Err(error) => format!("Error calling {MATERIALIZE_VIEW_TOOL}: {error}"),
        }
    }
}

#[async_trait::async_trait]
impl Participant for VerifierAgent {
    fn role(&self) -> AgentRole {
        AgentRole::Verifier
    }

    async fn respond(&self, transcript: &Transcript) -> Result<Reply, ViewforgeError> {
        let calls = transcript
            .last()
            .map(|turn| turn.tool_calls.as_slice())
            .unwrap_or_default();
        if calls.is_empty() {
            return Ok(Reply {
                content: self.reminder.clone(),
                ..Reply::default()
            });
        }

        let mut responses = Vec::with_capacity(calls.len());
        for call in calls {
            let content = self.call(call).await;
            tracing::debug!(tool = %call.name, call_id = %call.id, "verifier answered tool call");
            responses.push(ToolResponse {
                call_id: call.id.clone(),
                tool_name: call.name.clone(),
                content,
            });
        }

        Ok(Reply {
            content: responses
                .iter()
                .map(|response| response.content.as_str())
                .collect::<Vec<_>>()
                .join("\n\n"),
            tool_calls: Vec::new(),
            tool_responses: responses,
        })
    }
}

/// The agents taking part in a session, by role.
#[derive(Clone)]
pub struct Participants {
    pub analyst: Arc<dyn Participant>,
    pub critic: Arc<dyn Participant>,
    pub coder: Option<Arc<dyn Participant>>,
    pub verifier: Option<Arc<dyn Participant>>,
}

impl Participants {
    pub fn new(analyst: Arc<dyn Participant>, critic: Arc<dyn Participant>) -> Self {
        Self {
            analyst,
            critic,
            coder: None,
            verifier: None,
        }
    }

    pub fn with_verification(
        mut self,
        coder: Arc<dyn Participant>,
        verifier: Arc<dyn Participant>,
    ) -> Self {
        self.coder = Some(coder);
        self.verifier = Some(verifier);
        self
    }

    /// Builds language-model agents from instructions. With `views`, the
    /// Coder is offered `materialize_view_tool` and a Verifier routes its
    /// calls to `views`. Verifier instructions, if any, are not used: the
    /// Verifier has no model behind it.
    pub fn from_instructions(
        instructions: &AgentInstructions,
        llm: Arc<dyn ToolCallingLlm>,
        config: &SessionConfig,
        views: Option<Arc<dyn MaterializeViews>>,
    ) -> Result<Self, ConfigError> {
        instructions.validate(views.is_some())?;
        let agent = |role: AgentRole| -> Result<LlmAgent, ConfigError> {
            Ok(LlmAgent::new(
                role,
                instructions.require(role)?,
                llm.clone(),
                config.model.clone(),
            ))
        };

        let mut participants = Self::new(
            Arc::new(agent(AgentRole::Analyst)?),
            Arc::new(agent(AgentRole::Critic)?),
        );
        if let Some(views) = views {
            let verifier = VerifierAgent::new(views);
            let coder = agent(AgentRole::Coder)?.with_tool(verifier.tool.spec());
            participants = participants.with_verification(Arc::new(coder), Arc::new(verifier));
        }
        Ok(participants)
    }

    pub fn get(&self, role: AgentRole) -> Option<&Arc<dyn Participant>> {
        match role {
            AgentRole::Analyst => Some(&self.analyst),
            AgentRole::Critic => Some(&self.critic),
            AgentRole::Coder => self.coder.as_ref(),
            AgentRole::Verifier => self.verifier.as_ref(),
        }
    }
}

impl std::fmt::Debug for Participants {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Participants")
            .field("verification", &self.coder.is_some())
            .finish_non_exhaustive()
    }
}
