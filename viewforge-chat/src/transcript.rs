use serde::{Deserialize, Serialize};
use viewforge_core::ToolCall;

use crate::{AgentRole, ConversationPhase};

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct ToolResponse {
    pub call_id: String,
    pub tool_name: String,
    pub content: String,
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct TurnRecord {
    /// 1-based; the opening message is turn 1.
    pub ordinal: usize,
    pub speaker: AgentRole,
    pub phase: ConversationPhase,
    pub content: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_responses: Vec<ToolResponse>,
}

/// Append-only record of a session's turns.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(transparent)]
pub struct Transcript {
    turns: Vec<TurnRecord>,
}

impl Transcript {
    pub fn push(
        &mut self,
        speaker: AgentRole,
        phase: ConversationPhase,
        content: impl Into<String>,
        tool_calls: Vec<ToolCall>,
        tool_responses: Vec<ToolResponse>,
    ) -> &TurnRecord {
        let ordinal = self.turns.len() + 1;
        self.turns.push(TurnRecord {
            ordinal,
            speaker,
            phase,
            content: content.into(),
            tool_calls,
            tool_responses,
        });
        &self.turns[ordinal - 1]
    }

    pub fn turns(&self) -> &[TurnRecord] {
        &self.turns
    }

    pub fn last(&self) -> Option<&TurnRecord> {
        self.turns.last()
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TurnRecord> {
        self.turns.iter()
    }

    /// `Speaker: text` per turn, blank-line separated.
    pub fn render(&self) -> String {
        self.turns
            .iter()
            .map(|turn| format!("{}: {}", turn.speaker, turn.content))
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}
