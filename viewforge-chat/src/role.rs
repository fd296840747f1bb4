use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Who speaks a turn. The transition table works on these tags only.
#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AgentRole {
    Analyst,
    Critic,
    Coder,
    Verifier,
}

impl AgentRole {
    pub const ALL: [AgentRole; 4] = [
        AgentRole::Analyst,
        AgentRole::Critic,
        AgentRole::Coder,
        AgentRole::Verifier,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AgentRole::Analyst => "Analyst",
            AgentRole::Critic => "Critic",
            AgentRole::Coder => "Coder",
            AgentRole::Verifier => "Verifier",
        }
    }
}

impl fmt::Display for AgentRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AgentRole {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        AgentRole::ALL
            .into_iter()
            .find(|role| role.as_str().eq_ignore_ascii_case(value.trim()))
            .ok_or_else(|| format!("unknown agent role '{value}'"))
    }
}
