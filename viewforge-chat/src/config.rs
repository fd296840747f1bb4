use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{AgentRole, ConfigError, PhaseBudget};

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct SessionConfig {
    pub n_rounds: usize,
    pub n_verification_rounds: usize,
    pub verify: bool,
    pub termination_token: String,
    pub model: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            n_rounds: 8,
            n_verification_rounds: 6,
            verify: false,
            termination_token: "goodbye".to_string(),
            model: "gpt-4o".to_string(),
        }
    }
}

impl SessionConfig {
    pub fn budget(&self) -> PhaseBudget {
        PhaseBudget {
            n_rounds: self.n_rounds,
            n_verification_rounds: self.n_verification_rounds,
            verify: self.verify,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.n_rounds < 2 {
            return Err(ConfigError::Invalid(
                "n_rounds must allow at least one reply to the opening message".to_string(),
            ));
        }
        if self.verify && self.n_verification_rounds == 0 {
            return Err(ConfigError::Invalid(
                "n_verification_rounds must be positive when verification is enabled".to_string(),
            ));
        }
        if self.model.trim().is_empty() {
            return Err(ConfigError::Invalid("model must not be empty".to_string()));
        }
        Ok(())
    }
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct CampaignConfig {
    pub n_chats: usize,
    pub subsample: bool,
    pub sample_size: usize,
    pub seed: u64,
    pub session: SessionConfig,
}

impl Default for CampaignConfig {
    fn default() -> Self {
        Self {
            n_chats: 10,
            subsample: false,
            sample_size: 5,
            seed: 13,
            session: SessionConfig::default(),
        }
    }
}

impl CampaignConfig {
    pub fn merge(&self, overrides: &CampaignOptions) -> Self {
        Self {
            n_chats: overrides.n_chats.unwrap_or(self.n_chats),
            subsample: overrides.subsample.unwrap_or(self.subsample),
            sample_size: overrides.sample_size.unwrap_or(self.sample_size),
            seed: overrides.seed.unwrap_or(self.seed),
            session: SessionConfig {
                n_rounds: overrides.n_rounds.unwrap_or(self.session.n_rounds),
                n_verification_rounds: overrides
                    .n_verification_rounds
                    .unwrap_or(self.session.n_verification_rounds),
                verify: overrides.verify.unwrap_or(self.session.verify),
                termination_token: overrides
                    .termination_token
                    .clone()
                    .unwrap_or_else(|| self.session.termination_token.clone()),
                model: overrides
                    .model
                    .clone()
                    .unwrap_or_else(|| self.session.model.clone()),
            },
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.n_chats == 0 {
            return Err(ConfigError::Invalid("n_chats must be positive".to_string()));
        }
        if self.subsample && self.sample_size == 0 {
            return Err(ConfigError::Invalid(
                "sample_size must be positive when subsampling".to_string(),
            ));
        }
        self.session.validate()
    }
}

/// Per-run overrides; `None` keeps the configured value.
#[derive(Clone, Debug, Default)]
pub struct CampaignOptions {
    pub n_chats: Option<usize>,
    pub subsample: Option<bool>,
    pub sample_size: Option<usize>,
    pub seed: Option<u64>,
    pub n_rounds: Option<usize>,
    pub n_verification_rounds: Option<usize>,
    pub verify: Option<bool>,
    pub termination_token: Option<String>,
    pub model: Option<String>,
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct AgentInstruction {
    pub name: String,
    pub instructions: String,
}

/// System instructions per agent, read from a YAML file of the form
/// `agents: [{name: Analyst, instructions: "..."}, ...]`.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct AgentInstructions {
    pub agents: Vec<AgentInstruction>,
}

impl AgentInstructions {
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        let instructions: Self = serde_yaml::from_str(yaml)?;
        for agent in &instructions.agents {
            agent
                .name
                .parse::<AgentRole>()
                .map_err(|_| ConfigError::UnknownAgent(agent.name.clone()))?;
        }
        Ok(instructions)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml_str(&yaml)
    }

    /// The last entry wins when a role appears twice.
    pub fn for_role(&self, role: AgentRole) -> Option<&str> {
        self.agents
            .iter()
            .rev()
            .find(|agent| agent.name.parse::<AgentRole>() == Ok(role))
            .map(|agent| agent.instructions.as_str())
    }

    pub fn require(&self, role: AgentRole) -> Result<&str, ConfigError> {
        self.for_role(role)
            .ok_or(ConfigError::MissingInstructions(role))
    }

    /// Analyst and Critic are always needed, the Coder only when verifying.
    /// Verifier instructions are optional.
    pub fn validate(&self, verify: bool) -> Result<(), ConfigError> {
        self.require(AgentRole::Analyst)?;
        self.require(AgentRole::Critic)?;
        if verify {
            self.require(AgentRole::Coder)?;
        }
        Ok(())
    }
}
