use std::path::PathBuf;

use thiserror::Error;
use viewforge_core::ViewforgeError;
use viewforge_schema::SchemaError;

use crate::AgentRole;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid configuration: {0}")]
    Invalid(String),
    #[error("{0} instructions not found")]
    MissingInstructions(AgentRole),
    #[error("unknown agent '{0}' in instructions")]
    UnknownAgent(String),
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid instructions file: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Ends the current session. The campaign stops but keeps what earlier
/// sessions produced.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("language model failed: {0}")]
    Fatal(#[from] ViewforgeError),
    #[error("schema unavailable: {0}")]
    Schema(#[from] SchemaError),
    #[error("no {0} participant configured")]
    MissingParticipant(AgentRole),
}

/// Raised before any session runs.
#[derive(Debug, Error)]
pub enum CampaignError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Schema(#[from] SchemaError),
}
