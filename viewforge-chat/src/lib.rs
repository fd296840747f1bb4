//! Multi-agent refinement of database views.
//!
//! A [`ConversationSession`] is one bounded dialog. The Analyst and Critic
//! refine an analysis task and propose views; with verification enabled the
//! Coder then submits the view definitions and the Verifier materializes
//! them against the database. A [`RefinementCampaign`] chains sessions and
//! carries their summaries and defined views forward.

mod agent;
mod campaign;
mod config;
mod error;
pub mod extract;
mod phase;
mod role;
mod session;
mod summary;
mod transcript;

pub use agent::{LlmAgent, Participant, Participants, Reply, VerifierAgent};
pub use campaign::{opening_message, CampaignOutput, RefinementCampaign, SchemaScope};
pub use config::{AgentInstruction, AgentInstructions, CampaignConfig, CampaignOptions, SessionConfig};
pub use error::{CampaignError, ConfigError, SessionError};
pub use phase::{
    contains_termination_token, next_turn, ConversationPhase, PhaseBudget, PhaseMachine,
    Transition,
};
pub use role::AgentRole;
pub use session::{ConversationSession, SessionOutcome};
pub use summary::{ReflectionSummarizer, REFLECTION_PROMPT};
pub use transcript::{ToolResponse, Transcript, TurnRecord};
