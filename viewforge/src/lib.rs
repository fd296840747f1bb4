//! Language-model agents that propose database views and verify them
//! against a live database.
//!
//! The pieces live in separate crates and are re-exported here:
//!
//! - [`schema`]: foreign-key graph of the database and connected sampling.
//! - [`views`]: create, probe and drop protocol for proposed views.
//! - [`chat`]: phase machine, sessions and campaigns.
//! - [`llm`] (`openai` feature): OpenAI-compatible chat client.
//! - [`sqlite`] (`sqlite` feature): SQLite connector, introspection and
//!   schema wording.

pub use viewforge_core::*;

pub use viewforge_chat as chat;
pub use viewforge_schema as schema;
pub use viewforge_views as views;

#[cfg(feature = "openai")]
pub use viewforge_llm as llm;

#[cfg(feature = "sqlite")]
pub use viewforge_sqlite as sqlite;

pub mod prelude {
    pub use viewforge_chat::{
        AgentInstructions, AgentRole, CampaignConfig, CampaignOutput, ConversationPhase,
        ConversationSession, Participants, RefinementCampaign, ReflectionSummarizer,
        SchemaScope, SessionConfig,
    };
    pub use viewforge_core::{
        LlmRequest, LlmResponse, SqlConnector, ToolCallingLlm, ViewforgeError,
    };
    pub use viewforge_schema::{SchemaGraph, SchemaSampler, SchemaSource, SchemaWording};
    pub use viewforge_views::{MaterializeOptions, MaterializeViews, ViewMaterializer};

    #[cfg(feature = "openai")]
    pub use viewforge_llm::OpenAiCompatibleClient;
    #[cfg(feature = "sqlite")]
    pub use viewforge_sqlite::SqliteDatabase;
}
