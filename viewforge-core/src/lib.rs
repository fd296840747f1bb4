mod database;
mod error;
mod llm;
mod tool;
mod view_definition;

pub use database::{SqlConnection, SqlConnector, SqlError, SqlRow};
pub use error::ViewforgeError;
pub use llm::{LlmRequest, LlmResponse, Message, Role, ToolCall, ToolCallingLlm, ToolSpec};
pub use tool::{Tool, ToolError};
pub use view_definition::{
    parse_view_definition, parse_view_statement, quote_identifier, split_statements, CreatePhrasing,
    ParsedViewDefinition, ViewStatementError,
};

pub type Value = serde_json::Value;
