use serde::{Deserialize, Serialize};

use crate::SchemaError;

#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct ColumnInfo {
    pub name: String,
    pub data_type: String,
    pub not_null: bool,
    pub default_value: Option<String>,
    pub primary_key: bool,
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct ForeignKey {
    pub from_column: String,
    pub referenced_table: String,
    pub referenced_column: String,
}

/// Read-only view of a live schema.
#[async_trait::async_trait]
pub trait SchemaSource: Send + Sync {
    async fn list_tables(&self) -> Result<Vec<String>, SchemaError>;
    async fn list_columns(&self, table: &str) -> Result<Vec<ColumnInfo>, SchemaError>;
    async fn list_foreign_keys(&self, table: &str) -> Result<Vec<ForeignKey>, SchemaError>;
}

/// Renders (part of) a schema as the text handed to agents.
#[async_trait::async_trait]
pub trait SchemaWording: Send + Sync {
    /// `None` renders every table.
    async fn schema_wording(&self, selected_tables: Option<&[String]>)
        -> Result<String, SchemaError>;
}
