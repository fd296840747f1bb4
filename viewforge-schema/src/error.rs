use thiserror::Error;
use viewforge_core::SqlError;

#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("schema introspection failed: {0}")]
    Introspection(String),
    #[error("sample size {requested} exceeds the {available} tables in the schema graph")]
    InvalidSampleSize { requested: usize, available: usize },
    #[error("unknown table '{0}'")]
    UnknownTable(String),
}

impl From<SqlError> for SchemaError {
    fn from(error: SqlError) -> Self {
        SchemaError::Introspection(error.to_string())
    }
}
