//! Statement-execution side of the database collaborator.
//!
//! A [`SqlConnector`] hands out short-lived connections; callers acquire one
//! per unit of work and drop it when done, so a failed statement never leaks
//! connection state into the next caller.

use thiserror::Error;

use crate::view_definition::quote_identifier;

/// One result row, each cell rendered as text (`None` for SQL `NULL`).
pub type SqlRow = Vec<Option<String>>;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum SqlError {
    #[error("database connection failed: {0}")]
    Connection(String),
    #[error("{0}")]
    AlreadyExists(String),
    #[error("{0}")]
    Statement(String),
}

impl SqlError {
    pub fn is_already_exists(&self) -> bool {
        matches!(self, SqlError::AlreadyExists(_))
    }
}

#[async_trait::async_trait]
pub trait SqlConnection: Send {
    /// Runs one statement and returns every row it produced.
    async fn execute(&mut self, sql: &str) -> Result<Vec<SqlRow>, SqlError>;

    /// Stored definition of the view `name`, or `None` when no such view exists.
    async fn view_definition(&mut self, name: &str) -> Result<Option<String>, SqlError>;

    async fn view_exists(&mut self, name: &str) -> Result<bool, SqlError> {
        Ok(self.view_definition(name).await?.is_some())
    }

    /// Selects from the view once so engines with deferred checking report
    /// unresolved columns and tables.
    async fn probe_view(&mut self, name: &str) -> Result<(), SqlError> {
        let sql = format!("SELECT * FROM {} LIMIT 1", quote_identifier(name));
        self.execute(&sql).await.map(|_| ())
    }

    async fn drop_view(&mut self, name: &str) -> Result<(), SqlError> {
        let sql = format!("DROP VIEW IF EXISTS {}", quote_identifier(name));
        self.execute(&sql).await.map(|_| ())
    }
}

#[async_trait::async_trait]
pub trait SqlConnector: Send + Sync {
    async fn connect(&self) -> Result<Box<dyn SqlConnection>, SqlError>;
}
