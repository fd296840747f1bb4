//! SQLite implementation of the viewforge database collaborators.
//!
//! [`SqliteDatabase`] introspects tables and foreign keys for the schema
//! graph, renders the schema as DDL for the agents, and hands out one fresh
//! connection per materialization attempt.

mod connection;
mod database;
mod wording;

pub use connection::SqliteSqlConnection;
pub use database::{SqliteDatabase, SqliteDatabaseBuilder};
pub(crate) use connection::map_sqlx_error;
pub(crate) use viewforge_core::quote_identifier;
