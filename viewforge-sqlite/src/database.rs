use std::path::{Path, PathBuf};

use sqlx::sqlite::SqliteConnectOptions;
use sqlx::{ConnectOptions, Row};
use viewforge_core::{SqlConnection, SqlConnector, SqlError, SqlRow};
use viewforge_schema::{ColumnInfo, ForeignKey, SchemaError, SchemaSource};

use crate::{map_sqlx_error, quote_identifier, SqliteSqlConnection};

/// A SQLite database file. Holds no open connection; every operation
/// connects, works, and disconnects.
#[derive(Debug, Clone)]
pub struct SqliteDatabase {
    path: PathBuf,
    options: SqliteConnectOptions,
    include_sample_data: bool,
    sample_rows: usize,
}

#[derive(Debug, Clone)]
pub struct SqliteDatabaseBuilder {
    path: PathBuf,
    create_if_missing: bool,
    include_sample_data: bool,
    sample_rows: usize,
}

impl SqliteDatabase {
    pub fn builder(path: impl Into<PathBuf>) -> SqliteDatabaseBuilder {
        SqliteDatabaseBuilder {
            path: path.into(),
            create_if_missing: false,
            include_sample_data: false,
            sample_rows: 5,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub(crate) fn include_sample_data(&self) -> bool {
        self.include_sample_data
    }

    pub(crate) fn sample_rows(&self) -> usize {
        self.sample_rows
    }

    pub async fn open(&self) -> Result<SqliteSqlConnection, SqlError> {
        let connection = self
            .options
            .connect()
            .await
            .map_err(|error| SqlError::Connection(error.to_string()))?;
        Ok(SqliteSqlConnection::new(connection))
    }

    /// Runs a single statement on a fresh connection.
    pub async fn run_query(&self, sql: &str) -> Result<Vec<SqlRow>, SqlError> {
        let mut connection = self.open().await?;
        let rows = connection.execute(sql).await;
        connection.close().await?;
        rows
    }

    /// Names of the views currently stored in the database.
    pub async fn list_views(&self) -> Result<Vec<String>, SqlError> {
        let rows = self
            .run_query("SELECT name FROM sqlite_master WHERE type = 'view'")
            .await?;
        Ok(first_column(rows))
    }

    pub(crate) async fn table_names(
        &self,
        connection: &mut SqliteSqlConnection,
    ) -> Result<Vec<String>, SqlError> {
        let rows = connection
            .execute("SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%'")
            .await?;
        Ok(first_column(rows))
    }

    pub(crate) async fn columns(
        &self,
        connection: &mut SqliteSqlConnection,
        table: &str,
    ) -> Result<Vec<ColumnInfo>, SqlError> {
        let sql = format!("PRAGMA table_info({})", quote_identifier(table));
        let rows = sqlx::query(&sql)
            .persistent(false)
            .fetch_all(connection.raw())
            .await
            .map_err(map_sqlx_error)?;

        rows.iter()
            .map(|row| {
                Ok(ColumnInfo {
                    name: row.try_get_unchecked("name").map_err(map_sqlx_error)?,
                    data_type: row
                        .try_get_unchecked::<Option<String>, _>("type")
                        .map_err(map_sqlx_error)?
                        .unwrap_or_default(),
                    not_null: row
                        .try_get_unchecked::<i64, _>("notnull")
                        .map_err(map_sqlx_error)?
                        != 0,
                    default_value: row.try_get_unchecked("dflt_value").map_err(map_sqlx_error)?,
                    primary_key: row.try_get_unchecked::<i64, _>("pk").map_err(map_sqlx_error)? > 0,
                })
            })
            .collect()
    }

    pub(crate) async fn foreign_keys(
        &self,
        connection: &mut SqliteSqlConnection,
        table: &str,
    ) -> Result<Vec<ForeignKey>, SqlError> {
        let sql = format!("PRAGMA foreign_key_list({})", quote_identifier(table));
        let rows = sqlx::query(&sql)
            .persistent(false)
            .fetch_all(connection.raw())
            .await
            .map_err(map_sqlx_error)?;

        let mut keys = Vec::with_capacity(rows.len());
        for row in &rows {
            let referenced_table: String = row.try_get_unchecked("table").map_err(map_sqlx_error)?;
            let from_column: String = row.try_get_unchecked("from").map_err(map_sqlx_error)?;
            // `to` is NULL when the key targets the referenced table's primary key implicitly.
            let referenced_column = match row
                .try_get_unchecked::<Option<String>, _>("to")
                .map_err(map_sqlx_error)?
            {
                Some(column) => column,
                None => self
                    .columns(connection, &referenced_table)
                    .await?
                    .into_iter()
                    .find(|column| column.primary_key)
                    .map(|column| column.name)
                    .unwrap_or_else(|| "rowid".to_string()),
            };
            keys.push(ForeignKey {
                from_column,
                referenced_table,
                referenced_column,
            });
        }
        Ok(keys)
    }
}

impl SqliteDatabaseBuilder {
    pub fn create_if_missing(mut self, create_if_missing: bool) -> Self {
        self.create_if_missing = create_if_missing;
        self
    }

    /// Append sample rows after each table in the schema wording. Off by
    /// default: row values are sent to the language model verbatim.
    pub fn include_sample_data(mut self, include_sample_data: bool) -> Self {
        self.include_sample_data = include_sample_data;
        self
    }

    pub fn sample_rows(mut self, sample_rows: usize) -> Self {
        self.sample_rows = sample_rows;
        self
    }

    /// Checks that the database can be opened before handing it out.
    pub async fn build(self) -> Result<SqliteDatabase, SqlError> {
        let options = SqliteConnectOptions::new()
            .filename(&self.path)
            .create_if_missing(self.create_if_missing);

        let database = SqliteDatabase {
            path: self.path,
            options,
            include_sample_data: self.include_sample_data,
            sample_rows: self.sample_rows,
        };
        database.open().await?.close().await?;
        tracing::debug!(path = %database.path.display(), "sqlite database opened");
        Ok(database)
    }
}

fn first_column(rows: Vec<SqlRow>) -> Vec<String> {
    rows.into_iter()
        .filter_map(|row| row.into_iter().next().flatten())
        .collect()
}

#[async_trait::async_trait]
impl SqlConnector for SqliteDatabase {
    async fn connect(&self) -> Result<Box<dyn SqlConnection>, SqlError> {
        Ok(Box::new(self.open().await?))
    }
}

#[async_trait::async_trait]
impl SchemaSource for SqliteDatabase {
    async fn list_tables(&self) -> Result<Vec<String>, SchemaError> {
        let mut connection = self.open().await?;
        let tables = self.table_names(&mut connection).await?;
        connection.close().await?;
        Ok(tables)
    }

    async fn list_columns(&self, table: &str) -> Result<Vec<ColumnInfo>, SchemaError> {
        let mut connection = self.open().await?;
        let columns = self.columns(&mut connection, table).await?;
        connection.close().await?;
        Ok(columns)
    }

    async fn list_foreign_keys(&self, table: &str) -> Result<Vec<ForeignKey>, SchemaError> {
        let mut connection = self.open().await?;
        let keys = self.foreign_keys(&mut connection, table).await?;
        connection.close().await?;
        Ok(keys)
    }
}
