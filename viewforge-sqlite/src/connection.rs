use sqlx::sqlite::{SqliteConnection, SqliteRow};
use sqlx::{Connection, Row};
use viewforge_core::{SqlConnection, SqlError, SqlRow};

/// One live SQLite connection. Closed when dropped.
pub struct SqliteSqlConnection {
    inner: SqliteConnection,
}

impl SqliteSqlConnection {
    pub(crate) fn new(inner: SqliteConnection) -> Self {
        Self { inner }
    }

    pub async fn close(self) -> Result<(), SqlError> {
        self.inner.close().await.map_err(map_sqlx_error)
    }

    pub(crate) fn raw(&mut self) -> &mut SqliteConnection {
        &mut self.inner
    }
}

impl std::fmt::Debug for SqliteSqlConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteSqlConnection").finish_non_exhaustive()
    }
}

#[async_trait::async_trait]
impl SqlConnection for SqliteSqlConnection {
    async fn execute(&mut self, sql: &str) -> Result<Vec<SqlRow>, SqlError> {
        let rows = sqlx::query(sql)
            .persistent(false)
            .fetch_all(&mut self.inner)
            .await
            .map_err(map_sqlx_error)?;
        Ok(rows.iter().map(text_row).collect())
    }

    async fn view_definition(&mut self, name: &str) -> Result<Option<String>, SqlError> {
        let row = sqlx::query(
            "SELECT sql FROM sqlite_master WHERE type = 'view' AND lower(name) = lower(?)",
        )
        .bind(name)
        .fetch_optional(&mut self.inner)
        .await
        .map_err(map_sqlx_error)?;

        match row {
            Some(row) => Ok(Some(
                row.try_get_unchecked::<Option<String>, _>(0)
                    .map_err(map_sqlx_error)?
                    .unwrap_or_default(),
            )),
            None => Ok(None),
        }
    }
}

/// Renders every cell as text. SQLite converts numbers on request; blobs
/// that are not valid UTF-8 fall back to a lossy rendering.
pub(crate) fn text_row(row: &SqliteRow) -> SqlRow {
    (0..row.len())
        .map(|index| match row.try_get_unchecked::<Option<String>, _>(index) {
            Ok(cell) => cell,
            Err(_) => row
                .try_get_unchecked::<Option<Vec<u8>>, _>(index)
                .ok()
                .flatten()
                .map(|bytes| String::from_utf8_lossy(&bytes).into_owned()),
        })
        .collect()
}

pub(crate) fn map_sqlx_error(error: sqlx::Error) -> SqlError {
    match error {
        sqlx::Error::Database(database) => {
            let message = database.message().to_string();
            if message.contains("already exists") {
                SqlError::AlreadyExists(message)
            } else {
                SqlError::Statement(message)
            }
        }
        sqlx::Error::Io(_)
        | sqlx::Error::Tls(_)
        | sqlx::Error::Configuration(_)
        | sqlx::Error::PoolTimedOut
        | sqlx::Error::PoolClosed => SqlError::Connection(error.to_string()),
        other => SqlError::Statement(other.to_string()),
    }
}
