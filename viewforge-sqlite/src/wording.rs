use std::fmt::Write as _;

use viewforge_core::{SqlConnection, SqlRow};
use viewforge_schema::{ColumnInfo, ForeignKey, SchemaError, SchemaWording};

use crate::{quote_identifier, SqliteDatabase};

#[async_trait::async_trait]
impl SchemaWording for SqliteDatabase {
    async fn schema_wording(
        &self,
        selected_tables: Option<&[String]>,
    ) -> Result<String, SchemaError> {
        let mut connection = self.open().await?;
        let mut ddl = String::new();

        for table in self.table_names(&mut connection).await? {
            if let Some(selected) = selected_tables {
                if !selected.iter().any(|name| name.eq_ignore_ascii_case(&table)) {
                    continue;
                }
            }

            let columns = self.columns(&mut connection, &table).await?;
            let keys = self.foreign_keys(&mut connection, &table).await?;
            ddl.push_str(&table_ddl(&table, &columns, &keys));

            if self.include_sample_data() {
                let sql = format!(
                    "SELECT * FROM {} LIMIT {}",
                    quote_identifier(&table),
                    self.sample_rows()
                );
                let rows = connection.execute(&sql).await?;
                ddl.push_str(&sample_block(&rows));
            }
            ddl.push('\n');
        }

        connection.close().await?;
        Ok(ddl)
    }
}

fn table_ddl(table: &str, columns: &[ColumnInfo], keys: &[ForeignKey]) -> String {
    let mut ddl = format!("CREATE TABLE {table} (\n");
    for (index, column) in columns.iter().enumerate() {
        let _ = write!(ddl, "  {} {}", column.name, column.data_type);
        if column.not_null {
            ddl.push_str(" NOT NULL");
        }
        if let Some(default) = column.default_value.as_deref().filter(|value| !value.is_empty()) {
            let _ = write!(ddl, " DEFAULT {default}");
        }
        if column.primary_key {
            ddl.push_str(" PRIMARY KEY");
        }
        if index + 1 < columns.len() || !keys.is_empty() {
            ddl.push(',');
        }
        ddl.push('\n');
    }
    for (index, key) in keys.iter().enumerate() {
        let _ = write!(
            ddl,
            "  FOREIGN KEY ({}) REFERENCES {}({})",
            key.from_column, key.referenced_table, key.referenced_column
        );
        if index + 1 < keys.len() {
            ddl.push(',');
        }
        ddl.push('\n');
    }
    ddl.push_str(");\n\n");
    ddl
}

fn sample_block(rows: &[SqlRow]) -> String {
    if rows.is_empty() {
        return "-- Sample Data: No sample data available\n".to_string();
    }
    let mut block = String::from("-- Sample Data:\n");
    for row in rows {
        let cells: Vec<&str> = row
            .iter()
            .map(|cell| cell.as_deref().unwrap_or("NULL"))
            .collect();
        let _ = writeln!(block, "({})", cells.join(", "));
    }
    block
}
