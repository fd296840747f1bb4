use tempfile::TempDir;
use viewforge_schema::{SchemaGraph, SchemaSource, SchemaWording};
use viewforge_sqlite::SqliteDatabase;

async fn retail(include_sample_data: bool) -> (TempDir, SqliteDatabase) {
    let dir = tempfile::tempdir().expect("tempdir should be created");
    let database = SqliteDatabase::builder(dir.path().join("retail.db"))
        .create_if_missing(true)
        .include_sample_data(include_sample_data)
        .sample_rows(1)
        .build()
        .await
        .expect("sqlite database should open");

    for statement in [
        "CREATE TABLE customers (id INTEGER PRIMARY KEY, name TEXT NOT NULL)",
        "CREATE TABLE products (sku TEXT PRIMARY KEY, price REAL DEFAULT 0)",
        "CREATE TABLE orders (id INTEGER PRIMARY KEY, customer_id INTEGER REFERENCES customers(id), sku TEXT REFERENCES products)",
        "CREATE TABLE audit_log (entry TEXT)",
        "INSERT INTO customers (id, name) VALUES (1, 'Ada'), (2, 'Grace')",
    ] {
        database
            .run_query(statement)
            .await
            .expect("fixture statement should run");
    }
    (dir, database)
}

#[tokio::test]
async fn introspection_reports_tables_columns_and_keys() {
    let (_dir, database) = retail(false).await;

    let tables = database.list_tables().await.expect("tables should list");
    assert_eq!(tables, vec!["customers", "products", "orders", "audit_log"]);

    let columns = database
        .list_columns("customers")
        .await
        .expect("columns should list");
    assert_eq!(columns.len(), 2);
    assert!(columns[0].primary_key);
    assert!(columns[1].not_null);

    let keys = database
        .list_foreign_keys("orders")
        .await
        .expect("foreign keys should list");
    assert_eq!(keys.len(), 2);
    let implicit = keys
        .iter()
        .find(|key| key.referenced_table == "products")
        .expect("products key should be listed");
    assert_eq!(implicit.referenced_column, "sku");
}

#[tokio::test]
async fn schema_graph_links_both_directions() {
    let (_dir, database) = retail(false).await;

    let graph = SchemaGraph::build(&database)
        .await
        .expect("graph should build");

    assert_eq!(graph.node_count(), 4);
    assert_eq!(graph.edge_count(), 4);
    assert_eq!(graph.neighbors(2), vec![0, 1]);
    assert_eq!(graph.neighbors(0), vec![2]);
    assert!(graph.neighbors(3).is_empty());
}

#[tokio::test]
async fn wording_renders_selected_tables_as_ddl() {
    let (_dir, database) = retail(false).await;

    let wording = database
        .schema_wording(Some(&["orders".to_string()]))
        .await
        .expect("wording should render");

    assert!(wording.starts_with("CREATE TABLE orders (\n"));
    assert!(wording.contains("FOREIGN KEY (customer_id) REFERENCES customers(id)"));
    assert!(!wording.contains("CREATE TABLE customers"));
}

#[tokio::test]
async fn wording_appends_sample_rows() {
    let (_dir, database) = retail(true).await;

    let wording = database
        .schema_wording(None)
        .await
        .expect("wording should render");

    assert!(wording.contains("-- Sample Data:\n(1, Ada)\n"));
    assert!(!wording.contains("(2, Grace)"));
    assert!(wording.contains("-- Sample Data: No sample data available"));
    assert!(wording.contains("price REAL DEFAULT 0"));
}

#[tokio::test]
async fn sample_rows_are_left_out_unless_requested() {
    let dir = tempfile::tempdir().expect("tempdir should be created");
    let database = SqliteDatabase::builder(dir.path().join("plain.db"))
        .create_if_missing(true)
        .build()
        .await
        .expect("sqlite database should open");
    for statement in [
        "CREATE TABLE customers (id INTEGER PRIMARY KEY, name TEXT NOT NULL)",
        "INSERT INTO customers (id, name) VALUES (1, 'Ada')",
    ] {
        database
            .run_query(statement)
            .await
            .expect("fixture statement should run");
    }

    let wording = database
        .schema_wording(None)
        .await
        .expect("wording should render");

    assert!(wording.contains("CREATE TABLE customers"));
    assert!(!wording.contains("Sample Data"));
    assert!(!wording.contains("Ada"));
}

#[tokio::test]
async fn missing_database_is_a_connection_error() {
    let dir = tempfile::tempdir().expect("tempdir should be created");

    let error = SqliteDatabase::builder(dir.path().join("absent.db"))
        .build()
        .await
        .expect_err("missing file should not open");

    assert!(matches!(error, viewforge_core::SqlError::Connection(_)));
}
