use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use serde_json::json;
use viewforge_core::{
    parse_view_definition, SqlConnection, SqlConnector, SqlError, SqlRow, Tool, ToolError,
};
use viewforge_views::{
    MaterializationOutcome, MaterializeOptions, MaterializeViewTool, MaterializeViews,
    ViewMaterializer, MATERIALIZE_VIEW_TOOL,
};

/// In-memory engine with deferred view checking: a view body is only
/// validated when the view is first selected from.
#[derive(Default)]
struct EngineState {
    tables: BTreeMap<String, Vec<String>>,
    views: BTreeMap<String, String>,
    connections: usize,
    // Number of further DROP VIEW statements that succeed; unlimited when unset.
    drops_allowed: Option<usize>,
}

#[derive(Clone, Default)]
struct FakeEngine(Arc<Mutex<EngineState>>);

impl FakeEngine {
    fn with_table(self, name: &str, columns: &[&str]) -> Self {
        self.0.lock().unwrap().tables.insert(
            name.to_string(),
            columns.iter().map(|column| column.to_string()).collect(),
        );
        self
    }

    fn allow_drops(self, drops: usize) -> Self {
        self.0.lock().unwrap().drops_allowed = Some(drops);
        self
    }

    fn view(&self, name: &str) -> Option<String> {
        self.0.lock().unwrap().views.get(name).cloned()
    }

    fn connections(&self) -> usize {
        self.0.lock().unwrap().connections
    }

    fn materializer(&self) -> ViewMaterializer {
        ViewMaterializer::new(Arc::new(self.clone()))
    }
}

struct FakeConnection(Arc<Mutex<EngineState>>);

#[async_trait::async_trait]
impl SqlConnector for FakeEngine {
    async fn connect(&self) -> Result<Box<dyn SqlConnection>, SqlError> {
        self.0.lock().unwrap().connections += 1;
        Ok(Box::new(FakeConnection(self.0.clone())))
    }
}

fn referenced_columns(definition: &str) -> (String, Vec<String>) {
    let lower = definition.to_lowercase();
    let select = lower.split(" select ").nth(1).unwrap_or_default();
    let (columns, rest) = select.split_once(" from ").unwrap_or_default();
    let table = rest
        .split(|c: char| c.is_whitespace() || c == ';')
        .next()
        .unwrap_or_default()
        .to_string();
    let columns = columns.split(',').map(|c| c.trim().to_string()).collect();
    (table, columns)
}

#[async_trait::async_trait]
impl SqlConnection for FakeConnection {
    async fn execute(&mut self, sql: &str) -> Result<Vec<SqlRow>, SqlError> {
        let mut state = self.0.lock().unwrap();
        let lower = sql.trim().to_lowercase();

        if let Some(name) = lower.strip_prefix("drop view if exists ") {
            match state.drops_allowed {
                Some(0) => return Err(SqlError::Statement("database is locked".to_string())),
                Some(ref mut remaining) => *remaining -= 1,
                None => {}
            }
            state.views.remove(name.trim().trim_matches('"'));
            return Ok(Vec::new());
        }

        if let Some(rest) = lower.strip_prefix("select * from ") {
            let name = rest
                .split_whitespace()
                .next()
                .unwrap_or_default()
                .trim_matches('"');
            if state.tables.contains_key(name) {
                return Ok(Vec::new());
            }
            let Some(definition) = state.views.get(name) else {
                return Err(SqlError::Statement(format!("no such table: {name}")));
            };
            let (table, columns) = referenced_columns(definition);
            let Some(known) = state.tables.get(&table) else {
                return Err(SqlError::Statement(format!("no such table: {table}")));
            };
            for column in columns {
                if column != "*" && !known.contains(&column) {
                    return Err(SqlError::Statement(format!("no such column: {column}")));
                }
            }
            return Ok(vec![vec![Some("1".to_string())]]);
        }

        if lower.contains(" selec ") {
            return Err(SqlError::Statement("near \"SELEC\": syntax error".to_string()));
        }

        let Some(parsed) = parse_view_definition(sql) else {
            return Err(SqlError::Statement(format!("unsupported statement: {sql}")));
        };
        if state.views.contains_key(&parsed.name) {
            return Err(SqlError::AlreadyExists(format!(
                "view {} already exists",
                parsed.name
            )));
        }
        if state.tables.contains_key(&parsed.name) {
            return Err(SqlError::AlreadyExists(format!(
                "table {} already exists",
                parsed.name
            )));
        }
        state.views.insert(parsed.name, sql.to_string());
        Ok(Vec::new())
    }

    async fn view_definition(&mut self, name: &str) -> Result<Option<String>, SqlError> {
        Ok(self.0.lock().unwrap().views.get(name).cloned())
    }
}

fn customers() -> FakeEngine {
    FakeEngine::default().with_table("customers", &["id", "name", "city"])
}

const TOP_CUSTOMERS: &str = "CREATE VIEW top_customers AS SELECT id FROM customers LIMIT 10;";

fn keep() -> MaterializeOptions {
    MaterializeOptions::default()
        .replace_on_conflict(true)
        .persist(true)
}

#[tokio::test]
async fn clean_create_persists_view() {
    let engine = customers();

    let result = engine.materializer().materialize(TOP_CUSTOMERS, keep()).await;

    assert_eq!(result.outcome, MaterializationOutcome::Success);
    assert_eq!(result.view_name.as_deref(), Some("top_customers"));
    assert!(result.error.is_none());
    assert_eq!(engine.view("top_customers").as_deref(), Some(TOP_CUSTOMERS));
}

#[tokio::test]
async fn verification_without_persist_is_idempotent() {
    let engine = customers();
    let materializer = engine.materializer();
    let options = MaterializeOptions::default()
        .replace_on_conflict(true)
        .persist(false);

    let first = materializer.materialize(TOP_CUSTOMERS, options).await;
    assert_eq!(first.outcome, MaterializationOutcome::Success);
    assert!(engine.view("top_customers").is_none());

    let second = materializer.materialize(TOP_CUSTOMERS, options).await;
    assert_eq!(second.outcome, MaterializationOutcome::Success);
    assert!(engine.view("top_customers").is_none());
}

#[tokio::test]
async fn conflict_without_replace_leaves_existing_view_untouched() {
    let engine = customers();
    let materializer = engine.materializer();
    materializer.materialize(TOP_CUSTOMERS, keep()).await;

    let replacement = "CREATE VIEW top_customers AS SELECT name FROM customers;";
    let result = materializer
        .materialize(replacement, keep().replace_on_conflict(false))
        .await;

    assert_eq!(result.outcome, MaterializationOutcome::AlreadyExistsRejected);
    assert!(!result.is_success());
    assert_eq!(engine.view("top_customers").as_deref(), Some(TOP_CUSTOMERS));
}

#[tokio::test]
async fn conflict_with_replace_recreates_view() {
    let engine = customers();
    let materializer = engine.materializer();
    materializer.materialize(TOP_CUSTOMERS, keep()).await;

    let replacement = "CREATE VIEW top_customers AS SELECT id, name FROM customers;";
    let result = materializer.materialize(replacement, keep()).await;

    assert_eq!(result.outcome, MaterializationOutcome::AlreadyExistsReplaced);
    assert!(result.is_success());
    assert_eq!(engine.view("top_customers").as_deref(), Some(replacement));
}

#[tokio::test]
async fn replacing_without_persist_restores_original() {
    let engine = customers();
    let materializer = engine.materializer();
    materializer.materialize(TOP_CUSTOMERS, keep()).await;

    let replacement = "CREATE VIEW top_customers AS SELECT city FROM customers;";
    let result = materializer
        .materialize(replacement, keep().persist(false))
        .await;

    assert!(result.is_success());
    assert_eq!(engine.view("top_customers").as_deref(), Some(TOP_CUSTOMERS));
}

#[tokio::test]
async fn deferred_reference_error_fails_and_leaves_no_view() {
    let engine = customers();

    let result = engine
        .materializer()
        .materialize("CREATE VIEW bad AS SELECT nonexistent_col FROM customers;", keep())
        .await;

    assert_eq!(result.outcome, MaterializationOutcome::Failed);
    let error = result.error.expect("failure carries an error message");
    assert!(error.contains("nonexistent_col"));
    assert!(engine.view("bad").is_none());
}

#[tokio::test]
async fn failed_replacement_restores_previous_definition() {
    let engine = customers();
    let materializer = engine.materializer();
    materializer.materialize(TOP_CUSTOMERS, keep()).await;

    let broken = "CREATE VIEW top_customers AS SELECT revenue FROM customers;";
    let result = materializer.materialize(broken, keep()).await;

    assert_eq!(result.outcome, MaterializationOutcome::Failed);
    assert_eq!(engine.view("top_customers").as_deref(), Some(TOP_CUSTOMERS));
}

#[tokio::test]
async fn syntax_error_is_reported_as_text() {
    let engine = customers();

    let result = engine
        .materializer()
        .materialize("CREATE VIEW typo AS SELEC id FROM customers", keep())
        .await;

    assert_eq!(result.outcome, MaterializationOutcome::Failed);
    assert!(result.feedback().contains("syntax error"));
    assert!(engine.view("typo").is_none());
}

#[tokio::test]
async fn unparseable_definition_never_touches_the_database() {
    let engine = customers();

    let result = engine
        .materializer()
        .materialize("SELECT id FROM customers", keep())
        .await;

    assert_eq!(result.outcome, MaterializationOutcome::Failed);
    assert!(result.view_name.is_none());
    assert_eq!(engine.connections(), 0);
}

#[tokio::test]
async fn several_statements_never_reach_the_database() {
    let engine = customers();

    let result = engine
        .materializer()
        .materialize(
            "CREATE VIEW a AS SELECT id FROM customers; CREATE VIEW b AS SELECT name FROM customers;",
            keep(),
        )
        .await;

    assert_eq!(result.outcome, MaterializationOutcome::Failed);
    assert_eq!(result.view_name.as_deref(), Some("a"));
    assert!(result.feedback().contains("single CREATE VIEW statement"));
    assert_eq!(engine.connections(), 0);
    assert!(engine.view("a").is_none());
    assert!(engine.view("b").is_none());
}

#[tokio::test]
async fn quoted_name_is_queried_and_dropped() {
    let engine = customers();

    let result = engine
        .materializer()
        .materialize(
            r#"CREATE VIEW "Spend" AS SELECT id FROM customers"#,
            MaterializeOptions::default(),
        )
        .await;

    assert_eq!(result.outcome, MaterializationOutcome::Success);
    assert_eq!(result.view_name.as_deref(), Some("spend"));
    assert!(engine.view("spend").is_none());
}

#[tokio::test]
async fn undroppable_verified_view_reports_lost_original() {
    let engine = customers();
    let materializer = engine.materializer();
    materializer.materialize(TOP_CUSTOMERS, keep()).await;
    let engine = engine.allow_drops(1);

    let replacement = "CREATE VIEW top_customers AS SELECT city FROM customers;";
    let result = materializer
        .materialize(replacement, keep().persist(false))
        .await;

    assert_eq!(result.outcome, MaterializationOutcome::Failed);
    let error = result.error.expect("failure carries an error message");
    assert!(error.contains("could not be dropped afterwards"));
    assert!(error.contains(TOP_CUSTOMERS));
    assert_eq!(engine.view("top_customers").as_deref(), Some(replacement));
}

#[tokio::test]
async fn undroppable_fresh_view_fails() {
    let engine = customers().allow_drops(0);

    let result = engine
        .materializer()
        .materialize(TOP_CUSTOMERS, MaterializeOptions::default())
        .await;

    assert_eq!(result.outcome, MaterializationOutcome::Failed);
    assert!(result.feedback().contains("database is locked"));
    assert!(!result
        .error
        .as_deref()
        .unwrap_or_default()
        .contains("not reinstated"));
}

#[tokio::test]
async fn name_owned_by_table_is_never_replaced() {
    let engine = customers();
    let materializer = engine.materializer();
    let definition = "CREATE VIEW customers AS SELECT 1 AS id;";

    let replaced = materializer.materialize(definition, keep()).await;
    assert_eq!(replaced.outcome, MaterializationOutcome::Failed);

    let rejected = materializer
        .materialize(definition, keep().replace_on_conflict(false))
        .await;
    assert_eq!(rejected.outcome, MaterializationOutcome::AlreadyExistsRejected);

    assert!(engine.0.lock().unwrap().tables.contains_key("customers"));
    assert!(engine.view("customers").is_none());
}

#[tokio::test]
async fn every_call_acquires_its_own_connection() {
    let engine = customers();
    let materializer = engine.materializer();

    materializer.materialize(TOP_CUSTOMERS, keep()).await;
    materializer.materialize(TOP_CUSTOMERS, keep()).await;
    materializer
        .materialize("CREATE VIEW bad AS SELECT nope FROM customers", keep())
        .await;

    assert_eq!(engine.connections(), 3);
}

#[tokio::test]
async fn materialize_all_uses_configured_defaults() {
    let engine = customers();
    let materializer = engine.materializer().with_defaults(keep());

    let results = materializer
        .materialize_all(&[
            TOP_CUSTOMERS.to_string(),
            "CREATE VIEW bad AS SELECT nope FROM customers".to_string(),
        ])
        .await;

    assert_eq!(results.len(), 2);
    assert_eq!(results[0].outcome, MaterializationOutcome::Success);
    assert_eq!(results[1].outcome, MaterializationOutcome::Failed);
    assert!(engine.view("top_customers").is_some());
}

#[tokio::test]
async fn tool_returns_feedback_per_definition() {
    let engine = customers();
    let tool = MaterializeViewTool::new(Arc::new(engine.materializer().with_defaults(keep())));

    let output = tool
        .invoke(json!({"view_definitions": [TOP_CUSTOMERS]}))
        .await
        .expect("tool should run");

    assert_eq!(tool.name(), MATERIALIZE_VIEW_TOOL);
    assert_eq!(output, json!(["View top_customers successfully defined."]));
}

#[tokio::test]
async fn tool_rejects_malformed_arguments() {
    let tool = MaterializeViewTool::new(Arc::new(customers().materializer()));

    let error = tool
        .invoke(json!({"sql": "CREATE VIEW v AS SELECT 1"}))
        .await
        .expect_err("missing view_definitions");

    assert!(matches!(error, ToolError::InvalidInput(_)));
}

#[test]
fn tool_schema_describes_view_definitions() {
    let tool = MaterializeViewTool::new(Arc::new(customers().materializer()));

    let spec = tool.spec();

    assert_eq!(spec.name, MATERIALIZE_VIEW_TOOL);
    assert!(spec.parameters["properties"]["view_definitions"].is_object());
}
