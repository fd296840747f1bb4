use std::sync::Arc;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use viewforge_core::{Tool, ToolError, Value};

use crate::{MaterializeViews, ViewMaterializationResult};

pub const MATERIALIZE_VIEW_TOOL: &str = "materialize_view_tool";

#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
pub struct MaterializeViewArgs {
    /// SQL statements, each a single `CREATE VIEW <name> AS ...` definition.
    pub view_definitions: Vec<String>,
}

/// The only way the Verifier touches the database: each requested view
/// definition goes through the materialization protocol and comes back as
/// feedback text.
#[derive(Clone)]
pub struct MaterializeViewTool {
    views: Arc<dyn MaterializeViews>,
}

impl MaterializeViewTool {
    pub fn new(views: Arc<dyn MaterializeViews>) -> Self {
        Self { views }
    }

    pub async fn run(&self, args: MaterializeViewArgs) -> Vec<ViewMaterializationResult> {
        self.views.materialize_all(&args.view_definitions).await
    }
}

impl std::fmt::Debug for MaterializeViewTool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MaterializeViewTool").finish_non_exhaustive()
    }
}

#[async_trait::async_trait]
impl Tool for MaterializeViewTool {
    fn name(&self) -> &str {
        MATERIALIZE_VIEW_TOOL
    }

    fn description(&self) -> &str {
        "Materializes database views defined in SQL and reports, for each definition, whether the view could be created and queried."
    }

    fn schema(&self) -> Value {
        serde_json::to_value(schemars::schema_for!(MaterializeViewArgs))
            .unwrap_or_else(|_| serde_json::json!({"type": "object"}))
    }

    async fn invoke(&self, args: Value) -> Result<Value, ToolError> {
        let args: MaterializeViewArgs = serde_json::from_value(args)
            .map_err(|error| ToolError::InvalidInput(error.to_string()))?;
        let feedback: Vec<String> = self
            .run(args)
            .await
            .iter()
            .map(ViewMaterializationResult::feedback)
            .collect();
        Ok(serde_json::to_value(feedback)?)
    }
}
