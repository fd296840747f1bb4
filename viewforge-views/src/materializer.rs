use std::sync::Arc;

use viewforge_core::{
    parse_view_definition, parse_view_statement, SqlConnection, SqlConnector, SqlError,
};

use crate::ViewMaterializationResult;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MaterializeOptions {
    /// Drop and recreate a view that already exists under the same name.
    pub replace_on_conflict: bool,
    /// Keep the view after a successful probe.
    pub persist: bool,
}

impl Default for MaterializeOptions {
    fn default() -> Self {
        Self {
            replace_on_conflict: true,
            persist: false,
        }
    }
}

impl MaterializeOptions {
    pub fn replace_on_conflict(mut self, replace_on_conflict: bool) -> Self {
        self.replace_on_conflict = replace_on_conflict;
        self
    }

    pub fn persist(mut self, persist: bool) -> Self {
        self.persist = persist;
        self
    }
}

/// Batch materialization capability handed to the Verifier.
#[async_trait::async_trait]
pub trait MaterializeViews: Send + Sync {
    async fn materialize_all(&self, definitions: &[String]) -> Vec<ViewMaterializationResult>;
}

/// Tests view definitions against a live database. Every call acquires its
/// own connection; whatever the outcome, the database ends up either with
/// the new view (successful and persisted) or exactly as it was found.
#[derive(Clone)]
pub struct ViewMaterializer {
    connector: Arc<dyn SqlConnector>,
    defaults: MaterializeOptions,
}

impl std::fmt::Debug for ViewMaterializer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ViewMaterializer")
            .field("defaults", &self.defaults)
            .finish()
    }
}

enum Creation {
    Created,
    ExistingView(String),
    NameTaken(SqlError),
}

impl ViewMaterializer {
    pub fn new(connector: Arc<dyn SqlConnector>) -> Self {
        Self {
            connector,
            defaults: MaterializeOptions::default(),
        }
    }

    /// Options used by [`MaterializeViews::materialize_all`].
    pub fn with_defaults(mut self, defaults: MaterializeOptions) -> Self {
        self.defaults = defaults;
        self
    }

    pub fn defaults(&self) -> MaterializeOptions {
        self.defaults
    }

    pub async fn materialize(
        &self,
        definition: &str,
        options: MaterializeOptions,
    ) -> ViewMaterializationResult {
        // Only a lone CREATE VIEW statement ever reaches the database.
        let parsed = match parse_view_statement(definition) {
            Ok(parsed) => parsed,
            Err(error) => {
                let name = parse_view_definition(definition).map(|parsed| parsed.name);
                tracing::warn!(
                    view = name.as_deref().unwrap_or_default(),
                    error = %error,
                    "view definition refused before execution"
                );
                return ViewMaterializationResult::failed(name.as_deref(), error.to_string());
            }
        };
        let name = parsed.name;

        let result = match self.connector.connect().await {
            Ok(mut connection) => {
                run_protocol(connection.as_mut(), &name, definition, options).await
            }
            Err(error) => ViewMaterializationResult::failed(Some(&name), error.to_string()),
        };

        if result.is_success() {
            tracing::info!(
                view = %name,
                outcome = ?result.outcome,
                persist = options.persist,
                "view materialized"
            );
        } else {
            tracing::warn!(
                view = %name,
                outcome = ?result.outcome,
                error = result.error.as_deref().unwrap_or_default(),
                "view materialization did not succeed"
            );
        }
        result
    }
}

#[async_trait::async_trait]
impl MaterializeViews for ViewMaterializer {
    async fn materialize_all(&self, definitions: &[String]) -> Vec<ViewMaterializationResult> {
        let mut results = Vec::with_capacity(definitions.len());
        for definition in definitions {
            results.push(self.materialize(definition, self.defaults).await);
        }
        results
    }
}

async fn run_protocol(
    connection: &mut dyn SqlConnection,
    name: &str,
    definition: &str,
    options: MaterializeOptions,
) -> ViewMaterializationResult {
    // Definition of a pre-existing view dropped to make room for this one.
    let mut replaced: Option<String> = None;

    loop {
        let creation = match connection.view_definition(name).await {
            Ok(Some(existing)) => Creation::ExistingView(existing),
            Ok(None) => match connection.execute(definition).await {
                Ok(_) => Creation::Created,
                Err(error) if error.is_already_exists() => Creation::NameTaken(error),
                Err(error) => {
                    discard(connection, name).await;
                    restore(connection, name, replaced.as_deref()).await;
                    return ViewMaterializationResult::failed(Some(name), error.to_string());
                }
            },
            Err(error) => {
                restore(connection, name, replaced.as_deref()).await;
                return ViewMaterializationResult::failed(Some(name), error.to_string());
            }
        };

        match creation {
            Creation::Created => break,
            Creation::ExistingView(existing) => {
                if !options.replace_on_conflict {
                    return ViewMaterializationResult::rejected(
                        name,
                        format!("view {name} already exists"),
                    );
                }
                if replaced.is_some() {
                    return ViewMaterializationResult::failed(
                        Some(name),
                        format!("view {name} reappeared after it was dropped for replacement"),
                    );
                }
                tracing::debug!(view = %name, "view already exists; dropping it before retrying");
                if let Err(error) = connection.drop_view(name).await {
                    return ViewMaterializationResult::failed(Some(name), error.to_string());
                }
                replaced = Some(existing);
            }
            Creation::NameTaken(error) => {
                if !options.replace_on_conflict {
                    return ViewMaterializationResult::rejected(name, error.to_string());
                }
                // Another kind of object owns the name; views never replace it.
                restore(connection, name, replaced.as_deref()).await;
                return ViewMaterializationResult::failed(Some(name), error.to_string());
            }
        }
    }

    if let Err(error) = connection.probe_view(name).await {
        discard(connection, name).await;
        restore(connection, name, replaced.as_deref()).await;
        return ViewMaterializationResult::failed(Some(name), error.to_string());
    }

    if !options.persist {
        if let Err(error) = connection.drop_view(name).await {
            tracing::error!(
                view = %name,
                error = %error,
                "verified view could not be dropped; database keeps the new definition"
            );
            let mut message =
                format!("view was valid but could not be dropped afterwards: {error}");
            if let Some(original) = replaced.as_deref() {
                if !restore(connection, name, Some(original)).await {
                    message.push_str(&format!(
                        ". The replaced definition was not reinstated: {original}"
                    ));
                }
            }
            return ViewMaterializationResult::failed(Some(name), message);
        }
        restore(connection, name, replaced.as_deref()).await;
    }

    ViewMaterializationResult::success(name, replaced.is_some())
}

/// Drops a view left behind by a failed probe. Some engines keep the
/// definition even though it cannot be queried.
async fn discard(connection: &mut dyn SqlConnection, name: &str) {
    if let Err(error) = connection.drop_view(name).await {
        tracing::error!(view = %name, error = %error, "failed to drop partially created view");
    }
}

/// Reinstates the view that was dropped for replacement, if any. Returns
/// `false` only when a reinstatement was attempted and failed.
async fn restore(
    connection: &mut dyn SqlConnection,
    name: &str,
    original: Option<&str>,
) -> bool {
    let Some(original) = original else {
        return true;
    };
    match connection.execute(original).await {
        Ok(_) => true,
        Err(error) => {
            tracing::error!(view = %name, error = %error, "failed to restore replaced view");
            false
        }
    }
}
