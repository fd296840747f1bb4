use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MaterializationOutcome {
    Success,
    /// A view with the same name existed and was dropped before recreating it.
    AlreadyExistsReplaced,
    /// A view with the same name existed and replacing it was not allowed.
    AlreadyExistsRejected,
    Failed,
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct ViewMaterializationResult {
    /// `None` when no view name could be parsed from the definition.
    pub view_name: Option<String>,
    pub outcome: MaterializationOutcome,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ViewMaterializationResult {
    pub fn success(view_name: &str, replaced: bool) -> Self {
        Self {
            view_name: Some(view_name.to_string()),
            outcome: if replaced {
                MaterializationOutcome::AlreadyExistsReplaced
            } else {
                MaterializationOutcome::Success
            },
            error: None,
        }
    }

    pub fn rejected(view_name: &str, reason: impl Into<String>) -> Self {
        Self {
            view_name: Some(view_name.to_string()),
            outcome: MaterializationOutcome::AlreadyExistsRejected,
            error: Some(reason.into()),
        }
    }

    pub fn failed(view_name: Option<&str>, error: impl Into<String>) -> Self {
        Self {
            view_name: view_name.map(str::to_string),
            outcome: MaterializationOutcome::Failed,
            error: Some(error.into()),
        }
    }

    /// True for both `Success` and `AlreadyExistsReplaced`.
    pub fn is_success(&self) -> bool {
        matches!(
            self.outcome,
            MaterializationOutcome::Success | MaterializationOutcome::AlreadyExistsReplaced
        )
    }

    /// Feedback text handed back to the agents.
    pub fn feedback(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for ViewMaterializationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = self.view_name.as_deref().unwrap_or("<unnamed>");
        match self.outcome {
            MaterializationOutcome::Success => write!(f, "View {name} successfully defined."),
            MaterializationOutcome::AlreadyExistsReplaced => write!(
                f,
                "View {name} successfully defined. The previous definition was replaced."
            ),
            MaterializationOutcome::AlreadyExistsRejected => {
                write!(f, "Error in creating view {name}. View already exists.")
            }
            MaterializationOutcome::Failed => match (&self.view_name, &self.error) {
                (None, Some(error)) => write!(f, "Error in creating view. {error}"),
                (_, Some(error)) => {
                    write!(f, "Error in creating view {name}. Error received:\n{error}.")
                }
                (_, None) => write!(f, "Error in creating view {name}."),
            },
        }
    }
}
