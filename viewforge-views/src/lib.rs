mod materializer;
mod result;
mod tool;

pub use materializer::{MaterializeOptions, MaterializeViews, ViewMaterializer};
pub use result::{MaterializationOutcome, ViewMaterializationResult};
pub use tool::{MaterializeViewArgs, MaterializeViewTool, MATERIALIZE_VIEW_TOOL};
