mod error;
mod graph;
mod sampler;
mod source;

pub use error::SchemaError;
pub use graph::{ForeignKeyLink, SchemaGraph, TableNode};
pub use sampler::{SampledSubschema, SchemaSampler};
pub use source::{ColumnInfo, ForeignKey, SchemaSource, SchemaWording};
