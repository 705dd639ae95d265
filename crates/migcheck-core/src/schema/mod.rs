//! Column type model and naming conventions.

pub mod naming;
pub mod types;

pub use types::{ColumnType, DefaultValue};
