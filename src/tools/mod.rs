//! Tool infrastructure — catalog, parameter validation, tool definitions.

pub mod catalog;
pub mod definitions;

pub use catalog::{ParamDef, ParamType, ToolCatalog, ToolEntry};
