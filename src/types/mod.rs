//! Core types for the research servers.
//!
//! This module provides foundational types used throughout the system:
//! - **IDs**: Validated record ids and per-invocation ids
//! - **Errors**: Application error types with thiserror derives
//! - **Config**: Configuration structures for server, records and evaluation

mod config;
mod errors;
mod ids;

pub use config::{
    resolve_cupcake_records_path, Config, FunderConfig, ObservabilityConfig, ResearchConfig,
    ServerConfig, CUPCAKE_RECORDS_ENV, DEFAULT_RECORDS_FILE, ENV_PREFIX,
};
pub use errors::{
    Error, Result, RPC_INTERNAL_ERROR, RPC_INVALID_PARAMS, RPC_INVALID_REQUEST,
    RPC_METHOD_NOT_FOUND, RPC_PARSE_ERROR,
};
pub use ids::{InvocationId, RecordId};
