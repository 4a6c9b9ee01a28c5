//! Application error types.
//!
//! All errors use `thiserror` for automatic Error trait derivation and provide
//! clear error messages with context.

use thiserror::Error;

/// Application result type.
pub type Result<T> = std::result::Result<T, Error>;

/// JSON-RPC: invalid JSON was received.
pub const RPC_PARSE_ERROR: i64 = -32700;
/// JSON-RPC: the request object is not valid.
pub const RPC_INVALID_REQUEST: i64 = -32600;
/// JSON-RPC: the method does not exist.
pub const RPC_METHOD_NOT_FOUND: i64 = -32601;
/// JSON-RPC: invalid method parameters.
pub const RPC_INVALID_PARAMS: i64 = -32602;
/// JSON-RPC: internal error.
pub const RPC_INTERNAL_ERROR: i64 = -32603;

/// Main error enum for the research servers.
#[derive(Error, Debug)]
pub enum Error {
    /// Bad tool input. Surfaced to the caller, no side effect.
    #[error("validation error: {0}")]
    Validation(String),

    /// Record or tool not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// Record source unreadable or malformed. Degrades to an empty store.
    #[error("data source error: {0}")]
    DataSource(String),

    /// A single record failed to evaluate. Swallowed by the pipeline.
    #[error("evaluation error: {0}")]
    Evaluation(String),

    /// Timeout.
    #[error("timeout: {0}")]
    Timeout(String),

    /// Internal errors.
    #[error("internal error: {0}")]
    Internal(String),

    /// Serialization/deserialization errors.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O errors.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Map to a JSON-RPC error code.
    pub fn to_rpc_code(&self) -> i64 {
        match self {
            Error::Validation(_) | Error::NotFound(_) => RPC_INVALID_PARAMS,
            Error::Serialization(_) => RPC_PARSE_ERROR,
            Error::DataSource(_)
            | Error::Evaluation(_)
            | Error::Timeout(_)
            | Error::Internal(_)
            | Error::Io(_) => RPC_INTERNAL_ERROR,
        }
    }

    /// Stable kind label used in log lines.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Validation(_) => "validation",
            Error::NotFound(_) => "not_found",
            Error::DataSource(_) => "data_source",
            Error::Evaluation(_) => "evaluation",
            Error::Timeout(_) => "timeout",
            Error::Internal(_) => "internal",
            Error::Serialization(_) => "serialization",
            Error::Io(_) => "io",
        }
    }

    /// True for errors caused by the caller's input.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Error::Validation(_) | Error::NotFound(_))
    }
}

// Convenience constructors
impl Error {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn data_source(msg: impl Into<String>) -> Self {
        Self::DataSource(msg.into())
    }

    pub fn evaluation(msg: impl Into<String>) -> Self {
        Self::Evaluation(msg.into())
    }

    pub fn timeout(msg: impl Into<String>) -> Self {
        Self::Timeout(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}
