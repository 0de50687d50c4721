//! Error types for revgraph-core.

use thiserror::Error;

use crate::IdSpace;

/// Errors raised while building or validating review-rating graph data.
#[derive(Debug, Error)]
pub enum Error {
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error.
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// Two structures that must agree in length do not.
    #[error("shape mismatch in {context}: expected {expected}, got {got}")]
    ShapeMismatch {
        context: &'static str,
        expected: usize,
        got: usize,
    },

    /// An ID outside `[0, len)` for its space.
    #[error("unknown {space} id {id} (valid range 0..{len})")]
    UnknownId { space: IdSpace, id: u32, len: usize },

    /// Invalid configuration or dataset parameter.
    #[error("invalid config: {0}")]
    InvalidConfig(String),
}

/// Result type alias for revgraph-core.
pub type Result<T> = std::result::Result<T, Error>;
