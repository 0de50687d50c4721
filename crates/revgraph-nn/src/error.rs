//! Error types for revgraph-nn.

use revgraph_core::IdSpace;
use thiserror::Error;

use crate::Mode;

/// revgraph-nn error type.
#[derive(Debug, Error)]
pub enum Error {
    /// Candle tensor error.
    #[error("tensor error: {0}")]
    Tensor(#[from] candle_core::Error),

    /// Dataset or graph error that is neither a shape nor an ID problem.
    #[error("data error: {0}")]
    Data(revgraph_core::Error),

    /// Lengths that must agree do not (batch columns, history rows, ...).
    #[error("shape mismatch in {context}: expected {expected}, got {got}")]
    ShapeMismatch {
        context: &'static str,
        expected: usize,
        got: usize,
    },

    /// ID outside its embedding table.
    #[error("unknown {space} id {id} (valid range 0..{len})")]
    UnknownId { space: IdSpace, id: u32, len: usize },

    /// Batch too small for the requested mode.
    ///
    /// Empty batches are always rejected. In training mode a batch of one
    /// is rejected too: batch normalization rescales the running variance
    /// by `n / (n - 1)`.
    #[error("degenerate batch of size {size} in {mode:?} mode (training needs at least 2)")]
    DegenerateBatch { size: usize, mode: Mode },

    /// Operation not allowed in the current mode.
    #[error("{op} requires {required:?} mode, model is in {mode:?} mode")]
    WrongMode {
        op: &'static str,
        required: Mode,
        mode: Mode,
    },

    /// Invalid configuration.
    #[error("invalid config: {0}")]
    InvalidConfig(String),

    /// Training error.
    #[error("training error: {0}")]
    Training(String),
}

impl From<revgraph_core::Error> for Error {
    fn from(err: revgraph_core::Error) -> Self {
        use revgraph_core::Error as Core;
        match err {
            Core::ShapeMismatch {
                context,
                expected,
                got,
            } => Error::ShapeMismatch {
                context,
                expected,
                got,
            },
            Core::UnknownId { space, id, len } => Error::UnknownId { space, id, len },
            Core::InvalidConfig(msg) => Error::InvalidConfig(msg),
            other => Error::Data(other),
        }
    }
}

/// Result type alias.
pub type Result<T> = std::result::Result<T, Error>;
