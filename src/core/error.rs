//! Errors surfaced by the connectivity memory and the learning algorithms.
//!
//! Two classes of failure reach the caller: configuration errors, reported before any compute
//! cycle runs, and contract violations (out-of-range indices, computing before initialization,
//! wrongly sized or empty inputs). Capacity limits on segments and synapses are never errors,
//! they are resolved by eviction inside the temporal memory.

use thiserror::Error;

/// Error type for all fallible HTM operations.
#[derive(Debug, Error)]
pub enum HtmError {
    /// A configuration parameter is missing, out of range or inconsistent with another one.
    #[error("Invalid parameter '{name}': {message}")]
    InvalidConfig {
        name: &'static str,
        message: String,
    },

    /// An input or output buffer does not match the configured dimensions.
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// A column, cell, segment or input index lies outside the configured space.
    #[error("{kind} index {index} out of bounds (size: {size})")]
    IndexOutOfBounds {
        kind: &'static str,
        index: usize,
        size: usize,
    },

    /// A compute call was made before the connectivity memory was initialized.
    #[error("Connections have not been initialized")]
    NotInitialized,

    /// Columns and cells can only be created once, before learning starts.
    #[error("Connections are already initialized")]
    AlreadyInitialized,

    /// A compute call received no input at all.
    #[error("Empty input")]
    EmptyInput,

    /// A configuration document could not be parsed.
    #[error("Config parse error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result alias using [`HtmError`].
pub type Result<T> = std::result::Result<T, HtmError>;

impl HtmError {
    pub(crate) fn config(name: &'static str, message: impl Into<String>) -> Self {
        HtmError::InvalidConfig {
            name,
            message: message.into(),
        }
    }

    pub(crate) fn out_of_bounds(kind: &'static str, index: usize, size: usize) -> Self {
        HtmError::IndexOutOfBounds { kind, index, size }
    }
}
