//! Error types for sgd-eval.

use thiserror::Error;

/// Result type for sgd-eval operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for sgd-eval operations.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// Per-example slot counts differ within one batch.
    ///
    /// Joint accuracy multiplies the scores of one turn's slots together,
    /// which needs a fixed number of slots per turn.
    #[error("{kind} slot counts differ across the batch: {counts:?}")]
    InconsistentSlotCount {
        /// Which slot family ("categorical" or "non-categorical").
        kind: &'static str,
        /// The per-example counts as found in the batch.
        counts: Vec<usize>,
    },

    /// A required tensor was not present in the tensor map.
    #[error("Missing tensor: {0}")]
    MissingTensor(String),

    /// A tensor did not have the expected shape.
    #[error("Shape mismatch for {name}: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        /// Tensor name.
        name: String,
        /// Expected shape (`usize::MAX` marks a free dimension).
        expected: Vec<usize>,
        /// Actual shape.
        actual: Vec<usize>,
    },

    /// Invalid input provided.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Create an invalid input error.
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Error::InvalidInput(msg.into())
    }

    /// Create a missing tensor error.
    pub fn missing_tensor(name: impl Into<String>) -> Self {
        Error::MissingTensor(name.into())
    }

    /// Create a shape mismatch error.
    pub fn shape_mismatch(name: impl Into<String>, expected: &[usize], actual: &[usize]) -> Self {
        Error::ShapeMismatch {
            name: name.into(),
            expected: expected.to_vec(),
            actual: actual.to_vec(),
        }
    }
}
