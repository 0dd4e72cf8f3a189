//! Error types for the network building blocks.

use thiserror::Error;

/// Result type alias for block construction and forward passes.
pub type NnResult<T> = Result<T, NnError>;

/// Network block errors.
#[derive(Error, Debug)]
pub enum NnError {
    /// A norm, activation, padding or resize tag is not recognised.
    #[error("Unsupported {kind}: `{value}`")]
    UnsupportedSelector {
        /// Which selector was being parsed (`"normalization"`, `"activation"`, ...).
        kind: &'static str,
        /// The rejected tag.
        value: String,
    },

    /// A block configuration failed validation.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Two tensors that must agree in shape do not.
    #[error("Shape mismatch in {context}: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        /// Where the check failed.
        context: String,
        /// Expected shape (`-1` marks an unconstrained dimension).
        expected: Vec<i64>,
        /// Actual shape.
        actual: Vec<i64>,
    },

    /// An input tensor is valid in shape but cannot be processed, e.g. a
    /// resize that would produce an empty feature map.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Error raised by libtorch.
    #[cfg(feature = "tch-backend")]
    #[error("Tensor operation error: {0}")]
    Tensor(#[from] tch::TchError),
}

impl NnError {
    /// Create an unsupported selector error
    pub fn unsupported<S: Into<String>>(kind: &'static str, value: S) -> Self {
        NnError::UnsupportedSelector { kind, value: value.into() }
    }

    /// Create a configuration error
    pub fn config<S: Into<String>>(msg: S) -> Self {
        NnError::InvalidConfig(msg.into())
    }

    /// Create a shape mismatch error
    pub fn shape_mismatch<S: Into<String>>(context: S, expected: Vec<i64>, actual: Vec<i64>) -> Self {
        NnError::ShapeMismatch { context: context.into(), expected, actual }
    }

    /// Create an invalid input error
    pub fn invalid_input<S: Into<String>>(msg: S) -> Self {
        NnError::InvalidInput(msg.into())
    }
}
