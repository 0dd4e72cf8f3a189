//! Error types for the paired face-image data pipeline.
//!
//! Every module that produces an error imports its error type from here, so
//! the hierarchy stays in one place.
//!
//! ## Hierarchy
//!
//! ```text
//! DataError (top-level)
//! ├── ConfigError   (config validation / file loading)
//! └── DatasetError  (path discovery, pairing, image decoding, indexing)
//! ```

use std::path::PathBuf;
use thiserror::Error;

// ---------------------------------------------------------------------------
// DataResult
// ---------------------------------------------------------------------------

/// Convenient `Result` alias used by orchestration-level functions.
pub type DataResult<T> = Result<T, DataError>;

// ---------------------------------------------------------------------------
// DataError: top-level aggregator
// ---------------------------------------------------------------------------

/// Top-level error type for the data pipeline.
///
/// Lower-level functions in [`crate::config`], [`crate::index`] and
/// [`crate::sampler`] return their own module-specific error types which are
/// coerced into `DataError` via [`From`].
#[derive(Debug, Error)]
pub enum DataError {
    /// A configuration validation or loading error.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// A dataset loading or access error.
    #[error("Dataset error: {0}")]
    Dataset(#[from] DatasetError),

    /// A shape mismatch was detected while collating samples.
    #[error("Shape mismatch: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        /// Expected shape.
        expected: Vec<usize>,
        /// Actual shape.
        actual: Vec<usize>,
    },

    /// Converting host arrays into device tensors failed.
    #[cfg(feature = "tch-backend")]
    #[error("Tensor conversion failed: {0}")]
    Tensor(#[from] tch::TchError),
}

impl DataError {
    /// Construct a [`DataError::ShapeMismatch`].
    pub fn shape_mismatch(expected: Vec<usize>, actual: Vec<usize>) -> Self {
        DataError::ShapeMismatch { expected, actual }
    }
}

// ---------------------------------------------------------------------------
// ConfigError
// ---------------------------------------------------------------------------

/// Errors produced when loading or validating a [`DatasetConfig`].
///
/// [`DatasetConfig`]: crate::config::DatasetConfig
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A field has an invalid value.
    #[error("Invalid value for `{field}`: {reason}")]
    InvalidValue {
        /// Name of the field.
        field: &'static str,
        /// Human-readable reason.
        reason: String,
    },

    /// A configuration file could not be read from or written to disk.
    #[error("Cannot access config file `{path}`: {source}")]
    FileRead {
        /// Path that was being accessed.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A configuration file contains malformed JSON.
    #[error("Cannot parse config file `{path}`: {source}")]
    Parse {
        /// Path that was being parsed.
        path: PathBuf,
        /// Underlying JSON parse error.
        #[source]
        source: serde_json::Error,
    },
}

impl ConfigError {
    /// Construct a [`ConfigError::InvalidValue`].
    pub fn invalid_value<S: Into<String>>(field: &'static str, reason: S) -> Self {
        ConfigError::InvalidValue { field, reason: reason.into() }
    }
}

// ---------------------------------------------------------------------------
// DatasetError
// ---------------------------------------------------------------------------

/// Errors produced while indexing or loading paired samples.
///
/// A missing or undecodable file fails the request that touched it; nothing
/// is substituted silently.
#[derive(Debug, Error)]
pub enum DatasetError {
    /// A sample index is out of bounds.
    #[error("Index {idx} out of bounds (dataset has {len} samples)")]
    IndexOutOfBounds {
        /// The requested index.
        idx: usize,
        /// Number of entries in the list that was indexed.
        len: usize,
    },

    /// A glob pattern could not be compiled.
    #[error("Invalid glob pattern `{pattern}`: {source}")]
    Pattern {
        /// The offending pattern.
        pattern: String,
        /// Underlying pattern error.
        #[source]
        source: glob::PatternError,
    },

    /// A path matched by a glob could not be inspected.
    #[error("Cannot read glob match: {0}")]
    Glob(#[from] glob::GlobError),

    /// An image or label file could not be opened or decoded.
    #[error("Cannot decode image `{path}`: {source}")]
    Image {
        /// Path of the file.
        path: PathBuf,
        /// Underlying decoder error.
        #[source]
        source: image::ImageError,
    },

    /// Image and mask lists have different lengths (strict pairing only).
    #[error("Found {images} images but {masks} masks")]
    CountMismatch {
        /// Number of image paths.
        images: usize,
        /// Number of mask paths.
        masks: usize,
    },

    /// Image and mask at the same position have different file stems
    /// (strict pairing only).
    #[error("Pair {idx} is misaligned: image `{image}` vs mask `{mask}`")]
    PairingMismatch {
        /// Position in the sorted lists.
        idx: usize,
        /// Image path at that position.
        image: PathBuf,
        /// Mask path at that position.
        mask: PathBuf,
    },

    /// The dataset contains no samples, so no target can be drawn.
    #[error("Dataset is empty")]
    Empty,
}

impl DatasetError {
    /// Construct a [`DatasetError::Image`].
    pub fn image(path: impl Into<PathBuf>, source: image::ImageError) -> Self {
        DatasetError::Image { path: path.into(), source }
    }

    /// Construct a [`DatasetError::Pattern`].
    pub fn pattern<S: Into<String>>(pattern: S, source: glob::PatternError) -> Self {
        DatasetError::Pattern { pattern: pattern.into(), source }
    }
}
