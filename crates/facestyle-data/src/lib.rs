//! # Paired face-image data pipeline
//!
//! This crate turns a directory of face images and their segmentation masks
//! into `(source, target)` training pairs for a style-transfer generator.
//! Each pair carries a color image, a grayscale image and a label mask for
//! both the source and the target.
//!
//! ## Architecture
//!
//! ```text
//! DatasetConfig ──► ImagePairIndex ──► PairSampler ──► PairLoader ──► PairBatch
//!                   (sorted globs)        │    ▲                         │
//!                                         │    └─ injected RNG           │ (tch-backend)
//!                                         ▼                              ▼
//!                                 SampleTransformer                 PairTensors
//!                                 (ImageTransformer)
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use facestyle_data::config::DatasetConfig;
//! use facestyle_data::loader::PairLoader;
//! use facestyle_data::sampler::PairSampler;
//!
//! let cfg = DatasetConfig::default();
//! let sampler = PairSampler::from_config(&cfg).expect("dataset on disk");
//! let loader = PairLoader::from_config(&sampler, &cfg);
//!
//! for batch in loader.iter() {
//!     println!("source color: {:?}", batch.source_color.shape());
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod index;
pub mod loader;
pub mod sampler;
pub mod transform;

#[cfg(feature = "tch-backend")]
pub mod bridge;

// Convenient re-exports at the crate root.
pub use config::{AugmentConfig, ColorJitterConfig, DatasetConfig, PairingCheck, TargetPolicy};
pub use error::{ConfigError, DataError, DataResult, DatasetError};
pub use index::ImagePairIndex;
pub use loader::{worker_rng, PairBatch, PairLoader};
pub use sampler::{PairDataset, PairSampler, PairTuple, PairedExample, Sample};
pub use transform::{Augment, ImageTransformer, Jitter, SampleTransformer};

#[cfg(feature = "tch-backend")]
pub use bridge::PairTensors;

/// Crate version string.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
