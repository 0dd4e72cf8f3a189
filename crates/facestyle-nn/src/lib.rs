//! # Face style-transfer network blocks
//!
//! Building blocks for a style-conditioned image-to-image generator:
//!
//! - **AdaIN**: instance normalization modulated by a style vector
//! - **AdaINResBlock**: residual block conditioned through two AdaIN layers,
//!   with an optional in-block resize
//! - **ResBlock**: the same topology with plain instance normalization
//! - **ConvBlock**: `[upsample] → conv → norm → activation`, configured by
//!   the short tags used in training recipes (`"bn"`, `"lrelu"`, ...)
//!
//! The selector enums and block configurations are always available; the
//! tensor code requires the `tch-backend` feature.
//!
//! ## Example
//!
//! ```rust,ignore
//! use facestyle_nn::{AdaINResBlock, AdaINResBlockConfig};
//! use tch::{nn, Device, Kind, Tensor};
//!
//! let vs = nn::VarStore::new(Device::Cpu);
//! let cfg = AdaINResBlockConfig::new(256, 128).with_scale_factor(2.0);
//! let block = AdaINResBlock::new(&(vs.root() / "dec1"), &cfg)?;
//!
//! let feat = Tensor::randn([4, 256, 16, 16], (Kind::Float, Device::Cpu));
//! let style = Tensor::randn([4, 512], (Kind::Float, Device::Cpu));
//! let out = block.forward(&feat, &style)?; // [4, 128, 32, 32]
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod config;
pub mod error;
pub mod kinds;

#[cfg(feature = "tch-backend")]
pub mod adain;
#[cfg(feature = "tch-backend")]
pub mod blocks;

// Re-exports for convenience
pub use config::{AdaINResBlockConfig, ConvBlockConfig, ResBlockConfig, DEFAULT_STYLE_DIM};
pub use error::{NnError, NnResult};
pub use kinds::{ActKind, NormKind, PaddingKind, ResizeMode, LEAKY_RELU_SLOPE};

#[cfg(feature = "tch-backend")]
pub use adain::{instance_norm, AdaIN};
#[cfg(feature = "tch-backend")]
pub use blocks::{resize, AdaINResBlock, ConvBlock, ResBlock};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::config::{AdaINResBlockConfig, ConvBlockConfig, ResBlockConfig};
    pub use crate::error::{NnError, NnResult};
    pub use crate::kinds::{ActKind, NormKind, PaddingKind, ResizeMode};

    #[cfg(feature = "tch-backend")]
    pub use crate::adain::AdaIN;
    #[cfg(feature = "tch-backend")]
    pub use crate::blocks::{AdaINResBlock, ConvBlock, ResBlock};
}

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
