//! Construction parameters for the network blocks.

use serde::{Deserialize, Serialize};

use crate::error::{NnError, NnResult};
use crate::kinds::{ActKind, NormKind, PaddingKind, ResizeMode};

/// Default style vector width.
pub const DEFAULT_STYLE_DIM: i64 = 512;

fn default_scale_factor() -> f64 {
    1.0
}

fn default_style_dim() -> i64 {
    DEFAULT_STYLE_DIM
}

fn check_channels(in_c: i64, out_c: i64) -> NnResult<()> {
    if in_c <= 0 || out_c <= 0 {
        return Err(NnError::config(format!("channel counts must be positive, got {in_c} -> {out_c}")));
    }
    Ok(())
}

fn check_scale(scale_factor: f64) -> NnResult<()> {
    if !scale_factor.is_finite() || scale_factor <= 0.0 {
        return Err(NnError::config(format!("scale_factor must be finite and > 0, got {scale_factor}")));
    }
    Ok(())
}

/// Configuration for a [`ResBlock`](crate::blocks::ResBlock).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResBlockConfig {
    /// Input channels
    pub in_c: i64,
    /// Output channels
    pub out_c: i64,
    /// Spatial scale applied inside the block; 1 keeps the resolution
    #[serde(default = "default_scale_factor")]
    pub scale_factor: f64,
    /// Interpolation used by the resize
    #[serde(default)]
    pub resize_mode: ResizeMode,
}

impl ResBlockConfig {
    /// Create a configuration with scale 1 and bilinear resize
    pub fn new(in_c: i64, out_c: i64) -> Self {
        Self { in_c, out_c, scale_factor: default_scale_factor(), resize_mode: ResizeMode::default() }
    }

    /// Set the spatial scale factor
    pub fn with_scale_factor(mut self, scale_factor: f64) -> Self {
        self.scale_factor = scale_factor;
        self
    }

    /// Validate configuration
    pub fn validate(&self) -> NnResult<()> {
        check_channels(self.in_c, self.out_c)?;
        check_scale(self.scale_factor)
    }
}

/// Configuration for an [`AdaINResBlock`](crate::blocks::AdaINResBlock).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdaINResBlockConfig {
    /// Input channels
    pub in_c: i64,
    /// Output channels
    pub out_c: i64,
    /// Spatial scale applied inside the block; 1 keeps the resolution
    #[serde(default = "default_scale_factor")]
    pub scale_factor: f64,
    /// Width of the style vector
    #[serde(default = "default_style_dim")]
    pub style_dim: i64,
    /// Interpolation used by the resize
    #[serde(default)]
    pub resize_mode: ResizeMode,
}

impl AdaINResBlockConfig {
    /// Create a configuration with scale 1, style width 512 and bilinear resize
    pub fn new(in_c: i64, out_c: i64) -> Self {
        Self {
            in_c,
            out_c,
            scale_factor: default_scale_factor(),
            style_dim: default_style_dim(),
            resize_mode: ResizeMode::default(),
        }
    }

    /// Set the spatial scale factor
    pub fn with_scale_factor(mut self, scale_factor: f64) -> Self {
        self.scale_factor = scale_factor;
        self
    }

    /// Set the style vector width
    pub fn with_style_dim(mut self, style_dim: i64) -> Self {
        self.style_dim = style_dim;
        self
    }

    /// Validate configuration
    pub fn validate(&self) -> NnResult<()> {
        check_channels(self.in_c, self.out_c)?;
        check_scale(self.scale_factor)?;
        if self.style_dim <= 0 {
            return Err(NnError::config("style_dim must be positive"));
        }
        Ok(())
    }
}

/// Configuration for a [`ConvBlock`](crate::blocks::ConvBlock).
///
/// With `transpose` set, the input is first upsampled by `stride` and the
/// convolution runs with stride 1.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConvBlockConfig {
    /// Input channels
    pub in_c: i64,
    /// Output channels
    pub out_c: i64,
    /// Convolution kernel size
    #[serde(default = "default_kernel_size")]
    pub kernel_size: i64,
    /// Convolution stride, or upsampling factor when `transpose` is set
    #[serde(default = "default_stride")]
    pub stride: i64,
    /// Convolution padding
    #[serde(default = "default_padding")]
    pub padding: i64,
    /// Border handling of the convolution
    #[serde(default)]
    pub padding_mode: PaddingKind,
    /// Normalization after the convolution
    #[serde(default)]
    pub norm: NormKind,
    /// Activation after the normalization
    #[serde(default)]
    pub act: ActKind,
    /// Upsample instead of striding
    #[serde(default)]
    pub transpose: bool,
}

fn default_kernel_size() -> i64 {
    3
}

fn default_stride() -> i64 {
    2
}

fn default_padding() -> i64 {
    1
}

impl ConvBlockConfig {
    /// Create a configuration with the default kernel, stride, padding, norm
    /// and activation
    pub fn new(in_c: i64, out_c: i64) -> Self {
        Self {
            in_c,
            out_c,
            kernel_size: default_kernel_size(),
            stride: default_stride(),
            padding: default_padding(),
            padding_mode: PaddingKind::default(),
            norm: NormKind::default(),
            act: ActKind::default(),
            transpose: false,
        }
    }

    /// Build from string selectors as they appear in training recipes.
    pub fn from_tags(in_c: i64, out_c: i64, norm: &str, act: &str) -> NnResult<Self> {
        Ok(Self { norm: norm.parse()?, act: act.parse()?, ..Self::new(in_c, out_c) })
    }

    /// Validate configuration
    pub fn validate(&self) -> NnResult<()> {
        check_channels(self.in_c, self.out_c)?;
        if self.kernel_size <= 0 {
            return Err(NnError::config("kernel_size must be positive"));
        }
        if self.stride <= 0 {
            return Err(NnError::config("stride must be positive"));
        }
        if self.padding < 0 {
            return Err(NnError::config("padding must be non-negative"));
        }
        Ok(())
    }
}
