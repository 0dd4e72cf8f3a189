//! Convolutional and residual building blocks.
//!
//! # AdaINResBlock
//!
//! ```text
//! feat ──► AdaIN₁(s) ─► lrelu ─► conv3x3 ─► resize ─► AdaIN₂(s) ─► lrelu ─► conv3x3 ──┐
//!   │                                                                                 (+) ─► out
//!   └──────────────────────────► conv1x1 ─► resize ──────────────────────────────────┘
//! ```
//!
//! [`ResBlock`] has the same topology with parameterless instance norm in
//! place of AdaIN. All convolutions inside the residual blocks are bias-free.
//! Both branches go through the same resize, so the output is
//! `[B, out_c, floor(H·s), floor(W·s)]`.

use tch::{nn, nn::Module, nn::ModuleT, Tensor};
use tracing::debug;

use crate::adain::{instance_norm, AdaIN};
use crate::config::{AdaINResBlockConfig, ConvBlockConfig, ResBlockConfig};
use crate::error::{NnError, NnResult};
use crate::kinds::{scaled_extent, ActKind, NormKind, PaddingKind, ResizeMode, LEAKY_RELU_SLOPE};

// ---------------------------------------------------------------------------
// Functional helpers
// ---------------------------------------------------------------------------

/// Leaky ReLU with slope [`LEAKY_RELU_SLOPE`].
pub fn leaky_relu(x: &Tensor) -> Tensor {
    x.maximum(&(x * LEAKY_RELU_SLOPE))
}

/// Apply the activation selected by `act`.
pub fn activate(x: &Tensor, act: ActKind) -> Tensor {
    match act {
        ActKind::Relu => x.relu(),
        ActKind::LeakyRelu => leaky_relu(x),
        ActKind::Tanh => x.tanh(),
        ActKind::Sigmoid => x.sigmoid(),
        ActKind::None => x.shallow_clone(),
    }
}

fn interpolate(x: &Tensor, size: [i64; 2], scale: f64, mode: ResizeMode) -> Tensor {
    match mode {
        ResizeMode::Bilinear => x.upsample_bilinear2d(size, false, scale, scale),
        ResizeMode::Nearest => x.upsample_nearest2d(size, scale, scale),
    }
}

/// Rescale the spatial dimensions of `x [B, C, H, W]` by `scale`.
///
/// The output is `floor(H·scale) × floor(W·scale)`; a scale of exactly 1
/// returns the input unchanged.
///
/// # Errors
///
/// [`NnError::ShapeMismatch`] for a non-4-D input and
/// [`NnError::InvalidInput`] when an output dimension would be zero.
pub fn resize(x: &Tensor, scale: f64, mode: ResizeMode) -> NnResult<Tensor> {
    let size = x.size();
    if size.len() != 4 {
        return Err(NnError::shape_mismatch("resize input", vec![-1, -1, -1, -1], size));
    }
    if scale == 1.0 {
        return Ok(x.shallow_clone());
    }
    let out = [scaled_extent(size[2], scale), scaled_extent(size[3], scale)];
    if out[0] < 1 || out[1] < 1 {
        return Err(NnError::invalid_input(format!(
            "scaling {}x{} by {scale} gives an empty feature map",
            size[2], size[3]
        )));
    }
    Ok(interpolate(x, out, scale, mode))
}

/// Sum of the residual and skip branches, after checking their shapes agree.
fn residual_sum(context: &str, main: Tensor, skip: Tensor) -> NnResult<Tensor> {
    let (a, b) = (main.size(), skip.size());
    if a != b {
        return Err(NnError::shape_mismatch(context, a, b));
    }
    Ok(main + skip)
}

fn check_channels(context: &str, x: &Tensor, channels: i64) -> NnResult<()> {
    let size = x.size();
    if size.len() != 4 || size[1] != channels {
        return Err(NnError::shape_mismatch(context, vec![-1, channels, -1, -1], size));
    }
    Ok(())
}

fn conv2d(path: nn::Path, in_c: i64, out_c: i64, kernel: i64, stride: i64, padding: i64, bias: bool) -> nn::Conv2D {
    nn::conv2d(path, in_c, out_c, kernel, nn::ConvConfig { stride, padding, bias, ..Default::default() })
}

impl From<PaddingKind> for nn::PaddingMode {
    fn from(kind: PaddingKind) -> Self {
        match kind {
            PaddingKind::Zeros => nn::PaddingMode::Zeros,
            PaddingKind::Reflect => nn::PaddingMode::Reflect,
            PaddingKind::Replicate => nn::PaddingMode::Replicate,
            PaddingKind::Circular => nn::PaddingMode::Circular,
        }
    }
}

// ---------------------------------------------------------------------------
// ConvBlock
// ---------------------------------------------------------------------------

#[derive(Debug)]
enum Norm {
    Batch(nn::BatchNorm),
    Instance,
    None,
}

/// `[upsample] → conv → norm → activation`.
#[derive(Debug)]
pub struct ConvBlock {
    in_c: i64,
    upsample: Option<f64>,
    conv: nn::Conv2D,
    norm: Norm,
    act: ActKind,
}

impl ConvBlock {
    /// Register a block under `path`.
    pub fn new(path: &nn::Path, cfg: &ConvBlockConfig) -> NnResult<Self> {
        cfg.validate()?;
        let (upsample, stride) = if cfg.transpose { (Some(cfg.stride as f64), 1) } else { (None, cfg.stride) };
        let conv = nn::conv2d(
            path / "conv",
            cfg.in_c,
            cfg.out_c,
            cfg.kernel_size,
            nn::ConvConfig {
                stride,
                padding: cfg.padding,
                padding_mode: cfg.padding_mode.into(),
                ..Default::default()
            },
        );
        let norm = match cfg.norm {
            NormKind::Batch => Norm::Batch(nn::batch_norm2d(path / "norm", cfg.out_c, Default::default())),
            NormKind::Instance => Norm::Instance,
            NormKind::None => Norm::None,
        };
        debug!(
            "ConvBlock {}->{} k{} s{} {} {} transpose={}",
            cfg.in_c, cfg.out_c, cfg.kernel_size, cfg.stride, cfg.norm, cfg.act, cfg.transpose
        );
        Ok(ConvBlock { in_c: cfg.in_c, upsample, conv, norm, act: cfg.act })
    }

    /// Run the block on `xs [B, in_c, H, W]`.
    ///
    /// # Errors
    ///
    /// [`NnError::ShapeMismatch`] when `xs` is not 4-D or has the wrong
    /// channel count, [`NnError::InvalidInput`] when the upsampled map would
    /// be empty.
    pub fn forward(&self, xs: &Tensor, train: bool) -> NnResult<Tensor> {
        check_channels("ConvBlock input", xs, self.in_c)?;
        let x = match self.upsample {
            Some(scale) => resize(xs, scale, ResizeMode::Bilinear)?,
            None => xs.shallow_clone(),
        };
        let x = self.conv.forward(&x);
        let x = match &self.norm {
            Norm::Batch(bn) => x.apply_t(bn, train),
            Norm::Instance => instance_norm(&x),
            Norm::None => x,
        };
        Ok(activate(&x, self.act))
    }
}

/// # Panics
///
/// On any input [`ConvBlock::forward`] rejects, like the built-in `tch`
/// modules do on malformed input.
impl ModuleT for ConvBlock {
    fn forward_t(&self, xs: &Tensor, train: bool) -> Tensor {
        match self.forward(xs, train) {
            Ok(out) => out,
            Err(e) => panic!("{e}"),
        }
    }
}

// ---------------------------------------------------------------------------
// ResBlock
// ---------------------------------------------------------------------------

/// Residual block with parameterless instance normalization.
#[derive(Debug)]
pub struct ResBlock {
    conv1: nn::Conv2D,
    conv2: nn::Conv2D,
    conv1x1: nn::Conv2D,
    in_c: i64,
    scale_factor: f64,
    resize_mode: ResizeMode,
}

impl ResBlock {
    /// Register a block under `path`.
    pub fn new(path: &nn::Path, cfg: &ResBlockConfig) -> NnResult<Self> {
        cfg.validate()?;
        debug!("ResBlock {}->{} scale {}", cfg.in_c, cfg.out_c, cfg.scale_factor);
        Ok(ResBlock {
            conv1: conv2d(path / "conv1", cfg.in_c, cfg.out_c, 3, 1, 1, false),
            conv2: conv2d(path / "conv2", cfg.out_c, cfg.out_c, 3, 1, 1, false),
            conv1x1: conv2d(path / "conv1x1", cfg.in_c, cfg.out_c, 1, 1, 0, false),
            in_c: cfg.in_c,
            scale_factor: cfg.scale_factor,
            resize_mode: cfg.resize_mode,
        })
    }

    /// Forward pass.
    pub fn forward(&self, feat: &Tensor) -> NnResult<Tensor> {
        check_channels("ResBlock input", feat, self.in_c)?;

        let f1 = self.conv1.forward(&leaky_relu(&instance_norm(feat)));
        let f1 = resize(&f1, self.scale_factor, self.resize_mode)?;
        let f1 = self.conv2.forward(&leaky_relu(&instance_norm(&f1)));

        let f2 = resize(&self.conv1x1.forward(feat), self.scale_factor, self.resize_mode)?;

        residual_sum("ResBlock residual sum", f1, f2)
    }
}

// ---------------------------------------------------------------------------
// AdaINResBlock
// ---------------------------------------------------------------------------

/// Style-conditioned residual block.
#[derive(Debug)]
pub struct AdaINResBlock {
    adain1: AdaIN,
    adain2: AdaIN,
    conv1: nn::Conv2D,
    conv2: nn::Conv2D,
    conv1x1: nn::Conv2D,
    scale_factor: f64,
    resize_mode: ResizeMode,
}

impl AdaINResBlock {
    /// Register a block under `path`.
    pub fn new(path: &nn::Path, cfg: &AdaINResBlockConfig) -> NnResult<Self> {
        cfg.validate()?;
        debug!(
            "AdaINResBlock {}->{} scale {} style_dim {}",
            cfg.in_c, cfg.out_c, cfg.scale_factor, cfg.style_dim
        );
        Ok(AdaINResBlock {
            adain1: AdaIN::new(&(path / "adain1"), cfg.style_dim, cfg.in_c),
            adain2: AdaIN::new(&(path / "adain2"), cfg.style_dim, cfg.out_c),
            conv1: conv2d(path / "conv1", cfg.in_c, cfg.out_c, 3, 1, 1, false),
            conv2: conv2d(path / "conv2", cfg.out_c, cfg.out_c, 3, 1, 1, false),
            conv1x1: conv2d(path / "conv1x1", cfg.in_c, cfg.out_c, 1, 1, 0, false),
            scale_factor: cfg.scale_factor,
            resize_mode: cfg.resize_mode,
        })
    }

    /// Forward pass of `feat [B, in_c, H, W]` conditioned on `style [B, style_dim]`.
    ///
    /// # Errors
    ///
    /// [`NnError::ShapeMismatch`] for inputs of the wrong shape or if the two
    /// branches disagree before the sum; [`NnError::InvalidInput`] if the
    /// resize would produce an empty map.
    pub fn forward(&self, feat: &Tensor, style: &Tensor) -> NnResult<Tensor> {
        let f1 = self.conv1.forward(&leaky_relu(&self.adain1.forward(feat, style)?));
        let f1 = resize(&f1, self.scale_factor, self.resize_mode)?;
        let f1 = self.conv2.forward(&leaky_relu(&self.adain2.forward(&f1, style)?));

        let f2 = resize(&self.conv1x1.forward(feat), self.scale_factor, self.resize_mode)?;

        residual_sum("AdaINResBlock residual sum", f1, f2)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tch::{Device, Kind};

    #[test]
    fn test_residual_sum_rejects_mismatch() {
        let a = Tensor::zeros([1, 4, 8, 8], (Kind::Float, Device::Cpu));
        let b = Tensor::zeros([1, 4, 7, 8], (Kind::Float, Device::Cpu));
        match residual_sum("test", a, b) {
            Err(NnError::ShapeMismatch { expected, actual, .. }) => {
                assert_eq!(expected, vec![1, 4, 8, 8]);
                assert_eq!(actual, vec![1, 4, 7, 8]);
            }
            other => panic!("expected ShapeMismatch, got {other:?}"),
        }
    }

    #[test]
    fn test_leaky_relu_slope() {
        let x = Tensor::from_slice(&[-10.0f32, 0.0, 3.0]);
        let y = leaky_relu(&x);
        assert_eq!(y.double_value(&[0]), -2.0);
        assert_eq!(y.double_value(&[1]), 0.0);
        assert_eq!(y.double_value(&[2]), 3.0);
    }

    #[test]
    fn test_resize_identity_and_empty() {
        let x = Tensor::randn([1, 2, 4, 4], (Kind::Float, Device::Cpu));
        let same = resize(&x, 1.0, ResizeMode::Bilinear).unwrap();
        assert_eq!((same - &x).abs().max().double_value(&[]), 0.0);
        assert!(matches!(resize(&x, 0.1, ResizeMode::Nearest), Err(NnError::InvalidInput(_))));
    }
}
