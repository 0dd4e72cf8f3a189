//! Adaptive instance normalization.
//!
//! ```text
//! x [B, C, H, W] ── instance norm ──────────────┐
//!                                               ├── (1 + γ) · x̂ + β
//! s [B, style_dim] ── Linear(style_dim, 2C) ── γ | β
//! ```
//!
//! γ is the first `C` outputs of the dense layer and β the last `C`; both are
//! broadcast over the spatial dimensions.

use tch::{nn, nn::Module, Tensor};

use crate::error::{NnError, NnResult};

/// Epsilon added to the variance by [`instance_norm`].
pub const INSTANCE_NORM_EPS: f64 = 1e-5;

/// Parameterless instance normalization over `H, W` of a `[B, C, H, W]` map,
/// using the biased variance.
pub fn instance_norm(x: &Tensor) -> Tensor {
    x.instance_norm(
        None::<Tensor>,
        None::<Tensor>,
        None::<Tensor>,
        None::<Tensor>,
        true,
        0.1,
        INSTANCE_NORM_EPS,
        false,
    )
}

/// Style-conditioned normalization layer.
#[derive(Debug)]
pub struct AdaIN {
    fc: nn::Linear,
    num_features: i64,
    style_dim: i64,
}

impl AdaIN {
    /// Register a new layer under `path`.
    pub fn new(path: &nn::Path, style_dim: i64, num_features: i64) -> Self {
        Self::with_linear_config(path, style_dim, num_features, Default::default())
    }

    /// Register a layer whose dense weights and bias start at zero, so that
    /// it initially reduces to plain instance normalization.
    pub fn zeroed(path: &nn::Path, style_dim: i64, num_features: i64) -> Self {
        let cfg = nn::LinearConfig {
            ws_init: nn::Init::Const(0.0),
            bs_init: Some(nn::Init::Const(0.0)),
            bias: true,
        };
        Self::with_linear_config(path, style_dim, num_features, cfg)
    }

    fn with_linear_config(path: &nn::Path, style_dim: i64, num_features: i64, cfg: nn::LinearConfig) -> Self {
        let fc = nn::linear(path / "fc", style_dim, 2 * num_features, cfg);
        AdaIN { fc, num_features, style_dim }
    }

    /// Number of feature channels this layer modulates.
    pub fn num_features(&self) -> i64 {
        self.num_features
    }

    /// Width of the style vector.
    pub fn style_dim(&self) -> i64 {
        self.style_dim
    }

    /// Modulate `x` with the style vector `s`.
    ///
    /// # Errors
    ///
    /// [`NnError::ShapeMismatch`] if `x` is not `[B, num_features, H, W]` or
    /// `s` is not `[B, style_dim]`.
    pub fn forward(&self, x: &Tensor, s: &Tensor) -> NnResult<Tensor> {
        self.check_shapes(x, s)?;
        let h = self.fc.forward(s);
        let batch = h.size()[0];
        let h = h.view([batch, 2 * self.num_features, 1, 1]);
        let gamma = h.narrow(1, 0, self.num_features);
        let beta = h.narrow(1, self.num_features, self.num_features);
        Ok((gamma + 1.0) * instance_norm(x) + beta)
    }

    fn check_shapes(&self, x: &Tensor, s: &Tensor) -> NnResult<()> {
        let xs = x.size();
        if xs.len() != 4 || xs[1] != self.num_features {
            return Err(NnError::shape_mismatch("AdaIN feature map", vec![-1, self.num_features, -1, -1], xs));
        }
        let ss = s.size();
        if ss.len() != 2 || ss[0] != xs[0] || ss[1] != self.style_dim {
            return Err(NnError::shape_mismatch("AdaIN style vector", vec![xs[0], self.style_dim], ss));
        }
        Ok(())
    }
}
