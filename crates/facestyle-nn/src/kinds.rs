//! Closed selector enums for block construction.
//!
//! Every selector parses from the short tag used in training configs
//! (`"bn"`, `"lrelu"`, ...) and serializes back to the same tag. Unknown tags
//! fail with [`NnError::UnsupportedSelector`].

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::NnError;

/// Negative slope of every leaky ReLU in this crate.
pub const LEAKY_RELU_SLOPE: f64 = 0.2;

/// Normalization after a convolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum NormKind {
    /// Batch normalization with running statistics.
    #[default]
    #[serde(rename = "bn")]
    Batch,
    /// Instance normalization without affine parameters.
    #[serde(rename = "in")]
    Instance,
    /// No normalization.
    #[serde(rename = "none")]
    None,
}

/// Activation after normalization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ActKind {
    /// `max(x, 0)`
    #[serde(rename = "relu")]
    Relu,
    /// Leaky ReLU with slope [`LEAKY_RELU_SLOPE`].
    #[default]
    #[serde(rename = "lrelu")]
    LeakyRelu,
    /// Hyperbolic tangent.
    #[serde(rename = "tanh")]
    Tanh,
    /// Logistic sigmoid.
    #[serde(rename = "sig")]
    Sigmoid,
    /// Identity.
    #[serde(rename = "none")]
    None,
}

/// How a convolution pads its input borders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaddingKind {
    /// Pad with zeros.
    #[default]
    Zeros,
    /// Mirror without repeating the edge.
    Reflect,
    /// Repeat the edge value.
    Replicate,
    /// Wrap around.
    Circular,
}

/// Interpolation used when a block changes spatial resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResizeMode {
    /// Bilinear with `align_corners = false`.
    #[default]
    Bilinear,
    /// Nearest neighbour.
    Nearest,
}

/// Spatial extent after scaling `len` by `scale`: `floor(len * scale)`.
pub fn scaled_extent(len: i64, scale: f64) -> i64 {
    (len as f64 * scale).floor() as i64
}

macro_rules! selector_tags {
    ($ty:ty, $kind:literal, { $($variant:path => $tag:literal),+ $(,)? }) => {
        impl $ty {
            /// The config tag of this selector.
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($variant => $tag,)+
                }
            }
        }

        impl FromStr for $ty {
            type Err = NnError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($tag => Ok($variant),)+
                    other => Err(NnError::unsupported($kind, other)),
                }
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

selector_tags!(NormKind, "normalization", {
    NormKind::Batch => "bn",
    NormKind::Instance => "in",
    NormKind::None => "none",
});

selector_tags!(ActKind, "activation", {
    ActKind::Relu => "relu",
    ActKind::LeakyRelu => "lrelu",
    ActKind::Tanh => "tanh",
    ActKind::Sigmoid => "sig",
    ActKind::None => "none",
});

selector_tags!(PaddingKind, "padding mode", {
    PaddingKind::Zeros => "zeros",
    PaddingKind::Reflect => "reflect",
    PaddingKind::Replicate => "replicate",
    PaddingKind::Circular => "circular",
});

selector_tags!(ResizeMode, "resize mode", {
    ResizeMode::Bilinear => "bilinear",
    ResizeMode::Nearest => "nearest",
});

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_known_tags() {
        assert_eq!("bn".parse::<NormKind>().unwrap(), NormKind::Batch);
        assert_eq!("in".parse::<NormKind>().unwrap(), NormKind::Instance);
        assert_eq!("none".parse::<NormKind>().unwrap(), NormKind::None);
        assert_eq!("lrelu".parse::<ActKind>().unwrap(), ActKind::LeakyRelu);
        assert_eq!("sig".parse::<ActKind>().unwrap(), ActKind::Sigmoid);
        assert_eq!("reflect".parse::<PaddingKind>().unwrap(), PaddingKind::Reflect);
        assert_eq!("nearest".parse::<ResizeMode>().unwrap(), ResizeMode::Nearest);
    }

    #[test]
    fn test_unknown_tag_names_value() {
        let err = "gn".parse::<NormKind>().unwrap_err();
        match &err {
            NnError::UnsupportedSelector { kind, value } => {
                assert_eq!(*kind, "normalization");
                assert_eq!(value, "gn");
            }
            other => panic!("unexpected error {other:?}"),
        }
        assert!(err.to_string().contains("gn"));
        assert!("gelu".parse::<ActKind>().is_err());
        assert!("Zeros".parse::<PaddingKind>().is_err());
    }

    #[test]
    fn test_display_round_trip() {
        for act in [ActKind::Relu, ActKind::LeakyRelu, ActKind::Tanh, ActKind::Sigmoid, ActKind::None] {
            assert_eq!(act.to_string().parse::<ActKind>().unwrap(), act);
        }
    }

    #[test]
    fn test_serde_uses_tags() {
        assert_eq!(serde_json::to_string(&NormKind::Instance).unwrap(), "\"in\"");
        assert_eq!(serde_json::to_string(&ActKind::Sigmoid).unwrap(), "\"sig\"");
        let pad: PaddingKind = serde_json::from_str("\"circular\"").unwrap();
        assert_eq!(pad, PaddingKind::Circular);
    }

    #[test]
    fn test_defaults() {
        assert_eq!(NormKind::default(), NormKind::Batch);
        assert_eq!(ActKind::default(), ActKind::LeakyRelu);
        assert_eq!(PaddingKind::default(), PaddingKind::Zeros);
        assert_eq!(ResizeMode::default(), ResizeMode::Bilinear);
    }

    #[test]
    fn test_scaled_extent_floors() {
        assert_eq!(scaled_extent(16, 0.5), 8);
        assert_eq!(scaled_extent(16, 2.0), 32);
        assert_eq!(scaled_extent(7, 1.5), 10);
        assert_eq!(scaled_extent(5, 1.0), 5);
        assert_eq!(scaled_extent(3, 0.3), 0);
    }
}
