//! Dataset configuration.
//!
//! [`DatasetConfig`] carries every knob the data pipeline reads: where the
//! images and label masks live, the resize target, how the target sample of a
//! pair is chosen, and the loader settings. It is serializable via [`serde`]
//! so it can be stored next to a training run and restored later.
//!
//! Same-identity replay, target flipping and stem validation are explicit
//! fields that default to off.
//!
//! # Example
//!
//! ```rust
//! use facestyle_data::config::{DatasetConfig, TargetPolicy};
//!
//! let cfg = DatasetConfig::default();
//! cfg.validate().expect("default config is valid");
//!
//! assert_eq!(cfg.img_size, 256);
//! assert_eq!(cfg.target_policy, TargetPolicy::Uniform);
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::ConfigError;

// ---------------------------------------------------------------------------
// Policy enums
// ---------------------------------------------------------------------------

/// How the target index of a pair is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetPolicy {
    /// Always draw the target uniformly from `[0, len)`. `same_prob` is
    /// ignored.
    #[default]
    Uniform,
    /// With probability `same_prob` reuse the source index as target,
    /// otherwise draw uniformly.
    SameIdentity,
}

/// How image and mask lists are checked against each other at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PairingCheck {
    /// Trust the sort order. Count or name mismatches are not detected.
    #[default]
    SortOrder,
    /// Require equal counts and equal file stems at every position.
    StemEquality,
}

/// Ranges for the photometric jitter applied to color and gray images.
///
/// Brightness, contrast and saturation factors are drawn uniformly from
/// `[max(0, 1 - v), 1 + v]`; the hue shift from `[-hue, hue]` turns.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColorJitterConfig {
    /// Default: **0.2**.
    pub brightness: f32,
    /// Default: **0.2**.
    pub contrast: f32,
    /// Default: **0.2**.
    pub saturation: f32,
    /// At most 0.5. Default: **0.01**.
    pub hue: f32,
}

impl Default for ColorJitterConfig {
    fn default() -> Self {
        ColorJitterConfig { brightness: 0.2, contrast: 0.2, saturation: 0.2, hue: 0.01 }
    }
}

/// Augmentations applied while building a pair. All off by default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AugmentConfig {
    /// Also return a horizontally mirrored copy of the target next to the
    /// unflipped one. Default: **false**.
    pub flip_target: bool,

    /// Probability of mirroring a sample's color, gray and mask together.
    /// Drawn independently for source and target. Default: **0.0**.
    pub hflip_prob: f64,

    /// Photometric jitter for color and gray images. Default: **none**.
    pub color_jitter: Option<ColorJitterConfig>,
}

impl Default for AugmentConfig {
    fn default() -> Self {
        AugmentConfig { flip_target: false, hflip_prob: 0.0, color_jitter: None }
    }
}

impl AugmentConfig {
    /// Returns `true` when any option draws from the RNG.
    pub fn is_random(&self) -> bool {
        self.hflip_prob > 0.0 || self.color_jitter.is_some()
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if !self.hflip_prob.is_finite() || !(0.0..=1.0).contains(&self.hflip_prob) {
            return Err(ConfigError::invalid_value(
                "augment.hflip_prob",
                format!("must be in [0.0, 1.0], got {}", self.hflip_prob),
            ));
        }
        if let Some(j) = &self.color_jitter {
            for (field, v) in [
                ("augment.color_jitter.brightness", j.brightness),
                ("augment.color_jitter.contrast", j.contrast),
                ("augment.color_jitter.saturation", j.saturation),
            ] {
                if !v.is_finite() || v < 0.0 {
                    return Err(ConfigError::invalid_value(field, format!("must be >= 0, got {v}")));
                }
            }
            if !j.hue.is_finite() || !(0.0..=0.5).contains(&j.hue) {
                return Err(ConfigError::invalid_value(
                    "augment.color_jitter.hue",
                    format!("must be in [0.0, 0.5], got {}", j.hue),
                ));
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// DatasetConfig
// ---------------------------------------------------------------------------

/// Complete configuration for the paired dataset and its loader.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatasetConfig {
    // -----------------------------------------------------------------------
    // Discovery
    // -----------------------------------------------------------------------
    /// Glob matching the face images. Default: **`data/train/images/*.*`**.
    pub image_glob: String,

    /// Glob matching the label masks. Default: **`data/train/label/*.*`**.
    pub label_glob: String,

    /// Validation applied to the two sorted path lists. Default: **sort order**.
    pub pairing_check: PairingCheck,

    // -----------------------------------------------------------------------
    // Preprocessing
    // -----------------------------------------------------------------------
    /// Side length every image and mask is resized to. Default: **256**.
    pub img_size: usize,

    /// Optional augmentations. Default: **all off**.
    pub augment: AugmentConfig,

    // -----------------------------------------------------------------------
    // Pairing
    // -----------------------------------------------------------------------
    /// Probability of reusing the source index as target.
    ///
    /// Only read when `target_policy` is [`TargetPolicy::SameIdentity`].
    /// Default: **0.2**.
    pub same_prob: f64,

    /// Target selection policy. Default: **uniform**.
    pub target_policy: TargetPolicy,

    /// Whether this process is the primary one; gates the construction log
    /// line. Default: **true**.
    pub is_master: bool,

    // -----------------------------------------------------------------------
    // Loader
    // -----------------------------------------------------------------------
    /// Pairs per batch. Default: **8**.
    pub batch_size: usize,

    /// Shuffle source indices every epoch. Default: **true**.
    pub shuffle: bool,

    /// Seed for the loader's shuffle and target draws. Default: **42**.
    pub seed: u64,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        DatasetConfig {
            image_glob: "data/train/images/*.*".to_string(),
            label_glob: "data/train/label/*.*".to_string(),
            pairing_check: PairingCheck::SortOrder,
            img_size: 256,
            augment: AugmentConfig::default(),
            same_prob: 0.2,
            target_policy: TargetPolicy::Uniform,
            is_master: true,
            batch_size: 8,
            shuffle: true,
            seed: 42,
        }
    }
}

impl DatasetConfig {
    /// Load a [`DatasetConfig`] from a JSON file at `path` and validate it.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::FileRead`] if the file cannot be opened,
    /// [`ConfigError::Parse`] if the JSON is malformed and
    /// [`ConfigError::InvalidValue`] if a field fails validation.
    pub fn from_json(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::FileRead {
            path: path.to_path_buf(),
            source,
        })?;
        let cfg: DatasetConfig = serde_json::from_str(&contents).map_err(|source| {
            ConfigError::Parse { path: path.to_path_buf(), source }
        })?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Serialize this configuration to pretty-printed JSON and write it to
    /// `path`, creating parent directories if necessary.
    pub fn to_json(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| ConfigError::FileRead {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| ConfigError::invalid_value("(serialization)", e.to_string()))?;
        std::fs::write(path, json).map_err(|source| ConfigError::FileRead {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(())
    }

    /// Validate all fields and return the first problem found.
    ///
    /// # Validated invariants
    ///
    /// - Both glob patterns are non-empty.
    /// - `img_size` is at least 1 and fits in a `u32`.
    /// - `same_prob` is finite and within `[0, 1]`.
    /// - Augmentation probabilities and jitter ranges are in range.
    /// - `batch_size` is at least 1.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.image_glob.trim().is_empty() {
            return Err(ConfigError::invalid_value("image_glob", "must not be empty"));
        }
        if self.label_glob.trim().is_empty() {
            return Err(ConfigError::invalid_value("label_glob", "must not be empty"));
        }
        if self.img_size == 0 {
            return Err(ConfigError::invalid_value("img_size", "must be > 0"));
        }
        if u32::try_from(self.img_size).is_err() {
            return Err(ConfigError::invalid_value(
                "img_size",
                format!("must be at most {}, got {}", u32::MAX, self.img_size),
            ));
        }
        if !self.same_prob.is_finite() || !(0.0..=1.0).contains(&self.same_prob) {
            return Err(ConfigError::invalid_value(
                "same_prob",
                format!("must be in [0.0, 1.0], got {}", self.same_prob),
            ));
        }
        if self.batch_size == 0 {
            return Err(ConfigError::invalid_value("batch_size", "must be > 0"));
        }
        self.augment.validate()
    }

    /// `img_size` as the pixel extent used by the image decoder.
    pub fn img_extent(&self) -> Result<u32, ConfigError> {
        u32::try_from(self.img_size).map_err(|_| {
            ConfigError::invalid_value("img_size", format!("must be at most {}, got {}", u32::MAX, self.img_size))
        })
    }

    /// Probability that the target replays the source index under the
    /// active policy. Zero unless [`TargetPolicy::SameIdentity`] is selected.
    pub fn effective_same_prob(&self) -> f64 {
        match self.target_policy {
            TargetPolicy::Uniform => 0.0,
            TargetPolicy::SameIdentity => self.same_prob,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
