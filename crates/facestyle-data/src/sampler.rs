//! Source/target pairing over an [`ImagePairIndex`].
//!
//! For a requested index the sampler builds the *source* sample from that
//! index and a *target* sample from a second index drawn from an injected
//! random source. Under the default [`TargetPolicy::Uniform`] the target is
//! always an independent uniform draw over `[0, len)`; it may coincide with
//! the source.
//!
//! Optional augmentation (random mirroring, color jitter) is drawn from the
//! same RNG, per sample, only when enabled in [`AugmentConfig`]. With
//! `flip_target` set, a mirrored copy of the target is returned alongside it.
//!
//! # Example
//!
//! ```rust,no_run
//! use facestyle_data::config::DatasetConfig;
//! use facestyle_data::sampler::PairSampler;
//! use rand::SeedableRng;
//!
//! let cfg = DatasetConfig::default();
//! let sampler = PairSampler::from_config(&cfg).expect("dataset on disk");
//! let mut rng = rand::rngs::StdRng::seed_from_u64(cfg.seed);
//!
//! let pair = sampler.get(0, &mut rng).unwrap();
//! let (src_color, src_gray, src_mask, tgt_color, tgt_gray, tgt_mask) = pair.into_tuple();
//! assert_eq!(src_color.shape(), &[3, cfg.img_size, cfg.img_size]);
//! ```

use ndarray::{s, Array2, Array3};
use rand::{Rng, RngCore};
use tracing::{debug, info};

use crate::config::{AugmentConfig, ColorJitterConfig, DatasetConfig, TargetPolicy};
use crate::error::{DataError, DatasetError};
use crate::index::ImagePairIndex;
use crate::transform::{Augment, ImageTransformer, Jitter, SampleTransformer};

// ---------------------------------------------------------------------------
// Sample / PairedExample
// ---------------------------------------------------------------------------

/// Color, grayscale and label arrays of one dataset entry.
#[derive(Debug, Clone)]
pub struct Sample {
    /// Dataset index this sample was built from.
    pub index: usize,
    /// `[3, S, S]`, values in `[-1, 1]`.
    pub color: Array3<f32>,
    /// `[1, S, S]`, values in `[-1, 1]`.
    pub gray: Array3<f32>,
    /// `[S, S]` class indices.
    pub mask: Array2<i64>,
}

impl Sample {
    /// Copy with every array mirrored along the width axis.
    pub fn mirrored(&self) -> Sample {
        Sample {
            index: self.index,
            color: self.color.slice(s![.., .., ..;-1]).to_owned(),
            gray: self.gray.slice(s![.., .., ..;-1]).to_owned(),
            mask: self.mask.slice(s![.., ..;-1]).to_owned(),
        }
    }
}

/// The six arrays of a pair in training order:
/// source color, source gray, source mask, target color, target gray, target mask.
pub type PairTuple = (
    Array3<f32>,
    Array3<f32>,
    Array2<i64>,
    Array3<f32>,
    Array3<f32>,
    Array2<i64>,
);

/// A source sample and its randomly chosen target.
#[derive(Debug, Clone)]
pub struct PairedExample {
    /// Sample built from the requested index.
    pub source: Sample,
    /// Sample built from the drawn target index.
    pub target: Sample,
    /// Mirrored copy of `target`, present when `flip_target` is enabled.
    pub target_flip: Option<Sample>,
}

impl PairedExample {
    /// Split into the six arrays consumed by the training step. The mirrored
    /// target, if any, is dropped.
    pub fn into_tuple(self) -> PairTuple {
        (
            self.source.color,
            self.source.gray,
            self.source.mask,
            self.target.color,
            self.target.gray,
            self.target.mask,
        )
    }
}

// ---------------------------------------------------------------------------
// PairDataset trait
// ---------------------------------------------------------------------------

/// Common interface for paired datasets.
///
/// Implementations must be `Send + Sync` so they can be shared across
/// data-loading threads. Randomness is always supplied by the caller, so each
/// worker can own an independent stream.
pub trait PairDataset: Send + Sync {
    /// Total number of source indices.
    fn len(&self) -> usize;

    /// Build the pair for source index `idx`, drawing the target from `rng`.
    ///
    /// # Errors
    ///
    /// Returns [`DatasetError::IndexOutOfBounds`] when `idx >= self.len()` and
    /// I/O or decoding errors for the files involved.
    fn get_pair(&self, idx: usize, rng: &mut dyn RngCore) -> Result<PairedExample, DatasetError>;

    /// Returns `true` when the dataset contains no samples.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Human-readable name for logging.
    fn name(&self) -> &str;
}

// ---------------------------------------------------------------------------
// PairSampler
// ---------------------------------------------------------------------------

/// Produces [`PairedExample`]s from an index and a [`SampleTransformer`].
pub struct PairSampler<T = ImageTransformer> {
    index: ImagePairIndex,
    transformer: T,
    policy: TargetPolicy,
    same_prob: f64,
    augment: AugmentConfig,
}

impl PairSampler<ImageTransformer> {
    /// Validate `cfg`, discover the files and build a sampler with the default
    /// [`ImageTransformer`].
    pub fn from_config(cfg: &DatasetConfig) -> Result<Self, DataError> {
        cfg.validate()?;
        let index = ImagePairIndex::from_config(cfg)?;
        Ok(Self::new(index, ImageTransformer::new(cfg.img_extent()?), cfg))
    }
}

impl<T: SampleTransformer> PairSampler<T> {
    /// Assemble a sampler from its parts. Pairing options come from `cfg`.
    pub fn new(index: ImagePairIndex, transformer: T, cfg: &DatasetConfig) -> Self {
        if cfg.is_master {
            info!("Dataset of {} images constructed for the training.", index.len());
        }
        PairSampler {
            index,
            transformer,
            policy: cfg.target_policy,
            same_prob: cfg.same_prob,
            augment: cfg.augment.clone(),
        }
    }

    /// Number of source indices (the image count).
    pub fn len(&self) -> usize {
        self.index.len()
    }

    /// Returns `true` when the index holds no images.
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// The underlying path index.
    pub fn index(&self) -> &ImagePairIndex {
        &self.index
    }

    /// The transformer used for every sample.
    pub fn transformer(&self) -> &T {
        &self.transformer
    }

    /// Load and transform the sample at `idx`.
    pub fn sample(&self, idx: usize, aug: &Augment) -> Result<Sample, DatasetError> {
        let image_path = self.index.image_path(idx)?;
        let mask_path = self.index.mask_path(idx)?;
        debug!("loading sample {idx}: {} / {}", image_path.display(), mask_path.display());
        Ok(Sample {
            index: idx,
            color: self.transformer.color(image_path, aug)?,
            gray: self.transformer.gray(image_path, aug)?,
            mask: self.transformer.label(mask_path, aug)?,
        })
    }

    /// Decide the augmentation of one sample.
    ///
    /// Consumes nothing from `rng` while every random augmentation is off.
    pub fn draw_augment<R: Rng + ?Sized>(&self, rng: &mut R) -> Augment {
        let flip = self.augment.hflip_prob > 0.0 && rng.gen::<f64>() < self.augment.hflip_prob;
        let jitter = self.augment.color_jitter.as_ref().map(|cfg| draw_jitter(cfg, rng));
        Augment { flip, jitter }
    }

    /// Choose the target index for source `idx`.
    ///
    /// Under [`TargetPolicy::Uniform`] this consumes exactly one uniform draw.
    /// Under [`TargetPolicy::SameIdentity`] it first draws a probability and
    /// returns `idx` when it falls below `same_prob`.
    pub fn draw_target_index<R: Rng + ?Sized>(
        &self,
        idx: usize,
        rng: &mut R,
    ) -> Result<usize, DatasetError> {
        let len = self.len();
        if len == 0 {
            return Err(DatasetError::Empty);
        }
        if self.policy == TargetPolicy::SameIdentity && rng.gen::<f64>() < self.same_prob {
            return Ok(idx);
        }
        Ok(rng.gen_range(0..len))
    }

    /// Build the pair for source index `idx`.
    ///
    /// # Errors
    ///
    /// [`DatasetError::IndexOutOfBounds`] when `idx >= len()`, plus any
    /// path or decoding error from either sample.
    pub fn get<R: Rng + ?Sized>(&self, idx: usize, rng: &mut R) -> Result<PairedExample, DatasetError> {
        let len = self.len();
        if idx >= len {
            return Err(DatasetError::IndexOutOfBounds { idx, len });
        }
        let source_aug = self.draw_augment(rng);
        let source = self.sample(idx, &source_aug)?;
        let target_idx = self.draw_target_index(idx, rng)?;
        let target_aug = self.draw_augment(rng);
        let target = self.sample(target_idx, &target_aug)?;
        let target_flip = self.augment.flip_target.then(|| target.mirrored());
        Ok(PairedExample { source, target, target_flip })
    }
}

fn draw_factor<R: Rng + ?Sized>(rng: &mut R, spread: f32) -> f32 {
    if spread > 0.0 {
        rng.gen_range((1.0 - spread).max(0.0)..=1.0 + spread)
    } else {
        1.0
    }
}

fn draw_jitter<R: Rng + ?Sized>(cfg: &ColorJitterConfig, rng: &mut R) -> Jitter {
    Jitter {
        brightness: draw_factor(rng, cfg.brightness),
        contrast: draw_factor(rng, cfg.contrast),
        saturation: draw_factor(rng, cfg.saturation),
        hue: if cfg.hue > 0.0 { rng.gen_range(-cfg.hue..=cfg.hue) } else { 0.0 },
    }
}

impl<T: SampleTransformer> PairDataset for PairSampler<T> {
    fn len(&self) -> usize {
        self.index.len()
    }

    fn get_pair(&self, idx: usize, rng: &mut dyn RngCore) -> Result<PairedExample, DatasetError> {
        self.get(idx, rng)
    }

    fn name(&self) -> &str {
        "PairSampler"
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PairingCheck;
    use ndarray::Array;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::path::{Path, PathBuf};

    /// Encodes the file stem into every value, so tests can tell which file a
    /// sample came from without touching the disk.
    struct StemTransformer;

    fn stem_value(path: &Path) -> i64 {
        path.file_stem().and_then(|s| s.to_str()).and_then(|s| s.parse().ok()).unwrap_or(-1)
    }

    impl SampleTransformer for StemTransformer {
        fn img_size(&self) -> usize {
            2
        }
        fn color(&self, path: &Path, _aug: &Augment) -> Result<Array3<f32>, DatasetError> {
            Ok(Array::from_elem((3, 2, 2), stem_value(path) as f32))
        }
        fn gray(&self, path: &Path, _aug: &Augment) -> Result<Array3<f32>, DatasetError> {
            Ok(Array::from_elem((1, 2, 2), stem_value(path) as f32))
        }
        fn label(&self, path: &Path, _aug: &Augment) -> Result<Array2<i64>, DatasetError> {
            Ok(Array::from_elem((2, 2), stem_value(path)))
        }
    }

    fn sampler(n: usize, cfg: &DatasetConfig) -> PairSampler<StemTransformer> {
        let images = (0..n).map(|i| PathBuf::from(format!("img/{i}.png"))).collect();
        let masks = (0..n).map(|i| PathBuf::from(format!("lbl/{i}.png"))).collect();
        let index = ImagePairIndex::from_paths(images, masks, PairingCheck::StemEquality).unwrap();
        PairSampler::new(index, StemTransformer, cfg)
    }

    #[test]
    fn source_comes_from_requested_index() {
        let s = sampler(4, &DatasetConfig::default());
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..20 {
            let pair = s.get(2, &mut rng).unwrap();
            assert_eq!(pair.source.index, 2);
            assert_eq!(pair.source.mask[[0, 0]], 2);
            assert_eq!(pair.target.mask[[0, 0]], pair.target.index as i64);
        }
    }

    #[test]
    fn out_of_range_index_fails() {
        let s = sampler(4, &DatasetConfig::default());
        let mut rng = StdRng::seed_from_u64(0);
        assert!(matches!(s.get(4, &mut rng), Err(DatasetError::IndexOutOfBounds { idx: 4, len: 4 })));
    }

    #[test]
    fn empty_dataset_cannot_draw() {
        let s = sampler(0, &DatasetConfig::default());
        let mut rng = StdRng::seed_from_u64(0);
        assert!(matches!(s.draw_target_index(0, &mut rng), Err(DatasetError::Empty)));
    }

    #[test]
    fn same_prob_is_inert_by_default() {
        let mut cfg = DatasetConfig::default();
        cfg.same_prob = 1.0;
        let s = sampler(50, &cfg);
        let mut rng = StdRng::seed_from_u64(3);
        let replays = (0..200).filter(|_| s.draw_target_index(10, &mut rng).unwrap() == 10).count();
        assert!(replays < 50, "uniform policy replayed the source {replays} times");
    }

    #[test]
    fn same_identity_policy_replays_source() {
        let mut cfg = DatasetConfig::default();
        cfg.same_prob = 1.0;
        cfg.target_policy = TargetPolicy::SameIdentity;
        let s = sampler(50, &cfg);
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..100 {
            assert_eq!(s.draw_target_index(10, &mut rng).unwrap(), 10);
        }
    }

    #[test]
    fn tuple_order_is_source_then_target() {
        let s = sampler(3, &DatasetConfig::default());
        let mut rng = StdRng::seed_from_u64(11);
        let pair = s.get(1, &mut rng).unwrap();
        let target_idx = pair.target.index as f32;
        let (sc, sg, sm, tc, tg, tm) = pair.into_tuple();
        assert_eq!(sc[[0, 0, 0]], 1.0);
        assert_eq!(sg[[0, 0, 0]], 1.0);
        assert_eq!(sm[[0, 0]], 1);
        assert_eq!(tc[[0, 0, 0]], target_idx);
        assert_eq!(tg[[0, 0, 0]], target_idx);
        assert_eq!(tm[[0, 0]], target_idx as i64);
    }

    #[test]
    fn default_augment_draws_nothing() {
        let s = sampler(8, &DatasetConfig::default());
        let mut a = StdRng::seed_from_u64(5);
        let mut b = StdRng::seed_from_u64(5);
        assert_eq!(s.draw_augment(&mut a), Augment::NONE);
        assert_eq!(a.gen::<u64>(), b.gen::<u64>());
    }

    #[test]
    fn hflip_probability_bounds() {
        let mut cfg = DatasetConfig::default();
        cfg.augment.hflip_prob = 1.0;
        let always = sampler(2, &cfg);
        let mut rng = StdRng::seed_from_u64(9);
        assert!((0..50).all(|_| always.draw_augment(&mut rng).flip));

        cfg.augment.hflip_prob = 0.5;
        let half = sampler(2, &cfg);
        let flips = (0..2000).filter(|_| half.draw_augment(&mut rng).flip).count();
        assert!((800..=1200).contains(&flips), "{flips} flips out of 2000");
    }

    #[test]
    fn jitter_factors_stay_in_range() {
        let mut cfg = DatasetConfig::default();
        cfg.augment.color_jitter = Some(ColorJitterConfig::default());
        let s = sampler(2, &cfg);
        let mut rng = StdRng::seed_from_u64(13);
        for _ in 0..500 {
            let j = s.draw_augment(&mut rng).jitter.unwrap();
            for f in [j.brightness, j.contrast, j.saturation] {
                assert!((0.8..=1.2).contains(&f), "factor {f}");
            }
            assert!((-0.01..=0.01).contains(&j.hue), "hue {}", j.hue);
        }
    }

    #[test]
    fn target_flip_is_an_extra_output() {
        let mut cfg = DatasetConfig::default();
        let mut rng = StdRng::seed_from_u64(4);
        assert!(sampler(3, &cfg).get(0, &mut rng).unwrap().target_flip.is_none());

        cfg.augment.flip_target = true;
        let pair = sampler(3, &cfg).get(0, &mut rng).unwrap();
        let flipped = pair.target_flip.expect("mirrored target");
        assert_eq!(flipped.index, pair.target.index);
        assert_eq!(flipped.mask, pair.target.mask);
    }

    #[test]
    fn mirrored_reverses_columns() {
        let sample = Sample {
            index: 0,
            color: Array3::from_shape_fn((3, 2, 3), |(c, y, x)| (c * 100 + y * 10 + x) as f32),
            gray: Array3::from_shape_fn((1, 2, 3), |(_, y, x)| (y * 10 + x) as f32),
            mask: Array2::from_shape_fn((2, 3), |(y, x)| (y * 10 + x) as i64),
        };
        let m = sample.mirrored();
        assert_eq!(m.color[[2, 1, 0]], 212.0);
        assert_eq!(m.gray[[0, 0, 2]], 0.0);
        assert_eq!(m.mask[[1, 0]], 12);
        assert_eq!(m.mirrored().mask, sample.mask);
    }
}
