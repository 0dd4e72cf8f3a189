//! Batched iteration over a [`PairDataset`].
//!
//! [`PairLoader`] shuffles source indices once per epoch, asks the dataset for
//! each pair using its own seeded RNG stream and collates the results into a
//! [`PairBatch`] of stacked arrays.
//!
//! The iteration order and every target draw are fully determined by
//! `(seed, worker_id, epoch)`, so two loaders built with the same arguments
//! over the same dataset yield identical batches.

use ndarray::{stack, Array3, Array4, ArrayView2, ArrayView3, Axis, Dimension, RemoveAxis};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use tracing::{debug, warn};

use crate::config::DatasetConfig;
use crate::error::{DataError, DataResult};
use crate::sampler::{PairDataset, PairedExample};

// ---------------------------------------------------------------------------
// RNG streams
// ---------------------------------------------------------------------------

const GOLDEN_GAMMA: u64 = 0x9E37_79B9_7F4A_7C15;

/// SplitMix64 finalizer.
fn mix64(mut z: u64) -> u64 {
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// Independent RNG stream for loader worker `worker_id`.
///
/// Different workers sharing a `seed` get decorrelated streams; the same
/// `(seed, worker_id)` always yields the same stream.
pub fn worker_rng(seed: u64, worker_id: u64) -> StdRng {
    StdRng::seed_from_u64(mix64(seed ^ mix64(worker_id.wrapping_add(1).wrapping_mul(GOLDEN_GAMMA))))
}

fn epoch_rng(seed: u64, worker_id: u64, epoch: u64) -> StdRng {
    worker_rng(mix64(seed.wrapping_add(epoch.wrapping_mul(GOLDEN_GAMMA))), worker_id)
}

// ---------------------------------------------------------------------------
// PairBatch
// ---------------------------------------------------------------------------

/// A collated batch of pairs.
#[derive(Debug, Clone)]
pub struct PairBatch {
    /// `[B, 3, S, S]`
    pub source_color: Array4<f32>,
    /// `[B, 1, S, S]`
    pub source_gray: Array4<f32>,
    /// `[B, S, S]`
    pub source_mask: Array3<i64>,
    /// `[B, 3, S, S]`
    pub target_color: Array4<f32>,
    /// `[B, 1, S, S]`
    pub target_gray: Array4<f32>,
    /// `[B, S, S]`
    pub target_mask: Array3<i64>,
    /// `[B, 3, S, S]` mirrored targets, when the pairs carry them.
    pub target_flip_color: Option<Array4<f32>>,
    /// `[B, 1, S, S]` mirrored targets, when the pairs carry them.
    pub target_flip_gray: Option<Array4<f32>>,
    /// `[B, S, S]` mirrored targets, when the pairs carry them.
    pub target_flip_mask: Option<Array3<i64>>,
    /// Dataset index of each source sample.
    pub source_indices: Vec<usize>,
    /// Dataset index of each target sample.
    pub target_indices: Vec<usize>,
}

impl PairBatch {
    /// Stack `examples` along a new leading batch axis.
    ///
    /// # Errors
    ///
    /// [`DataError::ShapeMismatch`] when the examples disagree on any array
    /// shape, when only some of them carry a mirrored target, or when
    /// `examples` is empty.
    pub fn collate(examples: &[PairedExample]) -> DataResult<Self> {
        let first = examples.first().ok_or_else(|| DataError::shape_mismatch(vec![1], vec![0]))?;

        let source_color: Vec<ArrayView3<f32>> = examples.iter().map(|e| e.source.color.view()).collect();
        let source_gray: Vec<ArrayView3<f32>> = examples.iter().map(|e| e.source.gray.view()).collect();
        let source_mask: Vec<ArrayView2<i64>> = examples.iter().map(|e| e.source.mask.view()).collect();
        let target_color: Vec<ArrayView3<f32>> = examples.iter().map(|e| e.target.color.view()).collect();
        let target_gray: Vec<ArrayView3<f32>> = examples.iter().map(|e| e.target.gray.view()).collect();
        let target_mask: Vec<ArrayView2<i64>> = examples.iter().map(|e| e.target.mask.view()).collect();

        let flipped: Vec<_> = examples.iter().filter_map(|e| e.target_flip.as_ref()).collect();
        let (target_flip_color, target_flip_gray, target_flip_mask) = if flipped.is_empty() {
            (None, None, None)
        } else if flipped.len() == examples.len() {
            let color: Vec<ArrayView3<f32>> = flipped.iter().map(|t| t.color.view()).collect();
            let gray: Vec<ArrayView3<f32>> = flipped.iter().map(|t| t.gray.view()).collect();
            let mask: Vec<ArrayView2<i64>> = flipped.iter().map(|t| t.mask.view()).collect();
            (
                Some(stack_checked(first.source.color.shape(), &color)?),
                Some(stack_checked(first.source.gray.shape(), &gray)?),
                Some(stack_checked(first.source.mask.shape(), &mask)?),
            )
        } else {
            return Err(DataError::shape_mismatch(vec![examples.len()], vec![flipped.len()]));
        };

        Ok(PairBatch {
            source_color: stack_checked(first.source.color.shape(), &source_color)?,
            source_gray: stack_checked(first.source.gray.shape(), &source_gray)?,
            source_mask: stack_checked(first.source.mask.shape(), &source_mask)?,
            target_color: stack_checked(first.source.color.shape(), &target_color)?,
            target_gray: stack_checked(first.source.gray.shape(), &target_gray)?,
            target_mask: stack_checked(first.source.mask.shape(), &target_mask)?,
            target_flip_color,
            target_flip_gray,
            target_flip_mask,
            source_indices: examples.iter().map(|e| e.source.index).collect(),
            target_indices: examples.iter().map(|e| e.target.index).collect(),
        })
    }

    /// Number of pairs in the batch.
    pub fn len(&self) -> usize {
        self.source_indices.len()
    }

    /// Returns `true` for a batch without pairs.
    pub fn is_empty(&self) -> bool {
        self.source_indices.is_empty()
    }
}

/// Stack views after checking each against `expected`, so the error names the
/// offending shape rather than a bare `ShapeError`.
fn stack_checked<A, D>(
    expected: &[usize],
    views: &[ndarray::ArrayView<'_, A, D>],
) -> DataResult<ndarray::Array<A, D::Larger>>
where
    A: Clone,
    D: Dimension,
    D::Larger: RemoveAxis,
{
    if let Some(bad) = views.iter().find(|v| v.shape() != expected) {
        return Err(DataError::shape_mismatch(expected.to_vec(), bad.shape().to_vec()));
    }
    stack(Axis(0), views).map_err(|_| DataError::shape_mismatch(expected.to_vec(), vec![views.len()]))
}

// ---------------------------------------------------------------------------
// PairLoader
// ---------------------------------------------------------------------------

/// Batched, optionally shuffled iterator over a [`PairDataset`].
pub struct PairLoader<'a> {
    dataset: &'a dyn PairDataset,
    batch_size: usize,
    shuffle: bool,
    seed: u64,
    worker_id: u64,
}

impl<'a> PairLoader<'a> {
    /// Create a new `PairLoader`.
    ///
    /// # Parameters
    ///
    /// - `dataset`    – the underlying dataset.
    /// - `batch_size` – pairs per batch. The last batch may be smaller.
    /// - `shuffle`    – permute source indices at the start of each epoch.
    /// - `seed`       – base seed for the shuffle and the target draws.
    pub fn new(dataset: &'a dyn PairDataset, batch_size: usize, shuffle: bool, seed: u64) -> Self {
        assert!(batch_size > 0, "batch_size must be > 0");
        PairLoader { dataset, batch_size, shuffle, seed, worker_id: 0 }
    }

    /// Loader settings taken from `cfg`.
    pub fn from_config(dataset: &'a dyn PairDataset, cfg: &DatasetConfig) -> Self {
        Self::new(dataset, cfg.batch_size, cfg.shuffle, cfg.seed)
    }

    /// Select the RNG stream of worker `worker_id`.
    pub fn with_worker_id(mut self, worker_id: u64) -> Self {
        self.worker_id = worker_id;
        self
    }

    /// Number of complete (or partial) batches per epoch.
    pub fn num_batches(&self) -> usize {
        let n = self.dataset.len();
        if n == 0 {
            return 0;
        }
        (n + self.batch_size - 1) / self.batch_size
    }

    /// Iterate over epoch 0.
    pub fn iter(&self) -> PairLoaderIter<'a> {
        self.epoch(0)
    }

    /// Iterate over `epoch`. Each epoch has its own permutation and target
    /// draws.
    ///
    /// Pairs that fail to load are skipped with a `warn!` rather than
    /// aborting the iterator.
    pub fn epoch(&self, epoch: u64) -> PairLoaderIter<'a> {
        let mut rng = epoch_rng(self.seed, self.worker_id, epoch);
        let mut indices: Vec<usize> = (0..self.dataset.len()).collect();
        if self.shuffle {
            indices.shuffle(&mut rng);
        }
        debug!(
            "{}: epoch {epoch}, {} indices, batch size {}",
            self.dataset.name(),
            indices.len(),
            self.batch_size
        );
        PairLoaderIter { dataset: self.dataset, indices, batch_size: self.batch_size, cursor: 0, rng }
    }
}

/// Iterator returned by [`PairLoader::epoch`].
pub struct PairLoaderIter<'a> {
    dataset: &'a dyn PairDataset,
    indices: Vec<usize>,
    batch_size: usize,
    cursor: usize,
    rng: StdRng,
}

impl<'a> Iterator for PairLoaderIter<'a> {
    type Item = PairBatch;

    fn next(&mut self) -> Option<Self::Item> {
        while self.cursor < self.indices.len() {
            let end = (self.cursor + self.batch_size).min(self.indices.len());
            let batch_indices = &self.indices[self.cursor..end];
            self.cursor = end;

            let mut examples = Vec::with_capacity(batch_indices.len());
            for &idx in batch_indices {
                match self.dataset.get_pair(idx, &mut self.rng) {
                    Ok(pair) => examples.push(pair),
                    Err(e) => warn!("Skipping pair {idx}: {e}"),
                }
            }
            if examples.is_empty() {
                continue;
            }
            match PairBatch::collate(&examples) {
                Ok(batch) => return Some(batch),
                Err(e) => warn!("Skipping batch ending at {end}: {e}"),
            }
        }
        None
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
