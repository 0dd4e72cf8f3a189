//! Sorted, position-aligned index of face images and their label masks.
//!
//! Both lists are discovered with glob patterns and sorted independently by
//! path. Image `i` and mask `i` are assumed to describe the same sample; this
//! is a naming convention, not something the default check verifies. Select
//! [`PairingCheck::StemEquality`] to enforce it at construction.
//!
//! # Directory layout
//!
//! ```text
//! <root>/
//!   images/
//!     000001.jpg
//!     000002.jpg
//!   label/
//!     000001.png
//!     000002.png
//! ```

use std::path::{Path, PathBuf};
use tracing::debug;

use crate::config::{DatasetConfig, PairingCheck};
use crate::error::DatasetError;

/// Position-aligned image and mask paths.
#[derive(Debug, Clone)]
pub struct ImagePairIndex {
    images: Vec<PathBuf>,
    masks: Vec<PathBuf>,
}

impl ImagePairIndex {
    /// Expand both glob patterns, keep regular files and sort each list.
    ///
    /// # Errors
    ///
    /// Returns [`DatasetError::Pattern`] for a malformed pattern,
    /// [`DatasetError::Glob`] when a match cannot be inspected, and the
    /// pairing errors of [`ImagePairIndex::from_paths`] under a strict check.
    pub fn discover(
        image_glob: &str,
        label_glob: &str,
        check: PairingCheck,
    ) -> Result<Self, DatasetError> {
        let images = collect_files(image_glob)?;
        let masks = collect_files(label_glob)?;
        debug!(
            "glob `{image_glob}` matched {} images, `{label_glob}` matched {} masks",
            images.len(),
            masks.len()
        );
        Self::from_paths(images, masks, check)
    }

    /// Build the index from the globs and pairing check in `cfg`.
    pub fn from_config(cfg: &DatasetConfig) -> Result<Self, DatasetError> {
        Self::discover(&cfg.image_glob, &cfg.label_glob, cfg.pairing_check)
    }

    /// Build the index from explicit path lists. Both lists are sorted.
    ///
    /// # Errors
    ///
    /// Under [`PairingCheck::StemEquality`] returns
    /// [`DatasetError::CountMismatch`] or [`DatasetError::PairingMismatch`].
    pub fn from_paths(
        mut images: Vec<PathBuf>,
        mut masks: Vec<PathBuf>,
        check: PairingCheck,
    ) -> Result<Self, DatasetError> {
        sort_paths(&mut images);
        sort_paths(&mut masks);
        let index = ImagePairIndex { images, masks };
        if check == PairingCheck::StemEquality {
            index.verify_stems()?;
        }
        Ok(index)
    }

    /// Number of samples, defined as the number of images.
    pub fn len(&self) -> usize {
        self.images.len()
    }

    /// Returns `true` when no images were found.
    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    /// Number of masks found. May differ from [`len`](Self::len) under the
    /// default sort-order check.
    pub fn mask_count(&self) -> usize {
        self.masks.len()
    }

    /// Image path at position `idx`.
    pub fn image_path(&self, idx: usize) -> Result<&Path, DatasetError> {
        self.images
            .get(idx)
            .map(PathBuf::as_path)
            .ok_or(DatasetError::IndexOutOfBounds { idx, len: self.images.len() })
    }

    /// Mask path at position `idx`.
    ///
    /// Fails when the mask list is shorter than the image list and `idx`
    /// falls past its end.
    pub fn mask_path(&self, idx: usize) -> Result<&Path, DatasetError> {
        self.masks
            .get(idx)
            .map(PathBuf::as_path)
            .ok_or(DatasetError::IndexOutOfBounds { idx, len: self.masks.len() })
    }

    /// All image paths in index order.
    pub fn images(&self) -> &[PathBuf] {
        &self.images
    }

    /// All mask paths in index order.
    pub fn masks(&self) -> &[PathBuf] {
        &self.masks
    }

    /// Check equal counts and equal file stems at every position.
    pub fn verify_stems(&self) -> Result<(), DatasetError> {
        if self.images.len() != self.masks.len() {
            return Err(DatasetError::CountMismatch {
                images: self.images.len(),
                masks: self.masks.len(),
            });
        }
        for (idx, (image, mask)) in self.images.iter().zip(&self.masks).enumerate() {
            if image.file_stem() != mask.file_stem() {
                return Err(DatasetError::PairingMismatch {
                    idx,
                    image: image.clone(),
                    mask: mask.clone(),
                });
            }
        }
        Ok(())
    }
}

/// Expand `pattern` and keep regular files.
fn collect_files(pattern: &str) -> Result<Vec<PathBuf>, DatasetError> {
    let mut files = Vec::new();
    for entry in glob::glob(pattern).map_err(|e| DatasetError::pattern(pattern, e))? {
        let path = entry?;
        if path.is_file() {
            files.push(path);
        }
    }
    Ok(files)
}

/// Sort by the raw path string, so `10.png` sorts before `2.png`.
fn sort_paths(paths: &mut [PathBuf]) {
    paths.sort_by(|a, b| a.as_os_str().cmp(b.as_os_str()));
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
