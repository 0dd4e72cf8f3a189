//! Deterministic per-sample preprocessing.
//!
//! The [`SampleTransformer`] trait is the capability a sampler holds to turn
//! file paths into arrays. [`ImageTransformer`] is the implementation used for
//! training:
//!
//! ```text
//! color : open → resize (bilinear, S×S) → [flip] → [jitter] → RGB /255 → (x-0.5)/0.5 → [3, S, S] f32
//! gray  : open → resize (bilinear, S×S) → [flip] → [jitter] → luma /255 → (x-0.5)/0.5 → [1, S, S] f32
//! label : open → resize (nearest,  S×S) → [flip] → first channel as class            → [S, S]    i64
//! ```
//!
//! Luma uses the ITU-R 601 weights `0.299 R + 0.587 G + 0.114 B`, rounded the
//! same way PIL's `convert("L")` rounds. Labels are never interpolated, so
//! every value in a transformed mask already occurs in the source mask, and
//! 16-bit masks keep their full class range. The optional steps are decided
//! per sample by an [`Augment`] and run before normalization, keeping outputs
//! in `[-1, 1]`.

use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView, ImageBuffer, Pixel, Rgb, RgbImage};
use ndarray::{Array2, Array3};
use std::path::Path;

use crate::error::DatasetError;

/// Per-channel mean subtracted during normalization.
pub const NORM_MEAN: f32 = 0.5;

/// Per-channel standard deviation divided out during normalization.
pub const NORM_STD: f32 = 0.5;

/// Map a `[0, 1]` intensity to `[-1, 1]`.
#[inline]
pub fn normalize(x: f32) -> f32 {
    (x - NORM_MEAN) / NORM_STD
}

/// Inverse of [`normalize`]: map `[-1, 1]` back to `[0, 1]`.
#[inline]
pub fn denormalize(x: f32) -> f32 {
    x * NORM_STD + NORM_MEAN
}

/// Apply [`denormalize`] element-wise, e.g. to save a generated image.
pub fn denormalize_array(x: &Array3<f32>) -> Array3<f32> {
    x.mapv(denormalize)
}

/// ITU-R 601 luma of an 8-bit RGB pixel, rounded to nearest.
#[inline]
pub fn luma601(px: &Rgb<u8>) -> u8 {
    let [r, g, b] = px.0.map(u32::from);
    ((299 * r + 587 * g + 114 * b + 500) / 1000) as u8
}

fn luma601_f32(px: &Rgb<u8>) -> f32 {
    let [r, g, b] = px.0.map(f32::from);
    0.299 * r + 0.587 * g + 0.114 * b
}

// ---------------------------------------------------------------------------
// Per-sample augmentation
// ---------------------------------------------------------------------------

/// Photometric factors drawn once per sample.
///
/// `brightness`, `contrast` and `saturation` are blend factors where `1.0`
/// leaves the image unchanged; `hue` is a fraction of a full turn in
/// `[-0.5, 0.5]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Jitter {
    /// Blend factor against black.
    pub brightness: f32,
    /// Blend factor against the mean luma of the image.
    pub contrast: f32,
    /// Blend factor against the per-pixel luma.
    pub saturation: f32,
    /// Hue shift as a fraction of a turn.
    pub hue: f32,
}

impl Jitter {
    /// Jitter that changes nothing.
    pub const IDENTITY: Jitter = Jitter { brightness: 1.0, contrast: 1.0, saturation: 1.0, hue: 0.0 };

    /// Apply brightness, contrast, saturation and hue in that order.
    pub fn apply(&self, img: &mut RgbImage) {
        if self.brightness != 1.0 {
            blend_pixels(img, self.brightness, |_| 0.0);
        }
        if self.contrast != 1.0 {
            let n = (img.width() as f32 * img.height() as f32).max(1.0);
            let mean = img.pixels().map(|p| f32::from(luma601(p))).sum::<f32>() / n;
            blend_pixels(img, self.contrast, |_| mean);
        }
        if self.saturation != 1.0 {
            blend_pixels(img, self.saturation, luma601_f32);
        }
        let degrees = (self.hue * 360.0).round() as i32;
        if degrees != 0 {
            *img = image::imageops::huerotate(&*img, degrees);
        }
    }
}

/// `p ← factor·p + (1 - factor)·anchor(p)` per channel, clamped to `[0, 255]`.
fn blend_pixels(img: &mut RgbImage, factor: f32, anchor: impl Fn(&Rgb<u8>) -> f32) {
    for px in img.pixels_mut() {
        let a = anchor(&*px);
        for c in px.0.iter_mut() {
            *c = (factor * f32::from(*c) + (1.0 - factor) * a).round().clamp(0.0, 255.0) as u8;
        }
    }
}

/// Augmentation decided for one sample before it is loaded.
///
/// The flip applies to color, gray and label alike; the jitter only touches
/// color and gray.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Augment {
    /// Mirror horizontally.
    pub flip: bool,
    /// Photometric jitter, if any.
    pub jitter: Option<Jitter>,
}

impl Augment {
    /// No augmentation.
    pub const NONE: Augment = Augment { flip: false, jitter: None };

    /// Horizontal flip only.
    pub const MIRRORED: Augment = Augment { flip: true, jitter: None };
}

// ---------------------------------------------------------------------------
// SampleTransformer trait
// ---------------------------------------------------------------------------

/// Turns image and label files into training arrays.
///
/// Implementations must be `Send + Sync` so one instance can serve several
/// loader workers.
pub trait SampleTransformer: Send + Sync {
    /// Side length of every produced array.
    fn img_size(&self) -> usize;

    /// Color pipeline. Output shape `[3, S, S]`, values in `[-1, 1]`.
    fn color(&self, path: &Path, aug: &Augment) -> Result<Array3<f32>, DatasetError>;

    /// Grayscale pipeline. Output shape `[1, S, S]`, values in `[-1, 1]`.
    fn gray(&self, path: &Path, aug: &Augment) -> Result<Array3<f32>, DatasetError>;

    /// Label pipeline. Output shape `[S, S]` of class indices.
    fn label(&self, path: &Path, aug: &Augment) -> Result<Array2<i64>, DatasetError>;
}

// ---------------------------------------------------------------------------
// ImageTransformer
// ---------------------------------------------------------------------------

/// [`SampleTransformer`] backed by the `image` crate.
#[derive(Debug, Clone)]
pub struct ImageTransformer {
    size: u32,
    image_filter: FilterType,
}

impl ImageTransformer {
    /// Create a transformer resizing to `img_size × img_size`.
    pub fn new(img_size: u32) -> Self {
        ImageTransformer { size: img_size, image_filter: FilterType::Triangle }
    }

    /// Override the resampling filter used for color and gray images.
    /// Labels always use nearest-neighbour.
    pub fn with_image_filter(mut self, filter: FilterType) -> Self {
        self.image_filter = filter;
        self
    }

    fn resize(&self, img: DynamicImage, filter: FilterType, flip: bool) -> DynamicImage {
        let img = if img.width() == self.size && img.height() == self.size {
            img
        } else {
            img.resize_exact(self.size, self.size, filter)
        };
        if flip {
            img.fliph()
        } else {
            img
        }
    }

    fn prepared_rgb(&self, img: DynamicImage, aug: &Augment) -> RgbImage {
        let mut rgb = self.resize(img, self.image_filter, aug.flip).to_rgb8();
        if let Some(jitter) = &aug.jitter {
            jitter.apply(&mut rgb);
        }
        rgb
    }

    /// Color conversion of an already decoded image.
    pub fn color_from_image(&self, img: DynamicImage, aug: &Augment) -> Array3<f32> {
        let rgb = self.prepared_rgb(img, aug);
        let (w, h) = rgb.dimensions();
        Array3::from_shape_fn((3, h as usize, w as usize), |(c, y, x)| {
            normalize(rgb.get_pixel(x as u32, y as u32)[c] as f32 / 255.0)
        })
    }

    /// Grayscale conversion of an already decoded image.
    pub fn gray_from_image(&self, img: DynamicImage, aug: &Augment) -> Array3<f32> {
        let rgb = self.prepared_rgb(img, aug);
        let (w, h) = rgb.dimensions();
        Array3::from_shape_fn((1, h as usize, w as usize), |(_, y, x)| {
            normalize(luma601(rgb.get_pixel(x as u32, y as u32)) as f32 / 255.0)
        })
    }

    /// Label conversion of an already decoded mask.
    ///
    /// The class index is the first channel: the luma value for gray masks,
    /// the red value for color-coded masks. 16-bit masks are read without
    /// rescaling; any other format is converted to 8 bits first.
    pub fn label_from_image(&self, img: DynamicImage, aug: &Augment) -> Array2<i64> {
        match self.resize(img, FilterType::Nearest, aug.flip) {
            DynamicImage::ImageLuma16(buf) => first_channel(&buf),
            DynamicImage::ImageLumaA16(buf) => first_channel(&buf),
            DynamicImage::ImageRgb16(buf) => first_channel(&buf),
            DynamicImage::ImageRgba16(buf) => first_channel(&buf),
            DynamicImage::ImageLuma8(buf) => first_channel(&buf),
            gray @ DynamicImage::ImageLumaA8(_) => first_channel(&gray.to_luma8()),
            other => first_channel(&other.to_rgb8()),
        }
    }
}

fn first_channel<P>(buf: &ImageBuffer<P, Vec<P::Subpixel>>) -> Array2<i64>
where
    P: Pixel,
    P::Subpixel: Into<i64>,
{
    let (w, h) = buf.dimensions();
    Array2::from_shape_fn((h as usize, w as usize), |(y, x)| {
        buf.get_pixel(x as u32, y as u32).channels()[0].into()
    })
}

impl SampleTransformer for ImageTransformer {
    fn img_size(&self) -> usize {
        self.size as usize
    }

    fn color(&self, path: &Path, aug: &Augment) -> Result<Array3<f32>, DatasetError> {
        let img = image::open(path).map_err(|e| DatasetError::image(path, e))?;
        Ok(self.color_from_image(img, aug))
    }

    fn gray(&self, path: &Path, aug: &Augment) -> Result<Array3<f32>, DatasetError> {
        let img = image::open(path).map_err(|e| DatasetError::image(path, e))?;
        Ok(self.gray_from_image(img, aug))
    }

    fn label(&self, path: &Path, aug: &Augment) -> Result<Array2<i64>, DatasetError> {
        let img = image::open(path).map_err(|e| DatasetError::image(path, e))?;
        Ok(self.label_from_image(img, aug))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
