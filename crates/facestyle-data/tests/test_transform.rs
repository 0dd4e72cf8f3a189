//! Integration tests for [`facestyle_data::transform`] reading real files.

use approx::assert_abs_diff_eq;
use facestyle_data::transform::{denormalize, Augment, ImageTransformer, SampleTransformer};
use image::{GrayImage, ImageBuffer, Luma, Rgb, RgbImage};
use std::collections::BTreeSet;
use tempfile::TempDir;

/// Non-square JPEG inputs are resized to the square target.
#[test]
fn jpeg_is_resized_to_square() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("face.jpg");
    RgbImage::from_fn(48, 32, |x, y| Rgb([x as u8 * 5, y as u8 * 7, 100])).save(&path).unwrap();

    let t = ImageTransformer::new(16);
    let color = t.color(&path, &Augment::NONE).unwrap();
    let gray = t.gray(&path, &Augment::NONE).unwrap();
    assert_eq!(color.shape(), &[3, 16, 16]);
    assert_eq!(gray.shape(), &[1, 16, 16]);
    assert!(color.iter().chain(gray.iter()).all(|&v| (-1.0..=1.0).contains(&v)));
}

/// A uniform image denormalizes back to its pixel value.
#[test]
fn uniform_color_round_trips() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("flat.png");
    RgbImage::from_pixel(20, 20, Rgb([0, 128, 255])).save(&path).unwrap();

    let color = ImageTransformer::new(10).color(&path, &Augment::NONE).unwrap();
    for (c, expected) in [0.0f32, 128.0 / 255.0, 1.0].into_iter().enumerate() {
        for &v in color.index_axis(ndarray::Axis(0), c).iter() {
            assert_abs_diff_eq!(denormalize(v), expected, epsilon = 1e-6);
        }
    }
}

/// Color-coded masks take the class from the first (red) channel.
#[test]
fn rgb_mask_uses_first_channel() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("mask.png");
    RgbImage::from_fn(8, 8, |x, _| if x < 4 { Rgb([3, 200, 200]) } else { Rgb([7, 0, 0]) })
        .save(&path)
        .unwrap();

    let mask = ImageTransformer::new(8).label(&path, &Augment::NONE).unwrap();
    assert_eq!(mask[[0, 0]], 3);
    assert_eq!(mask[[0, 7]], 7);
}

/// Downscaling a mask never invents classes.
#[test]
fn mask_downscale_keeps_class_set() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("seg.png");
    let src = GrayImage::from_fn(64, 48, |x, y| Luma([[0u8, 1, 4, 9, 17][((x / 9 + y / 5) % 5) as usize]]));
    src.save(&path).unwrap();
    let src_classes: BTreeSet<i64> = src.pixels().map(|p| p[0] as i64).collect();

    let mask = ImageTransformer::new(13).label(&path, &Augment::NONE).unwrap();
    assert_eq!(mask.shape(), &[13, 13]);
    let classes: BTreeSet<i64> = mask.iter().copied().collect();
    assert!(classes.is_subset(&src_classes));
}

/// 16-bit grayscale masks keep class values instead of being scaled to 8 bits.
#[test]
fn sixteen_bit_mask_keeps_classes() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("mask16.png");
    let src: ImageBuffer<Luma<u16>, Vec<u16>> = ImageBuffer::from_fn(8, 8, |x, y| Luma([((x / 2 + y / 4) % 4) as u16]));
    src.save(&path).unwrap();

    let mask = ImageTransformer::new(8).label(&path, &Augment::NONE).unwrap();
    let classes: BTreeSet<i64> = mask.iter().copied().collect();
    assert_eq!(classes, BTreeSet::from([0, 1, 2, 3]));
    assert_eq!(mask[[0, 2]], 1);
    assert_eq!(mask[[4, 6]], 0);
}

/// Grayscale follows PIL's `convert("L")`: pure red becomes 76.
#[test]
fn pure_red_gray_matches_601_luma() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("red.png");
    RgbImage::from_pixel(4, 4, Rgb([255, 0, 0])).save(&path).unwrap();

    let gray = ImageTransformer::new(4).gray(&path, &Augment::NONE).unwrap();
    for &v in gray.iter() {
        assert_eq!((denormalize(v) * 255.0).round() as u8, 76);
    }
}

/// A mirrored sample flips the mask together with the image.
#[test]
fn mirrored_mask_follows_image() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("half.png");
    GrayImage::from_fn(6, 6, |x, _| Luma([if x < 2 { 5 } else { 0 }])).save(&path).unwrap();

    let mask = ImageTransformer::new(6).label(&path, &Augment::MIRRORED).unwrap();
    assert_eq!(mask[[0, 5]], 5);
    assert_eq!(mask[[0, 0]], 0);
}
