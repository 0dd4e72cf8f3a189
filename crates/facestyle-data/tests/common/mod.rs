//! On-disk fixtures shared by the integration tests.

#![allow(dead_code)]

use facestyle_data::config::DatasetConfig;
use image::{GrayImage, Luma, Rgb, RgbImage};
use std::path::Path;
use tempfile::TempDir;

/// Write `n` uniform face images and `n` masks named `0.png .. n-1.png`.
///
/// Image `i` has red channel `i * 5 % 256`; mask `i` is filled with class `i`.
pub fn write_dataset(root: &Path, n: usize, masks: usize, side: u32) {
    let images_dir = root.join("images");
    let label_dir = root.join("label");
    std::fs::create_dir_all(&images_dir).unwrap();
    std::fs::create_dir_all(&label_dir).unwrap();
    for i in 0..n {
        RgbImage::from_pixel(side, side, Rgb([(i * 5 % 256) as u8, 64, 192]))
            .save(images_dir.join(format!("{i}.png")))
            .unwrap();
    }
    for i in 0..masks {
        GrayImage::from_pixel(side, side, Luma([i as u8]))
            .save(label_dir.join(format!("{i}.png")))
            .unwrap();
    }
}

/// Config pointing at the `images/` and `label/` folders below `root`.
pub fn config_for(root: &Path, img_size: usize) -> DatasetConfig {
    DatasetConfig {
        image_glob: format!("{}/images/*.*", root.display()),
        label_glob: format!("{}/label/*.*", root.display()),
        img_size,
        is_master: false,
        ..DatasetConfig::default()
    }
}

/// Temporary dataset of `n` matching pairs.
pub fn dataset(n: usize, side: u32, img_size: usize) -> (TempDir, DatasetConfig) {
    let tmp = TempDir::new().unwrap();
    write_dataset(tmp.path(), n, n, side);
    let cfg = config_for(tmp.path(), img_size);
    (tmp, cfg)
}
