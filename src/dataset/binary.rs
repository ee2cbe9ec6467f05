//! Decoders for the binary distributions of CIFAR-10, CIFAR-100 and STL-10
//!
//! Layouts:
//! - CIFAR-10: `[label][R 1024][G 1024][B 1024]` per record
//! - CIFAR-100: `[coarse][fine][R 1024][G 1024][B 1024]` per record, fine labels used
//! - STL-10: separate `*_X.bin` / `*_y.bin`; each 96×96 plane is stored column-major
//!   and labels are 1-based

use std::fs;
use std::path::Path;

use image::{imageops::FilterType, Rgb, RgbImage};
use indicatif::{ProgressBar, ProgressStyle};

use super::{DatasetConfig, DatasetKind, ImageItem, Split};
use crate::utils::error::{Result, ResultExt, UncertaintyError};

const CIFAR_SIDE: usize = 32;
const CIFAR_PIXELS: usize = CIFAR_SIDE * CIFAR_SIDE;
const STL10_SIDE: usize = 96;
const STL10_PIXELS: usize = STL10_SIDE * STL10_SIDE;

/// Decode CIFAR records with `label_bytes` leading label bytes; the last
/// label byte is the class
pub fn decode_cifar_records(
    bytes: &[u8],
    label_bytes: usize,
    num_classes: usize,
) -> Result<Vec<ImageItem>> {
    let record_size = label_bytes + 3 * CIFAR_PIXELS;
    if bytes.is_empty() || bytes.len() % record_size != 0 {
        return Err(UncertaintyError::Dataset(format!(
            "Invalid CIFAR file size {} (record size {})",
            bytes.len(),
            record_size
        )));
    }

    bytes
        .chunks_exact(record_size)
        .enumerate()
        .map(|(index, record)| {
            let label = record[label_bytes - 1] as usize;
            if label >= num_classes {
                return Err(UncertaintyError::Dataset(format!(
                    "Record {} has label {} outside 0..{}",
                    index, label, num_classes
                )));
            }

            let planes = &record[label_bytes..];
            let image = RgbImage::from_fn(CIFAR_SIDE as u32, CIFAR_SIDE as u32, |x, y| {
                let offset = y as usize * CIFAR_SIDE + x as usize;
                Rgb([
                    planes[offset],
                    planes[CIFAR_PIXELS + offset],
                    planes[2 * CIFAR_PIXELS + offset],
                ])
            });

            Ok(ImageItem { image, label })
        })
        .collect()
}

/// Decode STL-10 image and label files
pub fn decode_stl10(images: &[u8], labels: &[u8]) -> Result<Vec<ImageItem>> {
    let record_size = 3 * STL10_PIXELS;
    if images.len() % record_size != 0 {
        return Err(UncertaintyError::Dataset(format!(
            "Invalid STL-10 image file size {}",
            images.len()
        )));
    }
    let count = images.len() / record_size;
    if count != labels.len() {
        return Err(UncertaintyError::Dataset(format!(
            "STL-10 has {} images but {} labels",
            count,
            labels.len()
        )));
    }

    images
        .chunks_exact(record_size)
        .zip(labels)
        .enumerate()
        .map(|(index, (record, &label))| {
            if !(1..=10).contains(&label) {
                return Err(UncertaintyError::Dataset(format!(
                    "Record {} has label {} outside 1..=10",
                    index, label
                )));
            }

            // Column-major planes: pixel (x, y) lives at x * 96 + y
            let image = RgbImage::from_fn(STL10_SIDE as u32, STL10_SIDE as u32, |x, y| {
                let offset = x as usize * STL10_SIDE + y as usize;
                Rgb([
                    record[offset],
                    record[STL10_PIXELS + offset],
                    record[2 * STL10_PIXELS + offset],
                ])
            });

            Ok(ImageItem {
                image,
                label: label as usize - 1,
            })
        })
        .collect()
}

/// Files making up one split, relative to the dataset's extracted directory
pub fn split_files(kind: DatasetKind, split: Split) -> Vec<String> {
    match (kind, split) {
        (DatasetKind::Cifar10, Split::Train) => {
            (1..=5).map(|i| format!("data_batch_{}.bin", i)).collect()
        }
        (DatasetKind::Cifar10, Split::Test) => vec!["test_batch.bin".to_string()],
        (DatasetKind::Cifar100, Split::Train) => vec!["train.bin".to_string()],
        (DatasetKind::Cifar100, Split::Test) => vec!["test.bin".to_string()],
        (DatasetKind::Stl10, Split::Train) => {
            vec!["train_X.bin".to_string(), "train_y.bin".to_string()]
        }
        (DatasetKind::Stl10, Split::Test) => {
            vec!["test_X.bin".to_string(), "test_y.bin".to_string()]
        }
    }
}

fn read_file(path: &Path) -> Result<Vec<u8>> {
    if !path.exists() {
        return Err(UncertaintyError::PathNotFound(path.to_path_buf()));
    }
    fs::read(path).with_context(|| format!("Failed to read {:?}", path))
}

/// Load a split from `data_dir/<extracted dir>/` and resize to the configured
/// input resolution when it differs from the native one
pub fn load_split(config: &DatasetConfig, data_dir: &Path, split: Split) -> Result<Vec<ImageItem>> {
    let root = data_dir.join(config.kind.extracted_dir());
    let files = split_files(config.kind, split);

    let images = match config.kind {
        DatasetKind::Cifar10 | DatasetKind::Cifar100 => {
            let label_bytes = if config.kind == DatasetKind::Cifar10 { 1 } else { 2 };
            let mut images = Vec::new();
            for file in &files {
                let bytes = read_file(&root.join(file))?;
                images.extend(decode_cifar_records(&bytes, label_bytes, config.num_classes)?);
            }
            images
        }
        DatasetKind::Stl10 => {
            let pixels = read_file(&root.join(&files[0]))?;
            let labels = read_file(&root.join(&files[1]))?;
            decode_stl10(&pixels, &labels)?
        }
    };

    tracing::info!(
        "Loaded {} {:?} images from {} ({:?})",
        images.len(),
        split,
        config.kind,
        root
    );

    if config.input_resolution == config.kind.native_resolution() {
        return Ok(images);
    }
    Ok(resize_all(images, config.input_resolution as u32))
}

/// Resize every image to `size`×`size`
pub fn resize_all(images: Vec<ImageItem>, size: u32) -> Vec<ImageItem> {
    let pb = ProgressBar::new(images.len() as u64);
    if let Ok(style) = ProgressStyle::default_bar()
        .template("  {spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({per_sec})")
    {
        pb.set_style(style.progress_chars("#>-"));
    }

    let resized = images
        .into_iter()
        .map(|item| {
            pb.inc(1);
            ImageItem {
                image: image::imageops::resize(&item.image, size, size, FilterType::Triangle),
                label: item.label,
            }
        })
        .collect();

    pb.finish_and_clear();
    resized
}
