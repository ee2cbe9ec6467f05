//! Burn Dataset integration
//!
//! Decoded images are held in memory as `RgbImage`s; conversion to
//! normalized CHW tensors happens per batch in [`ImageBatcher`]. Training
//! code augments raw items (see [`super::Augmenter`]) before batching, so
//! evaluation batches are always clean.

use burn::data::dataloader::batcher::Batcher;
use burn::data::dataset::Dataset;
use burn::prelude::*;
use image::RgbImage;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use super::DatasetConfig;

/// A single image with its 0-based class label
#[derive(Clone, Debug)]
pub struct ImageItem {
    pub image: RgbImage,
    pub label: usize,
}

/// In-memory dataset of decoded images
#[derive(Clone, Debug, Default)]
pub struct ImageDataset {
    items: Vec<ImageItem>,
}

impl ImageDataset {
    pub fn new(items: Vec<ImageItem>) -> Self {
        Self { items }
    }

    /// Keep a random subset of at most `max_samples` items
    pub fn subsample(mut self, max_samples: usize, seed: u64) -> Self {
        if max_samples < self.items.len() {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            self.items.shuffle(&mut rng);
            self.items.truncate(max_samples);
        }
        self
    }

    pub fn items(&self) -> &[ImageItem] {
        &self.items
    }

    /// Items at the given indices, in order; out-of-range indices are skipped
    pub fn items_at(&self, indices: &[usize]) -> Vec<ImageItem> {
        indices
            .iter()
            .filter_map(|&i| self.items.get(i).cloned())
            .collect()
    }

    /// Number of items per class
    pub fn class_distribution(&self, num_classes: usize) -> Vec<usize> {
        let mut counts = vec![0usize; num_classes];
        for item in &self.items {
            if let Some(count) = counts.get_mut(item.label) {
                *count += 1;
            }
        }
        counts
    }

    /// Per-channel mean and standard deviation in [0, 1] pixel units
    pub fn channel_statistics(&self) -> ([f32; 3], [f32; 3]) {
        let mut sum = [0f64; 3];
        let mut sum_sq = [0f64; 3];
        let mut count = 0f64;

        for item in &self.items {
            for pixel in item.image.pixels() {
                for c in 0..3 {
                    let v = pixel[c] as f64 / 255.0;
                    sum[c] += v;
                    sum_sq[c] += v * v;
                }
                count += 1.0;
            }
        }

        let mut mean = [0f32; 3];
        let mut std = [0f32; 3];
        if count > 0.0 {
            for c in 0..3 {
                let m = sum[c] / count;
                mean[c] = m as f32;
                std[c] = (sum_sq[c] / count - m * m).max(0.0).sqrt() as f32;
            }
        }
        (mean, std)
    }
}

impl Dataset<ImageItem> for ImageDataset {
    fn get(&self, index: usize) -> Option<ImageItem> {
        self.items.get(index).cloned()
    }

    fn len(&self) -> usize {
        self.items.len()
    }
}

/// A batch of images ready for the model
#[derive(Clone, Debug)]
pub struct ImageBatch<B: Backend> {
    /// Normalized images `[batch, 3, H, W]`
    pub images: Tensor<B, 4>,
    /// Class indices `[batch]`
    pub targets: Tensor<B, 1, Int>,
    /// One-hot targets `[batch, K]`
    pub one_hot: Tensor<B, 2>,
}

/// Converts items to tensors and applies per-channel normalization
#[derive(Clone, Debug)]
pub struct ImageBatcher {
    num_classes: usize,
    mean: [f32; 3],
    std: [f32; 3],
}

impl ImageBatcher {
    pub fn new(config: &DatasetConfig) -> Self {
        Self {
            num_classes: config.num_classes,
            mean: config.mean,
            std: config.std,
        }
    }
}

impl<B: Backend> Batcher<B, ImageItem, ImageBatch<B>> for ImageBatcher {
    fn batch(&self, items: Vec<ImageItem>, device: &B::Device) -> ImageBatch<B> {
        let batch_size = items.len();
        let (width, height) = items
            .first()
            .map(|item| item.image.dimensions())
            .unwrap_or((0, 0));
        let (width, height) = (width as usize, height as usize);
        let plane = width * height;

        // HWC bytes → CHW floats in [0, 1]
        let mut images_data = vec![0.0f32; batch_size * 3 * plane];
        for (b, item) in items.iter().enumerate() {
            let base = b * 3 * plane;
            for (x, y, pixel) in item.image.enumerate_pixels() {
                let offset = y as usize * width + x as usize;
                for c in 0..3 {
                    images_data[base + c * plane + offset] = pixel[c] as f32 / 255.0;
                }
            }
        }

        let images = Tensor::<B, 4>::from_floats(
            TensorData::new(images_data, [batch_size, 3, height, width]),
            device,
        );

        // (x - mean) / std with the dataset's own statistics
        let mean = Tensor::<B, 4>::from_floats(TensorData::new(self.mean.to_vec(), [1, 3, 1, 1]), device);
        let std = Tensor::<B, 4>::from_floats(TensorData::new(self.std.to_vec(), [1, 3, 1, 1]), device);
        let images = (images - mean) / std;

        let targets_data: Vec<i64> = items.iter().map(|item| item.label as i64).collect();
        let targets =
            Tensor::<B, 1, Int>::from_data(TensorData::new(targets_data, [batch_size]), device);

        let mut one_hot_data = vec![0.0f32; batch_size * self.num_classes];
        for (b, item) in items.iter().enumerate() {
            one_hot_data[b * self.num_classes + item.label] = 1.0;
        }
        let one_hot = Tensor::<B, 2>::from_floats(
            TensorData::new(one_hot_data, [batch_size, self.num_classes]),
            device,
        );

        ImageBatch {
            images,
            targets,
            one_hot,
        }
    }
}
