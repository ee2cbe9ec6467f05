//! Training-time augmentation for small natural images
//!
//! The standard CIFAR/STL recipe: random horizontal flip followed by a
//! random crop from a zero-padded copy of the image. Evaluation batches are
//! never augmented.
//!
//! All randomness comes from a caller-provided `ChaCha8Rng`, so a run is
//! reproducible from its seed.

use image::{imageops, RgbImage};
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use super::burn_dataset::ImageItem;

/// Configuration for data augmentation
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AugmentationConfig {
    /// Probability of applying horizontal flip (0.0 - 1.0)
    pub horizontal_flip_prob: f32,
    /// Zero padding added on every side before the random crop (0 = disabled)
    pub crop_padding: u32,
}

impl Default for AugmentationConfig {
    fn default() -> Self {
        Self {
            horizontal_flip_prob: 0.5,
            crop_padding: 4,
        }
    }
}

/// Image augmenter that applies random transformations
#[derive(Clone, Debug)]
pub struct Augmenter {
    config: AugmentationConfig,
}

impl Augmenter {
    pub fn new(config: AugmentationConfig) -> Self {
        Self { config }
    }

    /// Apply the configured augmentations to one image
    pub fn augment(&self, img: &RgbImage, rng: &mut ChaCha8Rng) -> RgbImage {
        let mut result = if rng.gen::<f32>() < self.config.horizontal_flip_prob {
            imageops::flip_horizontal(img)
        } else {
            img.clone()
        };

        if self.config.crop_padding > 0 {
            result = self.random_crop(&result, rng);
        }

        result
    }

    /// Augment every item of a batch, keeping labels
    pub fn augment_items(&self, items: Vec<ImageItem>, rng: &mut ChaCha8Rng) -> Vec<ImageItem> {
        items
            .into_iter()
            .map(|item| ImageItem {
                image: self.augment(&item.image, rng),
                label: item.label,
            })
            .collect()
    }

    /// Pad with zeros and crop back to the original size at a random offset
    fn random_crop(&self, img: &RgbImage, rng: &mut ChaCha8Rng) -> RgbImage {
        let pad = self.config.crop_padding;
        let (width, height) = img.dimensions();

        let mut padded = RgbImage::new(width + 2 * pad, height + 2 * pad);
        imageops::replace(&mut padded, img, pad as i64, pad as i64);

        let dx = rng.gen_range(0..=2 * pad);
        let dy = rng.gen_range(0..=2 * pad);
        imageops::crop_imm(&padded, dx, dy, width, height).to_image()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;
    use rand::SeedableRng;

    fn gradient(size: u32) -> RgbImage {
        RgbImage::from_fn(size, size, |x, y| Rgb([(x * 8) as u8, (y * 8) as u8, 100]))
    }

    #[test]
    fn test_disabled_is_identity() {
        let augmenter = Augmenter::new(AugmentationConfig {
            horizontal_flip_prob: 0.0,
            crop_padding: 0,
        });
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let img = gradient(16);

        assert_eq!(augmenter.augment(&img, &mut rng), img);
    }

    #[test]
    fn test_flip_always() {
        let augmenter = Augmenter::new(AugmentationConfig {
            horizontal_flip_prob: 1.0,
            crop_padding: 0,
        });
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let img = gradient(16);
        let flipped = augmenter.augment(&img, &mut rng);

        assert_eq!(flipped.get_pixel(0, 3), img.get_pixel(15, 3));
    }

    #[test]
    fn test_crop_keeps_dimensions() {
        let augmenter = Augmenter::new(AugmentationConfig::default());
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let img = gradient(32);

        for _ in 0..10 {
            assert_eq!(augmenter.augment(&img, &mut rng).dimensions(), (32, 32));
        }
    }

    #[test]
    fn test_same_seed_same_result() {
        let augmenter = Augmenter::new(AugmentationConfig::default());
        let img = gradient(32);

        let mut rng_a = ChaCha8Rng::seed_from_u64(42);
        let mut rng_b = ChaCha8Rng::seed_from_u64(42);
        assert_eq!(
            augmenter.augment(&img, &mut rng_a),
            augmenter.augment(&img, &mut rng_b)
        );
    }
}
