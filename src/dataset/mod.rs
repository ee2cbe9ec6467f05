//! Dataset module for CIFAR-10, CIFAR-100 and STL-10
//!
//! This module provides:
//! - Per-dataset configuration (classes, resolution, normalization statistics)
//! - Decoding of the official binary distributions
//! - Download and extraction of the archives on first use
//! - Burn `Dataset` / `Batcher` integration and optional augmentation

pub mod augmentation;
pub mod binary;
pub mod burn_dataset;
pub mod download;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::utils::error::{Result, UncertaintyError};

pub use augmentation::{AugmentationConfig, Augmenter};
pub use binary::load_split;
pub use burn_dataset::{ImageBatch, ImageBatcher, ImageDataset, ImageItem};
pub use download::ensure_dataset;

/// Supported datasets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum DatasetKind {
    Cifar10,
    Cifar100,
    Stl10,
}

impl DatasetKind {
    pub fn num_classes(&self) -> usize {
        match self {
            DatasetKind::Cifar10 | DatasetKind::Stl10 => 10,
            DatasetKind::Cifar100 => 100,
        }
    }

    /// Side length of the images as stored on disk
    pub fn native_resolution(&self) -> usize {
        match self {
            DatasetKind::Cifar10 | DatasetKind::Cifar100 => 32,
            DatasetKind::Stl10 => 96,
        }
    }

    /// Per-channel mean of the training set, in [0, 1] pixel units
    pub fn default_mean(&self) -> [f32; 3] {
        match self {
            DatasetKind::Cifar10 => [0.4914, 0.4822, 0.4465],
            DatasetKind::Cifar100 => [0.5071, 0.4865, 0.4409],
            DatasetKind::Stl10 => [0.4467, 0.4398, 0.4066],
        }
    }

    /// Per-channel standard deviation of the training set
    pub fn default_std(&self) -> [f32; 3] {
        match self {
            DatasetKind::Cifar10 => [0.2470, 0.2435, 0.2616],
            DatasetKind::Cifar100 => [0.2673, 0.2564, 0.2762],
            DatasetKind::Stl10 => [0.2603, 0.2566, 0.2713],
        }
    }

    /// Directory created by extracting the archive
    pub fn extracted_dir(&self) -> &'static str {
        match self {
            DatasetKind::Cifar10 => "cifar-10-batches-bin",
            DatasetKind::Cifar100 => "cifar-100-binary",
            DatasetKind::Stl10 => "stl10_binary",
        }
    }

    pub fn archive_url(&self) -> &'static str {
        match self {
            DatasetKind::Cifar10 => "https://www.cs.toronto.edu/~kriz/cifar-10-binary.tar.gz",
            DatasetKind::Cifar100 => "https://www.cs.toronto.edu/~kriz/cifar-100-binary.tar.gz",
            DatasetKind::Stl10 => "http://ai.stanford.edu/~acoates/stl10/stl10_binary.tar.gz",
        }
    }

    /// Short identifier used in file names
    pub fn slug(&self) -> &'static str {
        match self {
            DatasetKind::Cifar10 => "cifar10",
            DatasetKind::Cifar100 => "cifar100",
            DatasetKind::Stl10 => "stl10",
        }
    }

    pub fn class_names(&self) -> &'static [&'static str] {
        match self {
            DatasetKind::Cifar10 => &CIFAR10_CLASSES,
            DatasetKind::Cifar100 => &CIFAR100_CLASSES,
            DatasetKind::Stl10 => &STL10_CLASSES,
        }
    }

    pub fn class_name(&self, label: usize) -> Option<&'static str> {
        self.class_names().get(label).copied()
    }
}

impl fmt::Display for DatasetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DatasetKind::Cifar10 => "CIFAR-10",
            DatasetKind::Cifar100 => "CIFAR-100",
            DatasetKind::Stl10 => "STL-10",
        };
        write!(f, "{}", name)
    }
}

/// Train or test portion of a dataset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Split {
    Train,
    Test,
}

/// Everything that differs between datasets
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetConfig {
    pub kind: DatasetKind,
    pub num_classes: usize,
    /// Side length images are resized to before batching
    pub input_resolution: usize,
    pub mean: [f32; 3],
    pub std: [f32; 3],
}

impl DatasetConfig {
    /// Defaults for a dataset: native resolution and its own statistics
    pub fn for_kind(kind: DatasetKind) -> Self {
        Self {
            kind,
            num_classes: kind.num_classes(),
            input_resolution: kind.native_resolution(),
            mean: kind.default_mean(),
            std: kind.default_std(),
        }
    }

    /// Override the resolution images are resized to
    pub fn with_resolution(mut self, resolution: usize) -> Self {
        self.input_resolution = resolution;
        self
    }

    /// Override the normalization statistics
    pub fn with_normalization(mut self, mean: [f32; 3], std: [f32; 3]) -> Self {
        self.mean = mean;
        self.std = std;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.num_classes != self.kind.num_classes() {
            return Err(UncertaintyError::Config(format!(
                "{} has {} classes, config says {}",
                self.kind,
                self.kind.num_classes(),
                self.num_classes
            )));
        }
        if self.input_resolution < 8 {
            return Err(UncertaintyError::Config(format!(
                "input_resolution must be at least 8, got {}",
                self.input_resolution
            )));
        }
        if self.std.iter().any(|&s| s <= 0.0) {
            return Err(UncertaintyError::Config(
                "normalization std must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

pub const CIFAR10_CLASSES: [&str; 10] = [
    "airplane",
    "automobile",
    "bird",
    "cat",
    "deer",
    "dog",
    "frog",
    "horse",
    "ship",
    "truck",
];

pub const STL10_CLASSES: [&str; 10] = [
    "airplane", "bird", "car", "cat", "deer", "dog", "horse", "monkey", "ship", "truck",
];

pub const CIFAR100_CLASSES: [&str; 100] = [
    "apple", "aquarium_fish", "baby", "bear", "beaver", "bed", "bee", "beetle", "bicycle",
    "bottle", "bowl", "boy", "bridge", "bus", "butterfly", "camel", "can", "castle",
    "caterpillar", "cattle", "chair", "chimpanzee", "clock", "cloud", "cockroach", "couch",
    "crab", "crocodile", "cup", "dinosaur", "dolphin", "elephant", "flatfish", "forest", "fox",
    "girl", "hamster", "house", "kangaroo", "keyboard", "lamp", "lawn_mower", "leopard", "lion",
    "lizard", "lobster", "man", "maple_tree", "motorcycle", "mountain", "mouse", "mushroom",
    "oak_tree", "orange", "orchid", "otter", "palm_tree", "pear", "pickup_truck", "pine_tree",
    "plain", "plate", "poppy", "porcupine", "possum", "rabbit", "raccoon", "ray", "road",
    "rocket", "rose", "sea", "seal", "shark", "shrew", "skunk", "skyscraper", "snail", "snake",
    "spider", "squirrel", "streetcar", "sunflower", "sweet_pepper", "table", "tank",
    "telephone", "television", "tiger", "tractor", "train", "trout", "tulip", "turtle",
    "wardrobe", "whale", "willow_tree", "wolf", "woman", "worm",
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dataset_defaults() {
        let stl = DatasetConfig::for_kind(DatasetKind::Stl10);
        assert_eq!(stl.num_classes, 10);
        assert_eq!(stl.input_resolution, 96);
        assert!(stl.validate().is_ok());

        let cifar100 = DatasetConfig::for_kind(DatasetKind::Cifar100);
        assert_eq!(cifar100.num_classes, 100);
        assert_eq!(cifar100.input_resolution, 32);
    }

    #[test]
    fn test_class_names() {
        assert_eq!(DatasetKind::Cifar10.class_name(0), Some("airplane"));
        assert_eq!(DatasetKind::Cifar10.class_name(9), Some("truck"));
        assert_eq!(DatasetKind::Cifar100.class_names().len(), 100);
        assert_eq!(DatasetKind::Cifar100.class_name(99), Some("worm"));
        assert_eq!(DatasetKind::Stl10.class_name(7), Some("monkey"));
        assert_eq!(DatasetKind::Stl10.class_name(10), None);
    }

    #[test]
    fn test_validate_rejects_inconsistent_config() {
        let mut config = DatasetConfig::for_kind(DatasetKind::Cifar10);
        config.num_classes = 100;
        assert!(config.validate().is_err());

        let config = DatasetConfig::for_kind(DatasetKind::Cifar10)
            .with_normalization([0.5; 3], [0.0, 0.5, 0.5]);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_serde_uses_kebab_case() {
        let json = serde_json::to_string(&DatasetKind::Cifar100).unwrap();
        assert_eq!(json, "\"cifar100\"");
    }
}
