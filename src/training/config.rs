//! Experiment Configuration
//!
//! JSON-serializable configuration for a complete run: dataset selection,
//! optimisation hyperparameters, model size and the settings of each
//! uncertainty method. Every field has a default, so a JSON file only needs
//! to name what it overrides; CLI flags are applied on top of the file.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::dataset::{DatasetConfig, DatasetKind};
use crate::model::CnnConfig;
use crate::uncertainty::{EvidentialLossConfig, KlNormalizer, DEFAULT_EPSILON};
use crate::utils::error::{Result, UncertaintyError};

pub const DEFAULT_EPOCHS: usize = 10;
pub const DEFAULT_BATCH_SIZE: usize = 64;
pub const DEFAULT_LEARNING_RATE: f64 = 1e-3;
pub const DEFAULT_SEED: u64 = 42;
pub const DEFAULT_ENSEMBLE_MEMBERS: usize = 5;

/// Uncertainty method of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Method {
    Edl,
    Ensemble,
    ConfidNet,
}

impl Method {
    /// Short identifier used in file names
    pub fn slug(&self) -> &'static str {
        match self {
            Method::Edl => "edl",
            Method::Ensemble => "ensemble",
            Method::ConfidNet => "confidnet",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Method::Edl => "Evidential Deep Learning",
            Method::Ensemble => "Deep Ensemble",
            Method::ConfidNet => "ConfidNet",
        };
        write!(f, "{}", name)
    }
}

/// Optimisation hyperparameters shared by all methods
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    /// Number of training epochs
    pub epochs: usize,
    /// Batch size for training and evaluation
    pub batch_size: usize,
    /// Adam learning rate
    pub learning_rate: f64,
    /// Seed for shuffling, subsampling and augmentation
    pub seed: u64,
    /// Limit the number of training and test samples (quick runs)
    pub max_samples: Option<usize>,
    /// Random flip + padded crop on training batches
    pub augment: bool,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            epochs: DEFAULT_EPOCHS,
            batch_size: DEFAULT_BATCH_SIZE,
            learning_rate: DEFAULT_LEARNING_RATE,
            seed: DEFAULT_SEED,
            max_samples: None,
            augment: false,
        }
    }
}

/// CNN size
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelSettings {
    pub base_filters: usize,
    pub hidden_units: usize,
    pub dropout_rate: f64,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            base_filters: 32,
            hidden_units: 128,
            dropout_rate: crate::model::DEFAULT_DROPOUT,
        }
    }
}

/// Evidential Deep Learning settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EdlSettings {
    /// Weight `λ` of the Dirichlet KL regulariser
    pub kl_weight: f64,
    /// Linearly ramp `λ` up over this many epochs
    pub kl_annealing_epochs: Option<usize>,
    pub kl_normalizer: KlNormalizer,
    /// Shift applied to lgamma/digamma arguments
    pub epsilon: f64,
}

impl Default for EdlSettings {
    fn default() -> Self {
        Self {
            kl_weight: 0.0,
            kl_annealing_epochs: None,
            kl_normalizer: KlNormalizer::default(),
            epsilon: DEFAULT_EPSILON,
        }
    }
}

impl EdlSettings {
    /// Effective regulariser weight at a 0-based epoch: `λ·min(1, (t+1)/T)`
    pub fn kl_weight_at(&self, epoch: usize) -> f64 {
        match self.kl_annealing_epochs {
            Some(ramp) if ramp > 0 => {
                self.kl_weight * ((epoch + 1) as f64 / ramp as f64).min(1.0)
            }
            _ => self.kl_weight,
        }
    }

    pub fn loss_config(&self) -> EvidentialLossConfig {
        EvidentialLossConfig::new()
            .with_kl_weight(self.kl_weight)
            .with_epsilon(self.epsilon)
            .with_kl_normalizer(self.kl_normalizer)
    }
}

/// Output head of each ensemble member
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum MemberKind {
    /// Cross-entropy trained softmax classifiers
    Softmax,
    /// Evidential classifiers, averaged through their mean belief
    Evidential,
}

/// Deep Ensemble settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnsembleSettings {
    pub members: usize,
    pub member_kind: MemberKind,
}

impl Default for EnsembleSettings {
    fn default() -> Self {
        Self {
            members: DEFAULT_ENSEMBLE_MEMBERS,
            member_kind: MemberKind::Softmax,
        }
    }
}

/// ConfidNet settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfidNetSettings {
    /// Weight of the confidence regression term relative to cross-entropy
    pub confidence_loss_weight: f64,
}

impl Default for ConfidNetSettings {
    fn default() -> Self {
        Self {
            confidence_loss_weight: 1.0,
        }
    }
}

/// Complete configuration of one experiment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExperimentConfig {
    pub dataset: DatasetKind,
    /// Resize images to this side length (native resolution when unset)
    pub input_resolution: Option<usize>,
    /// Override the per-channel normalization mean
    pub normalization_mean: Option<[f32; 3]>,
    /// Override the per-channel normalization std
    pub normalization_std: Option<[f32; 3]>,
    pub data_dir: PathBuf,
    pub output_dir: PathBuf,
    /// Download the dataset when it is missing
    pub download: bool,
    /// Save trained weights with the compact recorder
    pub save_model: bool,
    pub training: TrainingConfig,
    pub model: ModelSettings,
    pub edl: EdlSettings,
    pub ensemble: EnsembleSettings,
    pub confidnet: ConfidNetSettings,
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self {
            dataset: DatasetKind::Cifar10,
            input_resolution: None,
            normalization_mean: None,
            normalization_std: None,
            data_dir: PathBuf::from("data"),
            output_dir: PathBuf::from("output"),
            download: true,
            save_model: false,
            training: TrainingConfig::default(),
            model: ModelSettings::default(),
            edl: EdlSettings::default(),
            ensemble: EnsembleSettings::default(),
            confidnet: ConfidNetSettings::default(),
        }
    }
}

impl ExperimentConfig {
    pub fn new(dataset: DatasetKind) -> Self {
        Self {
            dataset,
            ..Default::default()
        }
    }

    /// Dataset configuration with the overrides applied
    pub fn dataset_config(&self) -> DatasetConfig {
        let kind = self.dataset;
        let mut config = DatasetConfig::for_kind(kind);
        if let Some(resolution) = self.input_resolution {
            config = config.with_resolution(resolution);
        }
        let (mean, std) = (config.mean, config.std);
        config.with_normalization(
            self.normalization_mean.unwrap_or(mean),
            self.normalization_std.unwrap_or(std),
        )
    }

    pub fn cnn_config(&self) -> CnnConfig {
        CnnConfig::new(self.dataset.num_classes())
            .with_base_filters(self.model.base_filters)
            .with_hidden_units(self.model.hidden_units)
            .with_dropout_rate(self.model.dropout_rate)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        let t = &self.training;
        if t.epochs == 0 {
            return Err(config_error("epochs must be greater than 0"));
        }
        if t.batch_size == 0 {
            return Err(config_error("batch_size must be greater than 0"));
        }
        if !(t.learning_rate > 0.0) {
            return Err(config_error("learning_rate must be positive"));
        }
        if t.max_samples == Some(0) {
            return Err(config_error("max_samples must be greater than 0"));
        }

        let m = &self.model;
        if m.base_filters == 0 || m.hidden_units == 0 {
            return Err(config_error("base_filters and hidden_units must be greater than 0"));
        }
        if !(0.0..1.0).contains(&m.dropout_rate) {
            return Err(config_error("dropout_rate must be in range [0.0, 1.0)"));
        }

        if self.edl.kl_weight < 0.0 {
            return Err(config_error("kl_weight must be non-negative"));
        }
        if self.edl.epsilon < 0.0 {
            return Err(config_error("epsilon must be non-negative"));
        }
        if self.ensemble.members == 0 {
            return Err(config_error("an ensemble needs at least one member"));
        }
        if self.confidnet.confidence_loss_weight < 0.0 {
            return Err(config_error("confidence_loss_weight must be non-negative"));
        }

        self.dataset_config().validate()
    }

    /// Save configuration to a JSON file
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Load configuration from a JSON file
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(UncertaintyError::PathNotFound(path.to_path_buf()));
        }
        let json = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }
}

fn config_error(message: &str) -> UncertaintyError {
    UncertaintyError::Config(message.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = ExperimentConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.edl.kl_weight, 0.0);
        assert_eq!(config.ensemble.members, 5);
        assert_eq!(config.confidnet.confidence_loss_weight, 1.0);
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let json = r#"{
            "dataset": "stl10",
            "training": { "epochs": 3 },
            "edl": { "kl_weight": 0.00001, "kl_normalizer": "Concentration" }
        }"#;
        let config: ExperimentConfig = serde_json::from_str(json).unwrap();

        assert_eq!(config.dataset, DatasetKind::Stl10);
        assert_eq!(config.training.epochs, 3);
        assert_eq!(config.training.batch_size, DEFAULT_BATCH_SIZE);
        assert_eq!(config.edl.kl_weight, 1e-5);
        assert_eq!(config.edl.kl_normalizer, KlNormalizer::Concentration);
        assert_eq!(config.dataset_config().input_resolution, 96);
    }

    #[test]
    fn test_save_and_load_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("experiment.json");

        let mut config = ExperimentConfig::new(DatasetKind::Cifar100);
        config.input_resolution = Some(64);
        config.ensemble.member_kind = MemberKind::Evidential;
        config.training.max_samples = Some(500);
        config.save(&path).unwrap();

        let loaded = ExperimentConfig::load(&path).unwrap();
        assert_eq!(loaded, config);
        assert_eq!(loaded.dataset_config().input_resolution, 64);
        assert_eq!(loaded.cnn_config().num_classes, 100);
    }

    #[test]
    fn test_partial_normalization_override_keeps_dataset_std() {
        let mut config = ExperimentConfig::new(DatasetKind::Cifar10);
        config.normalization_mean = Some([0.5, 0.5, 0.5]);

        let dataset = config.dataset_config();
        assert_eq!(dataset.mean, [0.5, 0.5, 0.5]);
        assert_eq!(dataset.std, DatasetKind::Cifar10.default_std());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = ExperimentConfig::default();
        config.training.batch_size = 0;
        assert!(config.validate().is_err());

        let mut config = ExperimentConfig::default();
        config.ensemble.members = 0;
        assert!(config.validate().is_err());

        let mut config = ExperimentConfig::default();
        config.normalization_std = Some([0.2, 0.0, 0.2]);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_kl_annealing_schedule() {
        let mut edl = EdlSettings {
            kl_weight: 1.0,
            ..Default::default()
        };
        assert_eq!(edl.kl_weight_at(0), 1.0);

        edl.kl_annealing_epochs = Some(4);
        assert!((edl.kl_weight_at(0) - 0.25).abs() < 1e-12);
        assert!((edl.kl_weight_at(1) - 0.5).abs() < 1e-12);
        assert!((edl.kl_weight_at(3) - 1.0).abs() < 1e-12);
        assert!((edl.kl_weight_at(10) - 1.0).abs() < 1e-12);
    }
}
