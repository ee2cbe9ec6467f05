//! # CIFAR Uncertainty
//!
//! Uncertainty estimation for image classifiers on CIFAR-10, CIFAR-100 and
//! STL-10, built on the Burn framework.
//!
//! ## Methods
//!
//! - **Evidential Deep Learning**: a softplus evidence head parameterising a
//!   Dirichlet distribution, trained with the evidential MSE loss and an
//!   optional KL regulariser
//! - **Deep Ensembles**: independently trained CNNs averaged at inference
//! - **ConfidNet**: an auxiliary confidence head regressed onto the
//!   correctness of the class prediction
//!
//! Every run reports test accuracy and a histogram of the confidence of
//! correct vs. incorrect predictions.
//!
//! ## Modules
//!
//! - `dataset`: Binary dataset decoding, download, batching and augmentation
//! - `model`: CNN backbone and the three heads
//! - `uncertainty`: Dirichlet math, losses and ensemble aggregation
//! - `training`: Experiment configuration and per-method training runs
//! - `inference`: Evaluation, histograms and reports
//! - `utils`: Logging, metrics, charts and error types
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use cifar_uncertainty::backend::{default_device, TrainingBackend};
//! use cifar_uncertainty::training::{run_edl, ExperimentConfig, ExperimentData};
//! use cifar_uncertainty::dataset::DatasetKind;
//!
//! let config = ExperimentConfig::new(DatasetKind::Cifar10);
//! let data = ExperimentData::load(&config)?;
//! let outcome = run_edl::<TrainingBackend>(&config, &data, &default_device())?;
//! println!("accuracy: {:.2}%", outcome.report.accuracy * 100.0);
//! ```

pub mod backend;
pub mod dataset;
pub mod inference;
pub mod model;
pub mod training;
pub mod uncertainty;
pub mod utils;

// Re-export commonly used items for convenience
pub use dataset::{DatasetConfig, DatasetKind, ImageBatch, ImageBatcher, ImageDataset, ImageItem};
pub use inference::{evaluate_ensemble, evaluate_model, Evaluation, EvaluationReport};
pub use model::{
    Classifier, CnnConfig, ConfidNetClassifier, EvidentialClassifier, ModelOutput,
    ProbabilisticClassifier,
};
pub use training::{ExperimentConfig, ExperimentData, ExperimentOutcome, Method};
pub use uncertainty::{ConfidenceBuckets, DirichletParams, Ensemble, EvidentialLoss};
pub use utils::error::{Result, UncertaintyError};

/// Version of the library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
