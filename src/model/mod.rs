//! Model module: CNN architectures and the prediction interface shared by
//! the three uncertainty methods

pub mod cnn;

use std::path::{Path, PathBuf};

use burn::{
    module::Module,
    record::CompactRecorder,
    tensor::{backend::Backend, Tensor},
};
use chrono::Local;

use crate::utils::error::{Result, UncertaintyError};

pub use cnn::{Backbone, Classifier, CnnConfig, ConfidNetClassifier, EvidentialClassifier};

/// Default dropout rate before the heads
pub const DEFAULT_DROPOUT: f64 = 0.3;

/// Inference output of a classifier for one batch
#[derive(Debug, Clone)]
pub struct ModelOutput<B: Backend> {
    /// Class probabilities `[batch, K]` (softmax or Dirichlet mean belief)
    pub probabilities: Tensor<B, 2>,
    /// Dedicated confidence estimate `[batch]`, when the model has one
    pub confidence: Option<Tensor<B, 1>>,
    /// Dirichlet vacuity `K / α₀` `[batch]`, for evidential models
    pub vacuity: Option<Tensor<B, 1>>,
}

impl<B: Backend> ModelOutput<B> {
    pub fn from_probabilities(probabilities: Tensor<B, 2>) -> Self {
        Self {
            probabilities,
            confidence: None,
            vacuity: None,
        }
    }
}

/// A model that maps a batch of images to class probabilities
pub trait ProbabilisticClassifier<B: Backend> {
    fn predict(&self, images: Tensor<B, 4>) -> ModelOutput<B>;
}

/// Save a model with burn's `CompactRecorder` under a timestamped name
///
/// Returns the checkpoint path without the recorder's extension.
pub fn save_checkpoint<B: Backend, M: Module<B>>(
    model: &M,
    output_dir: &Path,
    name: &str,
) -> Result<PathBuf> {
    std::fs::create_dir_all(output_dir)?;

    let timestamp = Local::now().format("%Y%m%d_%H%M%S");
    let checkpoint_path = output_dir.join(format!("{}_{}", name, timestamp));

    model
        .clone()
        .save_file(&checkpoint_path, &CompactRecorder::new())
        .map_err(|e| UncertaintyError::Model(format!("Failed to save model: {:?}", e)))?;

    tracing::info!("Saved checkpoint to {:?}", checkpoint_path);
    Ok(checkpoint_path)
}
