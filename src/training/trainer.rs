//! Shared epoch loop
//!
//! A custom loop in the style of burn's examples rather than the high-level
//! `LearnerBuilder`: shuffled indices per epoch, lazily assembled batches,
//! one Adam step per batch. The method-specific forward pass and loss are
//! supplied as a closure.

use burn::{
    data::dataloader::batcher::Batcher,
    data::dataset::Dataset,
    module::AutodiffModule,
    optim::{AdamConfig, GradientsParams, Optimizer},
    tensor::{
        backend::{AutodiffBackend, Backend},
        ElementConversion, Int, Tensor,
    },
};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use super::config::TrainingConfig;
use crate::dataset::{AugmentationConfig, Augmenter, ImageBatch, ImageBatcher, ImageDataset};
use crate::utils::logging::TrainingLogger;

/// Result of one forward pass on a training batch
pub struct TrainStep<B: Backend> {
    /// Scalar loss to differentiate
    pub loss: Tensor<B, 1>,
    /// Per-class scores whose arg-max is the prediction `[batch, K]`
    pub scores: Tensor<B, 2>,
}

/// Loss and training accuracy of one epoch
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EpochSummary {
    pub epoch: usize,
    pub loss: f64,
    pub train_accuracy: f64,
}

/// Per-epoch history of one trained model
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrainingHistory {
    pub run_name: String,
    pub epochs: Vec<EpochSummary>,
}

impl TrainingHistory {
    pub fn final_loss(&self) -> Option<f64> {
        self.epochs.last().map(|e| e.loss)
    }

    pub fn final_train_accuracy(&self) -> Option<f64> {
        self.epochs.last().map(|e| e.train_accuracy)
    }
}

/// Number of rows whose arg-max matches the target
pub fn count_correct<B: Backend>(scores: Tensor<B, 2>, targets: Tensor<B, 1, Int>) -> usize {
    let [batch_size, _] = scores.dims();
    let correct: i64 = scores
        .argmax(1)
        .reshape([batch_size])
        .equal(targets)
        .int()
        .sum()
        .into_scalar()
        .elem();
    correct as usize
}

/// Train `model` for `config.epochs` epochs
///
/// `step` receives the current model, the batch and the 0-based epoch and
/// returns the loss to minimise. Prints `Epoch [i/N] Loss: x.xxxx` after
/// every epoch; the loss is the mean of the batch losses.
pub fn train_model<B, M, F>(
    mut model: M,
    dataset: &ImageDataset,
    batcher: &ImageBatcher,
    config: &TrainingConfig,
    seed: u64,
    run_name: &str,
    device: &B::Device,
    mut step: F,
) -> (M, TrainingHistory)
where
    B: AutodiffBackend,
    M: AutodiffModule<B>,
    F: FnMut(&M, &ImageBatch<B>, usize) -> TrainStep<B>,
{
    let mut optimizer = AdamConfig::new().init();
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let augmenter = config
        .augment
        .then(|| Augmenter::new(AugmentationConfig::default()));

    let mut logger = TrainingLogger::new(run_name, config.epochs);
    let mut history = TrainingHistory {
        run_name: run_name.to_string(),
        epochs: Vec::with_capacity(config.epochs),
    };

    let batch_size = config.batch_size.max(1);

    for epoch in 0..config.epochs {
        logger.start_epoch(epoch);

        let mut indices: Vec<usize> = (0..dataset.len()).collect();
        indices.shuffle(&mut rng);
        let num_batches = indices.len().div_ceil(batch_size);

        let mut epoch_loss = 0.0f64;
        let mut correct = 0usize;
        let mut seen = 0usize;

        for (batch_idx, chunk) in indices.chunks(batch_size).enumerate() {
            let mut items = dataset.items_at(chunk);
            if let Some(augmenter) = &augmenter {
                items = augmenter.augment_items(items, &mut rng);
            }
            let batch: ImageBatch<B> = batcher.batch(items, device);

            let output = step(&model, &batch, epoch);

            let loss_value: f64 = output.loss.clone().into_scalar().elem();
            epoch_loss += loss_value;
            correct += count_correct(output.scores, batch.targets.clone());
            seen += chunk.len();

            let grads = output.loss.backward();
            let grads = GradientsParams::from_grads(grads, &model);
            model = optimizer.step(config.learning_rate, model, grads);

            if (batch_idx + 1) % 50 == 0 {
                tracing::debug!(
                    "[{}] batch {}/{}: loss = {:.4}",
                    run_name,
                    batch_idx + 1,
                    num_batches,
                    loss_value
                );
            }
        }

        let avg_loss = epoch_loss / num_batches.max(1) as f64;
        let train_accuracy = correct as f64 / seen.max(1) as f64;

        println!("Epoch [{}/{}] Loss: {:.4}", epoch + 1, config.epochs, avg_loss);
        logger.end_epoch(epoch, avg_loss, train_accuracy);

        history.epochs.push(EpochSummary {
            epoch,
            loss: avg_loss,
            train_accuracy,
        });
    }

    logger.log_complete();
    (model, history)
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::tensor::TensorData;
    use burn_ndarray::NdArray;

    type TestBackend = NdArray<f32>;

    #[test]
    fn test_count_correct() {
        let device = Default::default();
        let scores = Tensor::<TestBackend, 2>::from_floats(
            TensorData::new(vec![0.9f32, 0.1, 0.2, 0.8, 0.6, 0.4], [3, 2]),
            &device,
        );
        let targets =
            Tensor::<TestBackend, 1, Int>::from_data(TensorData::new(vec![0i64, 1, 1], [3]), &device);

        assert_eq!(count_correct(scores, targets), 2);
    }

    #[test]
    fn test_history_accessors() {
        let mut history = TrainingHistory::default();
        assert_eq!(history.final_loss(), None);

        history.epochs.push(EpochSummary {
            epoch: 0,
            loss: 1.5,
            train_accuracy: 0.4,
        });
        history.epochs.push(EpochSummary {
            epoch: 1,
            loss: 0.9,
            train_accuracy: 0.6,
        });
        assert_eq!(history.final_loss(), Some(0.9));
        assert_eq!(history.final_train_accuracy(), Some(0.6));
    }
}
