//! ConfidNet run
//!
//! Trains the classifier and its confidence head jointly: cross-entropy on
//! the logits plus `w · MSE(confidence, correctness)`, where correctness is
//! computed from the detached logits. At test time the confidence head's
//! output is the reported confidence.

use anyhow::Result;
use burn::{
    module::AutodiffModule,
    tensor::backend::{AutodiffBackend, Backend},
};

use super::trainer::{train_model, TrainStep};
use super::{finish_experiment, print_run_header, ExperimentConfig, ExperimentData, ExperimentOutcome, Method};
use crate::dataset::ImageBatcher;
use crate::inference::{evaluate_model, EvaluationReport};
use crate::model::{save_checkpoint, ConfidNetClassifier};
use crate::uncertainty::ConfidNetLossConfig;

/// Train and evaluate a classifier with a ConfidNet confidence head
pub fn run_confidnet<B: AutodiffBackend>(
    config: &ExperimentConfig,
    data: &ExperimentData,
    device: &B::Device,
) -> Result<ExperimentOutcome> {
    config.validate()?;
    print_run_header(Method::ConfidNet, config, data);
    tracing::info!(
        "ConfidNet: confidence_loss_weight = {}",
        config.confidnet.confidence_loss_weight
    );

    let batcher = ImageBatcher::new(&data.dataset);
    let model = ConfidNetClassifier::<B>::new(&config.cnn_config(), device);
    let loss = ConfidNetLossConfig::new()
        .with_confidence_weight(config.confidnet.confidence_loss_weight)
        .init();

    let (model, history) = train_model(
        model,
        &data.train,
        &batcher,
        &config.training,
        config.training.seed,
        "confidnet",
        device,
        |model: &ConfidNetClassifier<B>, batch, _epoch| {
            let (logits, confidence) = model.forward(batch.images.clone());
            let output = loss.forward(logits.clone(), confidence, batch.targets.clone());
            TrainStep {
                loss: output.total,
                scores: logits,
            }
        },
    );

    let mut checkpoints = Vec::new();
    if config.save_model {
        let name = format!("confidnet_{}", data.dataset.kind.slug());
        checkpoints.push(save_checkpoint::<B, _>(&model, &config.output_dir, &name)?);
    }

    let inner_device = <B::InnerBackend as Backend>::Device::default();
    let evaluation = evaluate_model::<B::InnerBackend, _>(
        &model.valid(),
        &data.test,
        &batcher,
        config.training.batch_size,
        &inner_device,
    );

    let report = EvaluationReport::new(Method::ConfidNet, data.dataset.kind, &evaluation)
        .with_histories(&[history]);
    Ok(finish_experiment(report, config, checkpoints)?)
}
