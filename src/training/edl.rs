//! Evidential Deep Learning run
//!
//! Trains an [`EvidentialClassifier`] with the evidential MSE loss plus the
//! (optionally annealed) Dirichlet KL regulariser, then reports the mean
//! belief's arg-max as prediction and its max as confidence.

use anyhow::Result;
use burn::{
    module::AutodiffModule,
    tensor::backend::{AutodiffBackend, Backend},
};

use super::trainer::{train_model, TrainStep};
use super::{finish_experiment, print_run_header, ExperimentConfig, ExperimentData, ExperimentOutcome, Method};
use crate::dataset::ImageBatcher;
use crate::inference::{evaluate_model, EvaluationReport};
use crate::model::{save_checkpoint, EvidentialClassifier};

/// Train and evaluate one evidential classifier
pub fn run_edl<B: AutodiffBackend>(
    config: &ExperimentConfig,
    data: &ExperimentData,
    device: &B::Device,
) -> Result<ExperimentOutcome> {
    config.validate()?;
    print_run_header(Method::Edl, config, data);
    tracing::info!(
        "EDL: kl_weight = {}, annealing = {:?}, normalizer = {:?}",
        config.edl.kl_weight,
        config.edl.kl_annealing_epochs,
        config.edl.kl_normalizer
    );

    let batcher = ImageBatcher::new(&data.dataset);
    let model = EvidentialClassifier::<B>::new(&config.cnn_config(), device);
    let loss = config.edl.loss_config().init();
    let edl = &config.edl;

    let (model, history) = train_model(
        model,
        &data.train,
        &batcher,
        &config.training,
        config.training.seed,
        "edl",
        device,
        |model: &EvidentialClassifier<B>, batch, epoch| {
            let params = model.dirichlet(batch.images.clone());
            let loss = loss.forward_with_weight(&params, batch.one_hot.clone(), edl.kl_weight_at(epoch));
            TrainStep {
                loss,
                scores: params.alpha,
            }
        },
    );

    let mut checkpoints = Vec::new();
    if config.save_model {
        let name = format!("edl_{}", data.dataset.kind.slug());
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

    let report = EvaluationReport::new(Method::Edl, data.dataset.kind, &evaluation)
        .with_histories(&[history]);
    Ok(finish_experiment(report, config, checkpoints)?)
}
