//! Deep Ensemble run
//!
//! Trains `members` independent models one after another (each with its own
//! initialisation and shuffling seed), then averages their probability
//! vectors at test time in training order.

use anyhow::Result;
use burn::{
    module::AutodiffModule,
    nn::loss::CrossEntropyLossConfig,
    tensor::backend::{AutodiffBackend, Backend},
};

use super::trainer::{train_model, TrainStep, TrainingHistory};
use super::{
    finish_experiment, print_run_header, ExperimentConfig, ExperimentData, ExperimentOutcome,
    MemberKind, Method,
};
use crate::dataset::{ImageBatch, ImageBatcher};
use crate::inference::{evaluate_ensemble, EvaluationReport};
use crate::model::{save_checkpoint, Classifier, EvidentialClassifier, ProbabilisticClassifier};
use crate::uncertainty::{DirichletParams, Ensemble};

/// Train and evaluate a Deep Ensemble
pub fn run_ensemble<B: AutodiffBackend>(
    config: &ExperimentConfig,
    data: &ExperimentData,
    device: &B::Device,
) -> Result<ExperimentOutcome> {
    config.validate()?;
    print_run_header(Method::Ensemble, config, data);
    tracing::info!(
        "Ensemble: {} {:?} members",
        config.ensemble.members,
        config.ensemble.member_kind
    );

    let cnn = config.cnn_config();

    match config.ensemble.member_kind {
        MemberKind::Softmax => run_members::<B, Classifier<B>, _, _>(
            config,
            data,
            device,
            |device| Classifier::new(&cnn, device),
            |model: &Classifier<B>, batch: &ImageBatch<B>, _epoch| {
                let logits = model.forward(batch.images.clone());
                let loss = CrossEntropyLossConfig::new()
                    .init(&logits.device())
                    .forward(logits.clone(), batch.targets.clone());
                TrainStep {
                    loss,
                    scores: logits,
                }
            },
        ),
        MemberKind::Evidential => {
            let loss = config.edl.loss_config().init();
            let edl = &config.edl;
            run_members::<B, EvidentialClassifier<B>, _, _>(
                config,
                data,
                device,
                |device| EvidentialClassifier::new(&cnn, device),
                |model: &EvidentialClassifier<B>, batch: &ImageBatch<B>, epoch| {
                    let params: DirichletParams<B> = model.dirichlet(batch.images.clone());
                    let loss =
                        loss.forward_with_weight(&params, batch.one_hot.clone(), edl.kl_weight_at(epoch));
                    TrainStep {
                        loss,
                        scores: params.alpha,
                    }
                },
            )
        }
    }
}

/// Train every member with `step`, then evaluate the averaged ensemble
fn run_members<B, M, G, F>(
    config: &ExperimentConfig,
    data: &ExperimentData,
    device: &B::Device,
    mut init: G,
    mut step: F,
) -> Result<ExperimentOutcome>
where
    B: AutodiffBackend,
    M: AutodiffModule<B>,
    M::InnerModule: ProbabilisticClassifier<B::InnerBackend>,
    G: FnMut(&B::Device) -> M,
    F: FnMut(&M, &ImageBatch<B>, usize) -> TrainStep<B>,
{
    let batcher = ImageBatcher::new(&data.dataset);
    let count = config.ensemble.members;

    let mut members = Vec::with_capacity(count);
    let mut histories: Vec<TrainingHistory> = Vec::with_capacity(count);
    let mut checkpoints = Vec::new();

    for index in 0..count {
        println!("Training member {}/{}", index + 1, count);

        let seed = config.training.seed.wrapping_add(index as u64);
        let run_name = format!("member {}/{}", index + 1, count);
        let (model, history) = train_model(
            init(device),
            &data.train,
            &batcher,
            &config.training,
            seed,
            &run_name,
            device,
            &mut step,
        );

        if config.save_model {
            let name = format!(
                "ensemble_{}_member{}",
                data.dataset.kind.slug(),
                index + 1
            );
            checkpoints.push(save_checkpoint::<B, M>(&model, &config.output_dir, &name)?);
        }

        histories.push(history);
        members.push(model.valid());
    }

    let ensemble = Ensemble::new(members)?;
    let inner_device = <B::InnerBackend as Backend>::Device::default();
    let evaluation = evaluate_ensemble::<B::InnerBackend, M::InnerModule>(
        &ensemble,
        &data.test,
        &batcher,
        config.training.batch_size,
        &inner_device,
    )?;

    let report = EvaluationReport::new(Method::Ensemble, data.dataset.kind, &evaluation.combined)
        .with_member_accuracies(evaluation.member_accuracies)
        .with_histories(&histories);
    Ok(finish_experiment(report, config, checkpoints)?)
}
