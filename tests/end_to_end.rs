//! End-to-end runs of the three methods on a tiny synthetic dataset

use burn::backend::Autodiff;
use burn_ndarray::NdArray;
use image::{Rgb, RgbImage};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use cifar_uncertainty::dataset::{DatasetConfig, DatasetKind, ImageDataset, ImageItem};
use cifar_uncertainty::training::{
    run_confidnet, run_edl, run_ensemble, ExperimentConfig, ExperimentData, MemberKind,
};

type TestBackend = Autodiff<NdArray<f32>>;

/// Two separable classes of 8×8 images: dark reddish vs. bright bluish
fn synthetic_split(count: usize, seed: u64) -> ImageDataset {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let items = (0..count)
        .map(|i| {
            let label = i % 2;
            let image = RgbImage::from_fn(8, 8, |_, _| {
                let noise: u8 = rng.gen_range(0..30);
                if label == 0 {
                    Rgb([120 + noise, 20 + noise, 20 + noise])
                } else {
                    Rgb([20 + noise, 120 + noise, 200 + noise])
                }
            });
            ImageItem { image, label }
        })
        .collect();
    ImageDataset::new(items)
}

fn synthetic_data() -> ExperimentData {
    ExperimentData::new(
        DatasetConfig::for_kind(DatasetKind::Cifar10),
        synthetic_split(24, 1),
        synthetic_split(10, 2),
    )
}

fn tiny_config(output_dir: &std::path::Path) -> ExperimentConfig {
    let mut config = ExperimentConfig::new(DatasetKind::Cifar10);
    config.output_dir = output_dir.to_path_buf();
    config.download = false;
    config.training.epochs = 2;
    config.training.batch_size = 8;
    config.model.base_filters = 4;
    config.model.hidden_units = 8;
    config
}

#[test]
fn edl_run_writes_report_and_histogram() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = tiny_config(dir.path());
    config.edl.kl_weight = 0.01;
    config.edl.kl_annealing_epochs = Some(2);
    config.training.augment = true;

    let outcome = run_edl::<TestBackend>(&config, &synthetic_data(), &Default::default()).unwrap();
    let report = &outcome.report;

    assert_eq!(report.num_samples, 10);
    assert!((0.0..=1.0).contains(&report.accuracy));
    assert_eq!(
        report.histogram.correct.iter().sum::<usize>() + report.histogram.incorrect.iter().sum::<usize>(),
        10
    );
    assert!(report.mean_vacuity_correct.is_some() || report.mean_vacuity_incorrect.is_some());
    assert_eq!(report.final_train_losses.len(), 1);
    assert!(report.final_train_losses[0].is_finite());

    assert!(outcome.report_path.ends_with("edl_cifar10_report.json"));
    assert!(outcome.report_path.exists());
    assert!(outcome.chart_path.exists());
    assert!(outcome.checkpoints.is_empty());
}

#[test]
fn ensemble_run_reports_every_member() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = tiny_config(dir.path());
    config.ensemble.members = 2;

    let outcome = run_ensemble::<TestBackend>(&config, &synthetic_data(), &Default::default()).unwrap();
    let report = &outcome.report;

    assert_eq!(report.member_accuracies.as_ref().map(Vec::len), Some(2));
    assert_eq!(report.final_train_losses.len(), 2);
    assert!(report.mean_vacuity_correct.is_none());
    assert!(outcome.chart_path.ends_with("ensemble_cifar10_confidence.svg"));
}

#[test]
fn evidential_ensemble_run() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = tiny_config(dir.path());
    config.ensemble.members = 2;
    config.ensemble.member_kind = MemberKind::Evidential;
    config.training.epochs = 1;

    let outcome = run_ensemble::<TestBackend>(&config, &synthetic_data(), &Default::default()).unwrap();
    assert_eq!(outcome.report.num_samples, 10);
}

#[test]
fn confidnet_run_with_checkpoint() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = tiny_config(dir.path());
    config.confidnet.confidence_loss_weight = 0.5;
    config.save_model = true;

    let outcome = run_confidnet::<TestBackend>(&config, &synthetic_data(), &Default::default()).unwrap();
    let report = &outcome.report;

    assert_eq!(report.num_samples, 10);
    for mean in [report.mean_confidence_correct, report.mean_confidence_incorrect]
        .into_iter()
        .flatten()
    {
        assert!(mean > 0.0 && mean < 1.0);
    }
    assert_eq!(outcome.checkpoints.len(), 1);
}

#[test]
fn invalid_config_is_rejected_before_training() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = tiny_config(dir.path());
    config.training.epochs = 0;

    assert!(run_edl::<TestBackend>(&config, &synthetic_data(), &Default::default()).is_err());
}
