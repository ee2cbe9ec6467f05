//! Evaluation of trained models
//!
//! This module provides:
//! - Batched prediction over a test set for any [`ProbabilisticClassifier`]
//! - Deep Ensemble evaluation with per-member accuracy
//! - Confidence histograms and the JSON/SVG run report

pub mod histogram;
pub mod report;

use burn::data::dataloader::batcher::Batcher;
use burn::data::dataset::Dataset;
use burn::tensor::{backend::Backend, Tensor};

use crate::dataset::{ImageBatch, ImageBatcher, ImageDataset};
use crate::model::ProbabilisticClassifier;
use crate::uncertainty::{predict_with_confidence, ConfidenceBuckets, Ensemble};
use crate::utils::error::Result;
use crate::utils::metrics::ConfusionMatrix;

pub use histogram::{bin_counts, ConfidenceHistogram, DEFAULT_BINS};
pub use report::EvaluationReport;

/// Per-sample predictions over a test set
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Evaluation {
    pub labels: Vec<usize>,
    pub predictions: Vec<usize>,
    /// Reported confidence: max probability, or the dedicated confidence head
    pub confidences: Vec<f32>,
    /// Dirichlet vacuity, for evidential models
    pub vacuities: Option<Vec<f32>>,
}

impl Evaluation {
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn num_correct(&self) -> usize {
        self.predictions
            .iter()
            .zip(&self.labels)
            .filter(|(p, l)| p == l)
            .count()
    }

    /// Fraction of correct predictions in [0, 1]
    pub fn accuracy(&self) -> f64 {
        if self.is_empty() {
            0.0
        } else {
            self.num_correct() as f64 / self.len() as f64
        }
    }

    /// Confidences split into correct / incorrect predictions
    pub fn confidence_buckets(&self) -> ConfidenceBuckets {
        ConfidenceBuckets::partition(&self.predictions, &self.labels, &self.confidences)
    }

    /// Vacuities split into correct / incorrect predictions
    pub fn vacuity_buckets(&self) -> Option<ConfidenceBuckets> {
        self.vacuities
            .as_ref()
            .map(|v| ConfidenceBuckets::partition(&self.predictions, &self.labels, v))
    }

    pub fn confusion_matrix(&self, num_classes: usize) -> ConfusionMatrix {
        ConfusionMatrix::from_predictions(&self.predictions, &self.labels, num_classes)
    }

    fn extend_batch<B: Backend>(
        &mut self,
        probabilities: Tensor<B, 2>,
        confidence: Option<Tensor<B, 1>>,
        vacuity: Option<Tensor<B, 1>>,
        labels: &[usize],
    ) {
        let (predicted, max_probability) = predict_with_confidence(probabilities);
        let confidence = confidence.unwrap_or(max_probability);

        self.predictions
            .extend(predicted.into_data().iter::<i64>().map(|p| p as usize));
        self.confidences
            .extend(confidence.into_data().iter::<f32>());
        if let Some(vacuity) = vacuity {
            self.vacuities
                .get_or_insert_with(Vec::new)
                .extend(vacuity.into_data().iter::<f32>());
        }
        self.labels.extend_from_slice(labels);
    }
}

/// Evaluation of a Deep Ensemble: the combined prediction plus the accuracy
/// of every member, in training order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EnsembleEvaluation {
    pub combined: Evaluation,
    pub member_accuracies: Vec<f64>,
}

fn batches<'a>(
    dataset: &'a ImageDataset,
    batch_size: usize,
) -> impl Iterator<Item = (Vec<crate::dataset::ImageItem>, Vec<usize>)> + 'a {
    let len = dataset.len();
    (0..len).step_by(batch_size.max(1)).map(move |start| {
        let end = (start + batch_size.max(1)).min(len);
        let items: Vec<_> = (start..end).filter_map(|i| dataset.get(i)).collect();
        let labels = items.iter().map(|item| item.label).collect();
        (items, labels)
    })
}

/// Run `model` over `dataset` in batches and collect its predictions
pub fn evaluate_model<B, M>(
    model: &M,
    dataset: &ImageDataset,
    batcher: &ImageBatcher,
    batch_size: usize,
    device: &B::Device,
) -> Evaluation
where
    B: Backend,
    M: ProbabilisticClassifier<B>,
{
    let mut evaluation = Evaluation::default();

    for (items, labels) in batches(dataset, batch_size) {
        if items.is_empty() {
            continue;
        }
        let batch: ImageBatch<B> = batcher.batch(items, device);
        let output = model.predict(batch.images);
        evaluation.extend_batch(output.probabilities, output.confidence, output.vacuity, &labels);
    }

    tracing::debug!(
        "Evaluated {} samples, accuracy {:.4}",
        evaluation.len(),
        evaluation.accuracy()
    );
    evaluation
}

/// Run every member over `dataset` and combine their probabilities by
/// arithmetic mean
pub fn evaluate_ensemble<B, M>(
    ensemble: &Ensemble<M>,
    dataset: &ImageDataset,
    batcher: &ImageBatcher,
    batch_size: usize,
    device: &B::Device,
) -> Result<EnsembleEvaluation>
where
    B: Backend,
    M: ProbabilisticClassifier<B>,
{
    let mut combined = Evaluation::default();
    let mut member_correct = vec![0usize; ensemble.len()];

    for (items, labels) in batches(dataset, batch_size) {
        if items.is_empty() {
            continue;
        }
        let batch: ImageBatch<B> = batcher.batch(items, device);
        let (member_outputs, mean) = ensemble.forward(batch.images)?;

        for (correct, output) in member_correct.iter_mut().zip(member_outputs) {
            let (predicted, _) = predict_with_confidence(output);
            *correct += predicted
                .into_data()
                .iter::<i64>()
                .zip(&labels)
                .filter(|(p, l)| *p as usize == **l)
                .count();
        }

        combined.extend_batch(mean, None, None, &labels);
    }

    let total = combined.len().max(1) as f64;
    let member_accuracies = member_correct
        .into_iter()
        .map(|c| c as f64 / total)
        .collect();

    Ok(EnsembleEvaluation {
        combined,
        member_accuracies,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::{DatasetConfig, DatasetKind, ImageItem};
    use crate::model::ModelOutput;
    use burn::tensor::TensorData;
    use burn_ndarray::NdArray;
    use image::{Rgb, RgbImage};

    type TestBackend = NdArray<f32>;

    /// Predicts class 1 for bright images and class 0 for dark ones
    struct BrightnessModel {
        confident: bool,
    }

    impl ProbabilisticClassifier<TestBackend> for BrightnessModel {
        fn predict(&self, images: Tensor<TestBackend, 4>) -> ModelOutput<TestBackend> {
            let [batch_size, _, _, _] = images.dims();
            let means: Vec<f32> = images
                .mean_dim(3)
                .mean_dim(2)
                .mean_dim(1)
                .into_data()
                .iter::<f32>()
                .collect();
            let high = if self.confident { 0.9 } else { 0.6 };

            let mut probs = Vec::with_capacity(batch_size * 2);
            for m in means {
                if m > 0.0 {
                    probs.extend([1.0 - high, high]);
                } else {
                    probs.extend([high, 1.0 - high]);
                }
            }
            ModelOutput::from_probabilities(Tensor::from_floats(
                TensorData::new(probs, [batch_size, 2]),
                &Default::default(),
            ))
        }
    }

    fn dataset() -> ImageDataset {
        let item = |value: u8, label: usize| ImageItem {
            image: RgbImage::from_pixel(4, 4, Rgb([value, value, value])),
            label,
        };
        // Last sample is mislabelled on purpose
        ImageDataset::new(vec![item(0, 0), item(255, 1), item(250, 1), item(5, 1)])
    }

    fn batcher() -> ImageBatcher {
        let config = DatasetConfig::for_kind(DatasetKind::Cifar10)
            .with_normalization([0.5; 3], [0.5; 3]);
        ImageBatcher::new(&config)
    }

    #[test]
    fn test_evaluate_model_collects_predictions() {
        let model = BrightnessModel { confident: true };
        let evaluation = evaluate_model(&model, &dataset(), &batcher(), 3, &Default::default());

        assert_eq!(evaluation.len(), 4);
        assert_eq!(evaluation.predictions, vec![0, 1, 1, 0]);
        assert_eq!(evaluation.num_correct(), 3);
        assert!((evaluation.accuracy() - 0.75).abs() < 1e-12);

        let buckets = evaluation.confidence_buckets();
        assert_eq!(buckets.correct.len(), 3);
        assert_eq!(buckets.incorrect.len(), 1);
        assert!((buckets.incorrect[0] - 0.9).abs() < 1e-6);
        assert!(evaluation.vacuity_buckets().is_none());
    }

    #[test]
    fn test_evaluate_ensemble_averages_members() {
        let ensemble = Ensemble::new(vec![
            BrightnessModel { confident: true },
            BrightnessModel { confident: false },
        ])
        .unwrap();

        let evaluation =
            evaluate_ensemble(&ensemble, &dataset(), &batcher(), 2, &Default::default()).unwrap();

        assert_eq!(evaluation.member_accuracies, vec![0.75, 0.75]);
        assert_eq!(evaluation.combined.predictions, vec![0, 1, 1, 0]);
        for confidence in &evaluation.combined.confidences {
            assert!((confidence - 0.75).abs() < 1e-6);
        }
    }

    #[test]
    fn test_confusion_matrix_from_evaluation() {
        let evaluation = Evaluation {
            labels: vec![0, 1, 1],
            predictions: vec![0, 1, 0],
            confidences: vec![0.9, 0.8, 0.7],
            vacuities: Some(vec![0.1, 0.2, 0.6]),
        };
        let cm = evaluation.confusion_matrix(2);
        assert_eq!(cm.get(1, 0), 1);

        let vacuity = evaluation.vacuity_buckets().unwrap();
        assert_eq!(vacuity.incorrect, vec![0.6]);
    }
}
