//! Deep Ensemble aggregation
//!
//! Members are averaged with a plain arithmetic mean, in the order they were
//! trained. The ensemble prediction is the arg-max of the mean and its
//! confidence is the corresponding mean probability.

use burn::tensor::{backend::Backend, Int, Tensor};
use serde::{Deserialize, Serialize};

use crate::model::ProbabilisticClassifier;
use crate::utils::error::{Result, UncertaintyError};

/// An ordered collection of independently trained members
#[derive(Debug, Clone)]
pub struct Ensemble<M> {
    members: Vec<M>,
}

impl<M> Ensemble<M> {
    pub fn new(members: Vec<M>) -> Result<Self> {
        if members.is_empty() {
            return Err(UncertaintyError::EmptyEnsemble);
        }
        Ok(Self { members })
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Per-member probabilities followed by their mean, for one batch
    pub fn forward<B: Backend>(&self, images: Tensor<B, 4>) -> Result<(Vec<Tensor<B, 2>>, Tensor<B, 2>)>
    where
        M: ProbabilisticClassifier<B>,
    {
        let outputs: Vec<Tensor<B, 2>> = self
            .members
            .iter()
            .map(|member| member.predict(images.clone()).probabilities)
            .collect();
        let mean = mean_probabilities(outputs.clone())?;
        Ok((outputs, mean))
    }
}

/// Elementwise arithmetic mean of `[batch, K]` member outputs
pub fn mean_probabilities<B: Backend>(outputs: Vec<Tensor<B, 2>>) -> Result<Tensor<B, 2>> {
    let count = outputs.len();
    let mut outputs = outputs.into_iter();
    let first = outputs.next().ok_or(UncertaintyError::EmptyEnsemble)?;
    let expected = first.dims();

    let mut sum = first;
    for output in outputs {
        let dims = output.dims();
        if dims != expected {
            return Err(UncertaintyError::ShapeMismatch {
                expected: expected[1],
                actual: dims[1],
            });
        }
        sum = sum + output;
    }

    Ok(sum.div_scalar(count as f64))
}

/// Arg-max class and its probability for every row, shapes `[batch]`
pub fn predict_with_confidence<B: Backend>(
    probabilities: Tensor<B, 2>,
) -> (Tensor<B, 1, Int>, Tensor<B, 1>) {
    let [batch_size, _] = probabilities.dims();
    let (confidence, predicted) = probabilities.max_dim_with_indices(1);
    (
        predicted.reshape([batch_size]),
        confidence.reshape([batch_size]),
    )
}

/// Confidences split by whether the prediction matched the label
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceBuckets {
    pub correct: Vec<f32>,
    pub incorrect: Vec<f32>,
}

impl ConfidenceBuckets {
    /// Partition per-sample confidences by comparing predictions to labels
    pub fn partition(predictions: &[usize], labels: &[usize], confidences: &[f32]) -> Self {
        let mut buckets = Self::default();
        for ((&predicted, &label), &confidence) in
            predictions.iter().zip(labels).zip(confidences)
        {
            buckets.push(predicted == label, confidence);
        }
        buckets
    }

    pub fn push(&mut self, correct: bool, confidence: f32) {
        if correct {
            self.correct.push(confidence);
        } else {
            self.incorrect.push(confidence);
        }
    }

    pub fn total(&self) -> usize {
        self.correct.len() + self.incorrect.len()
    }

    /// Fraction of samples in the correct bucket
    pub fn accuracy(&self) -> f64 {
        if self.total() == 0 {
            0.0
        } else {
            self.correct.len() as f64 / self.total() as f64
        }
    }
}
