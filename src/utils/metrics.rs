//! Classification metrics
//!
//! Confusion matrix with per-class accuracy, and small summary helpers for
//! confidence values.

use serde::{Deserialize, Serialize};

/// Confusion Matrix for multi-class classification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfusionMatrix {
    /// Number of classes
    pub num_classes: usize,

    /// Matrix data (row = actual, column = predicted)
    /// Stored as a flat vector in row-major order
    pub matrix: Vec<usize>,
}

impl ConfusionMatrix {
    /// Create a new empty confusion matrix
    pub fn new(num_classes: usize) -> Self {
        Self {
            num_classes,
            matrix: vec![0; num_classes * num_classes],
        }
    }

    /// Create confusion matrix from predictions and ground truth
    pub fn from_predictions(predictions: &[usize], ground_truth: &[usize], num_classes: usize) -> Self {
        let mut cm = Self::new(num_classes);
        for (&pred, &actual) in predictions.iter().zip(ground_truth) {
            cm.add(actual, pred);
        }
        cm
    }

    /// Add a single prediction; out-of-range classes are ignored
    pub fn add(&mut self, actual: usize, predicted: usize) {
        if actual < self.num_classes && predicted < self.num_classes {
            self.matrix[actual * self.num_classes + predicted] += 1;
        }
    }

    pub fn get(&self, actual: usize, predicted: usize) -> usize {
        if actual < self.num_classes && predicted < self.num_classes {
            self.matrix[actual * self.num_classes + predicted]
        } else {
            0
        }
    }

    pub fn total(&self) -> usize {
        self.matrix.iter().sum()
    }

    /// Diagonal sum
    pub fn correct(&self) -> usize {
        (0..self.num_classes).map(|i| self.get(i, i)).sum()
    }

    pub fn accuracy(&self) -> f64 {
        let total = self.total();
        if total > 0 {
            self.correct() as f64 / total as f64
        } else {
            0.0
        }
    }

    /// Recall of every class; `None` for classes absent from the ground truth
    pub fn per_class_accuracy(&self) -> Vec<Option<f64>> {
        (0..self.num_classes)
            .map(|row| {
                let support: usize = (0..self.num_classes).map(|col| self.get(row, col)).sum();
                (support > 0).then(|| self.get(row, row) as f64 / support as f64)
            })
            .collect()
    }

    /// The `n` most frequent (actual, predicted, count) confusions
    pub fn top_confusions(&self, n: usize) -> Vec<(usize, usize, usize)> {
        let mut pairs: Vec<(usize, usize, usize)> = (0..self.num_classes)
            .flat_map(|a| (0..self.num_classes).map(move |p| (a, p)))
            .filter(|&(a, p)| a != p)
            .map(|(a, p)| (a, p, self.get(a, p)))
            .filter(|&(_, _, count)| count > 0)
            .collect();
        pairs.sort_by(|x, y| y.2.cmp(&x.2).then(x.0.cmp(&y.0)).then(x.1.cmp(&y.1)));
        pairs.truncate(n);
        pairs
    }
}

/// Arithmetic mean, `None` for an empty slice
pub fn mean(values: &[f32]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().map(|&v| v as f64).sum::<f64>() / values.len() as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_confusion_matrix() {
        let predictions = vec![0, 1, 1, 2, 2, 0];
        let ground_truth = vec![0, 1, 2, 2, 2, 1];
        let cm = ConfusionMatrix::from_predictions(&predictions, &ground_truth, 3);

        assert_eq!(cm.total(), 6);
        assert_eq!(cm.correct(), 4);
        assert!((cm.accuracy() - 4.0 / 6.0).abs() < 1e-12);
        assert_eq!(cm.get(2, 1), 1);
    }

    #[test]
    fn test_per_class_accuracy() {
        let cm = ConfusionMatrix::from_predictions(&[0, 0, 1], &[0, 1, 1], 3);
        let per_class = cm.per_class_accuracy();

        assert_eq!(per_class[0], Some(1.0));
        assert_eq!(per_class[1], Some(0.5));
        assert_eq!(per_class[2], None);
    }

    #[test]
    fn test_top_confusions() {
        let cm = ConfusionMatrix::from_predictions(&[1, 1, 0, 2], &[0, 0, 1, 2], 3);
        assert_eq!(cm.top_confusions(5), vec![(0, 1, 2), (1, 0, 1)]);
        assert_eq!(cm.top_confusions(1), vec![(0, 1, 2)]);
    }

    #[test]
    fn test_mean() {
        assert_eq!(mean(&[]), None);
        assert!((mean(&[0.5, 1.0]).unwrap() - 0.75).abs() < 1e-12);
    }
}
