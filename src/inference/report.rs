//! Run report: accuracy, confidence summary, histogram and output files

use std::path::{Path, PathBuf};

use chrono::Local;
use colored::Colorize;
use serde::{Deserialize, Serialize};

use super::histogram::{ConfidenceHistogram, DEFAULT_BINS};
use super::Evaluation;
use crate::dataset::DatasetKind;
use crate::training::{Method, TrainingHistory};
use crate::utils::error::{Result, UncertaintyError};
use crate::utils::metrics::mean;

const TOP_CONFUSIONS: usize = 5;

/// Summary of one experiment, serialized as `<method>_<dataset>_report.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationReport {
    pub method: Method,
    pub dataset: DatasetKind,
    pub backend: String,
    pub timestamp: String,
    pub num_samples: usize,
    pub num_correct: usize,
    /// Fraction in [0, 1]
    pub accuracy: f64,
    pub mean_confidence_correct: Option<f64>,
    pub mean_confidence_incorrect: Option<f64>,
    pub mean_vacuity_correct: Option<f64>,
    pub mean_vacuity_incorrect: Option<f64>,
    /// Ensemble members' accuracies, in training order
    pub member_accuracies: Option<Vec<f64>>,
    /// Recall per class; `None` where the class has no test samples
    pub per_class_accuracy: Vec<Option<f64>>,
    /// Most frequent `(actual, predicted, count)` mistakes
    pub top_confusions: Vec<(usize, usize, usize)>,
    /// Final-epoch training loss of every trained model
    pub final_train_losses: Vec<f64>,
    pub final_train_accuracies: Vec<f64>,
    pub histogram: ConfidenceHistogram,
}

impl EvaluationReport {
    pub fn new(method: Method, dataset: DatasetKind, evaluation: &Evaluation) -> Self {
        let buckets = evaluation.confidence_buckets();
        let vacuity = evaluation.vacuity_buckets();
        let confusion = evaluation.confusion_matrix(dataset.num_classes());

        Self {
            method,
            dataset,
            backend: crate::backend::backend_name().to_string(),
            timestamp: Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
            num_samples: evaluation.len(),
            num_correct: evaluation.num_correct(),
            accuracy: evaluation.accuracy(),
            mean_confidence_correct: mean(&buckets.correct),
            mean_confidence_incorrect: mean(&buckets.incorrect),
            mean_vacuity_correct: vacuity.as_ref().and_then(|v| mean(&v.correct)),
            mean_vacuity_incorrect: vacuity.as_ref().and_then(|v| mean(&v.incorrect)),
            member_accuracies: None,
            per_class_accuracy: confusion.per_class_accuracy(),
            top_confusions: confusion.top_confusions(TOP_CONFUSIONS),
            final_train_losses: Vec::new(),
            final_train_accuracies: Vec::new(),
            histogram: ConfidenceHistogram::from_buckets(&buckets, DEFAULT_BINS),
        }
    }

    pub fn with_member_accuracies(mut self, accuracies: Vec<f64>) -> Self {
        self.member_accuracies = Some(accuracies);
        self
    }

    pub fn with_histories(mut self, histories: &[TrainingHistory]) -> Self {
        self.final_train_losses = histories.iter().filter_map(|h| h.final_loss()).collect();
        self.final_train_accuracies = histories
            .iter()
            .filter_map(|h| h.final_train_accuracy())
            .collect();
        self
    }

    /// `<method>_<dataset>` prefix of the output files
    pub fn file_stem(&self) -> String {
        format!("{}_{}", self.method.slug(), self.dataset.slug())
    }

    pub fn save_json(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    pub fn load_json(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(UncertaintyError::PathNotFound(path.to_path_buf()));
        }
        let json = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }

    /// Write the JSON report and the SVG histogram into `output_dir`
    ///
    /// Returns `(report_path, chart_path)`.
    pub fn write_outputs(&self, output_dir: &Path) -> Result<(PathBuf, PathBuf)> {
        std::fs::create_dir_all(output_dir)?;
        let stem = self.file_stem();

        let report_path = output_dir.join(format!("{}_report.json", stem));
        self.save_json(&report_path)?;

        let chart_path = output_dir.join(format!("{}_confidence.svg", stem));
        let title = format!("{} on {}: confidence of correct vs. incorrect", self.method, self.dataset);
        self.histogram.write_svg(&title, &chart_path)?;

        tracing::info!("Wrote {:?} and {:?}", report_path, chart_path);
        Ok((report_path, chart_path))
    }

    /// Print the accuracy line and the confidence summary
    pub fn print_summary(&self) {
        println!();
        println!("{}", format!("{} on {}", self.method, self.dataset).cyan().bold());

        if let Some(members) = &self.member_accuracies {
            for (i, accuracy) in members.iter().enumerate() {
                println!("  Member {} accuracy: {:.2}%", i + 1, accuracy * 100.0);
            }
        }

        println!("Accuracy: {:.2}%", self.accuracy * 100.0);

        println!(
            "  Correct:   {:>6} samples, mean confidence {}",
            self.num_correct,
            format_optional(self.mean_confidence_correct)
        );
        println!(
            "  Incorrect: {:>6} samples, mean confidence {}",
            self.num_samples - self.num_correct,
            format_optional(self.mean_confidence_incorrect)
        );

        if self.mean_vacuity_correct.is_some() || self.mean_vacuity_incorrect.is_some() {
            println!(
                "  Mean vacuity: correct {} | incorrect {}",
                format_optional(self.mean_vacuity_correct),
                format_optional(self.mean_vacuity_incorrect)
            );
        }

        if !self.top_confusions.is_empty() {
            println!("  Most frequent mistakes:");
            for &(actual, predicted, count) in &self.top_confusions {
                println!(
                    "    {:<16} -> {:<16} {:>5}",
                    self.dataset.class_name(actual).unwrap_or("?"),
                    self.dataset.class_name(predicted).unwrap_or("?"),
                    count
                );
            }
        }
    }
}

fn format_optional(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{:.4}", v),
        None => "n/a".dimmed().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::training::EpochSummary;

    fn evaluation() -> Evaluation {
        Evaluation {
            labels: vec![0, 1, 2, 2],
            predictions: vec![0, 1, 1, 2],
            confidences: vec![0.9, 0.8, 0.4, 1.0],
            vacuities: Some(vec![0.2, 0.4, 0.9, 0.1]),
        }
    }

    #[test]
    fn test_report_summary_values() {
        let report = EvaluationReport::new(Method::Edl, DatasetKind::Cifar10, &evaluation());

        assert_eq!(report.num_samples, 4);
        assert_eq!(report.num_correct, 3);
        assert!((report.accuracy - 0.75).abs() < 1e-12);
        assert!((report.mean_confidence_correct.unwrap() - 0.9).abs() < 1e-6);
        assert!((report.mean_confidence_incorrect.unwrap() - 0.4).abs() < 1e-6);
        assert!((report.mean_vacuity_incorrect.unwrap() - 0.9).abs() < 1e-6);
        assert_eq!(report.histogram.correct[19], 1);
        assert_eq!(report.per_class_accuracy.len(), 10);
        assert_eq!(report.per_class_accuracy[2], Some(0.5));
        assert_eq!(report.top_confusions, vec![(2, 1, 1)]);
        assert_eq!(report.file_stem(), "edl_cifar10");
    }

    #[test]
    fn test_write_outputs() {
        let dir = tempfile::tempdir().unwrap();
        let history = TrainingHistory {
            run_name: "m1".to_string(),
            epochs: vec![EpochSummary {
                epoch: 0,
                loss: 0.5,
                train_accuracy: 0.8,
            }],
        };
        let report = EvaluationReport::new(Method::Ensemble, DatasetKind::Stl10, &evaluation())
            .with_member_accuracies(vec![0.5, 0.75])
            .with_histories(&[history]);

        let (json_path, svg_path) = report.write_outputs(dir.path()).unwrap();
        assert!(json_path.ends_with("ensemble_stl10_report.json"));
        assert!(svg_path.ends_with("ensemble_stl10_confidence.svg"));

        let loaded = EvaluationReport::load_json(&json_path).unwrap();
        assert_eq!(loaded.member_accuracies, Some(vec![0.5, 0.75]));
        assert_eq!(loaded.final_train_losses, vec![0.5]);
        assert_eq!(loaded.final_train_accuracies, vec![0.8]);
    }

    #[test]
    fn test_load_missing_report() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            EvaluationReport::load_json(&dir.path().join("absent.json")),
            Err(UncertaintyError::PathNotFound(_))
        ));
    }
}
