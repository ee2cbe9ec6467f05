//! Confidence histograms for correct vs. incorrect predictions

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::uncertainty::ConfidenceBuckets;
use crate::utils::charts::{generate_histogram_chart, HistogramSeries, COLOR_CORRECT, COLOR_INCORRECT};
use crate::utils::error::Result;

/// Number of equal-width bins over [0, 1]
pub const DEFAULT_BINS: usize = 20;

/// Count values into `bins` equal-width bins over [0, 1]
///
/// Values are clamped to [0, 1]; 1.0 falls into the last bin. NaN values
/// are skipped.
pub fn bin_counts(values: &[f32], bins: usize) -> Vec<usize> {
    let mut counts = vec![0usize; bins];
    if bins == 0 {
        return counts;
    }
    for &value in values {
        if value.is_nan() {
            continue;
        }
        let v = value.clamp(0.0, 1.0) as f64;
        let bin = ((v * bins as f64) as usize).min(bins - 1);
        counts[bin] += 1;
    }
    counts
}

/// Overlaid histograms of the two confidence buckets
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceHistogram {
    pub bins: usize,
    pub correct: Vec<usize>,
    pub incorrect: Vec<usize>,
}

impl ConfidenceHistogram {
    pub fn from_buckets(buckets: &ConfidenceBuckets, bins: usize) -> Self {
        Self {
            bins,
            correct: bin_counts(&buckets.correct, bins),
            incorrect: bin_counts(&buckets.incorrect, bins),
        }
    }

    /// Write the chart as SVG with "Confidence" / "Frequency" axes
    pub fn write_svg(&self, title: &str, path: &Path) -> Result<()> {
        let series = [
            HistogramSeries {
                name: "Correct".to_string(),
                counts: self.correct.clone(),
                color: COLOR_CORRECT.to_string(),
            },
            HistogramSeries {
                name: "Incorrect".to_string(),
                counts: self.incorrect.clone(),
                color: COLOR_INCORRECT.to_string(),
            },
        ];
        generate_histogram_chart(title, "Confidence", "Frequency", &series, path)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bin_counts_and_last_bin() {
        let counts = bin_counts(&[0.0, 0.049, 0.05, 0.5, 0.999, 1.0], 20);
        assert_eq!(counts.len(), 20);
        assert_eq!(counts[0], 2);
        assert_eq!(counts[1], 1);
        assert_eq!(counts[10], 1);
        assert_eq!(counts[19], 2);
        assert_eq!(counts.iter().sum::<usize>(), 6);
    }

    #[test]
    fn test_out_of_range_values_are_clamped() {
        let counts = bin_counts(&[-0.5, 1.5, f32::NAN], 4);
        assert_eq!(counts, vec![1, 0, 0, 1]);
    }

    #[test]
    fn test_histogram_from_buckets() {
        let buckets = ConfidenceBuckets {
            correct: vec![0.95, 0.9, 0.99],
            incorrect: vec![0.3, 0.55],
        };
        let histogram = ConfidenceHistogram::from_buckets(&buckets, DEFAULT_BINS);

        assert_eq!(histogram.correct.iter().sum::<usize>(), 3);
        assert_eq!(histogram.incorrect[6], 1);
        assert_eq!(histogram.incorrect[11], 1);
    }

    #[test]
    fn test_write_svg() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hist.svg");
        let histogram = ConfidenceHistogram::from_buckets(
            &ConfidenceBuckets {
                correct: vec![0.9],
                incorrect: vec![0.2],
            },
            DEFAULT_BINS,
        );

        histogram.write_svg("EDL on CIFAR-10", &path).unwrap();
        let svg = std::fs::read_to_string(&path).unwrap();
        assert!(svg.contains("Confidence"));
        assert!(svg.contains("Frequency"));
    }
}
