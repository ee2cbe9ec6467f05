//! Training module for the three uncertainty methods
//!
//! - `config`: JSON experiment configuration
//! - `trainer`: shared epoch loop (shuffling, batching, Adam updates)
//! - `edl`, `ensemble`, `confidnet`: one runner per method, each training,
//!   evaluating on the test split and writing the report

pub mod confidnet;
pub mod config;
pub mod edl;
pub mod ensemble;
pub mod trainer;

use std::path::PathBuf;

use colored::Colorize;

use crate::dataset::{ensure_dataset, load_split, DatasetConfig, ImageDataset, Split};
use crate::inference::EvaluationReport;
use crate::utils::error::Result;

pub use config::{
    ConfidNetSettings, EdlSettings, EnsembleSettings, ExperimentConfig, MemberKind, Method,
    ModelSettings, TrainingConfig,
};
pub use confidnet::run_confidnet;
pub use edl::run_edl;
pub use ensemble::run_ensemble;
pub use trainer::{count_correct, train_model, EpochSummary, TrainStep, TrainingHistory};

/// Train and test splits of one dataset, decoded in memory
#[derive(Debug, Clone)]
pub struct ExperimentData {
    pub dataset: DatasetConfig,
    pub train: ImageDataset,
    pub test: ImageDataset,
}

impl ExperimentData {
    /// Load both splits as configured, downloading the dataset if allowed
    ///
    /// `max_samples` caps both splits, each subsampled with the run seed.
    pub fn load(config: &ExperimentConfig) -> Result<Self> {
        let dataset = config.dataset_config();
        ensure_dataset(dataset.kind, &config.data_dir, config.download)?;

        let train = ImageDataset::new(load_split(&dataset, &config.data_dir, Split::Train)?);
        let test = ImageDataset::new(load_split(&dataset, &config.data_dir, Split::Test)?);

        let seed = config.training.seed;
        let (train, test) = match config.training.max_samples {
            Some(max) => (train.subsample(max, seed), test.subsample(max, seed.wrapping_add(1))),
            None => (train, test),
        };

        Ok(Self::new(dataset, train, test))
    }

    pub fn new(dataset: DatasetConfig, train: ImageDataset, test: ImageDataset) -> Self {
        Self {
            dataset,
            train,
            test,
        }
    }
}

/// Files and results produced by one experiment
#[derive(Debug, Clone)]
pub struct ExperimentOutcome {
    pub report: EvaluationReport,
    pub report_path: PathBuf,
    pub chart_path: PathBuf,
    pub checkpoints: Vec<PathBuf>,
}

fn print_run_header(method: Method, config: &ExperimentConfig, data: &ExperimentData) {
    use burn::data::dataset::Dataset;

    let t = &config.training;
    println!();
    println!("{}", format!("{} on {}", method, data.dataset.kind).green().bold());
    println!("  Training samples: {}", data.train.len());
    println!("  Test samples:     {}", data.test.len());
    println!("  Resolution:       {}x{}", data.dataset.input_resolution, data.dataset.input_resolution);
    println!("  Epochs:           {}", t.epochs);
    println!("  Batch size:       {}", t.batch_size);
    println!("  Learning rate:    {}", t.learning_rate);
    println!("  Augmentation:     {}", if t.augment { "on" } else { "off" });
    println!("  Backend:          {}", crate::backend::backend_name());
    println!();
}

/// Write the report files and print the summary
fn finish_experiment(
    report: EvaluationReport,
    config: &ExperimentConfig,
    checkpoints: Vec<PathBuf>,
) -> Result<ExperimentOutcome> {
    let (report_path, chart_path) = report.write_outputs(&config.output_dir)?;
    report.print_summary();
    println!("  Report:    {:?}", report_path);
    println!("  Histogram: {:?}", chart_path);
    for checkpoint in &checkpoints {
        println!("  Checkpoint: {:?}", checkpoint);
    }

    Ok(ExperimentOutcome {
        report,
        report_path,
        chart_path,
        checkpoints,
    })
}
