//! CIFAR Uncertainty CLI
//!
//! Entry point for training and evaluating EDL, Deep Ensembles and ConfidNet
//! on CIFAR-10, CIFAR-100 and STL-10.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use tracing::info;

use cifar_uncertainty::backend::{backend_name, default_device, TrainingBackend};
use cifar_uncertainty::dataset::{
    download::download_dataset, ensure_dataset, load_split, DatasetConfig, DatasetKind,
    ImageDataset, Split,
};
use cifar_uncertainty::inference::EvaluationReport;
use cifar_uncertainty::training::{
    run_confidnet, run_edl, run_ensemble, ExperimentConfig, ExperimentData, MemberKind,
};
use cifar_uncertainty::utils::logging::{init_logging, LogConfig, LogLevel};

/// Uncertainty estimation on CIFAR-10/100 and STL-10
///
/// Trains Evidential Deep Learning, Deep Ensemble or ConfidNet classifiers
/// and compares the confidence of correct and incorrect predictions.
#[derive(Parser, Debug)]
#[command(name = "cifar_uncertainty")]
#[command(version)]
#[command(about = "Uncertainty estimation for image classifiers with Burn", long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true, default_value = "false")]
    verbose: bool,

    /// Only log errors
    #[arg(short, long, global = true, default_value = "false")]
    quiet: bool,

    /// Explicit log level (trace, debug, info, warn, error)
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,
}

/// Flags shared by the training commands; each overrides the JSON config
#[derive(Args, Debug, Clone)]
struct RunArgs {
    /// Dataset to train on
    #[arg(short, long, value_enum)]
    dataset: Option<DatasetKind>,

    /// JSON experiment configuration to start from
    #[arg(long)]
    config: Option<PathBuf>,

    /// Directory holding (or receiving) the dataset
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Directory for reports, histograms and checkpoints
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Number of training epochs
    #[arg(short, long)]
    epochs: Option<usize>,

    /// Batch size for training and evaluation
    #[arg(short, long)]
    batch_size: Option<usize>,

    /// Adam learning rate
    #[arg(short, long)]
    learning_rate: Option<f64>,

    /// Random seed for shuffling, subsampling and augmentation
    #[arg(long)]
    seed: Option<u64>,

    /// Use at most this many training and test samples
    #[arg(long)]
    max_samples: Option<usize>,

    /// Resize images to this side length
    #[arg(long)]
    resolution: Option<usize>,

    /// Random flip + padded crop on training batches
    #[arg(long, default_value = "false")]
    augment: bool,

    /// Save trained weights to the output directory
    #[arg(long, default_value = "false")]
    save_model: bool,

    /// Fail instead of downloading a missing dataset
    #[arg(long, default_value = "false")]
    no_download: bool,
}

impl RunArgs {
    /// Load the JSON config (or defaults) and apply the flags on top
    fn to_config(&self) -> Result<ExperimentConfig> {
        let mut config = match &self.config {
            Some(path) => ExperimentConfig::load(path)
                .with_context(|| format!("Failed to load config {:?}", path))?,
            None => ExperimentConfig::default(),
        };

        if let Some(dataset) = self.dataset {
            config.dataset = dataset;
        }
        if let Some(dir) = &self.data_dir {
            config.data_dir = dir.clone();
        }
        if let Some(dir) = &self.output_dir {
            config.output_dir = dir.clone();
        }
        if let Some(epochs) = self.epochs {
            config.training.epochs = epochs;
        }
        if let Some(batch_size) = self.batch_size {
            config.training.batch_size = batch_size;
        }
        if let Some(lr) = self.learning_rate {
            config.training.learning_rate = lr;
        }
        if let Some(seed) = self.seed {
            config.training.seed = seed;
        }
        if self.max_samples.is_some() {
            config.training.max_samples = self.max_samples;
        }
        if self.resolution.is_some() {
            config.input_resolution = self.resolution;
        }
        config.training.augment |= self.augment;
        config.save_model |= self.save_model;
        if self.no_download {
            config.download = false;
        }

        config.validate()?;
        Ok(config)
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Train an Evidential Deep Learning classifier (Dirichlet head)
    Edl {
        #[command(flatten)]
        run: RunArgs,

        /// Weight of the Dirichlet KL regulariser (0 disables it)
        #[arg(long)]
        kl_weight: Option<f64>,

        /// Ramp the KL weight up linearly over this many epochs
        #[arg(long)]
        kl_annealing_epochs: Option<usize>,
    },

    /// Train a Deep Ensemble of independently initialised CNNs
    Ensemble {
        #[command(flatten)]
        run: RunArgs,

        /// Number of ensemble members
        #[arg(short, long)]
        members: Option<usize>,

        /// Head of each member
        #[arg(long, value_enum)]
        member_kind: Option<MemberKind>,
    },

    /// Train a classifier with a ConfidNet confidence head
    Confidnet {
        #[command(flatten)]
        run: RunArgs,

        /// Weight of the confidence loss relative to cross-entropy
        #[arg(long)]
        confidence_loss_weight: Option<f64>,
    },

    /// Download and extract a dataset
    Download {
        /// Dataset to download
        #[arg(short, long, value_enum, default_value = "cifar10")]
        dataset: DatasetKind,

        /// Target directory
        #[arg(long, default_value = "data")]
        data_dir: PathBuf,
    },

    /// Show dataset statistics (class distribution, channel mean/std)
    Stats {
        /// Dataset to inspect
        #[arg(short, long, value_enum, default_value = "cifar10")]
        dataset: DatasetKind,

        /// Directory holding the dataset
        #[arg(long, default_value = "data")]
        data_dir: PathBuf,
    },

    /// Print the summary of a saved report
    Summary {
        /// `<method>_<dataset>_report.json` written by a training run
        report: PathBuf,
    },

    /// Write the default experiment configuration as JSON
    InitConfig {
        /// Output file
        #[arg(short, long, default_value = "experiment.json")]
        output: PathBuf,

        /// Dataset the configuration targets
        #[arg(short, long, value_enum, default_value = "cifar10")]
        dataset: DatasetKind,
    },
}

fn main() {
    let cli = Cli::parse();

    let mut log_config = if cli.verbose {
        LogConfig::verbose()
    } else if cli.quiet {
        LogConfig::quiet()
    } else {
        LogConfig::default()
    };
    if let Some(level) = &cli.log_level {
        log_config.level = LogLevel::parse(level);
    }
    let _ = init_logging(&log_config);

    if let Err(e) = run(cli.command) {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

fn run(command: Commands) -> Result<()> {
    match command {
        Commands::Edl {
            run,
            kl_weight,
            kl_annealing_epochs,
        } => {
            let mut config = run.to_config()?;
            if let Some(weight) = kl_weight {
                config.edl.kl_weight = weight;
            }
            if kl_annealing_epochs.is_some() {
                config.edl.kl_annealing_epochs = kl_annealing_epochs;
            }
            let data = load_data(&config)?;
            run_edl::<TrainingBackend>(&config, &data, &default_device())?;
        }

        Commands::Ensemble {
            run,
            members,
            member_kind,
        } => {
            let mut config = run.to_config()?;
            if let Some(members) = members {
                config.ensemble.members = members;
            }
            if let Some(kind) = member_kind {
                config.ensemble.member_kind = kind;
            }
            let data = load_data(&config)?;
            run_ensemble::<TrainingBackend>(&config, &data, &default_device())?;
        }

        Commands::Confidnet {
            run,
            confidence_loss_weight,
        } => {
            let mut config = run.to_config()?;
            if let Some(weight) = confidence_loss_weight {
                config.confidnet.confidence_loss_weight = weight;
            }
            let data = load_data(&config)?;
            run_confidnet::<TrainingBackend>(&config, &data, &default_device())?;
        }

        Commands::Download { dataset, data_dir } => cmd_download(dataset, data_dir)?,

        Commands::Stats { dataset, data_dir } => cmd_stats(dataset, data_dir)?,

        Commands::Summary { report } => {
            let report = EvaluationReport::load_json(&report)
                .with_context(|| format!("Failed to read report {:?}", report))?;
            println!(
                "Report from {} ({} backend, {} test samples)",
                report.timestamp, report.backend, report.num_samples
            );
            report.print_summary();
        }

        Commands::InitConfig { output, dataset } => {
            ExperimentConfig::new(dataset).save(&output)?;
            println!("{} Wrote default configuration to {:?}", "✓".green(), output);
        }
    }

    Ok(())
}

fn load_data(config: &ExperimentConfig) -> Result<ExperimentData> {
    println!("{}", "Loading Dataset...".cyan());
    info!("Backend: {}", backend_name());
    let data = ExperimentData::load(config)
        .with_context(|| format!("Failed to load {} from {:?}", config.dataset, config.data_dir))?;
    Ok(data)
}

fn cmd_download(dataset: DatasetKind, data_dir: PathBuf) -> Result<()> {
    println!("{} {} into {:?}", "Downloading".cyan(), dataset, data_dir);
    download_dataset(dataset, &data_dir)?;
    let root = ensure_dataset(dataset, &data_dir, false)?;
    println!("{} {} ready at {:?}", "✓".green(), dataset, root);
    Ok(())
}

fn cmd_stats(dataset: DatasetKind, data_dir: PathBuf) -> Result<()> {
    info!("Computing dataset statistics for {} in {:?}", dataset, data_dir);
    ensure_dataset(dataset, &data_dir, false)?;

    let config = DatasetConfig::for_kind(dataset);
    let train = ImageDataset::new(load_split(&config, &data_dir, Split::Train)?);
    let test = ImageDataset::new(load_split(&config, &data_dir, Split::Test)?);

    println!();
    println!("{}", format!("{} statistics", dataset).cyan().bold());
    println!("  Training samples: {}", train.items().len());
    println!("  Test samples:     {}", test.items().len());
    println!("  Resolution:       {}x{}", config.input_resolution, config.input_resolution);

    let (mean, std) = train.channel_statistics();
    println!(
        "  Channel mean:     ({:.4}, {:.4}, {:.4})  configured ({:.4}, {:.4}, {:.4})",
        mean[0], mean[1], mean[2], config.mean[0], config.mean[1], config.mean[2]
    );
    println!(
        "  Channel std:      ({:.4}, {:.4}, {:.4})  configured ({:.4}, {:.4}, {:.4})",
        std[0], std[1], std[2], config.std[0], config.std[1], config.std[2]
    );

    println!();
    println!("{}", "Class distribution (train / test):".cyan());
    let train_counts = train.class_distribution(config.num_classes);
    let test_counts = test.class_distribution(config.num_classes);
    for (label, (train_count, test_count)) in train_counts.iter().zip(&test_counts).enumerate() {
        let name = dataset.class_name(label).unwrap_or("?");
        println!("  {:>3} {:<16} {:>6} / {:>5}", label, name, train_count, test_count);
    }

    Ok(())
}
