//! Logging Module
//!
//! Structured logging through the `tracing` crate. The console progress
//! lines required by the experiments (`Epoch [i/N] Loss: ...`) are printed
//! directly by the trainers; everything else goes through `tracing`.

use std::time::Instant;

use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use super::format_duration;

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Minimum log level to display
    pub level: LogLevel,
    /// Whether to include target (module path)
    pub include_target: bool,
    /// Whether to include thread IDs
    pub include_thread_ids: bool,
    /// Whether to use ANSI colors
    pub ansi_colors: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            include_target: false,
            include_thread_ids: false,
            ansi_colors: true,
        }
    }
}

impl LogConfig {
    /// Verbose config for debugging
    pub fn verbose() -> Self {
        Self {
            level: LogLevel::Debug,
            include_target: true,
            include_thread_ids: true,
            ansi_colors: true,
        }
    }

    /// Errors only
    pub fn quiet() -> Self {
        Self {
            level: LogLevel::Error,
            include_target: false,
            include_thread_ids: false,
            ansi_colors: true,
        }
    }
}

/// Log level enum
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Convert to tracing Level
    pub fn to_tracing_level(&self) -> Level {
        match self {
            LogLevel::Trace => Level::TRACE,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Info => Level::INFO,
            LogLevel::Warn => Level::WARN,
            LogLevel::Error => Level::ERROR,
        }
    }

    /// Parse a level name, falling back to `Info`
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "trace" => LogLevel::Trace,
            "debug" => LogLevel::Debug,
            "info" => LogLevel::Info,
            "warn" | "warning" => LogLevel::Warn,
            "error" => LogLevel::Error,
            _ => LogLevel::Info,
        }
    }
}

/// Initialize logging with the given configuration
///
/// Fails if a global subscriber has already been installed.
pub fn init_logging(config: &LogConfig) -> Result<(), String> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(config.level.to_tracing_level())
        .with_ansi(config.ansi_colors)
        .with_target(config.include_target)
        .with_thread_ids(config.include_thread_ids)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| format!("Failed to initialize logging: {}", e))?;

    Ok(())
}

/// Tracks wall-clock time of a training run and logs per-epoch timing
pub struct TrainingLogger {
    run_name: String,
    total_epochs: usize,
    epoch_start: Instant,
    training_start: Instant,
}

impl TrainingLogger {
    pub fn new(run_name: impl Into<String>, total_epochs: usize) -> Self {
        let now = Instant::now();
        Self {
            run_name: run_name.into(),
            total_epochs,
            epoch_start: now,
            training_start: now,
        }
    }

    pub fn start_epoch(&mut self, epoch: usize) {
        self.epoch_start = Instant::now();
        tracing::debug!(
            "[{}] epoch {}/{} started",
            self.run_name,
            epoch + 1,
            self.total_epochs
        );
    }

    pub fn end_epoch(&self, epoch: usize, loss: f64, train_accuracy: f64) {
        let epoch_secs = self.epoch_start.elapsed().as_secs_f64();
        let total_secs = self.training_start.elapsed().as_secs_f64();
        let remaining = self.total_epochs.saturating_sub(epoch + 1);
        let eta = remaining as f64 * total_secs / (epoch + 1) as f64;

        tracing::info!(
            "[{}] epoch {}/{} in {} | loss {:.4} | train acc {:.2}% | ETA {}",
            self.run_name,
            epoch + 1,
            self.total_epochs,
            format_duration(epoch_secs),
            loss,
            train_accuracy * 100.0,
            format_duration(eta)
        );
    }

    pub fn log_complete(&self) {
        tracing::info!(
            "[{}] training complete: {} epochs in {}",
            self.run_name,
            self.total_epochs,
            format_duration(self.training_start.elapsed().as_secs_f64())
        );
    }
}
