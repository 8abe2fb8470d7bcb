use crate::strategy::BatchConfig;
use chrono::NaiveDate;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Replay a booking command log through the lifecycle engine
#[derive(Parser, Debug)]
#[command(name = "rental-booking-engine")]
#[command(about = "Replay a rental-booking command log", long_about = None)]
pub struct CliArgs {
    /// Input CSV file path containing the command log
    #[arg(value_name = "INPUT", help = "Path to the input CSV command log")]
    pub input_file: PathBuf,

    /// Replay strategy to use
    #[arg(
        long = "strategy",
        value_name = "STRATEGY",
        default_value = "async",
        help = "Replay strategy: 'sync' for in-order or 'async' for per-listing lanes"
    )]
    pub strategy: StrategyType,

    /// Number of commands per batch (async mode only)
    #[arg(
        long = "batch-size",
        value_name = "SIZE",
        help = "Number of commands per batch (default: 1000)"
    )]
    pub batch_size: Option<usize>,

    /// Maximum number of concurrent listing lanes (async mode only)
    #[arg(
        long = "max-concurrent",
        value_name = "COUNT",
        help = "Maximum lanes processing concurrently (default: CPU cores)"
    )]
    pub max_concurrent_batches: Option<usize>,

    /// Pin the engine clock to a day for deterministic replay
    #[arg(
        long = "today",
        value_name = "DATE",
        help = "Treat DATE (YYYY-MM-DD) as today; defaults to the system clock"
    )]
    pub today: Option<NaiveDate>,
}

/// Available replay strategies
#[derive(Clone, Debug, ValueEnum)]
pub enum StrategyType {
    Sync,
    Async,
}

impl CliArgs {
    /// Create a BatchConfig from CLI arguments
    ///
    /// Uses CLI values where provided and falls back to defaults, with the
    /// same zero-value fallback behavior as [`BatchConfig::new`].
    ///
    /// # Returns
    ///
    /// A `BatchConfig` with values from CLI arguments or defaults.
    pub fn to_batch_config(&self) -> BatchConfig {
        if self.batch_size.is_some() || self.max_concurrent_batches.is_some() {
            let default = BatchConfig::default();
            BatchConfig::new(
                self.batch_size.unwrap_or(default.batch_size),
                self.max_concurrent_batches
                    .unwrap_or(default.max_concurrent_batches),
            )
        } else {
            BatchConfig::default()
        }
    }
}
