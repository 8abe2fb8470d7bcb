//! Asynchronous batch replay strategy
//!
//! Multi-threaded replay with per-listing partitioning: each batch of
//! commands is split into lanes by listing ID, lanes run on separate tasks,
//! and commands within a lane are applied in log order. Batches are drained
//! sequentially, so a listing whose commands span multiple batches still
//! sees them in order — the same discipline the engine's own locking
//! provides, lifted to the pipeline.
//!
//! This mirrors the core's concurrency model: the listing calendar is the
//! only shared contention point, so listing lanes are the natural unit of
//! parallelism.

use crate::core::BookingEngine;
use crate::io::async_reader::AsyncReader;
use crate::io::csv_format::write_bookings_csv;
use crate::strategy::{build_engine, ReplayStrategy};
use crate::types::{ListingId, ReplayCommand};
use chrono::NaiveDate;
use std::collections::HashMap;
use std::io::Write;
use std::path::Path;
use tracing::warn;

/// Configuration for batch replay
#[derive(Clone, Debug)]
pub struct BatchConfig {
    /// Number of commands per batch
    pub batch_size: usize,
    /// Worker threads for lane processing
    pub max_concurrent_batches: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            batch_size: 1000,
            max_concurrent_batches: num_cpus::get(),
        }
    }
}

impl BatchConfig {
    /// Create a new BatchConfig, falling back to defaults on zero values
    pub fn new(batch_size: usize, max_concurrent_batches: usize) -> Self {
        let default = Self::default();

        let batch_size = if batch_size == 0 {
            warn!(
                "Invalid batch_size (0), using default ({})",
                default.batch_size
            );
            default.batch_size
        } else {
            batch_size
        };

        let max_concurrent_batches = if max_concurrent_batches == 0 {
            warn!(
                "Invalid max_concurrent_batches (0), using default ({})",
                default.max_concurrent_batches
            );
            default.max_concurrent_batches
        } else {
            max_concurrent_batches
        };

        Self {
            batch_size,
            max_concurrent_batches,
        }
    }
}

/// Partition a batch of commands into per-listing lanes
///
/// # Guarantees
///
/// - Each command appears in exactly one lane
/// - Commands for each listing keep their original order
/// - Lanes contain only commands for a single listing
pub fn partition_by_listing(
    batch: Vec<ReplayCommand>,
) -> HashMap<ListingId, Vec<ReplayCommand>> {
    let mut lanes: HashMap<ListingId, Vec<ReplayCommand>> = HashMap::new();
    for command in batch {
        lanes.entry(command.listing).or_default().push(command);
    }
    lanes
}

/// Apply one batch, lanes in parallel, commands within a lane in order
async fn process_batch(engine: &BookingEngine, batch: Vec<ReplayCommand>) {
    let mut tasks = Vec::new();
    for (_, lane) in partition_by_listing(batch) {
        let engine = engine.clone();
        tasks.push(tokio::spawn(async move {
            for command in lane {
                if let Err(e) = engine.apply(command).await {
                    warn!("Command failed: {e}");
                }
            }
        }));
    }
    for task in tasks {
        if let Err(e) = task.await {
            warn!("Lane task failed: {e}");
        }
    }
}

/// Asynchronous batch replay strategy
///
/// Send + Sync and built on thread-safe engine components, so lanes can be
/// dispatched across the runtime's worker threads.
#[derive(Debug, Clone)]
pub struct AsyncReplayStrategy {
    config: BatchConfig,
    today: Option<NaiveDate>,
}

impl AsyncReplayStrategy {
    /// Create a strategy with the given batch configuration
    pub fn new(config: BatchConfig, today: Option<NaiveDate>) -> Self {
        Self { config, today }
    }
}

impl ReplayStrategy for AsyncReplayStrategy {
    /// Replay the command log in per-listing lanes and write final states
    ///
    /// Batches are processed sequentially; within each batch, lanes for
    /// different listings run concurrently. Fatal errors (file not found,
    /// runtime construction) are returned; individual command errors are
    /// logged and replay continues.
    fn process(&self, input_path: &Path, output: &mut dyn Write) -> Result<(), String> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(self.config.max_concurrent_batches)
            .enable_all()
            .build()
            .map_err(|e| format!("Failed to create tokio runtime: {}", e))?;

        runtime.block_on(async {
            let engine = build_engine(self.today);

            let file = tokio::fs::File::open(input_path)
                .await
                .map_err(|e| format!("Failed to open file '{}': {}", input_path.display(), e))?;

            // Wrap the tokio file in a compatibility layer for csv-async
            let compat_file = tokio_util::compat::TokioAsyncReadCompatExt::compat(file);
            let mut reader = AsyncReader::new(compat_file);

            // Drain batches sequentially so per-listing ordering holds
            // across batch boundaries
            loop {
                let batch = reader.read_batch(self.config.batch_size).await;
                if batch.is_empty() {
                    break;
                }
                process_batch(&engine, batch).await;
            }

            write_bookings_csv(&engine.bookings(), output)?;
            Ok(())
        })
    }
}
