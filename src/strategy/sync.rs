//! Synchronous replay strategy
//!
//! Single-threaded replay: commands are applied strictly in log order, one
//! at a time. This is the reference behavior the async strategy must match
//! per listing, and the right choice for small logs where spinning up a
//! worker pool costs more than it saves.
//!
//! Payment operations are async (the gateway call carries a timeout), so
//! the strategy runs the replay loop on a current-thread tokio runtime.

use crate::io::csv_format::write_bookings_csv;
use crate::io::sync_reader::SyncReader;
use crate::strategy::{build_engine, ReplayStrategy};
use chrono::NaiveDate;
use std::io::Write;
use std::path::Path;
use tracing::warn;

/// Synchronous, single-threaded replay strategy
#[derive(Debug, Clone, Copy)]
pub struct SyncReplayStrategy {
    /// Pinned replay day, or `None` for the system clock
    today: Option<NaiveDate>,
}

impl SyncReplayStrategy {
    /// Create a strategy, optionally pinning the engine clock
    pub fn new(today: Option<NaiveDate>) -> Self {
        Self { today }
    }
}

impl ReplayStrategy for SyncReplayStrategy {
    /// Replay the command log in order and write final booking states
    ///
    /// Fatal errors (file not found, runtime construction) are returned;
    /// individual command errors are logged and replay continues.
    fn process(&self, input_path: &Path, output: &mut dyn Write) -> Result<(), String> {
        let engine = build_engine(self.today);
        let reader = SyncReader::new(input_path)?;

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()
            .map_err(|e| format!("Failed to create tokio runtime: {}", e))?;

        runtime.block_on(async {
            for result in reader {
                match result {
                    Ok(command) => {
                        if let Err(e) = engine.apply(command).await {
                            warn!("Command failed: {e}");
                        }
                    }
                    Err(e) => warn!("CSV parsing error: {e}"),
                }
            }
        });

        write_bookings_csv(&engine.bookings(), output)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;
    use tempfile::NamedTempFile;

    fn create_temp_csv(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().expect("Failed to create temp file");
        file.write_all(content.as_bytes())
            .expect("Failed to write to temp file");
        file.flush().expect("Failed to flush temp file");
        file
    }

    fn today() -> Option<NaiveDate> {
        Some("2026-08-01".parse().unwrap())
    }

    #[test]
    fn test_sync_strategy_replays_lifecycle() {
        let content = "op,booking,listing,actor,start,end,price\n\
                       listing,,1,10,,,50.00\n\
                       request,1,1,20,2026-09-10,2026-09-12,\n\
                       approve,1,1,10,,,\n\
                       pay,1,1,20,,,\n\
                       capture,1,1,,,,\n";
        let file = create_temp_csv(content);

        let strategy = SyncReplayStrategy::new(today());
        let mut output = Vec::new();
        strategy.process(file.path(), &mut output).unwrap();

        let text = String::from_utf8(output).unwrap();
        assert!(text.contains("1,1,20,2026-09-10,2026-09-12,confirmed,160.50,ord-1-1,txn-"));
    }

    #[test]
    fn test_sync_strategy_handles_missing_file() {
        let strategy = SyncReplayStrategy::new(today());
        let mut output = Vec::new();

        let result = strategy.process(Path::new("nonexistent.csv"), &mut output);
        assert!(result.is_err());
        assert!(result.unwrap_err().contains("Failed to open file"));
    }

    #[test]
    fn test_sync_strategy_continues_past_failed_commands() {
        // Booking 2 collides with booking 1's approved range; the conflict
        // is logged and replay continues
        let content = "op,booking,listing,actor,start,end,price\n\
                       listing,,1,10,,,50.00\n\
                       request,1,1,20,2026-09-10,2026-09-12,\n\
                       request,2,1,21,2026-09-11,2026-09-13,\n\
                       approve,1,1,10,,,\n\
                       approve,2,1,10,,,\n";
        let file = create_temp_csv(content);

        let strategy = SyncReplayStrategy::new(today());
        let mut output = Vec::new();
        strategy.process(file.path(), &mut output).unwrap();

        let text = String::from_utf8(output).unwrap();
        assert!(text.contains("1,1,20,2026-09-10,2026-09-12,approved"));
        assert!(text.contains("2,1,21,2026-09-11,2026-09-13,requested"));
    }

    #[test]
    fn test_sync_strategy_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<SyncReplayStrategy>();
    }
}
