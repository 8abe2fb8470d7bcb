//! Replay strategy module
//!
//! This module defines the Strategy pattern for complete command-log replay
//! pipelines, encompassing CSV parsing, engine dispatch and booking-state
//! output. This allows different replay implementations (synchronous,
//! asynchronous per-listing batches) to be selected at runtime.

use crate::cli::StrategyType;
use crate::core::{BookingEngine, Clock, FixedClock, GatewayClient, SimulatedGateway, SystemClock};
use chrono::NaiveDate;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

pub mod r#async;
pub mod sync;

pub use self::r#async::{AsyncReplayStrategy, BatchConfig};
pub use sync::SyncReplayStrategy;

/// Timeout applied to every simulated-gateway call during replay
const GATEWAY_TIMEOUT: Duration = Duration::from_secs(5);

/// Replay strategy trait for complete command-log pipelines
///
/// Each strategy reads commands from a CSV command log, applies them through
/// the booking engine, and writes the final booking states to output.
pub trait ReplayStrategy: Send + Sync {
    /// Replay commands from the input file and write results to output
    ///
    /// # Arguments
    ///
    /// * `input_path` - Path to the input CSV command log
    /// * `output` - Mutable reference to a writer for the booking states
    ///
    /// # Returns
    ///
    /// * `Ok(())` if replay completed (possibly with recoverable errors)
    /// * `Err(String)` if a fatal error occurred (file not found, I/O error)
    ///
    /// # Errors
    ///
    /// Individual command failures (conflicts, declines, bad rows) are
    /// logged and skipped; replay continues with the next command. Only
    /// fatal pipeline errors are returned.
    fn process(&self, input_path: &Path, output: &mut dyn Write) -> Result<(), String>;
}

/// Build the replay engine over the simulated gateway
///
/// When `today` is given the clock is pinned to it, making historical logs
/// replayable deterministically; otherwise the system clock is used.
pub(crate) fn build_engine(today: Option<NaiveDate>) -> BookingEngine {
    let clock: Arc<dyn Clock> = match today {
        Some(day) => Arc::new(FixedClock::at_day(day)),
        None => Arc::new(SystemClock),
    };
    BookingEngine::new(
        Arc::new(SimulatedGateway::new()) as Arc<dyn GatewayClient>,
        GATEWAY_TIMEOUT,
        clock,
    )
}

/// Create a replay strategy based on the specified strategy type
///
/// # Arguments
///
/// * `strategy_type` - The type of strategy to create (Sync or Async)
/// * `today` - Optional pinned replay day
/// * `config` - Optional batch configuration (ignored for sync)
///
/// # Returns
///
/// A boxed trait object implementing the ReplayStrategy trait
pub fn create_strategy(
    strategy_type: StrategyType,
    today: Option<NaiveDate>,
    config: Option<BatchConfig>,
) -> Box<dyn ReplayStrategy> {
    match strategy_type {
        StrategyType::Sync => Box::new(SyncReplayStrategy::new(today)),
        StrategyType::Async => {
            let config = config.unwrap_or_default();
            Box::new(AsyncReplayStrategy::new(config, today))
        }
    }
}
