//! Rental Booking Engine CLI
//!
//! Command-line interface for replaying booking command logs from CSV files.
//!
//! # Usage
//!
//! ```bash
//! cargo run -- commands.csv > bookings.csv
//! cargo run -- --strategy sync commands.csv > bookings.csv
//! cargo run -- --strategy async --batch-size 2000 --max-concurrent 8 commands.csv > bookings.csv
//! cargo run -- --today 2026-08-01 commands.csv > bookings.csv
//! ```
//!
//! The program reads booking commands from the input CSV file, drives them
//! through the booking lifecycle engine using the selected replay strategy,
//! and outputs the final booking states to stdout. Set `RUST_LOG` to see
//! transition and error logs on stderr.
//!
//! # Replay Strategies
//!
//! - **sync**: single-threaded, strictly in log order
//! - **async**: batched, with per-listing lanes running in parallel (default)
//!
//! # Exit Codes
//!
//! - 0: Success
//! - 1: Error (missing arguments, file not found, file not readable, etc.)

use rental_booking_engine::cli;
use rental_booking_engine::strategy;
use std::process;
use tracing_subscriber::EnvFilter;

fn main() {
    // Stderr logging, filtered by RUST_LOG (stdout carries the CSV output)
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = cli::parse_args();

    // Create the appropriate replay strategy based on CLI arguments
    let strategy = {
        let config = if matches!(args.strategy, cli::StrategyType::Async) {
            Some(args.to_batch_config())
        } else {
            None
        };
        strategy::create_strategy(args.strategy, args.today, config)
    };

    // Replay the command log; final booking states go to stdout
    let mut output = std::io::stdout();
    if let Err(e) = strategy.process(&args.input_file, &mut output) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}
