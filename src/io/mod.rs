//! I/O module
//!
//! Handles command-log parsing and booking-state output.
//!
//! # Components
//!
//! - `csv_format` - CSV format handling (row validation, output serialization)
//! - `sync_reader` - Synchronous command reader with iterator interface
//! - `async_reader` - Asynchronous command reader with batch interface

pub mod async_reader;
pub mod csv_format;
pub mod sync_reader;

pub use async_reader::AsyncReader;
pub use csv_format::{convert_csv_command, write_bookings_csv, CsvCommand};
pub use sync_reader::SyncReader;
