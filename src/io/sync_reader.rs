//! Synchronous command-log reader with iterator interface
//!
//! Provides a streaming iterator over replay commands from a CSV command
//! log. Delegates format concerns to the csv_format module.
//!
//! # Error Handling
//!
//! - Fatal errors (file not found, I/O errors) are returned from `new()`
//! - Individual row parsing errors are yielded as Err variants in the
//!   iterator, with line numbers for debugging
//!
//! # Memory Efficiency
//!
//! Rows are read one at a time; memory usage does not grow with the log.

use crate::io::csv_format::{convert_csv_command, CsvCommand};
use crate::types::ReplayCommand;
use csv::{ReaderBuilder, Trim};
use std::fs::File;
use std::path::Path;

/// Synchronous CSV command-log reader
///
/// Provides an iterator interface over validated replay commands.
#[derive(Debug)]
pub struct SyncReader {
    reader: csv::Reader<File>,
    line_num: usize,
}

impl SyncReader {
    /// Create a new SyncReader from a file path
    ///
    /// The CSV reader trims whitespace and allows flexible field counts for
    /// the per-operation optional columns.
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the command-log CSV file
    ///
    /// # Returns
    ///
    /// * `Ok(SyncReader)` if file opened successfully
    /// * `Err(String)` if file could not be opened
    pub fn new(path: &Path) -> Result<Self, String> {
        let file = File::open(path)
            .map_err(|e| format!("Failed to open file '{}': {}", path.display(), e))?;

        let reader = ReaderBuilder::new()
            .trim(Trim::All)
            .flexible(true)
            .buffer_capacity(8 * 1024)
            .from_reader(file);

        Ok(Self {
            reader,
            line_num: 0,
        })
    }
}

impl Iterator for SyncReader {
    type Item = Result<ReplayCommand, String>;

    /// Get the next replay command from the log
    ///
    /// # Returns
    ///
    /// * `Some(Ok(ReplayCommand))` - Successfully parsed command
    /// * `Some(Err(String))` - Parse or conversion error with line number
    /// * `None` - End of file reached
    fn next(&mut self) -> Option<Self::Item> {
        let mut deserializer = self.reader.deserialize::<CsvCommand>();

        match deserializer.next()? {
            Ok(row) => {
                self.line_num += 1;
                // Line numbers are 1-based and the header occupies line 1
                Some(
                    convert_csv_command(row)
                        .map_err(|e| format!("Line {}: {}", self.line_num + 1, e)),
                )
            }
            Err(e) => {
                self.line_num += 1;
                Some(Err(format!(
                    "Line {}: CSV parse error: {}",
                    self.line_num + 1,
                    e
                )))
            }
        }
    }
}
