//! Asynchronous command-log reader with batch interface
//!
//! Provides batched reading of replay commands from a CSV command log,
//! for the async replay strategy. Delegates format concerns to the
//! csv_format module; invalid rows are logged and skipped so a bad line
//! never stalls the replay.

use crate::io::csv_format::{convert_csv_command, CsvCommand};
use crate::types::ReplayCommand;
use csv_async::AsyncReaderBuilder;
use futures::io::AsyncRead;
use futures::stream::StreamExt;
use tracing::warn;

/// Asynchronous CSV command-log reader
///
/// Reads validated commands in batches while keeping memory usage
/// proportional to the batch, not the file.
pub struct AsyncReader<R: AsyncRead + Unpin> {
    csv_reader: csv_async::AsyncDeserializer<R>,
}

impl<R: AsyncRead + Unpin + Send + 'static> AsyncReader<R> {
    /// Create a new AsyncReader from an async byte source
    pub fn new(reader: R) -> Self {
        let csv_reader = AsyncReaderBuilder::new()
            .flexible(true)
            .trim(csv_async::Trim::All)
            .create_deserializer(reader);

        Self { csv_reader }
    }

    /// Read up to `batch_size` replay commands
    ///
    /// Invalid rows are logged and skipped. Returns an empty vector at end
    /// of file.
    pub async fn read_batch(&mut self, batch_size: usize) -> Vec<ReplayCommand> {
        let mut batch = Vec::with_capacity(batch_size);
        let mut rows = self.csv_reader.deserialize::<CsvCommand>();

        while batch.len() < batch_size {
            match rows.next().await {
                Some(Ok(row)) => match convert_csv_command(row) {
                    Ok(command) => batch.push(command),
                    Err(e) => warn!("Row conversion error: {e}"),
                },
                Some(Err(e)) => warn!("CSV parse error: {e}"),
                None => break,
            }
        }

        batch
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ReplayAction;
    use futures::io::Cursor;

    const HEADER: &str = "op,booking,listing,actor,start,end,price\n";

    #[tokio::test]
    async fn test_async_reader_read_batch() {
        let content = format!(
            "{HEADER}\
             listing,,1,10,,,50.00\n\
             request,1,1,20,2026-09-10,2026-09-12,\n\
             approve,1,1,10,,,\n"
        );
        let mut reader = AsyncReader::new(Cursor::new(content.into_bytes()));

        let batch = reader.read_batch(2).await;
        assert_eq!(batch.len(), 2);
        assert!(matches!(batch[0].action, ReplayAction::AddListing { .. }));
        assert!(matches!(batch[1].action, ReplayAction::Request { .. }));

        let batch = reader.read_batch(2).await;
        assert_eq!(batch.len(), 1);
        assert!(matches!(batch[0].action, ReplayAction::Approve { .. }));

        assert!(reader.read_batch(2).await.is_empty());
    }

    #[tokio::test]
    async fn test_async_reader_empty_log() {
        let mut reader = AsyncReader::new(Cursor::new(HEADER.as_bytes().to_vec()));
        assert!(reader.read_batch(10).await.is_empty());
    }

    #[tokio::test]
    async fn test_async_reader_skips_invalid_rows() {
        let content = format!(
            "{HEADER}\
             teleport,1,1,20,,,\n\
             listing,,1,10,,,50.00\n"
        );
        let mut reader = AsyncReader::new(Cursor::new(content.into_bytes()));

        let batch = reader.read_batch(10).await;
        assert_eq!(batch.len(), 1);
        assert!(matches!(batch[0].action, ReplayAction::AddListing { .. }));
    }
}
