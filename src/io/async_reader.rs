//! Asynchronous reader for operation scripts
//!
//! Reads an operation script in fixed-size batches with csv-async, for the
//! async strategy.
//!
//! ```text
//! script file → AsyncReader → batches of OperationRecords → BatchProcessor
//!                   ↓
//!            csv_format module
//! ```
//!
//! Rows that fail to parse or convert are logged at `warn` and left out of
//! the batch; they never end the stream.

use crate::io::csv_format::{convert_operation_record, OperationCsvRecord};
use crate::types::OperationRecord;
use csv_async::AsyncReaderBuilder;
use futures::io::AsyncRead;
use futures::stream::StreamExt;
use tracing::warn;

/// Batch reader over any `futures::io::AsyncRead`
pub struct AsyncReader<R: AsyncRead + Unpin> {
    csv_reader: csv_async::AsyncDeserializer<R>,
}

impl<R: AsyncRead + Unpin + Send + 'static> AsyncReader<R> {
    /// Wrap a reader, trimming fields and tolerating ragged rows
    pub fn new(reader: R) -> Self {
        let csv_reader = AsyncReaderBuilder::new()
            .flexible(true)
            .trim(csv_async::Trim::All)
            .create_deserializer(reader);

        Self { csv_reader }
    }

    /// Read up to `batch_size` valid records
    ///
    /// Returns an empty batch once the input is exhausted. Invalid rows do
    /// not count toward the batch size.
    pub async fn read_batch(&mut self, batch_size: usize) -> Vec<OperationRecord> {
        let mut batch = Vec::with_capacity(batch_size);
        let mut records = self.csv_reader.deserialize::<OperationCsvRecord>();

        while batch.len() < batch_size {
            match records.next().await {
                Some(Ok(csv_record)) => match convert_operation_record(csv_record) {
                    Ok(record) => batch.push(record),
                    Err(e) => warn!(error = %e, "skipping invalid operation"),
                },
                Some(Err(e)) => warn!(error = %e, "skipping unparseable row"),
                None => break,
            }
        }

        batch
    }
}
