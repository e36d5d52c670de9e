//! Synchronous reader for operation scripts
//!
//! `SyncReader` streams an operation script one row at a time through
//! `csv::Reader`, converting each row with the csv_format module. Rows that
//! fail to parse or convert are yielded as `Err` with their line number, so a
//! caller can log and skip them without stopping the run.
//!
//! ```no_run
//! use rust_banking_engine::io::sync_reader::SyncReader;
//! use std::path::Path;
//!
//! let reader = SyncReader::new(Path::new("operations.csv")).unwrap();
//! for result in reader {
//!     match result {
//!         Ok(record) => println!("Applying operation: {:?}", record),
//!         Err(e) => eprintln!("Error: {}", e),
//!     }
//! }
//! ```

use crate::io::csv_format::{convert_operation_record, OperationCsvRecord};
use crate::types::OperationRecord;
use csv::{ReaderBuilder, Trim};
use std::fs::File;
use std::path::Path;

/// Streaming iterator over an operation script
#[derive(Debug)]
pub struct SyncReader {
    reader: csv::Reader<File>,
    line_num: usize,
}

impl SyncReader {
    /// Open a script for streaming
    ///
    /// Fields are trimmed and short rows are accepted, so optional trailing
    /// columns may be left off. Fails only when the file cannot be opened.
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
    type Item = Result<OperationRecord, String>;

    /// Errors carry the file line number, counting the header as line 1
    fn next(&mut self) -> Option<Self::Item> {
        let row = self.reader.deserialize::<OperationCsvRecord>().next()?;
        self.line_num += 1;
        let line = self.line_num + 1;

        Some(match row {
            Ok(csv_record) => {
                convert_operation_record(csv_record).map_err(|e| format!("Line {}: {}", line, e))
            }
            Err(e) => Err(format!("Line {}: malformed row: {}", line, e)),
        })
    }
}
