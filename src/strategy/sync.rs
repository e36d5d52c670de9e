//! Synchronous processing strategy
//!
//! Applies an operation script one record at a time on the calling thread.
//!
//! # Design
//!
//! The SyncProcessingStrategy only orchestrates, delegating:
//! - CSV parsing to `SyncReader` (iterator interface)
//! - Mutations to `AccountService`
//! - CSV output to `csv_format::write_accounts_csv`
//!
//! Records are streamed, so memory use does not grow with script length.

use crate::core::AccountService;
use crate::io::sync_reader::SyncReader;
use crate::strategy::{log_rejection, write_final_accounts, ProcessingStrategy};
use std::io::Write;
use std::path::Path;
use tracing::{debug, warn};

/// Single-threaded, streaming strategy
#[derive(Debug, Clone, Copy)]
pub struct SyncProcessingStrategy;

impl ProcessingStrategy for SyncProcessingStrategy {
    fn process(
        &self,
        service: &AccountService,
        input_path: &Path,
        output: &mut dyn Write,
    ) -> Result<(), String> {
        let reader = SyncReader::new(input_path)?;

        let mut applied = 0usize;
        let mut rejected = 0usize;
        for result in reader {
            match result {
                Ok(record) => match service.process(&record) {
                    Ok(()) => applied += 1,
                    Err(e) => {
                        rejected += 1;
                        log_rejection(&record, &e);
                    }
                },
                Err(e) => warn!(error = %e, "skipping invalid operation"),
            }
        }
        debug!(applied, rejected, "script processed");

        write_final_accounts(service, output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;
    use crate::types::NewAccount;
    use rust_decimal::Decimal;
    use std::sync::Arc;
    use tempfile::NamedTempFile;

    fn create_temp_script(rows: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().expect("Failed to create temp file");
        write!(file, "type,account,to,amount,actor,note\n{}", rows)
            .expect("Failed to write to temp file");
        file.flush().expect("Failed to flush temp file");
        file
    }

    fn seeded_service() -> AccountService {
        let service = AccountService::new(Arc::new(MemoryStorage::new()));
        service
            .open_account(NewAccount::savings("Alice", 1000, Decimal::new(2, 2)))
            .unwrap();
        service
            .open_account(NewAccount::checking("Bob", 500, 200))
            .unwrap();
        service
    }

    fn run(rows: &str) -> (AccountService, String) {
        let service = seeded_service();
        let file = create_temp_script(rows);
        let mut output = Vec::new();
        SyncProcessingStrategy
            .process(&service, file.path(), &mut output)
            .unwrap();
        (service, String::from_utf8(output).unwrap())
    }

    #[test]
    fn test_sync_strategy_applies_script() {
        let (service, output) = run(
            "withdraw,2,,650,9,atm\n\
             transfer,1,2,300,1,pay\n",
        );

        assert_eq!(
            output,
            "id,owner,kind,balance,overdraft,rate\n\
             1,Alice,savings,700,0,0.02\n\
             2,Bob,checking,150,200,\n"
        );
        assert_eq!(service.transactions().unwrap().len(), 3);
    }

    #[test]
    fn test_sync_strategy_continues_after_rejections() {
        let (service, output) = run(
            "withdraw,2,,650,1,\n\
             withdraw,2,,100,1,\n\
             deposit,1,,0,1,\n\
             transfer,1,99,50,1,\n\
             deposit,1,,25,1,\n",
        );

        assert!(output.contains("1,Alice,savings,1025,0,0.02"));
        assert!(output.contains("2,Bob,checking,-150,200,"));
        assert_eq!(service.transactions().unwrap().len(), 2);
    }

    #[test]
    fn test_sync_strategy_continues_on_malformed_record() {
        let (_, output) = run(
            "deposit,1,,100,1,\n\
             deposit,2,,invalid,1,\n\
             deposit,2,,50,1,\n",
        );

        assert!(output.contains("1,Alice,savings,1100,0,0.02"));
        assert!(output.contains("2,Bob,checking,550,200,"));
    }

    #[test]
    fn test_sync_strategy_handles_missing_file() {
        let mut output = Vec::new();
        let result =
            SyncProcessingStrategy.process(&seeded_service(), Path::new("nonexistent.csv"), &mut output);
        assert!(result.unwrap_err().contains("Failed to open file"));
        assert!(output.is_empty());
    }

    #[test]
    fn test_sync_strategy_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<SyncProcessingStrategy>();
    }
}
