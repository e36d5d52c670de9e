//! Asynchronous batch processing strategy
//!
//! Reads the script in batches and applies each batch with group-level
//! parallelism on a tokio multi-threaded runtime.
//!
//! # Architecture
//!
//! ```text
//! AsyncProcessingStrategy
//!     ├── BatchConfig (batch_size, max_concurrent_batches)
//!     ├── AsyncReader (batch CSV reading)
//!     └── BatchProcessor (account-group partitioning + blocking tasks)
//!         └── AccountService (per-account locks + unit-of-work commits)
//! ```
//!
//! # Ordering
//!
//! - Batches run one after another, so the whole file keeps its order per account
//! - Within a batch, records sharing an account run sequentially in file order
//! - Groups sharing no account run in parallel
//!
//! The final account states are therefore the same as with the sync strategy.

use crate::core::{AccountService, BatchProcessor};
use crate::io::async_reader::AsyncReader;
use crate::strategy::{log_rejection, write_final_accounts, ProcessingStrategy};
use std::io::Write;
use std::path::Path;
use tracing::{debug, warn};

/// Batching parameters for the async strategy
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BatchConfig {
    /// Number of records read and applied per batch
    pub batch_size: usize,

    /// Worker and blocking thread count of the runtime
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
    /// Build a config, replacing zero values with the defaults
    pub fn new(batch_size: usize, max_concurrent_batches: usize) -> Self {
        let default = Self::default();

        let batch_size = if batch_size == 0 {
            warn!(
                requested = batch_size,
                fallback = default.batch_size,
                "invalid batch size, using default"
            );
            default.batch_size
        } else {
            batch_size
        };

        let max_concurrent_batches = if max_concurrent_batches == 0 {
            warn!(
                requested = max_concurrent_batches,
                fallback = default.max_concurrent_batches,
                "invalid concurrency, using default"
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

/// Multi-threaded, batched strategy
#[derive(Debug, Clone)]
pub struct AsyncProcessingStrategy {
    config: BatchConfig,
}

impl AsyncProcessingStrategy {
    pub fn new(config: BatchConfig) -> Self {
        Self { config }
    }
}

impl ProcessingStrategy for AsyncProcessingStrategy {
    fn process(
        &self,
        service: &AccountService,
        input_path: &Path,
        output: &mut dyn Write,
    ) -> Result<(), String> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(self.config.max_concurrent_batches)
            .max_blocking_threads(self.config.max_concurrent_batches)
            .build()
            .map_err(|e| format!("Failed to create tokio runtime: {}", e))?;

        runtime.block_on(async {
            let processor = BatchProcessor::new(service.clone());

            let file = tokio::fs::File::open(input_path)
                .await
                .map_err(|e| format!("Failed to open file '{}': {}", input_path.display(), e))?;

            // csv-async reads futures::io, tokio files speak tokio::io
            let compat_file = tokio_util::compat::TokioAsyncReadCompatExt::compat(file);
            let mut reader = AsyncReader::new(compat_file);

            let mut batches = 0usize;
            loop {
                let batch = reader.read_batch(self.config.batch_size).await;
                if batch.is_empty() {
                    break;
                }
                batches += 1;

                // Wait for the batch before reading on, so accounts spanning
                // batches keep file order
                for outcome in processor.process_batch(batch).await {
                    if let Err(e) = &outcome.result {
                        log_rejection(&outcome.record, e);
                    }
                }
            }
            debug!(batches, "script processed");

            write_final_accounts(service, output)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;
    use crate::types::NewAccount;
    use rstest::rstest;
    use std::sync::Arc;
    use tempfile::NamedTempFile;

    fn create_temp_script(rows: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().expect("Failed to create temp file");
        write!(file, "type,account,to,amount,actor,note\n{}", rows)
            .expect("Failed to write to temp file");
        file.flush().expect("Failed to flush temp file");
        file
    }

    fn service_with_checking(count: usize) -> AccountService {
        let service = AccountService::new(Arc::new(MemoryStorage::new()));
        for i in 0..count {
            service
                .open_account(NewAccount::checking(format!("owner{}", i + 1), 100, 50))
                .unwrap();
        }
        service
    }

    #[rstest]
    #[case::zero_batch(0, 4, BatchConfig { batch_size: 1000, max_concurrent_batches: 4 })]
    #[case::explicit(2, 3, BatchConfig { batch_size: 2, max_concurrent_batches: 3 })]
    fn test_batch_config_new(
        #[case] batch_size: usize,
        #[case] max_concurrent: usize,
        #[case] expected: BatchConfig,
    ) {
        assert_eq!(BatchConfig::new(batch_size, max_concurrent), expected);
    }

    #[test]
    fn test_batch_config_zero_concurrency_falls_back() {
        let config = BatchConfig::new(10, 0);
        assert_eq!(config.max_concurrent_batches, num_cpus::get());
    }

    #[test]
    fn test_async_strategy_handles_missing_file() {
        let strategy = AsyncProcessingStrategy::new(BatchConfig::default());
        let mut output = Vec::new();

        let result = strategy.process(&service_with_checking(0), Path::new("nonexistent.csv"), &mut output);

        assert!(result.unwrap_err().contains("Failed to open file"));
    }

    #[rstest]
    #[case::single_batch(1000)]
    #[case::many_batches(2)]
    #[case::one_record_per_batch(1)]
    fn test_async_strategy_keeps_order_across_batches(#[case] batch_size: usize) {
        // Account 1: 100 - 120 = -20, then -20 - 40 is past the floor and refused
        // Transfers chain 3 -> 2 -> 1 in file order
        let file = create_temp_script(
            "withdraw,1,,120,1,\n\
             deposit,2,,10,1,\n\
             withdraw,1,,40,1,\n\
             transfer,3,2,60,1,\n\
             transfer,2,1,150,1,\n\
             deposit,4,,1,1,\n",
        );
        let service = service_with_checking(4);
        let strategy = AsyncProcessingStrategy::new(BatchConfig::new(batch_size, 4));
        let mut output = Vec::new();

        strategy.process(&service, file.path(), &mut output).unwrap();

        assert_eq!(
            String::from_utf8(output).unwrap(),
            "id,owner,kind,balance,overdraft,rate\n\
             1,owner1,checking,130,50,\n\
             2,owner2,checking,20,50,\n\
             3,owner3,checking,40,50,\n\
             4,owner4,checking,101,50,\n"
        );
    }
}
