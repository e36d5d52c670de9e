//! Processing strategy module for operation scripts
//!
//! This module defines the Strategy pattern for complete script processing
//! pipelines, covering both CSV parsing and application through the account
//! service. Synchronous and asynchronous batch implementations are selected
//! at runtime.

use crate::cli::StrategyType;
use crate::core::AccountService;
use crate::types::{BankError, OperationRecord};
use std::io::Write;
use std::path::Path;
use tracing::warn;

pub mod r#async;
pub mod sync;

pub use self::r#async::{AsyncProcessingStrategy, BatchConfig};
pub use sync::SyncProcessingStrategy;

/// Processing strategy trait for complete script processing pipelines
///
/// Each strategy reads operation records from a script, applies them through
/// the given service, and writes the final account states to output.
pub trait ProcessingStrategy: Send + Sync {
    /// Apply the script at `input_path` and write the resulting accounts
    ///
    /// # Arguments
    ///
    /// * `service` - Service holding the accounts the script refers to
    /// * `input_path` - Path to the operation script
    /// * `output` - Writer receiving the accounts CSV
    ///
    /// # Errors
    ///
    /// Returns an error if the script cannot be opened, or if the account
    /// listing cannot be read or written.
    ///
    /// Malformed rows and rejected operations are logged and skipped; they
    /// never cause this method to fail.
    fn process(
        &self,
        service: &AccountService,
        input_path: &Path,
        output: &mut dyn Write,
    ) -> Result<(), String>;
}

/// Log an operation the service refused
pub(crate) fn log_rejection(record: &OperationRecord, error: &BankError) {
    warn!(
        op = ?record.op,
        account = record.account,
        to = ?record.to,
        amount = record.amount,
        category = ?error.category(),
        %error,
        "operation rejected"
    );
}

/// Write the service's accounts as CSV
pub(crate) fn write_final_accounts(
    service: &AccountService,
    output: &mut dyn Write,
) -> Result<(), String> {
    let accounts = service
        .accounts()
        .map_err(|e| format!("Failed to list accounts: {}", e))?;
    crate::io::write_accounts_csv(&accounts, output)
}

/// Build the strategy selected on the command line
///
/// `config` tunes the async strategy and is ignored by the sync one; `None`
/// means [`BatchConfig::default`].
pub fn create_strategy(
    strategy_type: StrategyType,
    config: Option<BatchConfig>,
) -> Box<dyn ProcessingStrategy> {
    match strategy_type {
        StrategyType::Sync => Box::new(SyncProcessingStrategy),
        StrategyType::Async => {
            let config = config.unwrap_or_default();
            Box::new(AsyncProcessingStrategy::new(config))
        }
    }
}
