//! Rust Banking Engine CLI
//!
//! Command-line interface for applying operation scripts to bank accounts.
//!
//! # Usage
//!
//! ```bash
//! cargo run -- --accounts accounts.csv operations.csv > accounts_out.csv
//! cargo run -- --strategy sync --accounts accounts.csv operations.csv
//! cargo run -- --database bank.db --ledger ledger.csv operations.csv
//! cargo run -- --strategy async --batch-size 2000 --max-concurrent 8 --accounts accounts.csv operations.csv
//! ```
//!
//! Accounts from `--accounts` are opened first, then the script is applied
//! with the selected strategy and the final account states are written to
//! stdout. With `--database` the accounts persist between runs, and the seed
//! file is only read while the database holds no accounts.
//!
//! # Exit Codes
//!
//! - 0: Success (individual rejected operations are logged, not fatal)
//! - 1: Error (unreadable files, bad seed rows, storage failure, etc.)

use rust_banking_engine::cli::{self, CliArgs};
use rust_banking_engine::storage::{MemoryStorage, SqliteStorage, Storage};
use rust_banking_engine::{io, logging, strategy, AccountService};
use std::fs::File;
use std::process;
use std::sync::Arc;

fn run(args: &CliArgs) -> Result<(), String> {
    let storage: Arc<dyn Storage> = match &args.database {
        Some(path) => Arc::new(
            SqliteStorage::open(path)
                .map_err(|e| format!("Failed to open database '{}': {}", path.display(), e))?,
        ),
        None => Arc::new(MemoryStorage::new()),
    };
    let service = AccountService::new(storage);

    if let Some(path) = &args.accounts_file {
        io::load_accounts(path, &service)?;
    }

    let strategy = {
        let config = if matches!(args.strategy, cli::StrategyType::Async) {
            Some(args.to_batch_config())
        } else {
            None
        };
        strategy::create_strategy(args.strategy, config)
    };

    let mut output = std::io::stdout();
    strategy.process(&service, &args.input_file, &mut output)?;

    if let Some(path) = &args.ledger_file {
        let transactions = service
            .transactions()
            .map_err(|e| format!("Failed to read ledger: {}", e))?;
        let mut file = File::create(path)
            .map_err(|e| format!("Failed to create file '{}': {}", path.display(), e))?;
        io::write_transactions_csv(&transactions, &mut file)?;
    }

    Ok(())
}

fn main() {
    let args = cli::parse_args();

    if let Err(e) = logging::init(args.log_level.as_deref()) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }

    if let Err(e) = run(&args) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}
