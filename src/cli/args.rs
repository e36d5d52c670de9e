use crate::strategy::BatchConfig;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Apply deposits, withdrawals and transfers to bank accounts
#[derive(Parser, Debug)]
#[command(name = "banking-engine")]
#[command(about = "Apply deposits, withdrawals and transfers to bank accounts", long_about = None)]
pub struct CliArgs {
    /// Operation script to apply
    #[arg(value_name = "INPUT", help = "Path to the operation script CSV")]
    pub input_file: PathBuf,

    /// Accounts to open before the script runs
    #[arg(
        long = "accounts",
        value_name = "FILE",
        help = "Account seed CSV (owner,kind,balance,overdraft,rate), opened in file order"
    )]
    pub accounts_file: Option<PathBuf>,

    /// Durable store location
    #[arg(
        long = "database",
        value_name = "PATH",
        help = "SQLite database file; without it accounts live in memory for this run only"
    )]
    pub database: Option<PathBuf>,

    /// Where to write the transaction log
    #[arg(
        long = "ledger",
        value_name = "FILE",
        help = "Write every ledger entry, newest first, to this CSV file"
    )]
    pub ledger_file: Option<PathBuf>,

    /// Processing strategy
    #[arg(
        long = "strategy",
        value_name = "STRATEGY",
        default_value = "async",
        help = "Processing strategy: 'sync' for synchronous or 'async' for batched parallel"
    )]
    pub strategy: StrategyType,

    /// Number of records per batch (async mode only)
    #[arg(
        long = "batch-size",
        value_name = "SIZE",
        help = "Number of operations per batch (default: 1000)"
    )]
    pub batch_size: Option<usize>,

    /// Runtime thread count (async mode only)
    #[arg(
        long = "max-concurrent",
        value_name = "COUNT",
        help = "Maximum number of threads applying operations (default: CPU cores)"
    )]
    pub max_concurrent_batches: Option<usize>,

    /// Log filter
    #[arg(
        long = "log-level",
        value_name = "FILTER",
        help = "Log filter such as 'info' or 'rust_banking_engine=debug' (default: RUST_LOG, else warn)"
    )]
    pub log_level: Option<String>,
}

/// Available processing strategies
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum StrategyType {
    Sync,
    Async,
}

impl CliArgs {
    /// Batching parameters for the async strategy
    ///
    /// Omitted flags take the defaults; zeros fall back to them with a warning.
    pub fn to_batch_config(&self) -> BatchConfig {
        let default = BatchConfig::default();
        BatchConfig::new(
            self.batch_size.unwrap_or(default.batch_size),
            self.max_concurrent_batches
                .unwrap_or(default.max_concurrent_batches),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::path::Path;

    #[rstest]
    #[case::default_strategy(&["program", "ops.csv"], StrategyType::Async)]
    #[case::explicit_sync(&["program", "--strategy", "sync", "ops.csv"], StrategyType::Sync)]
    #[case::explicit_async(&["program", "--strategy", "async", "ops.csv"], StrategyType::Async)]
    fn test_strategy_parsing(#[case] args: &[&str], #[case] expected: StrategyType) {
        let parsed = CliArgs::try_parse_from(args).unwrap();
        assert_eq!(parsed.strategy, expected);
    }

    #[test]
    fn test_file_options() {
        let parsed = CliArgs::try_parse_from([
            "program",
            "--accounts",
            "seed.csv",
            "--database",
            "bank.db",
            "--ledger",
            "ledger.csv",
            "--log-level",
            "debug",
            "ops.csv",
        ])
        .unwrap();

        assert_eq!(parsed.input_file, Path::new("ops.csv"));
        assert_eq!(parsed.accounts_file.as_deref(), Some(Path::new("seed.csv")));
        assert_eq!(parsed.database.as_deref(), Some(Path::new("bank.db")));
        assert_eq!(parsed.ledger_file.as_deref(), Some(Path::new("ledger.csv")));
        assert_eq!(parsed.log_level.as_deref(), Some("debug"));
    }

    #[test]
    fn test_file_options_default_to_none() {
        let parsed = CliArgs::try_parse_from(["program", "ops.csv"]).unwrap();
        assert!(parsed.accounts_file.is_none());
        assert!(parsed.database.is_none());
        assert!(parsed.ledger_file.is_none());
        assert!(parsed.log_level.is_none());
    }

    #[rstest]
    #[case::all_defaults(&["program", "ops.csv"], 1000, num_cpus::get())]
    #[case::custom_batch_size(&["program", "--batch-size", "2000", "ops.csv"], 2000, num_cpus::get())]
    #[case::custom_max_concurrent(&["program", "--max-concurrent", "8", "ops.csv"], 1000, 8)]
    #[case::all_custom(
        &["program", "--batch-size", "2000", "--max-concurrent", "8", "ops.csv"],
        2000,
        8
    )]
    #[case::zero_batch_size(&["program", "--batch-size", "0", "ops.csv"], 1000, num_cpus::get())]
    #[case::zero_max_concurrent(&["program", "--max-concurrent", "0", "ops.csv"], 1000, num_cpus::get())]
    fn test_batch_config_conversion(
        #[case] args: &[&str],
        #[case] expected_batch_size: usize,
        #[case] expected_max_concurrent: usize,
    ) {
        let config = CliArgs::try_parse_from(args).unwrap().to_batch_config();

        assert_eq!(config.batch_size, expected_batch_size);
        assert_eq!(config.max_concurrent_batches, expected_max_concurrent);
    }

    #[rstest]
    #[case::missing_input(&["program"])]
    #[case::invalid_strategy(&["program", "--strategy", "invalid", "ops.csv"])]
    #[case::negative_batch(&["program", "--batch-size", "-1", "ops.csv"])]
    fn test_parsing_errors(#[case] args: &[&str]) {
        assert!(CliArgs::try_parse_from(args).is_err());
    }
}
