//! I/O module
//!
//! Handles CSV parsing and output.
//!
//! # Components
//!
//! - `csv_format` - Row formats, record conversion and output serialization
//! - `account_seed` - Opens the accounts listed in a seed file
//! - `sync_reader` - Synchronous operation script reader with iterator interface
//! - `async_reader` - Asynchronous operation script reader with batch interface

pub mod account_seed;
pub mod async_reader;
pub mod csv_format;
pub mod sync_reader;

pub use account_seed::load_accounts;
pub use async_reader::AsyncReader;
pub use csv_format::{
    convert_account_record, convert_operation_record, write_accounts_csv, write_transactions_csv,
    AccountCsvRecord, OperationCsvRecord,
};
pub use sync_reader::SyncReader;
