//! Rust Banking Engine Library
//! # Overview
//!
//! This library applies deposits, withdrawals and transfers to monetary
//! accounts. Every account is serialized by its own lock, transfers commit
//! both legs or neither, and each successful mutation leaves an immutable
//! ledger entry.
//!
//! # Architecture
//!
//! - [`types`] - Accounts, ledger entries, operation records and errors
//! - [`storage`] - The persistence contract and its memory and SQLite backends
//! - [`core`] - Business logic components:
//!   - [`core::locks`] - Per-account lock registry
//!   - [`core::service`] - Mutation orchestration and queries
//!   - [`core::batch_processor`] - Concurrent application of operation batches
//! - [`io`] - CSV seed, script and output formats
//! - [`strategy`] - Sync and async script pipelines
//! - [`cli`] - CLI arguments parsing
//! - [`logging`] - Tracing subscriber setup
//!
//! # Operations
//!
//! - **Deposit**: Credit funds to an account
//! - **Withdraw**: Debit funds; checking accounts may go negative down to their overdraft limit
//! - **Transfer**: Move funds between two accounts; the source's plain balance must cover it
//!
//! # Example
//!
//! ```
//! use rust_banking_engine::{AccountService, MemoryStorage, NewAccount};
//! use rust_decimal::Decimal;
//! use std::sync::Arc;
//!
//! let service = AccountService::new(Arc::new(MemoryStorage::new()));
//! let alice = service.open_account(NewAccount::savings("Alice", 1000, Decimal::ZERO)).unwrap();
//! let bob = service.open_account(NewAccount::checking("Bob", 500, 200)).unwrap();
//!
//! service.transfer(alice.id, bob.id, 300, 1, "rent").unwrap();
//! assert_eq!(service.account(bob.id).unwrap().balance, 800);
//! ```

// Module declarations
pub mod cli;
pub mod core;
pub mod io;
pub mod logging;
pub mod storage;
pub mod strategy;
pub mod types;

pub use core::{AccountLocks, AccountService, TransferReceipt};
pub use io::{write_accounts_csv, write_transactions_csv};
pub use storage::{MemoryStorage, SqliteStorage, Storage, StorageError, UnitOfWork, WriteBatch};
pub use types::{
    Account, AccountId, AccountKind, ActorId, Amount, BankError, ErrorCategory, NewAccount,
    OperationRecord, OperationType, Transaction, TransactionId, TransactionKind,
};
