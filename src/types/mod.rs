//! Types module
//!
//! Contains core data structures used throughout the application.
//! This module organizes types into logical submodules:
//! - `account`: Account model and its withdrawal rules
//! - `transaction`: Ledger entries, operation records and identifiers
//! - `error`: Error types for the banking engine

pub mod account;
pub mod error;
pub mod transaction;

pub use account::{Account, AccountKind, NewAccount};
pub use error::{BankError, ErrorCategory};
pub use transaction::{
    AccountId, ActorId, Amount, NewTransaction, OperationRecord, OperationType, Transaction,
    TransactionId, TransactionKind,
};
