//! Error types for the Rust Banking Engine
//!
//! This module defines every error a mutation or query can produce.
//!
//! # Error Categories
//!
//! - **Invalid input**: non-positive amounts, malformed account openings,
//!   transfers from an account to itself
//! - **Rejected**: unknown accounts, insufficient funds, arithmetic overflow
//! - **Infrastructure**: the persistence contract could not complete a read or write,
//!   or the operation was abandoned without an outcome
//!
//! No error is fatal to the process; each is the typed outcome of a single call.

use super::transaction::{AccountId, Amount};
use crate::storage::StorageError;
use thiserror::Error;

/// Coarse classification of a [`BankError`]
///
/// Lets a caller tell caller-fixable input errors apart from business-rule
/// rejections and from infrastructure failures without matching every variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// The caller supplied something that can never succeed as given
    InvalidInput,

    /// The request was well formed but refused by a business rule
    Rejected,

    /// The store failed; the operation may succeed if retried
    Infrastructure,
}

/// Main error type for the banking engine
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BankError {
    /// Amount was zero or negative
    ///
    /// Detected before any lock is taken or any state is read.
    #[error("Invalid amount {amount}: amount must be greater than zero")]
    InvalidAmount {
        /// The rejected amount
        amount: Amount,
    },

    /// Request can never succeed as given
    ///
    /// Bad opening terms, or a transfer without a destination.
    #[error("Invalid request: {reason}")]
    InvalidRequest {
        /// Why the request was refused
        reason: String,
    },

    /// Transfer source and destination are the same account
    #[error("Cannot transfer from account {account} to itself")]
    SameAccountTransfer {
        /// The account given as both source and destination
        account: AccountId,
    },

    /// No account exists with the given identifier
    #[error("Account {account} not found")]
    AccountNotFound {
        /// The unknown identifier
        account: AccountId,
    },

    /// Balance check failed
    ///
    /// For overdraft-permitting accounts the check already includes the
    /// overdraft limit.
    #[error(
        "Insufficient funds in account {account}: balance {balance}, overdraft {overdraft}, requested {requested}"
    )]
    InsufficientFunds {
        /// Account whose balance was checked
        account: AccountId,
        /// Balance at the time of the check
        balance: Amount,
        /// Overdraft limit that applied to the check
        overdraft: Amount,
        /// Requested amount
        requested: Amount,
    },

    /// Balance arithmetic would overflow
    #[error("Arithmetic overflow in {operation} for account {account}")]
    ArithmeticOverflow {
        /// Operation that would overflow
        operation: String,
        /// Account being mutated
        account: AccountId,
    },

    /// The persistence contract failed
    #[error("Storage failure: {0}")]
    Storage(#[from] StorageError),

    /// The operation stopped before reporting an outcome
    ///
    /// Whatever it had not committed was rolled back.
    #[error("Operation interrupted: {reason}")]
    Interrupted {
        /// What stopped it
        reason: String,
    },
}

impl BankError {
    /// Classify this error
    pub fn category(&self) -> ErrorCategory {
        match self {
            BankError::InvalidAmount { .. }
            | BankError::InvalidRequest { .. }
            | BankError::SameAccountTransfer { .. } => ErrorCategory::InvalidInput,
            BankError::AccountNotFound { .. }
            | BankError::InsufficientFunds { .. }
            | BankError::ArithmeticOverflow { .. } => ErrorCategory::Rejected,
            BankError::Storage(_) | BankError::Interrupted { .. } => ErrorCategory::Infrastructure,
        }
    }

    /// Create an InvalidAmount error
    pub fn invalid_amount(amount: Amount) -> Self {
        BankError::InvalidAmount { amount }
    }

    /// Create an InvalidRequest error
    pub fn invalid_request(reason: impl Into<String>) -> Self {
        BankError::InvalidRequest {
            reason: reason.into(),
        }
    }

    /// Create an AccountNotFound error
    pub fn account_not_found(account: AccountId) -> Self {
        BankError::AccountNotFound { account }
    }

    /// Create an InsufficientFunds error
    pub fn insufficient_funds(
        account: AccountId,
        balance: Amount,
        overdraft: Amount,
        requested: Amount,
    ) -> Self {
        BankError::InsufficientFunds {
            account,
            balance,
            overdraft,
            requested,
        }
    }

    /// Create an Interrupted error
    pub fn interrupted(reason: impl Into<String>) -> Self {
        BankError::Interrupted {
            reason: reason.into(),
        }
    }

    /// Create an ArithmeticOverflow error
    pub fn arithmetic_overflow(operation: &str, account: AccountId) -> Self {
        BankError::ArithmeticOverflow {
            operation: operation.to_string(),
            account,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::invalid_amount(
        BankError::InvalidAmount { amount: -5 },
        "Invalid amount -5: amount must be greater than zero"
    )]
    #[case::invalid_request(
        BankError::invalid_request("overdraft must not be negative"),
        "Invalid request: overdraft must not be negative"
    )]
    #[case::same_account(
        BankError::SameAccountTransfer { account: 3 },
        "Cannot transfer from account 3 to itself"
    )]
    #[case::not_found(
        BankError::AccountNotFound { account: 99 },
        "Account 99 not found"
    )]
    #[case::insufficient_funds(
        BankError::insufficient_funds(2, -150, 200, 100),
        "Insufficient funds in account 2: balance -150, overdraft 200, requested 100"
    )]
    #[case::overflow(
        BankError::arithmetic_overflow("deposit", 1),
        "Arithmetic overflow in deposit for account 1"
    )]
    #[case::storage(
        BankError::Storage(StorageError::Backend("disk full".to_string())),
        "Storage failure: storage backend error: disk full"
    )]
    #[case::interrupted(
        BankError::interrupted("worker panicked"),
        "Operation interrupted: worker panicked"
    )]
    fn test_error_display(#[case] error: BankError, #[case] expected: &str) {
        assert_eq!(error.to_string(), expected);
    }

    #[rstest]
    #[case::invalid_amount(BankError::invalid_amount(0), ErrorCategory::InvalidInput)]
    #[case::invalid_request(BankError::invalid_request("x"), ErrorCategory::InvalidInput)]
    #[case::same_account(BankError::SameAccountTransfer { account: 1 }, ErrorCategory::InvalidInput)]
    #[case::not_found(BankError::account_not_found(1), ErrorCategory::Rejected)]
    #[case::insufficient(BankError::insufficient_funds(1, 0, 0, 1), ErrorCategory::Rejected)]
    #[case::overflow(BankError::arithmetic_overflow("deposit", 1), ErrorCategory::Rejected)]
    #[case::storage(BankError::Storage(StorageError::Poisoned), ErrorCategory::Infrastructure)]
    #[case::interrupted(BankError::interrupted("panic"), ErrorCategory::Infrastructure)]
    fn test_error_category(#[case] error: BankError, #[case] expected: ErrorCategory) {
        assert_eq!(error.category(), expected);
    }

    #[test]
    fn test_storage_error_conversion() {
        let error: BankError = StorageError::MissingAccount(7).into();
        assert!(matches!(
            error,
            BankError::Storage(StorageError::MissingAccount(7))
        ));
    }
}
