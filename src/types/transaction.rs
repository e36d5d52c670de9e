//! Transaction-related types for the Rust Banking Engine
//!
//! This module defines the ledger entry types produced by every successful
//! mutation, and the operation records that callers submit to the engine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Account identifier
///
/// Assigned by the store when an account is opened; immutable afterwards.
pub type AccountId = u64;

/// Transaction (ledger entry) identifier
///
/// Assigned by the store when the entry is persisted.
pub type TransactionId = u64;

/// Identifier of the principal performing an operation
pub type ActorId = u64;

/// Monetary amount in whole currency units
///
/// Signed so that overdraft-permitting accounts can carry a negative balance.
pub type Amount = i64;

/// Kinds of ledger entries
///
/// Deposits and withdrawals produce one entry each; a transfer produces a
/// `TransferOut` entry on the source and a `TransferIn` entry on the destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionKind {
    /// Credit to an account
    Deposit,

    /// Debit from an account
    Withdraw,

    /// Source leg of a transfer
    TransferOut,

    /// Destination leg of a transfer
    TransferIn,
}

impl TransactionKind {
    /// The stored/serialized label of this kind
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionKind::Deposit => "DEPOSIT",
            TransactionKind::Withdraw => "WITHDRAW",
            TransactionKind::TransferOut => "TRANSFER_OUT",
            TransactionKind::TransferIn => "TRANSFER_IN",
        }
    }

    /// Parse a stored label back into a kind
    pub fn parse(label: &str) -> Option<Self> {
        match label {
            "DEPOSIT" => Some(TransactionKind::Deposit),
            "WITHDRAW" => Some(TransactionKind::Withdraw),
            "TRANSFER_OUT" => Some(TransactionKind::TransferOut),
            "TRANSFER_IN" => Some(TransactionKind::TransferIn),
            _ => None,
        }
    }
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A persisted, immutable ledger entry
///
/// Exactly one entry exists per leg of every successful mutation. Entries are
/// never updated or deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// Store-assigned identifier
    pub id: TransactionId,

    /// The account this entry belongs to
    pub account: AccountId,

    /// What kind of effect this entry records
    pub kind: TransactionKind,

    /// Magnitude of the effect (always positive)
    pub amount: Amount,

    /// When the entry was created
    pub timestamp: DateTime<Utc>,

    /// The principal that performed the operation
    pub actor: ActorId,

    /// Free-text note; transfer legs are annotated with the counterparty
    pub note: String,
}

/// A ledger entry that has not been assigned an identifier yet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTransaction {
    pub account: AccountId,
    pub kind: TransactionKind,
    pub amount: Amount,
    pub timestamp: DateTime<Utc>,
    pub actor: ActorId,
    pub note: String,
}

impl NewTransaction {
    /// Create an entry stamped with the current time
    pub fn now(
        account: AccountId,
        kind: TransactionKind,
        amount: Amount,
        actor: ActorId,
        note: impl Into<String>,
    ) -> Self {
        NewTransaction {
            account,
            kind,
            amount,
            timestamp: Utc::now(),
            actor,
            note: note.into(),
        }
    }

    /// Attach the store-assigned identifier
    pub fn with_id(self, id: TransactionId) -> Transaction {
        Transaction {
            id,
            account: self.account,
            kind: self.kind,
            amount: self.amount,
            timestamp: self.timestamp,
            actor: self.actor,
            note: self.note,
        }
    }
}

/// Operations a caller can submit to the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationType {
    /// Credit funds to an account
    Deposit,

    /// Debit funds from an account, honouring its overdraft limit
    Withdraw,

    /// Atomically move funds between two accounts
    Transfer,
}

/// A single operation as read from an operation script
///
/// `to` is only meaningful (and required) for transfers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationRecord {
    pub op: OperationType,
    pub account: AccountId,
    pub to: Option<AccountId>,
    pub amount: Amount,
    pub actor: ActorId,
    pub note: String,
}

impl OperationRecord {
    /// Every account this operation touches
    pub fn accounts(&self) -> impl Iterator<Item = AccountId> {
        std::iter::once(self.account).chain(self.to)
    }
}
