//! Persistence contract
//!
//! The mutation service only ever talks to storage through the [`Storage`]
//! trait, so the backing technology is interchangeable:
//!
//! - [`MemoryStorage`] - volatile store, used by default and in tests
//! - [`SqliteStorage`] - durable store backed by SQLite
//!
//! # Unit of work
//!
//! Multi-step mutations are staged in a [`WriteBatch`] and handed to
//! [`Storage::commit`], which must make every staged account overwrite and
//! every staged ledger entry visible together, or none of them. A batch that
//! is dropped without being committed has no effect.
//!
//! Read-modify-write mutations go through [`Storage::atomically`], which also
//! covers the reads: the accounts handed to the closure cannot change before
//! its batch is committed, even when another handle writes to the same store.

pub mod memory;
pub mod sqlite;

pub use memory::MemoryStorage;
pub use sqlite::SqliteStorage;

use crate::types::{Account, AccountId, BankError, NewAccount, NewTransaction, Transaction};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StorageError {
    #[error("storage backend error: {0}")]
    Backend(String),
    #[error("account {0} does not exist in the store")]
    MissingAccount(AccountId),
    #[error("storage lock poisoned")]
    Poisoned,
    #[error("corrupt stored data: {0}")]
    Corrupt(String),
}

impl From<rusqlite::Error> for StorageError {
    fn from(error: rusqlite::Error) -> Self {
        StorageError::Backend(error.to_string())
    }
}

/// Writes staged by one logical unit of work
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteBatch {
    accounts: Vec<Account>,
    transactions: Vec<NewTransaction>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stage a full overwrite of an account's mutable fields
    pub fn update_account(&mut self, account: Account) {
        self.accounts.push(account);
    }

    /// Stage a ledger entry
    pub fn append(&mut self, transaction: NewTransaction) {
        self.transactions.push(transaction);
    }

    pub fn accounts(&self) -> &[Account] {
        &self.accounts
    }

    pub fn transactions(&self) -> &[NewTransaction] {
        &self.transactions
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty() && self.transactions.is_empty()
    }

    pub fn into_parts(self) -> (Vec<Account>, Vec<NewTransaction>) {
        (self.accounts, self.transactions)
    }
}

/// Read-modify-write step run by [`Storage::atomically`]
///
/// Receives the requested accounts in request order, `None` for unknown ids,
/// and returns the writes derived from them.
pub type UnitOfWork<'a> = dyn FnMut(Vec<Option<Account>>) -> Result<WriteBatch, BankError> + 'a;

/// Store for accounts and ledger entries
///
/// Implementations must be safe to share across threads. Single calls must be
/// internally consistent; serialization across calls is the caller's concern
/// (see [`crate::core::AccountLocks`]).
pub trait Storage: Send + Sync {
    /// Persist a new account, assigning its identifier
    fn save_account(&self, account: NewAccount) -> Result<Account, StorageError>;

    /// Overwrite an existing account's mutable fields by identifier
    fn update_account(&self, account: &Account) -> Result<(), StorageError>;

    /// Look up an account
    fn find_account(&self, id: AccountId) -> Result<Option<Account>, StorageError>;

    /// All accounts, ascending by identifier
    fn list_accounts(&self) -> Result<Vec<Account>, StorageError>;

    /// Persist a new ledger entry, assigning its identifier
    fn save_transaction(&self, transaction: NewTransaction) -> Result<Transaction, StorageError>;

    /// All ledger entries, newest first
    fn list_transactions(&self) -> Result<Vec<Transaction>, StorageError>;

    /// Ledger entries of every account whose owner matches `owner`
    /// (case-insensitive), newest first
    fn list_transactions_for_owner(&self, owner: &str)
        -> Result<Vec<Transaction>, StorageError>;

    /// Apply a unit of work atomically
    ///
    /// Returns the persisted ledger entries in staging order. On error nothing
    /// from the batch is visible.
    fn commit(&self, batch: WriteBatch) -> Result<Vec<Transaction>, StorageError>;

    /// Load `ids`, run `work` on them and commit its batch as one unit of work
    ///
    /// An error from `work` is returned unchanged and nothing is written.
    ///
    /// The default reads and commits separately, which only holds up while
    /// every writer of the store shares one [`crate::core::AccountLocks`].
    /// Backends reachable through more than one handle override it.
    fn atomically(
        &self,
        ids: &[AccountId],
        work: &mut UnitOfWork<'_>,
    ) -> Result<Vec<Transaction>, BankError> {
        let accounts = ids
            .iter()
            .map(|id| self.find_account(*id))
            .collect::<Result<Vec<_>, _>>()?;
        let batch = work(accounts)?;
        Ok(self.commit(batch)?)
    }
}

/// Newest-first ordering shared by the backends
pub(crate) fn newest_first(transactions: &mut [Transaction]) {
    transactions.sort_by(|a, b| {
        b.timestamp
            .cmp(&a.timestamp)
            .then_with(|| b.id.cmp(&a.id))
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TransactionKind;
    use chrono::{Duration, Utc};

    #[test]
    fn test_write_batch_staging() {
        let mut batch = WriteBatch::new();
        assert!(batch.is_empty());

        batch.update_account(NewAccount::checking("bob", 10, 0).with_id(2));
        batch.append(NewTransaction::now(2, TransactionKind::Deposit, 10, 1, ""));

        assert!(!batch.is_empty());
        assert_eq!(batch.accounts().len(), 1);
        assert_eq!(batch.transactions().len(), 1);

        let (accounts, transactions) = batch.into_parts();
        assert_eq!(accounts[0].id, 2);
        assert_eq!(transactions[0].kind, TransactionKind::Deposit);
    }

    #[test]
    fn test_newest_first_breaks_ties_by_id() {
        let now = Utc::now();
        let entry = |id, offset| {
            let mut record = NewTransaction::now(1, TransactionKind::Deposit, 1, 1, "");
            record.timestamp = now + Duration::seconds(offset);
            record.with_id(id)
        };
        let mut entries = vec![entry(1, 0), entry(2, 5), entry(3, 0)];

        newest_first(&mut entries);

        let ids: Vec<_> = entries.iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![2, 3, 1]);
    }

    #[test]
    fn test_rusqlite_error_conversion() {
        let error: StorageError = rusqlite::Error::QueryReturnedNoRows.into();
        assert!(matches!(error, StorageError::Backend(_)));
    }
}
