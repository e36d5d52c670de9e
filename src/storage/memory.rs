//! Volatile in-memory store
//!
//! All state sits behind a single `RwLock`. A commit takes the write lock,
//! checks that every staged account exists and only then applies the batch,
//! so readers observe either all of a batch or none of it. A unit of work
//! keeps the write lock from its first read to its commit.

use super::{newest_first, Storage, StorageError, UnitOfWork, WriteBatch};
use crate::types::{
    Account, AccountId, BankError, NewAccount, NewTransaction, Transaction, TransactionId,
};
use std::collections::{BTreeMap, HashSet};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

#[derive(Debug)]
struct State {
    accounts: BTreeMap<AccountId, Account>,
    transactions: BTreeMap<TransactionId, Transaction>,
    next_account_id: AccountId,
    next_transaction_id: TransactionId,
}

impl State {
    fn insert_transaction(&mut self, transaction: NewTransaction) -> Transaction {
        let id = self.next_transaction_id;
        self.next_transaction_id += 1;
        let stored = transaction.with_id(id);
        self.transactions.insert(id, stored.clone());
        stored
    }

    fn apply(&mut self, batch: WriteBatch) -> Result<Vec<Transaction>, StorageError> {
        // Validate everything before the first mutation
        for account in batch.accounts() {
            if !self.accounts.contains_key(&account.id) {
                return Err(StorageError::MissingAccount(account.id));
            }
        }
        for transaction in batch.transactions() {
            if !self.accounts.contains_key(&transaction.account) {
                return Err(StorageError::MissingAccount(transaction.account));
            }
        }

        let (accounts, transactions) = batch.into_parts();
        for account in accounts {
            self.accounts.insert(account.id, account);
        }
        Ok(transactions
            .into_iter()
            .map(|transaction| self.insert_transaction(transaction))
            .collect())
    }
}

/// Thread-safe volatile store
///
/// Identifiers start at 1 and are never reused.
#[derive(Debug)]
pub struct MemoryStorage {
    state: RwLock<State>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(State {
                accounts: BTreeMap::new(),
                transactions: BTreeMap::new(),
                next_account_id: 1,
                next_transaction_id: 1,
            }),
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, State>, StorageError> {
        self.state.read().map_err(|_| StorageError::Poisoned)
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, State>, StorageError> {
        self.state.write().map_err(|_| StorageError::Poisoned)
    }
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl Storage for MemoryStorage {
    fn save_account(&self, account: NewAccount) -> Result<Account, StorageError> {
        let mut state = self.write()?;
        let id = state.next_account_id;
        state.next_account_id += 1;
        let stored = account.with_id(id);
        state.accounts.insert(id, stored.clone());
        Ok(stored)
    }

    fn update_account(&self, account: &Account) -> Result<(), StorageError> {
        let mut state = self.write()?;
        match state.accounts.get_mut(&account.id) {
            Some(existing) => {
                *existing = account.clone();
                Ok(())
            }
            None => Err(StorageError::MissingAccount(account.id)),
        }
    }

    fn find_account(&self, id: AccountId) -> Result<Option<Account>, StorageError> {
        Ok(self.read()?.accounts.get(&id).cloned())
    }

    fn list_accounts(&self) -> Result<Vec<Account>, StorageError> {
        Ok(self.read()?.accounts.values().cloned().collect())
    }

    fn save_transaction(&self, transaction: NewTransaction) -> Result<Transaction, StorageError> {
        let mut state = self.write()?;
        if !state.accounts.contains_key(&transaction.account) {
            return Err(StorageError::MissingAccount(transaction.account));
        }
        Ok(state.insert_transaction(transaction))
    }

    fn list_transactions(&self) -> Result<Vec<Transaction>, StorageError> {
        let mut transactions: Vec<Transaction> =
            self.read()?.transactions.values().cloned().collect();
        newest_first(&mut transactions);
        Ok(transactions)
    }

    fn list_transactions_for_owner(
        &self,
        owner: &str,
    ) -> Result<Vec<Transaction>, StorageError> {
        let owner = owner.to_lowercase();
        let state = self.read()?;
        let owned: HashSet<AccountId> = state
            .accounts
            .values()
            .filter(|account| account.owner.to_lowercase() == owner)
            .map(|account| account.id)
            .collect();

        let mut transactions: Vec<Transaction> = state
            .transactions
            .values()
            .filter(|transaction| owned.contains(&transaction.account))
            .cloned()
            .collect();
        newest_first(&mut transactions);
        Ok(transactions)
    }

    fn commit(&self, batch: WriteBatch) -> Result<Vec<Transaction>, StorageError> {
        self.write()?.apply(batch)
    }

    fn atomically(
        &self,
        ids: &[AccountId],
        work: &mut UnitOfWork<'_>,
    ) -> Result<Vec<Transaction>, BankError> {
        let mut state = self.write()?;
        let accounts = ids.iter().map(|id| state.accounts.get(id).cloned()).collect();
        let batch = work(accounts)?;
        Ok(state.apply(batch)?)
    }
}
