//! Account mutation service
//!
//! This module provides `AccountService`, which applies deposits, withdrawals
//! and transfers to accounts held in a [`Storage`] backend.
//!
//! # Design
//!
//! Every mutation follows the same shape:
//!
//! 1. Validate the amount (no lock taken, nothing read)
//! 2. Acquire the per-account lock(s) from [`AccountLocks`]
//! 3. Open a unit of work with [`Storage::atomically`] and load fresh account state
//! 4. Apply the account-model mutation to the in-memory copy
//! 5. Stage the account overwrite(s) and ledger entries in a [`WriteBatch`]
//! 6. Commit the batch, closing the unit of work
//! 7. Release the lock(s)
//!
//! Any failure before step 6 simply drops the batch, so nothing persisted
//! changes. A failure inside step 6 is rolled back by the backend. The locks
//! serialize callers sharing this service; the unit of work also serializes
//! other handles on a durable store.
//!
//! # Thread Safety
//!
//! The service is cheap to clone and every clone shares the same lock
//! registry and store. Operations on different accounts run fully in
//! parallel; operations on the same account are serialized.

use crate::core::locks::AccountLocks;
use crate::storage::{Storage, StorageError, WriteBatch};
use crate::types::{
    Account, AccountId, ActorId, Amount, BankError, NewAccount, NewTransaction, OperationRecord,
    OperationType, Transaction, TransactionKind,
};
use std::sync::Arc;
use tracing::debug;

/// Ledger entries produced by a successful transfer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferReceipt {
    /// `TRANSFER_OUT` entry on the source account
    pub debit: Transaction,

    /// `TRANSFER_IN` entry on the destination account
    pub credit: Transaction,
}

/// Applies mutations to accounts with per-account serialization
///
/// The service never caches account state between operations; each call
/// loads what it needs while holding the relevant locks.
#[derive(Clone)]
pub struct AccountService {
    storage: Arc<dyn Storage>,
    locks: Arc<AccountLocks>,
}

impl AccountService {
    /// Create a service over a store
    ///
    /// All clones of the returned service share one lock registry. Two
    /// independently created services over the same store do not coordinate.
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self {
            storage,
            locks: Arc::new(AccountLocks::new()),
        }
    }

    /// The underlying store
    pub fn storage(&self) -> &Arc<dyn Storage> {
        &self.storage
    }

    /// Open a new account with an explicit initial balance
    ///
    /// # Errors
    ///
    /// - `InvalidRequest` if the overdraft is negative or the opening balance
    ///   is below the overdraft floor
    /// - `Storage` if the store fails
    pub fn open_account(&self, request: NewAccount) -> Result<Account, BankError> {
        request.validate()?;
        let account = self.storage.save_account(request)?;
        debug!(account = account.id, owner = %account.owner, balance = account.balance, "account opened");
        Ok(account)
    }

    /// Credit an account and record a `DEPOSIT` entry
    ///
    /// # Errors
    ///
    /// - `InvalidAmount` if `amount <= 0`
    /// - `AccountNotFound` if the account does not exist
    /// - `ArithmeticOverflow` if the balance would overflow
    /// - `Storage` if the store fails; the account is left unmodified
    pub fn deposit(
        &self,
        account: AccountId,
        amount: Amount,
        actor: ActorId,
        note: &str,
    ) -> Result<Transaction, BankError> {
        self.mutate(account, amount, actor, note, TransactionKind::Deposit, |acc| {
            acc.deposit(amount)
        })
    }

    /// Debit an account and record a `WITHDRAW` entry
    ///
    /// Checking accounts may go negative down to their overdraft limit.
    ///
    /// # Errors
    ///
    /// - `InvalidAmount` if `amount <= 0`
    /// - `AccountNotFound` if the account does not exist
    /// - `InsufficientFunds` if the withdrawal would cross the overdraft floor
    /// - `Storage` if the store fails; the account is left unmodified
    pub fn withdraw(
        &self,
        account: AccountId,
        amount: Amount,
        actor: ActorId,
        note: &str,
    ) -> Result<Transaction, BankError> {
        self.mutate(account, amount, actor, note, TransactionKind::Withdraw, |acc| {
            acc.withdraw(amount)
        })
    }

    /// Shared load-mutate-commit path of deposit and withdraw
    fn mutate<F>(
        &self,
        account: AccountId,
        amount: Amount,
        actor: ActorId,
        note: &str,
        kind: TransactionKind,
        apply: F,
    ) -> Result<Transaction, BankError>
    where
        F: Fn(&mut Account) -> Result<(), BankError>,
    {
        if amount <= 0 {
            return Err(BankError::invalid_amount(amount));
        }

        let committed: Result<Transaction, BankError> = self.locks.with_account(account, || {
            let mut balance = 0;
            let entries = self.storage.atomically(&[account], &mut |loaded| {
                let mut current = loaded
                    .into_iter()
                    .next()
                    .flatten()
                    .ok_or_else(|| BankError::account_not_found(account))?;
                apply(&mut current)?;
                balance = current.balance;

                let mut batch = WriteBatch::new();
                batch.update_account(current);
                batch.append(NewTransaction::now(account, kind, amount, actor, note));
                Ok(batch)
            })?;

            let entry = entries.into_iter().next().ok_or_else(|| {
                StorageError::Corrupt("commit returned no ledger entry".to_string())
            })?;

            debug!(account, amount, actor, balance, kind = %kind, "mutation committed");
            Ok(entry)
        });
        self.release_if_unknown(committed)
    }

    /// Move funds between two accounts as one unit of work
    ///
    /// Both account updates and both ledger entries (`TRANSFER_OUT` on the
    /// source, `TRANSFER_IN` on the destination) become visible together or
    /// not at all. The sufficiency check uses the source's plain balance; the
    /// overdraft of a checking source is not available for transfers.
    ///
    /// # Errors
    ///
    /// - `InvalidAmount` if `amount <= 0`
    /// - `SameAccountTransfer` if `from == to`
    /// - `AccountNotFound` if either account does not exist
    /// - `InsufficientFunds` if `from.balance < amount`
    /// - `ArithmeticOverflow` if the destination balance would overflow
    /// - `Storage` if the store fails; nothing is persisted
    pub fn transfer(
        &self,
        from: AccountId,
        to: AccountId,
        amount: Amount,
        actor: ActorId,
        note: &str,
    ) -> Result<TransferReceipt, BankError> {
        if amount <= 0 {
            return Err(BankError::invalid_amount(amount));
        }
        if from == to {
            return Err(BankError::SameAccountTransfer { account: from });
        }

        let committed: Result<TransferReceipt, BankError> = self.locks.with_pair(from, to, || {
            let entries = self.storage.atomically(&[from, to], &mut |loaded| {
                let mut loaded = loaded.into_iter();
                let mut source = loaded
                    .next()
                    .flatten()
                    .ok_or_else(|| BankError::account_not_found(from))?;
                let mut destination = loaded
                    .next()
                    .flatten()
                    .ok_or_else(|| BankError::account_not_found(to))?;

                if source.balance < amount {
                    return Err(BankError::insufficient_funds(
                        from,
                        source.balance,
                        0,
                        amount,
                    ));
                }
                source.withdraw(amount)?;
                destination.deposit(amount)?;

                let mut batch = WriteBatch::new();
                batch.update_account(source);
                batch.update_account(destination);
                batch.append(NewTransaction::now(
                    from,
                    TransactionKind::TransferOut,
                    amount,
                    actor,
                    format!("{} -> to:{}", note, to),
                ));
                batch.append(NewTransaction::now(
                    to,
                    TransactionKind::TransferIn,
                    amount,
                    actor,
                    format!("{} <- from:{}", note, from),
                ));
                Ok(batch)
            })?;

            let mut entries = entries.into_iter();
            match (entries.next(), entries.next()) {
                (Some(debit), Some(credit)) => Ok(TransferReceipt { debit, credit }),
                _ => Err(StorageError::Corrupt(
                    "commit returned fewer than two ledger entries".to_string(),
                )
                .into()),
            }
        });

        self.release_if_unknown(committed)
            .inspect(|_| debug!(from, to, amount, actor, "transfer committed"))
            .inspect_err(|error| debug!(from, to, amount, %error, "transfer rolled back"))
    }

    /// Apply one operation record
    ///
    /// Dispatches to [`deposit`](Self::deposit), [`withdraw`](Self::withdraw)
    /// or [`transfer`](Self::transfer).
    pub fn process(&self, record: &OperationRecord) -> Result<(), BankError> {
        match record.op {
            OperationType::Deposit => self
                .deposit(record.account, record.amount, record.actor, &record.note)
                .map(|_| ()),
            OperationType::Withdraw => self
                .withdraw(record.account, record.amount, record.actor, &record.note)
                .map(|_| ()),
            OperationType::Transfer => {
                let to = record.to.ok_or_else(|| {
                    BankError::invalid_request("transfer requires a destination account")
                })?;
                self.transfer(record.account, to, record.amount, record.actor, &record.note)
                    .map(|_| ())
            }
        }
    }

    /// Look up an account
    pub fn account(&self, id: AccountId) -> Result<Account, BankError> {
        self.load(id)
    }

    /// All accounts, ascending by identifier
    pub fn accounts(&self) -> Result<Vec<Account>, BankError> {
        Ok(self.storage.list_accounts()?)
    }

    /// The full ledger, newest first
    pub fn transactions(&self) -> Result<Vec<Transaction>, BankError> {
        Ok(self.storage.list_transactions()?)
    }

    /// Ledger entries of every account held by `owner` (case-insensitive), newest first
    pub fn transactions_for_owner(&self, owner: &str) -> Result<Vec<Transaction>, BankError> {
        Ok(self.storage.list_transactions_for_owner(owner)?)
    }

    /// Drop the lock registered for an id that named no account
    fn release_if_unknown<T>(&self, result: Result<T, BankError>) -> Result<T, BankError> {
        if let Err(BankError::AccountNotFound { account }) = &result {
            self.locks.release(*account);
        }
        result
    }

    fn load(&self, id: AccountId) -> Result<Account, BankError> {
        self.storage
            .find_account(id)?
            .ok_or_else(|| BankError::account_not_found(id))
    }
}
