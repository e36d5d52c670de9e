//! Per-account lock registry
//!
//! This module provides `AccountLocks`, a concurrent map from account id to
//! a mutex, populated lazily on first reference.
//!
//! # Design
//!
//! The registry uses `DashMap` so that the get-or-create step is atomic:
//! two threads asking for the lock of the same, never-seen account receive
//! the same mutex. A lock lives as long as the registry unless it is released
//! for an id that turned out not to name an account.
//!
//! Like the account update API it replaces, access is closure based: the
//! closure runs while the lock(s) are held and they are released when it
//! returns, whether it succeeded or not.
//!
//! # Deadlock Avoidance
//!
//! Operations that touch two accounts must go through
//! [`AccountLocks::with_pair`], which always acquires in ascending account id
//! order regardless of which account is the source and which the destination.

use crate::types::AccountId;
use dashmap::DashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

type AccountLock = Arc<Mutex<()>>;

/// Registry of per-account mutual-exclusion locks
///
/// Owned by the mutation service for its lifetime; there is no process-wide
/// instance.
#[derive(Debug, Default)]
pub struct AccountLocks {
    locks: DashMap<AccountId, AccountLock>,
}

// Guarded data is `()`, so a poisoned lock carries no torn state.
fn acquire(lock: &Mutex<()>) -> MutexGuard<'_, ()> {
    lock.lock().unwrap_or_else(PoisonError::into_inner)
}

impl AccountLocks {
    pub fn new() -> Self {
        Self {
            locks: DashMap::new(),
        }
    }

    /// Get the lock for an account, creating it on first reference
    ///
    /// The Arc is cloned out so that no DashMap shard stays locked while the
    /// caller blocks on the account mutex.
    fn lock_for(&self, account: AccountId) -> AccountLock {
        let entry = self
            .locks
            .entry(account)
            .or_insert_with(|| Arc::new(Mutex::new(())));
        Arc::clone(entry.value())
    }

    /// Run `f` while holding one account exclusively
    ///
    /// Blocks until the lock is available; there is no timeout.
    pub fn with_account<T, F>(&self, account: AccountId, f: F) -> T
    where
        F: FnOnce() -> T,
    {
        let lock = self.lock_for(account);
        let _guard = acquire(&lock);
        f()
    }

    /// Run `f` while holding two accounts exclusively
    ///
    /// Locks are taken in ascending id order, so concurrent calls naming the
    /// same pair in opposite order cannot deadlock. Naming the same account
    /// twice takes its lock once.
    pub fn with_pair<T, F>(&self, a: AccountId, b: AccountId, f: F) -> T
    where
        F: FnOnce() -> T,
    {
        let (low, high) = if a <= b { (a, b) } else { (b, a) };

        let first = self.lock_for(low);
        let _first = acquire(&first);
        if low == high {
            return f();
        }

        let second = self.lock_for(high);
        let _second = acquire(&second);
        f()
    }

    /// Remove an account's lock if nobody else holds it
    ///
    /// Returns whether the entry was removed. A lock that another caller has
    /// cloned out stays, so two callers never end up with different mutexes
    /// for one account.
    pub fn release(&self, account: AccountId) -> bool {
        self.locks
            .remove_if(&account, |_, lock| Arc::strong_count(lock) == 1)
            .is_some()
    }

    /// Number of accounts currently holding a registered lock
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}
