//! Account-related types for the Rust Banking Engine
//!
//! This module defines the Account structure and its two mutators. Every
//! balance change in the system is expressed as a sequence of `deposit` and
//! `withdraw` calls on an in-memory copy that is then persisted.

use super::error::BankError;
use super::transaction::{AccountId, Amount};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Account variant and its variant-specific terms
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum AccountKind {
    /// Plain account; the balance may never go negative
    ///
    /// The interest rate is informational and never applied by the engine.
    Savings { rate: Decimal },

    /// Account permitted to go negative down to `-overdraft`
    Checking { overdraft: Amount },
}

impl AccountKind {
    /// How far below zero the balance may go (0 for savings)
    pub fn overdraft_limit(&self) -> Amount {
        match self {
            AccountKind::Savings { .. } => 0,
            AccountKind::Checking { overdraft } => *overdraft,
        }
    }

    /// The interest rate, if this is a savings account
    pub fn rate(&self) -> Option<Decimal> {
        match self {
            AccountKind::Savings { rate } => Some(*rate),
            AccountKind::Checking { .. } => None,
        }
    }

    /// Lowercase variant label used in files and storage
    pub fn label(&self) -> &'static str {
        match self {
            AccountKind::Savings { .. } => "savings",
            AccountKind::Checking { .. } => "checking",
        }
    }
}

/// Client account state
///
/// Invariant: `balance >= -overdraft_limit()` before and after every mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// Store-assigned identifier
    pub id: AccountId,

    /// Display name of the owner; not unique
    pub owner: String,

    /// Balance in whole currency units
    pub balance: Amount,

    /// Variant and its terms
    pub kind: AccountKind,
}

impl Account {
    /// How far below zero this account may go
    pub fn overdraft_limit(&self) -> Amount {
        self.kind.overdraft_limit()
    }

    /// Credit the account
    ///
    /// # Errors
    ///
    /// - `InvalidAmount` if `amount <= 0`
    /// - `ArithmeticOverflow` if the balance would exceed `i64::MAX`
    pub fn deposit(&mut self, amount: Amount) -> Result<(), BankError> {
        if amount <= 0 {
            return Err(BankError::invalid_amount(amount));
        }

        self.balance = self
            .balance
            .checked_add(amount)
            .ok_or_else(|| BankError::arithmetic_overflow("deposit", self.id))?;

        Ok(())
    }

    /// Debit the account, honouring the overdraft limit of its variant
    ///
    /// Fails when `balance + overdraft_limit < amount`; for savings accounts
    /// this reduces to `balance < amount`. The balance is untouched on failure.
    ///
    /// # Errors
    ///
    /// - `InvalidAmount` if `amount <= 0`
    /// - `InsufficientFunds` if the withdrawal would cross the overdraft floor
    pub fn withdraw(&mut self, amount: Amount) -> Result<(), BankError> {
        if amount <= 0 {
            return Err(BankError::invalid_amount(amount));
        }

        let overdraft = self.overdraft_limit();
        let headroom = self.balance.saturating_add(overdraft);
        if headroom < amount {
            return Err(BankError::insufficient_funds(
                self.id,
                self.balance,
                overdraft,
                amount,
            ));
        }

        // headroom >= amount > 0 and overdraft >= 0 keep this in range
        self.balance -= amount;

        Ok(())
    }
}

impl fmt::Display for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            AccountKind::Savings { rate } => write!(
                f,
                "{}: Savings - {} (balance={}) rate={}",
                self.id, self.owner, self.balance, rate
            ),
            AccountKind::Checking { overdraft } => write!(
                f,
                "{}: Checking - {} (balance={}) overdraft={}",
                self.id, self.owner, self.balance, overdraft
            ),
        }
    }
}

/// An account opening request; the store assigns the identifier
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAccount {
    pub owner: String,
    pub balance: Amount,
    pub kind: AccountKind,
}

impl NewAccount {
    /// Open a savings account
    pub fn savings(owner: impl Into<String>, balance: Amount, rate: Decimal) -> Self {
        NewAccount {
            owner: owner.into(),
            balance,
            kind: AccountKind::Savings { rate },
        }
    }

    /// Open a checking account
    pub fn checking(owner: impl Into<String>, balance: Amount, overdraft: Amount) -> Self {
        NewAccount {
            owner: owner.into(),
            balance,
            kind: AccountKind::Checking { overdraft },
        }
    }

    /// Check the opening state against the account invariant
    pub fn validate(&self) -> Result<(), BankError> {
        let overdraft = self.kind.overdraft_limit();
        if overdraft < 0 {
            return Err(BankError::invalid_request(format!(
                "overdraft limit {} must not be negative",
                overdraft
            )));
        }
        if self.balance < -overdraft {
            return Err(BankError::invalid_request(format!(
                "opening balance {} is below the overdraft floor {}",
                self.balance, -overdraft
            )));
        }
        Ok(())
    }

    /// Attach the store-assigned identifier
    pub fn with_id(self, id: AccountId) -> Account {
        Account {
            id,
            owner: self.owner,
            balance: self.balance,
            kind: self.kind,
        }
    }
}
