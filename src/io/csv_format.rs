//! CSV format handling for account seeds, operation scripts and output
//!
//! This module centralizes all CSV format concerns, providing:
//! - Record structures for deserialization of seed and script rows
//! - Conversion from CSV records to domain types
//! - Account and ledger output serialization
//!
//! All functions are pure (no I/O) for easy testing.

use crate::types::{
    Account, AccountId, AccountKind, ActorId, Amount, NewAccount, OperationRecord, OperationType,
    Transaction,
};
use chrono::SecondsFormat;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::io::Write;
use std::str::FromStr;

/// Operation script row
///
/// Columns: type, account, to, amount, actor, note. `to` is only meaningful
/// for transfers; `actor` and `note` may be left empty.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct OperationCsvRecord {
    #[serde(rename = "type")]
    pub op: String,
    pub account: AccountId,
    pub to: Option<AccountId>,
    pub amount: Option<String>,
    pub actor: Option<ActorId>,
    pub note: Option<String>,
}

/// Account seed row
///
/// Columns: owner, kind, balance, overdraft, rate. Savings rows ignore
/// `overdraft`; checking rows ignore `rate`.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct AccountCsvRecord {
    pub owner: String,
    pub kind: String,
    pub balance: Amount,
    pub overdraft: Option<Amount>,
    pub rate: Option<String>,
}

/// Convert an OperationCsvRecord to an OperationRecord
///
/// This function:
/// - Parses the operation type (case-insensitive)
/// - Parses the amount as a whole number of currency units
/// - Requires a destination account for transfers
///
/// Amount sign is not checked here; non-positive amounts are rejected by
/// the service so that they surface as `InvalidAmount`.
///
/// # Returns
///
/// * `Ok(OperationRecord)` - Successfully converted record
/// * `Err(String)` - Error message describing the conversion failure
pub fn convert_operation_record(csv_record: OperationCsvRecord) -> Result<OperationRecord, String> {
    let op = match csv_record.op.to_lowercase().as_str() {
        "deposit" => OperationType::Deposit,
        "withdraw" => OperationType::Withdraw,
        "transfer" => OperationType::Transfer,
        _ => {
            return Err(format!(
                "Invalid operation type: '{}' for account {}",
                csv_record.op, csv_record.account
            ))
        }
    };

    let amount = match csv_record.amount {
        Some(amount_str) if !amount_str.trim().is_empty() => {
            Amount::from_str(amount_str.trim()).map_err(|_| {
                format!(
                    "Invalid amount '{}' for account {}",
                    amount_str, csv_record.account
                )
            })?
        }
        _ => {
            return Err(format!(
                "{:?} on account {} requires an amount",
                op, csv_record.account
            ))
        }
    };

    if op == OperationType::Transfer && csv_record.to.is_none() {
        return Err(format!(
            "Transfer from account {} requires a destination account",
            csv_record.account
        ));
    }

    Ok(OperationRecord {
        op,
        account: csv_record.account,
        to: csv_record.to,
        amount,
        actor: csv_record.actor.unwrap_or_default(),
        note: csv_record.note.unwrap_or_default(),
    })
}

/// Convert an AccountCsvRecord to an account opening request
///
/// A missing overdraft defaults to 0 and a missing rate to 0. The opening
/// terms themselves are validated by the service.
pub fn convert_account_record(csv_record: AccountCsvRecord) -> Result<NewAccount, String> {
    match csv_record.kind.to_lowercase().as_str() {
        "savings" => {
            let rate = match csv_record.rate {
                Some(rate_str) if !rate_str.trim().is_empty() => {
                    Decimal::from_str(rate_str.trim()).map_err(|_| {
                        format!(
                            "Invalid rate '{}' for owner '{}'",
                            rate_str, csv_record.owner
                        )
                    })?
                }
                _ => Decimal::ZERO,
            };
            Ok(NewAccount::savings(csv_record.owner, csv_record.balance, rate))
        }
        "checking" => Ok(NewAccount::checking(
            csv_record.owner,
            csv_record.balance,
            csv_record.overdraft.unwrap_or(0),
        )),
        _ => Err(format!(
            "Invalid account kind: '{}' for owner '{}'",
            csv_record.kind, csv_record.owner
        )),
    }
}

/// Write account states to CSV format
///
/// Writes accounts with columns: id, owner, kind, balance, overdraft, rate.
/// Accounts are sorted by id for deterministic output. Savings accounts
/// report an overdraft of 0; checking accounts leave the rate empty.
///
/// # Returns
///
/// * `Ok(())` if writing succeeded
/// * `Err(String)` if a write error occurred
pub fn write_accounts_csv(accounts: &[Account], output: &mut dyn Write) -> Result<(), String> {
    let mut writer = csv::Writer::from_writer(output);

    writer
        .write_record(["id", "owner", "kind", "balance", "overdraft", "rate"])
        .map_err(|e| format!("Failed to write CSV header: {}", e))?;

    let mut sorted_accounts = accounts.to_vec();
    sorted_accounts.sort_by_key(|account| account.id);

    for account in sorted_accounts {
        let rate = match &account.kind {
            AccountKind::Savings { rate } => rate.to_string(),
            AccountKind::Checking { .. } => String::new(),
        };
        writer
            .write_record(&[
                account.id.to_string(),
                account.owner.clone(),
                account.kind.label().to_string(),
                account.balance.to_string(),
                account.overdraft_limit().to_string(),
                rate,
            ])
            .map_err(|e| format!("Failed to write account record: {}", e))?;
    }

    writer
        .flush()
        .map_err(|e| format!("Failed to flush output: {}", e))?;

    Ok(())
}

/// Write ledger entries to CSV format
///
/// Columns: id, account, kind, amount, timestamp, actor, note. Entries are
/// written in the order given; timestamps are RFC 3339 UTC with microseconds.
pub fn write_transactions_csv(
    transactions: &[Transaction],
    output: &mut dyn Write,
) -> Result<(), String> {
    let mut writer = csv::Writer::from_writer(output);

    writer
        .write_record(["id", "account", "kind", "amount", "timestamp", "actor", "note"])
        .map_err(|e| format!("Failed to write CSV header: {}", e))?;

    for transaction in transactions {
        writer
            .write_record(&[
                transaction.id.to_string(),
                transaction.account.to_string(),
                transaction.kind.as_str().to_string(),
                transaction.amount.to_string(),
                transaction
                    .timestamp
                    .to_rfc3339_opts(SecondsFormat::Micros, true),
                transaction.actor.to_string(),
                transaction.note.clone(),
            ])
            .map_err(|e| format!("Failed to write ledger record: {}", e))?;
    }

    writer
        .flush()
        .map_err(|e| format!("Failed to flush output: {}", e))?;

    Ok(())
}
