//! Durable SQLite store
//!
//! The schema mirrors the banking tables: one row per account with its
//! variant terms, one row per ledger entry.
//!
//! [`Storage::commit`] and [`Storage::atomically`] each run inside one
//! `BEGIN IMMEDIATE` transaction, which takes the database write lock before
//! the first read. Handles on the same file therefore serialize their units of
//! work, waiting up to [`BUSY_TIMEOUT`] for one another. Any error drops the
//! transaction, which rolls it back.

use super::{Storage, StorageError, UnitOfWork, WriteBatch};
use crate::types::{
    Account, AccountId, AccountKind, BankError, NewAccount, NewTransaction, Transaction,
    TransactionKind,
};
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row, TransactionBehavior};
use rust_decimal::Decimal;
use std::path::Path;
use std::str::FromStr;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

const ACCOUNT_COLUMNS: &str = "id, owner, balance, kind, overdraft, rate";
/// How long a unit of work waits for another handle's write lock
pub const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const TRANSACTION_COLUMNS: &str = "t.id, t.account_id, t.kind, t.amount, t.ts, t.performed_by, t.note";

pub struct SqliteStorage {
    conn: Mutex<Connection>,
}

impl SqliteStorage {
    /// Open (or create) a database file
    pub fn open(path: &Path) -> Result<Self, StorageError> {
        let conn = Connection::open(path)?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
        Self::with_connection(conn)
    }

    /// Private in-memory database, mostly useful for tests
    pub fn in_memory() -> Result<Self, StorageError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Self::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> Result<Self, StorageError> {
        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS accounts (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                owner TEXT NOT NULL,
                balance INTEGER NOT NULL,
                kind TEXT NOT NULL,
                overdraft INTEGER,
                rate TEXT
            );

            CREATE TABLE IF NOT EXISTS transactions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                account_id INTEGER NOT NULL,
                kind TEXT NOT NULL,
                amount INTEGER NOT NULL,
                ts TEXT NOT NULL,
                performed_by INTEGER NOT NULL,
                note TEXT NOT NULL,
                FOREIGN KEY (account_id) REFERENCES accounts(id)
            );

            CREATE INDEX IF NOT EXISTS idx_transactions_account
                ON transactions(account_id, ts);
            ",
        )?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, StorageError> {
        self.conn.lock().map_err(|_| StorageError::Poisoned)
    }
}

/// Raw column values of an `accounts` row
struct AccountRow {
    id: i64,
    owner: String,
    balance: i64,
    kind: String,
    overdraft: Option<i64>,
    rate: Option<String>,
}

impl AccountRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            owner: row.get(1)?,
            balance: row.get(2)?,
            kind: row.get(3)?,
            overdraft: row.get(4)?,
            rate: row.get(5)?,
        })
    }
}

impl TryFrom<AccountRow> for Account {
    type Error = StorageError;

    fn try_from(row: AccountRow) -> Result<Self, Self::Error> {
        let kind = match row.kind.as_str() {
            "SAVINGS" => {
                let rate = match row.rate {
                    Some(rate) => Decimal::from_str(&rate).map_err(|e| {
                        StorageError::Corrupt(format!("account {}: rate '{}': {}", row.id, rate, e))
                    })?,
                    None => Decimal::ZERO,
                };
                AccountKind::Savings { rate }
            }
            "CHECKING" => AccountKind::Checking {
                overdraft: row.overdraft.unwrap_or(0),
            },
            other => {
                return Err(StorageError::Corrupt(format!(
                    "account {}: unknown kind '{}'",
                    row.id, other
                )))
            }
        };

        Ok(Account {
            id: from_sql_id(row.id)?,
            owner: row.owner,
            balance: row.balance,
            kind,
        })
    }
}

/// Raw column values of a `transactions` row
struct TransactionRow {
    id: i64,
    account: i64,
    kind: String,
    amount: i64,
    timestamp: String,
    actor: i64,
    note: String,
}

impl TransactionRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            account: row.get(1)?,
            kind: row.get(2)?,
            amount: row.get(3)?,
            timestamp: row.get(4)?,
            actor: row.get(5)?,
            note: row.get(6)?,
        })
    }
}

impl TryFrom<TransactionRow> for Transaction {
    type Error = StorageError;

    fn try_from(row: TransactionRow) -> Result<Self, Self::Error> {
        let kind = TransactionKind::parse(&row.kind).ok_or_else(|| {
            StorageError::Corrupt(format!("transaction {}: unknown kind '{}'", row.id, row.kind))
        })?;
        let timestamp = DateTime::parse_from_rfc3339(&row.timestamp)
            .map_err(|e| {
                StorageError::Corrupt(format!(
                    "transaction {}: timestamp '{}': {}",
                    row.id, row.timestamp, e
                ))
            })?
            .with_timezone(&Utc);

        Ok(Transaction {
            id: from_sql_id(row.id)?,
            account: from_sql_id(row.account)?,
            kind,
            amount: row.amount,
            timestamp,
            actor: from_sql_id(row.actor)?,
            note: row.note,
        })
    }
}

fn to_sql_id(id: u64) -> Result<i64, StorageError> {
    i64::try_from(id).map_err(|_| StorageError::Backend(format!("identifier {} out of range", id)))
}

fn from_sql_id(id: i64) -> Result<u64, StorageError> {
    u64::try_from(id).map_err(|_| StorageError::Corrupt(format!("negative identifier {}", id)))
}

fn kind_columns(kind: &AccountKind) -> (&'static str, Option<i64>, Option<String>) {
    match kind {
        AccountKind::Savings { rate } => ("SAVINGS", None, Some(rate.to_string())),
        AccountKind::Checking { overdraft } => ("CHECKING", Some(*overdraft), None),
    }
}

// Fixed precision and a `Z` suffix keep lexical order equal to time order.
fn timestamp_to_sql(timestamp: &DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn find_account_row(conn: &Connection, id: AccountId) -> Result<Option<Account>, StorageError> {
    let row = conn
        .query_row(
            &format!("SELECT {} FROM accounts WHERE id = ?1", ACCOUNT_COLUMNS),
            params![to_sql_id(id)?],
            AccountRow::from_row,
        )
        .optional()?;
    row.map(Account::try_from).transpose()
}

fn update_account_row(conn: &Connection, account: &Account) -> Result<(), StorageError> {
    let (kind, overdraft, rate) = kind_columns(&account.kind);
    let changed = conn.execute(
        "UPDATE accounts SET owner = ?1, balance = ?2, kind = ?3, overdraft = ?4, rate = ?5 WHERE id = ?6",
        params![
            account.owner,
            account.balance,
            kind,
            overdraft,
            rate,
            to_sql_id(account.id)?
        ],
    )?;
    if changed == 0 {
        return Err(StorageError::MissingAccount(account.id));
    }
    Ok(())
}

fn insert_transaction_row(
    conn: &Connection,
    transaction: NewTransaction,
) -> Result<Transaction, StorageError> {
    let exists: Option<i64> = conn
        .query_row(
            "SELECT id FROM accounts WHERE id = ?1",
            params![to_sql_id(transaction.account)?],
            |row| row.get(0),
        )
        .optional()?;
    if exists.is_none() {
        return Err(StorageError::MissingAccount(transaction.account));
    }

    conn.execute(
        "INSERT INTO transactions (account_id, kind, amount, ts, performed_by, note) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            to_sql_id(transaction.account)?,
            transaction.kind.as_str(),
            transaction.amount,
            timestamp_to_sql(&transaction.timestamp),
            to_sql_id(transaction.actor)?,
            transaction.note,
        ],
    )?;
    let id = from_sql_id(conn.last_insert_rowid())?;
    Ok(transaction.with_id(id))
}

fn write_batch(conn: &Connection, batch: WriteBatch) -> Result<Vec<Transaction>, StorageError> {
    let (accounts, transactions) = batch.into_parts();
    for account in &accounts {
        update_account_row(conn, account)?;
    }
    transactions
        .into_iter()
        .map(|transaction| insert_transaction_row(conn, transaction))
        .collect()
}

fn query_transactions(
    conn: &Connection,
    sql: &str,
    params: impl rusqlite::Params,
) -> Result<Vec<Transaction>, StorageError> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map(params, TransactionRow::from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    rows.into_iter().map(Transaction::try_from).collect()
}

impl Storage for SqliteStorage {
    fn save_account(&self, account: NewAccount) -> Result<Account, StorageError> {
        let conn = self.lock()?;
        let (kind, overdraft, rate) = kind_columns(&account.kind);
        conn.execute(
            "INSERT INTO accounts (owner, balance, kind, overdraft, rate) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![account.owner, account.balance, kind, overdraft, rate],
        )?;
        let id = from_sql_id(conn.last_insert_rowid())?;
        Ok(account.with_id(id))
    }

    fn update_account(&self, account: &Account) -> Result<(), StorageError> {
        let conn = self.lock()?;
        update_account_row(&conn, account)
    }

    fn find_account(&self, id: AccountId) -> Result<Option<Account>, StorageError> {
        let conn = self.lock()?;
        find_account_row(&conn, id)
    }

    fn list_accounts(&self) -> Result<Vec<Account>, StorageError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM accounts ORDER BY id",
            ACCOUNT_COLUMNS
        ))?;
        let rows = stmt
            .query_map([], AccountRow::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        rows.into_iter().map(Account::try_from).collect()
    }

    fn save_transaction(&self, transaction: NewTransaction) -> Result<Transaction, StorageError> {
        let conn = self.lock()?;
        insert_transaction_row(&conn, transaction)
    }

    fn list_transactions(&self) -> Result<Vec<Transaction>, StorageError> {
        let conn = self.lock()?;
        query_transactions(
            &conn,
            &format!(
                "SELECT {} FROM transactions t ORDER BY t.ts DESC, t.id DESC",
                TRANSACTION_COLUMNS
            ),
            [],
        )
    }

    fn list_transactions_for_owner(
        &self,
        owner: &str,
    ) -> Result<Vec<Transaction>, StorageError> {
        let conn = self.lock()?;
        query_transactions(
            &conn,
            &format!(
                "SELECT {} FROM transactions t JOIN accounts a ON a.id = t.account_id \
                 WHERE LOWER(a.owner) = LOWER(?1) ORDER BY t.ts DESC, t.id DESC",
                TRANSACTION_COLUMNS
            ),
            params![owner],
        )
    }

    fn commit(&self, batch: WriteBatch) -> Result<Vec<Transaction>, StorageError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let stored = write_batch(&tx, batch)?;
        tx.commit()?;
        Ok(stored)
    }

    fn atomically(
        &self,
        ids: &[AccountId],
        work: &mut UnitOfWork<'_>,
    ) -> Result<Vec<Transaction>, BankError> {
        let mut conn = self.lock()?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(StorageError::from)?;

        let accounts = ids
            .iter()
            .map(|id| find_account_row(&tx, *id))
            .collect::<Result<Vec<_>, _>>()?;
        let batch = work(accounts)?;
        let stored = write_batch(&tx, batch)?;

        tx.commit().map_err(StorageError::from)?;
        Ok(stored)
    }
}
