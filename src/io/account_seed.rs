//! Account seed loading
//!
//! Opens the accounts listed in a seed file, in file order, so that a fresh
//! store assigns them ids `1..=n`. Unlike operation scripts, a bad seed row
//! aborts the load: skipping it would silently shift every later id.
//!
//! Seeding only happens into an empty store. A durable store that already
//! holds accounts keeps them, and the seed file is left unread.

use crate::core::AccountService;
use crate::io::csv_format::{convert_account_record, AccountCsvRecord};
use crate::types::Account;
use csv::{ReaderBuilder, Trim};
use std::fs::File;
use std::path::Path;
use tracing::info;

/// Open every account listed in the seed file at `path`
///
/// # Returns
///
/// * `Ok(Vec<Account>)` - The opened accounts with their assigned ids; empty
///   when the store already held accounts
/// * `Err(String)` - The first unreadable, malformed or refused row
pub fn load_accounts(path: &Path, service: &AccountService) -> Result<Vec<Account>, String> {
    let existing = service
        .accounts()
        .map_err(|e| format!("Failed to list accounts: {}", e))?;
    if !existing.is_empty() {
        info!(
            existing = existing.len(),
            path = %path.display(),
            "store already holds accounts, skipping seed file"
        );
        return Ok(Vec::new());
    }

    let file = File::open(path)
        .map_err(|e| format!("Failed to open file '{}': {}", path.display(), e))?;

    let mut reader = ReaderBuilder::new()
        .trim(Trim::All)
        .flexible(true)
        .from_reader(file);

    let mut opened = Vec::new();
    for (index, row) in reader.deserialize::<AccountCsvRecord>().enumerate() {
        let line = index + 2;
        let request = row
            .map_err(|e| format!("Line {}: malformed row: {}", line, e))
            .and_then(|csv_record| {
                convert_account_record(csv_record).map_err(|e| format!("Line {}: {}", line, e))
            })?;
        let account = service
            .open_account(request)
            .map_err(|e| format!("Line {}: {}", line, e))?;
        opened.push(account);
    }

    info!(count = opened.len(), path = %path.display(), "accounts loaded");
    Ok(opened)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{MemoryStorage, SqliteStorage};
    use crate::types::AccountKind;
    use rust_decimal::Decimal;
    use std::io::Write;
    use std::sync::Arc;
    use tempfile::{NamedTempFile, TempDir};

    fn seed_file(rows: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "owner,kind,balance,overdraft,rate\n{}", rows).unwrap();
        file.flush().unwrap();
        file
    }

    fn service() -> AccountService {
        AccountService::new(Arc::new(MemoryStorage::new()))
    }

    #[test]
    fn test_load_accounts_in_file_order() {
        let file = seed_file(
            "Alice,savings,1000,,0.02\n\
             Bob,checking,500,200,\n",
        );
        let service = service();

        let opened = load_accounts(file.path(), &service).unwrap();

        assert_eq!(opened.len(), 2);
        assert_eq!(opened[0].id, 1);
        assert_eq!(opened[0].owner, "Alice");
        assert_eq!(
            opened[0].kind,
            AccountKind::Savings {
                rate: Decimal::new(2, 2)
            }
        );
        assert_eq!(opened[1].id, 2);
        assert_eq!(opened[1].kind, AccountKind::Checking { overdraft: 200 });
        assert_eq!(service.accounts().unwrap(), opened);
    }

    #[test]
    fn test_load_accounts_stops_at_bad_row() {
        let file = seed_file(
            "Alice,savings,1000,,\n\
             Bob,brokerage,500,,\n\
             Carol,checking,0,0,\n",
        );
        let service = service();

        let error = load_accounts(file.path(), &service).unwrap_err();

        assert!(error.contains("Line 3"));
        assert!(error.contains("Invalid account kind"));
        assert_eq!(service.accounts().unwrap().len(), 1);
    }

    #[test]
    fn test_load_accounts_rejects_balance_below_floor() {
        let file = seed_file("Dave,checking,-300,200,\n");
        let error = load_accounts(file.path(), &service()).unwrap_err();
        assert!(error.contains("below the overdraft floor"));
    }

    #[test]
    fn test_load_accounts_missing_file() {
        let error = load_accounts(Path::new("no_such_seed.csv"), &service()).unwrap_err();
        assert!(error.contains("Failed to open file"));
    }

    #[test]
    fn test_load_accounts_skips_populated_store() {
        let file = seed_file(
            "Alice,savings,1000,,0.02\n\
             Bob,checking,500,200,\n",
        );
        let service = service();
        load_accounts(file.path(), &service).unwrap();
        service.deposit(2, 50, 1, "").unwrap();

        let second = load_accounts(file.path(), &service).unwrap();

        assert!(second.is_empty());
        let accounts = service.accounts().unwrap();
        assert_eq!(accounts.len(), 2);
        assert_eq!(accounts[1].balance, 550);
    }

    #[test]
    fn test_load_accounts_once_per_database() {
        let file = seed_file(
            "Alice,savings,1000,,0.02\n\
             Bob,checking,500,200,\n",
        );
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bank.db");

        for _ in 0..2 {
            let service = AccountService::new(Arc::new(SqliteStorage::open(&path).unwrap()));
            load_accounts(file.path(), &service).unwrap();
        }

        let service = AccountService::new(Arc::new(SqliteStorage::open(&path).unwrap()));
        let owners: Vec<String> = service
            .accounts()
            .unwrap()
            .into_iter()
            .map(|account| account.owner)
            .collect();
        assert_eq!(owners, vec!["Alice", "Bob"]);
    }
}
