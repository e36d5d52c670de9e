//! Batch processing with account-based partitioning
//!
//! This module provides the `BatchProcessor` struct, which applies a batch of
//! operation records concurrently while keeping the outcome identical to
//! applying them one by one in file order.
//!
//! # Design
//!
//! A batch is split into groups such that two records sharing any account
//! always land in the same group. Transfers link their two accounts, so the
//! groups are the connected components of the "touches the same account"
//! relation. Each group runs sequentially on its own blocking task; distinct
//! groups share no account and therefore cannot observe each other.
//!
//! ```text
//! batch:  D(1)  T(1->2)  W(3)  D(2)  T(4->3)  D(5)
//! groups: [D(1), T(1->2), D(2)]   [W(3), T(4->3)]   [D(5)]
//! ```
//!
//! # Thread Safety
//!
//! The processor is cloneable and can be shared across tasks. Mutations go
//! through [`AccountService`], whose per-account locks still serialize any
//! overlap with work outside this processor.
//!
//! Every record gets a [`ProcessingResult`]. A record whose application
//! panics is reported as [`BankError::Interrupted`] and the rest of its group
//! still runs.

use std::any::Any;
use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};

use crate::core::AccountService;
use crate::types::{AccountId, BankError, OperationRecord};

/// Result of processing a single record
#[derive(Debug, Clone)]
pub struct ProcessingResult {
    /// The record that was processed
    pub record: OperationRecord,

    /// The outcome of applying it
    pub result: Result<(), BankError>,
}

/// Applies batches of records with per-group parallelism
#[derive(Clone)]
pub struct BatchProcessor {
    service: AccountService,
}

/// Union-find over account ids, indexed by first appearance
#[derive(Default)]
struct AccountGroups {
    index: HashMap<AccountId, usize>,
    parent: Vec<usize>,
}

impl AccountGroups {
    fn slot(&mut self, account: AccountId) -> usize {
        let next = self.parent.len();
        let slot = *self.index.entry(account).or_insert(next);
        if slot == next {
            self.parent.push(next);
        }
        slot
    }

    fn root(&mut self, mut slot: usize) -> usize {
        while self.parent[slot] != slot {
            self.parent[slot] = self.parent[self.parent[slot]];
            slot = self.parent[slot];
        }
        slot
    }

    fn union(&mut self, a: usize, b: usize) {
        let (a, b) = (self.root(a), self.root(b));
        if a != b {
            // Keep the earlier slot as root so group order follows the file
            let (low, high) = if a < b { (a, b) } else { (b, a) };
            self.parent[high] = low;
        }
    }
}

impl BatchProcessor {
    pub fn new(service: AccountService) -> Self {
        Self { service }
    }

    /// Split a batch into groups that share no account
    ///
    /// Groups are ordered by the position of their first record, and records
    /// keep their file order within a group.
    pub fn partition_by_accounts(&self, batch: Vec<OperationRecord>) -> Vec<Vec<OperationRecord>> {
        let mut groups = AccountGroups::default();
        let slots: Vec<usize> = batch
            .iter()
            .map(|record| {
                let first = groups.slot(record.account);
                for other in record.accounts().skip(1) {
                    let other = groups.slot(other);
                    groups.union(first, other);
                }
                first
            })
            .collect();

        let mut position: HashMap<usize, usize> = HashMap::new();
        let mut partitioned: Vec<Vec<OperationRecord>> = Vec::new();
        for (record, slot) in batch.into_iter().zip(slots) {
            let root = groups.root(slot);
            let group = *position.entry(root).or_insert_with(|| {
                partitioned.push(Vec::new());
                partitioned.len() - 1
            });
            partitioned[group].push(record);
        }

        partitioned
    }

    /// Apply one group's records sequentially
    pub fn process_group(&self, records: Vec<OperationRecord>) -> Vec<ProcessingResult> {
        records
            .into_iter()
            .map(|record| {
                // A panicking store call leaves its unit of work uncommitted
                let result =
                    panic::catch_unwind(AssertUnwindSafe(|| self.service.process(&record)))
                        .unwrap_or_else(|payload| {
                            Err(BankError::interrupted(panic_reason(&*payload)))
                        });
                ProcessingResult { record, result }
            })
            .collect()
    }

    /// Process a batch with one task per account group
    ///
    /// Service calls block on account locks and storage, so each group runs
    /// on the blocking pool.
    pub async fn process_batch(&self, batch: Vec<OperationRecord>) -> Vec<ProcessingResult> {
        let groups = self.partition_by_accounts(batch);

        let mut tasks = Vec::with_capacity(groups.len());
        for records in groups {
            let processor = self.clone();
            let size = records.len();
            let task = tokio::task::spawn_blocking(move || processor.process_group(records));
            tasks.push((size, task));
        }

        let mut results = Vec::new();
        for (size, task) in tasks {
            match task.await {
                Ok(group_results) => results.extend(group_results),
                Err(e) => {
                    tracing::error!(error = %e, records = size, "batch group task failed")
                }
            }
        }

        results
    }
}

fn panic_reason(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|reason| reason.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "panic while applying record".to_string())
}
