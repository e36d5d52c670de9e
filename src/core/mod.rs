//! Core business logic module
//!
//! This module contains the account mutation components:
//! - `locks` - Per-account lock registry with ordered pair acquisition
//! - `service` - Deposit, withdraw and transfer orchestration
//! - `batch_processor` - Concurrent application of operation batches

pub mod batch_processor;
pub mod locks;
pub mod service;

pub use batch_processor::{BatchProcessor, ProcessingResult};
pub use locks::AccountLocks;
pub use service::{AccountService, TransferReceipt};
