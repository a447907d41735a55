//! Core ledger consistency rules for Ledgerkeep.
//!
//! This crate contains pure business logic with ZERO web or database dependencies.
//! All domain types, validation rules, and calculations live here.
//!
//! # Modules
//!
//! - `chart` - Chart of accounts, hierarchy and code uniqueness
//! - `ledger` - Journal entries, posting, reversal and the balance rule
//! - `subledger` - Cash/bank records bound to GL accounts, drift detection
//! - `dedup` - Duplicate account detection, ranking and merge planning
//! - `book` - The engine tying the above together

pub mod book;
pub mod chart;
pub mod dedup;
pub mod ledger;
pub mod subledger;

pub use book::{LedgerBook, LedgerObserver, PostingResult, SharedLedger, TracingObserver};
pub use ledger::LedgerError;
