//! Double-entry bookkeeping logic.
//!
//! This module implements the journal side of the engine:
//! - Journal entries, lines and the posting state machine
//! - The balance rule (normal-balance side per account type)
//! - Posting validation
//! - Reversal by mirror entry
//! - The engine-wide error taxonomy

pub mod balance;
pub mod error;
pub mod journal;
pub mod reversal;
pub mod validation;

#[cfg(test)]
mod validation_props;

pub use balance::{AccountTotals, BalanceCalculator, NormalBalance};
pub use error::LedgerError;
pub use journal::{
    Journal, JournalEntry, JournalLine, JournalStatus, JournalTotals, NewJournalEntry,
    NewJournalLine,
};
pub use reversal::{REVERSAL_NUMBER_PREFIX, REVERSAL_SOURCE_TYPE, ReversalService};
pub use validation::{JournalValidator, PostingAccount};
