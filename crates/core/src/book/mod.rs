//! The ledger engine: chart, journal and sub-ledgers behind one API.

pub mod engine;
pub mod observer;
pub mod shared;

#[cfg(test)]
mod book_props;
#[cfg(test)]
mod scenario_tests;

pub use engine::{LedgerBook, PostingResult};
pub use observer::{LedgerObserver, TracingObserver};
pub use shared::SharedLedger;
