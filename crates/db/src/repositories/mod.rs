//! Repository abstractions for data access.
//!
//! Repositories provide a clean interface for database operations,
//! hiding the `SeaORM` implementation details from the rest of the application.
//! Mutations load a working set, run the core ledger rules on it and write
//! the changed rows back in the same transaction.

pub mod account;
pub mod duplicate;
pub mod journal;
pub mod store;
pub mod subledger;
mod working_set;

pub use account::AccountRepository;
pub use duplicate::DuplicateRepository;
pub use journal::JournalRepository;
pub use store::LedgerStore;
pub use subledger::SubledgerRepository;
