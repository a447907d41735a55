//! `SeaORM` entities for the ledger tables.

pub mod accounts;
pub mod balance_incidents;
pub mod cash_banks;
pub mod journal_entries;
pub mod journal_lines;

pub mod prelude {
    //! Entity aliases.
    pub use super::accounts::Entity as Accounts;
    pub use super::balance_incidents::Entity as BalanceIncidents;
    pub use super::cash_banks::Entity as CashBanks;
    pub use super::journal_entries::Entity as JournalEntries;
    pub use super::journal_lines::Entity as JournalLines;
}
