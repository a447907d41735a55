//! Thread-safe handle to a [`LedgerBook`].

use std::sync::Arc;

use ledgerkeep_shared::types::{JournalEntryId, SubledgerId};
use parking_lot::Mutex;
use rust_decimal::Decimal;

use super::engine::{LedgerBook, PostingResult};
use crate::dedup::ResolutionReport;
use crate::ledger::{LedgerError, NewJournalEntry};
use crate::subledger::SyncOutcome;

/// Cloneable handle that serializes every operation on one book.
///
/// The lock is held for the whole operation, so concurrent posts never
/// interleave and a merge never sees a half-applied post.
#[derive(Debug, Clone, Default)]
pub struct SharedLedger {
    inner: Arc<Mutex<LedgerBook>>,
}

impl SharedLedger {
    /// Wraps a book.
    #[must_use]
    pub fn new(book: LedgerBook) -> Self {
        Self {
            inner: Arc::new(Mutex::new(book)),
        }
    }

    /// Runs `f` with exclusive access.
    pub fn write<R>(&self, f: impl FnOnce(&mut LedgerBook) -> R) -> R {
        f(&mut self.inner.lock())
    }

    /// Runs `f` with the book locked for reading.
    pub fn read<R>(&self, f: impl FnOnce(&LedgerBook) -> R) -> R {
        f(&self.inner.lock())
    }

    /// See [`LedgerBook::post_entry`].
    pub fn post_entry(&self, input: NewJournalEntry) -> Result<PostingResult, LedgerError> {
        self.write(|book| book.post_entry(input))
    }

    /// See [`LedgerBook::reverse_entry`].
    pub fn reverse_entry(&self, id: JournalEntryId, reason: &str) -> Result<PostingResult, LedgerError> {
        self.write(|book| book.reverse_entry(id, reason))
    }

    /// See [`LedgerBook::on_subledger_balance_changed`].
    pub fn on_subledger_balance_changed(
        &self,
        subledger_id: SubledgerId,
        new_balance: Decimal,
    ) -> Result<SyncOutcome, LedgerError> {
        self.write(|book| book.on_subledger_balance_changed(subledger_id, new_balance))
    }

    /// See [`LedgerBook::resolve_duplicates`].
    pub fn resolve_duplicates(&self, scope: Option<&str>) -> ResolutionReport {
        self.write(|book| book.resolve_duplicates(scope))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart::{AccountType, NewAccount};
    use crate::ledger::NewJournalLine;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;
    use std::thread;

    #[test]
    fn test_concurrent_posts_keep_tree_consistent() {
        let ledger = SharedLedger::default();
        let (cash, revenue) = ledger.write(|book| {
            book.create_account(NewAccount::new("1000", "Assets", AccountType::Asset).header())
                .unwrap();
            let cash = book
                .create_account(NewAccount::new("1100", "Cash", AccountType::Asset).under("1000"))
                .unwrap();
            let revenue = book
                .create_account(NewAccount::new("4000", "Sales", AccountType::Revenue))
                .unwrap();
            (cash.id, revenue.id)
        });
        let date = NaiveDate::from_ymd_opt(2026, 3, 1).unwrap();

        thread::scope(|scope| {
            for worker in 0..8 {
                let ledger = ledger.clone();
                scope.spawn(move || {
                    for n in 0..10 {
                        let entry = NewJournalEntry::new(format!("JE-{worker}-{n}"), date)
                            .line(NewJournalLine::debit(cash, dec!(1.25)))
                            .line(NewJournalLine::credit(revenue, dec!(1.25)));
                        ledger.post_entry(entry).unwrap();
                    }
                });
            }
        });

        ledger.read(|book| {
            let assets = book.chart().find_by_code("1000").unwrap();
            assert_eq!(book.journal().len(), 80);
            assert_eq!(book.chart().get(cash).unwrap().balance, dec!(100));
            assert_eq!(assets.balance, dec!(100));
            assert_eq!(book.chart().get(revenue).unwrap().balance, dec!(100));
        });
    }

    #[test]
    fn test_duplicate_number_rejected_across_threads() {
        let ledger = SharedLedger::default();
        let (cash, revenue) = ledger.write(|book| {
            let cash = book
                .create_account(NewAccount::new("1100", "Cash", AccountType::Asset))
                .unwrap();
            let revenue = book
                .create_account(NewAccount::new("4000", "Sales", AccountType::Revenue))
                .unwrap();
            (cash.id, revenue.id)
        });
        let date = NaiveDate::from_ymd_opt(2026, 3, 1).unwrap();

        let results: Vec<_> = thread::scope(|scope| {
            let handles: Vec<_> = (0..4)
                .map(|_| {
                    let ledger = ledger.clone();
                    scope.spawn(move || {
                        ledger.post_entry(
                            NewJournalEntry::new("JE-SAME", date)
                                .line(NewJournalLine::debit(cash, dec!(5)))
                                .line(NewJournalLine::credit(revenue, dec!(5))),
                        )
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        assert!(
            results
                .iter()
                .filter_map(|r| r.as_ref().err())
                .all(|e| matches!(e, LedgerError::DuplicateEntryNumber(_)))
        );
        ledger.read(|book| assert_eq!(book.chart().get(cash).unwrap().balance, dec!(5)));
    }
}
