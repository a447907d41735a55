//! Reversing entries for posted journal entries.
//!
//! A reversal never edits the original lines. It posts a mirror entry with
//! debits and credits swapped per line, then marks the original REVERSED.

use chrono::NaiveDate;
use rust_decimal::Decimal;

use super::error::LedgerError;
use super::journal::{JournalEntry, JournalStatus, NewJournalEntry, NewJournalLine};

/// Source type carried by every mirror entry.
pub const REVERSAL_SOURCE_TYPE: &str = "REVERSAL";

/// Prefix of a mirror entry's number.
pub const REVERSAL_NUMBER_PREFIX: &str = "REV-";

/// Stateless builder for mirror entries.
pub struct ReversalService;

impl ReversalService {
    /// Checks that an entry can be reversed.
    pub fn ensure_reversible(original: &JournalEntry) -> Result<(), LedgerError> {
        match original.status {
            JournalStatus::Posted if original.reversed_by.is_none() => Ok(()),
            JournalStatus::Posted | JournalStatus::Reversed => {
                Err(LedgerError::AlreadyReversed(original.id))
            }
            JournalStatus::Draft => Err(LedgerError::NotPosted(original.id)),
        }
    }

    /// Entry number of the mirror entry for `original_number`.
    #[must_use]
    pub fn reversal_number(original_number: &str) -> String {
        format!("{REVERSAL_NUMBER_PREFIX}{original_number}")
    }

    /// Builds the mirror entry input.
    ///
    /// - Debits become credits and credits become debits
    /// - Accounts and line numbers are preserved
    /// - Memo is prefixed with "Reversal: "
    pub fn build_mirror(
        original: &JournalEntry,
        reason: &str,
        entry_date: NaiveDate,
    ) -> Result<NewJournalEntry, LedgerError> {
        Self::ensure_reversible(original)?;

        let lines = original
            .lines
            .iter()
            .map(|line| NewJournalLine {
                account_id: line.account_id,
                line_number: Some(line.line_number),
                debit_amount: line.credit_amount,
                credit_amount: line.debit_amount,
                memo: Some(format!(
                    "Reversal: {}",
                    line.memo.clone().unwrap_or_default()
                )),
            })
            .collect();

        Ok(NewJournalEntry {
            entry_number: Self::reversal_number(&original.entry_number),
            source_type: REVERSAL_SOURCE_TYPE.to_string(),
            source_id: Some(original.id.to_string()),
            entry_date,
            description: format!(
                "Reversal of {}. Reason: {reason}",
                original.entry_number
            ),
            lines,
        })
    }

    /// Returns true if `mirror` exactly cancels `original` per account.
    #[must_use]
    pub fn is_mirror_of(original: &JournalEntry, mirror: &JournalEntry) -> bool {
        original.touched_accounts().into_iter().all(|account| {
            let net = |entry: &JournalEntry| -> Decimal {
                entry
                    .lines
                    .iter()
                    .filter(|l| l.account_id == account)
                    .map(|l| l.debit_amount - l.credit_amount)
                    .sum()
            };
            net(original) + net(mirror) == Decimal::ZERO
        }) && original.touched_accounts() == mirror.touched_accounts()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::journal::JournalLine;
    use chrono::Utc;
    use ledgerkeep_shared::types::{AccountId, JournalEntryId, JournalLineId};
    use rust_decimal_macros::dec;

    fn posted(number: &str, lines: Vec<(AccountId, Decimal, Decimal)>) -> JournalEntry {
        JournalEntry {
            id: JournalEntryId::new(),
            entry_number: number.into(),
            source_type: "SALE".into(),
            source_id: Some("INV-9".into()),
            entry_date: NaiveDate::from_ymd_opt(2026, 1, 10).unwrap(),
            description: "sale".into(),
            status: JournalStatus::Posted,
            total_debit: Decimal::ZERO,
            total_credit: Decimal::ZERO,
            posted_at: Some(Utc::now()),
            reversed_from: None,
            reversed_by: None,
            reversal_reason: None,
            created_at: Utc::now(),
            lines: lines
                .into_iter()
                .enumerate()
                .map(|(i, (account_id, debit, credit))| JournalLine {
                    id: JournalLineId::new(),
                    account_id,
                    line_number: u32::try_from(i + 1).unwrap(),
                    debit_amount: debit,
                    credit_amount: credit,
                    memo: Some("memo".into()),
                })
                .collect(),
        }
    }

    #[test]
    fn test_mirror_swaps_sides() {
        let (cash, revenue) = (AccountId::new(), AccountId::new());
        let original = posted("JE-7", vec![(cash, dec!(40), dec!(0)), (revenue, dec!(0), dec!(40))]);
        let date = NaiveDate::from_ymd_opt(2026, 1, 31).unwrap();

        let mirror = ReversalService::build_mirror(&original, "typo", date).unwrap();

        assert_eq!(mirror.entry_number, "REV-JE-7");
        assert_eq!(mirror.source_type, REVERSAL_SOURCE_TYPE);
        assert_eq!(mirror.source_id, Some(original.id.to_string()));
        assert_eq!(mirror.description, "Reversal of JE-7. Reason: typo");
        assert_eq!(mirror.lines[0].account_id, cash);
        assert_eq!(mirror.lines[0].credit_amount, dec!(40));
        assert_eq!(mirror.lines[0].debit_amount, Decimal::ZERO);
        assert_eq!(mirror.lines[1].debit_amount, dec!(40));
        assert_eq!(mirror.lines[1].memo.as_deref(), Some("Reversal: memo"));
    }

    #[test]
    fn test_draft_not_reversible() {
        let mut entry = posted("JE-1", vec![]);
        entry.status = JournalStatus::Draft;
        assert_eq!(
            ReversalService::ensure_reversible(&entry).unwrap_err(),
            LedgerError::NotPosted(entry.id)
        );
    }

    #[test]
    fn test_reversed_not_reversible() {
        let mut entry = posted("JE-1", vec![]);
        entry.status = JournalStatus::Reversed;
        assert_eq!(
            ReversalService::ensure_reversible(&entry).unwrap_err(),
            LedgerError::AlreadyReversed(entry.id)
        );
    }

    #[test]
    fn test_is_mirror_of() {
        let (a, b) = (AccountId::new(), AccountId::new());
        let original = posted("JE-1", vec![(a, dec!(5), dec!(0)), (b, dec!(0), dec!(5))]);
        let mirror = posted("REV-JE-1", vec![(a, dec!(0), dec!(5)), (b, dec!(5), dec!(0))]);
        let same = posted("JE-2", vec![(a, dec!(5), dec!(0)), (b, dec!(0), dec!(5))]);

        assert!(ReversalService::is_mirror_of(&original, &mirror));
        assert!(!ReversalService::is_mirror_of(&original, &same));
    }
}
