//! Property-based tests for journal validation and reversal.
//!
//! - Property 1: Double-entry balance of every accepted entry
//! - Property 5: Reversal symmetry

use chrono::NaiveDate;
use proptest::prelude::*;
use rust_decimal::Decimal;
use ledgerkeep_shared::types::AccountId;

use super::error::LedgerError;
use super::journal::{NewJournalEntry, NewJournalLine};
use super::reversal::ReversalService;
use super::validation::{JournalValidator, PostingAccount};

/// Strategy to generate positive amounts (0.01 to 10,000.00).
fn positive_amount() -> impl Strategy<Value = Decimal> {
    (1i64..1_000_000i64).prop_map(|cents| Decimal::new(cents, 2))
}

fn leaf(id: AccountId) -> Result<PostingAccount, LedgerError> {
    Ok(PostingAccount {
        id,
        is_header: false,
        is_active: true,
    })
}

fn date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 1, 15).unwrap()
}

/// Builds an entry whose debits are `debits` and whose credits are split
/// so that they total `credit_total`.
fn make_input(debits: &[Decimal], credit_total: Decimal) -> NewJournalEntry {
    let mut input = NewJournalEntry::new("JE-P", date());
    for amount in debits {
        input.lines.push(NewJournalLine::debit(AccountId::new(), *amount));
    }
    input.lines.push(NewJournalLine::credit(AccountId::new(), credit_total));
    input
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// **Property 1.1: Balanced entries are accepted**
    ///
    /// *For any* set of debit lines offset by one credit line of the same
    /// total, posting validation SHALL accept the entry and report equal
    /// totals.
    #[test]
    fn prop_balanced_entries_accepted(
        debits in prop::collection::vec(positive_amount(), 1..6),
    ) {
        let total: Decimal = debits.iter().copied().sum();
        let input = make_input(&debits, total);

        let (lines, totals) = JournalValidator::validate_for_posting(&input, leaf).unwrap();
        prop_assert_eq!(lines.len(), debits.len() + 1);
        prop_assert_eq!(totals.total_debit, totals.total_credit);
        prop_assert!(totals.is_balanced);
    }

    /// **Property 1.2: Unbalanced entries are rejected**
    ///
    /// *For any* entry whose credits differ from its debits by at least one
    /// cent, posting validation SHALL return `Unbalanced`.
    #[test]
    fn prop_unbalanced_entries_rejected(
        debits in prop::collection::vec(positive_amount(), 1..6),
        offset in positive_amount(),
    ) {
        let total: Decimal = debits.iter().copied().sum();
        let input = make_input(&debits, total + offset);

        let result = JournalValidator::validate_for_posting(&input, leaf);
        let is_unbalanced = matches!(result, Err(LedgerError::Unbalanced { .. }));
        prop_assert!(is_unbalanced);
    }

    /// **Property 5.1: A mirror entry cancels its original**
    ///
    /// *For any* posted entry, the mirror entry SHALL touch the same
    /// accounts, swap every line's sides, and itself pass posting
    /// validation.
    #[test]
    fn prop_mirror_cancels_original(
        debits in prop::collection::vec(positive_amount(), 1..6),
    ) {
        let total: Decimal = debits.iter().copied().sum();
        let input = make_input(&debits, total);
        let (lines, totals) = JournalValidator::validate_for_posting(&input, leaf).unwrap();
        let original = JournalValidator::posted_entry(&input, lines, totals);

        let mirror_input = ReversalService::build_mirror(&original, "test", date()).unwrap();
        let (mirror_lines, mirror_totals) =
            JournalValidator::validate_for_posting(&mirror_input, leaf).unwrap();
        let mirror = JournalValidator::posted_entry(&mirror_input, mirror_lines, mirror_totals);

        prop_assert!(ReversalService::is_mirror_of(&original, &mirror));
        prop_assert_eq!(mirror.total_debit, original.total_credit);
        prop_assert_eq!(mirror.total_credit, original.total_debit);
    }
}
