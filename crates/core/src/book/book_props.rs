//! Property-based tests for the ledger engine.
//!
//! - Property 1.3: Trial balance
//! - Property 2.3: Header aggregation after posting
//! - Property 4: Merge conservation
//! - Property 5.2: Reversal symmetry
//! - Property 6: Idempotent guard installation

use chrono::{NaiveDate, Utc};
use ledgerkeep_shared::types::AccountId;
use proptest::prelude::*;
use rust_decimal::Decimal;

use super::engine::LedgerBook;
use crate::chart::{Account, AccountType, NewAccount};
use crate::ledger::{NormalBalance, NewJournalEntry, NewJournalLine};

/// Strategy for positive amounts (0.01 to 50,000.00).
fn amount_strategy() -> impl Strategy<Value = Decimal> {
    (1i64..5_000_000i64).prop_map(|cents| Decimal::new(cents, 2))
}

/// Strategy for a posting between two distinct leaves (by index).
fn posting_strategy() -> impl Strategy<Value = (usize, usize, Decimal)> {
    (0usize..4, 1usize..4, amount_strategy()).prop_map(|(d, offset, amount)| (d, (d + offset) % 4, amount))
}

fn date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 1, 31).unwrap()
}

/// Assets header over cash and bank, plus revenue and expense.
fn seeded_book() -> (LedgerBook, Vec<AccountId>) {
    let mut book = LedgerBook::default();
    book.create_account(NewAccount::new("1000", "Assets", AccountType::Asset).header())
        .unwrap();
    let leaves = [
        NewAccount::new("1100", "Cash", AccountType::Asset).under("1000"),
        NewAccount::new("1200", "Bank", AccountType::Asset).under("1000"),
        NewAccount::new("4000", "Revenue", AccountType::Revenue),
        NewAccount::new("5000", "Expense", AccountType::Expense),
    ]
    .into_iter()
    .map(|input| book.create_account(input).unwrap().id)
    .collect();
    (book, leaves)
}

fn post(book: &mut LedgerBook, number: String, debit: AccountId, credit: AccountId, amount: Decimal) {
    book.post_entry(
        NewJournalEntry::new(number, date())
            .line(NewJournalLine::debit(debit, amount))
            .line(NewJournalLine::credit(credit, amount)),
    )
    .unwrap();
}

/// Σ(debit-normal balances) - Σ(credit-normal balances) over live leaves.
fn net_debits(book: &LedgerBook) -> Decimal {
    book.chart()
        .live_accounts()
        .filter(|a| !a.is_header)
        .map(|a| match a.normal_balance() {
            NormalBalance::Debit => a.balance,
            NormalBalance::Credit => -a.balance,
        })
        .sum()
}

fn snapshot_balances(book: &LedgerBook) -> Vec<(AccountId, Decimal)> {
    let mut balances: Vec<_> = book.chart().accounts().map(|a| (a.id, a.balance)).collect();
    balances.sort();
    balances
}

fn legacy_leaf(code: &str) -> Account {
    let now = Utc::now();
    Account {
        id: AccountId::new(),
        code: code.into(),
        name: code.into(),
        description: None,
        account_type: AccountType::Asset,
        category: "ASSET".into(),
        parent_id: None,
        level: 1,
        is_header: false,
        balance: Decimal::ZERO,
        is_active: true,
        is_system_critical: false,
        created_at: now,
        updated_at: now,
        deleted_at: None,
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// **Property 1.3: Posted entries keep the trial balance at zero**
    ///
    /// *For any* sequence of balanced posts, the debit-normal leaf balances
    /// SHALL equal the credit-normal leaf balances, and every leaf SHALL
    /// equal its journal-derived balance.
    #[test]
    fn prop_trial_balance_holds(postings in prop::collection::vec(posting_strategy(), 1..25)) {
        let (mut book, leaves) = seeded_book();
        for (n, (d, c, amount)) in postings.into_iter().enumerate() {
            post(&mut book, format!("JE-{n}"), leaves[d], leaves[c], amount);
        }

        prop_assert_eq!(net_debits(&book), Decimal::ZERO);
        for leaf in &leaves {
            prop_assert_eq!(book.chart().get(*leaf).unwrap().balance, book.journal_balance(*leaf).unwrap());
        }
    }

    /// **Property 2.3: Posting keeps headers equal to their children**
    ///
    /// *For any* sequence of posts, the hierarchy report SHALL find no
    /// header balance mismatch.
    #[test]
    fn prop_posting_keeps_headers_aggregated(postings in prop::collection::vec(posting_strategy(), 1..25)) {
        let (mut book, leaves) = seeded_book();
        for (n, (d, c, amount)) in postings.into_iter().enumerate() {
            post(&mut book, format!("JE-{n}"), leaves[d], leaves[c], amount);
        }

        let assets = book.chart().find_by_code("1000").unwrap();
        let cash = book.chart().get(leaves[0]).unwrap().balance;
        let bank = book.chart().get(leaves[1]).unwrap().balance;
        prop_assert_eq!(assets.balance, cash + bank);
        prop_assert!(book.validate_hierarchy().is_valid());
    }

    /// **Property 4.1: Merging conserves money**
    ///
    /// *For any* duplicate group with any posting history, the primary's
    /// balance after the merge SHALL equal the group's total before it, and
    /// the trial balance SHALL be unchanged.
    #[test]
    fn prop_merge_conserves_balances(
        counts in prop::collection::vec(0usize..6, 2..5),
        amount in amount_strategy(),
    ) {
        let mut book = LedgerBook::default();
        let revenue = book
            .create_account(NewAccount::new("4000", "Revenue", AccountType::Revenue))
            .unwrap()
            .id;
        let members: Vec<AccountId> = counts
            .iter()
            .map(|_| {
                let account = legacy_leaf("1101");
                let id = account.id;
                book.import_account(account).unwrap();
                id
            })
            .collect();
        for (member, count) in members.iter().zip(&counts) {
            for n in 0..*count {
                post(&mut book, format!("{member}-{n}"), *member, revenue, amount);
            }
        }
        let group_total: Decimal = members.iter().map(|m| book.chart().get(*m).unwrap().balance).sum();
        let net_before = net_debits(&book);

        let report = book.resolve_duplicates(None);

        prop_assert_eq!(report.merged_count(), 1);
        let summary = report.summaries().next().unwrap();
        prop_assert_eq!(book.chart().get(summary.primary).unwrap().balance, group_total);
        prop_assert_eq!(book.journal_balance(summary.primary).unwrap(), group_total);
        prop_assert_eq!(net_debits(&book), net_before);
        prop_assert_eq!(book.chart().live_accounts().filter(|a| a.code == "1101").count(), 1);
    }

    /// **Property 5.2: Reversal restores every balance**
    ///
    /// *For any* history followed by one more post, reversing that post
    /// SHALL restore every account balance to its value before the post.
    #[test]
    fn prop_reversal_restores_balances(
        history in prop::collection::vec(posting_strategy(), 0..10),
        last in posting_strategy(),
    ) {
        let (mut book, leaves) = seeded_book();
        for (n, (d, c, amount)) in history.into_iter().enumerate() {
            post(&mut book, format!("JE-{n}"), leaves[d], leaves[c], amount);
        }
        let before = snapshot_balances(&book);

        let (d, c, amount) = last;
        let result = book
            .post_entry(
                NewJournalEntry::new("JE-LAST", date())
                    .line(NewJournalLine::debit(leaves[d], amount))
                    .line(NewJournalLine::credit(leaves[c], amount)),
            )
            .unwrap();
        book.reverse_entry(result.entry.id, "property check").unwrap();

        prop_assert_eq!(snapshot_balances(&book), before);
    }

    /// **Property 6.1: Guard installation is idempotent**
    ///
    /// *For any* number of repeated installs on a duplicate-free chart, the
    /// first SHALL install the guard and the rest SHALL succeed as no-ops.
    #[test]
    fn prop_guard_install_idempotent(repeats in 1usize..5) {
        let (mut book, _) = seeded_book();
        prop_assert_eq!(book.install_code_guard(), Ok(true));
        for _ in 0..repeats {
            prop_assert_eq!(book.install_code_guard(), Ok(false));
        }
        prop_assert!(book.chart().code_guard_installed());
    }
}
