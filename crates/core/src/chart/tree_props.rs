//! Property-based tests for the chart of accounts.
//!
//! - Property 2: Header aggregation
//! - Property 3: Code uniqueness

use proptest::prelude::*;
use rust_decimal::Decimal;

use super::tree::ChartOfAccounts;
use super::types::{AccountType, NewAccount, normalize_code};
use crate::ledger::LedgerError;

/// Strategy for signed leaf balances (-10,000.00 to 10,000.00).
fn balance_strategy() -> impl Strategy<Value = Decimal> {
    (-1_000_000i64..1_000_000i64).prop_map(|cents| Decimal::new(cents, 2))
}

/// Builds a random tree: account `i` hangs under account `parents[i] % i`.
fn build_tree(parents: &[usize]) -> ChartOfAccounts {
    let mut chart = ChartOfAccounts::new();
    chart
        .create_account(NewAccount::new("A0", "root", AccountType::Asset))
        .unwrap();
    for (i, parent) in parents.iter().enumerate() {
        let idx = i + 1;
        let parent_code = format!("A{}", parent % idx);
        chart
            .create_account(
                NewAccount::new(format!("A{idx}"), format!("node {idx}"), AccountType::Asset)
                    .under(parent_code),
            )
            .unwrap();
    }
    chart
}

fn assert_headers_sum_children(chart: &ChartOfAccounts) -> Result<(), TestCaseError> {
    for account in chart.live_accounts().filter(|a| a.is_header) {
        let sum: Decimal = chart
            .children(account.id)
            .into_iter()
            .filter_map(|c| chart.get(c))
            .map(|c| c.balance)
            .sum();
        prop_assert_eq!(account.balance, sum, "header {} out of balance", account.code);
    }
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// **Property 2.1: Propagation keeps every header equal to its children**
    ///
    /// *For any* tree and any leaf balances, setting each leaf and
    /// propagating SHALL leave every header equal to the sum of its
    /// children.
    #[test]
    fn prop_propagation_aggregates_headers(
        parents in prop::collection::vec(0usize..64, 1..20),
        balances in prop::collection::vec(balance_strategy(), 20),
    ) {
        let mut chart = build_tree(&parents);
        let leaves: Vec<_> = chart.live_accounts().filter(|a| !a.is_header).map(|a| a.id).collect();
        for (leaf, balance) in leaves.iter().zip(balances.iter()) {
            chart.set_leaf_balance(*leaf, *balance);
            chart.propagate_from([*leaf]);
        }

        assert_headers_sum_children(&chart)?;
        prop_assert_eq!(chart.recalculate_header_balances(), 0);
    }

    /// **Property 2.2: Full recalculation reaches its fixed point in one call**
    ///
    /// *For any* tree with leaf balances set but not propagated,
    /// `recalculate_header_balances` SHALL restore header aggregation and a
    /// second call SHALL change nothing.
    #[test]
    fn prop_recalculation_is_idempotent(
        parents in prop::collection::vec(0usize..64, 1..20),
        balances in prop::collection::vec(balance_strategy(), 20),
    ) {
        let mut chart = build_tree(&parents);
        let leaves: Vec<_> = chart.live_accounts().filter(|a| !a.is_header).map(|a| a.id).collect();
        for (leaf, balance) in leaves.iter().zip(balances.iter()) {
            chart.set_leaf_balance(*leaf, *balance);
        }

        chart.recalculate_header_balances();
        assert_headers_sum_children(&chart)?;
        prop_assert_eq!(chart.recalculate_header_balances(), 0);
    }

    /// **Property 3.1: No two live accounts share a normalized code**
    ///
    /// *For any* sequence of create attempts with codes differing only in
    /// case and padding, every accepted code SHALL be unique after
    /// normalization and every rejected one SHALL fail with `DuplicateCode`.
    #[test]
    fn prop_codes_unique_case_insensitive(
        codes in prop::collection::vec("[a-cA-C]{1,2}", 1..30),
        pad in prop::bool::ANY,
    ) {
        let mut chart = ChartOfAccounts::new();
        for code in &codes {
            let code = if pad { format!(" {code} ") } else { code.clone() };
            match chart.create_account(NewAccount::new(code, "x", AccountType::Expense)) {
                Ok(_) | Err(LedgerError::DuplicateCode { .. }) => {}
                Err(other) => prop_assert!(false, "unexpected error {other}"),
            }
        }

        let mut seen = std::collections::HashSet::new();
        for account in chart.live_accounts() {
            prop_assert!(seen.insert(normalize_code(&account.code)));
        }
        prop_assert!(chart.duplicate_codes().is_empty());
    }
}
