//! Account balance calculations.
//!
//! - Asset/Expense: balance = Σdebit - Σcredit (debit-normal)
//! - Liability/Equity/Revenue: balance = Σcredit - Σdebit (credit-normal)
//!
//! Leaf balances come from journal history. Header balances come from their
//! children only, never from journal lines.

use ledgerkeep_shared::types::{AccountId, round_amount};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::journal::JournalEntry;

/// The side on which an account type normally carries its balance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NormalBalance {
    /// Debit-normal accounts (Asset, Expense)
    Debit,
    /// Credit-normal accounts (Liability, Equity, Revenue)
    Credit,
}

impl NormalBalance {
    /// Calculates the signed balance effect of a debit/credit pair.
    #[must_use]
    pub fn signed(self, debit: Decimal, credit: Decimal) -> Decimal {
        match self {
            Self::Debit => debit - credit,
            Self::Credit => credit - debit,
        }
    }
}

/// Debit and credit totals of one account over a journal history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AccountTotals {
    /// Total debit amount.
    pub debit_total: Decimal,
    /// Total credit amount.
    pub credit_total: Decimal,
}

impl AccountTotals {
    /// Net balance on the given normal side, rounded to two places.
    #[must_use]
    pub fn balance(&self, normal: NormalBalance) -> Decimal {
        round_amount(normal.signed(self.debit_total, self.credit_total))
    }
}

/// Pure balance rules shared by the in-process book and the repositories.
pub struct BalanceCalculator;

impl BalanceCalculator {
    /// Sums an account's lines over entries whose status affects balances.
    ///
    /// Drafts are skipped. Reversed entries still count: their effect is
    /// cancelled by the mirror entry.
    pub fn totals_for<'a, I>(account_id: AccountId, entries: I) -> AccountTotals
    where
        I: IntoIterator<Item = &'a JournalEntry>,
    {
        let mut totals = AccountTotals::default();
        for entry in entries {
            if !entry.status.affects_balance() {
                continue;
            }
            for line in entry.lines.iter().filter(|l| l.account_id == account_id) {
                totals.debit_total += line.debit_amount;
                totals.credit_total += line.credit_amount;
            }
        }
        totals
    }

    /// Computes a leaf account's own balance from journal history.
    pub fn leaf_balance<'a, I>(account_id: AccountId, normal: NormalBalance, entries: I) -> Decimal
    where
        I: IntoIterator<Item = &'a JournalEntry>,
    {
        Self::totals_for(account_id, entries).balance(normal)
    }

    /// Computes a header balance from its direct children's balances.
    pub fn header_balance<I>(child_balances: I) -> Decimal
    where
        I: IntoIterator<Item = Decimal>,
    {
        round_amount(child_balances.into_iter().sum())
    }
}
