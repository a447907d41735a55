//! Ranking of duplicate candidates.
//!
//! Order: usage count descending, then `created_at` ascending, then ID
//! ascending. Rank 1 becomes the primary.

use chrono::{DateTime, Utc};
use ledgerkeep_shared::types::AccountId;
use serde::{Deserialize, Serialize};

use crate::chart::Account;
use crate::ledger::Journal;
use crate::subledger::SubledgerBridge;

/// A table or store that can reference accounts.
///
/// Usage counts are summed over every registered counter, so a new
/// reference source only needs a new implementation.
pub trait ReferenceCounter {
    /// Name of the reference source, for logs.
    fn source(&self) -> &'static str;

    /// Number of references to `account_id`.
    fn count(&self, account_id: AccountId) -> u64;
}

impl ReferenceCounter for Journal {
    fn source(&self) -> &'static str {
        "journal_lines"
    }

    fn count(&self, account_id: AccountId) -> u64 {
        self.posted_line_count(account_id)
    }
}

impl ReferenceCounter for SubledgerBridge {
    fn source(&self) -> &'static str {
        "cash_banks"
    }

    fn count(&self, account_id: AccountId) -> u64 {
        u64::try_from(self.binding_count(account_id)).unwrap_or(u64::MAX)
    }
}

/// Sums references across counters.
#[derive(Default)]
pub struct UsageTally<'a> {
    counters: Vec<&'a dyn ReferenceCounter>,
}

impl<'a> UsageTally<'a> {
    /// Creates an empty tally.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a counter.
    #[must_use]
    pub fn with(mut self, counter: &'a dyn ReferenceCounter) -> Self {
        self.counters.push(counter);
        self
    }

    /// Names of the registered counters.
    #[must_use]
    pub fn sources(&self) -> Vec<&'static str> {
        self.counters.iter().map(|c| c.source()).collect()
    }

    /// Total references to an account.
    #[must_use]
    pub fn usage(&self, account_id: AccountId) -> u64 {
        self.counters
            .iter()
            .map(|c| c.count(account_id))
            .fold(0, u64::saturating_add)
    }
}

/// One ranked member of a duplicate group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankedCandidate {
    /// 1-based rank.
    pub rank: usize,
    /// The account.
    pub account_id: AccountId,
    /// References across all counters.
    pub usage_count: u64,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

/// Ranks candidates; the first element is the primary.
pub fn rank_candidates<'a, I, U>(accounts: I, usage: U) -> Vec<RankedCandidate>
where
    I: IntoIterator<Item = &'a Account>,
    U: Fn(AccountId) -> u64,
{
    let mut ranked: Vec<RankedCandidate> = accounts
        .into_iter()
        .map(|a| RankedCandidate {
            rank: 0,
            account_id: a.id,
            usage_count: usage(a.id),
            created_at: a.created_at,
        })
        .collect();
    ranked.sort_by(|a, b| {
        b.usage_count
            .cmp(&a.usage_count)
            .then(a.created_at.cmp(&b.created_at))
            .then(a.account_id.cmp(&b.account_id))
    });
    for (idx, candidate) in ranked.iter_mut().enumerate() {
        candidate.rank = idx + 1;
    }
    ranked
}
