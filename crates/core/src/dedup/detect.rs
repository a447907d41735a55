//! Duplicate code detection.

use std::collections::BTreeMap;

use ledgerkeep_shared::types::AccountId;
use serde::{Deserialize, Serialize};

use crate::chart::{ChartOfAccounts, normalize_code};

/// Live leaf accounts sharing one normalized code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DuplicateGroup {
    /// The shared code, trimmed and lower-cased.
    pub normalized_code: String,
    /// Members in ascending ID order.
    pub account_ids: Vec<AccountId>,
}

/// What a detection pass found.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Detection {
    /// Mergeable groups, ordered by code.
    pub groups: Vec<DuplicateGroup>,
    /// Codes where a header collides with another account. These need
    /// manual review.
    pub header_conflicts: Vec<String>,
}

/// Groups live non-header accounts by normalized code.
///
/// With `scope`, only that code is examined.
#[must_use]
pub fn detect_duplicates(chart: &ChartOfAccounts, scope: Option<&str>) -> Detection {
    let scope = scope.map(normalize_code);
    let mut leaves: BTreeMap<String, Vec<AccountId>> = BTreeMap::new();
    let mut headers: BTreeMap<String, usize> = BTreeMap::new();

    for account in chart.live_accounts() {
        let code = account.normalized_code();
        if scope.as_ref().is_some_and(|s| *s != code) {
            continue;
        }
        if account.is_header {
            *headers.entry(code).or_default() += 1;
        } else {
            leaves.entry(code).or_default().push(account.id);
        }
    }

    let header_conflicts = headers
        .iter()
        .filter(|(code, count)| **count + leaves.get(*code).map_or(0, Vec::len) > 1)
        .map(|(code, _)| code.clone())
        .collect();

    let groups = leaves
        .into_iter()
        .filter(|(_, ids)| ids.len() > 1)
        .map(|(normalized_code, mut account_ids)| {
            account_ids.sort_unstable();
            DuplicateGroup {
                normalized_code,
                account_ids,
            }
        })
        .collect();

    Detection {
        groups,
        header_conflicts,
    }
}
