//! Merge planning and run reports.

use ledgerkeep_shared::types::AccountId;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::detect::DuplicateGroup;
use super::rank::{RankedCandidate, rank_candidates};
use crate::chart::ChartOfAccounts;
use crate::ledger::LedgerError;

/// How one duplicate group will be folded into its primary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergePlan {
    /// The shared code.
    pub normalized_code: String,
    /// Rank 1 account; survives the merge.
    pub primary: AccountId,
    /// Accounts to absorb, in rank order.
    pub duplicates: Vec<AccountId>,
    /// Sum of every member's pre-merge balance.
    pub consolidated_balance: Decimal,
    /// Full ranking, for the audit trail.
    pub ranking: Vec<RankedCandidate>,
}

/// Ranks a group and checks that it can be merged.
///
/// `usage` returns an account's reference count and `bindings` the number
/// of live sub-ledger records bound to it.
///
/// # Errors
///
/// `MergeConflict` when members differ in account type, a duplicate still
/// has child accounts, or more than one sub-ledger record would end up on
/// the primary.
pub fn plan_merge<U, B>(
    group: &DuplicateGroup,
    chart: &ChartOfAccounts,
    usage: U,
    bindings: B,
) -> Result<MergePlan, LedgerError>
where
    U: Fn(AccountId) -> u64,
    B: Fn(AccountId) -> usize,
{
    let conflict = |reason: String| LedgerError::MergeConflict {
        code: group.normalized_code.clone(),
        reason,
    };

    let members = group
        .account_ids
        .iter()
        .map(|id| chart.live(*id))
        .collect::<Result<Vec<_>, _>>()?;
    if members.len() < 2 {
        return Err(conflict("group has fewer than two live accounts".into()));
    }

    let account_type = members[0].account_type;
    if let Some(other) = members.iter().find(|a| a.account_type != account_type) {
        return Err(conflict(format!(
            "mixed account types {account_type} and {}",
            other.account_type
        )));
    }

    let ranking = rank_candidates(members.iter().copied(), usage);
    let primary = ranking[0].account_id;
    let duplicates: Vec<AccountId> = ranking[1..].iter().map(|c| c.account_id).collect();

    if let Some(parent) = duplicates.iter().find(|id| !chart.children(**id).is_empty()) {
        return Err(conflict(format!("duplicate {parent} still has child accounts")));
    }

    let bound: usize = members.iter().map(|a| bindings(a.id)).sum();
    if bound > 1 {
        return Err(conflict(format!(
            "{bound} sub-ledger records would bind the primary account"
        )));
    }

    let consolidated_balance = members.iter().map(|a| a.balance).sum();

    Ok(MergePlan {
        normalized_code: group.normalized_code.clone(),
        primary,
        duplicates,
        consolidated_balance,
        ranking,
    })
}

/// Audit record of one applied merge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeSummary {
    /// The shared code.
    pub normalized_code: String,
    /// Surviving account.
    pub primary: AccountId,
    /// Absorbed accounts.
    pub merged: Vec<AccountId>,
    /// Journal lines moved onto the primary.
    pub lines_repointed: u64,
    /// Sub-ledger records moved onto the primary.
    pub subledgers_repointed: u64,
    /// The primary's balance after the merge.
    pub consolidated_balance: Decimal,
}

/// Result for one group in a resolution run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum GroupOutcome {
    /// The group was merged.
    Merged(MergeSummary),
    /// The group was rolled back.
    Failed {
        /// The shared code.
        normalized_code: String,
        /// Stable error code.
        error_code: String,
        /// Human-readable reason.
        message: String,
    },
}

impl GroupOutcome {
    /// Builds a failed outcome from an error.
    #[must_use]
    pub fn failed(normalized_code: impl Into<String>, err: &LedgerError) -> Self {
        Self::Failed {
            normalized_code: normalized_code.into(),
            error_code: err.error_code().to_string(),
            message: err.to_string(),
        }
    }
}

/// Result of a resolution run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolutionReport {
    /// Duplicate groups detected.
    pub groups_found: usize,
    /// One outcome per group, in code order.
    pub outcomes: Vec<GroupOutcome>,
    /// Header collisions left for manual review.
    pub header_conflicts: Vec<String>,
    /// Whether the code guard is in place after the run.
    pub guard_installed: bool,
}

impl ResolutionReport {
    /// Groups merged.
    #[must_use]
    pub fn merged_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, GroupOutcome::Merged(_)))
            .count()
    }

    /// Groups rolled back.
    #[must_use]
    pub fn failed_count(&self) -> usize {
        self.outcomes.len() - self.merged_count()
    }

    /// Summaries of the merged groups.
    pub fn summaries(&self) -> impl Iterator<Item = &MergeSummary> {
        self.outcomes.iter().filter_map(|o| match o {
            GroupOutcome::Merged(summary) => Some(summary),
            GroupOutcome::Failed { .. } => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart::{Account, AccountType};
    use crate::dedup::detect_duplicates;
    use chrono::Utc;
    use rust_decimal_macros::dec;

    fn legacy(code: &str, account_type: AccountType, balance: Decimal) -> Account {
        let now = Utc::now();
        Account {
            id: AccountId::new(),
            code: code.into(),
            name: code.into(),
            description: None,
            account_type,
            category: account_type.as_str().into(),
            parent_id: None,
            level: 1,
            is_header: false,
            balance,
            is_active: true,
            is_system_critical: false,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    fn chart_with_duplicates() -> (ChartOfAccounts, AccountId, AccountId) {
        let a = legacy("1100", AccountType::Asset, dec!(10));
        let b = legacy("1100", AccountType::Asset, dec!(25));
        let ids = (a.id, b.id);
        (ChartOfAccounts::from_accounts([a, b]), ids.0, ids.1)
    }

    #[test]
    fn test_plan_picks_most_used_and_sums_balances() {
        let (chart, a, b) = chart_with_duplicates();
        let group = &detect_duplicates(&chart, None).groups[0];

        let plan = plan_merge(group, &chart, |id| if id == b { 4 } else { 1 }, |_| 0).unwrap();

        assert_eq!(plan.primary, b);
        assert_eq!(plan.duplicates, vec![a]);
        assert_eq!(plan.consolidated_balance, dec!(35));
        assert_eq!(plan.ranking.len(), 2);
    }

    #[test]
    fn test_plan_rejects_two_subledger_bindings() {
        let (chart, _, _) = chart_with_duplicates();
        let group = &detect_duplicates(&chart, None).groups[0];

        let err = plan_merge(group, &chart, |_| 0, |_| 1).unwrap_err();
        assert_eq!(err.error_code(), "MERGE_CONFLICT");
    }

    #[test]
    fn test_plan_rejects_mixed_types() {
        let chart = ChartOfAccounts::from_accounts([
            legacy("9000", AccountType::Asset, Decimal::ZERO),
            legacy("9000", AccountType::Expense, Decimal::ZERO),
        ]);
        let group = &detect_duplicates(&chart, None).groups[0];

        let err = plan_merge(group, &chart, |_| 0, |_| 0).unwrap_err();
        assert!(matches!(err, LedgerError::MergeConflict { .. }));
    }

    #[test]
    fn test_report_counts() {
        let err = LedgerError::MergeConflict {
            code: "1100".into(),
            reason: "x".into(),
        };
        let report = ResolutionReport {
            groups_found: 2,
            outcomes: vec![
                GroupOutcome::failed("1100", &err),
                GroupOutcome::Merged(MergeSummary {
                    normalized_code: "1200".into(),
                    primary: AccountId::new(),
                    merged: vec![AccountId::new()],
                    lines_repointed: 3,
                    subledgers_repointed: 0,
                    consolidated_balance: dec!(1),
                }),
            ],
            header_conflicts: vec![],
            guard_installed: false,
        };
        assert_eq!(report.merged_count(), 1);
        assert_eq!(report.failed_count(), 1);
        assert_eq!(report.summaries().count(), 1);
    }
}
