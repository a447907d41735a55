//! Read-only hierarchy validation.
//!
//! Reports problems without fixing them; [`ChartOfAccounts::repair_hierarchy`]
//! is the fixing pass.

use ledgerkeep_shared::LedgerConfig;
use ledgerkeep_shared::types::{AccountId, BALANCE_EPSILON, within_tolerance};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::tree::ChartOfAccounts;
use crate::ledger::BalanceCalculator;

/// Limits applied by the hierarchy validator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HierarchyConfig {
    /// Deepest allowed level.
    pub max_depth: u32,
    /// Allowed difference between a header and the sum of its children.
    pub balance_tolerance: Decimal,
}

impl Default for HierarchyConfig {
    fn default() -> Self {
        Self {
            max_depth: 5,
            balance_tolerance: BALANCE_EPSILON,
        }
    }
}

impl From<&LedgerConfig> for HierarchyConfig {
    fn from(config: &LedgerConfig) -> Self {
        Self {
            max_depth: config.max_hierarchy_depth,
            balance_tolerance: config.balance_tolerance,
        }
    }
}

/// Kind of hierarchy problem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HierarchyIssueKind {
    /// The account's parent chain loops back on itself.
    CircularReference,
    /// The parent is missing or deleted.
    OrphanedAccount,
    /// The account's type differs from its parent's.
    TypeMismatch,
    /// The account sits deeper than the configured maximum.
    DepthExceeded,
    /// Stored level disagrees with the parent's level.
    LevelMismatch,
    /// Header balance differs from the sum of its children.
    HeaderBalanceMismatch,
    /// A non-header account has children.
    ChildrenUnderLeaf,
}

/// One hierarchy problem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HierarchyIssue {
    /// Kind of problem.
    pub kind: HierarchyIssueKind,
    /// The affected account.
    pub account_id: AccountId,
    /// The affected account's code.
    pub code: String,
    /// Human-readable detail.
    pub detail: String,
}

/// Result of a hierarchy validation run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HierarchyReport {
    /// Live accounts examined.
    pub accounts_checked: usize,
    /// Problems found, ordered by code.
    pub issues: Vec<HierarchyIssue>,
}

impl HierarchyReport {
    /// Returns true if no problems were found.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.issues.is_empty()
    }

    /// Number of problems of one kind.
    #[must_use]
    pub fn count(&self, kind: HierarchyIssueKind) -> usize {
        self.issues.iter().filter(|i| i.kind == kind).count()
    }
}

impl ChartOfAccounts {
    /// Checks every live account against the hierarchy invariants.
    #[must_use]
    pub fn validate_hierarchy(&self, config: &HierarchyConfig) -> HierarchyReport {
        let children = self.children_map();
        let mut issues = Vec::new();
        let mut accounts: Vec<_> = self.live_accounts().collect();
        accounts.sort_by(|a, b| a.code.cmp(&b.code).then(a.id.cmp(&b.id)));

        for account in &accounts {
            let issue = |kind, detail: String| HierarchyIssue {
                kind,
                account_id: account.id,
                code: account.code.clone(),
                detail,
            };

            let in_cycle = self
                .find_cycle(account.id)
                .is_some_and(|cycle| cycle.contains(&account.id));
            if in_cycle {
                issues.push(issue(
                    HierarchyIssueKind::CircularReference,
                    "parent chain loops back to this account".into(),
                ));
            }

            let parent = account.parent_id.map(|p| (p, self.get(p).filter(|a| !a.is_deleted())));
            match parent {
                Some((parent_id, None)) => issues.push(issue(
                    HierarchyIssueKind::OrphanedAccount,
                    format!("parent {parent_id} is missing or deleted"),
                )),
                Some((_, Some(parent))) => {
                    if parent.account_type != account.account_type {
                        issues.push(issue(
                            HierarchyIssueKind::TypeMismatch,
                            format!(
                                "type {} under parent {} of type {}",
                                account.account_type, parent.code, parent.account_type
                            ),
                        ));
                    }
                    if !in_cycle && account.level != parent.level.saturating_add(1) {
                        issues.push(issue(
                            HierarchyIssueKind::LevelMismatch,
                            format!("level {} under parent at level {}", account.level, parent.level),
                        ));
                    }
                }
                None => {
                    if account.level != 1 {
                        issues.push(issue(
                            HierarchyIssueKind::LevelMismatch,
                            format!("root account stored at level {}", account.level),
                        ));
                    }
                }
            }

            let depth = self.depth_of(account.id);
            if depth > config.max_depth {
                issues.push(issue(
                    HierarchyIssueKind::DepthExceeded,
                    format!("depth {depth} exceeds maximum {}", config.max_depth),
                ));
            }

            let kids = children.get(&account.id).map_or(&[][..], Vec::as_slice);
            if account.is_header {
                let expected = BalanceCalculator::header_balance(
                    kids.iter().filter_map(|c| self.get(*c)).map(|c| c.balance),
                );
                if !within_tolerance(account.balance, expected, config.balance_tolerance) {
                    issues.push(issue(
                        HierarchyIssueKind::HeaderBalanceMismatch,
                        format!("balance {} but children sum to {expected}", account.balance),
                    ));
                }
            } else if !kids.is_empty() {
                issues.push(issue(
                    HierarchyIssueKind::ChildrenUnderLeaf,
                    format!("{} child accounts under a non-header account", kids.len()),
                ));
            }
        }

        HierarchyReport {
            accounts_checked: accounts.len(),
            issues,
        }
    }
}
