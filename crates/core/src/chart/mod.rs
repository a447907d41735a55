//! Chart of accounts: the account tree and its invariants.
//!
//! - Every live header's balance equals the sum of its live children
//! - Codes are unique case-insensitively among live accounts
//! - A child's level is its parent's level plus one

pub mod hierarchy;
pub mod tree;
pub mod types;

#[cfg(test)]
mod tree_props;

pub use hierarchy::{HierarchyConfig, HierarchyIssue, HierarchyIssueKind, HierarchyReport};
pub use tree::{ChartOfAccounts, MERGED_MARKER, RepairSummary};
pub use types::{Account, AccountPatch, AccountType, NewAccount, normalize_code};
