//! Read-only sub-ledger integrity report.

use std::collections::HashMap;

use ledgerkeep_shared::types::{AccountId, SubledgerId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::bridge::{GlView, SubledgerBridge};

/// Kind of sub-ledger integrity problem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IntegrityIssueKind {
    /// The record has no GL account.
    NotLinked,
    /// The bound account does not exist.
    AccountMissing,
    /// The bound account is soft-deleted.
    AccountDeleted,
    /// The bound account is a header.
    AccountIsHeader,
    /// Several live records share one account.
    DuplicateBinding,
    /// Balances differ beyond tolerance.
    BalanceMismatch,
}

/// One integrity problem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntegrityIssue {
    /// The affected record.
    pub subledger_id: SubledgerId,
    /// The record's code.
    pub code: String,
    /// Kind of problem.
    pub kind: IntegrityIssueKind,
    /// The bound account, if any.
    pub account_id: Option<AccountId>,
    /// `subledger - gl` for balance mismatches.
    pub difference: Option<Decimal>,
}

/// Overall health of the sub-ledger bindings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum IntegrityStatus {
    /// No issues.
    Ok,
    /// Up to three issues.
    Warning,
    /// More than three issues.
    Error,
}

impl IntegrityStatus {
    /// Classifies an issue count.
    #[must_use]
    pub const fn from_issue_count(count: usize) -> Self {
        match count {
            0 => Self::Ok,
            1..=3 => Self::Warning,
            _ => Self::Error,
        }
    }
}

/// Result of an integrity check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntegrityReport {
    /// Live records examined.
    pub records_checked: usize,
    /// Problems found, ordered by record code.
    pub issues: Vec<IntegrityIssue>,
    /// Overall status.
    pub status: IntegrityStatus,
}

impl IntegrityReport {
    /// Number of problems of one kind.
    #[must_use]
    pub fn count(&self, kind: IntegrityIssueKind) -> usize {
        self.issues.iter().filter(|i| i.kind == kind).count()
    }
}

impl SubledgerBridge {
    /// Checks every live record's binding and balance.
    #[must_use]
    pub fn validate_integrity(&self, gl: GlView<'_>) -> IntegrityReport {
        let mut records: Vec<_> = self.records().filter(|r| !r.is_deleted()).collect();
        records.sort_by(|a, b| a.code.cmp(&b.code).then(a.id.cmp(&b.id)));

        let mut per_account: HashMap<AccountId, usize> = HashMap::new();
        for account_id in records.iter().filter_map(|r| r.account_id) {
            *per_account.entry(account_id).or_default() += 1;
        }

        let mut issues = Vec::new();
        for record in &records {
            let issue = |kind, difference| IntegrityIssue {
                subledger_id: record.id,
                code: record.code.clone(),
                kind,
                account_id: record.account_id,
                difference,
            };

            let Some(account_id) = record.account_id else {
                issues.push(issue(IntegrityIssueKind::NotLinked, None));
                continue;
            };
            let Some(account) = gl.chart().get(account_id) else {
                issues.push(issue(IntegrityIssueKind::AccountMissing, None));
                continue;
            };
            if account.is_deleted() {
                issues.push(issue(IntegrityIssueKind::AccountDeleted, None));
                continue;
            }
            if account.is_header {
                issues.push(issue(IntegrityIssueKind::AccountIsHeader, None));
            }
            if per_account.get(&account_id).copied().unwrap_or_default() > 1 {
                issues.push(issue(IntegrityIssueKind::DuplicateBinding, None));
            }
            if let Some((difference, _)) = self.config().assess(record.balance, gl.derived(account)) {
                issues.push(issue(IntegrityIssueKind::BalanceMismatch, Some(difference)));
            }
        }

        IntegrityReport {
            records_checked: records.len(),
            status: IntegrityStatus::from_issue_count(issues.len()),
            issues,
        }
    }
}
