//! Duplicate account resolution against the database.
//!
//! Detection reads a snapshot. Each group is then merged in its own
//! transaction under the ledger lock, so a failed group rolls back alone.
//! A global run finishes by installing the code guard.

use ledgerkeep_core::dedup::{Detection, DuplicateGroup, GroupOutcome, ResolutionReport};
use sea_orm::{ConnectionTrait, TransactionTrait};

use super::store::LedgerStore;
use super::working_set::{self, Access, JournalScope, WorkingSet};
use crate::error::StoreError;
use crate::guard;

/// Lets the critical-account trigger accept merge updates for the rest of
/// the transaction.
const MERGE_SESSION_SQL: &str = "SET LOCAL ledgerkeep.merge = 'on'";

/// Repository running the duplicate resolution engine.
#[derive(Debug, Clone)]
pub struct DuplicateRepository {
    store: LedgerStore,
}

impl DuplicateRepository {
    /// Creates a new duplicate repository.
    #[must_use]
    pub const fn new(store: LedgerStore) -> Self {
        Self { store }
    }

    /// Finds duplicate code groups without changing anything.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub async fn detect(&self, scope: Option<&str>) -> Result<Detection, StoreError> {
        working_set::read(&self.store, JournalScope::Nothing, |book| {
            Ok(book.detect_duplicates(scope))
        })
        .await
    }

    /// Merges every duplicate group, globally or for one code.
    ///
    /// # Errors
    ///
    /// Only detection errors are returned; group failures are reported as
    /// [`GroupOutcome::Failed`].
    pub async fn resolve(&self, scope: Option<&str>) -> Result<ResolutionReport, StoreError> {
        let detection = self.detect(scope).await?;
        let mut report = ResolutionReport {
            groups_found: detection.groups.len(),
            header_conflicts: detection.header_conflicts,
            ..ResolutionReport::default()
        };

        for group in &detection.groups {
            match self.merge_group(group).await {
                Ok(outcomes) => report.outcomes.extend(outcomes),
                Err(err) => {
                    tracing::warn!(
                        code = %group.normalized_code,
                        error = %err,
                        "duplicate group rolled back"
                    );
                    report
                        .outcomes
                        .push(GroupOutcome::failed(&group.normalized_code, &err.into_ledger()));
                }
            }
        }

        report.guard_installed = if scope.is_some() {
            guard::is_installed(&self.store.db).await?
        } else {
            match guard::install_code_guard(&self.store.db).await {
                Ok(_) => true,
                Err(err) => {
                    tracing::warn!(error = %err, "code guard not installed");
                    false
                }
            }
        };

        tracing::info!(
            groups = report.groups_found,
            merged = report.merged_count(),
            failed = report.failed_count(),
            guard_installed = report.guard_installed,
            "duplicate resolution finished"
        );
        Ok(report)
    }

    /// Installs the code guard. Returns false if it was already installed.
    ///
    /// # Errors
    ///
    /// Returns `GuardViolation` while live duplicates remain.
    pub async fn install_code_guard(&self) -> Result<bool, StoreError> {
        guard::install_code_guard(&self.store.db).await
    }

    /// Merges one group in its own transaction. The group is re-detected
    /// under the lock, so a group already merged elsewhere yields nothing.
    async fn merge_group(&self, group: &DuplicateGroup) -> Result<Vec<GroupOutcome>, StoreError> {
        let txn = self.store.db.begin().await?;
        txn.execute_unprepared(MERGE_SESSION_SQL).await?;

        let mut set = WorkingSet::load(
            &txn,
            &self.store.config,
            JournalScope::Code(group.normalized_code.clone()),
            Access::Write,
        )
        .await?;
        let report = set.book.resolve_duplicates(Some(&group.normalized_code));

        if report.merged_count() > 0 {
            set.persist(&txn).await?;
            txn.commit().await?;
            set.replay(self.store.observer.as_ref());
        } else {
            txn.rollback().await?;
        }
        Ok(report.outcomes)
    }
}
