//! The in-process ledger engine.
//!
//! `LedgerBook` owns the chart, the journal and the sub-ledger bridge and
//! runs every operation against all three. An operation either completes or
//! leaves the book untouched.

use std::sync::Arc;

use chrono::Utc;
use ledgerkeep_shared::LedgerConfig;
use ledgerkeep_shared::types::{AccountId, JournalEntryId, SubledgerId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::observer::{LedgerObserver, TracingObserver};
use crate::chart::{
    Account, AccountPatch, ChartOfAccounts, HierarchyConfig, HierarchyReport, NewAccount,
    RepairSummary,
};
use crate::dedup::{
    Detection, DuplicateGroup, GroupOutcome, MergeSummary, ResolutionReport, UsageTally,
    detect_duplicates, plan_merge,
};
use crate::ledger::{
    BalanceCalculator, Journal, JournalEntry, JournalStatus, JournalTotals, JournalValidator,
    LedgerError, NewJournalEntry, PostingAccount, ReversalService,
};
use crate::subledger::{
    BridgeConfig, GlView, IntegrityReport, NewSubledger, ReconcileOutcome, SubledgerAccount,
    SubledgerBridge, SyncOutcome,
};

/// What a post or reversal changed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostingResult {
    /// The posted entry.
    pub entry: JournalEntry,
    /// Leaf accounts recomputed from the journal, ascending.
    pub touched_accounts: Vec<AccountId>,
    /// Headers whose aggregated balance changed, deepest first.
    pub updated_ancestors: Vec<AccountId>,
    /// Sub-ledger records checked or synced afterwards.
    pub subledger_outcomes: Vec<SyncOutcome>,
}

/// Chart, journal and sub-ledgers kept consistent with each other.
#[derive(Clone)]
pub struct LedgerBook {
    chart: ChartOfAccounts,
    journal: Journal,
    bridge: SubledgerBridge,
    hierarchy: HierarchyConfig,
    observer: Arc<dyn LedgerObserver>,
}

impl std::fmt::Debug for LedgerBook {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LedgerBook")
            .field("accounts", &self.chart.len())
            .field("entries", &self.journal.len())
            .field("hierarchy", &self.hierarchy)
            .finish_non_exhaustive()
    }
}

impl Default for LedgerBook {
    fn default() -> Self {
        Self::new(BridgeConfig::default(), HierarchyConfig::default())
    }
}

impl LedgerBook {
    /// Creates an empty book.
    #[must_use]
    pub fn new(bridge: BridgeConfig, hierarchy: HierarchyConfig) -> Self {
        Self {
            chart: ChartOfAccounts::new(),
            journal: Journal::new(),
            bridge: SubledgerBridge::new(bridge),
            hierarchy,
            observer: Arc::new(TracingObserver),
        }
    }

    /// Creates an empty book from the `ledger` config section.
    #[must_use]
    pub fn from_config(config: &LedgerConfig) -> Self {
        Self::new(BridgeConfig::from(config), HierarchyConfig::from(config))
    }

    /// Assembles a book from stored state, e.g. a working set loaded from
    /// the database.
    #[must_use]
    pub fn from_parts(
        chart: ChartOfAccounts,
        journal: Journal,
        bridge: SubledgerBridge,
        hierarchy: HierarchyConfig,
    ) -> Self {
        Self {
            chart,
            journal,
            bridge,
            hierarchy,
            observer: Arc::new(TracingObserver),
        }
    }

    /// Replaces the default tracing observer.
    #[must_use]
    pub fn with_observer(mut self, observer: Arc<dyn LedgerObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// The chart of accounts.
    #[must_use]
    pub fn chart(&self) -> &ChartOfAccounts {
        &self.chart
    }

    /// The journal.
    #[must_use]
    pub fn journal(&self) -> &Journal {
        &self.journal
    }

    /// The sub-ledger bridge.
    #[must_use]
    pub fn bridge(&self) -> &SubledgerBridge {
        &self.bridge
    }

    /// Returns and clears the accounts modified since the last call.
    pub fn take_account_changes(&mut self) -> Vec<Account> {
        self.chart.take_changes()
    }

    // ------------------------------------------------------------------
    // Accounts
    // ------------------------------------------------------------------

    /// Creates an account. A parent backing a sub-ledger cannot become a header.
    pub fn create_account(&mut self, input: NewAccount) -> Result<Account, LedgerError> {
        if let Some(parent) = input
            .parent_code
            .as_deref()
            .and_then(|code| self.chart.find_by_code(code))
            && !parent.is_header
        {
            self.ensure_can_be_header(parent.id)?;
        }
        let account = self.chart.create_account(input)?;
        tracing::debug!(account_id = %account.id, code = %account.code, "account created");
        Ok(account)
    }

    /// Updates an account.
    ///
    /// A type change or a header demotion recomputes the account's balance
    /// from the journal.
    pub fn update_account(&mut self, id: AccountId, patch: AccountPatch) -> Result<Account, LedgerError> {
        let before = self.chart.live(id)?.clone();
        if patch.is_header == Some(true) && !before.is_header {
            self.ensure_can_be_header(id)?;
        }
        if let Some(Some(parent_id)) = patch.parent_id
            && self.chart.get(parent_id).is_some_and(|p| !p.is_header)
        {
            self.ensure_can_be_header(parent_id)?;
        }

        let updated = self.chart.update_account(id, patch)?;
        if !updated.is_header && (updated.account_type != before.account_type || before.is_header) {
            self.refresh_leaves(&[id]);
        }
        self.chart.live(id).cloned()
    }

    /// Moves an account under another, both given by code.
    pub fn reparent(&mut self, child_code: &str, parent_code: &str) -> Result<Account, LedgerError> {
        if let Some(parent) = self.chart.find_by_code(parent_code)
            && !parent.is_header
        {
            self.ensure_can_be_header(parent.id)?;
        }
        let account = self.chart.reparent(child_code, parent_code)?;
        tracing::info!(
            account_id = %account.id,
            parent_id = ?account.parent_id,
            level = account.level,
            "account reparented"
        );
        Ok(account)
    }

    /// Soft-deletes a leaf account that backs no sub-ledger record and has
    /// never been posted to.
    pub fn delete_account(&mut self, id: AccountId) -> Result<Account, LedgerError> {
        if let Some(record) = self.bridge.bound_to(id) {
            return Err(LedgerError::AccountAlreadyBound {
                account_id: id,
                subledger_id: record.id,
            });
        }
        if self.journal.posted_line_count(id) > 0 {
            return Err(LedgerError::HasPostings(id));
        }
        self.chart.soft_delete(id)
    }

    /// Loads a stored account as it is.
    pub fn import_account(&mut self, account: Account) -> Result<(), LedgerError> {
        self.chart.import(account)
    }

    /// Re-aggregates every header bottom-up. Returns headers changed.
    pub fn recalculate_header_balances(&mut self) -> usize {
        self.chart.recalculate_header_balances()
    }

    /// Repairs orphans, cycles, levels and header flags.
    pub fn repair_hierarchy(&mut self) -> RepairSummary {
        let summary = self.chart.repair_hierarchy();
        tracing::info!(
            orphans = summary.orphans_detached,
            cycles = summary.cycles_broken,
            levels = summary.levels_fixed,
            headers = summary.headers_promoted,
            balances = summary.balances_changed,
            "hierarchy repaired"
        );
        summary
    }

    /// Read-only hierarchy report.
    #[must_use]
    pub fn validate_hierarchy(&self) -> HierarchyReport {
        self.chart.validate_hierarchy(&self.hierarchy)
    }

    /// An account's balance computed from journal lines alone.
    pub fn journal_balance(&self, id: AccountId) -> Result<Decimal, LedgerError> {
        let account = self.chart.live(id)?;
        Ok(BalanceCalculator::leaf_balance(
            id,
            account.normal_balance(),
            self.journal.entries(),
        ))
    }

    // ------------------------------------------------------------------
    // Journal
    // ------------------------------------------------------------------

    /// Stores a draft. Only line shape is checked; accounts and balance are
    /// checked when the draft is posted.
    pub fn create_draft(&mut self, input: NewJournalEntry) -> Result<JournalEntry, LedgerError> {
        let lines = JournalValidator::validate_lines(&input)?;
        let totals = JournalTotals::from_lines(&lines);
        let entry = JournalValidator::draft_entry(&input, lines, totals);
        self.journal.insert(entry.clone())?;
        Ok(entry)
    }

    /// Removes a draft.
    pub fn discard_draft(&mut self, id: JournalEntryId) -> Result<JournalEntry, LedgerError> {
        self.journal.remove_draft(id)
    }

    /// Validates and posts a new entry, then updates balances and sub-ledgers.
    pub fn post_entry(&mut self, input: NewJournalEntry) -> Result<PostingResult, LedgerError> {
        let (lines, totals) =
            JournalValidator::validate_for_posting(&input, |id| self.posting_account(id))?;
        let entry = JournalValidator::posted_entry(&input, lines, totals);
        let entry_id = entry.id;
        self.journal.insert(entry)?;
        self.after_posting(entry_id)
    }

    /// Posts a stored draft through the same checks as a new entry.
    pub fn post_draft(&mut self, id: JournalEntryId) -> Result<PostingResult, LedgerError> {
        let draft = self.journal.get(id).ok_or(LedgerError::EntryNotFound(id))?;
        if draft.status != JournalStatus::Draft {
            return Err(LedgerError::InvalidTransition {
                from: draft.status,
                to: JournalStatus::Posted,
            });
        }
        let input = draft.to_input();
        let (lines, totals) =
            JournalValidator::validate_for_posting(&input, |account| self.posting_account(account))?;

        let entry = self.journal.get_mut(id).ok_or(LedgerError::EntryNotFound(id))?;
        entry.transition(JournalStatus::Posted)?;
        entry.lines = lines;
        entry.total_debit = totals.total_debit;
        entry.total_credit = totals.total_credit;
        entry.posted_at = Some(Utc::now());
        self.after_posting(id)
    }

    /// Reverses a posted entry with a mirror entry dated today.
    ///
    /// The mirror is posted first; the original then becomes REVERSED and
    /// points at it.
    pub fn reverse_entry(&mut self, id: JournalEntryId, reason: &str) -> Result<PostingResult, LedgerError> {
        if reason.trim().is_empty() {
            return Err(LedgerError::InvalidEntry("reversal reason is required".into()));
        }
        let original = self.journal.get(id).ok_or(LedgerError::EntryNotFound(id))?;
        let input = ReversalService::build_mirror(original, reason.trim(), Utc::now().date_naive())?;
        let (lines, totals) =
            JournalValidator::validate_for_posting(&input, |account| self.posting_account(account))?;

        let mut mirror = JournalValidator::posted_entry(&input, lines, totals);
        mirror.reversed_from = Some(id);
        let mirror_id = mirror.id;

        let mut marked = original.clone();
        marked.transition(JournalStatus::Reversed)?;
        marked.reversed_by = Some(mirror_id);
        marked.reversal_reason = Some(reason.trim().to_string());

        self.journal.insert(mirror)?;
        if let Some(slot) = self.journal.get_mut(id) {
            *slot = marked;
        }
        tracing::info!(entry_id = %id, mirror_id = %mirror_id, reason = reason.trim(), "journal entry reversed");

        self.after_posting(mirror_id)
    }

    // ------------------------------------------------------------------
    // Sub-ledgers
    // ------------------------------------------------------------------

    /// Registers a cash or bank record.
    pub fn register_subledger(&mut self, input: NewSubledger) -> Result<SubledgerAccount, LedgerError> {
        self.bridge.register(input, &self.chart)
    }

    /// Binds a record to a GL account.
    pub fn attach_subledger(
        &mut self,
        subledger_id: SubledgerId,
        account_id: AccountId,
    ) -> Result<SubledgerAccount, LedgerError> {
        self.bridge.attach(subledger_id, account_id, &self.chart)
    }

    /// Stores a new sub-ledger balance and records drift against the GL.
    pub fn on_subledger_balance_changed(
        &mut self,
        subledger_id: SubledgerId,
        new_balance: Decimal,
    ) -> Result<SyncOutcome, LedgerError> {
        let gl = GlView::new(&self.chart, &self.journal);
        let outcome = self.bridge.on_balance_changed(subledger_id, new_balance, gl)?;
        self.notify_drift(std::slice::from_ref(&outcome));
        Ok(outcome)
    }

    /// Aligns a record to its GL balance and resolves its open incidents.
    pub fn reconcile_subledger(
        &mut self,
        subledger_id: SubledgerId,
        note: &str,
    ) -> Result<ReconcileOutcome, LedgerError> {
        let gl = GlView::new(&self.chart, &self.journal);
        self.bridge.reconcile(subledger_id, note, gl)
    }

    /// Read-only sub-ledger report.
    #[must_use]
    pub fn validate_integrity(&self) -> IntegrityReport {
        self.bridge
            .validate_integrity(GlView::new(&self.chart, &self.journal))
    }

    // ------------------------------------------------------------------
    // Duplicates
    // ------------------------------------------------------------------

    /// Finds duplicate code groups without changing anything.
    #[must_use]
    pub fn detect_duplicates(&self, scope: Option<&str>) -> Detection {
        detect_duplicates(&self.chart, scope)
    }

    /// Merges every duplicate group, each on its own.
    ///
    /// A failed group is rolled back and reported. A global run (no scope)
    /// finishes by installing the code guard.
    pub fn resolve_duplicates(&mut self, scope: Option<&str>) -> ResolutionReport {
        let detection = detect_duplicates(&self.chart, scope);
        let mut report = ResolutionReport {
            groups_found: detection.groups.len(),
            header_conflicts: detection.header_conflicts,
            ..ResolutionReport::default()
        };

        for group in &detection.groups {
            let snapshot = (self.chart.clone(), self.journal.clone(), self.bridge.clone());
            match self.merge_group(group) {
                Ok(summary) => {
                    self.observer.on_merge(&summary);
                    report.outcomes.push(GroupOutcome::Merged(summary));
                }
                Err(err) => {
                    (self.chart, self.journal, self.bridge) = snapshot;
                    tracing::warn!(
                        code = %group.normalized_code,
                        error = %err,
                        "duplicate group rolled back"
                    );
                    report
                        .outcomes
                        .push(GroupOutcome::failed(&group.normalized_code, &err));
                }
            }
        }

        report.guard_installed = if scope.is_some() {
            self.chart.code_guard_installed()
        } else {
            match self.install_code_guard() {
                Ok(_) => true,
                Err(err) => {
                    tracing::warn!(error = %err, "code guard not installed");
                    false
                }
            }
        };
        report
    }

    /// Enforces code uniqueness from now on. Returns false if it was
    /// already in place.
    pub fn install_code_guard(&mut self) -> Result<bool, LedgerError> {
        let installed = self.chart.install_code_guard()?;
        if installed {
            tracing::info!("account code guard installed");
        }
        Ok(installed)
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    fn posting_account(&self, id: AccountId) -> Result<PostingAccount, LedgerError> {
        let account = self.chart.live(id)?;
        Ok(PostingAccount {
            id,
            is_header: account.is_header,
            is_active: account.is_active,
        })
    }

    fn ensure_can_be_header(&self, id: AccountId) -> Result<(), LedgerError> {
        if self.bridge.bound_to(id).is_some() {
            return Err(LedgerError::AccountIsHeader(id));
        }
        Ok(())
    }

    /// Recomputes leaf balances from the journal and propagates upward.
    fn refresh_leaves(&mut self, ids: &[AccountId]) -> Vec<AccountId> {
        for id in ids {
            let Some(account) = self.chart.get(*id) else {
                continue;
            };
            if account.is_header || account.is_deleted() {
                continue;
            }
            let balance =
                BalanceCalculator::leaf_balance(*id, account.normal_balance(), self.journal.entries());
            self.chart.set_leaf_balance(*id, balance);
        }
        self.chart.propagate_from(ids.iter().copied())
    }

    fn after_posting(&mut self, entry_id: JournalEntryId) -> Result<PostingResult, LedgerError> {
        let entry = self
            .journal
            .get(entry_id)
            .cloned()
            .ok_or(LedgerError::EntryNotFound(entry_id))?;
        let touched_accounts: Vec<AccountId> = entry.touched_accounts().into_iter().collect();
        let updated_ancestors = self.refresh_leaves(&touched_accounts);
        let subledger_outcomes = self
            .bridge
            .after_post(&touched_accounts, GlView::new(&self.chart, &self.journal));
        self.notify_drift(&subledger_outcomes);
        self.observer.on_posted(&entry);

        Ok(PostingResult {
            entry,
            touched_accounts,
            updated_ancestors,
            subledger_outcomes,
        })
    }

    fn notify_drift(&self, outcomes: &[SyncOutcome]) {
        for outcome in outcomes {
            if let SyncOutcome::DriftRecorded { incident_id, .. } = outcome
                && let Some(incident) = self.bridge.incidents().iter().find(|i| i.id == *incident_id)
            {
                self.observer.on_drift(incident);
            }
        }
    }

    fn merge_group(&mut self, group: &DuplicateGroup) -> Result<MergeSummary, LedgerError> {
        let plan = {
            let tally = UsageTally::new().with(&self.journal).with(&self.bridge);
            plan_merge(
                group,
                &self.chart,
                |id| tally.usage(id),
                |id| self.bridge.binding_count(id),
            )?
        };

        let mut lines_repointed = 0;
        let mut subledgers_repointed = 0;
        for duplicate in &plan.duplicates {
            lines_repointed += self.journal.repoint_lines(*duplicate, plan.primary);
            subledgers_repointed += self.bridge.rebind(*duplicate, plan.primary);
        }
        self.chart
            .absorb_duplicates(plan.primary, &plan.duplicates, plan.consolidated_balance)?;

        Ok(MergeSummary {
            normalized_code: plan.normalized_code,
            primary: plan.primary,
            merged: plan.duplicates,
            lines_repointed,
            subledgers_repointed,
            consolidated_balance: plan.consolidated_balance,
        })
    }
}
