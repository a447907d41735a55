//! The chart of accounts tree.
//!
//! Accounts live in an arena keyed by ID; parent links are weak references
//! and every walk over them is cycle-safe. A code index over live accounts
//! backs case-insensitive uniqueness.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};

use chrono::Utc;
use ledgerkeep_shared::types::{AccountId, round_amount};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::types::{Account, AccountPatch, NewAccount, normalize_code};
use crate::ledger::{BalanceCalculator, LedgerError};

/// Name marker appended to accounts absorbed by a duplicate merge.
pub const MERGED_MARKER: &str = " (MERGED - DUPLICATE)";

/// Counts of what a hierarchy repair pass changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepairSummary {
    /// Accounts whose parent was missing or deleted, now roots.
    pub orphans_detached: usize,
    /// Parent links removed to break cycles.
    pub cycles_broken: usize,
    /// Accounts whose level was corrected.
    pub levels_fixed: usize,
    /// Accounts with children promoted to header.
    pub headers_promoted: usize,
    /// Header balances corrected afterwards.
    pub balances_changed: usize,
}

impl RepairSummary {
    /// Returns true if the pass changed nothing.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        *self == Self::default()
    }
}

/// Chart of accounts with hierarchy and code-uniqueness rules.
#[derive(Debug, Clone, Default)]
pub struct ChartOfAccounts {
    accounts: HashMap<AccountId, Account>,
    codes: BTreeMap<String, Vec<AccountId>>,
    code_guard: bool,
    changed: BTreeSet<AccountId>,
}

impl ChartOfAccounts {
    /// Creates an empty chart.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads stored accounts as they are, duplicates and broken links included.
    #[must_use]
    pub fn from_accounts<I>(accounts: I) -> Self
    where
        I: IntoIterator<Item = Account>,
    {
        let mut chart = Self::new();
        for account in accounts {
            chart.index_insert(&account);
            chart.accounts.insert(account.id, account);
        }
        chart
    }

    /// Marks the code guard as already present (e.g. installed in the database).
    #[must_use]
    pub fn with_code_guard(mut self, installed: bool) -> Self {
        self.code_guard = installed;
        self
    }

    /// Adds a stored account. Once the code guard is installed, a live
    /// duplicate code is rejected.
    pub fn import(&mut self, account: Account) -> Result<(), LedgerError> {
        if self.accounts.contains_key(&account.id) {
            return Err(LedgerError::InvalidAccount(format!(
                "account {} is already loaded",
                account.id
            )));
        }
        if self.code_guard && !account.is_deleted() && self.codes.contains_key(&account.normalized_code()) {
            return Err(LedgerError::DuplicateCode { code: account.code });
        }
        self.index_insert(&account);
        self.changed.insert(account.id);
        self.accounts.insert(account.id, account);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Lookups
    // ------------------------------------------------------------------

    /// Number of accounts, deleted ones included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    /// Returns true if the chart holds no accounts.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }

    /// Looks up any account, deleted ones included.
    #[must_use]
    pub fn get(&self, id: AccountId) -> Option<&Account> {
        self.accounts.get(&id)
    }

    /// Looks up a non-deleted account.
    pub fn live(&self, id: AccountId) -> Result<&Account, LedgerError> {
        self.accounts
            .get(&id)
            .filter(|a| !a.is_deleted())
            .ok_or(LedgerError::AccountNotFound(id))
    }

    /// Finds the live account with this code (case-insensitive).
    #[must_use]
    pub fn find_by_code(&self, code: &str) -> Option<&Account> {
        self.codes
            .get(&normalize_code(code))
            .and_then(|ids| ids.first())
            .and_then(|id| self.accounts.get(id))
    }

    /// All live accounts sharing this code.
    #[must_use]
    pub fn accounts_with_code(&self, code: &str) -> Vec<&Account> {
        self.codes
            .get(&normalize_code(code))
            .map(|ids| ids.iter().filter_map(|id| self.accounts.get(id)).collect())
            .unwrap_or_default()
    }

    /// Iterates all accounts, deleted ones included, in no particular order.
    pub fn accounts(&self) -> impl Iterator<Item = &Account> {
        self.accounts.values()
    }

    /// Iterates live accounts in no particular order.
    pub fn live_accounts(&self) -> impl Iterator<Item = &Account> {
        self.accounts.values().filter(|a| !a.is_deleted())
    }

    /// Live direct children of an account, in ascending ID order.
    #[must_use]
    pub fn children(&self, id: AccountId) -> Vec<AccountId> {
        let mut children: Vec<AccountId> = self
            .live_accounts()
            .filter(|a| a.parent_id == Some(id))
            .map(|a| a.id)
            .collect();
        children.sort_unstable();
        children
    }

    /// Live children of every live account.
    pub(crate) fn children_map(&self) -> HashMap<AccountId, Vec<AccountId>> {
        let mut map: HashMap<AccountId, Vec<AccountId>> = HashMap::new();
        for account in self.live_accounts() {
            if let Some(parent) = account.parent_id {
                map.entry(parent).or_default().push(account.id);
            }
        }
        for children in map.values_mut() {
            children.sort_unstable();
        }
        map
    }

    /// Ancestors of an account, nearest first.
    ///
    /// Stops at a root, a missing or deleted parent, or the first account
    /// seen twice.
    #[must_use]
    pub fn ancestors(&self, id: AccountId) -> Vec<AccountId> {
        let mut seen = HashSet::from([id]);
        let mut chain = Vec::new();
        let mut current = self.accounts.get(&id).and_then(|a| a.parent_id);
        while let Some(parent_id) = current {
            let Some(parent) = self.accounts.get(&parent_id).filter(|p| !p.is_deleted()) else {
                break;
            };
            if !seen.insert(parent_id) {
                break;
            }
            chain.push(parent_id);
            current = parent.parent_id;
        }
        chain
    }

    /// All live descendants of an account.
    #[must_use]
    pub fn descendants(&self, id: AccountId) -> Vec<AccountId> {
        let children = self.children_map();
        let mut seen = HashSet::from([id]);
        let mut out = Vec::new();
        let mut queue = VecDeque::from([id]);
        while let Some(current) = queue.pop_front() {
            for child in children.get(&current).into_iter().flatten() {
                if seen.insert(*child) {
                    out.push(*child);
                    queue.push_back(*child);
                }
            }
        }
        out
    }

    /// Depth of an account following actual parent links, 1 for roots.
    #[must_use]
    pub fn depth_of(&self, id: AccountId) -> u32 {
        u32::try_from(self.ancestors(id).len() + 1).unwrap_or(u32::MAX)
    }

    /// Returns the accounts forming a parent cycle reachable from `id`.
    #[must_use]
    pub fn find_cycle(&self, id: AccountId) -> Option<Vec<AccountId>> {
        let mut path = Vec::new();
        let mut position = HashMap::new();
        let mut current = Some(id);
        while let Some(account_id) = current {
            let account = self.accounts.get(&account_id).filter(|a| !a.is_deleted())?;
            if let Some(&pos) = position.get(&account_id) {
                return Some(path[pos..].to_vec());
            }
            position.insert(account_id, path.len());
            path.push(account_id);
            current = account.parent_id;
        }
        None
    }

    // ------------------------------------------------------------------
    // Code guard
    // ------------------------------------------------------------------

    /// Returns true once the code guard is installed.
    #[must_use]
    pub fn code_guard_installed(&self) -> bool {
        self.code_guard
    }

    /// Normalized codes shared by more than one live account.
    #[must_use]
    pub fn duplicate_codes(&self) -> Vec<String> {
        self.codes
            .iter()
            .filter(|(_, ids)| ids.len() > 1)
            .map(|(code, _)| code.clone())
            .collect()
    }

    /// Installs the code guard. Returns false if it was already installed.
    pub fn install_code_guard(&mut self) -> Result<bool, LedgerError> {
        if self.code_guard {
            return Ok(false);
        }
        let codes = self.duplicate_codes();
        if !codes.is_empty() {
            return Err(LedgerError::GuardViolation { codes });
        }
        self.code_guard = true;
        Ok(true)
    }

    /// Returns and clears the accounts modified since the last call.
    pub fn take_changes(&mut self) -> Vec<Account> {
        std::mem::take(&mut self.changed)
            .into_iter()
            .filter_map(|id| self.accounts.get(&id).cloned())
            .collect()
    }

    // ------------------------------------------------------------------
    // Mutations
    // ------------------------------------------------------------------

    /// Creates an account.
    ///
    /// The level follows the parent; a parent that is not yet a header is
    /// promoted to header.
    pub fn create_account(&mut self, input: NewAccount) -> Result<Account, LedgerError> {
        let code = input.code.trim().to_string();
        if code.is_empty() {
            return Err(LedgerError::InvalidAccount("code is required".into()));
        }
        if input.name.trim().is_empty() {
            return Err(LedgerError::InvalidAccount("name is required".into()));
        }
        if self.codes.contains_key(&normalize_code(&code)) {
            return Err(LedgerError::DuplicateCode { code });
        }
        let parent = match input.parent_code.as_deref() {
            Some(parent_code) => Some(
                self.find_by_code(parent_code)
                    .ok_or_else(|| LedgerError::ParentNotFound(parent_code.trim().to_string()))?,
            ),
            None => None,
        };

        let now = Utc::now();
        let account = Account {
            id: AccountId::new(),
            code,
            name: input.name.trim().to_string(),
            description: input.description,
            account_type: input.account_type,
            category: input.category,
            parent_id: parent.map(|p| p.id),
            level: parent.map_or(1, |p| p.level.saturating_add(1)),
            is_header: input.is_header,
            balance: Decimal::ZERO,
            is_active: true,
            is_system_critical: input.is_system_critical,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };
        let id = account.id;

        self.index_insert(&account);
        self.accounts.insert(id, account);
        self.changed.insert(id);

        if let Some(parent_id) = self.accounts.get(&id).and_then(|a| a.parent_id) {
            self.promote_to_header(parent_id);
            self.propagate_from([id]);
        }

        self.live(id).cloned()
    }

    /// Updates an account.
    ///
    /// On system-critical accounts `code`, `account_type`, `category` and
    /// `is_active` are locked; writing the current value back is allowed.
    pub fn update_account(&mut self, id: AccountId, patch: AccountPatch) -> Result<Account, LedgerError> {
        let current = self.live(id)?.clone();

        if current.is_system_critical {
            Self::check_critical_lock(&current, &patch)?;
        }

        let new_code = patch.code.as_deref().map(str::trim);
        if let Some(code) = new_code {
            if code.is_empty() {
                return Err(LedgerError::InvalidAccount("code is required".into()));
            }
            let normalized = normalize_code(code);
            if normalized != current.normalized_code() && self.codes.contains_key(&normalized) {
                return Err(LedgerError::DuplicateCode { code: code.to_string() });
            }
        }
        if patch.name.as_deref().is_some_and(|n| n.trim().is_empty()) {
            return Err(LedgerError::InvalidAccount("name is required".into()));
        }
        if patch.is_header == Some(false) && current.is_header && !self.children(id).is_empty() {
            return Err(LedgerError::HasChildren(id));
        }
        let new_parent = patch.parent_id.filter(|p| *p != current.parent_id);
        if let Some(Some(parent_id)) = new_parent {
            self.check_new_parent(id, parent_id)?;
        }

        // Everything below is infallible.
        if let Some(code) = new_code {
            self.index_remove(id, &current.normalized_code());
            if let Some(account) = self.accounts.get_mut(&id) {
                account.code = code.to_string();
            }
            if let Some(account) = self.accounts.get(&id).cloned() {
                self.index_insert(&account);
            }
        }
        if let Some(account) = self.accounts.get_mut(&id) {
            if let Some(name) = patch.name {
                account.name = name.trim().to_string();
            }
            if let Some(description) = patch.description {
                account.description = description;
            }
            if let Some(account_type) = patch.account_type {
                account.account_type = account_type;
            }
            if let Some(category) = patch.category {
                account.category = category;
            }
            if let Some(is_active) = patch.is_active {
                account.is_active = is_active;
            }
            account.updated_at = Utc::now();
        }
        self.changed.insert(id);

        match patch.is_header {
            Some(true) if !current.is_header => {
                self.promote_to_header(id);
                self.propagate_from([id]);
            }
            Some(false) if current.is_header => {
                if let Some(account) = self.accounts.get_mut(&id) {
                    account.is_header = false;
                }
            }
            _ => {}
        }

        if let Some(parent) = new_parent {
            self.move_under(id, parent);
        }

        self.live(id).cloned()
    }

    /// Moves the account with `child_code` under the account with `parent_code`.
    pub fn reparent(&mut self, child_code: &str, parent_code: &str) -> Result<Account, LedgerError> {
        let child_id = self
            .find_by_code(child_code)
            .map(|a| a.id)
            .ok_or_else(|| LedgerError::AccountCodeNotFound(child_code.trim().to_string()))?;
        let parent_id = self
            .find_by_code(parent_code)
            .map(|a| a.id)
            .ok_or_else(|| LedgerError::ParentNotFound(parent_code.trim().to_string()))?;

        self.update_account(
            child_id,
            AccountPatch {
                parent_id: Some(Some(parent_id)),
                ..AccountPatch::default()
            },
        )
    }

    /// Soft-deletes a leaf account with a zero balance.
    pub fn soft_delete(&mut self, id: AccountId) -> Result<Account, LedgerError> {
        let account = self.live(id)?;
        if account.is_system_critical {
            return Err(LedgerError::CriticalAccountLocked {
                account_id: id,
                field: "deleted_at",
            });
        }
        if !self.children(id).is_empty() {
            return Err(LedgerError::HasChildren(id));
        }
        if !account.balance.is_zero() {
            return Err(LedgerError::HasPostings(id));
        }
        let normalized = account.normalized_code();

        self.index_remove(id, &normalized);
        if let Some(account) = self.accounts.get_mut(&id) {
            let now = Utc::now();
            account.deleted_at = Some(now);
            account.is_active = false;
            account.updated_at = now;
        }
        self.changed.insert(id);
        self.propagate_from([id]);

        self.get(id)
            .cloned()
            .ok_or(LedgerError::AccountNotFound(id))
    }

    /// Stores a leaf account's journal-derived balance. Returns true if it changed.
    pub fn set_leaf_balance(&mut self, id: AccountId, balance: Decimal) -> bool {
        let balance = round_amount(balance);
        match self.accounts.get_mut(&id) {
            Some(account) if account.balance != balance => {
                account.balance = balance;
                account.updated_at = Utc::now();
                self.changed.insert(id);
                true
            }
            _ => false,
        }
    }

    /// Re-aggregates every header above the given accounts, deepest first.
    ///
    /// Returns the headers whose balance changed.
    pub fn propagate_from<I>(&mut self, ids: I) -> Vec<AccountId>
    where
        I: IntoIterator<Item = AccountId>,
    {
        let mut targets: Vec<(usize, AccountId)> = Vec::new();
        let mut seen = HashSet::new();
        for id in ids {
            let chain = self.ancestors(id);
            let chain_len = chain.len();
            for (offset, ancestor) in chain.into_iter().enumerate() {
                if seen.insert(ancestor) {
                    targets.push((chain_len - offset, ancestor));
                }
            }
        }
        // Distance from the root; larger means deeper.
        targets.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));

        let children = self.children_map();
        targets
            .into_iter()
            .filter(|(_, id)| self.recompute_header(*id, &children))
            .map(|(_, id)| id)
            .collect()
    }

    /// Bottom-up pass enforcing header = Σ children. Idempotent.
    ///
    /// Returns the number of headers whose balance changed.
    pub fn recalculate_header_balances(&mut self) -> usize {
        let children = self.children_map();
        let mut headers: Vec<(u32, AccountId)> = self
            .live_accounts()
            .filter(|a| a.is_header)
            .map(|a| (self.depth_of(a.id), a.id))
            .collect();
        headers.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));

        let max_passes = headers
            .first()
            .map_or(0, |(depth, _)| usize::try_from(*depth).unwrap_or(usize::MAX))
            .saturating_add(1);
        let mut changed = HashSet::new();
        for _ in 0..max_passes {
            let mut any = false;
            for (_, id) in &headers {
                if self.recompute_header(*id, &children) {
                    changed.insert(*id);
                    any = true;
                }
            }
            if !any {
                break;
            }
        }
        changed.len()
    }

    /// Fixes broken links left by imports and legacy data.
    ///
    /// 1. Accounts whose parent is missing or deleted become roots
    /// 2. Parent cycles are broken at their lowest ID
    /// 3. Levels are recomputed from the roots
    /// 4. Accounts with children are promoted to header
    /// 5. Header balances are re-aggregated
    pub fn repair_hierarchy(&mut self) -> RepairSummary {
        let mut summary = RepairSummary::default();

        let orphans: Vec<AccountId> = self
            .live_accounts()
            .filter(|a| {
                a.parent_id
                    .is_some_and(|p| self.accounts.get(&p).is_none_or(Account::is_deleted))
            })
            .map(|a| a.id)
            .collect();
        for id in orphans {
            self.set_parent(id, None);
            summary.orphans_detached += 1;
        }

        let mut ids: Vec<AccountId> = self.live_accounts().map(|a| a.id).collect();
        ids.sort_unstable();
        for id in &ids {
            while let Some(cycle) = self.find_cycle(*id) {
                let Some(&victim) = cycle.iter().min() else {
                    break;
                };
                tracing::warn!(account_id = %victim, "breaking parent cycle");
                self.set_parent(victim, None);
                summary.cycles_broken += 1;
            }
        }

        let children = self.children_map();
        let mut roots: Vec<AccountId> = self
            .live_accounts()
            .filter(|a| a.parent_id.is_none())
            .map(|a| a.id)
            .collect();
        roots.sort_unstable();
        let mut queue: VecDeque<(AccountId, u32)> = roots.into_iter().map(|id| (id, 1)).collect();
        while let Some((id, level)) = queue.pop_front() {
            if let Some(account) = self.accounts.get_mut(&id) {
                if account.level != level {
                    account.level = level;
                    account.updated_at = Utc::now();
                    self.changed.insert(id);
                    summary.levels_fixed += 1;
                }
            }
            for child in children.get(&id).into_iter().flatten() {
                queue.push_back((*child, level.saturating_add(1)));
            }
        }

        for (parent, _) in children.iter().filter(|(_, kids)| !kids.is_empty()) {
            if self.accounts.get(parent).is_some_and(|a| !a.is_deleted() && !a.is_header) {
                self.promote_to_header(*parent);
                summary.headers_promoted += 1;
            }
        }

        summary.balances_changed = self.recalculate_header_balances();
        summary
    }

    /// Folds duplicate accounts into `primary`.
    ///
    /// The primary takes `consolidated_balance` and inherits the critical
    /// flag; duplicates are soft-deleted, deactivated and renamed with
    /// [`MERGED_MARKER`]. Headers above all of them are re-aggregated.
    pub fn absorb_duplicates(
        &mut self,
        primary: AccountId,
        duplicates: &[AccountId],
        consolidated_balance: Decimal,
    ) -> Result<Vec<AccountId>, LedgerError> {
        self.live(primary)?;
        for id in duplicates {
            self.live(*id)?;
        }

        let inherits_critical = duplicates
            .iter()
            .filter_map(|id| self.accounts.get(id))
            .any(|a| a.is_system_critical);
        let now = Utc::now();

        for id in duplicates {
            let normalized = self.accounts.get(id).map(Account::normalized_code);
            if let Some(normalized) = normalized {
                self.index_remove(*id, &normalized);
            }
            if let Some(account) = self.accounts.get_mut(id) {
                if !account.name.ends_with(MERGED_MARKER) {
                    account.name.push_str(MERGED_MARKER);
                }
                account.is_active = false;
                account.deleted_at = Some(now);
                account.updated_at = now;
            }
            self.changed.insert(*id);
        }
        if let Some(account) = self.accounts.get_mut(&primary) {
            account.balance = round_amount(consolidated_balance);
            account.is_system_critical |= inherits_critical;
            account.updated_at = now;
        }
        self.changed.insert(primary);

        Ok(self.propagate_from(std::iter::once(primary).chain(duplicates.iter().copied())))
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    fn check_critical_lock(current: &Account, patch: &AccountPatch) -> Result<(), LedgerError> {
        let locked = |field| LedgerError::CriticalAccountLocked {
            account_id: current.id,
            field,
        };
        if patch.code.as_deref().is_some_and(|c| c.trim() != current.code) {
            return Err(locked("code"));
        }
        if patch.account_type.is_some_and(|t| t != current.account_type) {
            return Err(locked("account_type"));
        }
        if patch.category.as_ref().is_some_and(|c| *c != current.category) {
            return Err(locked("category"));
        }
        if patch.is_active.is_some_and(|a| a != current.is_active) {
            return Err(locked("is_active"));
        }
        Ok(())
    }

    fn check_new_parent(&self, id: AccountId, parent_id: AccountId) -> Result<(), LedgerError> {
        self.live(parent_id)
            .map_err(|_| LedgerError::ParentNotFound(parent_id.to_string()))?;
        if parent_id == id || self.descendants(id).contains(&parent_id) {
            return Err(LedgerError::HierarchyCycle {
                account_id: id,
                parent_id,
            });
        }
        Ok(())
    }

    /// Re-links an account, fixes subtree levels and both parent chains.
    fn move_under(&mut self, id: AccountId, parent: Option<AccountId>) {
        let old_parent = self.accounts.get(&id).and_then(|a| a.parent_id);
        self.set_parent(id, parent);
        if let Some(parent_id) = parent {
            self.promote_to_header(parent_id);
        }
        self.relevel_subtree(id);
        if let Some(old) = old_parent {
            let children = self.children_map();
            self.recompute_header(old, &children);
        }
        self.propagate_from(old_parent.into_iter().chain([id]));
    }

    fn set_parent(&mut self, id: AccountId, parent: Option<AccountId>) {
        if let Some(account) = self.accounts.get_mut(&id) {
            account.parent_id = parent;
            account.updated_at = Utc::now();
            self.changed.insert(id);
        }
    }

    fn relevel_subtree(&mut self, root: AccountId) {
        let base = self
            .accounts
            .get(&root)
            .and_then(|a| a.parent_id)
            .and_then(|p| self.accounts.get(&p))
            .map_or(1, |p| p.level.saturating_add(1));
        let children = self.children_map();
        let mut seen = HashSet::new();
        let mut queue = VecDeque::from([(root, base)]);
        while let Some((id, level)) = queue.pop_front() {
            if !seen.insert(id) {
                continue;
            }
            if let Some(account) = self.accounts.get_mut(&id) {
                if account.level != level {
                    account.level = level;
                    self.changed.insert(id);
                }
            }
            for child in children.get(&id).into_iter().flatten() {
                queue.push_back((*child, level.saturating_add(1)));
            }
        }
    }

    fn promote_to_header(&mut self, id: AccountId) {
        if let Some(account) = self.accounts.get_mut(&id) {
            if account.is_header {
                return;
            }
            if !account.balance.is_zero() {
                tracing::warn!(
                    account_id = %id,
                    code = %account.code,
                    balance = %account.balance,
                    "promoting account with own balance to header; balance becomes derived"
                );
            }
            account.is_header = true;
            account.updated_at = Utc::now();
            self.changed.insert(id);
        }
        let children = self.children_map();
        self.recompute_header(id, &children);
    }

    /// Sets a header's balance to the sum of its live children.
    fn recompute_header(&mut self, id: AccountId, children: &HashMap<AccountId, Vec<AccountId>>) -> bool {
        if !self.accounts.get(&id).is_some_and(|a| a.is_header && !a.is_deleted()) {
            return false;
        }
        let sum = BalanceCalculator::header_balance(
            children
                .get(&id)
                .into_iter()
                .flatten()
                .filter_map(|c| self.accounts.get(c))
                .map(|c| c.balance),
        );
        match self.accounts.get_mut(&id) {
            Some(account) if account.balance != sum => {
                account.balance = sum;
                account.updated_at = Utc::now();
                self.changed.insert(id);
                true
            }
            _ => false,
        }
    }

    fn index_insert(&mut self, account: &Account) {
        if account.is_deleted() {
            return;
        }
        self.codes
            .entry(account.normalized_code())
            .or_default()
            .push(account.id);
    }

    fn index_remove(&mut self, id: AccountId, normalized: &str) {
        if let Some(ids) = self.codes.get_mut(normalized) {
            ids.retain(|x| *x != id);
            if ids.is_empty() {
                self.codes.remove(normalized);
            }
        }
    }
}
