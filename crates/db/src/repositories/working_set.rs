//! Load-run-persist unit of work shared by the repositories.
//!
//! Every mutating operation runs in one transaction:
//! 1. take the ledger advisory lock, then lock account rows in ascending id
//!    order
//! 2. load the chart, the live sub-ledger records and the journal entries
//!    the operation can affect into a [`LedgerBook`]
//! 3. run the core operation
//! 4. write back only the rows that changed
//!
//! Observer notifications are buffered and replayed after commit, so a
//! rolled-back operation notifies nobody.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;

use ledgerkeep_core::book::LedgerObserver;
use ledgerkeep_core::chart::{Account, ChartOfAccounts, HierarchyConfig};
use ledgerkeep_core::dedup::MergeSummary;
use ledgerkeep_core::ledger::{Journal, JournalEntry, JournalLine};
use ledgerkeep_core::subledger::{BridgeConfig, DriftIncident, SubledgerAccount, SubledgerBridge};
use ledgerkeep_core::{LedgerBook, LedgerError};
use ledgerkeep_shared::LedgerConfig;
use ledgerkeep_shared::types::{AccountId, IncidentId, JournalEntryId, JournalLineId, SubledgerId};
use parking_lot::Mutex;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseBackend, DatabaseTransaction,
    EntityTrait, QueryFilter, QueryOrder, QuerySelect, Statement, TransactionTrait, Value,
};
use uuid::Uuid;

use crate::entities::{accounts, balance_incidents, cash_banks, journal_entries, journal_lines};
use crate::error::{StoreError, on_unique_violation};
use crate::guard;

use super::store::LedgerStore;

/// Key of the transaction-scoped advisory lock serializing ledger writers.
const LEDGER_LOCK_KEY: i64 = 0x4c45_4447_4b45_4550;

/// Which journal entries an operation needs in memory.
///
/// Leaf balances are recomputed from the loaded entries, so every entry with
/// a line on an affected account must be part of the set.
#[derive(Debug, Clone, Default)]
pub(crate) enum JournalScope {
    /// No journal access.
    #[default]
    Nothing,
    /// Entries touching these accounts.
    Accounts(BTreeSet<AccountId>),
    /// One entry plus every entry touching its accounts.
    Entry(JournalEntryId),
    /// Entries touching any live account with this code.
    Code(String),
    /// Entries touching the account bound to this sub-ledger record.
    Subledger(SubledgerId),
    /// Entries touching every account bound to a live sub-ledger record.
    Subledgers,
}

impl JournalScope {
    pub(crate) fn accounts<I>(ids: I) -> Self
    where
        I: IntoIterator<Item = AccountId>,
    {
        Self::Accounts(ids.into_iter().collect())
    }
}

/// Whether the load takes the writer locks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Access {
    Read,
    Write,
}

/// Runs a mutating operation in its own transaction and commits it.
pub(crate) async fn write<T, F>(store: &LedgerStore, scope: JournalScope, op: F) -> Result<T, StoreError>
where
    F: FnOnce(&mut LedgerBook) -> Result<T, LedgerError> + Send,
    T: Send,
{
    let txn = store.db.begin().await?;
    let mut set = WorkingSet::load(&txn, &store.config, scope, Access::Write).await?;
    let output = op(&mut set.book)?;
    set.persist(&txn).await?;
    txn.commit().await?;
    set.replay(store.observer.as_ref());
    Ok(output)
}

/// Runs a read-only operation against a consistent snapshot.
pub(crate) async fn read<T, F>(store: &LedgerStore, scope: JournalScope, op: F) -> Result<T, StoreError>
where
    F: FnOnce(&LedgerBook) -> Result<T, LedgerError> + Send,
    T: Send,
{
    let txn = store.db.begin().await?;
    let set = WorkingSet::load(&txn, &store.config, scope, Access::Read).await?;
    let output = op(&set.book)?;
    txn.rollback().await?;
    Ok(output)
}

/// A ledger book loaded from the database plus what it looked like when
/// loaded.
pub(crate) struct WorkingSet {
    pub(crate) book: LedgerBook,
    known_accounts: HashSet<AccountId>,
    entries: HashMap<JournalEntryId, JournalEntry>,
    records: HashMap<SubledgerId, SubledgerAccount>,
    incidents: HashMap<IncidentId, DriftIncident>,
    events: Arc<BufferedObserver>,
}

impl WorkingSet {
    pub(crate) async fn load(
        txn: &DatabaseTransaction,
        config: &LedgerConfig,
        scope: JournalScope,
        access: Access,
    ) -> Result<Self, StoreError> {
        if access == Access::Write {
            txn.execute(Statement::from_sql_and_values(
                DatabaseBackend::Postgres,
                "SELECT pg_advisory_xact_lock($1)",
                [Value::from(LEDGER_LOCK_KEY)],
            ))
            .await?;
        }

        let mut query = accounts::Entity::find().order_by_asc(accounts::Column::Id);
        if access == Access::Write {
            query = query.lock_exclusive();
        }
        let accounts = query
            .all(txn)
            .await?
            .into_iter()
            .map(accounts::Model::into_domain)
            .collect::<Result<Vec<Account>, _>>()?;
        let known_accounts = accounts.iter().map(|a| a.id).collect();
        let chart =
            ChartOfAccounts::from_accounts(accounts).with_code_guard(guard::is_installed(txn).await?);

        let records = cash_banks::Entity::find()
            .filter(cash_banks::Column::DeletedAt.is_null())
            .order_by_asc(cash_banks::Column::Id)
            .all(txn)
            .await?
            .into_iter()
            .map(cash_banks::Model::into_domain)
            .collect::<Result<Vec<_>, _>>()?;
        let incidents = balance_incidents::Entity::find()
            .filter(balance_incidents::Column::Status.eq("OPEN"))
            .order_by_asc(balance_incidents::Column::DetectedAt)
            .all(txn)
            .await?
            .into_iter()
            .map(balance_incidents::Model::into_domain)
            .collect::<Result<Vec<_>, _>>()?;

        let (account_ids, entry_ids) = match scope {
            JournalScope::Nothing => (BTreeSet::new(), BTreeSet::new()),
            JournalScope::Accounts(ids) => (ids, BTreeSet::new()),
            JournalScope::Entry(id) => (entry_accounts(txn, id).await?, BTreeSet::from([id])),
            JournalScope::Code(code) => (
                chart.accounts_with_code(&code).iter().map(|a| a.id).collect(),
                BTreeSet::new(),
            ),
            JournalScope::Subledger(id) => (
                records
                    .iter()
                    .filter(|r| r.id == id)
                    .filter_map(|r| r.account_id)
                    .collect(),
                BTreeSet::new(),
            ),
            JournalScope::Subledgers => (
                records.iter().filter_map(|r| r.account_id).collect(),
                BTreeSet::new(),
            ),
        };
        let entries = load_entries(txn, &account_ids, &entry_ids).await?;

        let mut journal = Journal::new();
        for entry in &entries {
            journal.insert(entry.clone())?;
        }
        let bridge =
            SubledgerBridge::from_parts(BridgeConfig::from(config), records.clone(), incidents.clone());
        let events = Arc::new(BufferedObserver::default());
        let book = LedgerBook::from_parts(chart, journal, bridge, HierarchyConfig::from(config))
            .with_observer(events.clone());

        Ok(Self {
            book,
            known_accounts,
            entries: entries.into_iter().map(|e| (e.id, e)).collect(),
            records: records.into_iter().map(|r| (r.id, r)).collect(),
            incidents: incidents.into_iter().map(|i| (i.id, i)).collect(),
            events,
        })
    }

    /// Writes every changed row.
    pub(crate) async fn persist(&mut self, txn: &DatabaseTransaction) -> Result<(), StoreError> {
        self.persist_accounts(txn).await?;
        self.persist_journal(txn).await?;
        self.persist_subledgers(txn).await?;
        Ok(())
    }

    /// Hands buffered notifications to `observer`.
    pub(crate) fn replay(&self, observer: &dyn LedgerObserver) {
        self.events.replay(observer);
    }

    async fn persist_accounts(&mut self, txn: &DatabaseTransaction) -> Result<(), StoreError> {
        let (existing, created): (Vec<Account>, Vec<Account>) = self
            .book
            .take_account_changes()
            .into_iter()
            .partition(|a| self.known_accounts.contains(&a.id));

        // Updates first: soft-deleted duplicates release their codes.
        for account in &existing {
            accounts::ActiveModel::from(account)
                .update(txn)
                .await
                .map_err(|e| on_unique_violation(e, || duplicate_code(account)))?;
        }
        for account in &created {
            accounts::ActiveModel::from(account)
                .insert(txn)
                .await
                .map_err(|e| on_unique_violation(e, || duplicate_code(account)))?;
            self.known_accounts.insert(account.id);
        }
        Ok(())
    }

    async fn persist_journal(&self, txn: &DatabaseTransaction) -> Result<(), StoreError> {
        let journal = self.book.journal();

        for id in self.entries.keys().filter(|id| journal.get(**id).is_none()) {
            journal_entries::Entity::delete_by_id(Uuid::from(*id))
                .exec(txn)
                .await?;
        }
        for entry in journal.entries().filter(|e| !self.entries.contains_key(&e.id)) {
            journal_entries::ActiveModel::from(entry)
                .insert(txn)
                .await
                .map_err(|e| {
                    on_unique_violation(e, || LedgerError::DuplicateEntryNumber(entry.entry_number.clone()))
                })?;
            insert_lines(txn, entry.id, &entry.lines).await?;
        }
        for entry in journal.entries() {
            let Some(before) = self.entries.get(&entry.id) else {
                continue;
            };
            if before == entry {
                continue;
            }
            journal_entries::ActiveModel::from(entry).update(txn).await?;
            persist_lines(txn, entry.id, &before.lines, &entry.lines).await?;
        }
        Ok(())
    }

    async fn persist_subledgers(&self, txn: &DatabaseTransaction) -> Result<(), StoreError> {
        let bridge = self.book.bridge();
        for record in bridge.records() {
            match self.records.get(&record.id) {
                None => {
                    cash_banks::ActiveModel::from(record).insert(txn).await?;
                }
                Some(before) if before != record => {
                    cash_banks::ActiveModel::from(record).update(txn).await?;
                }
                Some(_) => {}
            }
        }
        for incident in bridge.incidents() {
            match self.incidents.get(&incident.id) {
                None => {
                    balance_incidents::ActiveModel::from(incident).insert(txn).await?;
                }
                Some(before) if before != incident => {
                    balance_incidents::ActiveModel::from(incident).update(txn).await?;
                }
                Some(_) => {}
            }
        }
        Ok(())
    }
}

fn duplicate_code(account: &Account) -> LedgerError {
    LedgerError::DuplicateCode {
        code: account.code.clone(),
    }
}

/// Accounts referenced by one entry's lines.
async fn entry_accounts(
    txn: &DatabaseTransaction,
    id: JournalEntryId,
) -> Result<BTreeSet<AccountId>, StoreError> {
    let ids: Vec<Uuid> = journal_lines::Entity::find()
        .select_only()
        .column(journal_lines::Column::AccountId)
        .filter(journal_lines::Column::JournalId.eq(Uuid::from(id)))
        .into_tuple()
        .all(txn)
        .await?;
    Ok(ids.into_iter().map(AccountId::from).collect())
}

/// Loads `entry_ids` plus every entry with a line on one of `account_ids`,
/// lines included, in creation order.
async fn load_entries(
    txn: &DatabaseTransaction,
    account_ids: &BTreeSet<AccountId>,
    entry_ids: &BTreeSet<JournalEntryId>,
) -> Result<Vec<JournalEntry>, StoreError> {
    let mut journal_ids: BTreeSet<Uuid> = entry_ids.iter().map(|id| Uuid::from(*id)).collect();
    if !account_ids.is_empty() {
        let touching: Vec<Uuid> = journal_lines::Entity::find()
            .select_only()
            .column(journal_lines::Column::JournalId)
            .distinct()
            .filter(journal_lines::Column::AccountId.is_in(account_ids.iter().map(|id| Uuid::from(*id))))
            .into_tuple()
            .all(txn)
            .await?;
        journal_ids.extend(touching);
    }
    if journal_ids.is_empty() {
        return Ok(Vec::new());
    }

    let headers = journal_entries::Entity::find()
        .filter(journal_entries::Column::Id.is_in(journal_ids.iter().copied()))
        .order_by_asc(journal_entries::Column::CreatedAt)
        .order_by_asc(journal_entries::Column::Id)
        .all(txn)
        .await?;
    let mut lines: HashMap<Uuid, Vec<JournalLine>> = HashMap::new();
    for row in journal_lines::Entity::find()
        .filter(journal_lines::Column::JournalId.is_in(journal_ids.iter().copied()))
        .order_by_asc(journal_lines::Column::LineNumber)
        .all(txn)
        .await?
    {
        let journal_id = row.journal_id;
        lines.entry(journal_id).or_default().push(row.into_domain()?);
    }

    headers
        .into_iter()
        .map(|header| {
            let entry_lines = lines.remove(&header.id).unwrap_or_default();
            header.into_domain(entry_lines)
        })
        .collect()
}

async fn insert_lines(
    txn: &DatabaseTransaction,
    journal_id: JournalEntryId,
    lines: &[JournalLine],
) -> Result<(), StoreError> {
    if lines.is_empty() {
        return Ok(());
    }
    journal_lines::Entity::insert_many(lines.iter().map(|l| journal_lines::Model::active_for(journal_id, l)))
        .exec(txn)
        .await?;
    Ok(())
}

/// Applies a line diff: removed lines first so line numbers can be reused.
async fn persist_lines(
    txn: &DatabaseTransaction,
    journal_id: JournalEntryId,
    before: &[JournalLine],
    after: &[JournalLine],
) -> Result<(), StoreError> {
    let previous: HashMap<JournalLineId, &JournalLine> = before.iter().map(|l| (l.id, l)).collect();
    let current: HashSet<JournalLineId> = after.iter().map(|l| l.id).collect();

    for id in previous.keys().filter(|id| !current.contains(id)) {
        journal_lines::Entity::delete_by_id(Uuid::from(*id)).exec(txn).await?;
    }
    let mut added = Vec::new();
    for line in after {
        match previous.get(&line.id) {
            None => added.push(line.clone()),
            Some(old) if *old != line => {
                journal_lines::Model::active_for(journal_id, line).update(txn).await?;
            }
            Some(_) => {}
        }
    }
    insert_lines(txn, journal_id, &added).await
}

enum LedgerEvent {
    Posted(Box<JournalEntry>),
    Drift(Box<DriftIncident>),
    Merge(Box<MergeSummary>),
}

/// Collects notifications until the transaction commits.
#[derive(Default)]
struct BufferedObserver {
    events: Mutex<Vec<LedgerEvent>>,
}

impl BufferedObserver {
    fn replay(&self, target: &dyn LedgerObserver) {
        for event in self.events.lock().drain(..) {
            match event {
                LedgerEvent::Posted(entry) => target.on_posted(&entry),
                LedgerEvent::Drift(incident) => target.on_drift(&incident),
                LedgerEvent::Merge(summary) => target.on_merge(&summary),
            }
        }
    }
}

impl LedgerObserver for BufferedObserver {
    fn on_posted(&self, entry: &JournalEntry) {
        self.events.lock().push(LedgerEvent::Posted(Box::new(entry.clone())));
    }

    fn on_drift(&self, incident: &DriftIncident) {
        self.events.lock().push(LedgerEvent::Drift(Box::new(incident.clone())));
    }

    fn on_merge(&self, summary: &MergeSummary) {
        self.events.lock().push(LedgerEvent::Merge(Box::new(summary.clone())));
    }
}
