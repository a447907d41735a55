//! Cash and bank sub-ledger repository.

use ledgerkeep_core::subledger::{
    DriftIncident, IntegrityReport, NewSubledger, ReconcileOutcome, SubledgerAccount, SyncOutcome,
};
use ledgerkeep_shared::types::{AccountId, SubledgerId};
use rust_decimal::Decimal;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QueryOrder};
use uuid::Uuid;

use super::store::LedgerStore;
use super::working_set::{self, JournalScope};
use crate::entities::{balance_incidents, cash_banks};
use crate::error::StoreError;

/// Repository for `cash_banks` records and their drift incidents.
#[derive(Debug, Clone)]
pub struct SubledgerRepository {
    store: LedgerStore,
}

impl SubledgerRepository {
    /// Creates a new sub-ledger repository.
    #[must_use]
    pub const fn new(store: LedgerStore) -> Self {
        Self { store }
    }

    /// Registers a cash or bank record, optionally bound to a GL account.
    ///
    /// # Errors
    ///
    /// Returns `AccountAlreadyBound` or `AccountIsHeader` for an invalid
    /// binding.
    pub async fn register(&self, input: NewSubledger) -> Result<SubledgerAccount, StoreError> {
        working_set::write(&self.store, JournalScope::Nothing, |book| {
            book.register_subledger(input)
        })
        .await
    }

    /// Binds a record to a GL account.
    ///
    /// # Errors
    ///
    /// Returns `SubledgerNotFound`, `AccountNotFound`, `AccountAlreadyBound`
    /// or `AccountIsHeader`.
    pub async fn attach(
        &self,
        subledger_id: SubledgerId,
        account_id: AccountId,
    ) -> Result<SubledgerAccount, StoreError> {
        working_set::write(&self.store, JournalScope::Nothing, |book| {
            book.attach_subledger(subledger_id, account_id)
        })
        .await
    }

    /// Stores a new sub-ledger balance and records drift against the GL.
    /// The GL is never written.
    ///
    /// # Errors
    ///
    /// Returns `SubledgerNotFound`, or `AccountNotFound` for an unbound
    /// record.
    pub async fn on_balance_changed(
        &self,
        subledger_id: SubledgerId,
        new_balance: Decimal,
    ) -> Result<SyncOutcome, StoreError> {
        working_set::write(&self.store, JournalScope::Subledger(subledger_id), |book| {
            book.on_subledger_balance_changed(subledger_id, new_balance)
        })
        .await
    }

    /// Aligns a record to its GL balance and resolves its open incidents.
    ///
    /// # Errors
    ///
    /// Returns `SubledgerNotFound`, or `AccountNotFound` for an unbound
    /// record.
    pub async fn reconcile(&self, subledger_id: SubledgerId, note: &str) -> Result<ReconcileOutcome, StoreError> {
        working_set::write(&self.store, JournalScope::Subledger(subledger_id), |book| {
            book.reconcile_subledger(subledger_id, note)
        })
        .await
    }

    /// Read-only integrity report over every live record.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub async fn validate_integrity(&self) -> Result<IntegrityReport, StoreError> {
        working_set::read(&self.store, JournalScope::Subledgers, |book| {
            Ok(book.validate_integrity())
        })
        .await
    }

    /// Loads one record, deleted ones included.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn find_by_id(&self, id: SubledgerId) -> Result<Option<SubledgerAccount>, StoreError> {
        cash_banks::Entity::find_by_id(Uuid::from(id))
            .one(&self.store.db)
            .await?
            .map(cash_banks::Model::into_domain)
            .transpose()
    }

    /// Open incidents, oldest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn open_incidents(&self) -> Result<Vec<DriftIncident>, StoreError> {
        balance_incidents::Entity::find()
            .filter(balance_incidents::Column::Status.eq("OPEN"))
            .order_by_asc(balance_incidents::Column::DetectedAt)
            .all(&self.store.db)
            .await?
            .into_iter()
            .map(balance_incidents::Model::into_domain)
            .collect()
    }
}
