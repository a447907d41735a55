//! Account repository for chart of accounts database operations.

use ledgerkeep_core::chart::{
    Account, AccountPatch, HierarchyReport, NewAccount, RepairSummary, normalize_code,
};
use ledgerkeep_shared::types::AccountId;
use rust_decimal::Decimal;
use sea_orm::sea_query::Expr;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QueryOrder};
use uuid::Uuid;

use super::store::LedgerStore;
use super::working_set::{self, JournalScope};
use crate::entities::accounts;
use crate::error::StoreError;

/// Account repository for chart of accounts operations.
#[derive(Debug, Clone)]
pub struct AccountRepository {
    store: LedgerStore,
}

impl AccountRepository {
    /// Creates a new account repository.
    #[must_use]
    pub const fn new(store: LedgerStore) -> Self {
        Self { store }
    }

    /// Creates an account.
    ///
    /// # Errors
    ///
    /// Returns `DuplicateCode` if a live account already uses the code,
    /// `ParentNotFound` for an unknown parent code.
    pub async fn create(&self, input: NewAccount) -> Result<Account, StoreError> {
        working_set::write(&self.store, JournalScope::Nothing, |book| book.create_account(input))
            .await
    }

    /// Stores an account as it is, e.g. from a legacy import. Duplicate
    /// codes are accepted until the code guard is installed.
    ///
    /// # Errors
    ///
    /// Returns `DuplicateCode` once the guard is installed.
    pub async fn import(&self, account: Account) -> Result<Account, StoreError> {
        let stored = account.clone();
        working_set::write(&self.store, JournalScope::Nothing, |book| book.import_account(account))
            .await?;
        Ok(stored)
    }

    /// Updates an account.
    ///
    /// # Errors
    ///
    /// Returns `AccountNotFound`, `CriticalAccountLocked`, `DuplicateCode` or
    /// `HierarchyCycle`.
    pub async fn update(&self, id: AccountId, patch: AccountPatch) -> Result<Account, StoreError> {
        working_set::write(&self.store, JournalScope::accounts([id]), |book| {
            book.update_account(id, patch)
        })
        .await
    }

    /// Moves an account under another, both given by code.
    ///
    /// # Errors
    ///
    /// Returns `AccountCodeNotFound` or `HierarchyCycle`.
    pub async fn reparent(&self, child_code: &str, parent_code: &str) -> Result<Account, StoreError> {
        working_set::write(&self.store, JournalScope::Nothing, |book| {
            book.reparent(child_code, parent_code)
        })
        .await
    }

    /// Soft-deletes an account.
    ///
    /// # Errors
    ///
    /// Returns `HasChildren`, `CriticalAccountLocked`,
    /// `AccountAlreadyBound` or `HasPostings`.
    pub async fn delete(&self, id: AccountId) -> Result<Account, StoreError> {
        working_set::write(&self.store, JournalScope::accounts([id]), |book| book.delete_account(id))
            .await
    }

    /// Re-aggregates every header. Returns the number of headers changed.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub async fn recalculate_header_balances(&self) -> Result<usize, StoreError> {
        working_set::write(&self.store, JournalScope::Nothing, |book| {
            Ok(book.recalculate_header_balances())
        })
        .await
    }

    /// Repairs orphans, cycles, levels and header flags.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub async fn repair_hierarchy(&self) -> Result<RepairSummary, StoreError> {
        working_set::write(&self.store, JournalScope::Nothing, |book| Ok(book.repair_hierarchy()))
            .await
    }

    /// Read-only hierarchy report.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub async fn validate_hierarchy(&self) -> Result<HierarchyReport, StoreError> {
        working_set::read(&self.store, JournalScope::Nothing, |book| {
            Ok(book.validate_hierarchy())
        })
        .await
    }

    /// An account's balance computed from its journal lines.
    ///
    /// # Errors
    ///
    /// Returns `AccountNotFound` for an unknown or deleted account.
    pub async fn journal_balance(&self, id: AccountId) -> Result<Decimal, StoreError> {
        working_set::read(
            &self.store,
            JournalScope::accounts([id]),
            |book| book.journal_balance(id),
        )
        .await
    }

    /// Finds an account by ID, deleted ones included.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn find_by_id(&self, id: AccountId) -> Result<Option<Account>, StoreError> {
        accounts::Entity::find_by_id(Uuid::from(id))
            .one(&self.store.db)
            .await?
            .map(accounts::Model::into_domain)
            .transpose()
    }

    /// Live accounts whose code matches case-insensitively, oldest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn find_by_code(&self, code: &str) -> Result<Vec<Account>, StoreError> {
        accounts::Entity::find()
            .filter(Expr::cust_with_values("LOWER(TRIM(code)) = $1", [normalize_code(code)]))
            .filter(accounts::Column::DeletedAt.is_null())
            .order_by_asc(accounts::Column::CreatedAt)
            .order_by_asc(accounts::Column::Id)
            .all(&self.store.db)
            .await?
            .into_iter()
            .map(accounts::Model::into_domain)
            .collect()
    }
}
