//! Journal repository: posting, drafts and reversals.
//!
//! Each call is one transaction. The entry row, its lines, the recomputed
//! leaf and header balances and any sub-ledger sync or drift incident are
//! committed together or not at all.

use ledgerkeep_core::PostingResult;
use ledgerkeep_core::ledger::{JournalEntry, NewJournalEntry};
use ledgerkeep_shared::types::JournalEntryId;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QueryOrder};
use uuid::Uuid;

use super::store::LedgerStore;
use super::working_set::{self, JournalScope};
use crate::entities::{journal_entries, journal_lines};
use crate::error::StoreError;

/// Journal repository for the unified journal.
#[derive(Debug, Clone)]
pub struct JournalRepository {
    store: LedgerStore,
}

impl JournalRepository {
    /// Creates a new journal repository.
    #[must_use]
    pub const fn new(store: LedgerStore) -> Self {
        Self { store }
    }

    /// Validates and posts a new entry.
    ///
    /// # Errors
    ///
    /// Returns `Unbalanced`, `HeaderAccountTarget`, `InvalidLine`,
    /// `InsufficientLines`, `AccountNotFound`, `AccountInactive` or
    /// `DuplicateEntryNumber`. Nothing is written on error.
    pub async fn post_entry(&self, input: NewJournalEntry) -> Result<PostingResult, StoreError> {
        let scope = JournalScope::accounts(input.lines.iter().map(|l| l.account_id));
        working_set::write(&self.store, scope, |book| book.post_entry(input)).await
    }

    /// Stores a draft. Drafts do not affect balances.
    ///
    /// # Errors
    ///
    /// Returns `InvalidLine`, `InsufficientLines` or `DuplicateEntryNumber`.
    pub async fn create_draft(&self, input: NewJournalEntry) -> Result<JournalEntry, StoreError> {
        working_set::write(&self.store, JournalScope::Nothing, |book| book.create_draft(input)).await
    }

    /// Deletes a draft.
    ///
    /// # Errors
    ///
    /// Returns `EntryNotFound`, or `InvalidEntry` if the entry is not a draft.
    pub async fn discard_draft(&self, id: JournalEntryId) -> Result<JournalEntry, StoreError> {
        working_set::write(&self.store, JournalScope::Entry(id), |book| book.discard_draft(id)).await
    }

    /// Posts a stored draft through the same checks as a new entry.
    ///
    /// # Errors
    ///
    /// Returns `EntryNotFound`, `InvalidTransition` for a non-draft, or any
    /// posting error.
    pub async fn post_draft(&self, id: JournalEntryId) -> Result<PostingResult, StoreError> {
        working_set::write(&self.store, JournalScope::Entry(id), |book| book.post_draft(id)).await
    }

    /// Reverses a posted entry with a mirror entry.
    ///
    /// # Errors
    ///
    /// Returns `NotPosted`, `AlreadyReversed`, `InvalidEntry` for a blank
    /// reason, or `DuplicateEntryNumber` if the mirror number is taken.
    pub async fn reverse_entry(&self, id: JournalEntryId, reason: &str) -> Result<PostingResult, StoreError> {
        working_set::write(&self.store, JournalScope::Entry(id), |book| {
            book.reverse_entry(id, reason)
        })
        .await
    }

    /// Loads one entry with its lines.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn find_by_id(&self, id: JournalEntryId) -> Result<Option<JournalEntry>, StoreError> {
        let Some(header) = journal_entries::Entity::find_by_id(Uuid::from(id))
            .one(&self.store.db)
            .await?
        else {
            return Ok(None);
        };
        self.with_lines(header).await.map(Some)
    }

    /// Loads one entry by its entry number.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn find_by_number(&self, entry_number: &str) -> Result<Option<JournalEntry>, StoreError> {
        let Some(header) = journal_entries::Entity::find()
            .filter(journal_entries::Column::EntryNumber.eq(entry_number))
            .one(&self.store.db)
            .await?
        else {
            return Ok(None);
        };
        self.with_lines(header).await.map(Some)
    }

    async fn with_lines(&self, header: journal_entries::Model) -> Result<JournalEntry, StoreError> {
        let lines = journal_lines::Entity::find()
            .filter(journal_lines::Column::JournalId.eq(header.id))
            .order_by_asc(journal_lines::Column::LineNumber)
            .all(&self.store.db)
            .await?
            .into_iter()
            .map(journal_lines::Model::into_domain)
            .collect::<Result<Vec<_>, _>>()?;
        header.into_domain(lines)
    }
}
