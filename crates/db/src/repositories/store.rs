//! Connection, settings and observer shared by the repositories.

use std::sync::Arc;

use ledgerkeep_core::{LedgerObserver, TracingObserver};
use ledgerkeep_shared::LedgerConfig;
use sea_orm::DatabaseConnection;

use super::{AccountRepository, DuplicateRepository, JournalRepository, SubledgerRepository};

/// Handle to the persisted ledger.
#[derive(Clone)]
pub struct LedgerStore {
    pub(crate) db: DatabaseConnection,
    pub(crate) config: LedgerConfig,
    pub(crate) observer: Arc<dyn LedgerObserver>,
}

impl std::fmt::Debug for LedgerStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LedgerStore")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl LedgerStore {
    /// Creates a store with default ledger settings and the tracing observer.
    #[must_use]
    pub fn new(db: DatabaseConnection) -> Self {
        Self {
            db,
            config: LedgerConfig::default(),
            observer: Arc::new(TracingObserver),
        }
    }

    /// Uses the given `ledger` config section.
    #[must_use]
    pub fn with_config(mut self, config: LedgerConfig) -> Self {
        self.config = config;
        self
    }

    /// Receives notifications after each committed operation.
    #[must_use]
    pub fn with_observer(mut self, observer: Arc<dyn LedgerObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// The underlying connection.
    #[must_use]
    pub const fn connection(&self) -> &DatabaseConnection {
        &self.db
    }

    /// Account Store operations.
    #[must_use]
    pub fn accounts(&self) -> AccountRepository {
        AccountRepository::new(self.clone())
    }

    /// Journal Ledger operations.
    #[must_use]
    pub fn journal(&self) -> JournalRepository {
        JournalRepository::new(self.clone())
    }

    /// Subsidiary Ledger Bridge operations.
    #[must_use]
    pub fn subledgers(&self) -> SubledgerRepository {
        SubledgerRepository::new(self.clone())
    }

    /// Duplicate Resolution Engine operations.
    #[must_use]
    pub fn duplicates(&self) -> DuplicateRepository {
        DuplicateRepository::new(self.clone())
    }
}
