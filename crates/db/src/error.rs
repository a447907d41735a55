//! Errors raised by the database layer.

use ledgerkeep_core::LedgerError;
use ledgerkeep_shared::AppError;
use sea_orm::{DbErr, SqlErr};

/// Error types for repository operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A ledger rule rejected the operation.
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] DbErr),

    /// A stored row cannot be mapped to a domain value.
    #[error("Corrupt row in {table}: {reason}")]
    CorruptRow {
        /// Table the row came from.
        table: &'static str,
        /// What could not be mapped.
        reason: String,
    },
}

impl StoreError {
    /// Returns the stable error code for logs and reports.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Ledger(err) => err.error_code(),
            Self::Database(_) => "DATABASE_ERROR",
            Self::CorruptRow { .. } => "CORRUPT_ROW",
        }
    }

    /// Collapses into the engine's error type.
    #[must_use]
    pub fn into_ledger(self) -> LedgerError {
        match self {
            Self::Ledger(err) => err,
            Self::Database(err) => LedgerError::Database(err.to_string()),
            err @ Self::CorruptRow { .. } => LedgerError::Internal(err.to_string()),
        }
    }

    pub(crate) fn corrupt(table: &'static str, reason: impl Into<String>) -> Self {
        Self::CorruptRow {
            table,
            reason: reason.into(),
        }
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        err.into_ledger().into()
    }
}

/// Maps a unique-constraint violation to a domain error, passing other
/// errors through.
pub(crate) fn on_unique_violation(err: DbErr, domain: impl FnOnce() -> LedgerError) -> StoreError {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => StoreError::Ledger(domain()),
        _ => StoreError::Database(err),
    }
}
