//! Ledger error types for validation and state errors.
//!
//! One taxonomy covers the whole engine: account store, journal, sub-ledger
//! bridge and duplicate resolution. Drift between a sub-ledger and its GL
//! account is not an error; it is recorded as an incident.

use ledgerkeep_shared::AppError;
use ledgerkeep_shared::types::{AccountId, JournalEntryId, SubledgerId};
use rust_decimal::Decimal;
use thiserror::Error;

use super::journal::JournalStatus;

/// Errors that can occur during ledger operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    // ========== Account Store Errors ==========
    /// Another non-deleted account already uses this code (case-insensitive).
    #[error("Account code '{code}' is already in use")]
    DuplicateCode {
        /// The rejected code as given by the caller.
        code: String,
    },

    /// Account input is malformed (blank code or name).
    #[error("Invalid account: {0}")]
    InvalidAccount(String),

    /// The parent account referenced by code does not exist.
    #[error("Parent account '{0}' not found")]
    ParentNotFound(String),

    /// Account not found (or soft-deleted).
    #[error("Account not found: {0}")]
    AccountNotFound(AccountId),

    /// No non-deleted account carries this code.
    #[error("No account with code '{0}'")]
    AccountCodeNotFound(String),

    /// A locked field of a system-critical account was changed.
    #[error("Account {account_id} is system critical; '{field}' cannot be changed")]
    CriticalAccountLocked {
        /// The critical account.
        account_id: AccountId,
        /// The field the caller tried to change.
        field: &'static str,
    },

    /// The requested parent is the account itself or one of its descendants.
    #[error("Moving account {account_id} under {parent_id} would create a cycle")]
    HierarchyCycle {
        /// The account being moved.
        account_id: AccountId,
        /// The requested parent.
        parent_id: AccountId,
    },

    /// The account still has non-deleted children.
    #[error("Account {0} still has child accounts")]
    HasChildren(AccountId),

    /// The account carries posted lines or a non-zero balance.
    #[error("Account {0} has posted transactions and cannot be deleted")]
    HasPostings(AccountId),

    // ========== Journal Errors ==========
    /// Entry must have at least 2 lines.
    #[error("Journal entry must have at least 2 lines")]
    InsufficientLines,

    /// Entry header is malformed (e.g. blank entry number).
    #[error("Invalid journal entry: {0}")]
    InvalidEntry(String),

    /// A line is malformed.
    #[error("Invalid line {line_number}: {reason}")]
    InvalidLine {
        /// The offending line number.
        line_number: u32,
        /// What is wrong with it.
        reason: String,
    },

    /// Entry is not balanced (debits != credits).
    #[error("Journal entry is not balanced. Debit: {debit}, Credit: {credit}")]
    Unbalanced {
        /// Total debit amount.
        debit: Decimal,
        /// Total credit amount.
        credit: Decimal,
    },

    /// A line targets a header account.
    #[error("Account {0} is a header account and cannot receive postings")]
    HeaderAccountTarget(AccountId),

    /// Account is inactive and cannot be used.
    #[error("Account {0} is inactive")]
    AccountInactive(AccountId),

    /// Entry number already used by another entry.
    #[error("Entry number '{0}' already exists")]
    DuplicateEntryNumber(String),

    /// Journal entry not found.
    #[error("Journal entry not found: {0}")]
    EntryNotFound(JournalEntryId),

    /// Only posted entries can be reversed.
    #[error("Journal entry {0} is not posted")]
    NotPosted(JournalEntryId),

    /// Entry has already been reversed.
    #[error("Journal entry {0} has already been reversed")]
    AlreadyReversed(JournalEntryId),

    /// Status transition outside DRAFT -> POSTED -> REVERSED.
    #[error("Invalid status transition from {from} to {to}")]
    InvalidTransition {
        /// Current status.
        from: JournalStatus,
        /// Requested status.
        to: JournalStatus,
    },

    // ========== Sub-ledger Errors ==========
    /// Sub-ledger record not found.
    #[error("Sub-ledger record not found: {0}")]
    SubledgerNotFound(SubledgerId),

    /// The GL account already backs another sub-ledger record.
    #[error("Account {account_id} is already bound to sub-ledger {subledger_id}")]
    AccountAlreadyBound {
        /// The GL account.
        account_id: AccountId,
        /// The sub-ledger record holding the binding.
        subledger_id: SubledgerId,
    },

    /// Sub-ledger records can only bind leaf accounts.
    #[error("Account {0} is a header account and cannot back a sub-ledger")]
    AccountIsHeader(AccountId),

    // ========== Duplicate Resolution Errors ==========
    /// A duplicate group cannot be merged automatically.
    #[error("Cannot merge accounts with code '{code}': {reason}")]
    MergeConflict {
        /// Normalized code of the group.
        code: String,
        /// Why the merge was refused.
        reason: String,
    },

    /// The code guard cannot be installed while duplicates remain.
    #[error("Code guard cannot be installed, duplicate codes remain: {}", codes.join(", "))]
    GuardViolation {
        /// Normalized codes still shared by several accounts.
        codes: Vec<String>,
    },

    // ========== Infrastructure Errors ==========
    /// Database error.
    #[error("Database error: {0}")]
    Database(String),

    /// Internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl LedgerError {
    /// Returns the stable error code for logs and reports.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::DuplicateCode { .. } => "DUPLICATE_CODE",
            Self::InvalidAccount(_) => "INVALID_ACCOUNT",
            Self::ParentNotFound(_) => "PARENT_NOT_FOUND",
            Self::AccountNotFound(_) => "ACCOUNT_NOT_FOUND",
            Self::AccountCodeNotFound(_) => "ACCOUNT_CODE_NOT_FOUND",
            Self::CriticalAccountLocked { .. } => "CRITICAL_ACCOUNT_LOCKED",
            Self::HierarchyCycle { .. } => "HIERARCHY_CYCLE",
            Self::HasChildren(_) => "HAS_CHILDREN",
            Self::HasPostings(_) => "HAS_POSTINGS",
            Self::InsufficientLines => "INSUFFICIENT_LINES",
            Self::InvalidEntry(_) => "INVALID_ENTRY",
            Self::InvalidLine { .. } => "INVALID_LINE",
            Self::Unbalanced { .. } => "UNBALANCED",
            Self::HeaderAccountTarget(_) => "HEADER_ACCOUNT_TARGET",
            Self::AccountInactive(_) => "ACCOUNT_INACTIVE",
            Self::DuplicateEntryNumber(_) => "DUPLICATE_ENTRY_NUMBER",
            Self::EntryNotFound(_) => "ENTRY_NOT_FOUND",
            Self::NotPosted(_) => "NOT_POSTED",
            Self::AlreadyReversed(_) => "ALREADY_REVERSED",
            Self::InvalidTransition { .. } => "INVALID_TRANSITION",
            Self::SubledgerNotFound(_) => "SUBLEDGER_NOT_FOUND",
            Self::AccountAlreadyBound { .. } => "ACCOUNT_ALREADY_BOUND",
            Self::AccountIsHeader(_) => "ACCOUNT_IS_HEADER",
            Self::MergeConflict { .. } => "MERGE_CONFLICT",
            Self::GuardViolation { .. } => "GUARD_VIOLATION",
            Self::Database(_) => "DATABASE_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Returns true if the caller can fix the request and try again.
    ///
    /// Infrastructure failures are the only errors that are not.
    #[must_use]
    pub fn is_caller_correctable(&self) -> bool {
        !matches!(self, Self::Database(_) | Self::Internal(_))
    }

    /// Returns true if the error is a uniqueness conflict.
    #[must_use]
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            Self::DuplicateCode { .. }
                | Self::DuplicateEntryNumber(_)
                | Self::AccountAlreadyBound { .. }
                | Self::AlreadyReversed(_)
                | Self::MergeConflict { .. }
                | Self::GuardViolation { .. }
        )
    }
}

impl From<LedgerError> for AppError {
    fn from(err: LedgerError) -> Self {
        let message = err.to_string();
        match err {
            LedgerError::AccountNotFound(_)
            | LedgerError::AccountCodeNotFound(_)
            | LedgerError::ParentNotFound(_)
            | LedgerError::EntryNotFound(_)
            | LedgerError::SubledgerNotFound(_) => Self::NotFound(message),
            LedgerError::InvalidAccount(_)
            | LedgerError::InsufficientLines
            | LedgerError::InvalidEntry(_)
            | LedgerError::InvalidLine { .. }
            | LedgerError::Unbalanced { .. } => Self::Validation(message),
            LedgerError::Database(_) => Self::Database(message),
            LedgerError::Internal(_) => Self::Internal(message),
            ref other if other.is_conflict() => Self::Conflict(message),
            _ => Self::BusinessRule(message),
        }
    }
}
