//! Journal entries, their lines, and the posting state machine.
//!
//! ```text
//! DRAFT ──post──► POSTED ──reverse──► REVERSED (terminal)
//!   │
//!   └──discard──► (removed)
//! ```

use std::collections::{BTreeSet, HashMap};

use chrono::{DateTime, NaiveDate, Utc};
use ledgerkeep_shared::types::{AccountId, JournalEntryId, JournalLineId, amounts_match};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::error::LedgerError;

/// Journal entry status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum JournalStatus {
    /// Editable, no effect on balances.
    Draft,
    /// Reflected in balances, immutable.
    Posted,
    /// Cancelled by a mirror entry. Lines still count toward balances.
    Reversed,
}

impl JournalStatus {
    /// Returns the status as stored in the database.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "DRAFT",
            Self::Posted => "POSTED",
            Self::Reversed => "REVERSED",
        }
    }

    /// Returns true if lines of entries in this status count toward balances.
    #[must_use]
    pub const fn affects_balance(self) -> bool {
        !matches!(self, Self::Draft)
    }

    /// Returns true if the state machine allows moving to `next`.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Draft, Self::Posted) | (Self::Posted, Self::Reversed)
        )
    }
}

impl std::fmt::Display for JournalStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for JournalStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "DRAFT" => Ok(Self::Draft),
            "POSTED" => Ok(Self::Posted),
            "REVERSED" => Ok(Self::Reversed),
            _ => Err(format!("Unknown journal status: {s}")),
        }
    }
}

/// One debit or credit line of a journal entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalLine {
    /// Line ID.
    pub id: JournalLineId,
    /// Target account (always a leaf).
    pub account_id: AccountId,
    /// Position within the entry, unique per entry.
    pub line_number: u32,
    /// Debit amount (zero on credit lines).
    pub debit_amount: Decimal,
    /// Credit amount (zero on debit lines).
    pub credit_amount: Decimal,
    /// Optional line memo.
    pub memo: Option<String>,
}

/// A balanced double-entry transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalEntry {
    /// Entry ID.
    pub id: JournalEntryId,
    /// Globally unique entry number.
    pub entry_number: String,
    /// Originating document type (e.g. SALE, PAYMENT, REVERSAL).
    pub source_type: String,
    /// Originating document reference.
    pub source_id: Option<String>,
    /// Accounting date.
    pub entry_date: NaiveDate,
    /// Description.
    pub description: String,
    /// Current status.
    pub status: JournalStatus,
    /// Sum of debit amounts.
    pub total_debit: Decimal,
    /// Sum of credit amounts.
    pub total_credit: Decimal,
    /// When the entry was posted.
    pub posted_at: Option<DateTime<Utc>>,
    /// Entry this one reverses.
    pub reversed_from: Option<JournalEntryId>,
    /// Entry that reversed this one.
    pub reversed_by: Option<JournalEntryId>,
    /// Reason given when this entry was reversed.
    pub reversal_reason: Option<String>,
    /// When the entry was created.
    pub created_at: DateTime<Utc>,
    /// Lines ordered by line number.
    pub lines: Vec<JournalLine>,
}

impl JournalEntry {
    /// Returns true if debits and credits agree within one cent.
    #[must_use]
    pub fn is_balanced(&self) -> bool {
        amounts_match(self.total_debit, self.total_credit)
    }

    /// Distinct accounts touched by this entry, in ascending ID order.
    #[must_use]
    pub fn touched_accounts(&self) -> BTreeSet<AccountId> {
        self.lines.iter().map(|l| l.account_id).collect()
    }

    /// Rebuilds the input this entry was created from, keeping line numbers.
    #[must_use]
    pub fn to_input(&self) -> NewJournalEntry {
        NewJournalEntry {
            entry_number: self.entry_number.clone(),
            source_type: self.source_type.clone(),
            source_id: self.source_id.clone(),
            entry_date: self.entry_date,
            description: self.description.clone(),
            lines: self
                .lines
                .iter()
                .map(|l| NewJournalLine {
                    account_id: l.account_id,
                    line_number: Some(l.line_number),
                    debit_amount: l.debit_amount,
                    credit_amount: l.credit_amount,
                    memo: l.memo.clone(),
                })
                .collect(),
        }
    }

    /// Moves the entry to `next`, enforcing the state machine.
    pub fn transition(&mut self, next: JournalStatus) -> Result<(), LedgerError> {
        if !self.status.can_transition_to(next) {
            return Err(LedgerError::InvalidTransition {
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        Ok(())
    }
}

/// Input line for a new journal entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewJournalLine {
    /// Target account.
    pub account_id: AccountId,
    /// Explicit line number. Lines without one are numbered by position.
    pub line_number: Option<u32>,
    /// Debit amount.
    pub debit_amount: Decimal,
    /// Credit amount.
    pub credit_amount: Decimal,
    /// Optional memo.
    pub memo: Option<String>,
}

impl NewJournalLine {
    /// Creates a debit line.
    #[must_use]
    pub fn debit(account_id: AccountId, amount: Decimal) -> Self {
        Self {
            account_id,
            line_number: None,
            debit_amount: amount,
            credit_amount: Decimal::ZERO,
            memo: None,
        }
    }

    /// Creates a credit line.
    #[must_use]
    pub fn credit(account_id: AccountId, amount: Decimal) -> Self {
        Self {
            account_id,
            line_number: None,
            debit_amount: Decimal::ZERO,
            credit_amount: amount,
            memo: None,
        }
    }

    /// Sets the memo.
    #[must_use]
    pub fn with_memo(mut self, memo: impl Into<String>) -> Self {
        self.memo = Some(memo.into());
        self
    }
}

/// Input for posting or drafting a journal entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewJournalEntry {
    /// Globally unique entry number.
    pub entry_number: String,
    /// Originating document type.
    pub source_type: String,
    /// Originating document reference.
    pub source_id: Option<String>,
    /// Accounting date.
    pub entry_date: NaiveDate,
    /// Description.
    pub description: String,
    /// Lines.
    pub lines: Vec<NewJournalLine>,
}

impl NewJournalEntry {
    /// Creates a manual entry with no lines yet.
    #[must_use]
    pub fn new(entry_number: impl Into<String>, entry_date: NaiveDate) -> Self {
        Self {
            entry_number: entry_number.into(),
            source_type: "MANUAL".to_string(),
            source_id: None,
            entry_date,
            description: String::new(),
            lines: Vec::new(),
        }
    }

    /// Sets the originating document.
    #[must_use]
    pub fn with_source(mut self, source_type: impl Into<String>, source_id: impl Into<String>) -> Self {
        self.source_type = source_type.into();
        self.source_id = Some(source_id.into());
        self
    }

    /// Sets the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Appends a line.
    #[must_use]
    pub fn line(mut self, line: NewJournalLine) -> Self {
        self.lines.push(line);
        self
    }
}

/// Debit and credit totals of an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalTotals {
    /// Sum of debits.
    pub total_debit: Decimal,
    /// Sum of credits.
    pub total_credit: Decimal,
    /// Whether the totals agree within one cent.
    pub is_balanced: bool,
}

impl JournalTotals {
    /// Totals a set of lines.
    pub fn from_lines<'a, I>(lines: I) -> Self
    where
        I: IntoIterator<Item = &'a JournalLine>,
    {
        let (total_debit, total_credit) = lines
            .into_iter()
            .fold((Decimal::ZERO, Decimal::ZERO), |(d, c), l| {
                (d + l.debit_amount, c + l.credit_amount)
            });
        Self {
            total_debit,
            total_credit,
            is_balanced: amounts_match(total_debit, total_credit),
        }
    }
}

/// Append-mostly journal store with unique entry numbers.
///
/// Entries are kept in insertion order; drafts are the only entries that
/// can be removed.
#[derive(Debug, Clone, Default)]
pub struct Journal {
    entries: Vec<JournalEntry>,
    by_id: HashMap<JournalEntryId, usize>,
    by_number: HashMap<String, JournalEntryId>,
}

impl Journal {
    /// Creates an empty journal.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if no entries are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates entries in insertion order.
    pub fn entries(&self) -> impl Iterator<Item = &JournalEntry> {
        self.entries.iter()
    }

    /// Looks up an entry by ID.
    #[must_use]
    pub fn get(&self, id: JournalEntryId) -> Option<&JournalEntry> {
        self.by_id.get(&id).map(|&idx| &self.entries[idx])
    }

    /// Looks up an entry by entry number.
    #[must_use]
    pub fn find_by_number(&self, entry_number: &str) -> Option<&JournalEntry> {
        self.by_number.get(entry_number).and_then(|id| self.get(*id))
    }

    /// Returns true if the entry number is taken.
    #[must_use]
    pub fn contains_number(&self, entry_number: &str) -> bool {
        self.by_number.contains_key(entry_number)
    }

    pub(crate) fn get_mut(&mut self, id: JournalEntryId) -> Option<&mut JournalEntry> {
        self.by_id.get(&id).map(|&idx| &mut self.entries[idx])
    }

    /// Stores an entry, rejecting a taken entry number.
    pub fn insert(&mut self, entry: JournalEntry) -> Result<(), LedgerError> {
        if self.by_number.contains_key(&entry.entry_number) {
            return Err(LedgerError::DuplicateEntryNumber(entry.entry_number));
        }
        self.by_number.insert(entry.entry_number.clone(), entry.id);
        self.by_id.insert(entry.id, self.entries.len());
        self.entries.push(entry);
        Ok(())
    }

    /// Removes a draft entry.
    pub fn remove_draft(&mut self, id: JournalEntryId) -> Result<JournalEntry, LedgerError> {
        let idx = *self.by_id.get(&id).ok_or(LedgerError::EntryNotFound(id))?;
        let status = self.entries[idx].status;
        if status != JournalStatus::Draft {
            return Err(LedgerError::InvalidEntry(format!(
                "only drafts can be discarded, entry {id} is {status}"
            )));
        }
        let removed = self.entries.remove(idx);
        self.by_number.remove(&removed.entry_number);
        self.by_id.remove(&id);
        for (pos, entry) in self.entries.iter().enumerate().skip(idx) {
            self.by_id.insert(entry.id, pos);
        }
        Ok(removed)
    }

    /// Points every line referencing `from` at `to`. Returns lines moved.
    pub fn repoint_lines(&mut self, from: AccountId, to: AccountId) -> u64 {
        let mut moved = 0;
        for line in self
            .entries
            .iter_mut()
            .flat_map(|e| e.lines.iter_mut())
            .filter(|l| l.account_id == from)
        {
            line.account_id = to;
            moved += 1;
        }
        moved
    }

    /// Counts lines of non-draft entries that reference an account.
    #[must_use]
    pub fn posted_line_count(&self, account_id: AccountId) -> u64 {
        let count = self
            .entries
            .iter()
            .filter(|e| e.status.affects_balance())
            .flat_map(|e| e.lines.iter())
            .filter(|l| l.account_id == account_id)
            .count();
        u64::try_from(count).unwrap_or(u64::MAX)
    }
}
