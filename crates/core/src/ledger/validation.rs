//! Journal entry validation.
//!
//! Validation runs before anything is written, so a rejected entry leaves
//! no trace in balances or the journal.

use std::collections::HashSet;

use chrono::Utc;
use ledgerkeep_shared::types::{AccountId, JournalEntryId, JournalLineId};
use rust_decimal::Decimal;

use super::error::LedgerError;
use super::journal::{JournalEntry, JournalLine, JournalStatus, JournalTotals, NewJournalEntry};

/// What the validator needs to know about a line's target account.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PostingAccount {
    /// The account ID.
    pub id: AccountId,
    /// Header accounts never receive lines.
    pub is_header: bool,
    /// Inactive accounts never receive lines.
    pub is_active: bool,
}

/// Journal validation rules.
pub struct JournalValidator;

impl JournalValidator {
    /// Checks line shape and numbering, without looking at accounts or balance.
    ///
    /// Returns the lines with their final line numbers. Drafts only need
    /// this much.
    pub fn validate_lines(input: &NewJournalEntry) -> Result<Vec<JournalLine>, LedgerError> {
        if input.entry_number.trim().is_empty() {
            return Err(LedgerError::InvalidEntry("entry number is required".into()));
        }
        if input.lines.len() < 2 {
            return Err(LedgerError::InsufficientLines);
        }

        let mut seen = HashSet::with_capacity(input.lines.len());
        let mut lines = Vec::with_capacity(input.lines.len());

        for (idx, line) in input.lines.iter().enumerate() {
            let line_number = match line.line_number {
                Some(n) => n,
                None => u32::try_from(idx + 1)
                    .map_err(|_| LedgerError::InvalidEntry("too many lines".into()))?,
            };
            Self::validate_amounts(line_number, line.debit_amount, line.credit_amount)?;
            if !seen.insert(line_number) {
                return Err(LedgerError::InvalidLine {
                    line_number,
                    reason: "duplicate line number".into(),
                });
            }
            lines.push(JournalLine {
                id: JournalLineId::new(),
                account_id: line.account_id,
                line_number,
                debit_amount: line.debit_amount,
                credit_amount: line.credit_amount,
                memo: line.memo.clone(),
            });
        }

        lines.sort_by_key(|l| l.line_number);
        Ok(lines)
    }

    /// Full validation for posting.
    ///
    /// 1. Line shape and numbering
    /// 2. Every target exists, is active, and is not a header
    /// 3. Debits equal credits within one cent
    pub fn validate_for_posting<A>(
        input: &NewJournalEntry,
        account_lookup: A,
    ) -> Result<(Vec<JournalLine>, JournalTotals), LedgerError>
    where
        A: Fn(AccountId) -> Result<PostingAccount, LedgerError>,
    {
        let lines = Self::validate_lines(input)?;

        for line in &lines {
            let account = account_lookup(line.account_id)?;
            if account.is_header {
                return Err(LedgerError::HeaderAccountTarget(account.id));
            }
            if !account.is_active {
                return Err(LedgerError::AccountInactive(account.id));
            }
        }

        let totals = JournalTotals::from_lines(&lines);
        if !totals.is_balanced {
            return Err(LedgerError::Unbalanced {
                debit: totals.total_debit,
                credit: totals.total_credit,
            });
        }

        Ok((lines, totals))
    }

    /// Builds a posted entry from validated lines.
    #[must_use]
    pub fn posted_entry(
        input: &NewJournalEntry,
        lines: Vec<JournalLine>,
        totals: JournalTotals,
    ) -> JournalEntry {
        Self::build_entry(input, lines, totals, JournalStatus::Posted)
    }

    /// Builds a draft entry from shape-checked lines.
    #[must_use]
    pub fn draft_entry(
        input: &NewJournalEntry,
        lines: Vec<JournalLine>,
        totals: JournalTotals,
    ) -> JournalEntry {
        Self::build_entry(input, lines, totals, JournalStatus::Draft)
    }

    fn build_entry(
        input: &NewJournalEntry,
        lines: Vec<JournalLine>,
        totals: JournalTotals,
        status: JournalStatus,
    ) -> JournalEntry {
        let now = Utc::now();
        JournalEntry {
            id: JournalEntryId::new(),
            entry_number: input.entry_number.trim().to_string(),
            source_type: input.source_type.clone(),
            source_id: input.source_id.clone(),
            entry_date: input.entry_date,
            description: input.description.clone(),
            status,
            total_debit: totals.total_debit,
            total_credit: totals.total_credit,
            posted_at: (status == JournalStatus::Posted).then_some(now),
            reversed_from: None,
            reversed_by: None,
            reversal_reason: None,
            created_at: now,
            lines,
        }
    }

    /// Exactly one side strictly positive, neither negative, at most two
    /// decimal places.
    fn validate_amounts(line_number: u32, debit: Decimal, credit: Decimal) -> Result<(), LedgerError> {
        let invalid = |reason: &str| LedgerError::InvalidLine {
            line_number,
            reason: reason.to_string(),
        };

        if debit < Decimal::ZERO || credit < Decimal::ZERO {
            return Err(invalid("amounts cannot be negative"));
        }
        match (debit > Decimal::ZERO, credit > Decimal::ZERO) {
            (true, true) => return Err(invalid("line cannot carry both debit and credit")),
            (false, false) => return Err(invalid("line must carry a debit or a credit")),
            _ => {}
        }
        if debit.normalize().scale() > 2 || credit.normalize().scale() > 2 {
            return Err(invalid("amounts cannot have more than two decimal places"));
        }
        Ok(())
    }
}
