//! Outbound notifications.

use crate::dedup::MergeSummary;
use crate::ledger::JournalEntry;
use crate::subledger::DriftIncident;

/// Receives engine events after they are committed.
///
/// Every method has a no-op default so implementors pick what they need.
pub trait LedgerObserver: Send + Sync {
    /// An entry was posted.
    fn on_posted(&self, _entry: &JournalEntry) {}

    /// A drift incident was opened or refreshed.
    fn on_drift(&self, _incident: &DriftIncident) {}

    /// A duplicate group was merged.
    fn on_merge(&self, _summary: &MergeSummary) {}
}

/// Emits each event as a structured `tracing` event.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl LedgerObserver for TracingObserver {
    fn on_posted(&self, entry: &JournalEntry) {
        tracing::info!(
            entry_id = %entry.id,
            entry_number = %entry.entry_number,
            source_type = %entry.source_type,
            total = %entry.total_debit,
            "journal entry posted"
        );
    }

    fn on_drift(&self, incident: &DriftIncident) {
        tracing::warn!(
            incident_id = %incident.id,
            subledger_id = %incident.subledger_id,
            account_id = %incident.account_id,
            difference = %incident.difference,
            severity = incident.severity.as_str(),
            "sub-ledger drift"
        );
    }

    fn on_merge(&self, summary: &MergeSummary) {
        tracing::info!(
            code = %summary.normalized_code,
            primary = %summary.primary,
            merged = summary.merged.len(),
            lines = summary.lines_repointed,
            subledgers = summary.subledgers_repointed,
            balance = %summary.consolidated_balance,
            "duplicate accounts merged"
        );
    }
}
