//! Drift between a sub-ledger balance and its GL account.
//!
//! Drift is recorded for manual review, never thrown and never corrected
//! silently.

use chrono::{DateTime, Utc};
use ledgerkeep_shared::LedgerConfig;
use ledgerkeep_shared::types::{AccountId, BALANCE_EPSILON, IncidentId, SubledgerId, round_amount};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Bridge settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgeConfig {
    /// Largest difference still considered in sync.
    pub tolerance: Decimal,
    /// Whether a post pushes the GL balance into bound sub-ledgers.
    pub auto_sync_enabled: bool,
    /// Drift at or above this is high severity.
    pub high_threshold: Decimal,
    /// Drift at or above this is critical.
    pub critical_threshold: Decimal,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            tolerance: BALANCE_EPSILON,
            auto_sync_enabled: false,
            high_threshold: Decimal::new(100_000, 0),
            critical_threshold: Decimal::new(1_000_000, 0),
        }
    }
}

impl From<&LedgerConfig> for BridgeConfig {
    fn from(config: &LedgerConfig) -> Self {
        Self {
            tolerance: config.balance_tolerance,
            auto_sync_enabled: config.auto_sync_enabled,
            high_threshold: config.drift_high_threshold,
            critical_threshold: config.drift_critical_threshold,
        }
    }
}

impl BridgeConfig {
    /// Returns the drift and its severity when it exceeds the tolerance.
    #[must_use]
    pub fn assess(&self, subledger_balance: Decimal, gl_balance: Decimal) -> Option<(Decimal, DriftSeverity)> {
        let difference = round_amount(subledger_balance - gl_balance);
        if difference.abs() <= self.tolerance {
            return None;
        }
        Some((difference, self.severity(difference)))
    }

    /// Classifies an absolute drift amount.
    #[must_use]
    pub fn severity(&self, difference: Decimal) -> DriftSeverity {
        let magnitude = difference.abs();
        if magnitude >= self.critical_threshold {
            DriftSeverity::Critical
        } else if magnitude >= self.high_threshold {
            DriftSeverity::High
        } else {
            DriftSeverity::Low
        }
    }
}

/// How serious a drift is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DriftSeverity {
    /// Below the high threshold.
    Low,
    /// At or above the high threshold.
    High,
    /// At or above the critical threshold.
    Critical,
}

impl DriftSeverity {
    /// Returns the severity as stored in the database.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Low => "LOW",
            Self::High => "HIGH",
            Self::Critical => "CRITICAL",
        }
    }
}

impl std::str::FromStr for DriftSeverity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "LOW" => Ok(Self::Low),
            "HIGH" => Ok(Self::High),
            "CRITICAL" => Ok(Self::Critical),
            _ => Err(format!("Unknown drift severity: {s}")),
        }
    }
}

/// Review status of an incident.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum IncidentStatus {
    /// Awaiting reconciliation.
    Open,
    /// Closed by reconciliation.
    Resolved,
}

impl IncidentStatus {
    /// Returns the status as stored in the database.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Open => "OPEN",
            Self::Resolved => "RESOLVED",
        }
    }
}

impl std::str::FromStr for IncidentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "OPEN" => Ok(Self::Open),
            "RESOLVED" => Ok(Self::Resolved),
            _ => Err(format!("Unknown incident status: {s}")),
        }
    }
}

/// A recorded breach of the sub-ledger tolerance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriftIncident {
    /// Incident ID.
    pub id: IncidentId,
    /// The drifting sub-ledger record.
    pub subledger_id: SubledgerId,
    /// Its GL account.
    pub account_id: AccountId,
    /// Sub-ledger balance when last assessed.
    pub subledger_balance: Decimal,
    /// GL balance when last assessed.
    pub gl_balance: Decimal,
    /// `subledger_balance - gl_balance`.
    pub difference: Decimal,
    /// Severity of the difference.
    pub severity: DriftSeverity,
    /// Review status.
    pub status: IncidentStatus,
    /// First detection time.
    pub detected_at: DateTime<Utc>,
    /// Resolution time.
    pub resolved_at: Option<DateTime<Utc>>,
    /// Note left by whoever reconciled.
    pub resolution_note: Option<String>,
}

impl DriftIncident {
    /// Opens a new incident.
    #[must_use]
    pub fn open(
        subledger_id: SubledgerId,
        account_id: AccountId,
        subledger_balance: Decimal,
        gl_balance: Decimal,
        difference: Decimal,
        severity: DriftSeverity,
    ) -> Self {
        Self {
            id: IncidentId::new(),
            subledger_id,
            account_id,
            subledger_balance,
            gl_balance,
            difference,
            severity,
            status: IncidentStatus::Open,
            detected_at: Utc::now(),
            resolved_at: None,
            resolution_note: None,
        }
    }

    /// Returns true while the incident awaits reconciliation.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.status == IncidentStatus::Open
    }

    /// Refreshes an open incident with a newer assessment.
    pub fn refresh(&mut self, subledger_balance: Decimal, gl_balance: Decimal, difference: Decimal, severity: DriftSeverity) {
        self.subledger_balance = subledger_balance;
        self.gl_balance = gl_balance;
        self.difference = difference;
        self.severity = severity;
    }

    /// Closes the incident.
    pub fn resolve(&mut self, note: impl Into<String>) {
        self.status = IncidentStatus::Resolved;
        self.resolved_at = Some(Utc::now());
        self.resolution_note = Some(note.into());
    }
}
