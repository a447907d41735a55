//! Subsidiary ledger bridge for cash and bank records.
//!
//! Each live record binds at most one live leaf GL account and each such
//! account backs at most one live record. Balance differences beyond the
//! configured tolerance are recorded as drift incidents.

pub mod bridge;
pub mod drift;
pub mod integrity;
pub mod types;

pub use bridge::{GlView, ReconcileOutcome, SubledgerBridge, SyncOutcome};
pub use drift::{BridgeConfig, DriftIncident, DriftSeverity, IncidentStatus};
pub use integrity::{IntegrityIssue, IntegrityIssueKind, IntegrityReport, IntegrityStatus};
pub use types::{NewSubledger, SubledgerAccount, SubledgerKind};
