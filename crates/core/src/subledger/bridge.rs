//! Keeps cash/bank records in step with their GL control accounts.
//!
//! The bridge only ever reads the GL. A sub-ledger change is compared against
//! the bound account's journal-derived balance and drift is recorded; the GL
//! is never written from here.

use std::collections::HashMap;

use chrono::Utc;
use ledgerkeep_shared::types::{AccountId, IncidentId, SubledgerId, round_amount};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::drift::{BridgeConfig, DriftIncident};
use super::types::{NewSubledger, SubledgerAccount};
use crate::chart::{Account, ChartOfAccounts};
use crate::ledger::{BalanceCalculator, Journal, LedgerError};

/// Read-only view of the GL: the chart plus the journal its leaf balances
/// are derived from.
#[derive(Debug, Clone, Copy)]
pub struct GlView<'a> {
    chart: &'a ChartOfAccounts,
    journal: &'a Journal,
}

impl<'a> GlView<'a> {
    /// Creates a view over `chart` and `journal`.
    #[must_use]
    pub fn new(chart: &'a ChartOfAccounts, journal: &'a Journal) -> Self {
        Self { chart, journal }
    }

    /// The chart of accounts.
    #[must_use]
    pub fn chart(&self) -> &'a ChartOfAccounts {
        self.chart
    }

    /// Balance of a live account computed from journal lines, never from
    /// the stored figure. Headers report their aggregated balance.
    pub fn balance(&self, account_id: AccountId) -> Result<Decimal, LedgerError> {
        self.chart.live(account_id).map(|account| self.derived(account))
    }

    pub(crate) fn derived(&self, account: &Account) -> Decimal {
        if account.is_header {
            return account.balance;
        }
        round_amount(BalanceCalculator::leaf_balance(
            account.id,
            account.normal_balance(),
            self.journal.entries(),
        ))
    }
}

/// What happened to one sub-ledger record after a balance event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SyncOutcome {
    /// Balances agree within tolerance.
    InSync {
        /// The record.
        subledger_id: SubledgerId,
    },
    /// Auto-sync copied the GL balance into the record.
    Synced {
        /// The record.
        subledger_id: SubledgerId,
        /// Balance before the copy.
        previous: Decimal,
        /// Balance after the copy.
        current: Decimal,
    },
    /// Balances disagree; an incident was opened or refreshed.
    DriftRecorded {
        /// The record.
        subledger_id: SubledgerId,
        /// The open incident.
        incident_id: IncidentId,
    },
}

/// Result of a manual reconciliation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcileOutcome {
    /// The record.
    pub subledger_id: SubledgerId,
    /// Sub-ledger balance before reconciliation.
    pub previous_balance: Decimal,
    /// GL balance the record now carries.
    pub reconciled_balance: Decimal,
    /// Incidents closed by this reconciliation.
    pub resolved_incidents: Vec<IncidentId>,
}

/// Sub-ledger records, their GL bindings, and drift incidents.
#[derive(Debug, Clone, Default)]
pub struct SubledgerBridge {
    config: BridgeConfig,
    records: HashMap<SubledgerId, SubledgerAccount>,
    incidents: Vec<DriftIncident>,
}

impl SubledgerBridge {
    /// Creates an empty bridge.
    #[must_use]
    pub fn new(config: BridgeConfig) -> Self {
        Self {
            config,
            records: HashMap::new(),
            incidents: Vec::new(),
        }
    }

    /// Loads stored records and incidents as they are.
    #[must_use]
    pub fn from_parts(config: BridgeConfig, records: Vec<SubledgerAccount>, incidents: Vec<DriftIncident>) -> Self {
        Self {
            config,
            records: records.into_iter().map(|r| (r.id, r)).collect(),
            incidents,
        }
    }

    /// Bridge settings.
    #[must_use]
    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    /// Looks up a live record.
    pub fn get(&self, id: SubledgerId) -> Result<&SubledgerAccount, LedgerError> {
        self.records
            .get(&id)
            .filter(|r| !r.is_deleted())
            .ok_or(LedgerError::SubledgerNotFound(id))
    }

    /// Iterates all records, deleted ones included.
    pub fn records(&self) -> impl Iterator<Item = &SubledgerAccount> {
        self.records.values()
    }

    /// The live record bound to an account, if any.
    #[must_use]
    pub fn bound_to(&self, account_id: AccountId) -> Option<&SubledgerAccount> {
        self.records
            .values()
            .find(|r| !r.is_deleted() && r.account_id == Some(account_id))
    }

    /// Number of live records bound to an account.
    #[must_use]
    pub fn binding_count(&self, account_id: AccountId) -> usize {
        self.records
            .values()
            .filter(|r| !r.is_deleted() && r.account_id == Some(account_id))
            .count()
    }

    /// All incidents, oldest first.
    #[must_use]
    pub fn incidents(&self) -> &[DriftIncident] {
        &self.incidents
    }

    /// Open incidents, oldest first.
    pub fn open_incidents(&self) -> impl Iterator<Item = &DriftIncident> {
        self.incidents.iter().filter(|i| i.is_open())
    }

    /// Registers a record, binding it if an account is given.
    pub fn register(&mut self, input: NewSubledger, chart: &ChartOfAccounts) -> Result<SubledgerAccount, LedgerError> {
        if input.code.trim().is_empty() {
            return Err(LedgerError::InvalidAccount("sub-ledger code is required".into()));
        }
        let id = SubledgerId::new();
        if let Some(account_id) = input.account_id {
            self.check_binding(id, account_id, chart)?;
        }
        let record = SubledgerAccount {
            id,
            code: input.code.trim().to_string(),
            name: input.name,
            kind: input.kind,
            account_id: input.account_id,
            balance: round_amount(input.opening_balance),
            is_active: true,
            created_at: Utc::now(),
            deleted_at: None,
        };
        self.records.insert(id, record.clone());
        Ok(record)
    }

    /// Binds a record to a GL account.
    ///
    /// The account must be live and a leaf, and must not back another
    /// live record.
    pub fn attach(
        &mut self,
        subledger_id: SubledgerId,
        account_id: AccountId,
        chart: &ChartOfAccounts,
    ) -> Result<SubledgerAccount, LedgerError> {
        self.get(subledger_id)?;
        self.check_binding(subledger_id, account_id, chart)?;
        let record = self
            .records
            .get_mut(&subledger_id)
            .ok_or(LedgerError::SubledgerNotFound(subledger_id))?;
        record.account_id = Some(account_id);
        Ok(record.clone())
    }

    /// Records a new sub-ledger balance and compares it with the GL.
    pub fn on_balance_changed(
        &mut self,
        subledger_id: SubledgerId,
        new_balance: Decimal,
        gl: GlView<'_>,
    ) -> Result<SyncOutcome, LedgerError> {
        self.gl_balance(subledger_id, gl)?;
        if let Some(record) = self.records.get_mut(&subledger_id) {
            record.balance = round_amount(new_balance);
        }
        self.compare(subledger_id, gl)
    }

    /// Runs after a post for each touched account that backs a record.
    ///
    /// With auto-sync the record takes the GL balance; otherwise drift is
    /// assessed and recorded.
    pub fn after_post(&mut self, touched: &[AccountId], gl: GlView<'_>) -> Vec<SyncOutcome> {
        let mut bound: Vec<SubledgerId> = touched
            .iter()
            .filter_map(|account_id| self.bound_to(*account_id).map(|r| r.id))
            .collect();
        bound.sort_unstable();
        bound.dedup();

        let mut outcomes = Vec::with_capacity(bound.len());
        for subledger_id in bound {
            let outcome = if self.config.auto_sync_enabled {
                self.sync_from_gl(subledger_id, gl)
            } else {
                self.compare(subledger_id, gl)
            };
            match outcome {
                Ok(outcome) => outcomes.push(outcome),
                Err(err) => tracing::warn!(
                    subledger_id = %subledger_id,
                    error = %err,
                    "skipping sub-ledger after post"
                ),
            }
        }
        outcomes
    }

    /// Manually aligns a record to its GL balance and closes its incidents.
    pub fn reconcile(
        &mut self,
        subledger_id: SubledgerId,
        note: &str,
        gl: GlView<'_>,
    ) -> Result<ReconcileOutcome, LedgerError> {
        let gl_balance = self.gl_balance(subledger_id, gl)?;
        let previous_balance = self.get(subledger_id)?.balance;
        if let Some(record) = self.records.get_mut(&subledger_id) {
            record.balance = gl_balance;
        }

        let mut resolved_incidents = Vec::new();
        for incident in self
            .incidents
            .iter_mut()
            .filter(|i| i.subledger_id == subledger_id && i.is_open())
        {
            incident.resolve(note);
            resolved_incidents.push(incident.id);
        }

        tracing::info!(
            subledger_id = %subledger_id,
            previous = %previous_balance,
            reconciled = %gl_balance,
            resolved = resolved_incidents.len(),
            "sub-ledger reconciled"
        );

        Ok(ReconcileOutcome {
            subledger_id,
            previous_balance,
            reconciled_balance: gl_balance,
            resolved_incidents,
        })
    }

    /// Moves every live binding on `from` to `to`. Returns records moved.
    pub fn rebind(&mut self, from: AccountId, to: AccountId) -> u64 {
        let mut moved = 0;
        for record in self
            .records
            .values_mut()
            .filter(|r| !r.is_deleted() && r.account_id == Some(from))
        {
            record.account_id = Some(to);
            moved += 1;
        }
        for incident in self.incidents.iter_mut().filter(|i| i.account_id == from) {
            incident.account_id = to;
        }
        moved
    }

    fn check_binding(
        &self,
        subledger_id: SubledgerId,
        account_id: AccountId,
        chart: &ChartOfAccounts,
    ) -> Result<(), LedgerError> {
        let account = chart.live(account_id)?;
        if account.is_header {
            return Err(LedgerError::AccountIsHeader(account_id));
        }
        if let Some(existing) = self.bound_to(account_id).filter(|r| r.id != subledger_id) {
            return Err(LedgerError::AccountAlreadyBound {
                account_id,
                subledger_id: existing.id,
            });
        }
        Ok(())
    }

    fn gl_balance(&self, subledger_id: SubledgerId, gl: GlView<'_>) -> Result<Decimal, LedgerError> {
        let record = self.get(subledger_id)?;
        let account_id = record.account_id.ok_or_else(|| {
            LedgerError::InvalidAccount(format!("sub-ledger {} is not linked to an account", record.code))
        })?;
        gl.balance(account_id)
    }

    fn sync_from_gl(&mut self, subledger_id: SubledgerId, gl: GlView<'_>) -> Result<SyncOutcome, LedgerError> {
        let gl_balance = self.gl_balance(subledger_id, gl)?;
        let record = self
            .records
            .get_mut(&subledger_id)
            .ok_or(LedgerError::SubledgerNotFound(subledger_id))?;
        let previous = record.balance;
        if previous == gl_balance {
            return Ok(SyncOutcome::InSync { subledger_id });
        }
        record.balance = gl_balance;
        Ok(SyncOutcome::Synced {
            subledger_id,
            previous,
            current: gl_balance,
        })
    }

    fn compare(&mut self, subledger_id: SubledgerId, gl: GlView<'_>) -> Result<SyncOutcome, LedgerError> {
        let gl_balance = self.gl_balance(subledger_id, gl)?;
        let record = self.get(subledger_id)?;
        let (sub_balance, account_id) = (record.balance, record.account_id);
        let Some(account_id) = account_id else {
            return Err(LedgerError::Internal("linked record lost its account".into()));
        };

        let Some((difference, severity)) = self.config.assess(sub_balance, gl_balance) else {
            return Ok(SyncOutcome::InSync { subledger_id });
        };

        let incident_id = if let Some(open) = self
            .incidents
            .iter_mut()
            .find(|i| i.subledger_id == subledger_id && i.is_open())
        {
            open.refresh(sub_balance, gl_balance, difference, severity);
            open.id
        } else {
            let incident = DriftIncident::open(subledger_id, account_id, sub_balance, gl_balance, difference, severity);
            let id = incident.id;
            self.incidents.push(incident);
            id
        };

        tracing::warn!(
            subledger_id = %subledger_id,
            account_id = %account_id,
            subledger_balance = %sub_balance,
            gl_balance = %gl_balance,
            difference = %difference,
            severity = severity.as_str(),
            "sub-ledger drift recorded"
        );

        Ok(SyncOutcome::DriftRecorded {
            subledger_id,
            incident_id,
        })
    }
}
