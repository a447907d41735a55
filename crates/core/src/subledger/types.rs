//! Cash and bank sub-ledger records.

use chrono::{DateTime, Utc};
use ledgerkeep_shared::types::{AccountId, SubledgerId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Kind of sub-ledger record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SubledgerKind {
    /// Petty cash or till.
    Cash,
    /// Bank account.
    Bank,
}

impl SubledgerKind {
    /// Returns the kind as stored in the database.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Cash => "CASH",
            Self::Bank => "BANK",
        }
    }
}

impl std::str::FromStr for SubledgerKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "CASH" => Ok(Self::Cash),
            "BANK" => Ok(Self::Bank),
            _ => Err(format!("Unknown sub-ledger kind: {s}")),
        }
    }
}

/// A cash or bank record that reconciles with one GL control account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubledgerAccount {
    /// Record ID.
    pub id: SubledgerId,
    /// Record code.
    pub code: String,
    /// Display name.
    pub name: String,
    /// Cash or bank.
    pub kind: SubledgerKind,
    /// Backing GL account. Legacy rows may be unlinked.
    pub account_id: Option<AccountId>,
    /// Balance as tracked by the sub-ledger.
    pub balance: Decimal,
    /// Whether the record is in use.
    pub is_active: bool,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Soft-delete marker.
    pub deleted_at: Option<DateTime<Utc>>,
}

impl SubledgerAccount {
    /// Returns true if the record has been soft-deleted.
    #[must_use]
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

/// Input for registering a sub-ledger record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewSubledger {
    /// Record code.
    pub code: String,
    /// Display name.
    pub name: String,
    /// Cash or bank.
    pub kind: SubledgerKind,
    /// Backing GL account, if already known.
    pub account_id: Option<AccountId>,
    /// Opening balance.
    pub opening_balance: Decimal,
}

impl NewSubledger {
    /// Creates an unlinked record input with a zero opening balance.
    #[must_use]
    pub fn new(code: impl Into<String>, name: impl Into<String>, kind: SubledgerKind) -> Self {
        Self {
            code: code.into(),
            name: name.into(),
            kind,
            account_id: None,
            opening_balance: Decimal::ZERO,
        }
    }

    /// Binds the record to a GL account.
    #[must_use]
    pub fn bound_to(mut self, account_id: AccountId) -> Self {
        self.account_id = Some(account_id);
        self
    }

    /// Sets the opening balance.
    #[must_use]
    pub fn with_balance(mut self, balance: Decimal) -> Self {
        self.opening_balance = balance;
        self
    }
}
