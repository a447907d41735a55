//! Chart of accounts domain types.

use chrono::{DateTime, Utc};
use ledgerkeep_shared::types::AccountId;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::ledger::NormalBalance;

/// Account type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AccountType {
    /// Resources owned.
    Asset,
    /// Obligations owed.
    Liability,
    /// Owner's interest.
    Equity,
    /// Income earned.
    Revenue,
    /// Costs incurred.
    Expense,
}

impl AccountType {
    /// All account types.
    pub const ALL: [Self; 5] = [
        Self::Asset,
        Self::Liability,
        Self::Equity,
        Self::Revenue,
        Self::Expense,
    ];

    /// Returns the side on which this type carries its balance.
    #[must_use]
    pub const fn normal_balance(self) -> NormalBalance {
        match self {
            Self::Asset | Self::Expense => NormalBalance::Debit,
            Self::Liability | Self::Equity | Self::Revenue => NormalBalance::Credit,
        }
    }

    /// Returns the type as stored in the database.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Asset => "ASSET",
            Self::Liability => "LIABILITY",
            Self::Equity => "EQUITY",
            Self::Revenue => "REVENUE",
            Self::Expense => "EXPENSE",
        }
    }
}

impl std::fmt::Display for AccountType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for AccountType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "ASSET" => Ok(Self::Asset),
            "LIABILITY" => Ok(Self::Liability),
            "EQUITY" => Ok(Self::Equity),
            "REVENUE" => Ok(Self::Revenue),
            "EXPENSE" => Ok(Self::Expense),
            _ => Err(format!("Unknown account type: {s}")),
        }
    }
}

/// Normalizes an account code for comparison: trimmed and lower-cased.
#[must_use]
pub fn normalize_code(code: &str) -> String {
    code.trim().to_lowercase()
}

/// A chart of accounts entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// Stable identifier.
    pub id: AccountId,
    /// Code, stored trimmed. Unique case-insensitively among live accounts.
    pub code: String,
    /// Display name.
    pub name: String,
    /// Optional description.
    pub description: Option<String>,
    /// Account type.
    pub account_type: AccountType,
    /// Informational category (e.g. "CURRENT_ASSET").
    pub category: String,
    /// Parent account.
    pub parent_id: Option<AccountId>,
    /// Depth in the tree, 1 for roots.
    pub level: u32,
    /// Header accounts aggregate children and never receive lines.
    pub is_header: bool,
    /// Current balance on the account's normal side.
    pub balance: Decimal,
    /// Inactive accounts cannot receive postings.
    pub is_active: bool,
    /// Critical accounts have locked code, type, category and status.
    pub is_system_critical: bool,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last modification time.
    pub updated_at: DateTime<Utc>,
    /// Soft-delete marker.
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Account {
    /// Returns true if the account has been soft-deleted.
    #[must_use]
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    /// Returns the normalized code.
    #[must_use]
    pub fn normalized_code(&self) -> String {
        normalize_code(&self.code)
    }

    /// Returns the side on which this account carries its balance.
    #[must_use]
    pub fn normal_balance(&self) -> NormalBalance {
        self.account_type.normal_balance()
    }
}

/// Input for creating an account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewAccount {
    /// Code.
    pub code: String,
    /// Name.
    pub name: String,
    /// Optional description.
    pub description: Option<String>,
    /// Account type.
    pub account_type: AccountType,
    /// Category. Defaults to the type name.
    pub category: String,
    /// Code of the parent account.
    pub parent_code: Option<String>,
    /// Whether the new account is a header.
    pub is_header: bool,
    /// Whether the new account is system critical.
    pub is_system_critical: bool,
}

impl NewAccount {
    /// Creates a leaf account input.
    #[must_use]
    pub fn new(code: impl Into<String>, name: impl Into<String>, account_type: AccountType) -> Self {
        Self {
            code: code.into(),
            name: name.into(),
            description: None,
            account_type,
            category: account_type.as_str().to_string(),
            parent_code: None,
            is_header: false,
            is_system_critical: false,
        }
    }

    /// Places the account under the account with `parent_code`.
    #[must_use]
    pub fn under(mut self, parent_code: impl Into<String>) -> Self {
        self.parent_code = Some(parent_code.into());
        self
    }

    /// Sets the category.
    #[must_use]
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    /// Marks the account as a header.
    #[must_use]
    pub fn header(mut self) -> Self {
        self.is_header = true;
        self
    }

    /// Marks the account as system critical.
    #[must_use]
    pub fn critical(mut self) -> Self {
        self.is_system_critical = true;
        self
    }
}

/// Partial update of an account. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountPatch {
    /// New code.
    pub code: Option<String>,
    /// New name.
    pub name: Option<String>,
    /// New description (`Some(None)` clears it).
    pub description: Option<Option<String>>,
    /// New type.
    pub account_type: Option<AccountType>,
    /// New category.
    pub category: Option<String>,
    /// New header flag.
    pub is_header: Option<bool>,
    /// New active flag.
    pub is_active: Option<bool>,
    /// New parent (`Some(None)` makes the account a root).
    pub parent_id: Option<Option<AccountId>>,
}
