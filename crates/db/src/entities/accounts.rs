//! `SeaORM` Entity for accounts table.

use chrono::Utc;
use ledgerkeep_core::chart::Account;
use sea_orm::ActiveValue::Set;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::StoreError;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "accounts")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub code: String,
    pub name: String,
    pub description: Option<String>,
    pub account_type: String,
    pub category: String,
    pub parent_id: Option<Uuid>,
    pub level: i32,
    pub is_header: bool,
    #[sea_orm(column_type = "Decimal(Some((20, 2)))")]
    pub balance: Decimal,
    pub is_active: bool,
    pub is_system_critical: bool,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
    pub deleted_at: Option<DateTimeWithTimeZone>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "Entity",
        from = "Column::ParentId",
        to = "Column::Id"
    )]
    Parent,
    #[sea_orm(has_many = "super::journal_lines::Entity")]
    JournalLines,
    #[sea_orm(has_many = "super::cash_banks::Entity")]
    CashBanks,
}

impl Related<super::journal_lines::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::JournalLines.def()
    }
}

impl Related<super::cash_banks::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::CashBanks.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Maps the row to a domain account.
    pub fn into_domain(self) -> Result<Account, StoreError> {
        Ok(Account {
            id: self.id.into(),
            account_type: self
                .account_type
                .parse()
                .map_err(|e: String| StoreError::corrupt("accounts", e))?,
            level: u32::try_from(self.level)
                .map_err(|_| StoreError::corrupt("accounts", format!("negative level {}", self.level)))?,
            code: self.code,
            name: self.name,
            description: self.description,
            category: self.category,
            parent_id: self.parent_id.map(Into::into),
            is_header: self.is_header,
            balance: self.balance,
            is_active: self.is_active,
            is_system_critical: self.is_system_critical,
            created_at: self.created_at.with_timezone(&Utc),
            updated_at: self.updated_at.with_timezone(&Utc),
            deleted_at: self.deleted_at.map(|t| t.with_timezone(&Utc)),
        })
    }
}

impl From<&Account> for ActiveModel {
    fn from(account: &Account) -> Self {
        Self {
            id: Set(account.id.into()),
            code: Set(account.code.clone()),
            name: Set(account.name.clone()),
            description: Set(account.description.clone()),
            account_type: Set(account.account_type.as_str().to_string()),
            category: Set(account.category.clone()),
            parent_id: Set(account.parent_id.map(Into::into)),
            level: Set(i32::try_from(account.level).unwrap_or(i32::MAX)),
            is_header: Set(account.is_header),
            balance: Set(account.balance),
            is_active: Set(account.is_active),
            is_system_critical: Set(account.is_system_critical),
            created_at: Set(account.created_at.into()),
            updated_at: Set(account.updated_at.into()),
            deleted_at: Set(account.deleted_at.map(Into::into)),
        }
    }
}
