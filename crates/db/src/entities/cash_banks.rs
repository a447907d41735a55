//! `SeaORM` Entity for cash_banks table.

use chrono::Utc;
use ledgerkeep_core::subledger::SubledgerAccount;
use sea_orm::ActiveValue::Set;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::StoreError;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "cash_banks")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub code: String,
    pub name: String,
    pub kind: String,
    pub account_id: Option<Uuid>,
    #[sea_orm(column_type = "Decimal(Some((20, 2)))")]
    pub balance: Decimal,
    pub is_active: bool,
    pub created_at: DateTimeWithTimeZone,
    pub deleted_at: Option<DateTimeWithTimeZone>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::accounts::Entity",
        from = "Column::AccountId",
        to = "super::accounts::Column::Id"
    )]
    Accounts,
}

impl Related<super::accounts::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Accounts.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Maps the row to a domain record.
    pub fn into_domain(self) -> Result<SubledgerAccount, StoreError> {
        Ok(SubledgerAccount {
            id: self.id.into(),
            kind: self
                .kind
                .parse()
                .map_err(|e: String| StoreError::corrupt("cash_banks", e))?,
            code: self.code,
            name: self.name,
            account_id: self.account_id.map(Into::into),
            balance: self.balance,
            is_active: self.is_active,
            created_at: self.created_at.with_timezone(&Utc),
            deleted_at: self.deleted_at.map(|t| t.with_timezone(&Utc)),
        })
    }
}

impl From<&SubledgerAccount> for ActiveModel {
    fn from(record: &SubledgerAccount) -> Self {
        Self {
            id: Set(record.id.into()),
            code: Set(record.code.clone()),
            name: Set(record.name.clone()),
            kind: Set(record.kind.as_str().to_string()),
            account_id: Set(record.account_id.map(Into::into)),
            balance: Set(record.balance),
            is_active: Set(record.is_active),
            created_at: Set(record.created_at.into()),
            deleted_at: Set(record.deleted_at.map(Into::into)),
        }
    }
}
