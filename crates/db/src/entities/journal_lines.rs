//! `SeaORM` Entity for journal_lines table.

use ledgerkeep_core::ledger::JournalLine;
use ledgerkeep_shared::types::JournalEntryId;
use sea_orm::ActiveValue::Set;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::StoreError;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "journal_lines")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub journal_id: Uuid,
    pub account_id: Uuid,
    pub line_number: i32,
    #[sea_orm(column_type = "Decimal(Some((20, 2)))")]
    pub debit_amount: Decimal,
    #[sea_orm(column_type = "Decimal(Some((20, 2)))")]
    pub credit_amount: Decimal,
    pub memo: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::journal_entries::Entity",
        from = "Column::JournalId",
        to = "super::journal_entries::Column::Id"
    )]
    JournalEntries,
    #[sea_orm(
        belongs_to = "super::accounts::Entity",
        from = "Column::AccountId",
        to = "super::accounts::Column::Id"
    )]
    Accounts,
}

impl Related<super::journal_entries::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::JournalEntries.def()
    }
}

impl Related<super::accounts::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Accounts.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Maps the row to a domain line.
    pub fn into_domain(self) -> Result<JournalLine, StoreError> {
        Ok(JournalLine {
            id: self.id.into(),
            account_id: self.account_id.into(),
            line_number: u32::try_from(self.line_number).map_err(|_| {
                StoreError::corrupt("journal_lines", format!("line number {}", self.line_number))
            })?,
            debit_amount: self.debit_amount,
            credit_amount: self.credit_amount,
            memo: self.memo,
        })
    }

    /// Builds the row for one line of `journal_id`.
    #[must_use]
    pub fn active_for(journal_id: JournalEntryId, line: &JournalLine) -> ActiveModel {
        ActiveModel {
            id: Set(line.id.into()),
            journal_id: Set(journal_id.into()),
            account_id: Set(line.account_id.into()),
            line_number: Set(i32::try_from(line.line_number).unwrap_or(i32::MAX)),
            debit_amount: Set(line.debit_amount),
            credit_amount: Set(line.credit_amount),
            memo: Set(line.memo.clone()),
        }
    }
}
