//! `SeaORM` Entity for journal_entries table.

use chrono::Utc;
use ledgerkeep_core::ledger::{JournalEntry, JournalLine};
use sea_orm::ActiveValue::Set;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::StoreError;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "journal_entries")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub entry_number: String,
    pub source_type: String,
    pub source_id: Option<String>,
    pub entry_date: Date,
    pub description: String,
    pub status: String,
    #[sea_orm(column_type = "Decimal(Some((20, 2)))")]
    pub total_debit: Decimal,
    #[sea_orm(column_type = "Decimal(Some((20, 2)))")]
    pub total_credit: Decimal,
    pub posted_at: Option<DateTimeWithTimeZone>,
    pub reversed_from: Option<Uuid>,
    pub reversed_by: Option<Uuid>,
    pub reversal_reason: Option<String>,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::journal_lines::Entity")]
    JournalLines,
}

impl Related<super::journal_lines::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::JournalLines.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Maps the row and its lines to a domain entry.
    pub fn into_domain(self, lines: Vec<JournalLine>) -> Result<JournalEntry, StoreError> {
        Ok(JournalEntry {
            id: self.id.into(),
            status: self
                .status
                .parse()
                .map_err(|e: String| StoreError::corrupt("journal_entries", e))?,
            entry_number: self.entry_number,
            source_type: self.source_type,
            source_id: self.source_id,
            entry_date: self.entry_date,
            description: self.description,
            total_debit: self.total_debit,
            total_credit: self.total_credit,
            posted_at: self.posted_at.map(|t| t.with_timezone(&Utc)),
            reversed_from: self.reversed_from.map(Into::into),
            reversed_by: self.reversed_by.map(Into::into),
            reversal_reason: self.reversal_reason,
            created_at: self.created_at.with_timezone(&Utc),
            lines,
        })
    }
}

impl From<&JournalEntry> for ActiveModel {
    fn from(entry: &JournalEntry) -> Self {
        Self {
            id: Set(entry.id.into()),
            entry_number: Set(entry.entry_number.clone()),
            source_type: Set(entry.source_type.clone()),
            source_id: Set(entry.source_id.clone()),
            entry_date: Set(entry.entry_date),
            description: Set(entry.description.clone()),
            status: Set(entry.status.as_str().to_string()),
            total_debit: Set(entry.total_debit),
            total_credit: Set(entry.total_credit),
            posted_at: Set(entry.posted_at.map(Into::into)),
            reversed_from: Set(entry.reversed_from.map(Into::into)),
            reversed_by: Set(entry.reversed_by.map(Into::into)),
            reversal_reason: Set(entry.reversal_reason.clone()),
            created_at: Set(entry.created_at.into()),
        }
    }
}
