//! `SeaORM` Entity for balance_incidents table.

use chrono::Utc;
use ledgerkeep_core::subledger::DriftIncident;
use sea_orm::ActiveValue::Set;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::StoreError;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "balance_incidents")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub subledger_id: Uuid,
    pub account_id: Uuid,
    #[sea_orm(column_type = "Decimal(Some((20, 2)))")]
    pub subledger_balance: Decimal,
    #[sea_orm(column_type = "Decimal(Some((20, 2)))")]
    pub gl_balance: Decimal,
    #[sea_orm(column_type = "Decimal(Some((20, 2)))")]
    pub difference: Decimal,
    pub severity: String,
    pub status: String,
    pub detected_at: DateTimeWithTimeZone,
    pub resolved_at: Option<DateTimeWithTimeZone>,
    pub resolution_note: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::cash_banks::Entity",
        from = "Column::SubledgerId",
        to = "super::cash_banks::Column::Id"
    )]
    CashBanks,
}

impl Related<super::cash_banks::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::CashBanks.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Maps the row to a domain incident.
    pub fn into_domain(self) -> Result<DriftIncident, StoreError> {
        let corrupt = |e: String| StoreError::corrupt("balance_incidents", e);
        Ok(DriftIncident {
            id: self.id.into(),
            subledger_id: self.subledger_id.into(),
            account_id: self.account_id.into(),
            subledger_balance: self.subledger_balance,
            gl_balance: self.gl_balance,
            difference: self.difference,
            severity: self.severity.parse().map_err(corrupt)?,
            status: self.status.parse().map_err(corrupt)?,
            detected_at: self.detected_at.with_timezone(&Utc),
            resolved_at: self.resolved_at.map(|t| t.with_timezone(&Utc)),
            resolution_note: self.resolution_note,
        })
    }
}

impl From<&DriftIncident> for ActiveModel {
    fn from(incident: &DriftIncident) -> Self {
        Self {
            id: Set(incident.id.into()),
            subledger_id: Set(incident.subledger_id.into()),
            account_id: Set(incident.account_id.into()),
            subledger_balance: Set(incident.subledger_balance),
            gl_balance: Set(incident.gl_balance),
            difference: Set(incident.difference),
            severity: Set(incident.severity.as_str().to_string()),
            status: Set(incident.status.as_str().to_string()),
            detected_at: Set(incident.detected_at.into()),
            resolved_at: Set(incident.resolved_at.map(Into::into)),
            resolution_note: Set(incident.resolution_note.clone()),
        }
    }
}
