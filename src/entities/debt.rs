//! Debt entity - money owed to a creditor, repaid in installments.
//!
//! `remaining_amount` starts equal to `total_amount` and is only ever moved by
//! atomic deltas; `status` is `Paid` exactly when `remaining_amount <= 0`.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Debt status, derived from the remaining amount after each payment.
#[derive(
    Copy, Clone, Debug, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
pub enum DebtStatus {
    /// Still being repaid
    #[sea_orm(string_value = "Active")]
    Active,
    /// Fully repaid (or overpaid)
    #[sea_orm(string_value = "Paid")]
    Paid,
}

impl DebtStatus {
    /// Status implied by a remaining amount.
    #[must_use]
    pub fn for_remaining(remaining: f64) -> Self {
        if remaining <= 0.0 { Self::Paid } else { Self::Active }
    }
}

/// Debt database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "debts")]
pub struct Model {
    /// Unique identifier for the debt
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Owning workspace
    pub workspace_id: i64,
    /// Who the money is owed to
    pub creditor_name: String,
    /// Original amount borrowed
    pub total_amount: f64,
    /// Amount still owed; negative means overpaid
    pub remaining_amount: f64,
    /// Agreed monthly installment
    pub monthly_payment: f64,
    /// Final due date
    pub due_date: Date,
    /// Current status
    pub status: DebtStatus,
    /// When the debt was recorded
    pub created_at: DateTimeUtc,
}

/// Defines relationships between Debt and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each debt belongs to one workspace
    #[sea_orm(
        belongs_to = "super::workspace::Entity",
        from = "Column::WorkspaceId",
        to = "super::workspace::Column::Id"
    )]
    Workspace,
}

impl Related<super::workspace::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Workspace.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
