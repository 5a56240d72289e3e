//! Expense entity - a cash outflow. Append-only in normal operation.
//!
//! The reserved category [`DEBT_CATEGORY`] marks rows written by debt installments.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Category of expenses recorded by debt installment payments
pub const DEBT_CATEGORY: &str = "Dette";

/// Expense database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "expenses")]
pub struct Model {
    /// Unique identifier for the expense
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Owning workspace
    pub workspace_id: i64,
    /// Amount spent (> 0)
    pub amount: f64,
    /// What the money was spent on
    pub description: String,
    /// Free-text category; None is reported as "Autre"
    pub category: Option<String>,
    /// Blob store reference of the receipt scan
    pub receipt_url: Option<String>,
    /// When the expense was recorded
    pub date: DateTimeUtc,
}

/// Defines relationships between Expense and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each expense belongs to one workspace
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
