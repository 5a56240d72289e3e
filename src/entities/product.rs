//! Product entity - a billable product or service with a unit price.
//!
//! Products are pricing templates: invoice items copy the name and price at the
//! moment of use, so later edits never rewrite issued invoices.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Product database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "products")]
pub struct Model {
    /// Unique identifier for the product
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Owning workspace
    pub workspace_id: i64,
    /// Name of the product (e.g., "Website audit")
    pub name: String,
    /// Price per unit
    pub price: f64,
    /// Unit label (e.g., "hour", "page")
    pub unit: Option<String>,
    /// Optional longer description
    pub description: Option<String>,
    /// When the product was created
    pub created_at: DateTimeUtc,
}

/// Defines relationships between Product and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each product belongs to one workspace
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
