//! Invoice item entity - one line of an invoice.
//!
//! `product_id` only records which template priced the line; it is not a live
//! reference and carries no foreign key.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Invoice item database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "invoice_items")]
pub struct Model {
    /// Unique identifier for the line
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Owning invoice
    pub invoice_id: i64,
    /// Product used as pricing template, None for ad-hoc lines
    pub product_id: Option<i64>,
    /// Line description
    pub description: String,
    /// Quantity (> 0)
    pub quantity: f64,
    /// Price per unit (>= 0)
    pub unit_price: f64,
    /// `quantity * unit_price`, computed server-side
    pub total_price: f64,
}

/// Defines relationships between `InvoiceItem` and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each item belongs to one invoice and is removed with it
    #[sea_orm(
        belongs_to = "super::invoice::Entity",
        from = "Column::InvoiceId",
        to = "super::invoice::Column::Id",
        on_delete = "Cascade"
    )]
    Invoice,
}

impl Related<super::invoice::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Invoice.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
