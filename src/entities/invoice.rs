//! Invoice entity - the header of a bill sent to a client.
//!
//! `total_amount` is computed from the line items when the invoice is created
//! (`subtotal + tax_amount`) and is never re-derived afterwards.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Invoice status. Transitions are externally triggered and not terminal.
#[derive(
    Copy, Clone, Debug, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
pub enum InvoiceStatus {
    /// Being prepared
    #[sea_orm(string_value = "Draft")]
    Draft,
    /// Sent, awaiting payment
    #[sea_orm(string_value = "Pending")]
    Pending,
    /// Payment received
    #[sea_orm(string_value = "Paid")]
    Paid,
}

/// Invoice database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "invoices")]
pub struct Model {
    /// Unique identifier for the invoice
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Owning workspace
    pub workspace_id: i64,
    /// Billed client
    pub client_id: i64,
    /// Human-readable number, unique per workspace (e.g. `INV-2026-0007`)
    pub invoice_number: String,
    /// Current status
    pub status: InvoiceStatus,
    /// Payment due date
    pub due_date: Date,
    /// Sum of the line totals
    pub subtotal: f64,
    /// Tax rate applied to the subtotal (0.20 = 20 %)
    pub tax_rate: f64,
    /// `subtotal * tax_rate`
    pub tax_amount: f64,
    /// Amount due
    pub total_amount: f64,
    /// When the invoice was issued
    pub created_at: DateTimeUtc,
}

/// Defines relationships between Invoice and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each invoice belongs to one workspace
    #[sea_orm(
        belongs_to = "super::workspace::Entity",
        from = "Column::WorkspaceId",
        to = "super::workspace::Column::Id"
    )]
    Workspace,
    /// Each invoice bills one client
    #[sea_orm(
        belongs_to = "super::client::Entity",
        from = "Column::ClientId",
        to = "super::client::Column::Id"
    )]
    Client,
    /// One invoice owns many line items
    #[sea_orm(has_many = "super::invoice_item::Entity")]
    Items,
}

impl Related<super::workspace::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Workspace.def()
    }
}

impl Related<super::client::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Client.def()
    }
}

impl Related<super::invoice_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Items.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
