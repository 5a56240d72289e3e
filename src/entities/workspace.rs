//! Workspace entity - the tenant boundary.
//!
//! Every client, product, invoice, expense and debt belongs to exactly one workspace.
//! A workspace is owned by a single identity; `owner_id` is unique so lazy
//! provisioning can be an idempotent upsert.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Workspace database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "workspaces")]
pub struct Model {
    /// Unique identifier for the workspace
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Identity id of the owner (one workspace per owner)
    #[sea_orm(unique)]
    pub owner_id: String,
    /// Business display name printed on invoices
    pub name: String,
    /// Street address
    pub address: Option<String>,
    /// City
    pub city: Option<String>,
    /// Country
    pub country: Option<String>,
    /// Tax identifier (ICE)
    pub tax_id: Option<String>,
    /// Blob store reference of the uploaded logo
    pub logo_url: Option<String>,
    /// Last invoice sequence number handed out
    pub invoice_sequence: i64,
    /// When the workspace was provisioned
    pub created_at: DateTimeUtc,
}

/// Defines relationships between Workspace and the ledger records it owns
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One workspace has many clients
    #[sea_orm(has_many = "super::client::Entity")]
    Clients,
    /// One workspace has many products
    #[sea_orm(has_many = "super::product::Entity")]
    Products,
    /// One workspace has many invoices
    #[sea_orm(has_many = "super::invoice::Entity")]
    Invoices,
    /// One workspace has many expenses
    #[sea_orm(has_many = "super::expense::Entity")]
    Expenses,
    /// One workspace has many debts
    #[sea_orm(has_many = "super::debt::Entity")]
    Debts,
}

impl Related<super::client::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Clients.def()
    }
}

impl Related<super::product::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Products.def()
    }
}

impl Related<super::invoice::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Invoices.def()
    }
}

impl Related<super::expense::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Expenses.def()
    }
}

impl Related<super::debt::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Debts.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
