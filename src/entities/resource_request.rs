//! Resource request entity - a client or product proposed by a non-admin.
//!
//! The proposed fields are stored as a typed, tagged JSON payload; `kind`
//! duplicates the tag so pending requests can be filtered without decoding.

use sea_orm::FromJsonQueryResult;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Kind of record a request proposes.
#[derive(
    Copy, Clone, Debug, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
#[serde(rename_all = "lowercase")]
pub enum RequestKind {
    /// Proposes a new client
    #[sea_orm(string_value = "client")]
    Client,
    /// Proposes a new product
    #[sea_orm(string_value = "product")]
    Product,
}

/// Lifecycle of a request.
#[derive(
    Copy, Clone, Debug, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    /// Awaiting an admin decision
    #[sea_orm(string_value = "pending")]
    Pending,
    /// Materialized into a real record
    #[sea_orm(string_value = "approved")]
    Approved,
    /// Discarded by an admin
    #[sea_orm(string_value = "rejected")]
    Rejected,
}

/// Field values of a proposed client.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientProposal {
    /// Company or person name
    pub name: String,
    /// Billing email
    pub email: Option<String>,
    /// Phone number
    pub phone: Option<String>,
    /// Postal address
    pub address: Option<String>,
    /// Tax identifier (ICE)
    pub ice: Option<String>,
}

/// Field values of a proposed product.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ProductProposal {
    /// Product name
    pub name: String,
    /// Price per unit
    pub price: f64,
    /// Unit label
    pub unit: Option<String>,
    /// Optional description
    pub description: Option<String>,
}

/// Typed payload of a request, tagged by kind.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, FromJsonQueryResult)]
#[serde(tag = "type", content = "details", rename_all = "lowercase")]
pub enum ResourceProposal {
    /// A client to create
    Client(ClientProposal),
    /// A product to create
    Product(ProductProposal),
}

impl ResourceProposal {
    /// The kind tag matching this payload.
    #[must_use]
    pub const fn kind(&self) -> RequestKind {
        match self {
            Self::Client(_) => RequestKind::Client,
            Self::Product(_) => RequestKind::Product,
        }
    }
}

/// Resource request database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "resource_requests")]
pub struct Model {
    /// Unique identifier for the request
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Identity id of the editor who proposed it
    pub user_id: String,
    /// Kind of record proposed
    pub kind: RequestKind,
    /// Proposed field values
    #[sea_orm(column_type = "Json")]
    pub details: ResourceProposal,
    /// Current status
    pub status: RequestStatus,
    /// Admin who approved or rejected it
    pub resolved_by: Option<String>,
    /// When the request was submitted
    pub created_at: DateTimeUtc,
    /// When the request was resolved
    pub resolved_at: Option<DateTimeUtc>,
}

/// `ResourceRequest` references identities, not rows
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
