//! Profile entity - one row per authenticated identity, carrying the role.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Team role. New identities start as `Pending` until an admin promotes them.
#[derive(
    Copy, Clone, Debug, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Signed in but not yet admitted
    #[sea_orm(string_value = "pending")]
    Pending,
    /// Read-only access
    #[sea_orm(string_value = "viewer")]
    Viewer,
    /// Can bill and record expenses; proposes clients/products
    #[sea_orm(string_value = "editor")]
    Editor,
    /// Full access including team management
    #[sea_orm(string_value = "admin")]
    Admin,
}

/// Profile database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "profiles")]
pub struct Model {
    /// Identity id from the session provider
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    /// Email of the identity
    pub email: String,
    /// Name shown in the sidebar, set during onboarding
    pub full_name: Option<String>,
    /// Free-text job title, set during onboarding
    pub title: Option<String>,
    /// Access role
    pub role: Role,
    /// First sign-in
    pub created_at: DateTimeUtc,
}

/// `Profile` has no foreign-key relationships
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
