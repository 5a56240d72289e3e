//! Email settings entity - SMTP credentials configured by a workspace admin.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Email settings database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "email_settings")]
pub struct Model {
    /// Unique identifier
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Workspace these credentials send for
    #[sea_orm(unique)]
    pub workspace_id: i64,
    /// SMTP relay host
    pub smtp_host: String,
    /// SMTP relay port (465 means implicit TLS)
    pub smtp_port: i32,
    /// SMTP login, also used as the sender address
    pub smtp_user: String,
    /// SMTP password
    pub smtp_password: String,
    /// Display name of the sender
    pub sender_name: Option<String>,
    /// When the settings were last saved
    pub updated_at: DateTimeUtc,
}

/// Defines relationships between `EmailSettings` and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each settings row belongs to one workspace
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
