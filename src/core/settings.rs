//! Workspace and email settings.
//!
//! Saving workspace settings is the explicit way to provision a workspace; the other
//! path is the lazy provisioning on the first financial write. Email settings hold
//! relay credentials and are therefore restricted to admins.

use crate::{
    config::AppConfig,
    core::{
        Recorded,
        policy::Operation,
        storage::{self, BlobStore, Upload},
        tenancy::{self, AuthContext},
    },
    entities::{EmailSettings, email_settings, workspace},
    errors::{Error, Result},
};
use sea_orm::{Set, TransactionTrait, TryIntoModel, prelude::*};
use tracing::{info, warn};

/// Business details printed on invoices.
#[derive(Debug, Clone, Default)]
pub struct WorkspaceSettings {
    /// Business name
    pub name: String,
    /// Street address
    pub address: Option<String>,
    /// City
    pub city: Option<String>,
    /// Country
    pub country: Option<String>,
    /// Tax identifier (ICE)
    pub tax_id: Option<String>,
    /// New logo, None keeps the current one
    pub logo: Option<Upload>,
}

/// SMTP relay credentials.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailSettingsInput {
    /// Relay host
    pub smtp_host: String,
    /// Relay port
    pub smtp_port: u16,
    /// Login, also the sender address
    pub smtp_user: String,
    /// Password
    pub smtp_password: String,
    /// Sender display name
    pub sender_name: Option<String>,
}

fn tidy(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// The caller's workspace, if they own one. Pending members may read it too.
pub async fn get_workspace(
    db: &DatabaseConnection,
    ctx: &AuthContext,
) -> Result<Option<workspace::Model>> {
    tenancy::find_workspace(db, ctx.user_id()).await
}

/// Saves the business details of the caller's workspace, creating it if needed.
///
/// A logo that fails to upload keeps the previous logo and is reported as a warning.
pub async fn save_workspace_settings(
    db: &DatabaseConnection,
    ctx: &AuthContext,
    config: &AppConfig,
    input: WorkspaceSettings,
    store: &dyn BlobStore,
) -> Result<Recorded<workspace::Model>> {
    ctx.require_direct(Operation::ManageWorkspace)?;
    let name = input.name.trim().to_string();
    if name.is_empty() {
        return Err(Error::validation("name", "workspace name cannot be empty"));
    }

    let current = tenancy::ensure_workspace(db, ctx.user_id(), &config.workspace).await?;
    let mut warnings = Vec::new();
    let mut logo_url = current.logo_url.clone();
    if let Some(logo) = input.logo.filter(|l| !l.is_empty()) {
        let key = storage::object_key(&format!("{}-", current.id), &logo.file_name);
        match store.upload(&config.storage.logos_bucket, &key, &logo.bytes).await {
            Ok(url) => logo_url = Some(url),
            Err(e) => {
                warn!(workspace_id = current.id, error = %e, "Logo upload failed, keeping previous logo");
                warnings.push(format!("Logo could not be uploaded: {e}"));
            }
        }
    }

    let workspace_id = current.id;
    let mut active: workspace::ActiveModel = current.into();
    active.name = Set(name);
    active.address = Set(tidy(input.address));
    active.city = Set(tidy(input.city));
    active.country = Set(tidy(input.country));
    active.tax_id = Set(tidy(input.tax_id));
    active.logo_url = Set(logo_url);
    let record = active.update(db).await?;

    info!(workspace_id, "Workspace settings saved");
    Ok(Recorded { record, warnings })
}

/// Stores the relay credentials of the caller's workspace. Admin only.
pub async fn save_email_settings(
    db: &DatabaseConnection,
    ctx: &AuthContext,
    config: &AppConfig,
    input: EmailSettingsInput,
) -> Result<email_settings::Model> {
    ctx.require_direct(Operation::ManageEmailSettings)?;
    let smtp_host = input.smtp_host.trim().to_string();
    if smtp_host.is_empty() {
        return Err(Error::validation("smtp_host", "relay host cannot be empty"));
    }
    let smtp_user = input.smtp_user.trim().to_string();
    if smtp_user.is_empty() {
        return Err(Error::validation("smtp_user", "relay login cannot be empty"));
    }
    if input.smtp_port == 0 {
        return Err(Error::validation("smtp_port", "port cannot be 0"));
    }

    let txn = db.begin().await?;
    let workspace = tenancy::ensure_workspace(&txn, ctx.user_id(), &config.workspace).await?;
    let existing = EmailSettings::find()
        .filter(email_settings::Column::WorkspaceId.eq(workspace.id))
        .one(&txn)
        .await?;
    let mut active = match existing {
        Some(row) => row.into(),
        None => email_settings::ActiveModel {
            workspace_id: Set(workspace.id),
            ..Default::default()
        },
    };
    active.smtp_host = Set(smtp_host);
    active.smtp_port = Set(i32::from(input.smtp_port));
    active.smtp_user = Set(smtp_user);
    active.smtp_password = Set(input.smtp_password);
    active.sender_name = Set(tidy(input.sender_name));
    active.updated_at = Set(chrono::Utc::now());
    let saved = active.save(&txn).await?.try_into_model()?;
    txn.commit().await?;

    info!(workspace_id = workspace.id, "Email settings saved");
    Ok(saved)
}

/// Relay credentials of the caller's workspace. Admin only.
pub async fn get_email_settings(
    db: &DatabaseConnection,
    ctx: &AuthContext,
) -> Result<Option<email_settings::Model>> {
    ctx.require_direct(Operation::ManageEmailSettings)?;
    let Some(workspace) = tenancy::find_workspace(db, ctx.user_id()).await? else {
        return Ok(None);
    };
    EmailSettings::find()
        .filter(email_settings::Column::WorkspaceId.eq(workspace.id))
        .one(db)
        .await
        .map_err(Into::into)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::entities::{Role, Workspace};
    use crate::test_utils::*;

    fn business(name: &str) -> WorkspaceSettings {
        WorkspaceSettings {
            name: name.to_string(),
            city: Some("Casablanca".to_string()),
            tax_id: Some("001234567000089".to_string()),
            ..Default::default()
        }
    }

    fn logo() -> Upload {
        Upload {
            file_name: "logo.png".to_string(),
            bytes: vec![0x89, 0x50],
        }
    }

    #[tokio::test]
    async fn test_settings_save_provisions_workspace() -> Result<()> {
        let db = setup_test_db().await?;
        let editor = context_with_role(&db, "editor", Role::Editor).await?;
        let store = MemoryBlobStore::default();
        let mut input = business("Atelier Nord");
        input.logo = Some(logo());

        let saved =
            save_workspace_settings(&db, &editor, &AppConfig::default(), input, &store).await?;

        assert!(saved.warnings.is_empty());
        assert_eq!(saved.record.name, "Atelier Nord");
        assert!(saved.record.logo_url.unwrap().starts_with("memory://logos/"));
        assert_eq!(Workspace::find().count(&db).await?, 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_failed_logo_keeps_previous() -> Result<()> {
        let db = setup_test_db().await?;
        let (admin, _) = admin_with_workspace(&db, "admin").await?;
        let config = AppConfig::default();
        let mut first = business("Atelier Nord");
        first.logo = Some(logo());
        let before = save_workspace_settings(&db, &admin, &config, first, &MemoryBlobStore::default())
            .await?
            .record;

        let mut second = business("Atelier Sud");
        second.logo = Some(logo());
        let after = save_workspace_settings(&db, &admin, &config, second, &FailingBlobStore).await?;

        assert_eq!(after.warnings.len(), 1);
        assert_eq!(after.record.name, "Atelier Sud");
        assert_eq!(after.record.logo_url, before.logo_url);
        Ok(())
    }

    #[tokio::test]
    async fn test_email_settings_upsert_and_admin_only() -> Result<()> {
        let db = setup_test_db().await?;
        let (admin, _) = admin_with_workspace(&db, "admin").await?;
        let editor = context_with_role(&db, "editor", Role::Editor).await?;
        let config = AppConfig::default();
        let mut input = EmailSettingsInput {
            smtp_host: "smtp.example.com".to_string(),
            smtp_port: 587,
            smtp_user: "billing@example.com".to_string(),
            smtp_password: "one".to_string(),
            sender_name: None,
        };

        let first = save_email_settings(&db, &admin, &config, input.clone()).await?;
        input.smtp_password = "two".to_string();
        let second = save_email_settings(&db, &admin, &config, input.clone()).await?;

        assert_eq!(first.id, second.id);
        assert_eq!(EmailSettings::find().count(&db).await?, 1);
        assert_eq!(
            get_email_settings(&db, &admin).await?.unwrap().smtp_password,
            "two"
        );
        assert!(matches!(
            save_email_settings(&db, &editor, &config, input).await,
            Err(Error::Forbidden { .. })
        ));
        assert!(matches!(
            get_email_settings(&db, &editor).await,
            Err(Error::Forbidden { .. })
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_viewer_cannot_save_workspace() -> Result<()> {
        let db = setup_test_db().await?;
        let viewer = context_with_role(&db, "viewer", Role::Viewer).await?;
        let result = save_workspace_settings(
            &db,
            &viewer,
            &AppConfig::default(),
            business("X"),
            &MemoryBlobStore::default(),
        )
        .await;
        assert!(matches!(result, Err(Error::Forbidden { .. })));
        assert!(get_workspace(&db, &viewer).await?.is_none());
        Ok(())
    }
}
