//! Profiles and team roles.
//!
//! Role changes always re-read the caller's profile from the datastore instead of
//! trusting the role captured in the [`AuthContext`] at the start of the request.

use crate::{
    core::{policy::Operation, tenancy::AuthContext},
    entities::{Profile, Role, profile},
    errors::{Error, Result},
};
use sea_orm::{QueryOrder, Set, prelude::*};
use tracing::{info, warn};

/// Self-service profile fields set during onboarding.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileUpdate {
    /// Display name
    pub full_name: Option<String>,
    /// Job title
    pub title: Option<String>,
}

async fn count_admins<C>(db: &C) -> Result<u64>
where
    C: ConnectionTrait,
{
    Ok(Profile::find()
        .filter(profile::Column::Role.eq(Role::Admin))
        .count(db)
        .await?)
}

/// Changes the role of `target_user_id`. Admin only.
///
/// An admin may demote themselves, even when that leaves no admin at all; this is
/// logged as a warning.
///
/// # Errors
/// `Forbidden` unless the caller's stored role is admin, `NotFound` for unknown targets.
pub async fn update_user_role(
    db: &DatabaseConnection,
    ctx: &AuthContext,
    target_user_id: &str,
    new_role: Role,
) -> Result<profile::Model> {
    ctx.refreshed(db).await?.require_direct(Operation::ManageTeam)?;

    let target = Profile::find_by_id(target_user_id.to_string())
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("profile", target_user_id))?;
    let previous = target.role;

    let mut active: profile::ActiveModel = target.into();
    active.role = Set(new_role);
    let updated = active.update(db).await?;

    if previous == Role::Admin && new_role != Role::Admin && count_admins(db).await? == 0 {
        warn!(
            admin_id = %ctx.user_id(),
            target_user_id,
            "Last admin demoted, no admin remains"
        );
    }
    info!(admin_id = %ctx.user_id(), target_user_id, ?previous, ?new_role, "User role updated");
    Ok(updated)
}

/// Updates the caller's own display name and title. Never changes the role.
pub async fn update_profile(
    db: &DatabaseConnection,
    ctx: &AuthContext,
    update: ProfileUpdate,
) -> Result<profile::Model> {
    let tidy = |v: Option<String>| v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty());
    let mut active: profile::ActiveModel = ctx.profile().clone().into();
    active.full_name = Set(tidy(update.full_name));
    active.title = Set(tidy(update.title));
    let updated = active.update(db).await?;
    info!(user_id = %ctx.user_id(), "Profile updated");
    Ok(updated)
}

/// All profiles ordered by email. Admin only.
pub async fn list_team(db: &DatabaseConnection, ctx: &AuthContext) -> Result<Vec<profile::Model>> {
    ctx.require_direct(Operation::ManageTeam)?;
    Profile::find()
        .order_by_asc(profile::Column::Email)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Promotes `user_id` to admin if the installation has no admin yet.
///
/// Returns `true` when the promotion happened. The profile must exist, i.e. the
/// user must have signed in once.
pub async fn bootstrap_admin(db: &DatabaseConnection, user_id: &str) -> Result<bool> {
    if count_admins(db).await? > 0 {
        info!(user_id, "Admin already present, bootstrap skipped");
        return Ok(false);
    }
    let target = Profile::find_by_id(user_id.to_string())
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("profile", user_id))?;

    let mut active: profile::ActiveModel = target.into();
    active.role = Set(Role::Admin);
    active.update(db).await?;
    info!(user_id, "Bootstrapped first admin");
    Ok(true)
}
