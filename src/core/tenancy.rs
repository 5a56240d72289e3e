//! Tenancy guard - resolves who is acting and which workspace they act in.
//!
//! An [`AuthContext`] is built per request from the identity provider and the
//! profile row read from the datastore, never from client-side state. Every core
//! entry point takes one and checks the role policy before touching any row.

use crate::{
    config::WorkspaceDefaults,
    core::policy::{self, Decision, Operation},
    entities::{Profile, Role, Workspace, profile, workspace},
    errors::{Error, Result},
};
use sea_orm::{Set, prelude::*, sea_query::OnConflict};
use tracing::{debug, info, warn};

/// Identity handed over by the session provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentUser {
    /// Stable identity id
    pub id: String,
    /// Verified email address
    pub email: String,
}

/// Session provider contract: who is signed in, if anyone.
pub trait IdentityProvider: Send + Sync {
    /// The signed-in identity, or None for anonymous requests.
    fn current_user(&self) -> Option<CurrentUser>;
}

/// Identity provider returning a fixed user, for the binary and tests.
#[derive(Debug, Clone, Default)]
pub struct StaticIdentity(pub Option<CurrentUser>);

impl IdentityProvider for StaticIdentity {
    fn current_user(&self) -> Option<CurrentUser> {
        self.0.clone()
    }
}

/// Authorization context for a single request.
///
/// Only constructible from the datastore, so the role always comes from the stored
/// profile.
#[derive(Debug, Clone)]
pub struct AuthContext {
    user: CurrentUser,
    profile: profile::Model,
}

impl AuthContext {
    /// Builds the context for the identity the provider reports.
    ///
    /// # Errors
    /// `Unauthenticated` when nobody is signed in.
    pub async fn resolve<C>(db: &C, identity: &dyn IdentityProvider) -> Result<Self>
    where
        C: ConnectionTrait,
    {
        Self::for_user(db, identity.current_user()).await
    }

    /// Builds the context for `user`, creating a pending profile on first sign-in.
    pub async fn for_user<C>(db: &C, user: Option<CurrentUser>) -> Result<Self>
    where
        C: ConnectionTrait,
    {
        let user = user.ok_or(Error::Unauthenticated)?;
        let profile = resolve_profile(db, &user).await?;
        Ok(Self { user, profile })
    }

    /// Re-reads the caller's profile, for checks that must not trust a stale role.
    ///
    /// # Errors
    /// `NotFound` when the profile no longer exists.
    pub async fn refreshed<C>(&self, db: &C) -> Result<Self>
    where
        C: ConnectionTrait,
    {
        let profile = Profile::find_by_id(self.user.id.clone())
            .one(db)
            .await?
            .ok_or_else(|| Error::not_found("profile", &self.user.id))?;
        Ok(Self {
            user: self.user.clone(),
            profile,
        })
    }

    #[cfg(test)]
    pub(crate) const fn from_parts(user: CurrentUser, profile: profile::Model) -> Self {
        Self { user, profile }
    }

    /// The signed-in identity.
    #[must_use]
    pub const fn user(&self) -> &CurrentUser {
        &self.user
    }

    /// Profile as stored at the start of the request.
    #[must_use]
    pub const fn profile(&self) -> &profile::Model {
        &self.profile
    }

    /// Role read from the datastore for this request.
    #[must_use]
    pub const fn role(&self) -> Role {
        self.profile.role
    }

    /// Identity id of the caller.
    #[must_use]
    pub fn user_id(&self) -> &str {
        &self.user.id
    }

    /// Checks the policy, returning the decision unless it is a denial.
    ///
    /// # Errors
    /// `Forbidden` when the policy denies the operation.
    pub fn require(&self, operation: Operation) -> Result<Decision> {
        match policy::authorize(self.role(), operation) {
            Decision::Deny => {
                warn!(
                    user_id = %self.user.id,
                    role = ?self.role(),
                    %operation,
                    "Operation denied by role policy"
                );
                Err(Error::Forbidden {
                    operation: operation.to_string(),
                })
            }
            decision => Ok(decision),
        }
    }

    /// Checks the policy and only accepts a direct write.
    ///
    /// # Errors
    /// `Forbidden` unless the policy answers `Allow`.
    pub fn require_direct(&self, operation: Operation) -> Result<()> {
        match self.require(operation)? {
            Decision::Allow => Ok(()),
            Decision::AllowViaRequest | Decision::Deny => Err(Error::Forbidden {
                operation: operation.to_string(),
            }),
        }
    }
}

/// Loads the profile of `user`, creating it with role `pending` on first sign-in.
///
/// The insert ignores conflicts, so two concurrent first requests both end up
/// reading the same row.
pub async fn resolve_profile<C>(db: &C, user: &CurrentUser) -> Result<profile::Model>
where
    C: ConnectionTrait,
{
    if let Some(existing) = Profile::find_by_id(user.id.clone()).one(db).await? {
        return Ok(existing);
    }

    let new_profile = profile::ActiveModel {
        id: Set(user.id.clone()),
        email: Set(user.email.clone()),
        full_name: Set(None),
        title: Set(None),
        role: Set(Role::Pending),
        created_at: Set(chrono::Utc::now()),
    };
    Profile::insert(new_profile)
        .on_conflict(OnConflict::column(profile::Column::Id).do_nothing().to_owned())
        .exec_without_returning(db)
        .await?;
    info!(user_id = %user.id, "Created pending profile on first sign-in");

    Profile::find_by_id(user.id.clone())
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("profile", &user.id))
}

/// Finds the workspace owned by `owner_id`, if any.
pub async fn find_workspace<C>(db: &C, owner_id: &str) -> Result<Option<workspace::Model>>
where
    C: ConnectionTrait,
{
    Workspace::find()
        .filter(workspace::Column::OwnerId.eq(owner_id))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Workspace of the caller for flows that must not provision one.
///
/// # Errors
/// `NoWorkspace` when the caller owns none yet.
pub async fn require_workspace<C>(db: &C, ctx: &AuthContext) -> Result<workspace::Model>
where
    C: ConnectionTrait,
{
    find_workspace(db, ctx.user_id())
        .await?
        .ok_or(Error::NoWorkspace)
}

/// Workspace id for read-only listings; None means "show an empty list".
pub(crate) async fn workspace_id_for_reads<C>(db: &C, ctx: &AuthContext) -> Result<Option<i64>>
where
    C: ConnectionTrait,
{
    ctx.require(Operation::ViewLedger)?;
    match require_workspace(db, ctx).await {
        Ok(ws) => Ok(Some(ws.id)),
        Err(Error::NoWorkspace) => {
            debug!(user_id = %ctx.user_id(), "No workspace yet, returning empty result");
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

/// Returns the owner's workspace, provisioning one with placeholder values if absent.
///
/// Provisioning is an upsert on the unique `owner_id`, so racing first writes from
/// the same owner converge on a single row.
pub async fn ensure_workspace<C>(
    db: &C,
    owner_id: &str,
    defaults: &WorkspaceDefaults,
) -> Result<workspace::Model>
where
    C: ConnectionTrait,
{
    if let Some(existing) = find_workspace(db, owner_id).await? {
        return Ok(existing);
    }

    let placeholder = workspace::ActiveModel {
        owner_id: Set(owner_id.to_string()),
        name: Set(defaults.default_name.clone()),
        address: Set(None),
        city: Set(None),
        country: Set(None),
        tax_id: Set(None),
        logo_url: Set(None),
        invoice_sequence: Set(0),
        created_at: Set(chrono::Utc::now()),
        ..Default::default()
    };
    let inserted = Workspace::insert(placeholder)
        .on_conflict(
            OnConflict::column(workspace::Column::OwnerId)
                .do_nothing()
                .to_owned(),
        )
        .exec_without_returning(db)
        .await?;
    if inserted > 0 {
        info!(owner_id, "Provisioned workspace on first financial write");
    }

    find_workspace(db, owner_id)
        .await?
        .ok_or_else(|| Error::not_found("workspace", owner_id))
}
