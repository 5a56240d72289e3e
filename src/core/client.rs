//! Client business logic - create, edit, delete and list the customers of a workspace.
//!
//! Admins write clients directly. Editors go through the request queue, so
//! [`create_client`] returns a [`Submission`] telling the caller which path was taken.
//! Every lookup is filtered by the caller's workspace; ids from another workspace
//! behave exactly like ids that do not exist.

use crate::{
    config::AppConfig,
    core::{
        policy::{Decision, Operation},
        request::{self, Submission},
        tenancy::{self, AuthContext},
    },
    entities::{Client, ClientProposal, Invoice, ResourceProposal, client, invoice},
    errors::{Error, Result},
};
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*};
use tracing::info;

fn normalize(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

pub(crate) fn validate_client(fields: &ClientProposal) -> Result<()> {
    if fields.name.trim().is_empty() {
        return Err(Error::validation("name", "client name cannot be empty"));
    }
    let email = fields.email.as_deref().map_or("", str::trim);
    if !email.is_empty() && !email.contains('@') {
        return Err(Error::validation(
            "email",
            format!("'{email}' is not an email address"),
        ));
    }
    Ok(())
}

/// Inserts a client row into `workspace_id` without any policy check.
///
/// Callers must have authorized the write already (direct admin create or an
/// approved request).
pub(crate) async fn insert_client<C>(
    db: &C,
    workspace_id: i64,
    fields: ClientProposal,
) -> Result<client::Model>
where
    C: ConnectionTrait,
{
    validate_client(&fields)?;
    let model = client::ActiveModel {
        workspace_id: Set(workspace_id),
        name: Set(fields.name.trim().to_string()),
        email: Set(normalize(fields.email)),
        phone: Set(normalize(fields.phone)),
        address: Set(normalize(fields.address)),
        ice: Set(normalize(fields.ice)),
        created_at: Set(chrono::Utc::now()),
        ..Default::default()
    };
    let created = model.insert(db).await?;
    info!(workspace_id, client_id = created.id, "Client created");
    Ok(created)
}

/// Creates a client, or files a request when the caller may only propose one.
///
/// # Errors
/// `Forbidden` for viewers and pending members, `ValidationFailed` for a blank name.
pub async fn create_client(
    db: &DatabaseConnection,
    ctx: &AuthContext,
    config: &AppConfig,
    fields: ClientProposal,
) -> Result<Submission<client::Model>> {
    match ctx.require(Operation::CreateClient)? {
        Decision::Allow => {
            validate_client(&fields)?;
            let txn = db.begin().await?;
            let workspace =
                tenancy::ensure_workspace(&txn, ctx.user_id(), &config.workspace).await?;
            let created = insert_client(&txn, workspace.id, fields).await?;
            txn.commit().await?;
            Ok(Submission::Created(created))
        }
        Decision::AllowViaRequest => {
            let filed = request::submit_resource_request(db, ctx, ResourceProposal::Client(fields))
                .await?;
            Ok(Submission::Requested(filed))
        }
        Decision::Deny => Err(Error::Forbidden {
            operation: Operation::CreateClient.to_string(),
        }),
    }
}

async fn find_scoped<C>(db: &C, workspace_id: i64, client_id: i64) -> Result<client::Model>
where
    C: ConnectionTrait,
{
    Client::find_by_id(client_id)
        .filter(client::Column::WorkspaceId.eq(workspace_id))
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("client", client_id))
}

/// Looks up one client of the caller's workspace.
pub async fn get_client(
    db: &DatabaseConnection,
    ctx: &AuthContext,
    client_id: i64,
) -> Result<client::Model> {
    let workspace_id = tenancy::workspace_id_for_reads(db, ctx)
        .await?
        .ok_or_else(|| Error::not_found("client", client_id))?;
    find_scoped(db, workspace_id, client_id).await
}

/// Lists the clients of the caller's workspace, ordered by name.
///
/// Returns an empty list when the caller has no workspace yet.
pub async fn list_clients(db: &DatabaseConnection, ctx: &AuthContext) -> Result<Vec<client::Model>> {
    let Some(workspace_id) = tenancy::workspace_id_for_reads(db, ctx).await? else {
        return Ok(Vec::new());
    };
    Client::find()
        .filter(client::Column::WorkspaceId.eq(workspace_id))
        .order_by_asc(client::Column::Name)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Replaces the contact details of an existing client. Admin only.
pub async fn update_client(
    db: &DatabaseConnection,
    ctx: &AuthContext,
    client_id: i64,
    fields: ClientProposal,
) -> Result<client::Model> {
    ctx.require_direct(Operation::UpdateClient)?;
    validate_client(&fields)?;
    let workspace = tenancy::require_workspace(db, ctx).await?;
    let existing = find_scoped(db, workspace.id, client_id).await?;

    let mut active: client::ActiveModel = existing.into();
    active.name = Set(fields.name.trim().to_string());
    active.email = Set(normalize(fields.email));
    active.phone = Set(normalize(fields.phone));
    active.address = Set(normalize(fields.address));
    active.ice = Set(normalize(fields.ice));
    let updated = active.update(db).await?;
    info!(workspace_id = workspace.id, client_id, "Client updated");
    Ok(updated)
}

/// Deletes a client that has never been invoiced. Admin only.
///
/// # Errors
/// `ValidationFailed` when invoices still reference the client.
pub async fn delete_client(db: &DatabaseConnection, ctx: &AuthContext, client_id: i64) -> Result<()> {
    ctx.require_direct(Operation::DeleteClient)?;
    let workspace = tenancy::require_workspace(db, ctx).await?;
    let existing = find_scoped(db, workspace.id, client_id).await?;

    let invoices = Invoice::find()
        .filter(invoice::Column::ClientId.eq(client_id))
        .count(db)
        .await?;
    if invoices > 0 {
        return Err(Error::validation(
            "client",
            format!("{} still has {invoices} invoice(s)", existing.name),
        ));
    }

    existing.delete(db).await?;
    info!(workspace_id = workspace.id, client_id, "Client deleted");
    Ok(())
}
