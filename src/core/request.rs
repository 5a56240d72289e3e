//! Request queue - client and product proposals awaiting an admin decision.
//!
//! Editors cannot create clients or products directly; their submissions are stored
//! verbatim as a typed [`ResourceProposal`]. Approving a request materializes the
//! record in the requester's workspace in the same transaction that closes the request.

use crate::{
    config::AppConfig,
    core::{
        client, product,
        policy::Operation,
        tenancy::{self, AuthContext},
    },
    entities::{
        ClientModel, ProductModel, RequestKind, RequestStatus, ResourceProposal, ResourceRequest,
        resource_request,
    },
    errors::{Error, Result},
};
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*};
use tracing::info;

/// Which path a create call took.
#[derive(Debug, Clone, PartialEq)]
pub enum Submission<T> {
    /// The record was written directly
    Created(T),
    /// A request was queued for an admin
    Requested(resource_request::Model),
}

/// Admin decision on a pending request.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Resolution {
    /// Create the proposed record
    Approve,
    /// Discard the proposal
    Reject,
}

/// Record created by an approval.
#[derive(Debug, Clone, PartialEq)]
pub enum Materialized {
    /// An approved client
    Client(ClientModel),
    /// An approved product
    Product(ProductModel),
}

/// Outcome of resolving a request.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedRequest {
    /// The request in its final state
    pub request: resource_request::Model,
    /// The created record, None when rejected
    pub created: Option<Materialized>,
}

const fn operation_for(kind: RequestKind) -> Operation {
    match kind {
        RequestKind::Client => Operation::CreateClient,
        RequestKind::Product => Operation::CreateProduct,
    }
}

/// Queues a proposal on behalf of the caller.
///
/// # Errors
/// `Forbidden` when the caller may not create this kind of record at all.
pub async fn submit_resource_request(
    db: &DatabaseConnection,
    ctx: &AuthContext,
    proposal: ResourceProposal,
) -> Result<resource_request::Model> {
    let kind = proposal.kind();
    ctx.require(operation_for(kind))?;

    let model = resource_request::ActiveModel {
        user_id: Set(ctx.user_id().to_string()),
        kind: Set(kind),
        details: Set(proposal),
        status: Set(RequestStatus::Pending),
        resolved_by: Set(None),
        created_at: Set(chrono::Utc::now()),
        resolved_at: Set(None),
        ..Default::default()
    };
    let filed = model.insert(db).await?;
    info!(request_id = filed.id, user_id = %ctx.user_id(), ?kind, "Resource request submitted");
    Ok(filed)
}

/// Approves or rejects a pending request. Admin only.
///
/// # Errors
/// `NotFound` for unknown ids, `ValidationFailed` when the request is already resolved
/// or its proposal does not pass validation on approval.
pub async fn resolve_resource_request(
    db: &DatabaseConnection,
    ctx: &AuthContext,
    config: &AppConfig,
    request_id: i64,
    resolution: Resolution,
) -> Result<ResolvedRequest> {
    ctx.require_direct(Operation::ResolveRequest)?;

    let txn = db.begin().await?;
    let pending = ResourceRequest::find_by_id(request_id)
        .one(&txn)
        .await?
        .ok_or_else(|| Error::not_found("request", request_id))?;
    if pending.status != RequestStatus::Pending {
        return Err(Error::validation(
            "status",
            format!("request {request_id} is already {:?}", pending.status),
        ));
    }

    let created = match resolution {
        Resolution::Reject => None,
        Resolution::Approve => {
            let workspace =
                tenancy::ensure_workspace(&txn, &pending.user_id, &config.workspace).await?;
            Some(match pending.details.clone() {
                ResourceProposal::Client(fields) => {
                    Materialized::Client(client::insert_client(&txn, workspace.id, fields).await?)
                }
                ResourceProposal::Product(fields) => Materialized::Product(
                    product::insert_product(&txn, workspace.id, fields).await?,
                ),
            })
        }
    };

    let status = match resolution {
        Resolution::Approve => RequestStatus::Approved,
        Resolution::Reject => RequestStatus::Rejected,
    };
    let mut active: resource_request::ActiveModel = pending.into();
    active.status = Set(status);
    active.resolved_by = Set(Some(ctx.user_id().to_string()));
    active.resolved_at = Set(Some(chrono::Utc::now()));
    let request = active.update(&txn).await?;
    txn.commit().await?;

    info!(request_id, admin_id = %ctx.user_id(), ?status, "Resource request resolved");
    Ok(ResolvedRequest { request, created })
}

/// Pending requests of every member, oldest first. Admin only.
pub async fn list_pending_requests(
    db: &DatabaseConnection,
    ctx: &AuthContext,
) -> Result<Vec<resource_request::Model>> {
    ctx.require_direct(Operation::ResolveRequest)?;
    ResourceRequest::find()
        .filter(resource_request::Column::Status.eq(RequestStatus::Pending))
        .order_by_asc(resource_request::Column::CreatedAt)
        .all(db)
        .await
        .map_err(Into::into)
}

/// The caller's own requests, newest first, so they can follow their status.
pub async fn list_my_requests(
    db: &DatabaseConnection,
    ctx: &AuthContext,
) -> Result<Vec<resource_request::Model>> {
    ResourceRequest::find()
        .filter(resource_request::Column::UserId.eq(ctx.user_id()))
        .order_by_desc(resource_request::Column::CreatedAt)
        .order_by_desc(resource_request::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}
