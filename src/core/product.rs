//! Product business logic - the billable catalog of a workspace.
//!
//! Products are pricing templates for invoice items. Admins create and delete them
//! directly; editors propose new ones through the request queue. Deleting a product
//! never touches issued invoices, which copied name and price when they were created.

use crate::{
    config::AppConfig,
    core::{
        non_negative_amount,
        policy::{Decision, Operation},
        request::{self, Submission},
        tenancy::{self, AuthContext},
    },
    entities::{Product, ProductProposal, ResourceProposal, product},
    errors::{Error, Result},
};
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*};
use tracing::info;

pub(crate) fn validate_product(fields: &ProductProposal) -> Result<()> {
    if fields.name.trim().is_empty() {
        return Err(Error::validation("name", "product name cannot be empty"));
    }
    non_negative_amount("price", fields.price)?;
    Ok(())
}

/// Inserts a product row into `workspace_id` without any policy check.
pub(crate) async fn insert_product<C>(
    db: &C,
    workspace_id: i64,
    fields: ProductProposal,
) -> Result<product::Model>
where
    C: ConnectionTrait,
{
    validate_product(&fields)?;
    let model = product::ActiveModel {
        workspace_id: Set(workspace_id),
        name: Set(fields.name.trim().to_string()),
        price: Set(fields.price),
        unit: Set(fields.unit.filter(|u| !u.trim().is_empty())),
        description: Set(fields.description.filter(|d| !d.trim().is_empty())),
        created_at: Set(chrono::Utc::now()),
        ..Default::default()
    };
    let created = model.insert(db).await?;
    info!(workspace_id, product_id = created.id, "Product created");
    Ok(created)
}

/// Creates a product, or files a request when the caller may only propose one.
///
/// # Errors
/// Returns an error if:
/// - The role may not create products (`Forbidden`)
/// - The name is blank or the price is negative or not finite
pub async fn create_product(
    db: &DatabaseConnection,
    ctx: &AuthContext,
    config: &AppConfig,
    fields: ProductProposal,
) -> Result<Submission<product::Model>> {
    match ctx.require(Operation::CreateProduct)? {
        Decision::Allow => {
            validate_product(&fields)?;
            let txn = db.begin().await?;
            let workspace =
                tenancy::ensure_workspace(&txn, ctx.user_id(), &config.workspace).await?;
            let created = insert_product(&txn, workspace.id, fields).await?;
            txn.commit().await?;
            Ok(Submission::Created(created))
        }
        Decision::AllowViaRequest => {
            let filed =
                request::submit_resource_request(db, ctx, ResourceProposal::Product(fields))
                    .await?;
            Ok(Submission::Requested(filed))
        }
        Decision::Deny => Err(Error::Forbidden {
            operation: Operation::CreateProduct.to_string(),
        }),
    }
}

/// Finds a product of `workspace_id` by id.
pub(crate) async fn find_scoped<C>(
    db: &C,
    workspace_id: i64,
    product_id: i64,
) -> Result<product::Model>
where
    C: ConnectionTrait,
{
    Product::find_by_id(product_id)
        .filter(product::Column::WorkspaceId.eq(workspace_id))
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("product", product_id))
}

/// Lists the products of the caller's workspace, ordered alphabetically by name.
///
/// Returns an empty list when the caller has no workspace yet.
pub async fn list_products(
    db: &DatabaseConnection,
    ctx: &AuthContext,
) -> Result<Vec<product::Model>> {
    let Some(workspace_id) = tenancy::workspace_id_for_reads(db, ctx).await? else {
        return Ok(Vec::new());
    };
    Product::find()
        .filter(product::Column::WorkspaceId.eq(workspace_id))
        .order_by_asc(product::Column::Name)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Deletes a product. Admin only.
pub async fn delete_product(
    db: &DatabaseConnection,
    ctx: &AuthContext,
    product_id: i64,
) -> Result<()> {
    ctx.require_direct(Operation::DeleteProduct)?;
    let workspace = tenancy::require_workspace(db, ctx).await?;
    let existing = find_scoped(db, workspace.id, product_id).await?;
    existing.delete(db).await?;
    info!(workspace_id = workspace.id, product_id, "Product deleted");
    Ok(())
}
