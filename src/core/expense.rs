//! Expense business logic - recording cash outflows of a workspace.
//!
//! Expenses are append-only. A receipt attached to a new expense is uploaded to the
//! blob store first; if the upload fails the expense is still recorded, without a
//! receipt reference, and the failure is reported back as a warning.

use crate::{
    config::AppConfig,
    core::{
        Recorded,
        policy::Operation,
        positive_amount,
        storage::{self, BlobStore, Upload},
        tenancy::{self, AuthContext},
    },
    entities::{Expense, expense},
    errors::{Error, Result},
};
use sea_orm::{QueryOrder, Set, prelude::*};
use tracing::{info, warn};

/// Input for [`add_expense`].
#[derive(Debug, Clone)]
pub struct NewExpense {
    /// Amount spent (> 0)
    pub amount: f64,
    /// What the money was spent on
    pub description: String,
    /// Free-text category, None for uncategorized
    pub category: Option<String>,
    /// Optional receipt scan
    pub receipt: Option<Upload>,
}

/// Inserts an expense row dated now. No policy check.
pub(crate) async fn insert_expense<C>(
    db: &C,
    workspace_id: i64,
    amount: f64,
    description: String,
    category: Option<String>,
    receipt_url: Option<String>,
) -> Result<expense::Model>
where
    C: ConnectionTrait,
{
    let model = expense::ActiveModel {
        workspace_id: Set(workspace_id),
        amount: Set(amount),
        description: Set(description),
        category: Set(category),
        receipt_url: Set(receipt_url),
        date: Set(chrono::Utc::now()),
        ..Default::default()
    };
    Ok(model.insert(db).await?)
}

/// Records an expense in the caller's workspace, provisioning it if needed.
///
/// # Errors
/// `Forbidden` for viewers and pending members, `InvalidAmount` for amounts that are
/// not strictly positive, `ValidationFailed` for a blank description. Receipt upload
/// failures are not errors; they show up in [`Recorded::warnings`].
pub async fn add_expense(
    db: &DatabaseConnection,
    ctx: &AuthContext,
    config: &AppConfig,
    input: NewExpense,
    store: &dyn BlobStore,
) -> Result<Recorded<expense::Model>> {
    ctx.require_direct(Operation::ManageExpense)?;
    let amount = positive_amount("amount", input.amount)?;
    let description = input.description.trim().to_string();
    if description.is_empty() {
        return Err(Error::validation("description", "expense description cannot be empty"));
    }
    let category = input
        .category
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty());

    let workspace = tenancy::ensure_workspace(db, ctx.user_id(), &config.workspace).await?;

    let mut warnings = Vec::new();
    let receipt_url = match input.receipt.filter(|r| !r.is_empty()) {
        None => None,
        Some(receipt) => {
            let key = storage::object_key(&format!("{}-", workspace.id), &receipt.file_name);
            match store
                .upload(&config.storage.receipts_bucket, &key, &receipt.bytes)
                .await
            {
                Ok(url) => Some(url),
                Err(e) => {
                    warn!(workspace_id = workspace.id, error = %e, "Receipt upload failed, recording expense without it");
                    warnings.push(format!("Receipt could not be uploaded: {e}"));
                    None
                }
            }
        }
    };

    let record = insert_expense(db, workspace.id, amount, description, category, receipt_url).await?;
    info!(
        workspace_id = workspace.id,
        expense_id = record.id,
        amount,
        "Expense recorded"
    );
    Ok(Recorded { record, warnings })
}

/// Lists the expenses of the caller's workspace, newest first.
pub async fn list_expenses(
    db: &DatabaseConnection,
    ctx: &AuthContext,
) -> Result<Vec<expense::Model>> {
    let Some(workspace_id) = tenancy::workspace_id_for_reads(db, ctx).await? else {
        return Ok(Vec::new());
    };
    Expense::find()
        .filter(expense::Column::WorkspaceId.eq(workspace_id))
        .order_by_desc(expense::Column::Date)
        .order_by_desc(expense::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}
