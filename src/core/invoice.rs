//! Invoice business logic - numbering, creation with line items, status changes.
//!
//! [`create_full_invoice`] writes the header and all of its items inside one datastore
//! transaction. Line totals and the header total are always computed here from
//! quantity and unit price; a total declared by the caller is only cross-checked.
//! Invoice numbers come from a per-workspace sequence that is incremented atomically
//! inside the same transaction, backed by a unique index on (workspace, number).

use crate::{
    config::{AppConfig, InvoicingConfig},
    core::{
        non_negative_amount,
        policy::Operation,
        positive_amount, product,
        tenancy::{self, AuthContext},
    },
    entities::{
        Client, Invoice, InvoiceItem, InvoiceStatus, Workspace, client, invoice, invoice_item,
        workspace,
    },
    errors::{Error, Result},
};
use chrono::{Datelike, NaiveDate};
use sea_orm::{
    DatabaseTransaction, QueryOrder, Set, SqlErr, TransactionTrait, prelude::*, sea_query::Expr,
};
use tracing::{error, info, instrument, warn};

/// Largest gap between declared and computed totals still considered equal.
const TOTAL_TOLERANCE: f64 = 0.005;

/// Attempts at skipping sequence values that were already used by manual numbers.
const MAX_NUMBER_ATTEMPTS: usize = 100;

/// How the invoice number is chosen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvoiceNumber {
    /// Allocate the next number of the workspace sequence
    Auto,
    /// Use this number; rejected if already taken in the workspace
    Manual(String),
}

/// One requested line of a new invoice.
#[derive(Debug, Clone, PartialEq)]
pub struct NewInvoiceItem {
    /// Product to copy name and price from, None for an ad-hoc line
    pub product_id: Option<i64>,
    /// Line description; blank copies the product name
    pub description: String,
    /// Quantity (> 0)
    pub quantity: f64,
    /// Unit price; None copies the product price
    pub unit_price: Option<f64>,
}

impl NewInvoiceItem {
    /// Ad-hoc line with an explicit price.
    pub fn custom(description: impl Into<String>, quantity: f64, unit_price: f64) -> Self {
        Self {
            product_id: None,
            description: description.into(),
            quantity,
            unit_price: Some(unit_price),
        }
    }

    /// Line priced from a catalog product.
    #[must_use]
    pub const fn from_product(product_id: i64, quantity: f64) -> Self {
        Self {
            product_id: Some(product_id),
            description: String::new(),
            quantity,
            unit_price: None,
        }
    }
}

/// Header and items of an invoice to create.
#[derive(Debug, Clone, PartialEq)]
pub struct NewInvoice {
    /// Billed client, must belong to the caller's workspace
    pub client_id: i64,
    /// Number selection
    pub number: InvoiceNumber,
    /// Initial status
    pub status: InvoiceStatus,
    /// Payment due date
    pub due_date: NaiveDate,
    /// Tax rate, None uses the configured default
    pub tax_rate: Option<f64>,
    /// Total the caller computed, checked against the server-side total
    pub declared_total: Option<f64>,
    /// Lines, at least one
    pub items: Vec<NewInvoiceItem>,
}

/// An invoice with all of its lines.
#[derive(Debug, Clone, PartialEq)]
pub struct InvoiceWithItems {
    /// Header
    pub invoice: invoice::Model,
    /// Lines in insertion order
    pub items: Vec<invoice_item::Model>,
}

/// Server-side totals of a set of lines.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Totals {
    /// Sum of line totals
    pub subtotal: f64,
    /// `subtotal * tax_rate`
    pub tax_amount: f64,
    /// `subtotal + tax_amount`
    pub total: f64,
}

/// Total of a single line.
#[must_use]
pub fn line_total(quantity: f64, unit_price: f64) -> f64 {
    quantity * unit_price
}

/// Sums line totals and applies the tax rate.
#[must_use]
pub fn compute_totals(line_totals: &[f64], tax_rate: f64) -> Totals {
    let subtotal: f64 = line_totals.iter().sum();
    let tax_amount = subtotal * tax_rate;
    Totals {
        subtotal,
        tax_amount,
        total: subtotal + tax_amount,
    }
}

/// Formats `INV-<year>-<zero-padded sequence>`.
#[must_use]
pub fn format_invoice_number(config: &InvoicingConfig, year: i32, sequence: i64) -> String {
    format!(
        "{}-{year}-{sequence:0width$}",
        config.number_prefix,
        width = config.sequence_width
    )
}

/// Number the next automatically numbered invoice of the caller would get.
///
/// This is a preview only; nothing is reserved, and a concurrent create may take it.
pub async fn next_invoice_number(
    db: &DatabaseConnection,
    ctx: &AuthContext,
    config: &AppConfig,
) -> Result<String> {
    let sequence = match tenancy::find_workspace(db, ctx.user_id()).await? {
        Some(ws) => ws.invoice_sequence + 1,
        None => 1,
    };
    Ok(format_invoice_number(
        &config.invoicing,
        chrono::Utc::now().year(),
        sequence,
    ))
}

async fn number_taken<C>(db: &C, workspace_id: i64, number: &str) -> Result<bool>
where
    C: ConnectionTrait,
{
    let count = Invoice::find()
        .filter(invoice::Column::WorkspaceId.eq(workspace_id))
        .filter(invoice::Column::InvoiceNumber.eq(number))
        .count(db)
        .await?;
    Ok(count > 0)
}

/// Reports a unique index hit on the invoice number as `DuplicateInvoiceNumber`.
fn duplicate_number_or(err: DbErr, number: String) -> Error {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => Error::DuplicateInvoiceNumber { number },
        _ => Error::Database(err),
    }
}

/// Claims the workspace row for the rest of the transaction.
///
/// This must be the first statement of the transaction: `SQLite` only waits for a
/// busy writer when the write lock is taken before anything was read.
async fn lock_workspace(txn: &DatabaseTransaction, workspace_id: i64) -> Result<()> {
    Workspace::update_many()
        .col_expr(
            workspace::Column::InvoiceSequence,
            Expr::col(workspace::Column::InvoiceSequence).into(),
        )
        .filter(workspace::Column::Id.eq(workspace_id))
        .exec(txn)
        .await?;
    Ok(())
}

/// Increments the workspace sequence atomically and formats the result, skipping
/// values already taken by manually numbered invoices.
async fn allocate_invoice_number(
    txn: &DatabaseTransaction,
    workspace_id: i64,
    config: &InvoicingConfig,
) -> Result<String> {
    let year = chrono::Utc::now().year();
    for _ in 0..MAX_NUMBER_ATTEMPTS {
        Workspace::update_many()
            .col_expr(
                workspace::Column::InvoiceSequence,
                Expr::col(workspace::Column::InvoiceSequence).add(1),
            )
            .filter(workspace::Column::Id.eq(workspace_id))
            .exec(txn)
            .await?;
        let sequence = Workspace::find_by_id(workspace_id)
            .one(txn)
            .await?
            .ok_or_else(|| Error::not_found("workspace", workspace_id))?
            .invoice_sequence;

        let number = format_invoice_number(config, year, sequence);
        if !number_taken(txn, workspace_id, &number).await? {
            return Ok(number);
        }
        warn!(workspace_id, %number, "Sequence value already used manually, skipping");
    }
    Err(Error::validation(
        "invoice_number",
        "could not allocate a free invoice number",
    ))
}

fn validate_new_invoice(input: &NewInvoice, default_tax_rate: f64) -> Result<f64> {
    if input.items.is_empty() {
        return Err(Error::validation("items", "an invoice needs at least one line"));
    }
    for item in &input.items {
        positive_amount("quantity", item.quantity)?;
        if let Some(price) = item.unit_price {
            non_negative_amount("unit_price", price)?;
        }
        if item.product_id.is_none() {
            if item.description.trim().is_empty() {
                return Err(Error::validation("description", "custom lines need a description"));
            }
            if item.unit_price.is_none() {
                return Err(Error::validation("unit_price", "custom lines need a unit price"));
            }
        }
    }
    if matches!(&input.number, InvoiceNumber::Manual(number) if number.trim().is_empty()) {
        return Err(Error::validation("invoice_number", "cannot be empty"));
    }
    if let Some(declared) = input.declared_total {
        non_negative_amount("total_amount", declared)?;
    }
    non_negative_amount("tax_rate", input.tax_rate.unwrap_or(default_tax_rate))
}

/// A requested line with its price resolved.
struct PricedLine {
    product_id: Option<i64>,
    description: String,
    quantity: f64,
    unit_price: f64,
}

/// Copies name and price from catalog products where the caller left them out.
async fn price_lines<C>(db: &C, workspace_id: i64, items: Vec<NewInvoiceItem>) -> Result<Vec<PricedLine>>
where
    C: ConnectionTrait,
{
    let mut lines = Vec::with_capacity(items.len());
    for item in items {
        let (description, unit_price) = match item.product_id {
            Some(product_id) => {
                let template = product::find_scoped(db, workspace_id, product_id).await?;
                let description = if item.description.trim().is_empty() {
                    template.name
                } else {
                    item.description.trim().to_string()
                };
                (description, item.unit_price.unwrap_or(template.price))
            }
            None => (
                item.description.trim().to_string(),
                item.unit_price.unwrap_or_default(),
            ),
        };
        lines.push(PricedLine {
            product_id: item.product_id,
            description,
            quantity: item.quantity,
            unit_price,
        });
    }
    Ok(lines)
}

async fn insert_items(
    txn: &DatabaseTransaction,
    invoice_id: i64,
    lines: Vec<PricedLine>,
) -> Result<Vec<invoice_item::Model>> {
    let rows = lines.into_iter().map(|line| invoice_item::ActiveModel {
        invoice_id: Set(invoice_id),
        product_id: Set(line.product_id),
        description: Set(line.description),
        quantity: Set(line.quantity),
        unit_price: Set(line.unit_price),
        total_price: Set(line_total(line.quantity, line.unit_price)),
        ..Default::default()
    });
    InvoiceItem::insert_many(rows).exec(txn).await?;
    items_of(txn, invoice_id).await
}

async fn items_of<C>(db: &C, invoice_id: i64) -> Result<Vec<invoice_item::Model>>
where
    C: ConnectionTrait,
{
    InvoiceItem::find()
        .filter(invoice_item::Column::InvoiceId.eq(invoice_id))
        .order_by_asc(invoice_item::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Creates an invoice header and all of its items as one unit.
///
/// The workspace is provisioned on the caller's first invoice, ahead of the
/// transaction, and is kept even if the invoice itself fails. If writing the items
/// fails, the transaction is rolled back so no item-less header survives; if even the
/// rollback fails the call reports `PartialFailure`.
///
/// # Errors
/// Returns an error if:
/// - The role may not create invoices (`Forbidden`)
/// - There are no items, a quantity is not positive or a price is negative
/// - The client or a referenced product is not in the caller's workspace (`NotFound`)
/// - A manual number is already taken (`DuplicateInvoiceNumber`)
/// - The declared total differs from the computed one
#[instrument(skip(db, ctx, config, input), fields(user_id = %ctx.user_id()))]
pub async fn create_full_invoice(
    db: &DatabaseConnection,
    ctx: &AuthContext,
    config: &AppConfig,
    input: NewInvoice,
) -> Result<InvoiceWithItems> {
    ctx.require_direct(Operation::CreateInvoice)?;
    let tax_rate = validate_new_invoice(&input, config.invoicing.default_tax_rate)?;

    let workspace = tenancy::ensure_workspace(db, ctx.user_id(), &config.workspace).await?;
    let txn = db.begin().await?;
    lock_workspace(&txn, workspace.id).await?;

    Client::find_by_id(input.client_id)
        .filter(client::Column::WorkspaceId.eq(workspace.id))
        .one(&txn)
        .await?
        .ok_or_else(|| Error::not_found("client", input.client_id))?;

    let lines = price_lines(&txn, workspace.id, input.items).await?;
    let line_totals: Vec<f64> = lines
        .iter()
        .map(|l| line_total(l.quantity, l.unit_price))
        .collect();
    let totals = compute_totals(&line_totals, tax_rate);
    if let Some(declared) = input.declared_total {
        if (declared - totals.total).abs() > TOTAL_TOLERANCE {
            return Err(Error::validation(
                "total_amount",
                format!("declared {declared:.2} but items total {:.2}", totals.total),
            ));
        }
    }

    let invoice_number = match input.number {
        InvoiceNumber::Auto => {
            allocate_invoice_number(&txn, workspace.id, &config.invoicing).await?
        }
        InvoiceNumber::Manual(number) => {
            let number = number.trim().to_string();
            if number_taken(&txn, workspace.id, &number).await? {
                return Err(Error::DuplicateInvoiceNumber { number });
            }
            number
        }
    };

    let number = invoice_number.clone();
    let header = invoice::ActiveModel {
        workspace_id: Set(workspace.id),
        client_id: Set(input.client_id),
        invoice_number: Set(invoice_number),
        status: Set(input.status),
        due_date: Set(input.due_date),
        subtotal: Set(totals.subtotal),
        tax_rate: Set(tax_rate),
        tax_amount: Set(totals.tax_amount),
        total_amount: Set(totals.total),
        created_at: Set(chrono::Utc::now()),
        ..Default::default()
    }
    .insert(&txn)
    .await
    .map_err(|e| duplicate_number_or(e, number))?;

    let items = match insert_items(&txn, header.id, lines).await {
        Ok(items) => items,
        Err(items_err) => {
            error!(invoice_id = header.id, error = %items_err, "Failed to save invoice items");
            if let Err(rollback_err) = txn.rollback().await {
                error!(invoice_id = header.id, error = %rollback_err, "Rollback failed, header may be orphaned");
                return Err(Error::PartialFailure {
                    operation: "create invoice",
                    completed: format!("header {}", header.invoice_number),
                    failed: format!("items could not be saved ({items_err}) and rollback failed"),
                });
            }
            return Err(items_err);
        }
    };

    txn.commit().await?;
    info!(
        workspace_id = workspace.id,
        invoice_id = header.id,
        number = %header.invoice_number,
        total = header.total_amount,
        "Invoice created"
    );
    Ok(InvoiceWithItems {
        invoice: header,
        items,
    })
}

async fn find_scoped<C>(db: &C, workspace_id: i64, invoice_id: i64) -> Result<invoice::Model>
where
    C: ConnectionTrait,
{
    Invoice::find_by_id(invoice_id)
        .filter(invoice::Column::WorkspaceId.eq(workspace_id))
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("invoice", invoice_id))
}

/// Sets the status of an invoice. Any transition is accepted, including out of `Paid`.
pub async fn update_invoice_status(
    db: &DatabaseConnection,
    ctx: &AuthContext,
    invoice_id: i64,
    status: InvoiceStatus,
) -> Result<invoice::Model> {
    ctx.require_direct(Operation::UpdateInvoiceStatus)?;
    let workspace = tenancy::require_workspace(db, ctx).await?;
    let existing = find_scoped(db, workspace.id, invoice_id).await?;
    let previous = existing.status;

    let mut active: invoice::ActiveModel = existing.into();
    active.status = Set(status);
    let updated = active.update(db).await?;
    info!(invoice_id, ?previous, ?status, "Invoice status updated");
    Ok(updated)
}

/// Marks an invoice as paid.
pub async fn mark_invoice_as_paid(
    db: &DatabaseConnection,
    ctx: &AuthContext,
    invoice_id: i64,
) -> Result<invoice::Model> {
    update_invoice_status(db, ctx, invoice_id, InvoiceStatus::Paid).await
}

/// Loads an invoice of the caller's workspace with its items.
pub async fn get_invoice(
    db: &DatabaseConnection,
    ctx: &AuthContext,
    invoice_id: i64,
) -> Result<InvoiceWithItems> {
    let workspace_id = tenancy::workspace_id_for_reads(db, ctx)
        .await?
        .ok_or_else(|| Error::not_found("invoice", invoice_id))?;
    let invoice = find_scoped(db, workspace_id, invoice_id).await?;
    let items = items_of(db, invoice_id).await?;
    Ok(InvoiceWithItems { invoice, items })
}

/// Lists the invoices of the caller's workspace, newest first.
pub async fn list_invoices(
    db: &DatabaseConnection,
    ctx: &AuthContext,
) -> Result<Vec<invoice::Model>> {
    let Some(workspace_id) = tenancy::workspace_id_for_reads(db, ctx).await? else {
        return Ok(Vec::new());
    };
    Invoice::find()
        .filter(invoice::Column::WorkspaceId.eq(workspace_id))
        .order_by_desc(invoice::Column::CreatedAt)
        .order_by_desc(invoice::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Deletes an invoice together with its items. Admin only.
pub async fn delete_invoice(db: &DatabaseConnection, ctx: &AuthContext, invoice_id: i64) -> Result<()> {
    ctx.require_direct(Operation::DeleteInvoice)?;
    let txn = db.begin().await?;
    let workspace = tenancy::require_workspace(&txn, ctx).await?;
    let existing = find_scoped(&txn, workspace.id, invoice_id).await?;

    InvoiceItem::delete_many()
        .filter(invoice_item::Column::InvoiceId.eq(invoice_id))
        .exec(&txn)
        .await?;
    existing.delete(&txn).await?;
    txn.commit().await?;

    info!(workspace_id = workspace.id, invoice_id, "Invoice deleted");
    Ok(())
}
