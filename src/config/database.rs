//! Database configuration module for the invoice ledger.
//!
//! This module handles `SQLite` database connection and table creation using `SeaORM`.
//! Tables are generated from the entity definitions with `Schema::create_table_from_entity`,
//! so the schema always matches the Rust structs. Composite unique indexes that the
//! entity attributes cannot express (invoice numbers per workspace) are created here too.

use crate::entities::{
    Client, Debt, EmailSettings, Expense, Invoice, InvoiceColumn, InvoiceItem, Product, Profile,
    ResourceRequest, Workspace,
};
use crate::errors::Result;
use sea_orm::sea_query::{Index, IndexCreateStatement};
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, EntityTrait, Schema};
use tracing::{debug, info};

const DEFAULT_DATABASE_URL: &str = "sqlite://data/invoice_ledger.sqlite?mode=rwc";

/// Gets the database URL from environment variable or returns default `SQLite` path.
///
/// This function looks for `DATABASE_URL` in the environment and falls back to
/// a default local `SQLite` file if not found.
#[must_use]
pub fn get_database_url() -> String {
    std::env::var("DATABASE_URL").unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string())
}

/// Establishes a connection to the database named by `DATABASE_URL`.
///
/// Falls back to a default local `SQLite` file if no environment variable is set.
pub async fn create_connection() -> Result<DatabaseConnection> {
    let database_url = get_database_url();
    debug!("Connecting to database at {}", database_url);
    Database::connect(&database_url).await.map_err(Into::into)
}

async fn create_table<E>(db: &DatabaseConnection, schema: &Schema, entity: E) -> Result<()>
where
    E: EntityTrait,
{
    let builder = db.get_database_backend();
    let mut table = schema.create_table_from_entity(entity);
    table.if_not_exists();
    db.execute(builder.build(&table)).await?;
    Ok(())
}

fn invoice_number_index() -> IndexCreateStatement {
    Index::create()
        .name("idx_unique_invoice_number_per_workspace")
        .table(Invoice)
        .col(InvoiceColumn::WorkspaceId)
        .col(InvoiceColumn::InvoiceNumber)
        .unique()
        .if_not_exists()
        .to_owned()
}

/// Creates all ledger tables and indexes if they do not exist yet.
///
/// Tables are created parents-first so foreign keys resolve. Safe to call on every start.
pub async fn create_tables(db: &DatabaseConnection) -> Result<()> {
    let builder = db.get_database_backend();
    let schema = Schema::new(builder);

    create_table(db, &schema, Workspace).await?;
    create_table(db, &schema, Profile).await?;
    create_table(db, &schema, Client).await?;
    create_table(db, &schema, Product).await?;
    create_table(db, &schema, Invoice).await?;
    create_table(db, &schema, InvoiceItem).await?;
    create_table(db, &schema, Expense).await?;
    create_table(db, &schema, Debt).await?;
    create_table(db, &schema, ResourceRequest).await?;
    create_table(db, &schema, EmailSettings).await?;

    db.execute(builder.build(&invoice_number_index())).await?;

    info!("Ledger tables ensured");
    Ok(())
}
