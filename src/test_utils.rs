//! Shared test utilities for the invoice ledger.
//!
//! This module provides common helper functions for setting up test databases,
//! authorization contexts, ledger records with sensible defaults, and in-memory
//! stand-ins for the blob store and SMTP relay.

#![allow(clippy::unwrap_used)]

use crate::{
    config::{AppConfig, WorkspaceDefaults},
    core::{
        invoice::{self, InvoiceNumber, InvoiceWithItems, NewInvoice, NewInvoiceItem},
        mail::{Mailer, OutgoingEmail},
        storage::BlobStore,
        tenancy::{self, AuthContext, CurrentUser},
    },
    entities::{
        ClientProposal, InvoiceStatus, ProductProposal, Role, client, email_settings, product,
        profile, workspace,
    },
    errors::{Error, Result},
};
use async_trait::async_trait;
use sea_orm::{ActiveModelTrait, DatabaseConnection, Set};
use std::{collections::HashMap, sync::Mutex};

/// Creates an in-memory `SQLite` database with all tables initialized.
/// This is the standard setup for all integration tests.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = sea_orm::Database::connect("sqlite::memory:").await?;
    crate::config::database::create_tables(&db).await?;
    Ok(db)
}

/// Creates a file-backed `SQLite` database with all tables initialized.
///
/// Unlike `sqlite::memory:`, the pool holds several connections, so spawned tasks
/// really run against each other. Keep the returned directory alive for the test.
pub async fn setup_file_db() -> Result<(tempfile::TempDir, DatabaseConnection)> {
    let dir = tempfile::tempdir()?;
    let url = format!("sqlite://{}?mode=rwc", dir.path().join("ledger.db").display());
    let db = sea_orm::Database::connect(url).await?;
    crate::config::database::create_tables(&db).await?;
    Ok((dir, db))
}

/// Identity with a derived email address.
pub fn test_user(id: &str) -> CurrentUser {
    CurrentUser {
        id: id.to_string(),
        email: format!("{id}@example.com"),
    }
}

/// Context for `role` without touching any database, for `MockDatabase` tests.
pub fn mock_context(role: Role) -> AuthContext {
    let user = test_user("mock");
    let profile = profile::Model {
        id: user.id.clone(),
        email: user.email.clone(),
        full_name: None,
        title: None,
        role,
        created_at: chrono::Utc::now(),
    };
    AuthContext::from_parts(user, profile)
}

/// Signs `id` in (creating the profile if needed) and sets its stored role.
pub async fn context_with_role(db: &DatabaseConnection, id: &str, role: Role) -> Result<AuthContext> {
    let user = test_user(id);
    let existing = tenancy::resolve_profile(db, &user).await?;
    let mut active: profile::ActiveModel = existing.into();
    active.role = Set(role);
    active.update(db).await?;
    AuthContext::for_user(db, Some(user)).await
}

/// Admin context that already owns a workspace.
pub async fn admin_with_workspace(
    db: &DatabaseConnection,
    id: &str,
) -> Result<(AuthContext, workspace::Model)> {
    let ctx = context_with_role(db, id, Role::Admin).await?;
    let ws = tenancy::ensure_workspace(db, id, &WorkspaceDefaults::default()).await?;
    Ok((ctx, ws))
}

/// Client proposal with only a name.
pub fn client_fields(name: &str) -> ClientProposal {
    ClientProposal {
        name: name.to_string(),
        ..Default::default()
    }
}

/// Product proposal with a name and price.
pub fn product_fields(name: &str, price: f64) -> ProductProposal {
    ProductProposal {
        name: name.to_string(),
        price,
        ..Default::default()
    }
}

/// Inserts a client directly into `workspace_id`.
pub async fn create_test_client(
    db: &DatabaseConnection,
    workspace_id: i64,
    name: &str,
) -> Result<client::Model> {
    crate::core::client::insert_client(db, workspace_id, client_fields(name)).await
}

/// Inserts a product directly into `workspace_id`.
pub async fn create_test_product(
    db: &DatabaseConnection,
    workspace_id: i64,
    name: &str,
    price: f64,
) -> Result<product::Model> {
    crate::core::product::insert_product(db, workspace_id, product_fields(name, price)).await
}

/// Creates a pending, untaxed invoice with one custom line per `(quantity, unit_price)`.
pub async fn create_test_invoice(
    db: &DatabaseConnection,
    ctx: &AuthContext,
    client_id: i64,
    lines: &[(f64, f64)],
) -> Result<InvoiceWithItems> {
    let items = lines
        .iter()
        .enumerate()
        .map(|(i, &(quantity, price))| NewInvoiceItem::custom(format!("Line {}", i + 1), quantity, price))
        .collect();
    invoice::create_full_invoice(
        db,
        ctx,
        &AppConfig::default(),
        NewInvoice {
            client_id,
            number: InvoiceNumber::Auto,
            status: InvoiceStatus::Pending,
            due_date: chrono::Utc::now().date_naive(),
            tax_rate: Some(0.0),
            declared_total: None,
            items,
        },
    )
    .await
}

/// Blob store keeping objects in memory.
#[derive(Debug, Default)]
pub struct MemoryBlobStore {
    objects: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryBlobStore {
    /// Number of stored objects.
    pub fn object_count(&self) -> usize {
        self.objects.lock().unwrap().len()
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn upload(&self, bucket: &str, key: &str, bytes: &[u8]) -> Result<String> {
        let url = format!("memory://{bucket}/{key}");
        self.objects
            .lock()
            .unwrap()
            .insert(url.clone(), bytes.to_vec());
        Ok(url)
    }
}

/// Blob store that is always unavailable.
#[derive(Debug, Default)]
pub struct FailingBlobStore;

#[async_trait]
impl BlobStore for FailingBlobStore {
    async fn upload(&self, _bucket: &str, _key: &str, _bytes: &[u8]) -> Result<String> {
        Err(Error::DependencyFailed {
            dependency: "blob store",
            message: "connection refused".to_string(),
        })
    }
}

/// Mailer recording messages instead of sending them.
#[derive(Debug, Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<OutgoingEmail>>,
    fail: bool,
}

impl RecordingMailer {
    /// Mailer whose relay rejects every message.
    pub fn failing() -> Self {
        Self {
            sent: Mutex::default(),
            fail: true,
        }
    }

    /// Messages delivered so far.
    pub fn sent(&self) -> Vec<OutgoingEmail> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, _settings: &email_settings::Model, message: &OutgoingEmail) -> Result<()> {
        if self.fail {
            return Err(Error::DependencyFailed {
                dependency: "smtp relay",
                message: "relay refused the message".to_string(),
            });
        }
        self.sent.lock().unwrap().push(message.clone());
        Ok(())
    }
}
