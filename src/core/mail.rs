//! SMTP relay seam and invoice emails.
//!
//! Each workspace admin stores their own relay credentials; [`send_invoice_email`]
//! refuses to send without them or without a recipient. Rendering the invoice body is
//! up to the caller, this module only delivers the HTML it is given.

use crate::{
    config::AppConfig,
    core::{
        policy::Operation,
        tenancy::{self, AuthContext},
    },
    entities::{EmailSettings, email_settings},
    errors::{Error, Result},
};
use async_trait::async_trait;
use lettre::{
    Address, Message, SmtpTransport, Transport,
    message::{Mailbox, header::ContentType},
    transport::smtp::authentication::Credentials,
};
use sea_orm::prelude::*;
use std::time::Duration;
use tracing::{error, info};

/// Port on which relays expect TLS from the first byte instead of STARTTLS.
const IMPLICIT_TLS_PORT: i32 = 465;

/// A message ready for the relay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingEmail {
    /// Display name of the sender
    pub sender_name: String,
    /// Recipient address
    pub to: String,
    /// Optional copy address
    pub cc: Option<String>,
    /// Subject line
    pub subject: String,
    /// HTML body
    pub html: String,
}

/// SMTP relay contract.
#[async_trait]
pub trait Mailer: Send + Sync {
    /// Delivers `message` through the relay described by `settings`.
    async fn send(&self, settings: &email_settings::Model, message: &OutgoingEmail) -> Result<()>;
}

/// Mailer talking to the configured relay with `lettre`.
#[derive(Debug, Clone)]
pub struct SmtpMailer {
    timeout: Duration,
}

impl Default for SmtpMailer {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
        }
    }
}

fn relay_error(e: impl std::fmt::Display) -> Error {
    Error::DependencyFailed {
        dependency: "smtp relay",
        message: e.to_string(),
    }
}

fn mailbox(field: &'static str, name: Option<String>, address: &str) -> Result<Mailbox> {
    let address = address
        .trim()
        .parse::<Address>()
        .map_err(|e| Error::validation(field, format!("'{address}': {e}")))?;
    Ok(Mailbox::new(name, address))
}

impl SmtpMailer {
    fn transport(&self, settings: &email_settings::Model) -> Result<SmtpTransport> {
        let builder = if settings.smtp_port == IMPLICIT_TLS_PORT {
            SmtpTransport::relay(&settings.smtp_host)
        } else {
            SmtpTransport::starttls_relay(&settings.smtp_host)
        }
        .map_err(relay_error)?;
        let port = u16::try_from(settings.smtp_port)
            .map_err(|_| Error::validation("smtp_port", settings.smtp_port.to_string()))?;
        Ok(builder
            .port(port)
            .credentials(Credentials::new(
                settings.smtp_user.clone(),
                settings.smtp_password.clone(),
            ))
            .timeout(Some(self.timeout))
            .build())
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, settings: &email_settings::Model, message: &OutgoingEmail) -> Result<()> {
        let from = mailbox("smtp_user", Some(message.sender_name.clone()), &settings.smtp_user)?;
        let mut builder = Message::builder()
            .from(from)
            .to(mailbox("to", None, &message.to)?)
            .subject(message.subject.clone());
        if let Some(cc) = &message.cc {
            builder = builder.cc(mailbox("cc", None, cc)?);
        }
        let email = builder
            .header(ContentType::TEXT_HTML)
            .body(message.html.clone())
            .map_err(relay_error)?;

        let transport = self.transport(settings)?;
        tokio::task::spawn_blocking(move || transport.send(&email))
            .await
            .map_err(relay_error)?
            .map_err(relay_error)?;
        Ok(())
    }
}

/// Invoice email as composed by the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvoiceEmail {
    /// Recipient address, usually the client's email
    pub to: String,
    /// Optional copy address
    pub cc: Option<String>,
    /// Subject line
    pub subject: String,
    /// Rendered invoice
    pub html: String,
}

/// Sends an invoice through the workspace's relay.
///
/// # Errors
/// Returns an error if:
/// - The recipient is blank (`ValidationFailed`)
/// - The caller has no workspace or no email settings
/// - The relay rejects or cannot be reached (`DependencyFailed`)
pub async fn send_invoice_email(
    db: &DatabaseConnection,
    ctx: &AuthContext,
    config: &AppConfig,
    email: InvoiceEmail,
    mailer: &dyn Mailer,
) -> Result<()> {
    ctx.require_direct(Operation::SendInvoice)?;
    let to = email.to.trim().to_string();
    if to.is_empty() {
        return Err(Error::validation("to", "the invoice has no recipient address"));
    }

    let workspace = tenancy::require_workspace(db, ctx).await?;
    let settings = EmailSettings::find()
        .filter(email_settings::Column::WorkspaceId.eq(workspace.id))
        .one(db)
        .await?
        .ok_or_else(|| Error::DependencyFailed {
            dependency: "smtp relay",
            message: "email settings are not configured for this workspace".to_string(),
        })?;

    let message = OutgoingEmail {
        sender_name: settings
            .sender_name
            .clone()
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| config.invoicing.default_sender_name.clone()),
        to,
        cc: email.cc.filter(|c| !c.trim().is_empty()),
        subject: email.subject,
        html: email.html,
    };
    if let Err(e) = mailer.send(&settings, &message).await {
        error!(workspace_id = workspace.id, error = %e, "Invoice email failed");
        return Err(e);
    }
    info!(workspace_id = workspace.id, to = %message.to, "Invoice email sent");
    Ok(())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::core::settings::{EmailSettingsInput, save_email_settings};
    use crate::entities::Role;
    use crate::test_utils::*;

    fn invoice_email(to: &str) -> InvoiceEmail {
        InvoiceEmail {
            to: to.to_string(),
            cc: None,
            subject: "Invoice INV-2026-0001".to_string(),
            html: "<p>Please find your invoice.</p>".to_string(),
        }
    }

    fn relay_settings() -> EmailSettingsInput {
        EmailSettingsInput {
            smtp_host: "smtp.example.com".to_string(),
            smtp_port: 587,
            smtp_user: "billing@example.com".to_string(),
            smtp_password: "secret".to_string(),
            sender_name: Some("Atelier Nord".to_string()),
        }
    }

    #[tokio::test]
    async fn test_refuses_without_settings() -> Result<()> {
        let db = setup_test_db().await?;
        let (admin, _) = admin_with_workspace(&db, "admin").await?;
        let mailer = RecordingMailer::default();

        let result = send_invoice_email(
            &db,
            &admin,
            &AppConfig::default(),
            invoice_email("client@example.com"),
            &mailer,
        )
        .await;

        assert!(matches!(result, Err(Error::DependencyFailed { .. })));
        assert!(mailer.sent().is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_refuses_without_recipient() -> Result<()> {
        let db = setup_test_db().await?;
        let (admin, _) = admin_with_workspace(&db, "admin").await?;
        let config = AppConfig::default();
        save_email_settings(&db, &admin, &config, relay_settings()).await?;
        let mailer = RecordingMailer::default();

        let result = send_invoice_email(&db, &admin, &config, invoice_email("  "), &mailer).await;

        assert!(matches!(result, Err(Error::ValidationFailed { field: "to", .. })));
        assert!(mailer.sent().is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_sends_with_configured_sender() -> Result<()> {
        let db = setup_test_db().await?;
        let (admin, _) = admin_with_workspace(&db, "admin").await?;
        let config = AppConfig::default();
        save_email_settings(&db, &admin, &config, relay_settings()).await?;
        let mailer = RecordingMailer::default();

        send_invoice_email(&db, &admin, &config, invoice_email("client@example.com"), &mailer)
            .await?;

        let sent = mailer.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].sender_name, "Atelier Nord");
        assert_eq!(sent[0].to, "client@example.com");
        Ok(())
    }

    #[tokio::test]
    async fn test_relay_failure_is_fatal() -> Result<()> {
        let db = setup_test_db().await?;
        let (admin, _) = admin_with_workspace(&db, "admin").await?;
        let config = AppConfig::default();
        save_email_settings(&db, &admin, &config, relay_settings()).await?;

        let result = send_invoice_email(
            &db,
            &admin,
            &config,
            invoice_email("client@example.com"),
            &RecordingMailer::failing(),
        )
        .await;
        assert!(matches!(result, Err(Error::DependencyFailed { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_viewer_cannot_send() -> Result<()> {
        let db = setup_test_db().await?;
        let viewer = context_with_role(&db, "viewer", Role::Viewer).await?;
        let result = send_invoice_email(
            &db,
            &viewer,
            &AppConfig::default(),
            invoice_email("client@example.com"),
            &RecordingMailer::default(),
        )
        .await;
        assert!(matches!(result, Err(Error::Forbidden { .. })));
        Ok(())
    }

    #[test]
    fn test_mailbox_rejects_bad_address() {
        assert!(matches!(
            mailbox("to", None, "not an address"),
            Err(Error::ValidationFailed { field: "to", .. })
        ));
        assert!(mailbox("to", None, " client@example.com ").is_ok());
    }
}
