//! Unified error types for the ledger.
//!
//! Every core operation returns [`Result`]. Authorization failures are raised
//! before any write is issued, so `Unauthenticated` and `Forbidden` never leave
//! partial state behind.

use thiserror::Error;

/// Crate-wide error type.
#[derive(Debug, Error)]
pub enum Error {
    /// No identity could be resolved for the request.
    #[error("Not authenticated")]
    Unauthenticated,

    /// The caller owns no workspace and the flow must not provision one.
    #[error("No workspace found for the current user")]
    NoWorkspace,

    /// The role policy denied the operation.
    #[error("Forbidden: {operation} is not allowed for this role")]
    Forbidden {
        /// Human-readable name of the denied operation
        operation: String,
    },

    /// A referenced record does not exist in the caller's workspace.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// Entity kind (e.g. "client", "invoice")
        entity: &'static str,
        /// Identifier that was looked up
        id: String,
    },

    /// A required field is missing or malformed.
    #[error("Invalid {field}: {message}")]
    ValidationFailed {
        /// Offending field
        field: &'static str,
        /// What is wrong with it
        message: String,
    },

    /// A money or quantity value is non-finite or out of range.
    #[error("Invalid {field}: {amount}")]
    InvalidAmount {
        /// Offending field
        field: &'static str,
        /// The rejected value
        amount: f64,
    },

    /// The invoice number is already used in this workspace.
    #[error("Invoice number already used: {number}")]
    DuplicateInvoiceNumber {
        /// The conflicting number
        number: String,
    },

    /// An external collaborator (blob store, SMTP relay) failed.
    #[error("{dependency} unavailable: {message}")]
    DependencyFailed {
        /// Name of the collaborator
        dependency: &'static str,
        /// Underlying failure
        message: String,
    },

    /// One step of a compound write committed and a later step failed.
    #[error("{operation} partially failed: {completed} succeeded but {failed}")]
    PartialFailure {
        /// The compound operation
        operation: &'static str,
        /// Step that was left in place
        completed: String,
        /// Step that failed
        failed: String,
    },

    /// Configuration could not be loaded.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the problem
        message: String,
    },

    /// Datastore error.
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    /// I/O error (local blob directory, config file).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub(crate) fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub(crate) fn validation(field: &'static str, message: impl Into<String>) -> Self {
        Self::ValidationFailed {
            field,
            message: message.into(),
        }
    }

    /// Short message suitable for showing next to the attempted action.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Unauthenticated => "Please sign in to continue.".to_string(),
            Self::NoWorkspace => "Set up your workspace in settings first.".to_string(),
            Self::Forbidden { .. } => "You do not have permission to do this.".to_string(),
            Self::NotFound { entity, .. } => format!("The requested {entity} no longer exists."),
            Self::ValidationFailed { .. }
            | Self::InvalidAmount { .. }
            | Self::DuplicateInvoiceNumber { .. } => self.to_string(),
            Self::DependencyFailed { dependency, .. } => {
                format!("The {dependency} service is unavailable, please retry later.")
            }
            Self::PartialFailure { operation, .. } => {
                format!("{operation} did not complete; please check your records.")
            }
            Self::Config { .. } | Self::Database(_) | Self::Io(_) => {
                "An internal error occurred.".to_string()
            }
        }
    }
}

/// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;
