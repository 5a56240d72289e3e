//! Core business logic - framework-agnostic ledger, policy and reporting operations.

/// Client management
pub mod client;
/// Debts and installment payments
pub mod debt;
/// Expense recording
pub mod expense;
/// Invoice creation, numbering and status
pub mod invoice;
/// SMTP relay seam and invoice emails
pub mod mail;
/// Role policy decision table
pub mod policy;
/// Product catalog
pub mod product;
/// Aggregated financial views
pub mod report;
/// Resource request queue
pub mod request;
/// Workspace and email settings
pub mod settings;
/// Blob store seam
pub mod storage;
/// Profiles and team roles
pub mod team;
/// Identity and workspace resolution
pub mod tenancy;

use crate::errors::{Error, Result};

/// Result of a write whose side uploads may have failed without failing the write.
#[derive(Debug, Clone, PartialEq)]
pub struct Recorded<T> {
    /// The stored record
    pub record: T,
    /// Human-readable notes about non-fatal failures
    pub warnings: Vec<String>,
}

/// Rejects non-finite and non-positive money or quantity values.
pub(crate) fn positive_amount(field: &'static str, amount: f64) -> Result<f64> {
    if !amount.is_finite() || amount <= 0.0 {
        return Err(Error::InvalidAmount { field, amount });
    }
    Ok(amount)
}

/// Rejects non-finite and negative money values.
pub(crate) fn non_negative_amount(field: &'static str, amount: f64) -> Result<f64> {
    if !amount.is_finite() || amount < 0.0 {
        return Err(Error::InvalidAmount { field, amount });
    }
    Ok(amount)
}
