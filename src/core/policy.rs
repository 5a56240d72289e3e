//! Role policy - the pure decision table behind every ledger entry point.
//!
//! [`authorize`] maps a role and an operation to a [`Decision`]. It performs no I/O;
//! the tenancy layer feeds it the role read from the datastore on each request.

use crate::entities::Role;
use std::fmt;

/// Operations gated by the role policy.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Operation {
    /// Read clients, products, invoices, expenses, debts and reports
    ViewLedger,
    /// Create a client
    CreateClient,
    /// Edit an existing client
    UpdateClient,
    /// Delete a client
    DeleteClient,
    /// Create a product
    CreateProduct,
    /// Delete a product
    DeleteProduct,
    /// Issue an invoice with its items
    CreateInvoice,
    /// Move an invoice between Draft, Pending and Paid
    UpdateInvoiceStatus,
    /// Delete an invoice and its items
    DeleteInvoice,
    /// Email an invoice to a client
    SendInvoice,
    /// Record an expense
    ManageExpense,
    /// Create debts and pay installments
    ManageDebt,
    /// Edit workspace name, address, tax id and logo
    ManageWorkspace,
    /// Configure SMTP credentials
    ManageEmailSettings,
    /// Change other members' roles and list the team
    ManageTeam,
    /// Approve or reject resource requests
    ResolveRequest,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::ViewLedger => "viewing the ledger",
            Self::CreateClient => "creating a client",
            Self::UpdateClient => "updating a client",
            Self::DeleteClient => "deleting a client",
            Self::CreateProduct => "creating a product",
            Self::DeleteProduct => "deleting a product",
            Self::CreateInvoice => "creating an invoice",
            Self::UpdateInvoiceStatus => "updating an invoice status",
            Self::DeleteInvoice => "deleting an invoice",
            Self::SendInvoice => "sending an invoice",
            Self::ManageExpense => "recording an expense",
            Self::ManageDebt => "managing debts",
            Self::ManageWorkspace => "editing workspace settings",
            Self::ManageEmailSettings => "editing email settings",
            Self::ManageTeam => "managing team roles",
            Self::ResolveRequest => "resolving a request",
        };
        f.write_str(name)
    }
}

/// Outcome of a policy check.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Decision {
    /// The caller may perform the write directly
    Allow,
    /// The caller may only propose it through the request queue
    AllowViaRequest,
    /// The caller may not perform it at all
    Deny,
}

/// Pages of the application, used to gate navigation for pending members.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Page {
    /// Financial overview
    Dashboard,
    /// Invoice list and builder
    Invoices,
    /// Client list
    Clients,
    /// Product catalog
    Products,
    /// Expenses and debts
    Expenses,
    /// Charts and exports
    Reports,
    /// Workspace, email and team settings
    Settings,
    /// "Waiting for approval" screen
    Waiting,
}

/// Decides whether `role` may perform `operation`.
#[must_use]
pub const fn authorize(role: Role, operation: Operation) -> Decision {
    match role {
        Role::Admin => Decision::Allow,
        Role::Editor => match operation {
            Operation::CreateClient | Operation::CreateProduct => Decision::AllowViaRequest,
            Operation::ViewLedger
            | Operation::CreateInvoice
            | Operation::UpdateInvoiceStatus
            | Operation::SendInvoice
            | Operation::ManageExpense
            | Operation::ManageDebt
            | Operation::ManageWorkspace => Decision::Allow,
            Operation::UpdateClient
            | Operation::DeleteClient
            | Operation::DeleteProduct
            | Operation::DeleteInvoice
            | Operation::ManageEmailSettings
            | Operation::ManageTeam
            | Operation::ResolveRequest => Decision::Deny,
        },
        Role::Viewer => match operation {
            Operation::ViewLedger => Decision::Allow,
            _ => Decision::Deny,
        },
        Role::Pending => Decision::Deny,
    }
}

/// Whether `role` may open `page`. Pending members only see the waiting screen
/// and settings, so they can find an admin to admit them.
#[must_use]
pub const fn can_access(role: Role, page: Page) -> bool {
    match role {
        Role::Pending => matches!(page, Page::Waiting | Page::Settings),
        Role::Viewer | Role::Editor | Role::Admin => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MUTATIONS: [Operation; 6] = [
        Operation::CreateClient,
        Operation::DeleteClient,
        Operation::CreateInvoice,
        Operation::UpdateInvoiceStatus,
        Operation::ManageDebt,
        Operation::ManageTeam,
    ];

    #[test]
    fn test_admin_allowed_everything() {
        for op in MUTATIONS {
            assert_eq!(authorize(Role::Admin, op), Decision::Allow, "{op}");
        }
        assert_eq!(authorize(Role::Admin, Operation::ResolveRequest), Decision::Allow);
    }

    #[test]
    fn test_editor_table() {
        assert_eq!(
            authorize(Role::Editor, Operation::CreateClient),
            Decision::AllowViaRequest
        );
        assert_eq!(
            authorize(Role::Editor, Operation::CreateProduct),
            Decision::AllowViaRequest
        );
        assert_eq!(authorize(Role::Editor, Operation::DeleteClient), Decision::Deny);
        assert_eq!(authorize(Role::Editor, Operation::DeleteProduct), Decision::Deny);
        assert_eq!(authorize(Role::Editor, Operation::CreateInvoice), Decision::Allow);
        assert_eq!(
            authorize(Role::Editor, Operation::UpdateInvoiceStatus),
            Decision::Allow
        );
        assert_eq!(authorize(Role::Editor, Operation::ManageDebt), Decision::Allow);
        assert_eq!(authorize(Role::Editor, Operation::ManageExpense), Decision::Allow);
        assert_eq!(authorize(Role::Editor, Operation::ManageTeam), Decision::Deny);
    }

    #[test]
    fn test_viewer_and_pending_denied_all_mutations() {
        for op in MUTATIONS {
            assert_eq!(authorize(Role::Viewer, op), Decision::Deny, "{op}");
            assert_eq!(authorize(Role::Pending, op), Decision::Deny, "{op}");
        }
        assert_eq!(authorize(Role::Viewer, Operation::ViewLedger), Decision::Allow);
        assert_eq!(authorize(Role::Pending, Operation::ViewLedger), Decision::Deny);
    }

    #[test]
    fn test_pending_navigation_gate() {
        assert!(can_access(Role::Pending, Page::Waiting));
        assert!(can_access(Role::Pending, Page::Settings));
        assert!(!can_access(Role::Pending, Page::Dashboard));
        assert!(!can_access(Role::Pending, Page::Invoices));
        assert!(can_access(Role::Viewer, Page::Reports));
    }
}
