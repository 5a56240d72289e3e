//! Entity module - Contains all SeaORM entity definitions for the ledger.
//! These entities represent the database tables and their relationships.
//! Each entity has a Model struct for data and an Entity struct for operations.

pub mod client;
pub mod debt;
pub mod email_settings;
pub mod expense;
pub mod invoice;
pub mod invoice_item;
pub mod product;
pub mod profile;
pub mod resource_request;
pub mod workspace;

// Re-export specific types to avoid conflicts
pub use client::{Column as ClientColumn, Entity as Client, Model as ClientModel};
pub use debt::{Column as DebtColumn, DebtStatus, Entity as Debt, Model as DebtModel};
pub use email_settings::{
    Column as EmailSettingsColumn, Entity as EmailSettings, Model as EmailSettingsModel,
};
pub use expense::{Column as ExpenseColumn, DEBT_CATEGORY, Entity as Expense, Model as ExpenseModel};
pub use invoice::{Column as InvoiceColumn, Entity as Invoice, InvoiceStatus, Model as InvoiceModel};
pub use invoice_item::{
    Column as InvoiceItemColumn, Entity as InvoiceItem, Model as InvoiceItemModel,
};
pub use product::{Column as ProductColumn, Entity as Product, Model as ProductModel};
pub use profile::{Column as ProfileColumn, Entity as Profile, Model as ProfileModel, Role};
pub use resource_request::{
    ClientProposal, Column as ResourceRequestColumn, Entity as ResourceRequest,
    Model as ResourceRequestModel, ProductProposal, RequestKind, RequestStatus, ResourceProposal,
};
pub use workspace::{Column as WorkspaceColumn, Entity as Workspace, Model as WorkspaceModel};
