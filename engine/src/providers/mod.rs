//! External collaborator traits.
//!
//! The engine never talks to a database, payment gateway, inventory system,
//! or email service directly. Each collaborator is a trait here, injected
//! through the [`crate::environment::LifecycleEnvironment`], so the state
//! machine and orchestrator stay deterministic under test and the hosted
//! backend stays swappable.

mod blacklist;
mod email;
mod inventory;
mod invoice_store;
mod notification_store;
mod payment_links;

pub use blacklist::{BlacklistDirectory, BlacklistRecord};
pub use email::{EmailProvider, EmailReceipt, EmailRequest};
pub use inventory::InventoryProvider;
pub use invoice_store::InvoiceStore;
pub use notification_store::NotificationStore;
pub use payment_links::{PaymentLinkProvider, PaymentLinkResponse};
