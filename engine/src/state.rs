//! In-memory working state for the lifecycle reducer.

use invoicing_core::error::EngineError;
use invoicing_core::invoice::{Invoice, InvoiceId, InvoiceStatus};
use std::collections::HashMap;

/// The session's working set of invoices.
///
/// Mirrors the external store: commands mutate this copy synchronously and
/// the orchestrator persists the matching record. External changes arrive
/// as actions and are applied the same way, so a full refetch is always a
/// safe way to reconcile.
#[derive(Debug, Clone, Default)]
pub struct LifecycleState {
    /// Invoices currently loaded into the session
    pub invoices: HashMap<InvoiceId, Invoice>,
    /// Most recent command failure, for surfacing to the caller
    pub last_error: Option<EngineError>,
}

impl LifecycleState {
    /// Empty state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a batch of invoices (initial fetch or refetch).
    pub fn load(&mut self, invoices: impl IntoIterator<Item = Invoice>) {
        for invoice in invoices {
            self.invoices.insert(invoice.id, invoice);
        }
    }

    /// Look up one invoice.
    #[must_use]
    pub fn get(&self, id: InvoiceId) -> Option<&Invoice> {
        self.invoices.get(&id)
    }

    /// Current status of an invoice, if loaded.
    #[must_use]
    pub fn status_of(&self, id: InvoiceId) -> Option<InvoiceStatus> {
        self.invoices.get(&id).map(|i| i.status)
    }
}
