//! Inventory decrement provider trait.

use invoicing_core::error::Result;
use invoicing_core::invoice::InvoiceId;

/// External inventory service.
///
/// The decrement for a paid invoice is at-least-once with no compensation:
/// a failure is persisted as `stock_update_status = failed` and surfaced to
/// operators, never retried automatically and never rolling back the paid
/// status.
pub trait InventoryProvider: Send + Sync {
    /// Decrement stock for every product-backed line on the invoice.
    ///
    /// # Errors
    ///
    /// Returns [`invoicing_core::error::EngineError::Inventory`] when the
    /// decrement fails.
    fn decrement_for_invoice(&self, id: InvoiceId) -> impl Future<Output = Result<()>> + Send;
}
