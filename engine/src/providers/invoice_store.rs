//! Invoice store adapter trait.

use invoicing_core::error::Result;
use invoicing_core::invoice::{Invoice, InvoiceId, UserId};

/// External transactional store for invoice records.
///
/// Atomic at single-record granularity only; the engine never assumes
/// multi-record transactions. Line items are part of the record and are
/// written as a whole set with it.
pub trait InvoiceStore: Send + Sync {
    /// Read one invoice.
    ///
    /// # Errors
    ///
    /// Returns [`invoicing_core::error::EngineError::Store`] on a backend
    /// failure.
    fn get(&self, id: InvoiceId) -> impl Future<Output = Result<Option<Invoice>>> + Send;

    /// Insert a new invoice.
    ///
    /// # Errors
    ///
    /// Returns
    /// [`invoicing_core::error::EngineError::DuplicateInvoiceNumber`] when
    /// the human-readable number is already taken, or `Store` on a backend
    /// failure.
    fn insert(&self, invoice: Invoice) -> impl Future<Output = Result<()>> + Send;

    /// Overwrite an existing invoice (last writer wins).
    ///
    /// # Errors
    ///
    /// Returns [`invoicing_core::error::EngineError::InvoiceNotFound`] when
    /// the record does not exist, or `Store` on a backend failure.
    fn update(&self, invoice: Invoice) -> impl Future<Output = Result<()>> + Send;

    /// Delete an invoice record.
    ///
    /// # Errors
    ///
    /// Returns [`invoicing_core::error::EngineError::Store`] on a backend
    /// failure. Deleting a missing record is not an error.
    fn delete(&self, id: InvoiceId) -> impl Future<Output = Result<()>> + Send;

    /// All invoices, for elevated digest scans.
    ///
    /// # Errors
    ///
    /// Returns [`invoicing_core::error::EngineError::Store`] on a backend
    /// failure.
    fn list(&self) -> impl Future<Output = Result<Vec<Invoice>>> + Send;

    /// One user's invoices.
    ///
    /// # Errors
    ///
    /// Returns [`invoicing_core::error::EngineError::Store`] on a backend
    /// failure.
    fn list_by_owner(&self, owner: &UserId) -> impl Future<Output = Result<Vec<Invoice>>> + Send;
}
