//! Customer blacklist directory trait.

use invoicing_core::error::Result;

/// A customer record flagged for caution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlacklistRecord {
    /// Flagged email address
    pub customer_email: String,
    /// Flagged customer name
    pub customer_name: String,
    /// Why the customer was flagged
    pub reason: String,
}

/// Read-only blacklist lookup, consulted before the first send.
pub trait BlacklistDirectory: Send + Sync {
    /// Find a record matching the customer.
    ///
    /// Matching is an exact, case-insensitive comparison on the customer
    /// email OR the customer name.
    ///
    /// # Errors
    ///
    /// Returns [`invoicing_core::error::EngineError::Store`] on a backend
    /// failure; the send is blocked in that case.
    fn find_match(
        &self,
        customer_email: &str,
        customer_name: &str,
    ) -> impl Future<Output = Result<Option<BlacklistRecord>>> + Send;
}
