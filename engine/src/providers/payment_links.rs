//! Payment-link issuance provider trait.

use invoicing_core::error::Result;
use invoicing_core::invoice::Invoice;

/// Response from the payment-link service.
///
/// The URL may be absent even on success: some backends persist the link on
/// the invoice record out-of-band and return only the link id. Callers must
/// re-read the invoice in that case rather than treat it as a failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentLinkResponse {
    /// Hosted payment URL, when returned inline
    pub url: Option<String>,
    /// Upstream link id
    pub link_id: String,
}

/// Payment-link issuance service.
///
/// Issuance is idempotent by construction on the engine side: the
/// orchestrator checks `stripe_payment_link` before every call and never
/// requests a second link for the same invoice.
pub trait PaymentLinkProvider: Send + Sync {
    /// Request a hosted payment link for the invoice.
    ///
    /// # Errors
    ///
    /// Returns [`invoicing_core::error::EngineError::PaymentLink`] when the
    /// service rejects the request.
    fn create_link(&self, invoice: &Invoice)
    -> impl Future<Output = Result<PaymentLinkResponse>> + Send;
}
