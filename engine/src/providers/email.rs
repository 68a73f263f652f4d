//! Transactional email provider trait.

use invoicing_core::error::EmailError;
use invoicing_core::invoice::InvoiceId;

/// What the email service needs to render and address one send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailRequest {
    /// Invoice the email is about
    pub invoice_id: InvoiceId,
    /// Recipient address
    pub recipient: String,
    /// Human-readable invoice number for the subject line
    pub invoice_number: String,
    /// Public token embedded in the customer-facing link
    pub public_token: String,
    /// Invoice total in cents
    pub total_cents: i64,
}

/// Successful dispatch acknowledgement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailReceipt {
    /// Upstream message id
    pub message_id: String,
}

/// Email dispatch service.
///
/// Implementations map the upstream response codes onto [`EmailError`]:
/// 429 → `RateLimited` (with the server's `cooldown_remaining`),
/// 401/403 → `Auth`, 404 → `InvoiceNotFound`, 503/504 → `Unavailable`.
/// The engine adds its own `Timeout` when the 35-second dispatch budget
/// elapses; the call is then failed-but-uncertain and never auto-retried.
pub trait EmailProvider: Send + Sync {
    /// Dispatch the invoice email.
    ///
    /// # Errors
    ///
    /// Returns the mapped [`EmailError`] for any non-success response.
    fn send_invoice_email(
        &self,
        request: &EmailRequest,
    ) -> impl Future<Output = Result<EmailReceipt, EmailError>> + Send;

    /// Dispatch a payment reminder email.
    ///
    /// # Errors
    ///
    /// Returns the mapped [`EmailError`] for any non-success response.
    fn send_reminder_email(
        &self,
        request: &EmailRequest,
    ) -> impl Future<Output = Result<EmailReceipt, EmailError>> + Send;
}
