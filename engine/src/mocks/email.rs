//! Mock email provider for testing.

use crate::providers::{EmailProvider, EmailReceipt, EmailRequest};
use invoicing_core::error::EmailError;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Scriptable email provider.
///
/// Succeeds by default. Tests can inject a failure for every subsequent
/// dispatch, or a response delay to exercise the dispatch timeout. Every
/// attempt is recorded, invoice and reminder sends separately.
#[derive(Debug, Clone, Default)]
pub struct MockEmailProvider {
    outcome: Arc<Mutex<Option<EmailError>>>,
    delay: Arc<Mutex<Option<Duration>>>,
    invoice_requests: Arc<Mutex<Vec<EmailRequest>>>,
    reminder_requests: Arc<Mutex<Vec<EmailRequest>>>,
    dispatched: Arc<AtomicUsize>,
}

impl MockEmailProvider {
    /// Create a provider that always succeeds.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail every subsequent dispatch with the given error.
    pub fn fail_with(&self, error: EmailError) {
        *self
            .outcome
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner) = Some(error);
    }

    /// Go back to succeeding.
    pub fn succeed(&self) {
        *self
            .outcome
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner) = None;
    }

    /// Delay every response, for driving the dispatch timeout.
    pub fn respond_after(&self, delay: Duration) {
        *self
            .delay
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner) = Some(delay);
    }

    /// Recorded invoice email attempts.
    #[must_use]
    pub fn invoice_requests(&self) -> Vec<EmailRequest> {
        self.invoice_requests
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }

    /// Recorded reminder email attempts.
    #[must_use]
    pub fn reminder_requests(&self) -> Vec<EmailRequest> {
        self.reminder_requests
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }

    async fn dispatch(&self, request: &EmailRequest) -> Result<EmailReceipt, EmailError> {
        let delay = *self
            .delay
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let outcome = self
            .outcome
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone();
        if let Some(error) = outcome {
            tracing::debug!(invoice = %request.invoice_number, %error, "Mock email failure");
            return Err(error);
        }

        let n = self.dispatched.fetch_add(1, Ordering::AcqRel) + 1;
        tracing::debug!(invoice = %request.invoice_number, "Mock email dispatched");
        Ok(EmailReceipt {
            message_id: format!("msg-{n}"),
        })
    }
}

impl EmailProvider for MockEmailProvider {
    async fn send_invoice_email(&self, request: &EmailRequest) -> Result<EmailReceipt, EmailError> {
        self.invoice_requests
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push(request.clone());
        self.dispatch(request).await
    }

    async fn send_reminder_email(
        &self,
        request: &EmailRequest,
    ) -> Result<EmailReceipt, EmailError> {
        self.reminder_requests
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push(request.clone());
        self.dispatch(request).await
    }
}
