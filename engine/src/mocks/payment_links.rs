//! Mock payment-link provider for testing.

use crate::providers::{PaymentLinkProvider, PaymentLinkResponse};
use invoicing_core::error::{EngineError, Result};
use invoicing_core::invoice::Invoice;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// How the mock responds to issuance requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LinkMode {
    /// Return the URL inline
    #[default]
    InlineUrl,
    /// Return only the link id; the URL is "persisted out-of-band"
    OutOfBand,
    /// Reject the request
    Fail,
}

/// Scriptable payment-link provider with a call counter.
#[derive(Debug, Clone, Default)]
pub struct MockPaymentLinkProvider {
    mode: Arc<Mutex<LinkMode>>,
    calls: Arc<AtomicUsize>,
}

impl MockPaymentLinkProvider {
    /// Create a provider that returns URLs inline.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Switch the response mode.
    pub fn set_mode(&self, mode: LinkMode) {
        *self
            .mode
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner) = mode;
    }

    /// Number of issuance calls made.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::Acquire)
    }
}

impl PaymentLinkProvider for MockPaymentLinkProvider {
    async fn create_link(&self, invoice: &Invoice) -> Result<PaymentLinkResponse> {
        let n = self.calls.fetch_add(1, Ordering::AcqRel) + 1;
        let mode = *self
            .mode
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);

        match mode {
            LinkMode::InlineUrl => Ok(PaymentLinkResponse {
                url: Some(format!("https://pay.example/{}", invoice.public_token)),
                link_id: format!("plink-{n}"),
            }),
            LinkMode::OutOfBand => Ok(PaymentLinkResponse {
                url: None,
                link_id: format!("plink-{n}"),
            }),
            LinkMode::Fail => Err(EngineError::PaymentLink {
                reason: "gateway rejected request".to_string(),
            }),
        }
    }
}
