//! Mock inventory provider for testing.

use crate::providers::InventoryProvider;
use invoicing_core::error::{EngineError, Result};
use invoicing_core::invoice::InvoiceId;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// Scriptable inventory service with a call counter.
///
/// The counter is what the idempotency tests assert on: a double
/// mark-as-paid must reach this service exactly once.
#[derive(Debug, Clone, Default)]
pub struct MockInventoryProvider {
    fail: Arc<AtomicBool>,
    calls: Arc<AtomicUsize>,
}

impl MockInventoryProvider {
    /// Create a provider that always succeeds.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent decrement fail.
    pub fn set_fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::Release);
    }

    /// Number of decrement calls made.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::Acquire)
    }
}

impl InventoryProvider for MockInventoryProvider {
    async fn decrement_for_invoice(&self, id: InvoiceId) -> Result<()> {
        self.calls.fetch_add(1, Ordering::AcqRel);
        if self.fail.load(Ordering::Acquire) {
            tracing::debug!(%id, "Mock inventory failure");
            return Err(EngineError::Inventory {
                reason: "inventory service unavailable".to_string(),
            });
        }
        Ok(())
    }
}
