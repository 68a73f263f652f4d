//! In-memory invoice store for testing.

use crate::providers::InvoiceStore;
use invoicing_core::error::{EngineError, Result};
use invoicing_core::invoice::{Invoice, InvoiceId, UserId};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

/// In-memory invoice store.
///
/// Enforces `invoice_number` uniqueness on insert, like the real backend.
/// Clones share the same records.
#[derive(Debug, Clone, Default)]
pub struct MemoryInvoiceStore {
    records: Arc<Mutex<HashMap<InvoiceId, Invoice>>>,
    fail_writes: Arc<AtomicBool>,
}

impl MemoryInvoiceStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent write fail with a store error.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::Release);
    }

    fn check_writable(&self) -> Result<()> {
        if self.fail_writes.load(Ordering::Acquire) {
            return Err(EngineError::Store {
                reason: "injected write failure".to_string(),
            });
        }
        Ok(())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<InvoiceId, Invoice>> {
        self.records
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl InvoiceStore for MemoryInvoiceStore {
    async fn get(&self, id: InvoiceId) -> Result<Option<Invoice>> {
        Ok(self.lock().get(&id).cloned())
    }

    async fn insert(&self, invoice: Invoice) -> Result<()> {
        self.check_writable()?;
        let mut records = self.lock();
        let duplicate = records
            .values()
            .any(|existing| existing.invoice_number == invoice.invoice_number);
        if duplicate {
            return Err(EngineError::DuplicateInvoiceNumber {
                invoice_number: invoice.invoice_number,
            });
        }
        tracing::debug!(invoice = %invoice.invoice_number, "Mock store insert");
        records.insert(invoice.id, invoice);
        Ok(())
    }

    async fn update(&self, invoice: Invoice) -> Result<()> {
        self.check_writable()?;
        let mut records = self.lock();
        if !records.contains_key(&invoice.id) {
            return Err(EngineError::InvoiceNotFound);
        }
        records.insert(invoice.id, invoice);
        Ok(())
    }

    async fn delete(&self, id: InvoiceId) -> Result<()> {
        self.check_writable()?;
        self.lock().remove(&id);
        Ok(())
    }

    async fn list(&self) -> Result<Vec<Invoice>> {
        Ok(self.lock().values().cloned().collect())
    }

    async fn list_by_owner(&self, owner: &UserId) -> Result<Vec<Invoice>> {
        Ok(self
            .lock()
            .values()
            .filter(|invoice| &invoice.user_id == owner)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)] // Test code can unwrap

    use super::*;
    use chrono::Utc;
    use invoicing_core::invoice::{Caller, Role};

    #[tokio::test]
    async fn insert_rejects_duplicate_numbers() {
        let store = MemoryInvoiceStore::new();
        let caller = Caller::new("u", Role::Employee);

        let first = Invoice::new("INV-1", "A", "a@b.co", 0, &caller, Utc::now());
        let second = Invoice::new("INV-1", "B", "b@b.co", 0, &caller, Utc::now());

        store.insert(first).await.unwrap();
        assert!(matches!(
            store.insert(second).await,
            Err(EngineError::DuplicateInvoiceNumber { .. })
        ));
    }

    #[tokio::test]
    async fn update_requires_existing_record() {
        let store = MemoryInvoiceStore::new();
        let caller = Caller::new("u", Role::Employee);
        let invoice = Invoice::new("INV-1", "A", "a@b.co", 0, &caller, Utc::now());

        assert!(matches!(
            store.update(invoice).await,
            Err(EngineError::InvoiceNotFound)
        ));
    }
}
