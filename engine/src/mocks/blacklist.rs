//! In-memory blacklist directory for testing.

use crate::providers::{BlacklistDirectory, BlacklistRecord};
use invoicing_core::error::Result;
use std::sync::{Arc, Mutex};

/// In-memory blacklist with the production matching rule: exact,
/// case-insensitive comparison on customer email OR customer name.
#[derive(Debug, Clone, Default)]
pub struct MemoryBlacklistDirectory {
    records: Arc<Mutex<Vec<BlacklistRecord>>>,
}

impl MemoryBlacklistDirectory {
    /// Create an empty directory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a directory seeded with records.
    #[must_use]
    pub fn with_records(records: Vec<BlacklistRecord>) -> Self {
        Self {
            records: Arc::new(Mutex::new(records)),
        }
    }

    /// Add a record.
    pub fn add(&self, record: BlacklistRecord) {
        self.records
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push(record);
    }
}

impl BlacklistDirectory for MemoryBlacklistDirectory {
    async fn find_match(
        &self,
        customer_email: &str,
        customer_name: &str,
    ) -> Result<Option<BlacklistRecord>> {
        let email = customer_email.trim();
        let name = customer_name.trim();
        let records = self
            .records
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);

        Ok(records
            .iter()
            .find(|record| {
                record.customer_email.trim().eq_ignore_ascii_case(email)
                    || record.customer_name.trim().eq_ignore_ascii_case(name)
            })
            .cloned())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)] // Test code can unwrap

    use super::*;

    #[tokio::test]
    async fn matching_is_case_insensitive_on_either_field() {
        let directory = MemoryBlacklistDirectory::with_records(vec![BlacklistRecord {
            customer_email: "Bad@Example.com".to_string(),
            customer_name: "Shady Industries".to_string(),
            reason: "chargebacks".to_string(),
        }]);

        assert!(
            directory
                .find_match("bad@example.com", "Somebody Else")
                .await
                .unwrap()
                .is_some()
        );
        assert!(
            directory
                .find_match("fine@example.com", "SHADY INDUSTRIES")
                .await
                .unwrap()
                .is_some()
        );
        assert!(
            directory
                .find_match("fine@example.com", "Honest Co")
                .await
                .unwrap()
                .is_none()
        );
    }
}
