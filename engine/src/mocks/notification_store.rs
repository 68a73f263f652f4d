//! In-memory notification store for testing.

use crate::providers::NotificationStore;
use chrono::NaiveDate;
use invoicing_core::error::Result;
use invoicing_core::invoice::UserId;
use invoicing_core::notification::{Notification, NotificationKey};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

/// In-memory per-user blobs: notification list, tombstones, digest marker.
///
/// Clones share the same backing maps, so a store handed to a
/// [`crate::notifications::NotificationCenter`] and a
/// [`crate::digest::DigestScheduler`] behaves like one backend.
#[derive(Debug, Clone, Default)]
pub struct MemoryNotificationStore {
    notifications: Arc<Mutex<HashMap<UserId, Vec<Notification>>>>,
    tombstones: Arc<Mutex<HashMap<UserId, HashSet<NotificationKey>>>>,
    digest_dates: Arc<Mutex<HashMap<UserId, NaiveDate>>>,
}

impl MemoryNotificationStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl NotificationStore for MemoryNotificationStore {
    async fn load_notifications(&self, user: &UserId) -> Result<Vec<Notification>> {
        Ok(self
            .notifications
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .get(user)
            .cloned()
            .unwrap_or_default())
    }

    async fn save_notifications(&self, user: &UserId, notifications: &[Notification]) -> Result<()> {
        self.notifications
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .insert(user.clone(), notifications.to_vec());
        Ok(())
    }

    async fn load_tombstones(&self, user: &UserId) -> Result<HashSet<NotificationKey>> {
        Ok(self
            .tombstones
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .get(user)
            .cloned()
            .unwrap_or_default())
    }

    async fn save_tombstones(&self, user: &UserId, keys: &HashSet<NotificationKey>) -> Result<()> {
        self.tombstones
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .insert(user.clone(), keys.clone());
        Ok(())
    }

    async fn load_last_digest_date(&self, user: &UserId) -> Result<Option<NaiveDate>> {
        Ok(self
            .digest_dates
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .get(user)
            .copied())
    }

    async fn save_last_digest_date(&self, user: &UserId, date: NaiveDate) -> Result<()> {
        self.digest_dates
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .insert(user.clone(), date);
        Ok(())
    }
}
