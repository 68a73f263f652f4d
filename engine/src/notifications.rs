//! Notification generation, deduplication, and unread tracking.
//!
//! One [`NotificationCenter`] exists per session user. It owns the in-memory
//! working copy of the user's notification list and tombstone set, and every
//! mutation follows the same discipline: apply to the in-memory list,
//! persist the full list, recompute the unread count by a fresh count over
//! what remains. The count is never incremented in place, so it cannot
//! drift from the list.

use crate::providers::NotificationStore;
use invoicing_core::error::Result;
use invoicing_core::invoice::UserId;
use invoicing_core::notification::{Notification, NotificationId, NotificationKey, unread_count};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::Mutex;

#[derive(Debug, Default)]
struct CenterState {
    /// Newest-first notification list, capped at the configured maximum
    notifications: Vec<Notification>,
    /// Keys whose regeneration is suppressed
    tombstones: HashSet<NotificationKey>,
}

/// Per-user notification service.
///
/// Constructed once per session and injected wherever domain events or
/// digest scans need recording; cloning shares the same working state.
#[derive(Debug)]
pub struct NotificationCenter<N> {
    user_id: UserId,
    store: N,
    max_entries: usize,
    state: Arc<Mutex<CenterState>>,
}

impl<N> Clone for NotificationCenter<N>
where
    N: Clone,
{
    fn clone(&self) -> Self {
        Self {
            user_id: self.user_id.clone(),
            store: self.store.clone(),
            max_entries: self.max_entries,
            state: Arc::clone(&self.state),
        }
    }
}

impl<N> NotificationCenter<N>
where
    N: NotificationStore,
{
    /// Create a center for one user.
    ///
    /// Call [`Self::hydrate`] before first use to load the persisted list
    /// and tombstones.
    pub fn new(user_id: UserId, store: N, max_entries: usize) -> Self {
        Self {
            user_id,
            store,
            max_entries,
            state: Arc::new(Mutex::new(CenterState::default())),
        }
    }

    /// Load the persisted blobs into the working state.
    ///
    /// # Errors
    ///
    /// Returns a store error when either blob cannot be read.
    pub async fn hydrate(&self) -> Result<()> {
        let notifications = self.store.load_notifications(&self.user_id).await?;
        let tombstones = self.store.load_tombstones(&self.user_id).await?;

        let mut state = self.state.lock().await;
        tracing::debug!(
            user = %self.user_id,
            count = notifications.len(),
            tombstones = tombstones.len(),
            "Hydrated notification center"
        );
        state.notifications = notifications;
        state.tombstones = tombstones;
        Ok(())
    }

    /// Record a notification, deduplicating by key.
    ///
    /// Returns `Ok(None)` when the insert was dropped: the key is
    /// tombstoned (the user deleted it earlier today) or an entry with the
    /// same key already exists. Otherwise the entry is prepended, the list
    /// truncated to the newest `max_entries`, and the full list persisted.
    ///
    /// # Errors
    ///
    /// Returns a store error when persisting fails; the in-memory list is
    /// still updated so a later mutation will re-persist it.
    pub async fn record(&self, notification: Notification) -> Result<Option<Notification>> {
        let mut state = self.state.lock().await;

        if state.tombstones.contains(&notification.key) {
            tracing::debug!(key = %notification.key, "Dropping tombstoned notification");
            metrics::counter!("notifications.suppressed", "reason" => "tombstone").increment(1);
            return Ok(None);
        }
        if state.notifications.iter().any(|n| n.key == notification.key) {
            tracing::debug!(key = %notification.key, "Dropping duplicate notification");
            metrics::counter!("notifications.suppressed", "reason" => "duplicate").increment(1);
            return Ok(None);
        }

        state.notifications.insert(0, notification.clone());
        state.notifications.truncate(self.max_entries);
        metrics::counter!("notifications.inserted").increment(1);

        self.persist_list(&state).await?;
        tracing::info!(
            user = %self.user_id,
            kind = %notification.kind,
            key = %notification.key,
            "Notification recorded"
        );
        Ok(Some(notification))
    }

    /// Mark one notification read. Returns whether the id was found.
    ///
    /// # Errors
    ///
    /// Returns a store error when persisting fails.
    pub async fn mark_read(&self, id: NotificationId) -> Result<bool> {
        let mut state = self.state.lock().await;
        let mut found = false;
        for n in &mut state.notifications {
            if n.id == id {
                n.read = true;
                found = true;
            }
        }
        if found {
            self.persist_list(&state).await?;
        }
        Ok(found)
    }

    /// Mark every notification read.
    ///
    /// # Errors
    ///
    /// Returns a store error when persisting fails.
    pub async fn mark_all_read(&self) -> Result<()> {
        let mut state = self.state.lock().await;
        for n in &mut state.notifications {
            n.read = true;
        }
        self.persist_list(&state).await
    }

    /// Delete one notification and tombstone its key so a same-day digest
    /// cannot regenerate it. Returns whether the id was found.
    ///
    /// # Errors
    ///
    /// Returns a store error when persisting either blob fails.
    pub async fn delete(&self, id: NotificationId) -> Result<bool> {
        let mut state = self.state.lock().await;
        let Some(index) = state.notifications.iter().position(|n| n.id == id) else {
            return Ok(false);
        };

        let removed = state.notifications.remove(index);
        state.tombstones.insert(removed.key.clone());
        metrics::counter!("notifications.deleted").increment(1);

        self.persist_list(&state).await?;
        self.store
            .save_tombstones(&self.user_id, &state.tombstones)
            .await?;
        Ok(true)
    }

    /// Delete every notification, tombstoning all keys.
    ///
    /// # Errors
    ///
    /// Returns a store error when persisting either blob fails.
    pub async fn clear_all(&self) -> Result<()> {
        let mut state = self.state.lock().await;
        let keys: Vec<NotificationKey> =
            state.notifications.iter().map(|n| n.key.clone()).collect();
        state.tombstones.extend(keys);
        state.notifications.clear();

        self.persist_list(&state).await?;
        self.store
            .save_tombstones(&self.user_id, &state.tombstones)
            .await
    }

    /// Snapshot of the current list, newest first.
    pub async fn notifications(&self) -> Vec<Notification> {
        self.state.lock().await.notifications.clone()
    }

    /// Derived unread count: a fresh count over the current list.
    pub async fn unread_count(&self) -> usize {
        let state = self.state.lock().await;
        unread_count(&state.notifications)
    }

    /// The user this center belongs to.
    #[must_use]
    pub const fn user_id(&self) -> &UserId {
        &self.user_id
    }

    /// The backing notification store (shared with the digest scheduler
    /// for the last-digest-date marker).
    #[must_use]
    pub const fn store(&self) -> &N {
        &self.store
    }

    async fn persist_list(&self, state: &CenterState) -> Result<()> {
        self.store
            .save_notifications(&self.user_id, &state.notifications)
            .await?;
        // Recompute-and-report atomically with the list write
        #[allow(clippy::cast_precision_loss)] // list capped at max_entries
        metrics::gauge!("notifications.unread").set(unread_count(&state.notifications) as f64);
        Ok(())
    }
}
