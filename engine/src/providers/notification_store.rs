//! Notification persistence trait.

use chrono::NaiveDate;
use invoicing_core::error::Result;
use invoicing_core::invoice::UserId;
use invoicing_core::notification::{Notification, NotificationKey};
use std::collections::HashSet;

/// Per-user notification persistence: three independent keyed blobs.
///
/// The ordered notification list, the tombstone set, and the last-digest
/// date marker are stored separately, each scoped by user id. There is no
/// cross-user sharing and no coordination between the blobs beyond the
/// engine writing them in sequence.
pub trait NotificationStore: Send + Sync {
    /// Load the ordered notification list (newest first).
    ///
    /// # Errors
    ///
    /// Returns [`invoicing_core::error::EngineError::Store`] on a backend
    /// failure.
    fn load_notifications(
        &self,
        user: &UserId,
    ) -> impl Future<Output = Result<Vec<Notification>>> + Send;

    /// Persist the full notification list.
    ///
    /// # Errors
    ///
    /// Returns [`invoicing_core::error::EngineError::Store`] on a backend
    /// failure.
    fn save_notifications(
        &self,
        user: &UserId,
        notifications: &[Notification],
    ) -> impl Future<Output = Result<()>> + Send;

    /// Load the deleted-key tombstone set.
    ///
    /// # Errors
    ///
    /// Returns [`invoicing_core::error::EngineError::Store`] on a backend
    /// failure.
    fn load_tombstones(
        &self,
        user: &UserId,
    ) -> impl Future<Output = Result<HashSet<NotificationKey>>> + Send;

    /// Persist the tombstone set.
    ///
    /// # Errors
    ///
    /// Returns [`invoicing_core::error::EngineError::Store`] on a backend
    /// failure.
    fn save_tombstones(
        &self,
        user: &UserId,
        keys: &HashSet<NotificationKey>,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Load the last calendar day a digest ran for this user.
    ///
    /// # Errors
    ///
    /// Returns [`invoicing_core::error::EngineError::Store`] on a backend
    /// failure.
    fn load_last_digest_date(
        &self,
        user: &UserId,
    ) -> impl Future<Output = Result<Option<NaiveDate>>> + Send;

    /// Persist the last digest day marker.
    ///
    /// # Errors
    ///
    /// Returns [`invoicing_core::error::EngineError::Store`] on a backend
    /// failure.
    fn save_last_digest_date(
        &self,
        user: &UserId,
        date: NaiveDate,
    ) -> impl Future<Output = Result<()>> + Send;
}
