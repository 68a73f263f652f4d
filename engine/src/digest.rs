//! Daily digest scheduler.
//!
//! One cooperative timer task per session. On activation it runs an
//! immediate scan, then sleeps to the next local 09:00 boundary and rearms
//! every 24 hours. A persisted last-digest-date marker makes the scan
//! idempotent per calendar day: two sessions (or a wake racing a rearm) may
//! both scan, but a same-day rerun either short-circuits on the marker or
//! collapses in the notification center's dedup keys.

use crate::config::EngineConfig;
use crate::notifications::NotificationCenter;
use crate::providers::{InvoiceStore, NotificationStore};
use chrono::{DateTime, Duration as ChronoDuration, NaiveDate, Utc};
use invoicing_core::clock::Clock;
use invoicing_core::error::Result;
use invoicing_core::invoice::{Caller, Invoice, InvoiceStatus};
use invoicing_core::notification::{Notification, NotificationKey, NotificationKind, OwnerScope};
use serde_json::json;
use std::sync::{Arc, Mutex};
use tokio::task::JoinHandle;

/// What one scan found for one owner scope.
#[derive(Debug, Default, PartialEq, Eq)]
struct DigestCounts {
    overdue: usize,
    pending_investigation: usize,
    draft_warnings: usize,
}

/// The daily digest scheduler.
///
/// Explicit lifecycle: [`DigestScheduler::start`] on login,
/// [`DigestScheduler::stop`] on logout. [`DigestScheduler::run_scan`] is
/// public so tests (and manual triggers) can drive a scan without timers.
pub struct DigestScheduler<S, N, C> {
    invoices: S,
    store: N,
    notifications: NotificationCenter<N>,
    clock: C,
    caller: Caller,
    config: EngineConfig,
    handle: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl<S, N, C> Clone for DigestScheduler<S, N, C>
where
    S: Clone,
    N: Clone,
    C: Clone,
{
    fn clone(&self) -> Self {
        Self {
            invoices: self.invoices.clone(),
            store: self.store.clone(),
            notifications: self.notifications.clone(),
            clock: self.clock.clone(),
            caller: self.caller.clone(),
            config: self.config.clone(),
            handle: Arc::clone(&self.handle),
        }
    }
}

impl<S, N, C> DigestScheduler<S, N, C>
where
    S: InvoiceStore + Clone + 'static,
    N: NotificationStore + Clone + 'static,
    C: Clock + Clone + 'static,
{
    /// Create a scheduler for one session.
    pub fn new(
        invoices: S,
        store: N,
        notifications: NotificationCenter<N>,
        clock: C,
        caller: Caller,
        config: EngineConfig,
    ) -> Self {
        Self {
            invoices,
            store,
            notifications,
            clock,
            caller,
            config,
            handle: Arc::new(Mutex::new(None)),
        }
    }

    /// Activate the timer loop: one immediate scan, then a wake at every
    /// local boundary. Idempotent; a second start replaces the first task.
    pub fn start(&self) {
        let scheduler = self.clone();
        let task = tokio::spawn(async move {
            if let Err(error) = scheduler.run_scan().await {
                tracing::warn!(%error, "Initial digest scan failed");
            }
            loop {
                let now = scheduler.clock.now();
                let boundary = scheduler.next_boundary(now);
                let wait = (boundary - now)
                    .to_std()
                    .unwrap_or(std::time::Duration::from_secs(24 * 60 * 60));
                tracing::debug!(?wait, "Digest scheduler sleeping until next boundary");
                tokio::time::sleep(wait).await;
                if let Err(error) = scheduler.run_scan().await {
                    tracing::warn!(%error, "Digest scan failed");
                }
            }
        });

        let mut handle = self
            .handle
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        if let Some(previous) = handle.replace(task) {
            previous.abort();
        }
        tracing::info!(user = %self.caller.user_id, "Digest scheduler started");
    }

    /// Deactivate the timer loop.
    pub fn stop(&self) {
        let mut handle = self
            .handle
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        if let Some(task) = handle.take() {
            task.abort();
            tracing::info!(user = %self.caller.user_id, "Digest scheduler stopped");
        }
    }

    /// The next local `digest_hour` boundary strictly after `now`.
    fn next_boundary(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let offset = self.config.digest_offset();
        let local_now = now.with_timezone(&offset);
        let today_target = local_now
            .date_naive()
            .and_hms_opt(self.config.digest_hour(), 0, 0);

        let fallback = now + ChronoDuration::hours(24);
        let Some(target) = today_target else {
            return fallback;
        };
        let Some(mut boundary) = target.and_local_timezone(offset).single() else {
            return fallback;
        };
        if boundary <= local_now {
            boundary += ChronoDuration::hours(24);
        }
        boundary.with_timezone(&Utc)
    }

    /// Run one scan: skip when today's marker is already set, otherwise
    /// classify invoices and feed the notification center.
    ///
    /// Returns the number of digest notifications actually inserted.
    ///
    /// # Errors
    ///
    /// Returns a store error when the invoice scan or marker access fails.
    pub async fn run_scan(&self) -> Result<usize> {
        let now = self.clock.now();
        let today = now.with_timezone(&self.config.digest_offset()).date_naive();

        let marker = self.store.load_last_digest_date(&self.caller.user_id).await?;
        if marker == Some(today) {
            tracing::debug!(user = %self.caller.user_id, %today, "Digest already ran today");
            return Ok(0);
        }

        let mut inserted = 0;

        let own = self.invoices.list_by_owner(&self.caller.user_id).await?;
        let own_counts = self.classify(&own, now);
        inserted += self
            .record_scope(&own_counts, OwnerScope::Own, today, now)
            .await;

        if self.caller.is_elevated() {
            let all = self.invoices.list().await?;
            let others: Vec<Invoice> = all
                .into_iter()
                .filter(|invoice| invoice.user_id != self.caller.user_id)
                .collect();
            let other_counts = self.classify(&others, now);
            inserted += self
                .record_scope(&other_counts, OwnerScope::SystemWide, today, now)
                .await;
        }

        self.store
            .save_last_digest_date(&self.caller.user_id, today)
            .await?;

        tracing::info!(user = %self.caller.user_id, %today, inserted, "Digest scan complete");
        metrics::counter!("digest.scans").increment(1);
        Ok(inserted)
    }

    fn classify(&self, invoices: &[Invoice], now: DateTime<Utc>) -> DigestCounts {
        let pending_cutoff =
            now - ChronoDuration::days(self.config.pending_investigation_age_days());
        let draft_cutoff = now - ChronoDuration::days(self.config.draft_warning_age_days());

        let mut counts = DigestCounts::default();
        for invoice in invoices {
            match invoice.status {
                InvoiceStatus::Overdue => counts.overdue += 1,
                InvoiceStatus::Pending if invoice.created_at_or_before(pending_cutoff) => {
                    counts.pending_investigation += 1;
                },
                InvoiceStatus::Draft if invoice.created_at_or_before(draft_cutoff) => {
                    counts.draft_warnings += 1;
                },
                _ => {},
            }
        }
        counts
    }

    /// Record at most one digest notification per non-empty class for one
    /// owner scope. Draft warnings are own-records only.
    async fn record_scope(
        &self,
        counts: &DigestCounts,
        scope: OwnerScope,
        today: NaiveDate,
        now: DateTime<Utc>,
    ) -> usize {
        let mut classes: Vec<(NotificationKind, usize)> = vec![
            (NotificationKind::OverdueInvoices, counts.overdue),
            (
                NotificationKind::PendingInvestigation,
                counts.pending_investigation,
            ),
        ];
        if scope == OwnerScope::Own {
            classes.push((NotificationKind::DraftExpiryWarning, counts.draft_warnings));
        }

        let mut inserted = 0;
        for (kind, count) in classes {
            if count == 0 {
                continue;
            }
            let notification = Notification::new(
                kind,
                NotificationKey::digest(kind, today, count, scope),
                now,
            )
            .with_metadata(json!({
                "count": count,
                "scope": scope.as_str(),
            }));

            match self.notifications.record(notification).await {
                Ok(Some(_)) => inserted += 1,
                Ok(None) => {},
                Err(error) => {
                    tracing::warn!(%error, kind = %kind, "Failed to record digest notification");
                },
            }
        }
        inserted
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)] // Test code can unwrap

    use super::*;
    use crate::mocks::{MemoryInvoiceStore, MemoryNotificationStore};
    use chrono::TimeZone;
    use invoicing_core::invoice::{Role, UserId};
    use invoicing_testing::FixedClock;

    fn scheduler_at(
        time: DateTime<Utc>,
        config: EngineConfig,
    ) -> DigestScheduler<MemoryInvoiceStore, MemoryNotificationStore, FixedClock> {
        let store = MemoryNotificationStore::new();
        let caller = Caller::new("user-1", Role::Employee);
        let notifications =
            NotificationCenter::new(UserId::new("user-1"), store.clone(), 50);
        DigestScheduler::new(
            MemoryInvoiceStore::new(),
            store,
            notifications,
            FixedClock::new(time),
            caller,
            config,
        )
    }

    #[test]
    fn boundary_rolls_to_tomorrow_when_past() {
        let now = Utc.with_ymd_and_hms(2025, 3, 14, 10, 30, 0).single().unwrap();
        let scheduler = scheduler_at(now, EngineConfig::new());

        let boundary = scheduler.next_boundary(now);
        assert_eq!(
            boundary,
            Utc.with_ymd_and_hms(2025, 3, 15, 9, 0, 0).single().unwrap()
        );
    }

    #[test]
    fn boundary_is_today_when_upcoming() {
        let now = Utc.with_ymd_and_hms(2025, 3, 14, 5, 0, 0).single().unwrap();
        let scheduler = scheduler_at(now, EngineConfig::new());

        let boundary = scheduler.next_boundary(now);
        assert_eq!(
            boundary,
            Utc.with_ymd_and_hms(2025, 3, 14, 9, 0, 0).single().unwrap()
        );
    }

    #[test]
    fn boundary_respects_local_offset() {
        // UTC+2: 08:00 UTC is already 10:00 local, past the boundary
        let now = Utc.with_ymd_and_hms(2025, 3, 14, 8, 0, 0).single().unwrap();
        let config = EngineConfig::new().with_digest_utc_offset_secs(2 * 3600);
        let scheduler = scheduler_at(now, config);

        let boundary = scheduler.next_boundary(now);
        // Next local 09:00 is 07:00 UTC tomorrow
        assert_eq!(
            boundary,
            Utc.with_ymd_and_hms(2025, 3, 15, 7, 0, 0).single().unwrap()
        );
    }
}
