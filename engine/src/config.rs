//! Engine configuration.
//!
//! All tunables live here so tests can shrink windows and thresholds without
//! touching the rules that consume them.

use chrono::FixedOffset;
use std::time::Duration;

/// Configuration for the lifecycle engine, cooldowns, notifications, and the
/// digest scheduler.
///
/// # Example
///
/// ```
/// use invoicing_engine::config::EngineConfig;
/// use std::time::Duration;
///
/// let config = EngineConfig::new()
///     .with_email_timeout(Duration::from_secs(10))
///     .with_digest_hour(7);
/// assert_eq!(config.digest_hour(), 7);
/// ```
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Budget for one transactional email dispatch
    email_timeout: Duration,

    /// Cooldown window between invoice email sends
    invoice_email_cooldown: Duration,

    /// Cooldown window between reminder email sends
    reminder_email_cooldown: Duration,

    /// Maximum retained notifications per user
    max_notifications: usize,

    /// Ceiling on a single line item's quantity
    max_item_quantity: u32,

    /// Local hour (0-23) at which the daily digest fires
    digest_hour: u32,

    /// Offset from UTC, in seconds, defining "local" for the digest boundary
    digest_utc_offset_secs: i32,

    /// Age in days after which a pending invoice warrants investigation
    pending_investigation_age_days: i64,

    /// Age in days after which a draft gets a deletion warning
    draft_warning_age_days: i64,
}

impl EngineConfig {
    /// Create a configuration with production defaults.
    ///
    /// Defaults:
    /// - `email_timeout`: 35 seconds
    /// - `invoice_email_cooldown` / `reminder_email_cooldown`: 10 minutes
    /// - `max_notifications`: 50
    /// - `max_item_quantity`: 999
    /// - `digest_hour`: 09:00, UTC offset 0
    /// - `pending_investigation_age_days`: 3
    /// - `draft_warning_age_days`: 1
    #[must_use]
    pub const fn new() -> Self {
        Self {
            email_timeout: Duration::from_secs(35),
            invoice_email_cooldown: Duration::from_secs(600),
            reminder_email_cooldown: Duration::from_secs(600),
            max_notifications: 50,
            max_item_quantity: 999,
            digest_hour: 9,
            digest_utc_offset_secs: 0,
            pending_investigation_age_days: 3,
            draft_warning_age_days: 1,
        }
    }

    /// Set the email dispatch timeout.
    #[must_use]
    pub const fn with_email_timeout(mut self, timeout: Duration) -> Self {
        self.email_timeout = timeout;
        self
    }

    /// Set the invoice email cooldown window.
    #[must_use]
    pub const fn with_invoice_email_cooldown(mut self, window: Duration) -> Self {
        self.invoice_email_cooldown = window;
        self
    }

    /// Set the reminder email cooldown window.
    #[must_use]
    pub const fn with_reminder_email_cooldown(mut self, window: Duration) -> Self {
        self.reminder_email_cooldown = window;
        self
    }

    /// Set the retained-notification cap.
    #[must_use]
    pub const fn with_max_notifications(mut self, max: usize) -> Self {
        self.max_notifications = max;
        self
    }

    /// Set the line-item quantity ceiling.
    #[must_use]
    pub const fn with_max_item_quantity(mut self, max: u32) -> Self {
        self.max_item_quantity = max;
        self
    }

    /// Set the local hour (0-23) for the digest boundary.
    #[must_use]
    pub const fn with_digest_hour(mut self, hour: u32) -> Self {
        self.digest_hour = if hour < 24 { hour } else { 9 };
        self
    }

    /// Set the UTC offset, in seconds, defining the digest's local time.
    ///
    /// Values outside +/-24h are clamped to UTC.
    #[must_use]
    pub const fn with_digest_utc_offset_secs(mut self, secs: i32) -> Self {
        self.digest_utc_offset_secs = if secs > -86_400 && secs < 86_400 {
            secs
        } else {
            0
        };
        self
    }

    /// Set the pending-investigation age threshold in days.
    #[must_use]
    pub const fn with_pending_investigation_age_days(mut self, days: i64) -> Self {
        self.pending_investigation_age_days = days;
        self
    }

    /// Set the draft-warning age threshold in days.
    #[must_use]
    pub const fn with_draft_warning_age_days(mut self, days: i64) -> Self {
        self.draft_warning_age_days = days;
        self
    }

    /// Email dispatch budget.
    #[must_use]
    pub const fn email_timeout(&self) -> Duration {
        self.email_timeout
    }

    /// Invoice email cooldown window.
    #[must_use]
    pub const fn invoice_email_cooldown(&self) -> Duration {
        self.invoice_email_cooldown
    }

    /// Reminder email cooldown window.
    #[must_use]
    pub const fn reminder_email_cooldown(&self) -> Duration {
        self.reminder_email_cooldown
    }

    /// Retained-notification cap.
    #[must_use]
    pub const fn max_notifications(&self) -> usize {
        self.max_notifications
    }

    /// Line-item quantity ceiling.
    #[must_use]
    pub const fn max_item_quantity(&self) -> u32 {
        self.max_item_quantity
    }

    /// Local hour (0-23) at which the digest fires.
    #[must_use]
    pub const fn digest_hour(&self) -> u32 {
        self.digest_hour
    }

    /// Offset used to interpret the digest's local boundary.
    #[must_use]
    #[allow(clippy::expect_used)] // offset clamped to the valid range by the setter
    pub fn digest_offset(&self) -> FixedOffset {
        FixedOffset::east_opt(self.digest_utc_offset_secs).expect("offset within +/-24h")
    }

    /// Pending-investigation age threshold.
    #[must_use]
    pub const fn pending_investigation_age_days(&self) -> i64 {
        self.pending_investigation_age_days
    }

    /// Draft-warning age threshold.
    #[must_use]
    pub const fn draft_warning_age_days(&self) -> i64 {
        self.draft_warning_age_days
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::new()
    }
}
