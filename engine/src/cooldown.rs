//! Send cooldown tracking.
//!
//! Two independent cooldown classes exist, one per email kind, each backed
//! by a single "last sent" timestamp on the invoice record - there is no
//! separate attempt ledger. The server-side check here is authoritative;
//! any client countdown is a convenience that must reconcile against the
//! `cooldown_remaining` carried in the rate-limit error.
//!
//! Last-writer-wins on the timestamp field is accepted: the tracked value
//! lives on the single invoice record, so no distributed coordination is
//! needed.

use chrono::{DateTime, Utc};
use invoicing_core::error::{EngineError, Result};
use invoicing_core::invoice::Invoice;
use std::time::Duration;

/// Which timed action a cooldown guards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CooldownKind {
    /// Invoice email send/resend
    InvoiceEmail,
    /// Payment reminder email
    ReminderEmail,
}

impl CooldownKind {
    /// Stable name for logging.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::InvoiceEmail => "invoice_email",
            Self::ReminderEmail => "reminder_email",
        }
    }

    /// The "last sent" anchor this kind reads from the invoice.
    #[must_use]
    pub const fn last_sent(self, invoice: &Invoice) -> Option<DateTime<Utc>> {
        match self {
            Self::InvoiceEmail => invoice.last_invoice_email_sent,
            Self::ReminderEmail => invoice.last_reminder_email_sent,
        }
    }
}

/// Computes whether a timed action is currently rate-limited.
#[derive(Debug, Clone, Copy)]
pub struct CooldownTracker {
    window: Duration,
}

impl CooldownTracker {
    /// Create a tracker with the given window.
    #[must_use]
    pub const fn new(window: Duration) -> Self {
        Self { window }
    }

    /// Seconds remaining in the window, or `None` when the action is free
    /// to proceed.
    ///
    /// `is_blocked = (now - last_sent) < window`. A never-sent entity is
    /// never blocked. A `last_sent` in the future (clock skew between
    /// writers) blocks for the full window rather than underflowing.
    #[must_use]
    pub fn remaining(
        &self,
        last_sent: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> Option<Duration> {
        let last_sent = last_sent?;
        let window = chrono::Duration::from_std(self.window).ok()?;
        let elapsed = now.signed_duration_since(last_sent);
        if elapsed >= window {
            return None;
        }
        let remaining = if elapsed < chrono::Duration::zero() {
            window
        } else {
            window - elapsed
        };
        remaining.to_std().ok()
    }

    /// Enforce the cooldown.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::RateLimited`] with the authoritative
    /// `cooldown_remaining` seconds while the window is active.
    pub fn check(&self, last_sent: Option<DateTime<Utc>>, now: DateTime<Utc>) -> Result<()> {
        match self.remaining(last_sent, now) {
            None => Ok(()),
            Some(remaining) => {
                let cooldown_remaining = remaining.as_secs().max(1);
                tracing::debug!(
                    cooldown_remaining,
                    window_secs = self.window.as_secs(),
                    "Send rejected by cooldown"
                );
                Err(EngineError::RateLimited { cooldown_remaining })
            },
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::panic)] // Test code can unwrap and panic

    use super::*;
    use chrono::TimeZone;

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 14, h, m, 0).single().unwrap()
    }

    #[test]
    fn blocks_midway_through_window() {
        let tracker = CooldownTracker::new(Duration::from_secs(600));
        let last_sent = Some(at(12, 0));
        let now = at(12, 5);

        match tracker.check(last_sent, now) {
            Err(EngineError::RateLimited { cooldown_remaining }) => {
                assert_eq!(cooldown_remaining, 300);
            },
            other => panic!("expected rate limit, got {other:?}"),
        }
    }

    #[test]
    fn proceeds_after_window() {
        let tracker = CooldownTracker::new(Duration::from_secs(600));
        assert!(tracker.check(Some(at(12, 0)), at(12, 11)).is_ok());
    }

    #[test]
    fn never_sent_is_never_blocked() {
        let tracker = CooldownTracker::new(Duration::from_secs(600));
        assert!(tracker.check(None, at(12, 0)).is_ok());
    }

    #[test]
    fn boundary_is_exclusive() {
        let tracker = CooldownTracker::new(Duration::from_secs(600));
        // Exactly at the boundary the window has elapsed
        assert!(tracker.check(Some(at(12, 0)), at(12, 10)).is_ok());
    }

    #[test]
    fn future_timestamp_blocks_full_window() {
        let tracker = CooldownTracker::new(Duration::from_secs(600));
        match tracker.check(Some(at(13, 0)), at(12, 59)) {
            Err(EngineError::RateLimited { cooldown_remaining }) => {
                assert_eq!(cooldown_remaining, 600);
            },
            other => panic!("expected rate limit, got {other:?}"),
        }
    }

    #[test]
    fn kind_selects_anchor_field() {
        use invoicing_core::invoice::{Caller, Role};

        let caller = Caller::new("u", Role::Employee);
        let mut invoice =
            Invoice::new("INV-9", "Acme", "a@b.co", 0, &caller, at(8, 0));
        invoice.last_invoice_email_sent = Some(at(9, 0));

        assert_eq!(
            CooldownKind::InvoiceEmail.last_sent(&invoice),
            Some(at(9, 0))
        );
        assert_eq!(CooldownKind::ReminderEmail.last_sent(&invoice), None);
    }
}
