//! Notification model and deduplication keys.
//!
//! A notification is "the same" as another when their keys collide. Digest
//! categories derive a key from the kind, the calendar date, and a stable
//! fingerprint of the scan outcome, which caps each category to one entry
//! per user per day no matter how often the scan runs. Point events embed
//! the event timestamp in the key and therefore never collapse - three
//! rapid email failures produce three notifications. That asymmetry is
//! deliberate and must not be "fixed" into a dedup.

use crate::invoice::InvoiceId;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique notification identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NotificationId(Uuid);

impl NotificationId {
    /// Generate a fresh identity.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for NotificationId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for NotificationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Display priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationPriority {
    /// Action required; something failed
    Error,
    /// Needs attention
    Warning,
    /// Good news
    Success,
    /// Informational
    Info,
}

/// Notification category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    /// Point event: an invoice was marked paid
    PaymentReceived,
    /// Point event: a transactional email dispatch failed
    EmailSendFailed,
    /// Point event: the inventory decrement for a paid invoice failed
    StockUpdateFailed,
    /// Digest: currently overdue invoices
    OverdueInvoices,
    /// Digest: pending invoices old enough to warrant investigation
    PendingInvestigation,
    /// Digest: drafts approaching deletion age
    DraftExpiryWarning,
}

impl NotificationKind {
    /// Stable string used in persisted keys.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::PaymentReceived => "payment_received",
            Self::EmailSendFailed => "email_send_failed",
            Self::StockUpdateFailed => "stock_update_failed",
            Self::OverdueInvoices => "overdue_invoices",
            Self::PendingInvestigation => "pending_investigation",
            Self::DraftExpiryWarning => "draft_expiry_warning",
        }
    }

    /// Digest categories dedupe per calendar day; point events never do.
    #[must_use]
    pub const fn is_digest(self) -> bool {
        matches!(
            self,
            Self::OverdueInvoices | Self::PendingInvestigation | Self::DraftExpiryWarning
        )
    }

    /// Priority assigned when the generator creates this kind.
    #[must_use]
    pub const fn default_priority(self) -> NotificationPriority {
        match self {
            Self::PaymentReceived => NotificationPriority::Success,
            Self::EmailSendFailed => NotificationPriority::Error,
            Self::StockUpdateFailed | Self::OverdueInvoices | Self::DraftExpiryWarning => {
                NotificationPriority::Warning
            },
            Self::PendingInvestigation => NotificationPriority::Info,
        }
    }
}

impl std::fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Whose records a digest entry summarizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OwnerScope {
    /// The session user's own records
    Own,
    /// Other users' records, visible to elevated roles only
    SystemWide,
}

impl OwnerScope {
    /// Stable string used in persisted keys.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Own => "own",
            Self::SystemWide => "system",
        }
    }
}

/// Deduplication key identifying "the same notification" across repeated
/// generation attempts.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NotificationKey(String);

impl NotificationKey {
    /// Key for a digest category: one per user per scope per calendar day.
    ///
    /// The `count` is part of the fingerprint, so two same-day scans that
    /// observe the same set collapse, while a scan that observes a changed
    /// count inserts a fresh entry.
    #[must_use]
    pub fn digest(kind: NotificationKind, date: NaiveDate, count: usize, scope: OwnerScope) -> Self {
        Self(format!("{kind}:{date}:{count}:{}", scope.as_str()))
    }

    /// Key for a point event.
    ///
    /// Embeds the event timestamp, making the key unique per event
    /// instance; repeats are intentionally never collapsed.
    #[must_use]
    pub fn point(kind: NotificationKind, invoice_id: InvoiceId, at: DateTime<Utc>) -> Self {
        Self(format!("{kind}:{invoice_id}:{}", at.timestamp_millis()))
    }

    /// The raw key string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for NotificationKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A persisted notification record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    /// Unique identity
    pub id: NotificationId,
    /// Deduplication key
    pub key: NotificationKey,
    /// Category
    pub kind: NotificationKind,
    /// Display priority
    pub priority: NotificationPriority,
    /// Whether the user has read this entry
    pub read: bool,
    /// When the notification was generated
    pub timestamp: DateTime<Utc>,
    /// Optional deep link for the UI
    pub action_url: Option<String>,
    /// The invoice this notification concerns, when there is one
    pub invoice_id: Option<InvoiceId>,
    /// Free-form payload (counts, upstream error text, ...)
    pub metadata: serde_json::Value,
}

impl Notification {
    /// Create an unread notification with the kind's default priority.
    #[must_use]
    pub fn new(kind: NotificationKind, key: NotificationKey, timestamp: DateTime<Utc>) -> Self {
        Self {
            id: NotificationId::new(),
            key,
            kind,
            priority: kind.default_priority(),
            read: false,
            timestamp,
            action_url: None,
            invoice_id: None,
            metadata: serde_json::Value::Null,
        }
    }

    /// Attach a deep link.
    #[must_use]
    pub fn with_action_url(mut self, url: impl Into<String>) -> Self {
        self.action_url = Some(url.into());
        self
    }

    /// Attach the subject invoice.
    #[must_use]
    pub const fn with_invoice(mut self, invoice_id: InvoiceId) -> Self {
        self.invoice_id = Some(invoice_id);
        self
    }

    /// Attach free-form metadata.
    #[must_use]
    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = metadata;
        self
    }

    /// Override the default priority.
    #[must_use]
    pub const fn with_priority(mut self, priority: NotificationPriority) -> Self {
        self.priority = priority;
        self
    }
}

/// Derived unread count: a fresh count over the list, never an
/// independently maintained counter.
#[must_use]
pub fn unread_count(notifications: &[Notification]) -> usize {
    notifications.iter().filter(|n| !n.read).count()
}
