//! Error types for the invoice lifecycle engine.

use crate::invoice::InvoiceStatus;
use thiserror::Error;

/// Result type alias for engine operations.
pub type Result<T> = std::result::Result<T, EngineError>;

/// Email dispatch failure classification.
///
/// Mirrors the transactional email contract: each variant corresponds to a
/// response class, and [`EmailError::is_retryable`] decides whether the
/// failure consumes the resend cooldown window. Inconclusive failures
/// (timeout, network, upstream unavailable) never do - the message may or
/// may not have reached the recipient, and permanently blocking the sender
/// after a transient fault is worse than allowing an occasional duplicate.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EmailError {
    /// 429 - server-side cooldown is active.
    #[error("Email rate limited, retry in {cooldown_remaining}s")]
    RateLimited {
        /// Seconds until the cooldown window expires (server authoritative)
        cooldown_remaining: u64,
    },

    /// 401/403 - dispatch credentials rejected.
    #[error("Email dispatch not authorized")]
    Auth,

    /// 404 - the invoice referenced by the request does not exist upstream.
    #[error("Invoice not found by email service")]
    InvoiceNotFound,

    /// 503/504 - upstream unavailable or timed out.
    #[error("Email service unavailable")]
    Unavailable,

    /// Client-side dispatch timeout (35 s budget elapsed).
    #[error("Email dispatch timed out")]
    Timeout,

    /// Transport-level failure before any response was received.
    #[error("Email network failure: {reason}")]
    Network {
        /// Transport error description
        reason: String,
    },

    /// Any other non-success response.
    #[error("Email rejected: {reason}")]
    Rejected {
        /// Upstream rejection description
        reason: String,
    },
}

impl EmailError {
    /// Whether the failure is inconclusive and safe to retry.
    ///
    /// Retryable failures do not advance the cooldown timestamp.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Timeout | Self::Network { .. } | Self::Unavailable)
    }
}

/// Comprehensive error taxonomy for lifecycle operations.
///
/// Organized by the blocking semantics each category carries: validation and
/// authorization failures resolve locally, rate limits are time-bounded,
/// and external-service failures split into transition-critical (payment
/// link) and non-critical (inventory) classes.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum EngineError {
    // ═══════════════════════════════════════════════════════════
    // Validation Errors
    // ═══════════════════════════════════════════════════════════
    /// Invoice or line-item data failed validation.
    #[error("Validation failed: {reason}")]
    Validation {
        /// What failed and why
        reason: String,
    },

    // ═══════════════════════════════════════════════════════════
    // Authorization Errors
    // ═══════════════════════════════════════════════════════════
    /// Role/ownership guard failed.
    ///
    /// Deliberately carries no detail - guard internals are never exposed
    /// beyond a generic denial.
    #[error("Not authorized")]
    Unauthorized,

    /// The requested action is not legal from the invoice's current status.
    #[error("Cannot {action} an invoice in status {status}")]
    InvalidTransition {
        /// Current invoice status
        status: InvoiceStatus,
        /// The attempted action, for the denial message
        action: &'static str,
    },

    /// Invoice not found in the store.
    #[error("Invoice not found")]
    InvoiceNotFound,

    // ═══════════════════════════════════════════════════════════
    // Rate Limiting
    // ═══════════════════════════════════════════════════════════
    /// A send cooldown is active.
    #[error("Rate limited, retry in {cooldown_remaining}s")]
    RateLimited {
        /// Seconds remaining in the cooldown window
        cooldown_remaining: u64,
    },

    // ═══════════════════════════════════════════════════════════
    // Blacklist
    // ═══════════════════════════════════════════════════════════
    /// Customer matched a blacklist record; explicit override required.
    #[error("Customer matched blacklist record")]
    BlacklistMatch {
        /// Reason recorded on the matching blacklist entry
        reason: String,
    },

    // ═══════════════════════════════════════════════════════════
    // External Services
    // ═══════════════════════════════════════════════════════════
    /// Payment-link issuance failed. Blocks the `sent` transition.
    #[error("Payment link issuance failed: {reason}")]
    PaymentLink {
        /// Upstream error description
        reason: String,
    },

    /// Inventory decrement failed. Never blocks the `paid` transition.
    #[error("Inventory decrement failed: {reason}")]
    Inventory {
        /// Upstream error description
        reason: String,
    },

    /// Email dispatch failed.
    #[error("Email dispatch failed: {0}")]
    Email(#[from] EmailError),

    /// Store read/write failed.
    #[error("Store error: {reason}")]
    Store {
        /// Storage error description
        reason: String,
    },

    /// A duplicate `invoice_number` was rejected by the store.
    #[error("Invoice number already exists: {invoice_number}")]
    DuplicateInvoiceNumber {
        /// The conflicting human-readable number
        invoice_number: String,
    },
}

impl EngineError {
    /// Returns `true` if this error is due to invalid caller input.
    ///
    /// # Examples
    ///
    /// ```
    /// # use invoicing_core::error::EngineError;
    /// let err = EngineError::Validation { reason: "missing email".into() };
    /// assert!(err.is_user_error());
    /// assert!(!EngineError::Store { reason: "io".into() }.is_user_error());
    /// ```
    #[must_use]
    pub const fn is_user_error(&self) -> bool {
        matches!(
            self,
            Self::Validation { .. }
                | Self::Unauthorized
                | Self::InvalidTransition { .. }
                | Self::BlacklistMatch { .. }
        )
    }

    /// Returns `true` if the operation may be retried once conditions change.
    ///
    /// Rate limits clear with time; retryable email failures are
    /// inconclusive; inventory failures are explicitly re-armable.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::RateLimited { .. } | Self::Inventory { .. } => true,
            Self::Email(email) => email.is_retryable(),
            _ => false,
        }
    }
}
