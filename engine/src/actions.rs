//! Lifecycle actions.
//!
//! Actions unify the caller-facing commands and the feedback events the
//! orchestrator's effects produce. Commands carry the acting [`Caller`] so
//! guards evaluate inside the reducer; feedback events carry only what the
//! reducer needs to apply the outcome.

use chrono::{DateTime, Utc};
use invoicing_core::error::EngineError;
use invoicing_core::invoice::{Caller, InvoiceId, InvoiceItem};

/// Options for a send/resend command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SendOptions {
    /// One-shot bypass of a blacklist match. Not persisted; the next send
    /// is checked again.
    pub override_blacklist: bool,

    /// Persist `status = sent` even when the email dispatch fails, so the
    /// payment link stays shareable. Never advances the send timestamps.
    pub promote_on_email_failure: bool,
}

impl SendOptions {
    /// Options with both flags off.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            override_blacklist: false,
            promote_on_email_failure: false,
        }
    }

    /// Enable the one-shot blacklist override.
    #[must_use]
    pub const fn with_blacklist_override(mut self) -> Self {
        self.override_blacklist = true;
        self
    }

    /// Keep the `sent` promotion on email failure.
    #[must_use]
    pub const fn with_promote_on_email_failure(mut self) -> Self {
        self.promote_on_email_failure = true;
        self
    }
}

/// All inputs to the lifecycle reducer.
#[derive(Debug, Clone)]
pub enum LifecycleAction {
    // ═══════════════════════════════════════════════════════════════════
    // Commands
    // ═══════════════════════════════════════════════════════════════════
    /// Command: Create a draft invoice
    CreateInvoice {
        /// Human-readable number; must be unique across the store
        invoice_number: String,
        /// Customer display name
        customer_name: String,
        /// Customer email (may still be empty at draft stage)
        customer_email: String,
        /// Tax rate in basis points
        tax_rate_bps: u32,
        /// Initial line items
        items: Vec<InvoiceItem>,
        /// Acting caller, becomes the owner
        caller: Caller,
    },

    /// Command: Replace the full line-item set of a draft
    ReplaceItems {
        /// Target invoice
        invoice_id: InvoiceId,
        /// The new set; the old set is discarded wholesale
        items: Vec<InvoiceItem>,
        /// Acting caller
        caller: Caller,
    },

    /// Command: Send or resend the invoice email
    SendInvoice {
        /// Target invoice
        invoice_id: InvoiceId,
        /// Acting caller
        caller: Caller,
        /// Blacklist override and failure-promotion flags
        options: SendOptions,
    },

    /// Command: Send a payment reminder email
    SendReminder {
        /// Target invoice
        invoice_id: InvoiceId,
        /// Acting caller
        caller: Caller,
    },

    /// Command: Confirm payment
    MarkPaid {
        /// Target invoice
        invoice_id: InvoiceId,
        /// Acting caller
        caller: Caller,
    },

    /// Command: Re-run a failed inventory decrement
    RetryStockUpdate {
        /// Target invoice
        invoice_id: InvoiceId,
        /// Acting caller
        caller: Caller,
    },

    /// Command: Delete a draft
    DeleteInvoice {
        /// Target invoice
        invoice_id: InvoiceId,
        /// Acting caller
        caller: Caller,
    },

    /// Externally driven: cancel a non-paid invoice (payment lapse etc.)
    CancelInvoice {
        /// Target invoice
        invoice_id: InvoiceId,
    },

    /// Externally driven: a sent/pending invoice went past due
    MarkOverdue {
        /// Target invoice
        invoice_id: InvoiceId,
    },

    // ═══════════════════════════════════════════════════════════════════
    // Feedback events from effects
    // ═══════════════════════════════════════════════════════════════════
    /// Event: draft persisted to the store
    InvoiceCreated {
        /// Created invoice
        invoice_id: InvoiceId,
    },

    /// Event: draft insert rejected (duplicate number, store failure)
    CreateFailed {
        /// Invoice that failed to persist
        invoice_id: InvoiceId,
        /// Why
        error: EngineError,
    },

    /// Event: payment link issued and email dispatched successfully
    SendCompleted {
        /// Sent invoice
        invoice_id: InvoiceId,
        /// The issued (or pre-existing) payment link
        payment_link: String,
        /// Dispatch time; becomes `sent_at` and the cooldown anchor
        completed_at: DateTime<Utc>,
    },

    /// Event: the send path failed somewhere
    SendFailed {
        /// Invoice whose send failed
        invoice_id: InvoiceId,
        /// Where and why
        error: EngineError,
        /// Whether `status = sent` was still persisted (caller chose to
        /// proceed despite the email failure)
        promoted: bool,
    },

    /// Event: reminder email dispatched
    ReminderSent {
        /// Reminded invoice
        invoice_id: InvoiceId,
        /// Dispatch time; becomes the reminder cooldown anchor
        sent_at: DateTime<Utc>,
    },

    /// Event: reminder email failed
    ReminderFailed {
        /// Invoice whose reminder failed
        invoice_id: InvoiceId,
        /// Why
        error: EngineError,
    },

    /// Event: inventory decrement succeeded
    StockDecremented {
        /// Paid invoice
        invoice_id: InvoiceId,
    },

    /// Event: inventory decrement failed; flagged for reconciliation
    StockDecrementFailed {
        /// Paid invoice
        invoice_id: InvoiceId,
        /// Upstream failure description
        reason: String,
    },

    /// Event: draft removed from the store
    InvoiceDeleted {
        /// Deleted invoice
        invoice_id: InvoiceId,
    },

    /// Event: a state write reached the store
    InvoicePersisted {
        /// Persisted invoice
        invoice_id: InvoiceId,
    },

    /// Event: a state write failed; in-memory and stored state may differ
    /// until the next refetch
    PersistFailed {
        /// Invoice whose write failed
        invoice_id: InvoiceId,
        /// Why
        reason: String,
    },
}
