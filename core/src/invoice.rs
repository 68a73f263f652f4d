//! Invoice domain model.
//!
//! The invoice record is the single unit of persistence the engine operates
//! on: status, financials, customer fields, and the orchestration markers
//! (`stripe_payment_link`, `stock_update_status`, the send timestamps) all
//! live on it. Line items are owned by their invoice and are replaced as a
//! whole set on every edit - there is no per-item diffing.

use crate::error::{EngineError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique invoice identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InvoiceId(Uuid);

impl InvoiceId {
    /// Generate a fresh identity.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for InvoiceId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for InvoiceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Owning user identity, as issued by the external auth capability.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(String);

impl UserId {
    /// Wrap an externally issued user id.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The raw id string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Staff role, as asserted by the external auth capability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Regular staff member
    Employee,
    /// Administrator over employee-owned records
    Admin,
    /// Unrestricted administrator
    SuperAdmin,
}

/// The acting caller: "caller has role R and user id U".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
    /// Caller's user id
    pub user_id: UserId,
    /// Caller's role
    pub role: Role,
}

impl Caller {
    /// Create a caller.
    pub fn new(user_id: impl Into<String>, role: Role) -> Self {
        Self {
            user_id: UserId::new(user_id),
            role,
        }
    }

    /// Send/resend/delete ownership guard: creator, super-admin, or admin
    /// over an employee-owned invoice.
    #[must_use]
    pub fn can_manage(&self, invoice: &Invoice) -> bool {
        self.user_id == invoice.user_id
            || self.role == Role::SuperAdmin
            || (self.role == Role::Admin && invoice.creator_role == Role::Employee)
    }

    /// Mark-as-paid guard: creator or super-admin only.
    #[must_use]
    pub fn can_mark_paid(&self, invoice: &Invoice) -> bool {
        self.user_id == invoice.user_id || self.role == Role::SuperAdmin
    }

    /// Whether the caller may aggregate other users' records in digests.
    #[must_use]
    pub const fn is_elevated(&self) -> bool {
        matches!(self.role, Role::Admin | Role::SuperAdmin)
    }
}

/// Invoice lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceStatus {
    /// Editable, pre-send. The only state permitting edits or deletion.
    Draft,
    /// Sent to the customer
    Sent,
    /// Awaiting investigation/payment
    Pending,
    /// Past due
    Overdue,
    /// Paid. Terminal and irreversible.
    Paid,
    /// Cancelled. Terminal.
    Cancelled,
}

impl InvoiceStatus {
    /// Terminal statuses admit no further transitions.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Paid | Self::Cancelled)
    }

    /// Only drafts may be edited or deleted.
    #[must_use]
    pub const fn is_editable(self) -> bool {
        matches!(self, Self::Draft)
    }

    /// Statuses from which a resend is legal.
    #[must_use]
    pub const fn can_resend(self) -> bool {
        matches!(self, Self::Sent | Self::Pending | Self::Overdue)
    }

    /// Statuses from which mark-as-paid is legal.
    #[must_use]
    pub const fn can_mark_paid(self) -> bool {
        matches!(self, Self::Sent | Self::Pending | Self::Overdue)
    }
}

impl std::fmt::Display for InvoiceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Draft => "draft",
            Self::Sent => "sent",
            Self::Pending => "pending",
            Self::Overdue => "overdue",
            Self::Paid => "paid",
            Self::Cancelled => "cancelled",
        };
        write!(f, "{s}")
    }
}

/// Idempotency marker for the external inventory decrement.
///
/// Progresses only `None → Pending → {Completed, Failed}`. A `Failed`
/// outcome may be re-armed to `Pending` by an explicit operator retry;
/// `Completed` is never re-entered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum StockUpdateStatus {
    /// No decrement attempted yet
    #[default]
    None,
    /// Decrement in flight
    Pending,
    /// Decrement succeeded
    Completed,
    /// Decrement failed; surfaced for manual reconciliation
    Failed,
}

/// Opaque token granting unauthenticated read access to one invoice's
/// customer-facing view.
///
/// Generated exactly once at invoice creation and stable for the invoice
/// lifetime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicToken(String);

impl PublicToken {
    /// Generate a fresh 256-bit random token, base64url encoded.
    #[must_use]
    pub fn generate() -> Self {
        use base64::Engine;
        use rand::RngCore;

        let mut random_bytes = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut random_bytes);
        Self(base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(random_bytes))
    }

    /// The token string, for embedding in customer-facing URLs.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for PublicToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One invoice line.
///
/// Either product-backed (references an external product handle) or a
/// free-text line. Quantity is bounded by a configured ceiling and by the
/// stock snapshot captured when the product was selected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceItem {
    /// External product handle; `None` for free-text lines
    pub product_id: Option<String>,
    /// Line description (product name or free text)
    pub name: String,
    /// Quantity, at least 1
    pub quantity: u32,
    /// Unit price in cents; negative values are rejected
    pub unit_price_cents: i64,
    /// Available stock observed when the product was selected
    pub stock_snapshot: Option<u32>,
}

impl InvoiceItem {
    /// A product-backed line.
    pub fn product(
        product_id: impl Into<String>,
        name: impl Into<String>,
        quantity: u32,
        unit_price_cents: i64,
        stock_snapshot: u32,
    ) -> Self {
        Self {
            product_id: Some(product_id.into()),
            name: name.into(),
            quantity,
            unit_price_cents,
            stock_snapshot: Some(stock_snapshot),
        }
    }

    /// A free-text line.
    pub fn free_text(name: impl Into<String>, quantity: u32, unit_price_cents: i64) -> Self {
        Self {
            product_id: None,
            name: name.into(),
            quantity,
            unit_price_cents,
            stock_snapshot: None,
        }
    }

    /// Line total in cents.
    #[must_use]
    pub fn line_total_cents(&self) -> i64 {
        self.unit_price_cents * i64::from(self.quantity)
    }

    /// Validate this line against the quantity ceiling.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Validation`] on a negative price, an empty
    /// free-text name, a zero quantity, or a quantity above the ceiling or
    /// the stock snapshot.
    pub fn validate(&self, max_quantity: u32) -> Result<()> {
        if self.unit_price_cents < 0 {
            return Err(EngineError::Validation {
                reason: format!("negative price on line '{}'", self.name),
            });
        }
        if self.product_id.is_none() && self.name.trim().is_empty() {
            return Err(EngineError::Validation {
                reason: "free-text line requires a name".to_string(),
            });
        }
        if let Some(product_id) = &self.product_id {
            if product_id.trim().is_empty() {
                return Err(EngineError::Validation {
                    reason: "product-backed line requires a selected product".to_string(),
                });
            }
        }
        if self.quantity == 0 {
            return Err(EngineError::Validation {
                reason: format!("zero quantity on line '{}'", self.name),
            });
        }
        if self.quantity > max_quantity {
            return Err(EngineError::Validation {
                reason: format!(
                    "quantity {} exceeds ceiling {max_quantity} on line '{}'",
                    self.quantity, self.name
                ),
            });
        }
        if let Some(stock) = self.stock_snapshot {
            if self.quantity > stock {
                return Err(EngineError::Validation {
                    reason: format!(
                        "quantity {} exceeds available stock {stock} on line '{}'",
                        self.quantity, self.name
                    ),
                });
            }
        }
        Ok(())
    }
}

/// Validate a full line-item set before any write.
///
/// # Errors
///
/// Returns the first [`EngineError::Validation`] found.
pub fn validate_items(items: &[InvoiceItem], max_quantity: u32) -> Result<()> {
    for item in items {
        item.validate(max_quantity)?;
    }
    Ok(())
}

/// Minimal well-formedness check for a customer email address.
///
/// The engine only guards against obviously unusable recipients; full
/// format validation is the form layer's concern.
#[must_use]
pub fn email_is_well_formed(email: &str) -> bool {
    let email = email.trim();
    if email.is_empty() || email.contains(char::is_whitespace) {
        return false;
    }
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty() && domain.contains('.') && !domain.starts_with('.')
        },
        None => false,
    }
}

/// The invoice record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Invoice {
    /// Unique identity
    pub id: InvoiceId,
    /// Human-readable number, unique across the store, immutable once
    /// assigned
    pub invoice_number: String,
    /// Lifecycle status; moves only along the transition table
    pub status: InvoiceStatus,
    /// Customer display name
    pub customer_name: String,
    /// Customer email, recipient of invoice and reminder sends
    pub customer_email: String,
    /// Sum of line totals, cents
    pub subtotal_cents: i64,
    /// Tax rate in basis points (825 = 8.25%)
    pub tax_rate_bps: u32,
    /// Tax in cents, derived from subtotal
    pub tax_amount_cents: i64,
    /// `subtotal + tax_amount`, recomputed on every item change
    pub total_cents: i64,
    /// Customer-facing access token, assigned at creation, never reassigned
    pub public_token: PublicToken,
    /// Hosted payment link; issued at most once
    pub stripe_payment_link: Option<String>,
    /// Inventory decrement idempotency marker
    pub stock_update_status: StockUpdateStatus,
    /// When the invoice first reached the customer
    pub sent_at: Option<DateTime<Utc>>,
    /// Cooldown anchor for invoice email sends
    pub last_invoice_email_sent: Option<DateTime<Utc>>,
    /// Cooldown anchor for reminder email sends
    pub last_reminder_email_sent: Option<DateTime<Utc>>,
    /// When payment was confirmed
    pub paid_date: Option<DateTime<Utc>>,
    /// Owning user
    pub user_id: UserId,
    /// Owner's role at creation time, denormalized for guard checks
    pub creator_role: Role,
    /// Creation timestamp, anchor for digest age classification
    pub created_at: DateTime<Utc>,
    /// Owned line items, replaced as a set on every edit
    pub items: Vec<InvoiceItem>,
}

impl Invoice {
    /// Create a draft invoice.
    ///
    /// The public token is assigned here and never again.
    pub fn new(
        invoice_number: impl Into<String>,
        customer_name: impl Into<String>,
        customer_email: impl Into<String>,
        tax_rate_bps: u32,
        owner: &Caller,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: InvoiceId::new(),
            invoice_number: invoice_number.into(),
            status: InvoiceStatus::Draft,
            customer_name: customer_name.into(),
            customer_email: customer_email.into(),
            subtotal_cents: 0,
            tax_rate_bps,
            tax_amount_cents: 0,
            total_cents: 0,
            public_token: PublicToken::generate(),
            stripe_payment_link: None,
            stock_update_status: StockUpdateStatus::None,
            sent_at: None,
            last_invoice_email_sent: None,
            last_reminder_email_sent: None,
            paid_date: None,
            user_id: owner.user_id.clone(),
            creator_role: owner.role,
            created_at,
            items: Vec::new(),
        }
    }

    /// Replace the full line-item set and recompute financials.
    pub fn replace_items(&mut self, items: Vec<InvoiceItem>) {
        self.items = items;
        self.recompute_totals();
    }

    /// Recompute `subtotal`, `tax_amount`, and `total` from the items.
    ///
    /// Tax is integer math over cents: `subtotal * rate_bps / 10_000`,
    /// truncating toward zero.
    pub fn recompute_totals(&mut self) {
        self.subtotal_cents = self.items.iter().map(InvoiceItem::line_total_cents).sum();
        self.tax_amount_cents = self.subtotal_cents * i64::from(self.tax_rate_bps) / 10_000;
        self.total_cents = self.subtotal_cents + self.tax_amount_cents;
    }

    /// Whether the invoice was created at or before `cutoff`.
    ///
    /// Digest classification uses this for the pending-investigation and
    /// draft-expiry age thresholds.
    #[must_use]
    pub fn created_at_or_before(&self, cutoff: DateTime<Utc>) -> bool {
        self.created_at <= cutoff
    }
}
