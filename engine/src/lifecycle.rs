//! The invoice state machine.
//!
//! All guards, validation, cooldown checks, and status transitions happen
//! synchronously in [`InvoiceLifecycleReducer::reduce`]; everything that
//! touches the outside world is returned as an effect built by
//! [`crate::orchestrator`]. Any `(status, action)` pair outside the
//! transition table leaves the status unchanged and records a guard error.
//!
//! Transition table:
//!
//! | From                  | To        | Trigger                         |
//! |-----------------------|-----------|---------------------------------|
//! | draft                 | sent      | send succeeds (link + email)    |
//! | sent/pending/overdue  | sent      | resend succeeds                 |
//! | sent/pending/overdue  | paid      | mark-as-paid                    |
//! | draft                 | (deleted) | delete                          |
//! | any non-paid          | cancelled | external cancel                 |
//! | sent/pending          | overdue   | external lapse                  |

use crate::actions::LifecycleAction;
use crate::cooldown::{CooldownKind, CooldownTracker};
use crate::environment::LifecycleEnvironment;
use crate::orchestrator;
use crate::providers::{
    BlacklistDirectory, EmailProvider, InventoryProvider, InvoiceStore, NotificationStore,
    PaymentLinkProvider,
};
use crate::state::LifecycleState;
use invoicing_core::clock::Clock;
use invoicing_core::effect::Effect;
use invoicing_core::error::EngineError;
use invoicing_core::invoice::{
    Invoice, InvoiceStatus, StockUpdateStatus, email_is_well_formed, validate_items,
};
use invoicing_core::reducer::Reducer;
use invoicing_core::{SmallVec, smallvec};

/// The lifecycle reducer.
#[derive(Debug, Clone)]
pub struct InvoiceLifecycleReducer<S, P, I, E, B, N, C> {
    /// Phantom data to hold type parameters.
    _phantom: std::marker::PhantomData<fn() -> (S, P, I, E, B, N, C)>,
}

impl<S, P, I, E, B, N, C> InvoiceLifecycleReducer<S, P, I, E, B, N, C> {
    /// Create the reducer.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            _phantom: std::marker::PhantomData,
        }
    }
}

impl<S, P, I, E, B, N, C> Default for InvoiceLifecycleReducer<S, P, I, E, B, N, C> {
    fn default() -> Self {
        Self::new()
    }
}

type Effects = SmallVec<[Effect<LifecycleAction>; 4]>;

/// Record a guard/validation failure: status unchanged, no effects.
fn deny(state: &mut LifecycleState, error: EngineError) -> Effects {
    tracing::debug!(%error, "Command denied");
    metrics::counter!("lifecycle.denied").increment(1);
    state.last_error = Some(error);
    smallvec![Effect::None]
}

impl<S, P, I, E, B, N, C> Reducer for InvoiceLifecycleReducer<S, P, I, E, B, N, C>
where
    S: InvoiceStore + Clone + 'static,
    P: PaymentLinkProvider + Clone + 'static,
    I: InventoryProvider + Clone + 'static,
    E: EmailProvider + Clone + 'static,
    B: BlacklistDirectory + Clone + 'static,
    N: NotificationStore + Clone + 'static,
    C: Clock + Clone + 'static,
{
    type State = LifecycleState;
    type Action = LifecycleAction;
    type Environment = LifecycleEnvironment<S, P, I, E, B, N, C>;

    #[allow(clippy::too_many_lines)] // One arm per transition keeps the table auditable
    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> Effects {
        match action {
            // ═══════════════════════════════════════════════════════════
            // CreateInvoice: validate, assign identity and token, insert
            // ═══════════════════════════════════════════════════════════
            LifecycleAction::CreateInvoice {
                invoice_number,
                customer_name,
                customer_email,
                tax_rate_bps,
                items,
                caller,
            } => {
                if invoice_number.trim().is_empty() {
                    return deny(
                        state,
                        EngineError::Validation {
                            reason: "invoice number is required".to_string(),
                        },
                    );
                }
                if let Err(error) = validate_items(&items, env.config.max_item_quantity()) {
                    return deny(state, error);
                }

                let mut invoice = Invoice::new(
                    invoice_number,
                    customer_name,
                    customer_email,
                    tax_rate_bps,
                    &caller,
                    env.clock.now(),
                );
                invoice.replace_items(items);

                tracing::info!(invoice = %invoice.invoice_number, "Draft created");
                state.last_error = None;
                let effect = orchestrator::create_effect(env, invoice.clone());
                state.invoices.insert(invoice.id, invoice);
                smallvec![effect]
            },

            // ═══════════════════════════════════════════════════════════
            // ReplaceItems: draft-only whole-set replacement
            // ═══════════════════════════════════════════════════════════
            LifecycleAction::ReplaceItems {
                invoice_id,
                items,
                caller,
            } => {
                let Some(invoice) = state.invoices.get(&invoice_id) else {
                    return deny(state, EngineError::InvoiceNotFound);
                };
                let status = invoice.status;
                if !caller.can_manage(invoice) {
                    return deny(state, EngineError::Unauthorized);
                }
                if !status.is_editable() {
                    return deny(
                        state,
                        EngineError::InvalidTransition {
                            status,
                            action: "edit",
                        },
                    );
                }
                if let Err(error) = validate_items(&items, env.config.max_item_quantity()) {
                    return deny(state, error);
                }

                let Some(invoice) = state.invoices.get_mut(&invoice_id) else {
                    return deny(state, EngineError::InvoiceNotFound);
                };
                invoice.replace_items(items);
                state.last_error = None;
                let snapshot = invoice.clone();
                smallvec![orchestrator::persist_effect(env, snapshot)]
            },

            // ═══════════════════════════════════════════════════════════
            // SendInvoice: guards and cooldown here, orchestration in the
            // effect
            // ═══════════════════════════════════════════════════════════
            LifecycleAction::SendInvoice {
                invoice_id,
                caller,
                options,
            } => {
                let Some(invoice) = state.invoices.get(&invoice_id) else {
                    return deny(state, EngineError::InvoiceNotFound);
                };
                if !caller.can_manage(invoice) {
                    return deny(state, EngineError::Unauthorized);
                }
                let status = invoice.status;
                let first_send = status == InvoiceStatus::Draft;
                if !first_send && !status.can_resend() {
                    return deny(
                        state,
                        EngineError::InvalidTransition {
                            status,
                            action: "send",
                        },
                    );
                }
                if invoice.items.is_empty() {
                    return deny(
                        state,
                        EngineError::Validation {
                            reason: "at least one line item is required".to_string(),
                        },
                    );
                }
                if !email_is_well_formed(&invoice.customer_email) {
                    return deny(
                        state,
                        EngineError::Validation {
                            reason: "customer email is missing or malformed".to_string(),
                        },
                    );
                }
                if let Err(error) = validate_items(&invoice.items, env.config.max_item_quantity())
                {
                    return deny(state, error);
                }

                let cooldown = CooldownTracker::new(env.config.invoice_email_cooldown());
                if let Err(error) = cooldown.check(
                    CooldownKind::InvoiceEmail.last_sent(invoice),
                    env.clock.now(),
                ) {
                    return deny(state, error);
                }

                state.last_error = None;
                let snapshot = invoice.clone();
                smallvec![orchestrator::send_effect(env, snapshot, options, first_send)]
            },

            // ═══════════════════════════════════════════════════════════
            // SendReminder: post-send statuses only, own cooldown class
            // ═══════════════════════════════════════════════════════════
            LifecycleAction::SendReminder { invoice_id, caller } => {
                let Some(invoice) = state.invoices.get(&invoice_id) else {
                    return deny(state, EngineError::InvoiceNotFound);
                };
                if !caller.can_manage(invoice) {
                    return deny(state, EngineError::Unauthorized);
                }
                let status = invoice.status;
                if !status.can_resend() {
                    return deny(
                        state,
                        EngineError::InvalidTransition {
                            status,
                            action: "remind",
                        },
                    );
                }
                if !email_is_well_formed(&invoice.customer_email) {
                    return deny(
                        state,
                        EngineError::Validation {
                            reason: "customer email is missing or malformed".to_string(),
                        },
                    );
                }

                let cooldown = CooldownTracker::new(env.config.reminder_email_cooldown());
                if let Err(error) = cooldown.check(
                    CooldownKind::ReminderEmail.last_sent(invoice),
                    env.clock.now(),
                ) {
                    return deny(state, error);
                }

                state.last_error = None;
                let snapshot = invoice.clone();
                smallvec![orchestrator::reminder_effect(env, snapshot)]
            },

            // ═══════════════════════════════════════════════════════════
            // MarkPaid: paid commits regardless of the decrement outcome.
            // A second mark-paid sees status=paid and is rejected, which
            // is what keeps the decrement at-most-once under double-click.
            // ═══════════════════════════════════════════════════════════
            LifecycleAction::MarkPaid { invoice_id, caller } => {
                let Some(invoice) = state.invoices.get(&invoice_id) else {
                    return deny(state, EngineError::InvoiceNotFound);
                };
                if !caller.can_mark_paid(invoice) {
                    return deny(state, EngineError::Unauthorized);
                }
                let status = invoice.status;
                if !status.can_mark_paid() {
                    return deny(
                        state,
                        EngineError::InvalidTransition {
                            status,
                            action: "mark paid",
                        },
                    );
                }

                let now = env.clock.now();
                let Some(invoice) = state.invoices.get_mut(&invoice_id) else {
                    return deny(state, EngineError::InvoiceNotFound);
                };
                invoice.status = InvoiceStatus::Paid;
                invoice.paid_date = Some(now);
                let decrement_needed =
                    invoice.stock_update_status != StockUpdateStatus::Completed;
                if decrement_needed {
                    invoice.stock_update_status = StockUpdateStatus::Pending;
                }

                state.last_error = None;
                let snapshot = invoice.clone();
                smallvec![orchestrator::mark_paid_effect(env, snapshot, decrement_needed)]
            },

            // ═══════════════════════════════════════════════════════════
            // RetryStockUpdate: operator re-arm of a failed decrement
            // ═══════════════════════════════════════════════════════════
            LifecycleAction::RetryStockUpdate { invoice_id, caller } => {
                let Some(invoice) = state.invoices.get(&invoice_id) else {
                    return deny(state, EngineError::InvoiceNotFound);
                };
                if !caller.can_manage(invoice) {
                    return deny(state, EngineError::Unauthorized);
                }
                let status = invoice.status;
                if status != InvoiceStatus::Paid
                    || invoice.stock_update_status != StockUpdateStatus::Failed
                {
                    return deny(
                        state,
                        EngineError::InvalidTransition {
                            status,
                            action: "retry stock update",
                        },
                    );
                }

                let Some(invoice) = state.invoices.get_mut(&invoice_id) else {
                    return deny(state, EngineError::InvoiceNotFound);
                };
                invoice.stock_update_status = StockUpdateStatus::Pending;
                state.last_error = None;
                let snapshot = invoice.clone();
                smallvec![orchestrator::stock_retry_effect(env, snapshot)]
            },

            // ═══════════════════════════════════════════════════════════
            // DeleteInvoice: drafts only
            // ═══════════════════════════════════════════════════════════
            LifecycleAction::DeleteInvoice { invoice_id, caller } => {
                let Some(invoice) = state.invoices.get(&invoice_id) else {
                    return deny(state, EngineError::InvoiceNotFound);
                };
                if !caller.can_manage(invoice) {
                    return deny(state, EngineError::Unauthorized);
                }
                let status = invoice.status;
                if !status.is_editable() {
                    return deny(
                        state,
                        EngineError::InvalidTransition {
                            status,
                            action: "delete",
                        },
                    );
                }

                tracing::info!(invoice = %invoice.invoice_number, "Draft deleted");
                state.invoices.remove(&invoice_id);
                state.last_error = None;
                smallvec![orchestrator::delete_effect(env, invoice_id)]
            },

            // ═══════════════════════════════════════════════════════════
            // Externally driven transitions. Duplicates are harmless
            // no-ops; paid never cancels.
            // ═══════════════════════════════════════════════════════════
            LifecycleAction::CancelInvoice { invoice_id } => {
                let Some(invoice) = state.invoices.get_mut(&invoice_id) else {
                    return deny(state, EngineError::InvoiceNotFound);
                };
                match invoice.status {
                    InvoiceStatus::Cancelled => smallvec![Effect::None],
                    InvoiceStatus::Paid => deny(
                        state,
                        EngineError::InvalidTransition {
                            status: InvoiceStatus::Paid,
                            action: "cancel",
                        },
                    ),
                    _ => {
                        invoice.status = InvoiceStatus::Cancelled;
                        tracing::info!(invoice = %invoice.invoice_number, "Invoice cancelled");
                        let snapshot = invoice.clone();
                        smallvec![orchestrator::persist_effect(env, snapshot)]
                    },
                }
            },

            LifecycleAction::MarkOverdue { invoice_id } => {
                let Some(invoice) = state.invoices.get_mut(&invoice_id) else {
                    return deny(state, EngineError::InvoiceNotFound);
                };
                match invoice.status {
                    InvoiceStatus::Sent | InvoiceStatus::Pending => {
                        invoice.status = InvoiceStatus::Overdue;
                        let snapshot = invoice.clone();
                        smallvec![orchestrator::persist_effect(env, snapshot)]
                    },
                    // Already overdue or out of scope for a lapse
                    _ => smallvec![Effect::None],
                }
            },

            // ═══════════════════════════════════════════════════════════
            // Feedback events: apply effect outcomes to the working set
            // ═══════════════════════════════════════════════════════════
            LifecycleAction::InvoiceCreated { invoice_id } => {
                tracing::debug!(%invoice_id, "Draft persisted");
                smallvec![Effect::None]
            },

            LifecycleAction::CreateFailed { invoice_id, error } => {
                // The draft never reached the store; drop the working copy
                state.invoices.remove(&invoice_id);
                state.last_error = Some(error);
                smallvec![Effect::None]
            },

            LifecycleAction::SendCompleted {
                invoice_id,
                payment_link,
                completed_at,
            } => {
                if let Some(invoice) = state.invoices.get_mut(&invoice_id) {
                    invoice.status = InvoiceStatus::Sent;
                    invoice.sent_at = Some(completed_at);
                    invoice.last_invoice_email_sent = Some(completed_at);
                    if invoice.stripe_payment_link.is_none() && !payment_link.is_empty() {
                        invoice.stripe_payment_link = Some(payment_link);
                    }
                }
                state.last_error = None;
                smallvec![Effect::None]
            },

            LifecycleAction::SendFailed {
                invoice_id,
                error,
                promoted,
            } => {
                if promoted {
                    // Link shareable, customer not notified: status moves
                    // but the send timestamps stay untouched
                    if let Some(invoice) = state.invoices.get_mut(&invoice_id) {
                        invoice.status = InvoiceStatus::Sent;
                    }
                }
                state.last_error = Some(error);
                smallvec![Effect::None]
            },

            LifecycleAction::ReminderSent {
                invoice_id,
                sent_at,
            } => {
                if let Some(invoice) = state.invoices.get_mut(&invoice_id) {
                    invoice.last_reminder_email_sent = Some(sent_at);
                }
                state.last_error = None;
                smallvec![Effect::None]
            },

            LifecycleAction::ReminderFailed { error, .. } => {
                state.last_error = Some(error);
                smallvec![Effect::None]
            },

            LifecycleAction::StockDecremented { invoice_id } => {
                if let Some(invoice) = state.invoices.get_mut(&invoice_id) {
                    invoice.stock_update_status = StockUpdateStatus::Completed;
                }
                smallvec![Effect::None]
            },

            LifecycleAction::StockDecrementFailed { invoice_id, reason } => {
                if let Some(invoice) = state.invoices.get_mut(&invoice_id) {
                    invoice.stock_update_status = StockUpdateStatus::Failed;
                }
                state.last_error = Some(EngineError::Inventory { reason });
                smallvec![Effect::None]
            },

            LifecycleAction::InvoiceDeleted { invoice_id } => {
                tracing::debug!(%invoice_id, "Delete persisted");
                smallvec![Effect::None]
            },

            LifecycleAction::InvoicePersisted { .. } => smallvec![Effect::None],

            LifecycleAction::PersistFailed { invoice_id, reason } => {
                tracing::error!(%invoice_id, %reason, "State write failed");
                state.last_error = Some(EngineError::Store { reason });
                smallvec![Effect::None]
            },
        }
    }
}
