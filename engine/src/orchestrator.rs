//! Side-effect orchestration.
//!
//! Every function here builds an [`Effect`] that sequences the external
//! calls around one state transition and feeds the outcome back into the
//! reducer as a [`LifecycleAction`]. Partial failure degrades instead of
//! corrupting invoice state:
//!
//! - The send path issues the payment link strictly before the email, and
//!   only a successful email response persists `status = sent` plus the
//!   cooldown anchor.
//! - The mark-as-paid path persists `paid` first and never rolls it back;
//!   the inventory decrement is a secondary, retriable concern whose
//!   failure is flagged in `stock_update_status` and surfaced as a warning
//!   notification.

use crate::actions::{LifecycleAction, SendOptions};
use crate::environment::LifecycleEnvironment;
use crate::notifications::NotificationCenter;
use crate::providers::{
    BlacklistDirectory, EmailProvider, EmailRequest, InventoryProvider, InvoiceStore,
    NotificationStore, PaymentLinkProvider,
};
use invoicing_core::clock::Clock;
use invoicing_core::effect::Effect;
use invoicing_core::error::{EmailError, EngineError};
use invoicing_core::invoice::{Invoice, InvoiceStatus, StockUpdateStatus};
use invoicing_core::notification::{Notification, NotificationKey, NotificationKind};
use serde_json::json;

/// Build the email request for an invoice.
fn email_request(invoice: &Invoice) -> EmailRequest {
    EmailRequest {
        invoice_id: invoice.id,
        recipient: invoice.customer_email.clone(),
        invoice_number: invoice.invoice_number.clone(),
        public_token: invoice.public_token.as_str().to_string(),
        total_cents: invoice.total_cents,
    }
}

/// Record an email-failure notification, never masking the email error.
async fn record_email_failure<N>(
    notifications: &NotificationCenter<N>,
    now: chrono::DateTime<chrono::Utc>,
    invoice: &Invoice,
    error: &EmailError,
) where
    N: NotificationStore,
{
    let notification = Notification::new(
        NotificationKind::EmailSendFailed,
        NotificationKey::point(NotificationKind::EmailSendFailed, invoice.id, now),
        now,
    )
    .with_invoice(invoice.id)
    .with_metadata(json!({
        "invoice_number": invoice.invoice_number,
        "error": error.to_string(),
        "retryable": error.is_retryable(),
    }));

    if let Err(record_error) = notifications.record(notification).await {
        tracing::warn!(error = %record_error, "Failed to record email-failure notification");
    }
}

/// Ensure the invoice carries a payment link, issuing one if absent.
///
/// When the provider responds without an inline URL the invoice record is
/// re-read, since the link may have been persisted server-side out-of-band.
async fn ensure_payment_link<S, P>(
    store: &S,
    payment_links: &P,
    invoice: &mut Invoice,
) -> Result<(), EngineError>
where
    S: InvoiceStore,
    P: PaymentLinkProvider,
{
    let response = payment_links.create_link(invoice).await?;

    if let Some(url) = response.url {
        invoice.stripe_payment_link = Some(url);
        store.update(invoice.clone()).await?;
        tracing::info!(
            invoice = %invoice.invoice_number,
            link_id = %response.link_id,
            "Payment link issued"
        );
        metrics::counter!("orchestrator.payment_link_issued").increment(1);
        return Ok(());
    }

    match store.get(invoice.id).await? {
        Some(fresh) if fresh.stripe_payment_link.is_some() => {
            *invoice = fresh;
            Ok(())
        },
        _ => Err(EngineError::PaymentLink {
            reason: format!("no payment URL returned (link id {})", response.link_id),
        }),
    }
}

/// The send/resend path.
///
/// Sequencing is strict: blacklist gate (first send only), payment link,
/// then email under the configured timeout. Only a successful email
/// response advances `sent_at` and the cooldown anchor.
pub fn send_effect<S, P, I, E, B, N, C>(
    env: &LifecycleEnvironment<S, P, I, E, B, N, C>,
    invoice: Invoice,
    options: SendOptions,
    first_send: bool,
) -> Effect<LifecycleAction>
where
    S: InvoiceStore + Clone + 'static,
    P: PaymentLinkProvider + Clone + 'static,
    I: InventoryProvider + Clone + 'static,
    E: EmailProvider + Clone + 'static,
    B: BlacklistDirectory + Clone + 'static,
    N: NotificationStore + Clone + 'static,
    C: Clock + Clone + 'static,
{
    let store = env.invoices.clone();
    let payment_links = env.payment_links.clone();
    let email = env.email.clone();
    let blacklist = env.blacklist.clone();
    let notifications = env.notifications.clone();
    let clock = env.clock.clone();
    let email_timeout = env.config.email_timeout();

    Effect::future(async move {
        let invoice_id = invoice.id;

        // Blacklist gate: first send only, bypassed by the one-shot
        // override flag
        if first_send && !options.override_blacklist {
            match blacklist
                .find_match(&invoice.customer_email, &invoice.customer_name)
                .await
            {
                Ok(Some(record)) => {
                    tracing::warn!(
                        invoice = %invoice.invoice_number,
                        "Send blocked by blacklist match"
                    );
                    metrics::counter!("orchestrator.blacklist_blocked").increment(1);
                    return Some(LifecycleAction::SendFailed {
                        invoice_id,
                        error: EngineError::BlacklistMatch {
                            reason: record.reason,
                        },
                        promoted: false,
                    });
                },
                Ok(None) => {},
                Err(error) => {
                    return Some(LifecycleAction::SendFailed {
                        invoice_id,
                        error,
                        promoted: false,
                    });
                },
            }
        }

        let mut invoice = invoice;
        if invoice.stripe_payment_link.is_none() {
            if let Err(error) = ensure_payment_link(&store, &payment_links, &mut invoice).await {
                return Some(LifecycleAction::SendFailed {
                    invoice_id,
                    error,
                    promoted: false,
                });
            }
        }

        let request = email_request(&invoice);
        let outcome = match tokio::time::timeout(email_timeout, email.send_invoice_email(&request))
            .await
        {
            Ok(result) => result,
            Err(_elapsed) => Err(EmailError::Timeout),
        };

        match outcome {
            Ok(receipt) => {
                let now = clock.now();
                invoice.status = InvoiceStatus::Sent;
                invoice.sent_at = Some(now);
                invoice.last_invoice_email_sent = Some(now);
                if let Err(error) = store.update(invoice.clone()).await {
                    tracing::error!(
                        invoice = %invoice.invoice_number,
                        %error,
                        "Email dispatched but status write failed"
                    );
                    return Some(LifecycleAction::SendFailed {
                        invoice_id,
                        error,
                        promoted: false,
                    });
                }
                tracing::info!(
                    invoice = %invoice.invoice_number,
                    message_id = %receipt.message_id,
                    "Invoice email dispatched"
                );
                metrics::counter!("orchestrator.email_sent").increment(1);
                let payment_link = invoice.stripe_payment_link.clone().unwrap_or_default();
                Some(LifecycleAction::SendCompleted {
                    invoice_id,
                    payment_link,
                    completed_at: now,
                })
            },
            Err(email_error) => {
                metrics::counter!("orchestrator.email_failed").increment(1);
                record_email_failure(&notifications, clock.now(), &invoice, &email_error).await;

                let mut promoted = false;
                if options.promote_on_email_failure {
                    // Caller chose to proceed: the link is shareable even
                    // though the customer was not notified. Send timestamps
                    // stay untouched so the cooldown is not consumed.
                    invoice.status = InvoiceStatus::Sent;
                    match store.update(invoice.clone()).await {
                        Ok(()) => promoted = true,
                        Err(error) => {
                            tracing::warn!(
                                invoice = %invoice.invoice_number,
                                %error,
                                "Failed to persist promoted sent status"
                            );
                        },
                    }
                }
                Some(LifecycleAction::SendFailed {
                    invoice_id,
                    error: EngineError::Email(email_error),
                    promoted,
                })
            },
        }
    })
}

/// The inventory decrement leg, shared by mark-as-paid and the operator
/// retry. Persists the terminal `stock_update_status` and flags failures.
async fn run_stock_decrement<S, I, N, C>(
    store: &S,
    inventory: &I,
    notifications: &NotificationCenter<N>,
    clock: &C,
    mut invoice: Invoice,
) -> LifecycleAction
where
    S: InvoiceStore,
    I: InventoryProvider,
    N: NotificationStore,
    C: Clock,
{
    let invoice_id = invoice.id;
    match inventory.decrement_for_invoice(invoice_id).await {
        Ok(()) => {
            invoice.stock_update_status = StockUpdateStatus::Completed;
            if let Err(error) = store.update(invoice.clone()).await {
                return LifecycleAction::PersistFailed {
                    invoice_id,
                    reason: error.to_string(),
                };
            }
            tracing::info!(invoice = %invoice.invoice_number, "Stock decremented");
            metrics::counter!("orchestrator.stock_decremented").increment(1);
            LifecycleAction::StockDecremented { invoice_id }
        },
        Err(error) => {
            let reason = error.to_string();
            invoice.stock_update_status = StockUpdateStatus::Failed;
            if let Err(persist_error) = store.update(invoice.clone()).await {
                tracing::error!(%persist_error, "Failed to persist stock-failure marker");
            }

            let now = clock.now();
            let notification = Notification::new(
                NotificationKind::StockUpdateFailed,
                NotificationKey::point(NotificationKind::StockUpdateFailed, invoice_id, now),
                now,
            )
            .with_invoice(invoice_id)
            .with_metadata(json!({
                "invoice_number": invoice.invoice_number,
                "error": reason,
            }));
            if let Err(record_error) = notifications.record(notification).await {
                tracing::warn!(error = %record_error, "Failed to record stock-failure notification");
            }

            tracing::warn!(
                invoice = %invoice.invoice_number,
                error = %reason,
                "Inventory decrement failed; flagged for manual reconciliation"
            );
            metrics::counter!("orchestrator.stock_decrement_failed").increment(1);
            LifecycleAction::StockDecrementFailed { invoice_id, reason }
        },
    }
}

/// The mark-as-paid path.
///
/// The invoice passed in already carries `status = paid`, `paid_date`, and
/// the armed `stock_update_status`. The paid write lands first; the
/// decrement outcome never gates or reverts it.
pub fn mark_paid_effect<S, P, I, E, B, N, C>(
    env: &LifecycleEnvironment<S, P, I, E, B, N, C>,
    invoice: Invoice,
    decrement_needed: bool,
) -> Effect<LifecycleAction>
where
    S: InvoiceStore + Clone + 'static,
    P: PaymentLinkProvider + Clone + 'static,
    I: InventoryProvider + Clone + 'static,
    E: EmailProvider + Clone + 'static,
    B: BlacklistDirectory + Clone + 'static,
    N: NotificationStore + Clone + 'static,
    C: Clock + Clone + 'static,
{
    let store = env.invoices.clone();
    let inventory = env.inventory.clone();
    let notifications = env.notifications.clone();
    let clock = env.clock.clone();

    Effect::future(async move {
        let invoice_id = invoice.id;

        if let Err(error) = store.update(invoice.clone()).await {
            return Some(LifecycleAction::PersistFailed {
                invoice_id,
                reason: error.to_string(),
            });
        }
        tracing::info!(invoice = %invoice.invoice_number, "Invoice marked paid");
        metrics::counter!("orchestrator.marked_paid").increment(1);

        let now = clock.now();
        let notification = Notification::new(
            NotificationKind::PaymentReceived,
            NotificationKey::point(NotificationKind::PaymentReceived, invoice_id, now),
            now,
        )
        .with_invoice(invoice_id)
        .with_metadata(json!({
            "invoice_number": invoice.invoice_number,
            "total_cents": invoice.total_cents,
        }));
        if let Err(record_error) = notifications.record(notification).await {
            tracing::warn!(error = %record_error, "Failed to record payment notification");
        }

        if decrement_needed {
            Some(run_stock_decrement(&store, &inventory, &notifications, &clock, invoice).await)
        } else {
            Some(LifecycleAction::InvoicePersisted { invoice_id })
        }
    })
}

/// The operator retry of a failed decrement.
///
/// The invoice passed in already carries the re-armed
/// `stock_update_status = pending`; that marker is persisted before the
/// call so a crash mid-retry is observable.
pub fn stock_retry_effect<S, P, I, E, B, N, C>(
    env: &LifecycleEnvironment<S, P, I, E, B, N, C>,
    invoice: Invoice,
) -> Effect<LifecycleAction>
where
    S: InvoiceStore + Clone + 'static,
    P: PaymentLinkProvider + Clone + 'static,
    I: InventoryProvider + Clone + 'static,
    E: EmailProvider + Clone + 'static,
    B: BlacklistDirectory + Clone + 'static,
    N: NotificationStore + Clone + 'static,
    C: Clock + Clone + 'static,
{
    let store = env.invoices.clone();
    let inventory = env.inventory.clone();
    let notifications = env.notifications.clone();
    let clock = env.clock.clone();

    Effect::future(async move {
        let invoice_id = invoice.id;
        if let Err(error) = store.update(invoice.clone()).await {
            return Some(LifecycleAction::PersistFailed {
                invoice_id,
                reason: error.to_string(),
            });
        }
        Some(run_stock_decrement(&store, &inventory, &notifications, &clock, invoice).await)
    })
}

/// The reminder path: one email under the timeout, no status change.
pub fn reminder_effect<S, P, I, E, B, N, C>(
    env: &LifecycleEnvironment<S, P, I, E, B, N, C>,
    invoice: Invoice,
) -> Effect<LifecycleAction>
where
    S: InvoiceStore + Clone + 'static,
    P: PaymentLinkProvider + Clone + 'static,
    I: InventoryProvider + Clone + 'static,
    E: EmailProvider + Clone + 'static,
    B: BlacklistDirectory + Clone + 'static,
    N: NotificationStore + Clone + 'static,
    C: Clock + Clone + 'static,
{
    let store = env.invoices.clone();
    let email = env.email.clone();
    let notifications = env.notifications.clone();
    let clock = env.clock.clone();
    let email_timeout = env.config.email_timeout();

    Effect::future(async move {
        let mut invoice = invoice;
        let invoice_id = invoice.id;
        let request = email_request(&invoice);

        let outcome =
            match tokio::time::timeout(email_timeout, email.send_reminder_email(&request)).await {
                Ok(result) => result,
                Err(_elapsed) => Err(EmailError::Timeout),
            };

        match outcome {
            Ok(receipt) => {
                let now = clock.now();
                invoice.last_reminder_email_sent = Some(now);
                if let Err(error) = store.update(invoice.clone()).await {
                    return Some(LifecycleAction::PersistFailed {
                        invoice_id,
                        reason: error.to_string(),
                    });
                }
                tracing::info!(
                    invoice = %invoice.invoice_number,
                    message_id = %receipt.message_id,
                    "Reminder email dispatched"
                );
                metrics::counter!("orchestrator.reminder_sent").increment(1);
                Some(LifecycleAction::ReminderSent {
                    invoice_id,
                    sent_at: now,
                })
            },
            Err(email_error) => {
                metrics::counter!("orchestrator.reminder_failed").increment(1);
                record_email_failure(&notifications, clock.now(), &invoice, &email_error).await;
                Some(LifecycleAction::ReminderFailed {
                    invoice_id,
                    error: EngineError::Email(email_error),
                })
            },
        }
    })
}

/// Persist an invoice snapshot (item edits, external status changes).
pub fn persist_effect<S, P, I, E, B, N, C>(
    env: &LifecycleEnvironment<S, P, I, E, B, N, C>,
    invoice: Invoice,
) -> Effect<LifecycleAction>
where
    S: InvoiceStore + Clone + 'static,
    P: PaymentLinkProvider + Clone + 'static,
    I: InventoryProvider + Clone + 'static,
    E: EmailProvider + Clone + 'static,
    B: BlacklistDirectory + Clone + 'static,
    N: NotificationStore + Clone + 'static,
    C: Clock + Clone + 'static,
{
    let store = env.invoices.clone();
    Effect::future(async move {
        let invoice_id = invoice.id;
        match store.update(invoice).await {
            Ok(()) => Some(LifecycleAction::InvoicePersisted { invoice_id }),
            Err(error) => Some(LifecycleAction::PersistFailed {
                invoice_id,
                reason: error.to_string(),
            }),
        }
    })
}

/// Insert a fresh draft into the store.
pub fn create_effect<S, P, I, E, B, N, C>(
    env: &LifecycleEnvironment<S, P, I, E, B, N, C>,
    invoice: Invoice,
) -> Effect<LifecycleAction>
where
    S: InvoiceStore + Clone + 'static,
    P: PaymentLinkProvider + Clone + 'static,
    I: InventoryProvider + Clone + 'static,
    E: EmailProvider + Clone + 'static,
    B: BlacklistDirectory + Clone + 'static,
    N: NotificationStore + Clone + 'static,
    C: Clock + Clone + 'static,
{
    let store = env.invoices.clone();
    Effect::future(async move {
        let invoice_id = invoice.id;
        match store.insert(invoice).await {
            Ok(()) => Some(LifecycleAction::InvoiceCreated { invoice_id }),
            Err(error) => Some(LifecycleAction::CreateFailed { invoice_id, error }),
        }
    })
}

/// Remove a draft from the store.
pub fn delete_effect<S, P, I, E, B, N, C>(
    env: &LifecycleEnvironment<S, P, I, E, B, N, C>,
    invoice_id: invoicing_core::invoice::InvoiceId,
) -> Effect<LifecycleAction>
where
    S: InvoiceStore + Clone + 'static,
    P: PaymentLinkProvider + Clone + 'static,
    I: InventoryProvider + Clone + 'static,
    E: EmailProvider + Clone + 'static,
    B: BlacklistDirectory + Clone + 'static,
    N: NotificationStore + Clone + 'static,
    C: Clock + Clone + 'static,
{
    let store = env.invoices.clone();
    Effect::future(async move {
        match store.delete(invoice_id).await {
            Ok(()) => Some(LifecycleAction::InvoiceDeleted { invoice_id }),
            Err(error) => Some(LifecycleAction::PersistFailed {
                invoice_id,
                reason: error.to_string(),
            }),
        }
    })
}
