//! End-to-end lifecycle tests: the send path, mark-as-paid, guards, and
//! cooldowns, driven through the store runtime against in-memory providers.

#![allow(clippy::unwrap_used, clippy::panic)] // Test code can unwrap and panic

mod common;

use common::TestHarness;
use invoicing_core::error::{EmailError, EngineError};
use invoicing_core::invoice::{Caller, InvoiceItem, InvoiceStatus, Role, StockUpdateStatus};
use invoicing_core::notification::{NotificationKind, NotificationPriority};
use invoicing_engine::providers::{BlacklistRecord, InvoiceStore};
use invoicing_engine::{EngineConfig, LifecycleAction, SendOptions};
use std::time::Duration;

#[tokio::test]
async fn scenario_a_ready_to_send_succeeds() {
    let h = TestHarness::new();
    let id = h
        .create_draft("INV-001", TestHarness::two_lines_totaling_100())
        .await;

    h.send_invoice(id).await;

    let stored = h.stored(id).await;
    assert_eq!(stored.status, InvoiceStatus::Sent);
    assert!(stored.sent_at.is_some());
    assert!(stored.last_invoice_email_sent.is_some());
    assert!(stored.stripe_payment_link.is_some());
    assert_eq!(stored.total_cents, 10_000);

    assert_eq!(h.payment_links.calls(), 1, "payment link issued once");
    assert_eq!(h.email.invoice_requests().len(), 1, "email dispatched once");
    assert!(h.last_error().await.is_none());

    // The dispatched request carried the customer-facing metadata
    let request = &h.email.invoice_requests()[0];
    assert_eq!(request.invoice_number, "INV-001");
    assert_eq!(request.recipient, "billing@acme.example");
    assert_eq!(request.public_token, stored.public_token.as_str());
    assert_eq!(request.total_cents, 10_000);
}

#[tokio::test]
async fn resend_reuses_the_issued_payment_link() {
    let h = TestHarness::new();
    let id = h
        .create_draft("INV-001", TestHarness::two_lines_totaling_100())
        .await;

    h.send_invoice(id).await;
    h.clock.advance(chrono::Duration::minutes(11));
    h.send_invoice(id).await;

    assert_eq!(h.payment_links.calls(), 1, "link issued at most once");
    assert_eq!(h.email.invoice_requests().len(), 2);
    assert_eq!(h.stored(id).await.status, InvoiceStatus::Sent);
}

#[tokio::test]
async fn scenario_b_blacklist_blocks_until_override() {
    let h = TestHarness::new();
    h.blacklist.add(BlacklistRecord {
        customer_email: "BILLING@acme.example".to_string(),
        customer_name: "someone else".to_string(),
        reason: "unpaid balance".to_string(),
    });
    let id = h
        .create_draft("INV-001", TestHarness::two_lines_totaling_100())
        .await;

    h.send_invoice(id).await;

    assert_eq!(h.stored(id).await.status, InvoiceStatus::Draft);
    assert!(matches!(
        h.last_error().await,
        Some(EngineError::BlacklistMatch { .. })
    ));
    assert!(h.email.invoice_requests().is_empty(), "no dispatch attempted");

    // Explicit one-shot override proceeds
    h.send_invoice_with(id, SendOptions::new().with_blacklist_override())
        .await;
    assert_eq!(h.stored(id).await.status, InvoiceStatus::Sent);
    assert_eq!(h.email.invoice_requests().len(), 1);
}

#[tokio::test]
async fn scenario_c_paid_commits_despite_stock_failure() {
    let h = TestHarness::new();
    let id = h
        .create_draft("INV-002", TestHarness::two_lines_totaling_100())
        .await;
    h.send_invoice(id).await;
    h.inventory.set_fail(true);

    h.mark_paid(id).await;

    let stored = h.stored(id).await;
    assert_eq!(stored.status, InvoiceStatus::Paid);
    assert!(stored.paid_date.is_some());
    assert_eq!(stored.stock_update_status, StockUpdateStatus::Failed);

    // One warning notification recorded for reconciliation
    let notifications = h.notifications.notifications().await;
    let warnings: Vec<_> = notifications
        .iter()
        .filter(|n| n.kind == NotificationKind::StockUpdateFailed)
        .collect();
    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings[0].priority, NotificationPriority::Warning);
}

#[tokio::test]
async fn mark_paid_twice_decrements_stock_once() {
    let h = TestHarness::new();
    let id = h
        .create_draft("INV-003", TestHarness::two_lines_totaling_100())
        .await;
    h.send_invoice(id).await;

    h.mark_paid(id).await;
    h.mark_paid(id).await; // double-click

    assert_eq!(h.inventory.calls(), 1, "exactly one decrement call");
    let stored = h.stored(id).await;
    assert_eq!(stored.status, InvoiceStatus::Paid);
    assert_eq!(stored.stock_update_status, StockUpdateStatus::Completed);
    assert!(matches!(
        h.last_error().await,
        Some(EngineError::InvalidTransition { .. })
    ));
}

#[tokio::test]
async fn retry_stock_update_rearms_a_failed_decrement() {
    let h = TestHarness::new();
    let id = h
        .create_draft("INV-004", TestHarness::two_lines_totaling_100())
        .await;
    h.send_invoice(id).await;
    h.inventory.set_fail(true);
    h.mark_paid(id).await;
    assert_eq!(h.stored(id).await.stock_update_status, StockUpdateStatus::Failed);

    h.inventory.set_fail(false);
    h.store
        .send(LifecycleAction::RetryStockUpdate {
            invoice_id: id,
            caller: h.caller.clone(),
        })
        .await
        .unwrap();
    h.wait().await;

    assert_eq!(h.inventory.calls(), 2);
    assert_eq!(
        h.stored(id).await.stock_update_status,
        StockUpdateStatus::Completed
    );
}

#[tokio::test]
async fn illegal_transitions_leave_status_unchanged() {
    let h = TestHarness::new();
    let id = h
        .create_draft("INV-005", TestHarness::two_lines_totaling_100())
        .await;

    // Mark-paid on a draft
    h.mark_paid(id).await;
    assert_eq!(h.stored(id).await.status, InvoiceStatus::Draft);
    assert!(matches!(
        h.last_error().await,
        Some(EngineError::InvalidTransition { .. })
    ));

    h.send_invoice(id).await;
    h.clock.advance(chrono::Duration::minutes(11));
    h.mark_paid(id).await;
    assert_eq!(h.stored(id).await.status, InvoiceStatus::Paid);

    // Send, edit, delete, cancel on a paid invoice
    h.send_invoice(id).await;
    assert!(matches!(
        h.last_error().await,
        Some(EngineError::InvalidTransition { .. })
    ));
    assert_eq!(h.stored(id).await.status, InvoiceStatus::Paid);

    h.store
        .send(LifecycleAction::ReplaceItems {
            invoice_id: id,
            items: vec![InvoiceItem::free_text("Edit", 1, 100)],
            caller: h.caller.clone(),
        })
        .await
        .unwrap();
    h.wait().await;
    assert!(matches!(
        h.last_error().await,
        Some(EngineError::InvalidTransition { .. })
    ));

    h.store
        .send(LifecycleAction::DeleteInvoice {
            invoice_id: id,
            caller: h.caller.clone(),
        })
        .await
        .unwrap();
    h.wait().await;
    assert!(matches!(
        h.last_error().await,
        Some(EngineError::InvalidTransition { .. })
    ));

    h.store
        .send(LifecycleAction::CancelInvoice { invoice_id: id })
        .await
        .unwrap();
    h.wait().await;
    assert_eq!(h.stored(id).await.status, InvoiceStatus::Paid, "paid never cancels");
}

#[tokio::test]
async fn cooldown_rejects_with_remaining_seconds() {
    let h = TestHarness::new();
    let id = h
        .create_draft("INV-006", TestHarness::two_lines_totaling_100())
        .await;
    h.send_invoice(id).await;
    assert_eq!(h.email.invoice_requests().len(), 1);

    // 5 minutes into a 10 minute window
    h.clock.advance(chrono::Duration::minutes(5));
    h.send_invoice(id).await;
    match h.last_error().await {
        Some(EngineError::RateLimited { cooldown_remaining }) => {
            assert_eq!(cooldown_remaining, 300);
        },
        other => panic!("expected rate limit, got {other:?}"),
    }
    assert_eq!(h.email.invoice_requests().len(), 1, "no dispatch under cooldown");

    // 11 minutes after the send the window has passed
    h.clock.advance(chrono::Duration::minutes(6));
    h.send_invoice(id).await;
    assert_eq!(h.email.invoice_requests().len(), 2);
    assert!(h.last_error().await.is_none());
}

#[tokio::test]
async fn retryable_email_failure_does_not_consume_cooldown() {
    let h = TestHarness::new();
    let id = h
        .create_draft("INV-007", TestHarness::two_lines_totaling_100())
        .await;

    h.email.fail_with(EmailError::Unavailable);
    h.send_invoice(id).await;

    let stored = h.stored(id).await;
    assert_eq!(stored.status, InvoiceStatus::Draft);
    assert!(stored.last_invoice_email_sent.is_none(), "cooldown untouched");
    assert!(matches!(
        h.last_error().await,
        Some(EngineError::Email(EmailError::Unavailable))
    ));

    // Failure was recorded for later visibility
    let notifications = h.notifications.notifications().await;
    assert!(
        notifications
            .iter()
            .any(|n| n.kind == NotificationKind::EmailSendFailed)
    );

    // Immediate retry proceeds - no cooldown was started
    h.email.succeed();
    h.send_invoice(id).await;
    assert_eq!(h.stored(id).await.status, InvoiceStatus::Sent);
}

#[tokio::test]
async fn email_timeout_is_classified_retryable() {
    let config = EngineConfig::new().with_email_timeout(Duration::from_millis(50));
    let h = TestHarness::with_config(config);
    let id = h
        .create_draft("INV-008", TestHarness::two_lines_totaling_100())
        .await;

    h.email.respond_after(Duration::from_millis(300));
    h.send_invoice(id).await;

    match h.last_error().await {
        Some(EngineError::Email(error)) => {
            assert_eq!(error, EmailError::Timeout);
            assert!(error.is_retryable());
        },
        other => panic!("expected email timeout, got {other:?}"),
    }
    assert!(h.stored(id).await.last_invoice_email_sent.is_none());
}

#[tokio::test]
async fn promote_on_email_failure_keeps_link_shareable() {
    let h = TestHarness::new();
    let id = h
        .create_draft("INV-009", TestHarness::two_lines_totaling_100())
        .await;

    h.email.fail_with(EmailError::Rejected {
        reason: "mailbox unavailable".to_string(),
    });
    h.send_invoice_with(id, SendOptions::new().with_promote_on_email_failure())
        .await;

    let stored = h.stored(id).await;
    // Status moved so the link can be shared manually...
    assert_eq!(stored.status, InvoiceStatus::Sent);
    assert!(stored.stripe_payment_link.is_some());
    // ...but the customer-notified facts did not
    assert!(stored.sent_at.is_none());
    assert!(stored.last_invoice_email_sent.is_none());
    assert!(matches!(
        h.last_error().await,
        Some(EngineError::Email(EmailError::Rejected { .. }))
    ));
}

#[tokio::test]
async fn payment_link_failure_blocks_the_send() {
    let h = TestHarness::new();
    let id = h
        .create_draft("INV-010", TestHarness::two_lines_totaling_100())
        .await;

    h.payment_links
        .set_mode(invoicing_engine::mocks::LinkMode::Fail);
    h.send_invoice(id).await;

    assert_eq!(h.stored(id).await.status, InvoiceStatus::Draft);
    assert!(h.email.invoice_requests().is_empty(), "email never attempted");
    assert!(matches!(
        h.last_error().await,
        Some(EngineError::PaymentLink { .. })
    ));
}

#[tokio::test]
async fn out_of_band_link_is_picked_up_by_reread() {
    let h = TestHarness::new();
    let id = h
        .create_draft("INV-011", TestHarness::two_lines_totaling_100())
        .await;

    // The provider returns no inline URL but the backend persisted one
    h.payment_links
        .set_mode(invoicing_engine::mocks::LinkMode::OutOfBand);
    let mut record = h.stored(id).await;
    record.stripe_payment_link = Some("https://pay.example/out-of-band".to_string());
    h.invoices.update(record).await.unwrap();

    h.send_invoice(id).await;

    let stored = h.stored(id).await;
    assert_eq!(stored.status, InvoiceStatus::Sent);
    assert_eq!(
        stored.stripe_payment_link.as_deref(),
        Some("https://pay.example/out-of-band")
    );
}

#[tokio::test]
async fn public_token_is_stable_across_the_lifecycle() {
    let h = TestHarness::new();
    let id = h
        .create_draft("INV-012", TestHarness::two_lines_totaling_100())
        .await;
    let token = h.stored(id).await.public_token;

    h.store
        .send(LifecycleAction::ReplaceItems {
            invoice_id: id,
            items: vec![InvoiceItem::free_text("Revised", 1, 12_500)],
            caller: h.caller.clone(),
        })
        .await
        .unwrap();
    h.wait().await;
    h.send_invoice(id).await;
    h.clock.advance(chrono::Duration::minutes(11));
    h.mark_paid(id).await;

    assert_eq!(h.stored(id).await.public_token, token);
}

#[tokio::test]
async fn duplicate_invoice_number_is_rejected_by_the_store() {
    let h = TestHarness::new();
    let _first = h
        .create_draft("INV-013", TestHarness::two_lines_totaling_100())
        .await;

    h.store
        .send(LifecycleAction::CreateInvoice {
            invoice_number: "INV-013".to_string(),
            customer_name: "Other Corp".to_string(),
            customer_email: "other@corp.example".to_string(),
            tax_rate_bps: 0,
            items: vec![],
            caller: h.caller.clone(),
        })
        .await
        .unwrap();
    h.wait().await;

    assert!(matches!(
        h.last_error().await,
        Some(EngineError::DuplicateInvoiceNumber { .. })
    ));
    let count = h.invoices.list().await.unwrap().len();
    assert_eq!(count, 1, "second draft never persisted");
}

#[tokio::test]
async fn ownership_guards_apply_to_send_and_mark_paid() {
    let h = TestHarness::new();
    let id = h
        .create_draft("INV-014", TestHarness::two_lines_totaling_100())
        .await;

    // A different employee may not send
    h.store
        .send(LifecycleAction::SendInvoice {
            invoice_id: id,
            caller: Caller::new("user-2", Role::Employee),
            options: SendOptions::new(),
        })
        .await
        .unwrap();
    h.wait().await;
    assert!(matches!(h.last_error().await, Some(EngineError::Unauthorized)));
    assert_eq!(h.stored(id).await.status, InvoiceStatus::Draft);

    // An admin may send an employee-owned invoice
    h.store
        .send(LifecycleAction::SendInvoice {
            invoice_id: id,
            caller: Caller::new("admin-1", Role::Admin),
            options: SendOptions::new(),
        })
        .await
        .unwrap();
    h.wait().await;
    assert_eq!(h.stored(id).await.status, InvoiceStatus::Sent);

    // But only the creator or a super-admin may mark paid
    h.store
        .send(LifecycleAction::MarkPaid {
            invoice_id: id,
            caller: Caller::new("admin-1", Role::Admin),
        })
        .await
        .unwrap();
    h.wait().await;
    assert!(matches!(h.last_error().await, Some(EngineError::Unauthorized)));

    h.store
        .send(LifecycleAction::MarkPaid {
            invoice_id: id,
            caller: Caller::new("root", Role::SuperAdmin),
        })
        .await
        .unwrap();
    h.wait().await;
    assert_eq!(h.stored(id).await.status, InvoiceStatus::Paid);
}

#[tokio::test]
async fn send_requires_items_and_a_well_formed_email() {
    let h = TestHarness::new();
    let empty = h.create_draft("INV-015", vec![]).await;

    h.send_invoice(empty).await;
    assert!(matches!(h.last_error().await, Some(EngineError::Validation { .. })));
    assert!(h.email.invoice_requests().is_empty());

    // Malformed recipient: the draft is created fine, the send is blocked
    h.store
        .send(LifecycleAction::CreateInvoice {
            invoice_number: "INV-016".to_string(),
            customer_name: "Acme Corp".to_string(),
            customer_email: "not-an-email".to_string(),
            tax_rate_bps: 0,
            items: TestHarness::two_lines_totaling_100(),
            caller: h.caller.clone(),
        })
        .await
        .unwrap();
    h.wait().await;
    let id = h
        .store
        .state(|s| {
            s.invoices
                .values()
                .find(|i| i.invoice_number == "INV-016")
                .map(|i| i.id)
        })
        .await
        .unwrap();

    h.send_invoice(id).await;
    assert!(matches!(h.last_error().await, Some(EngineError::Validation { .. })));
    assert_eq!(h.stored(id).await.status, InvoiceStatus::Draft);
    assert!(h.email.invoice_requests().is_empty());
}

#[tokio::test]
async fn delete_is_draft_only_and_guarded() {
    let h = TestHarness::new();
    let id = h
        .create_draft("INV-017", TestHarness::two_lines_totaling_100())
        .await;

    h.store
        .send(LifecycleAction::DeleteInvoice {
            invoice_id: id,
            caller: Caller::new("user-2", Role::Employee),
        })
        .await
        .unwrap();
    h.wait().await;
    assert!(matches!(h.last_error().await, Some(EngineError::Unauthorized)));
    assert!(h.invoices.get(id).await.unwrap().is_some());

    h.store
        .send(LifecycleAction::DeleteInvoice {
            invoice_id: id,
            caller: h.caller.clone(),
        })
        .await
        .unwrap();
    h.wait().await;
    assert!(h.invoices.get(id).await.unwrap().is_none());
}

#[tokio::test]
async fn reminder_has_its_own_cooldown_class() {
    let h = TestHarness::new();
    let id = h
        .create_draft("INV-018", TestHarness::two_lines_totaling_100())
        .await;
    h.send_invoice(id).await;

    // The invoice-email cooldown is active, but reminders are independent
    h.store
        .send(LifecycleAction::SendReminder {
            invoice_id: id,
            caller: h.caller.clone(),
        })
        .await
        .unwrap();
    h.wait().await;
    assert_eq!(h.email.reminder_requests().len(), 1);
    assert!(h.stored(id).await.last_reminder_email_sent.is_some());

    // A second reminder inside its window is rejected
    h.store
        .send(LifecycleAction::SendReminder {
            invoice_id: id,
            caller: h.caller.clone(),
        })
        .await
        .unwrap();
    h.wait().await;
    assert!(matches!(
        h.last_error().await,
        Some(EngineError::RateLimited { .. })
    ));
    assert_eq!(h.email.reminder_requests().len(), 1);
}

#[tokio::test]
async fn external_cancel_and_overdue_lapse() {
    let h = TestHarness::new();
    let id = h
        .create_draft("INV-019", TestHarness::two_lines_totaling_100())
        .await;
    h.send_invoice(id).await;

    h.store
        .send(LifecycleAction::MarkOverdue { invoice_id: id })
        .await
        .unwrap();
    h.wait().await;
    assert_eq!(h.stored(id).await.status, InvoiceStatus::Overdue);

    h.store
        .send(LifecycleAction::CancelInvoice { invoice_id: id })
        .await
        .unwrap();
    h.wait().await;
    assert_eq!(h.stored(id).await.status, InvoiceStatus::Cancelled);

    // Duplicate cancel events are harmless
    h.store
        .send(LifecycleAction::CancelInvoice { invoice_id: id })
        .await
        .unwrap();
    h.wait().await;
    assert_eq!(h.stored(id).await.status, InvoiceStatus::Cancelled);
}
