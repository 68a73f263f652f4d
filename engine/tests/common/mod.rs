//! Shared test harness: a lifecycle store wired to in-memory providers
//! with a steppable clock.

#![allow(clippy::unwrap_used, clippy::expect_used, dead_code)] // Test support code

use invoicing_core::clock::Clock;
use invoicing_core::invoice::{Caller, Invoice, InvoiceId, InvoiceItem, Role};
use invoicing_engine::mocks::{
    MemoryBlacklistDirectory, MemoryInvoiceStore, MemoryNotificationStore, MockEmailProvider,
    MockInventoryProvider, MockPaymentLinkProvider,
};
use invoicing_engine::{
    EngineConfig, InvoiceLifecycleReducer, LifecycleAction, LifecycleEnvironment, LifecycleState,
    NotificationCenter, SendOptions, SessionStore,
};
use invoicing_testing::{SteppingClock, test_clock};
use std::time::Duration;

pub type TestEnv = LifecycleEnvironment<
    MemoryInvoiceStore,
    MockPaymentLinkProvider,
    MockInventoryProvider,
    MockEmailProvider,
    MemoryBlacklistDirectory,
    MemoryNotificationStore,
    SteppingClock,
>;

pub type TestStore = SessionStore<
    MemoryInvoiceStore,
    MockPaymentLinkProvider,
    MockInventoryProvider,
    MockEmailProvider,
    MemoryBlacklistDirectory,
    MemoryNotificationStore,
    SteppingClock,
>;

pub struct TestHarness {
    pub store: TestStore,
    pub invoices: MemoryInvoiceStore,
    pub payment_links: MockPaymentLinkProvider,
    pub inventory: MockInventoryProvider,
    pub email: MockEmailProvider,
    pub blacklist: MemoryBlacklistDirectory,
    pub notification_store: MemoryNotificationStore,
    pub notifications: NotificationCenter<MemoryNotificationStore>,
    pub clock: SteppingClock,
    pub caller: Caller,
}

impl TestHarness {
    pub fn new() -> Self {
        Self::with_config(EngineConfig::new())
    }

    pub fn with_config(config: EngineConfig) -> Self {
        let invoices = MemoryInvoiceStore::new();
        let payment_links = MockPaymentLinkProvider::new();
        let inventory = MockInventoryProvider::new();
        let email = MockEmailProvider::new();
        let blacklist = MemoryBlacklistDirectory::new();
        let notification_store = MemoryNotificationStore::new();
        let clock = SteppingClock::new(test_clock().now());
        let caller = Caller::new("user-1", Role::Employee);

        let notifications = NotificationCenter::new(
            caller.user_id.clone(),
            notification_store.clone(),
            config.max_notifications(),
        );

        let env = LifecycleEnvironment::new(
            invoices.clone(),
            payment_links.clone(),
            inventory.clone(),
            email.clone(),
            blacklist.clone(),
            notifications.clone(),
            clock.clone(),
            config,
        );
        let store = invoicing_engine::Store::new(
            LifecycleState::new(),
            InvoiceLifecycleReducer::new(),
            env,
        );

        Self {
            store,
            invoices,
            payment_links,
            inventory,
            email,
            blacklist,
            notification_store,
            notifications,
            clock,
            caller,
        }
    }

    /// Create a draft through the engine and return its id.
    pub async fn create_draft(&self, number: &str, items: Vec<InvoiceItem>) -> InvoiceId {
        self.store
            .send(LifecycleAction::CreateInvoice {
                invoice_number: number.to_string(),
                customer_name: "Acme Corp".to_string(),
                customer_email: "billing@acme.example".to_string(),
                tax_rate_bps: 0,
                items,
                caller: self.caller.clone(),
            })
            .await
            .unwrap();
        self.wait().await;

        let number = number.to_string();
        self.store
            .state(move |s| {
                s.invoices
                    .values()
                    .find(|i| i.invoice_number == number)
                    .map(|i| i.id)
            })
            .await
            .expect("draft should be in working state")
    }

    /// Two free-text lines totaling 100.00.
    pub fn two_lines_totaling_100() -> Vec<InvoiceItem> {
        vec![
            InvoiceItem::free_text("Consulting", 2, 3_000),
            InvoiceItem::free_text("Support", 1, 4_000),
        ]
    }

    pub async fn send_invoice(&self, id: InvoiceId) {
        self.send_invoice_with(id, SendOptions::new()).await;
    }

    pub async fn send_invoice_with(&self, id: InvoiceId, options: SendOptions) {
        self.store
            .send(LifecycleAction::SendInvoice {
                invoice_id: id,
                caller: self.caller.clone(),
                options,
            })
            .await
            .unwrap();
        self.wait().await;
    }

    pub async fn mark_paid(&self, id: InvoiceId) {
        self.store
            .send(LifecycleAction::MarkPaid {
                invoice_id: id,
                caller: self.caller.clone(),
            })
            .await
            .unwrap();
        self.wait().await;
    }

    /// Drain the effect chain.
    pub async fn wait(&self) {
        self.store
            .wait_for_effects(Duration::from_secs(2))
            .await
            .unwrap();
    }

    /// The persisted record.
    pub async fn stored(&self, id: InvoiceId) -> Invoice {
        use invoicing_engine::providers::InvoiceStore;
        self.invoices.get(id).await.unwrap().expect("stored invoice")
    }

    pub async fn last_error(&self) -> Option<invoicing_core::error::EngineError> {
        self.store.state(|s| s.last_error.clone()).await
    }
}
