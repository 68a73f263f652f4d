//! Session service wiring.
//!
//! One [`InvoiceSession`] per logged-in user, constructed explicitly
//! rather than held as ambient global state: it starts its digest
//! scheduler on login and stops everything on logout.

use crate::actions::LifecycleAction;
use crate::digest::DigestScheduler;
use crate::environment::LifecycleEnvironment;
use crate::lifecycle::InvoiceLifecycleReducer;
use crate::notifications::NotificationCenter;
use crate::providers::{
    BlacklistDirectory, EmailProvider, InventoryProvider, InvoiceStore, NotificationStore,
    PaymentLinkProvider,
};
use crate::state::LifecycleState;
use crate::store::{Store, StoreError};
use invoicing_core::clock::Clock;
use invoicing_core::error::Result;
use invoicing_core::invoice::Caller;
use std::time::Duration;

/// The store type a session runs.
pub type SessionStore<S, P, I, E, B, N, C> = Store<
    LifecycleState,
    LifecycleAction,
    LifecycleEnvironment<S, P, I, E, B, N, C>,
    InvoiceLifecycleReducer<S, P, I, E, B, N, C>,
>;

/// One user's running engine: lifecycle store, notification center, digest
/// scheduler.
pub struct InvoiceSession<S, P, I, E, B, N, C>
where
    S: InvoiceStore + Clone + 'static,
    P: PaymentLinkProvider + Clone + 'static,
    I: InventoryProvider + Clone + 'static,
    E: EmailProvider + Clone + 'static,
    B: BlacklistDirectory + Clone + 'static,
    N: NotificationStore + Clone + 'static,
    C: Clock + Clone + 'static,
{
    caller: Caller,
    store: SessionStore<S, P, I, E, B, N, C>,
    notifications: NotificationCenter<N>,
    digest: DigestScheduler<S, N, C>,
}

impl<S, P, I, E, B, N, C> InvoiceSession<S, P, I, E, B, N, C>
where
    S: InvoiceStore + Clone + 'static,
    P: PaymentLinkProvider + Clone + 'static,
    I: InventoryProvider + Clone + 'static,
    E: EmailProvider + Clone + 'static,
    B: BlacklistDirectory + Clone + 'static,
    N: NotificationStore + Clone + 'static,
    C: Clock + Clone + 'static,
{
    /// Start a session: hydrate notifications, load the caller's visible
    /// invoices, activate the digest scheduler.
    ///
    /// # Errors
    ///
    /// Returns a store error when the initial loads fail; nothing is left
    /// running in that case.
    pub async fn start(
        caller: Caller,
        environment: LifecycleEnvironment<S, P, I, E, B, N, C>,
    ) -> Result<Self> {
        let notifications = environment.notifications.clone();
        notifications.hydrate().await?;

        let mut state = LifecycleState::new();
        let visible = if caller.is_elevated() {
            environment.invoices.list().await?
        } else {
            environment.invoices.list_by_owner(&caller.user_id).await?
        };
        state.load(visible);

        let digest = DigestScheduler::new(
            environment.invoices.clone(),
            notifications.store().clone(),
            notifications.clone(),
            environment.clock.clone(),
            caller.clone(),
            environment.config.clone(),
        );
        digest.start();

        let store = Store::new(state, InvoiceLifecycleReducer::new(), environment);

        tracing::info!(user = %caller.user_id, "Invoice session started");
        Ok(Self {
            caller,
            store,
            notifications,
            digest,
        })
    }

    /// The acting caller.
    #[must_use]
    pub const fn caller(&self) -> &Caller {
        &self.caller
    }

    /// The lifecycle store.
    #[must_use]
    pub const fn store(&self) -> &SessionStore<S, P, I, E, B, N, C> {
        &self.store
    }

    /// The notification center.
    #[must_use]
    pub const fn notifications(&self) -> &NotificationCenter<N> {
        &self.notifications
    }

    /// The digest scheduler.
    #[must_use]
    pub const fn digest(&self) -> &DigestScheduler<S, N, C> {
        &self.digest
    }

    /// Stop the session: scheduler first, then drain in-flight effects.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownTimeout`] when effects are still
    /// running at the deadline.
    pub async fn shutdown(&self, timeout: Duration) -> std::result::Result<(), StoreError> {
        self.digest.stop();
        let result = self.store.shutdown(timeout).await;
        tracing::info!(user = %self.caller.user_id, "Invoice session stopped");
        result
    }
}
