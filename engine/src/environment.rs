//! Lifecycle environment.
//!
//! All external dependencies the reducer and orchestrator need, injected as
//! one value. Constructed once per session and cloned into effects.

use crate::config::EngineConfig;
use crate::notifications::NotificationCenter;
use crate::providers::{
    BlacklistDirectory, EmailProvider, InventoryProvider, InvoiceStore, NotificationStore,
    PaymentLinkProvider,
};
use invoicing_core::clock::Clock;

/// Injected dependencies for the lifecycle reducer.
///
/// # Type Parameters
///
/// - `S`: Invoice store
/// - `P`: Payment-link provider
/// - `I`: Inventory provider
/// - `E`: Email provider
/// - `B`: Blacklist directory
/// - `N`: Notification store (behind the notification center)
/// - `C`: Clock
#[derive(Clone)]
pub struct LifecycleEnvironment<S, P, I, E, B, N, C>
where
    S: InvoiceStore + Clone,
    P: PaymentLinkProvider + Clone,
    I: InventoryProvider + Clone,
    E: EmailProvider + Clone,
    B: BlacklistDirectory + Clone,
    N: NotificationStore + Clone,
    C: Clock + Clone,
{
    /// Invoice store adapter.
    pub invoices: S,

    /// Payment-link issuance service.
    pub payment_links: P,

    /// Inventory decrement service.
    pub inventory: I,

    /// Transactional email service.
    pub email: E,

    /// Customer blacklist directory.
    pub blacklist: B,

    /// The session user's notification center.
    pub notifications: NotificationCenter<N>,

    /// Time source.
    pub clock: C,

    /// Engine tunables.
    pub config: EngineConfig,
}

impl<S, P, I, E, B, N, C> LifecycleEnvironment<S, P, I, E, B, N, C>
where
    S: InvoiceStore + Clone,
    P: PaymentLinkProvider + Clone,
    I: InventoryProvider + Clone,
    E: EmailProvider + Clone,
    B: BlacklistDirectory + Clone,
    N: NotificationStore + Clone,
    C: Clock + Clone,
{
    /// Create an environment.
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        invoices: S,
        payment_links: P,
        inventory: I,
        email: E,
        blacklist: B,
        notifications: NotificationCenter<N>,
        clock: C,
        config: EngineConfig,
    ) -> Self {
        Self {
            invoices,
            payment_links,
            inventory,
            email,
            blacklist,
            notifications,
            clock,
            config,
        }
    }
}
