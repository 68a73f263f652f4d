//! # Invoicing Engine
//!
//! The invoice lifecycle and notification engine.
//!
//! ## Core Components
//!
//! - **State machine** ([`lifecycle`]): validates and applies status
//!   transitions under role/ownership guards
//! - **Side-effect orchestrator** ([`orchestrator`]): sequences payment-link
//!   issuance, inventory decrement, and email dispatch around transitions,
//!   tolerating partial failure
//! - **Cooldown tracker** ([`cooldown`]): authoritative rate limiting for
//!   repeated sends
//! - **Notification center** ([`notifications`]): deduplicated, persisted,
//!   per-user notification list with unread tracking
//! - **Digest scheduler** ([`digest`]): the once-per-day scan feeding the
//!   notification center
//! - **Store runtime** ([`store`]): the action → reducer → effects → action
//!   feedback loop
//! - **Session** ([`session`]): explicit per-user wiring with
//!   start/shutdown lifecycle
//!
//! ## Example
//!
//! ```ignore
//! let env = LifecycleEnvironment::new(
//!     invoice_store, payment_links, inventory, email, blacklist,
//!     NotificationCenter::new(user_id, notification_store, 50),
//!     SystemClock,
//!     EngineConfig::new(),
//! );
//! let session = InvoiceSession::start(caller.clone(), env).await?;
//!
//! session.store()
//!     .send(LifecycleAction::SendInvoice { invoice_id, caller, options: SendOptions::new() })
//!     .await?;
//! ```

pub mod actions;
pub mod config;
pub mod cooldown;
pub mod digest;
pub mod environment;
pub mod lifecycle;
pub mod notifications;
pub mod orchestrator;
pub mod providers;
pub mod session;
pub mod state;
pub mod store;

#[cfg(any(test, feature = "test-utils"))]
pub mod mocks;

pub use actions::{LifecycleAction, SendOptions};
pub use config::EngineConfig;
pub use cooldown::{CooldownKind, CooldownTracker};
pub use digest::DigestScheduler;
pub use environment::LifecycleEnvironment;
pub use lifecycle::InvoiceLifecycleReducer;
pub use notifications::NotificationCenter;
pub use session::{InvoiceSession, SessionStore};
pub use state::LifecycleState;
pub use store::{Store, StoreError};
