//! # Invoicing Core
//!
//! Core types for the invoice lifecycle engine.
//!
//! This crate provides the fundamental abstractions the engine is built on:
//!
//! - **Domain model**: [`invoice::Invoice`], [`invoice::InvoiceItem`], roles
//!   and ownership guards, [`notification::Notification`] and its
//!   deduplication keys
//! - **Reducer**: pure function `(State, Action, Environment) → (State, Effects)`
//! - **Effect**: side effect descriptions (values, not execution)
//! - **Clock**: injected time source so every time-dependent rule
//!   (cooldowns, digest boundaries) is deterministic under test
//! - **Errors**: the [`error::EngineError`] taxonomy shared by every
//!   component
//!
//! ## Architecture Principles
//!
//! - Functional Core, Imperative Shell
//! - Explicit Effects (no hidden I/O)
//! - Dependency Injection via Environment
//!
//! Business logic lives in reducers; external collaborators (invoice store,
//! payment links, inventory, email, blacklist) are traits defined by the
//! engine crate and injected through its environment.

// Re-export commonly used types
pub use chrono::{DateTime, Utc};
pub use serde::{Deserialize, Serialize};
pub use smallvec::{SmallVec, smallvec};

pub mod clock;
pub mod effect;
pub mod error;
pub mod invoice;
pub mod notification;
pub mod reducer;
