//! # Invoicing Testing
//!
//! Testing utilities for the invoicing engine:
//! - Deterministic clocks ([`FixedClock`], [`SteppingClock`])
//! - The Given-When-Then [`ReducerTest`] harness
//!
//! ## Example
//!
//! ```ignore
//! use invoicing_testing::{test_clock, SteppingClock};
//!
//! #[tokio::test]
//! async fn cooldown_expires() {
//!     let clock = SteppingClock::new(test_clock().now());
//!     // ... first send ...
//!     clock.advance(chrono::Duration::minutes(11));
//!     // ... resend now proceeds ...
//! }
//! ```

use chrono::{DateTime, Utc};
use invoicing_core::clock::Clock;

/// Deterministic clock implementations.
pub mod mocks {
    use super::{Clock, DateTime, Utc};
    use std::sync::{Arc, Mutex};

    /// Fixed clock for deterministic tests
    ///
    /// Always returns the same time, making tests reproducible.
    ///
    /// # Example
    ///
    /// ```
    /// use invoicing_testing::mocks::FixedClock;
    /// use invoicing_core::clock::Clock;
    /// use chrono::Utc;
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// assert_eq!(clock.now(), clock.now());
    /// ```
    #[derive(Debug, Clone)]
    pub struct FixedClock {
        time: DateTime<Utc>,
    }

    impl FixedClock {
        /// Create a new fixed clock with the given time
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self { time }
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.time
        }
    }

    /// Manually advanced clock for cooldown and day-boundary tests.
    ///
    /// Clones share the same underlying time, so the clock injected into
    /// an environment can be advanced from the test body.
    #[derive(Debug, Clone)]
    pub struct SteppingClock {
        time: Arc<Mutex<DateTime<Utc>>>,
    }

    impl SteppingClock {
        /// Create a stepping clock starting at the given time
        #[must_use]
        pub fn new(start: DateTime<Utc>) -> Self {
            Self {
                time: Arc::new(Mutex::new(start)),
            }
        }

        /// Move the clock forward
        pub fn advance(&self, by: chrono::Duration) {
            let mut time = self
                .time
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner);
            *time += by;
        }

        /// Pin the clock to a specific time
        pub fn set(&self, to: DateTime<Utc>) {
            let mut time = self
                .time
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner);
            *time = to;
        }
    }

    impl Clock for SteppingClock {
        fn now(&self) -> DateTime<Utc> {
            *self
                .time
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner)
        }
    }

    /// Create a default fixed clock for tests (2025-01-01 00:00:00 UTC)
    ///
    /// # Panics
    ///
    /// This function will panic if the hardcoded timestamp fails to parse,
    /// which should never happen in practice.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(
            DateTime::parse_from_rfc3339("2025-01-01T00:00:00Z")
                .expect("hardcoded timestamp should always parse")
                .with_timezone(&Utc),
        )
    }
}


// Re-export commonly used items
pub use mocks::{FixedClock, SteppingClock, test_clock};
pub use reducer_test::ReducerTest;
