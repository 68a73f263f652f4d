//! Side effect descriptions.
//!
//! Effects are NOT executed immediately. They are descriptions of what should
//! happen, returned from reducers and executed by the store runtime. This is
//! what keeps reducers pure: the send path's payment-link call, email
//! dispatch, and persistence writes are all values of this type until the
//! runtime interprets them.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

/// Effect type - describes a side effect to be executed
///
/// # Type Parameters
///
/// - `Action`: The action type that effects can produce (feedback loop).
///   An effect that completes with `Some(action)` feeds that action back
///   into the reducer, which is how external outcomes (email dispatched,
///   stock decrement failed, ...) re-enter the state machine.
pub enum Effect<Action> {
    /// No-op effect
    None,

    /// Run effects in parallel
    Parallel(Vec<Effect<Action>>),

    /// Run effects sequentially
    ///
    /// The send path relies on this ordering guarantee: payment-link
    /// issuance completes before email dispatch is attempted.
    Sequential(Vec<Effect<Action>>),

    /// Delayed action (for timer rearm and retries)
    Delay {
        /// How long to wait
        duration: Duration,
        /// Action to dispatch after delay
        action: Box<Action>,
    },

    /// Arbitrary async computation
    ///
    /// Returns `Option<Action>` - if Some, the action is fed back into the
    /// reducer
    Future(Pin<Box<dyn Future<Output = Option<Action>> + Send>>),
}

// Manual Debug implementation since Future doesn't implement Debug
impl<Action> std::fmt::Debug for Effect<Action>
where
    Action: std::fmt::Debug,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Effect::None => write!(f, "Effect::None"),
            Effect::Parallel(effects) => f.debug_tuple("Effect::Parallel").field(effects).finish(),
            Effect::Sequential(effects) => {
                f.debug_tuple("Effect::Sequential").field(effects).finish()
            },
            Effect::Delay { duration, action } => f
                .debug_struct("Effect::Delay")
                .field("duration", duration)
                .field("action", action)
                .finish(),
            Effect::Future(_) => write!(f, "Effect::Future(<future>)"),
        }
    }
}

impl<Action> Effect<Action> {
    /// Combine effects to run in parallel
    #[must_use]
    pub const fn merge(effects: Vec<Effect<Action>>) -> Effect<Action> {
        Effect::Parallel(effects)
    }

    /// Chain effects to run sequentially
    #[must_use]
    pub const fn chain(effects: Vec<Effect<Action>>) -> Effect<Action> {
        Effect::Sequential(effects)
    }

    /// Wrap an async block producing an optional feedback action
    pub fn future<F>(fut: F) -> Effect<Action>
    where
        F: Future<Output = Option<Action>> + Send + 'static,
    {
        Effect::Future(Box::pin(fut))
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::panic)] // Test code can panic

    use super::*;

    #[test]
    fn debug_formats_without_executing_futures() {
        let effect: Effect<u32> = Effect::future(async { Some(1) });
        assert_eq!(format!("{effect:?}"), "Effect::Future(<future>)");

        let none: Effect<u32> = Effect::None;
        assert_eq!(format!("{none:?}"), "Effect::None");
    }

    #[test]
    fn chain_preserves_order() {
        let chained: Effect<u32> = Effect::chain(vec![Effect::None, Effect::None]);
        match chained {
            Effect::Sequential(effects) => assert_eq!(effects.len(), 2),
            other => panic!("expected Sequential, got {other:?}"),
        }
    }
}
