//! The core trait for business logic.
//!
//! Reducers are pure functions: `(State, Action, Environment) → (State, Effects)`.
//! They contain all guards, validation, and status transition rules, and are
//! deterministic and testable. I/O only ever happens inside the effects a
//! reducer returns.

use crate::effect::Effect;
use smallvec::SmallVec;

/// The Reducer trait - core abstraction for business logic
///
/// # Type Parameters
///
/// - `State`: The domain state this reducer operates on
/// - `Action`: All possible inputs (commands from callers, feedback events
///   from effects)
/// - `Environment`: The injected dependencies this reducer needs
///
/// # Example
///
/// ```ignore
/// impl Reducer for InvoiceLifecycleReducer {
///     type State = LifecycleState;
///     type Action = LifecycleAction;
///     type Environment = LifecycleEnvironment<...>;
///
///     fn reduce(
///         &self,
///         state: &mut LifecycleState,
///         action: LifecycleAction,
///         env: &LifecycleEnvironment<...>,
///     ) -> SmallVec<[Effect<LifecycleAction>; 4]> {
///         match action {
///             LifecycleAction::MarkPaid { .. } => {
///                 // Guards, then status write, then decrement effect
///                 smallvec![Effect::None]
///             }
///             _ => smallvec![Effect::None],
///         }
///     }
/// }
/// ```
pub trait Reducer {
    /// The state type this reducer operates on
    type State;

    /// The action type this reducer processes
    type Action;

    /// The environment type with injected dependencies
    type Environment;

    /// Reduce an action into state changes and effects
    ///
    /// This is a pure function that:
    /// 1. Validates the action against guards and invariants
    /// 2. Updates state in place
    /// 3. Returns effect descriptions to be executed by the runtime
    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]>;
}
