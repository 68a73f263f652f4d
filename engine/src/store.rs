//! The store runtime.
//!
//! Coordinates reducer execution and effect handling: actions serialize at
//! the reducer behind a write lock (one logical actor per session), effects
//! run in spawned tasks, and any action an effect produces is fed back
//! through the reducer. Actions produced by effects are also broadcast to
//! observers, which is the push-style "this invoice changed" subscription -
//! observers refetch on receipt, so duplicates and lag are harmless.

use invoicing_core::effect::Effect;
use invoicing_core::reducer::Reducer;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::{RwLock, broadcast};

/// Errors that can occur during store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Store is shutting down and not accepting new actions.
    #[error("Store is shutting down")]
    ShutdownInProgress,

    /// Shutdown timed out waiting for effects to complete.
    #[error("Shutdown timed out with {0} effects still running")]
    ShutdownTimeout(usize),

    /// Timeout waiting for a matching action or effect completion.
    #[error("Timeout waiting for action")]
    Timeout,

    /// Action broadcast channel closed.
    #[error("Action broadcast channel closed")]
    ChannelClosed,
}

/// The runtime that manages state and executes effects.
///
/// # Type Parameters
///
/// - `S`: State type
/// - `A`: Action type
/// - `E`: Environment type
/// - `R`: Reducer implementation
///
/// # Example
///
/// ```ignore
/// let store = Store::new(LifecycleState::new(), InvoiceLifecycleReducer::new(), env);
/// store.send(LifecycleAction::MarkPaid { invoice_id, caller }).await?;
/// store.wait_for_effects(Duration::from_secs(5)).await?;
/// let status = store.state(|s| s.status_of(invoice_id)).await;
/// ```
pub struct Store<S, A, E, R>
where
    R: Reducer<State = S, Action = A, Environment = E>,
{
    state: Arc<RwLock<S>>,
    reducer: R,
    environment: E,
    shutdown: Arc<AtomicBool>,
    pending_effects: Arc<AtomicUsize>,
    /// Actions produced by effects are broadcast to observers.
    action_broadcast: broadcast::Sender<A>,
}

impl<S, A, E, R> Store<S, A, E, R>
where
    R: Reducer<State = S, Action = A, Environment = E> + Clone + Send + Sync + 'static,
    A: Send + Clone + 'static,
    S: Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    /// Create a store with initial state, reducer, and environment.
    #[must_use]
    pub fn new(initial_state: S, reducer: R, environment: E) -> Self {
        let (action_broadcast, _) = broadcast::channel(64);

        Self {
            state: Arc::new(RwLock::new(initial_state)),
            reducer,
            environment,
            shutdown: Arc::new(AtomicBool::new(false)),
            pending_effects: Arc::new(AtomicUsize::new(0)),
            action_broadcast,
        }
    }

    /// Send an action to the store.
    ///
    /// The reducer runs synchronously under the write lock; returned
    /// effects start executing in spawned tasks before this returns. Use
    /// [`Self::wait_for_effects`] when a test or caller needs the effect
    /// chain to settle.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownInProgress`] after shutdown began.
    pub async fn send(&self, action: A) -> Result<(), StoreError> {
        if self.shutdown.load(Ordering::Acquire) {
            return Err(StoreError::ShutdownInProgress);
        }
        metrics::counter!("store.actions").increment(1);

        let effects = {
            let mut state = self.state.write().await;
            self.reducer.reduce(&mut state, action, &self.environment)
        };
        for effect in effects {
            self.spawn_effect(effect);
        }
        Ok(())
    }

    /// Read state through a projection function.
    pub async fn state<F, T>(&self, f: F) -> T
    where
        F: FnOnce(&S) -> T,
    {
        let state = self.state.read().await;
        f(&state)
    }

    /// Subscribe to actions produced by effects.
    ///
    /// This is the external-change feed: an observer that sees any action
    /// for an invoice it displays performs a full refetch.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<A> {
        self.action_broadcast.subscribe()
    }

    /// Number of effects currently running.
    #[must_use]
    pub fn pending_effects(&self) -> usize {
        self.pending_effects.load(Ordering::Acquire)
    }

    /// Wait until every in-flight effect (including chained feedback)
    /// has completed.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Timeout`] when effects are still running at
    /// the deadline.
    pub async fn wait_for_effects(&self, timeout: Duration) -> Result<(), StoreError> {
        let start = std::time::Instant::now();
        let poll_interval = Duration::from_millis(10);

        loop {
            if self.pending_effects.load(Ordering::Acquire) == 0 {
                return Ok(());
            }
            if start.elapsed() >= timeout {
                return Err(StoreError::Timeout);
            }
            tokio::time::sleep(poll_interval).await;
        }
    }

    /// Send an action and wait for a matching result action.
    ///
    /// Designed for request-response flows: subscribes to the broadcast
    /// BEFORE sending (avoiding the race), then returns the first action
    /// produced by effects that matches the predicate.
    ///
    /// # Errors
    ///
    /// - [`StoreError::Timeout`]: no matching action before the deadline
    /// - [`StoreError::ChannelClosed`]: broadcast closed mid-wait
    /// - [`StoreError::ShutdownInProgress`]: store is shutting down
    pub async fn send_and_wait_for<F>(
        &self,
        action: A,
        predicate: F,
        timeout: Duration,
    ) -> Result<A, StoreError>
    where
        F: Fn(&A) -> bool,
    {
        let mut rx = self.action_broadcast.subscribe();
        self.send(action).await?;

        tokio::time::timeout(timeout, async {
            loop {
                match rx.recv().await {
                    Ok(action) if predicate(&action) => return Ok(action),
                    Ok(_) => {},
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "Action observer lagged");
                    },
                    Err(broadcast::error::RecvError::Closed) => {
                        return Err(StoreError::ChannelClosed);
                    },
                }
            }
        })
        .await
        .map_err(|_| StoreError::Timeout)?
    }

    /// Graceful shutdown: reject new actions, then wait for in-flight
    /// effects to drain.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownTimeout`] when effects are still
    /// running at the deadline.
    pub async fn shutdown(&self, timeout: Duration) -> Result<(), StoreError> {
        tracing::info!("Initiating graceful shutdown");
        self.shutdown.store(true, Ordering::Release);

        let start = std::time::Instant::now();
        loop {
            let pending = self.pending_effects.load(Ordering::Acquire);
            if pending == 0 {
                tracing::info!("All effects completed, shutdown successful");
                return Ok(());
            }
            if start.elapsed() >= timeout {
                tracing::error!(pending, "Shutdown timed out with effects still running");
                return Err(StoreError::ShutdownTimeout(pending));
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
    }

    fn spawn_effect(&self, effect: Effect<A>) {
        if matches!(effect, Effect::None) {
            return;
        }
        self.pending_effects.fetch_add(1, Ordering::AcqRel);
        let store = self.clone();
        tokio::spawn(async move {
            store.run_effect(effect).await;
            store.pending_effects.fetch_sub(1, Ordering::AcqRel);
        });
    }

    /// Execute one effect tree. Feedback actions re-enter the reducer and
    /// may spawn further effects; those are counted before this one
    /// finishes, so the pending counter never dips to zero mid-chain.
    fn run_effect<'a>(
        &'a self,
        effect: Effect<A>,
    ) -> Pin<Box<dyn Future<Output = ()> + Send + 'a>> {
        Box::pin(async move {
            match effect {
                Effect::None => {},
                Effect::Parallel(effects) => {
                    futures::future::join_all(
                        effects.into_iter().map(|effect| self.run_effect(effect)),
                    )
                    .await;
                },
                Effect::Sequential(effects) => {
                    for effect in effects {
                        self.run_effect(effect).await;
                    }
                },
                Effect::Delay { duration, action } => {
                    tokio::time::sleep(duration).await;
                    self.feed(*action).await;
                },
                Effect::Future(future) => {
                    if let Some(action) = future.await {
                        self.feed(action).await;
                    }
                },
            }
        })
    }

    /// Process an effect-produced action: broadcast it, reduce it, spawn
    /// whatever it returns. Runs even during shutdown - in-flight chains
    /// are drained, only new external sends are rejected.
    async fn feed(&self, action: A) {
        let _ = self.action_broadcast.send(action.clone());

        let effects = {
            let mut state = self.state.write().await;
            self.reducer.reduce(&mut state, action, &self.environment)
        };
        for effect in effects {
            self.spawn_effect(effect);
        }
    }
}

impl<S, A, E, R> Clone for Store<S, A, E, R>
where
    R: Reducer<State = S, Action = A, Environment = E> + Clone,
    E: Clone,
{
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
            reducer: self.reducer.clone(),
            environment: self.environment.clone(),
            shutdown: Arc::clone(&self.shutdown),
            pending_effects: Arc::clone(&self.pending_effects),
            action_broadcast: self.action_broadcast.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)] // Test code can unwrap

    use super::*;
    use invoicing_core::{SmallVec, smallvec};

    #[derive(Debug, Clone, Default)]
    struct CounterState {
        count: i64,
    }

    #[derive(Debug, Clone)]
    enum CounterAction {
        Increment,
        IncrementLater,
        Incremented,
    }

    #[derive(Clone)]
    struct CounterReducer;

    impl Reducer for CounterReducer {
        type State = CounterState;
        type Action = CounterAction;
        type Environment = ();

        fn reduce(
            &self,
            state: &mut CounterState,
            action: CounterAction,
            _env: &(),
        ) -> SmallVec<[Effect<CounterAction>; 4]> {
            match action {
                CounterAction::Increment => {
                    state.count += 1;
                    smallvec![Effect::None]
                },
                CounterAction::IncrementLater => {
                    smallvec![Effect::future(async { Some(CounterAction::Incremented) })]
                },
                CounterAction::Incremented => {
                    state.count += 1;
                    smallvec![Effect::None]
                },
            }
        }
    }

    #[tokio::test]
    async fn send_runs_reducer_synchronously() {
        let store = Store::new(CounterState::default(), CounterReducer, ());
        store.send(CounterAction::Increment).await.unwrap();
        assert_eq!(store.state(|s| s.count).await, 1);
    }

    #[tokio::test]
    async fn effect_feedback_reenters_reducer() {
        let store = Store::new(CounterState::default(), CounterReducer, ());
        store.send(CounterAction::IncrementLater).await.unwrap();
        store
            .wait_for_effects(Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(store.state(|s| s.count).await, 1);
    }

    #[tokio::test]
    async fn feedback_actions_are_broadcast() {
        let store = Store::new(CounterState::default(), CounterReducer, ());
        let result = store
            .send_and_wait_for(
                CounterAction::IncrementLater,
                |action| matches!(action, CounterAction::Incremented),
                Duration::from_secs(1),
            )
            .await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn shutdown_rejects_new_sends() {
        let store = Store::new(CounterState::default(), CounterReducer, ());
        store.shutdown(Duration::from_secs(1)).await.unwrap();
        assert!(matches!(
            store.send(CounterAction::Increment).await,
            Err(StoreError::ShutdownInProgress)
        ));
    }
}
