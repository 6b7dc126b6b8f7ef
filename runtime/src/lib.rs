//! # Ticketpay Runtime
//!
//! Executes reducers. A [`Store`](store::Store) owns the state, feeds actions
//! to the reducer and runs the returned effects, sending every action an
//! effect produces back through the reducer until no work remains.
//!
//! ```text
//!  action ──► reducer ──► state'
//!                │
//!                └──► effects ──► (await) ──► Some(action) ──┐
//!                                                            │
//!  ◄─────────────────────────────────────────────────────────┘
//! ```
//!
//! `send` returns only once the whole cascade has settled, which makes a store
//! usable as a request-scoped state machine: build it, send the entry action,
//! read the final state.

pub mod store {
    use futures::future::{BoxFuture, join_all};
    use std::sync::Arc;
    use ticketpay_core::{effect::Effect, reducer::Reducer};
    use tokio::sync::RwLock;

    /// Runs a reducer and its effects.
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
    /// let store = Store::new(LookupState::default(), LookupReducer, env);
    /// store.send(LookupAction::Start { key }).await;
    /// let value = store.state(|s| s.value.clone()).await;
    /// ```
    pub struct Store<S, A, E, R>
    where
        R: Reducer<State = S, Action = A, Environment = E>,
    {
        state: Arc<RwLock<S>>,
        reducer: Arc<R>,
        environment: Arc<E>,
    }

    impl<S, A, E, R> Clone for Store<S, A, E, R>
    where
        R: Reducer<State = S, Action = A, Environment = E>,
    {
        fn clone(&self) -> Self {
            Self {
                state: Arc::clone(&self.state),
                reducer: Arc::clone(&self.reducer),
                environment: Arc::clone(&self.environment),
            }
        }
    }

    impl<S, A, E, R> Store<S, A, E, R>
    where
        R: Reducer<State = S, Action = A, Environment = E> + Send + Sync + 'static,
        A: Send + 'static,
        S: Send + Sync + 'static,
        E: Send + Sync + 'static,
    {
        /// Create a new store with initial state, reducer, and environment
        #[must_use]
        pub fn new(initial_state: S, reducer: R, environment: E) -> Self {
            Self {
                state: Arc::new(RwLock::new(initial_state)),
                reducer: Arc::new(reducer),
                environment: Arc::new(environment),
            }
        }

        /// Send an action and drive every resulting effect to completion.
        ///
        /// The state lock is held only while the reducer runs, never while an
        /// effect is awaited.
        #[tracing::instrument(skip(self, action), name = "store_send")]
        pub async fn send(&self, action: A) {
            self.dispatch(action).await;
        }

        /// Read from the current state.
        pub async fn state<F, T>(&self, f: F) -> T
        where
            F: FnOnce(&S) -> T,
        {
            let state = self.state.read().await;
            f(&*state)
        }

        fn dispatch(&self, action: A) -> BoxFuture<'_, ()> {
            Box::pin(async move {
                let effects = {
                    let mut state = self.state.write().await;
                    self.reducer.reduce(&mut state, action, &self.environment)
                };

                join_all(effects.into_iter().map(|effect| self.execute(effect))).await;
            })
        }

        fn execute(&self, effect: Effect<A>) -> BoxFuture<'_, ()> {
            Box::pin(async move {
                match effect {
                    Effect::None => {
                        metrics::counter!("store.effects.executed", "type" => "none").increment(1);
                    },
                    Effect::Future(fut) => {
                        metrics::counter!("store.effects.executed", "type" => "future")
                            .increment(1);
                        if let Some(action) = fut.await {
                            tracing::trace!("Effect::Future produced an action, feeding back");
                            self.dispatch(action).await;
                        }
                    },
                    Effect::Parallel(effects) => {
                        metrics::counter!("store.effects.executed", "type" => "parallel")
                            .increment(1);
                        join_all(effects.into_iter().map(|effect| self.execute(effect))).await;
                    },
                    Effect::Sequential(effects) => {
                        metrics::counter!("store.effects.executed", "type" => "sequential")
                            .increment(1);
                        for effect in effects {
                            self.execute(effect).await;
                        }
                    },
                }
            })
        }
    }
}

pub use store::Store;
