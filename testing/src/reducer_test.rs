//! Given-When-Then harness for reducers.

#![allow(clippy::module_name_repetitions)]

use ticketpay_core::{effect::Effect, reducer::Reducer};

type StateAssertion<S> = Box<dyn FnOnce(&S)>;
type EffectAssertion<A> = Box<dyn FnOnce(&[Effect<A>])>;

/// Runs one action through a reducer and checks the outcome.
///
/// `given_actions` replays earlier actions first (their effects are dropped),
/// which is how a multi-step workflow is put into an intermediate phase.
///
/// ```ignore
/// ReducerTest::new(ReconciliationReducer::new())
///     .with_env(env)
///     .given_state(ReconciliationState::default())
///     .given_actions(vec![ReconciliationAction::VerifyRequested { reference }])
///     .when_action(ReconciliationAction::GatewayUnreachable { detail })
///     .then_state(|s| assert!(s.is_failed()))
///     .then_effects(assertions::assert_no_effects)
///     .run();
/// ```
pub struct ReducerTest<R, S, A, E>
where
    R: Reducer<State = S, Action = A, Environment = E>,
{
    reducer: R,
    environment: Option<E>,
    initial_state: Option<S>,
    history: Vec<A>,
    action: Option<A>,
    state_assertions: Vec<StateAssertion<S>>,
    effect_assertions: Vec<EffectAssertion<A>>,
}

impl<R, S, A, E> ReducerTest<R, S, A, E>
where
    R: Reducer<State = S, Action = A, Environment = E>,
{
    /// Create a new reducer test with the given reducer
    #[must_use]
    pub const fn new(reducer: R) -> Self {
        Self {
            reducer,
            environment: None,
            initial_state: None,
            history: Vec::new(),
            action: None,
            state_assertions: Vec::new(),
            effect_assertions: Vec::new(),
        }
    }

    /// Set the environment for the test
    #[must_use]
    pub fn with_env(mut self, env: E) -> Self {
        self.environment = Some(env);
        self
    }

    /// Set the initial state (Given)
    #[must_use]
    pub fn given_state(mut self, state: S) -> Self {
        self.initial_state = Some(state);
        self
    }

    /// Actions applied before the action under test (Given)
    #[must_use]
    pub fn given_actions(mut self, actions: Vec<A>) -> Self {
        self.history = actions;
        self
    }

    /// Set the action to test (When)
    #[must_use]
    pub fn when_action(mut self, action: A) -> Self {
        self.action = Some(action);
        self
    }

    /// Add an assertion about the resulting state (Then)
    #[must_use]
    pub fn then_state<F>(mut self, assertion: F) -> Self
    where
        F: FnOnce(&S) + 'static,
    {
        self.state_assertions.push(Box::new(assertion));
        self
    }

    /// Add an assertion about the resulting effects (Then)
    #[must_use]
    pub fn then_effects<F>(mut self, assertion: F) -> Self
    where
        F: FnOnce(&[Effect<A>]) + 'static,
    {
        self.effect_assertions.push(Box::new(assertion));
        self
    }

    /// Run the test and execute all assertions
    ///
    /// # Panics
    ///
    /// Panics if initial state, action, or environment is not set,
    /// or if any assertion fails.
    #[allow(clippy::expect_used)]
    pub fn run(self) {
        let mut state = self
            .initial_state
            .expect("Initial state must be set with given_state()");
        let action = self.action.expect("Action must be set with when_action()");
        let env = self
            .environment
            .expect("Environment must be set with with_env()");

        for earlier in self.history {
            let _ = self.reducer.reduce(&mut state, earlier, &env);
        }

        let effects = self.reducer.reduce(&mut state, action, &env);

        for assertion in self.state_assertions {
            assertion(&state);
        }

        for assertion in self.effect_assertions {
            assertion(&effects);
        }
    }
}

/// Assertions over effect lists
pub mod assertions {
    use ticketpay_core::effect::Effect;

    /// Assert that there are no effects (an empty list or a single `Effect::None`)
    ///
    /// # Panics
    ///
    /// Panics if any real effect was returned.
    pub fn assert_no_effects<A: std::fmt::Debug>(effects: &[Effect<A>]) {
        assert!(
            effects.iter().all(Effect::is_none),
            "Expected no effects, but found {}: {:?}",
            effects.len(),
            effects
        );
    }

    /// Assert the number of top-level effects
    ///
    /// # Panics
    ///
    /// Panics if the number of effects doesn't match expected.
    pub fn assert_effects_count<A>(effects: &[Effect<A>], expected: usize) {
        assert_eq!(
            effects.len(),
            expected,
            "Expected {expected} effects, but found {}",
            effects.len()
        );
    }

    /// Number of `Effect::Future` leaves, looking inside `Parallel` and `Sequential`.
    #[must_use]
    pub fn future_count<A>(effects: &[Effect<A>]) -> usize {
        effects
            .iter()
            .map(|effect| match effect {
                Effect::None => 0,
                Effect::Future(_) => 1,
                Effect::Parallel(inner) | Effect::Sequential(inner) => future_count(inner),
            })
            .sum()
    }

    /// Assert that at least one future effect is present
    ///
    /// # Panics
    ///
    /// Panics if no `Effect::Future` is found at any depth.
    pub fn assert_has_future_effect<A>(effects: &[Effect<A>]) {
        assert!(
            future_count(effects) > 0,
            "Expected at least one Future effect, but none found"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use smallvec::{SmallVec, smallvec};

    #[derive(Clone, Debug)]
    struct Tally {
        count: i32,
    }

    #[derive(Clone, Debug)]
    enum TallyAction {
        Add(i32),
        Report,
    }

    struct TallyReducer;

    impl Reducer for TallyReducer {
        type State = Tally;
        type Action = TallyAction;
        type Environment = ();

        fn reduce(
            &self,
            state: &mut Tally,
            action: TallyAction,
            _env: &(),
        ) -> SmallVec<[Effect<TallyAction>; 4]> {
            match action {
                TallyAction::Add(n) => {
                    state.count += n;
                    SmallVec::new()
                },
                TallyAction::Report => smallvec![Effect::merge(vec![
                    Effect::Future(Box::pin(async { None })),
                    Effect::Future(Box::pin(async { None })),
                ])],
            }
        }
    }

    #[test]
    fn test_history_is_replayed_before_action() {
        ReducerTest::new(TallyReducer)
            .with_env(())
            .given_state(Tally { count: 0 })
            .given_actions(vec![TallyAction::Add(2), TallyAction::Add(3)])
            .when_action(TallyAction::Add(1))
            .then_state(|state| assert_eq!(state.count, 6))
            .then_effects(assertions::assert_no_effects)
            .run();
    }

    #[test]
    fn test_future_count_looks_inside_parallel() {
        ReducerTest::new(TallyReducer)
            .with_env(())
            .given_state(Tally { count: 0 })
            .when_action(TallyAction::Report)
            .then_effects(|effects| {
                assertions::assert_effects_count(effects, 1);
                assertions::assert_has_future_effect(effects);
                assert_eq!(assertions::future_count(effects), 2);
            })
            .run();
    }
}
