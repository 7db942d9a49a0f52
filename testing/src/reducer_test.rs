//! Ergonomic testing utilities for reducers
//!
//! This module provides a fluent API for testing reducers with readable Given-When-Then syntax.

#![allow(clippy::module_name_repetitions)] // ReducerTest is the natural name

use eventhub_core::reducer::Reducer;

/// Type alias for state assertion functions
type StateAssertion<S> = Box<dyn FnOnce(&S)>;

/// Type alias for effect assertion functions
type EffectAssertion<F> = Box<dyn FnOnce(&[F])>;

/// Fluent API for testing reducers with Given-When-Then syntax
///
/// # Example
///
/// ```
/// use eventhub_core::roster::{RosterAction, RosterReducer, Rejection};
/// use eventhub_core::authorization::Principal;
/// use eventhub_testing::{fixtures, ReducerTest};
///
/// let roster = fixtures::published_roster(1);
/// let now = fixtures::now();
///
/// ReducerTest::new(RosterReducer::new())
///     .with_env(fixtures::roster_env())
///     .given_state(roster)
///     .when_action(RosterAction::Register { principal: Principal::Anonymous, now })
///     .then_state(|state| {
///         assert_eq!(state.last_rejection, Some(Rejection::LoginRequired));
///     })
///     .then_effects(|effects| assert!(effects.is_empty()))
///     .run();
/// ```
pub struct ReducerTest<R>
where
    R: Reducer,
{
    reducer: R,
    environment: Option<R::Environment>,
    initial_state: Option<R::State>,
    actions: Vec<R::Action>,
    state_assertions: Vec<StateAssertion<R::State>>,
    effect_assertions: Vec<EffectAssertion<R::Effect>>,
}

impl<R> ReducerTest<R>
where
    R: Reducer,
{
    /// Create a new reducer test with the given reducer
    #[must_use]
    pub const fn new(reducer: R) -> Self {
        Self {
            reducer,
            environment: None,
            initial_state: None,
            actions: Vec::new(),
            state_assertions: Vec::new(),
            effect_assertions: Vec::new(),
        }
    }

    /// Set the environment for the test
    #[must_use]
    pub fn with_env(mut self, env: R::Environment) -> Self {
        self.environment = Some(env);
        self
    }

    /// Set the initial state (Given)
    #[must_use]
    pub fn given_state(mut self, state: R::State) -> Self {
        self.initial_state = Some(state);
        self
    }

    /// Apply an action before the one under test (Given).
    ///
    /// Effects of preceding actions are discarded.
    #[must_use]
    pub fn given_action(mut self, action: R::Action) -> Self {
        self.actions.push(action);
        self
    }

    /// Set the action to test (When)
    #[must_use]
    pub fn when_action(self, action: R::Action) -> Self {
        self.given_action(action)
    }

    /// Add an assertion about the resulting state (Then)
    #[must_use]
    pub fn then_state<F>(mut self, assertion: F) -> Self
    where
        F: FnOnce(&R::State) + 'static,
    {
        self.state_assertions.push(Box::new(assertion));
        self
    }

    /// Add an assertion about the effects of the last action (Then)
    #[must_use]
    pub fn then_effects<F>(mut self, assertion: F) -> Self
    where
        F: FnOnce(&[R::Effect]) + 'static,
    {
        self.effect_assertions.push(Box::new(assertion));
        self
    }

    /// Run the test and execute all assertions
    ///
    /// # Panics
    ///
    /// Panics if initial state, action, or environment is not set,
    /// or if any assertions fail.
    #[allow(clippy::panic)] // Test code can panic
    #[allow(clippy::expect_used)] // Test code can use expect
    pub fn run(self) {
        let mut state = self
            .initial_state
            .expect("Initial state must be set with given_state()");

        assert!(
            !self.actions.is_empty(),
            "Action must be set with when_action()"
        );

        let env = self
            .environment
            .expect("Environment must be set with with_env()");

        let mut effects = smallvec::SmallVec::new();
        for action in self.actions {
            effects = self.reducer.reduce(&mut state, action, &env);
        }

        for assertion in self.state_assertions {
            assertion(&state);
        }

        for assertion in self.effect_assertions {
            assertion(&effects);
        }
    }
}

/// Helper assertions for effects
pub mod assertions {
    /// Assert that there are no effects
    ///
    /// # Panics
    ///
    /// Panics if effects is not empty.
    #[allow(clippy::panic)] // Test assertion
    pub fn assert_no_effects<F: std::fmt::Debug>(effects: &[F]) {
        assert!(
            effects.is_empty(),
            "Expected no effects, but found {}: {:?}",
            effects.len(),
            effects
        );
    }

    /// Assert the number of effects
    ///
    /// # Panics
    ///
    /// Panics if the number of effects doesn't match expected.
    #[allow(clippy::panic)] // Test assertion
    pub fn assert_effects_count<F>(effects: &[F], expected: usize) {
        assert_eq!(
            effects.len(),
            expected,
            "Expected {} effects, but found {}",
            expected,
            effects.len()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use eventhub_core::SmallVec;
    use eventhub_core::smallvec;

    #[derive(Clone, Debug)]
    struct TestState {
        count: i32,
    }

    #[derive(Clone, Debug)]
    enum TestAction {
        Increment,
        Decrement,
    }

    struct TestReducer;

    struct TestEnv;

    impl Reducer for TestReducer {
        type State = TestState;
        type Action = TestAction;
        type Environment = TestEnv;
        type Effect = i32;

        fn reduce(
            &self,
            state: &mut Self::State,
            action: Self::Action,
            _env: &Self::Environment,
        ) -> SmallVec<[Self::Effect; 4]> {
            match action {
                TestAction::Increment => state.count += 1,
                TestAction::Decrement => state.count -= 1,
            }
            smallvec![state.count]
        }
    }

    #[test]
    fn test_reducer_test_api() {
        ReducerTest::new(TestReducer)
            .with_env(TestEnv)
            .given_state(TestState { count: 0 })
            .when_action(TestAction::Increment)
            .then_state(|state| {
                assert_eq!(state.count, 1);
            })
            .then_effects(|effects| {
                assertions::assert_effects_count(effects, 1);
            })
            .run();
    }

    #[test]
    fn given_actions_run_before_the_action_under_test() {
        ReducerTest::new(TestReducer)
            .with_env(TestEnv)
            .given_state(TestState { count: 5 })
            .given_action(TestAction::Increment)
            .given_action(TestAction::Increment)
            .when_action(TestAction::Decrement)
            .then_state(|state| assert_eq!(state.count, 6))
            .then_effects(|effects| assert_eq!(effects, &[6]))
            .run();
    }
}
