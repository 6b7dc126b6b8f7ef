//! # Ticketpay Core
//!
//! The small set of abstractions every stateful workflow in the ticketpay
//! workspace is written against:
//!
//! - **Reducer**: `(State, Action, Environment) → Effects`, all decisions live here
//! - **Effect**: a description of work for the runtime to perform, never performed
//!   by the reducer itself
//! - **Clock**: injected time so transitions are deterministic under test
//!
//! ## Example
//!
//! ```ignore
//! use ticketpay_core::{async_effect, effect::Effect, reducer::Reducer, SmallVec};
//!
//! impl Reducer for LookupReducer {
//!     type State = LookupState;
//!     type Action = LookupAction;
//!     type Environment = LookupEnvironment;
//!
//!     fn reduce(
//!         &self,
//!         state: &mut LookupState,
//!         action: LookupAction,
//!         env: &LookupEnvironment,
//!     ) -> SmallVec<[Effect<LookupAction>; 4]> {
//!         match action {
//!             LookupAction::Start { key } => {
//!                 state.pending = true;
//!                 let backend = env.backend.clone();
//!                 smallvec![async_effect! {
//!                     Some(LookupAction::Loaded { value: backend.get(&key).await })
//!                 }]
//!             }
//!             LookupAction::Loaded { value } => {
//!                 state.pending = false;
//!                 state.value = value;
//!                 SmallVec::new()
//!             }
//!         }
//!     }
//! }
//! ```

pub use smallvec::{SmallVec, smallvec};

mod effect_macros;

/// Reducer module - the trait all business logic is written against.
pub mod reducer {
    use super::effect::Effect;
    use smallvec::SmallVec;

    /// Pure state transition function.
    ///
    /// A reducer validates an action, mutates state in place and returns the
    /// effects the runtime must execute. It never awaits and never performs I/O;
    /// anything asynchronous is described as an [`Effect`] whose output action is
    /// fed back into the reducer.
    pub trait Reducer {
        /// The state type this reducer operates on
        type State;

        /// The action type this reducer processes
        type Action;

        /// The environment type with injected dependencies
        type Environment;

        /// Reduce an action into state changes and effects.
        fn reduce(
            &self,
            state: &mut Self::State,
            action: Self::Action,
            env: &Self::Environment,
        ) -> SmallVec<[Effect<Self::Action>; 4]>;
    }
}

/// Effect module - side effect descriptions.
pub mod effect {
    use std::future::Future;
    use std::pin::Pin;

    /// Boxed future produced by an [`Effect::Future`].
    pub type EffectFuture<Action> = Pin<Box<dyn Future<Output = Option<Action>> + Send>>;

    /// Describes a side effect to be executed by the runtime.
    ///
    /// Effects are values. Returning one from a reducer does nothing until a
    /// runtime executes it.
    pub enum Effect<Action> {
        /// No-op effect
        None,

        /// Run effects concurrently
        Parallel(Vec<Effect<Action>>),

        /// Run effects one after the other
        Sequential(Vec<Effect<Action>>),

        /// Arbitrary async computation.
        ///
        /// If the future resolves to `Some(action)` the action is fed back into
        /// the reducer.
        Future(EffectFuture<Action>),
    }

    impl<Action> std::fmt::Debug for Effect<Action>
    where
        Action: std::fmt::Debug,
    {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            match self {
                Effect::None => write!(f, "Effect::None"),
                Effect::Parallel(effects) => {
                    f.debug_tuple("Effect::Parallel").field(effects).finish()
                },
                Effect::Sequential(effects) => {
                    f.debug_tuple("Effect::Sequential").field(effects).finish()
                },
                Effect::Future(_) => write!(f, "Effect::Future(<future>)"),
            }
        }
    }

    impl<Action> Effect<Action> {
        /// Combine effects to run concurrently
        #[must_use]
        pub const fn merge(effects: Vec<Effect<Action>>) -> Effect<Action> {
            Effect::Parallel(effects)
        }

        /// Chain effects to run sequentially
        #[must_use]
        pub const fn chain(effects: Vec<Effect<Action>>) -> Effect<Action> {
            Effect::Sequential(effects)
        }

        /// Whether this effect is the no-op effect
        #[must_use]
        pub const fn is_none(&self) -> bool {
            matches!(self, Effect::None)
        }
    }
}

/// Environment module - injected dependencies shared by every reducer.
pub mod environment {
    use chrono::{DateTime, Utc};

    /// Abstracts the current time.
    ///
    /// Production code uses [`SystemClock`]; tests pin time with a fixed clock.
    pub trait Clock: Send + Sync {
        /// Get the current time
        fn now(&self) -> DateTime<Utc>;
    }

    /// Wall-clock time.
    #[derive(Debug, Clone, Copy, Default)]
    pub struct SystemClock;

    impl Clock for SystemClock {
        fn now(&self) -> DateTime<Utc> {
            Utc::now()
        }
    }
}
