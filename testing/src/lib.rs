//! # Ticketpay Testing
//!
//! Helpers for testing reducers without a runtime:
//!
//! - [`ReducerTest`]: Given-When-Then harness over a single reducer call
//! - [`assertions`]: checks over the returned effects
//! - [`FixedClock`]: deterministic time
//!
//! ## Example
//!
//! ```ignore
//! use ticketpay_testing::{assertions, test_clock, ReducerTest};
//!
//! ReducerTest::new(ReconciliationReducer::new())
//!     .with_env(environment_with(Arc::new(test_clock())))
//!     .given_state(ReconciliationState::new(EntryPath::Verify))
//!     .when_action(ReconciliationAction::VerifyRequested { reference: None })
//!     .then_state(|state| assert!(state.is_failed()))
//!     .then_effects(assertions::assert_no_effects)
//!     .run();
//! ```

mod reducer_test;

pub use reducer_test::{ReducerTest, assertions};

/// Mock implementations of environment traits
pub mod mocks {
    use chrono::{DateTime, Duration, Utc};
    use std::sync::Mutex;
    use ticketpay_core::environment::Clock;

    /// Clock frozen at a given instant until explicitly advanced.
    #[derive(Debug)]
    pub struct FixedClock {
        time: Mutex<DateTime<Utc>>,
    }

    impl FixedClock {
        /// Create a new fixed clock with the given time
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self {
                time: Mutex::new(time),
            }
        }

        /// Move the clock forward.
        pub fn advance(&self, by: Duration) {
            if let Ok(mut time) = self.time.lock() {
                *time += by;
            }
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.time
                .lock()
                .map_or_else(|poisoned| *poisoned.into_inner(), |time| *time)
        }
    }

    /// Clock pinned to 2025-01-01 00:00:00 UTC.
    #[must_use]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(DateTime::<Utc>::UNIX_EPOCH + Duration::seconds(1_735_689_600))
    }
}

pub use mocks::{FixedClock, test_clock};

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use ticketpay_core::environment::Clock;

    #[test]
    fn test_fixed_clock_is_stable() {
        let clock = test_clock();
        assert_eq!(clock.now(), clock.now());
        assert_eq!(clock.now().to_rfc3339(), "2025-01-01T00:00:00+00:00");
    }

    #[test]
    fn test_fixed_clock_advance() {
        let clock = test_clock();
        let before = clock.now();
        clock.advance(Duration::minutes(5));
        assert_eq!(clock.now() - before, Duration::minutes(5));
    }
}
