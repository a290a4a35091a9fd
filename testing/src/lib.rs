//! # Autoshop Testing
//!
//! Testing utilities for the autoshop booking engine.
//!
//! This crate provides:
//! - Deterministic clocks ([`FixedClock`], [`MockClock`])
//! - In-memory implementations of every storage trait ([`stores`])
//! - A recording, optionally failing notifier ([`RecordingNotifier`])
//! - A demo catalog, setting and staff ([`fixtures`])
//! - proptest strategies for domain values ([`properties`])
//!
//! The in-memory stores are also what the server runs on when no database is
//! configured.
//!
//! ## Example
//!
//! ```ignore
//! use autoshop_testing::{fixtures, stores::InMemoryAppointmentStore, test_clock};
//!
//! #[tokio::test]
//! async fn test_booking() {
//!     let appointments = Arc::new(InMemoryAppointmentStore::new());
//!     let service = BookingService::new(/* stores */, Arc::new(test_clock()));
//!     let admitted = service.submit(request).await.unwrap();
//!     assert_eq!(appointments.len(), 1);
//! }
//! ```

use chrono::{DateTime, Utc};
use autoshop_core::environment::Clock;

pub mod fixtures;
pub mod notifier;
pub mod stores;

/// Mock implementations of Environment traits.
pub mod mocks {
    use super::{Clock, DateTime, Utc};
    use std::sync::{Arc, Mutex, PoisonError};

    /// Fixed clock for deterministic tests
    ///
    /// Always returns the same time, making tests reproducible.
    ///
    /// # Example
    ///
    /// ```
    /// use autoshop_testing::mocks::FixedClock;
    /// use autoshop_core::environment::Clock;
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

    /// Clock that tests can move forward, e.g. past a cache TTL.
    ///
    /// Clones share the same time.
    #[derive(Debug, Clone)]
    pub struct MockClock {
        time: Arc<Mutex<DateTime<Utc>>>,
    }

    impl MockClock {
        /// Create a clock starting at `time`
        #[must_use]
        pub fn new(time: DateTime<Utc>) -> Self {
            Self {
                time: Arc::new(Mutex::new(time)),
            }
        }

        /// Move the clock forward
        pub fn advance(&self, by: chrono::Duration) {
            let mut time = self.time.lock().unwrap_or_else(PoisonError::into_inner);
            *time += by;
        }

        /// Jump to an absolute time
        pub fn set(&self, to: DateTime<Utc>) {
            *self.time.lock().unwrap_or_else(PoisonError::into_inner) = to;
        }
    }

    impl Clock for MockClock {
        fn now(&self) -> DateTime<Utc> {
            *self.time.lock().unwrap_or_else(PoisonError::into_inner)
        }
    }

    /// Create a default fixed clock for tests: Monday 2024-06-10 07:00 in
    /// the fixture timezone (America/New_York), i.e. 11:00 UTC.
    ///
    /// # Panics
    ///
    /// This function will panic if the hardcoded timestamp fails to parse,
    /// which should never happen in practice.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(
            DateTime::parse_from_rfc3339("2024-06-10T11:00:00Z")
                .expect("hardcoded timestamp should always parse")
                .with_timezone(&Utc),
        )
    }
}

/// Property-based testing utilities using proptest.
pub mod properties {
    use autoshop_core::money::{Money, Quantity};
    use proptest::prelude::*;

    /// Amounts up to 10 000.00.
    pub fn money() -> impl Strategy<Value = Money> {
        (0u64..=1_000_000).prop_map(Money::from_cents)
    }

    /// Quantities up to 9 999.99.
    pub fn quantity() -> impl Strategy<Value = Quantity> {
        (0u64..1_000_000).prop_map(Quantity::from_hundredths)
    }
}

// Re-export commonly used items
pub use mocks::{FixedClock, MockClock, test_clock};
pub use notifier::RecordingNotifier;
