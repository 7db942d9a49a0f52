//! # EventHub Testing
//!
//! Testing utilities for EventHub.
//!
//! This crate provides:
//! - [`InMemoryStore`]: a complete in-memory backend implementing every store trait
//! - [`FixedClock`]: deterministic time
//! - [`ReducerTest`]: Given-When-Then harness for reducers
//! - [`fixtures`]: ready-made identities, drafts and rosters
//! - [`properties`]: proptest strategies for roster operation sequences
//!
//! ## Example
//!
//! ```
//! use eventhub_core::store::IdentityStore;
//! use eventhub_core::types::Role;
//! use eventhub_testing::{fixtures, InMemoryStore};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let store = InMemoryStore::new();
//! store.insert_identity(fixtures::identity("alice", Role::User)).await.unwrap();
//! assert!(store.find_identity_by_login("alice@example.com").await.unwrap().is_some());
//! # }
//! ```

use chrono::{DateTime, Utc};
use eventhub_core::environment::Clock;

mod in_memory;
mod reducer_test;

pub use in_memory::InMemoryStore;
pub use reducer_test::{ReducerTest, assertions};

/// Mock implementations of Environment traits.
pub mod mocks {
    use super::{Clock, DateTime, Utc};
    use std::sync::Mutex;

    /// Fixed clock for deterministic tests
    ///
    /// Always returns the same time, making tests reproducible.
    ///
    /// # Example
    ///
    /// ```
    /// use eventhub_testing::mocks::FixedClock;
    /// use eventhub_core::environment::Clock;
    /// use chrono::Utc;
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// let time1 = clock.now();
    /// let time2 = clock.now();
    /// assert_eq!(time1, time2); // Always the same!
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

    /// Clock that tests can move forward.
    ///
    /// ```
    /// use eventhub_testing::mocks::ManualClock;
    /// use eventhub_core::environment::Clock;
    /// use chrono::{Duration, Utc};
    ///
    /// let start = Utc::now();
    /// let clock = ManualClock::new(start);
    /// clock.advance(Duration::days(1));
    /// assert_eq!(clock.now(), start + Duration::days(1));
    /// ```
    #[derive(Debug)]
    pub struct ManualClock {
        time: Mutex<DateTime<Utc>>,
    }

    impl ManualClock {
        /// Create a clock starting at `time`
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self {
                time: Mutex::new(time),
            }
        }

        /// Move the clock forward.
        pub fn advance(&self, by: chrono::Duration) {
            if let Ok(mut time) = self.time.lock() {
                *time += by;
            }
        }

        /// Jump to an absolute time.
        pub fn set(&self, to: DateTime<Utc>) {
            if let Ok(mut time) = self.time.lock() {
                *time = to;
            }
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> DateTime<Utc> {
            self.time.lock().map_or_else(|poisoned| *poisoned.into_inner(), |time| *time)
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

/// Ready-made domain values for tests.
///
/// Everything is anchored at [`fixtures::now`], the same instant as
/// [`test_clock`].
pub mod fixtures {
    use super::Clock;
    use super::mocks::test_clock;
    use chrono::{DateTime, Duration, Utc};
    use eventhub_core::roster::{EventRoster, RosterEnvironment};
    use eventhub_core::types::{
        Capacity, Event, EventDraft, EventId, EventStatus, Identity, Role, UserId,
    };
    use std::sync::Arc;

    /// Placeholder credential hash; the stores never interpret it.
    pub const PASSWORD_HASH: &str = "$test$not-a-real-hash";

    /// 2025-01-01 00:00:00 UTC
    #[must_use]
    pub fn now() -> DateTime<Utc> {
        test_clock().now()
    }

    /// Roster environment on the fixed test clock.
    #[must_use]
    pub fn roster_env() -> RosterEnvironment {
        RosterEnvironment::new(Arc::new(test_clock()))
    }

    /// An active identity with the given username and role.
    #[must_use]
    pub fn identity(username: &str, role: Role) -> Identity {
        Identity {
            id: UserId::new(),
            username: username.to_string(),
            email: format!("{username}@example.com"),
            password_hash: PASSWORD_HASH.to_string(),
            first_name: None,
            last_name: None,
            role,
            is_active: true,
            created_at: now(),
            updated_at: now(),
        }
    }

    /// A valid draft starting in 30 days, deadline in 20.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn draft(title: &str, capacity: u32, status: EventStatus) -> EventDraft {
        EventDraft {
            title: title.to_string(),
            description: format!("{title}: an event description long enough to pass"),
            location: "Main Hall".to_string(),
            starts_at: now() + Duration::days(30),
            registration_deadline: Some(now() + Duration::days(20)),
            capacity: Capacity::new(capacity).expect("fixture capacity must be positive"),
            category: None,
            status,
        }
    }

    /// A published event owned by `creator`.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn published_event(creator: UserId, capacity: u32) -> Event {
        Event::from_draft(
            EventId::new(),
            creator,
            draft("Fixture event", capacity, EventStatus::Published),
            now(),
        )
        .expect("fixture draft is valid")
    }

    /// A published roster with no registrations and a random creator.
    #[must_use]
    pub fn published_roster(capacity: u32) -> EventRoster {
        EventRoster::new(published_event(UserId::new(), capacity), Vec::new())
    }
}

/// Property-based testing utilities using proptest.
pub mod properties {
    use proptest::prelude::*;

    /// One step of a randomized roster workload.
    #[derive(Clone, Copy, Debug)]
    pub enum RosterOp {
        /// User `n` registers
        Register(usize),
        /// User `n` unregisters
        Unregister(usize),
        /// The event creator tries to register
        CreatorRegisters,
        /// Capacity is changed to the given value
        Resize(u32),
    }

    /// Strategy over single operations for `users` distinct users.
    pub fn roster_op(users: usize, max_capacity: u32) -> impl Strategy<Value = RosterOp> {
        prop_oneof![
            6 => (0..users).prop_map(RosterOp::Register),
            3 => (0..users).prop_map(RosterOp::Unregister),
            1 => Just(RosterOp::CreatorRegisters),
            1 => (1..=max_capacity).prop_map(RosterOp::Resize),
        ]
    }

    /// Strategy over operation sequences.
    pub fn roster_ops(
        users: usize,
        max_capacity: u32,
        len: usize,
    ) -> impl Strategy<Value = Vec<RosterOp>> {
        prop::collection::vec(roster_op(users, max_capacity), 0..len)
    }
}

/// Install a test-friendly tracing subscriber. Safe to call repeatedly.
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with_test_writer()
        .try_init();
}

// Re-export commonly used items
pub use mocks::{FixedClock, ManualClock, test_clock};
