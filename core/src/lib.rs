//! # EventHub Core
//!
//! Domain model and decision logic for the EventHub event-management system.
//!
//! The crate is deliberately free of I/O. It provides:
//!
//! - **Types**: identities, events, registrations and their lifecycle states
//! - **Authorization Gate**: a pure decision table `(principal, action, resource) → Decision`
//! - **Roster reducer**: the Registration Engine, a pure function over an event
//!   and its active registrations that enforces capacity, duplicate and
//!   self-registration rules
//! - **Store traits**: the persistence seams implemented by
//!   `eventhub-postgres` (production) and `eventhub-testing` (in-memory)
//!
//! ## Architecture Principles
//!
//! - Functional core, imperative shell: stores lock, load, reduce, persist
//! - Explicit principals: every operation receives who is asking, never an
//!   ambient "current user"
//! - Derived capacity: the active count is always computed from registrations
//!
//! ## Example
//!
//! ```
//! use eventhub_core::authorization::{authorize, Action, Actor, Decision, DenyReason, Principal, Resource};
//! use eventhub_core::types::{Role, UserId};
//!
//! let user = Principal::Authenticated(Actor::new(UserId::new(), Role::User));
//! let decision = authorize(&user, Action::CreateEvent, &Resource::None);
//! assert_eq!(decision, Decision::Deny(DenyReason::InsufficientRole));
//! ```

pub mod authorization;
pub mod error;
pub mod report;
pub mod roster;
pub mod store;
pub mod types;

pub use error::{ConflictReason, ErrorKind, EventHubError, Result};
pub use smallvec::{SmallVec, smallvec};

// Re-export commonly used types
pub use chrono::{DateTime, Utc};

/// Reducer module - the seam for pure business logic
///
/// Reducers are pure functions: `(State, Action, Environment) → (State, Effects)`.
/// They validate an action against state, update the state in place and
/// return descriptions of the writes a store must persist.
pub mod reducer {
    use smallvec::SmallVec;

    /// The Reducer trait - core abstraction for business logic
    ///
    /// # Type Parameters
    ///
    /// - `State`: The domain state this reducer operates on
    /// - `Action`: The action type this reducer processes
    /// - `Environment`: The injected dependencies this reducer needs
    /// - `Effect`: Descriptions of persistence work produced by a reduction
    ///
    /// # Example
    ///
    /// ```ignore
    /// impl Reducer for RosterReducer {
    ///     type State = EventRoster;
    ///     type Action = RosterAction;
    ///     type Environment = RosterEnvironment;
    ///     type Effect = RosterEffect;
    ///
    ///     fn reduce(
    ///         &self,
    ///         state: &mut EventRoster,
    ///         action: RosterAction,
    ///         env: &RosterEnvironment,
    ///     ) -> SmallVec<[RosterEffect; 4]> {
    ///         // Business logic here
    ///         SmallVec::new()
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

        /// The effect descriptions this reducer produces
        type Effect;

        /// Reduce an action into state changes and effects
        ///
        /// This is a pure function that:
        /// 1. Validates the action
        /// 2. Updates state in place
        /// 3. Returns effect descriptions to be persisted
        ///
        /// A rejected action produces no effects; the reason is recorded on
        /// the state by the implementation.
        fn reduce(
            &self,
            state: &mut Self::State,
            action: Self::Action,
            env: &Self::Environment,
        ) -> SmallVec<[Self::Effect; 4]>;
    }
}

/// Environment module - dependency injection traits
///
/// All external dependencies of the core are abstracted behind traits and
/// injected through a reducer's environment.
pub mod environment {
    use chrono::{DateTime, Utc};

    /// Clock trait - abstracts time operations for testability
    ///
    /// # Examples
    ///
    /// ```
    /// use eventhub_core::environment::{Clock, SystemClock};
    ///
    /// let clock = SystemClock;
    /// let earlier = clock.now();
    /// assert!(clock.now() >= earlier);
    /// ```
    pub trait Clock: Send + Sync {
        /// Get the current time
        fn now(&self) -> DateTime<Utc>;
    }

    /// Production clock backed by the system time.
    #[derive(Debug, Clone, Copy, Default)]
    pub struct SystemClock;

    impl Clock for SystemClock {
        fn now(&self) -> DateTime<Utc> {
            Utc::now()
        }
    }
}
