//! The Registration Engine.
//!
//! An event together with its active registrations forms a *roster*. Every
//! change to who holds a seat, and every edit that could interact with seat
//! counts (capacity, status), goes through [`RosterReducer`].
//!
//! The reducer is pure. Stores run it inside a critical section that
//! serializes all roster mutations for one event (`SELECT … FOR UPDATE` on the
//! event row in PostgreSQL, a mutex in memory): load the roster, reduce, then
//! persist the returned [`RosterEffect`]s. Because the active count is read and
//! written under the same lock, `active ≤ capacity` holds under any
//! interleaving of concurrent requests.

use crate::authorization::{Action, Decision, DenyReason, Principal, Resource, authorize};
use crate::environment::Clock;
use crate::reducer::Reducer;
use crate::types::{Event, EventPatch, EventStatus, Registration, RegistrationStatus, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use smallvec::{SmallVec, smallvec};
use std::fmt;
use std::sync::Arc;

// ============================================================================
// Rejections
// ============================================================================

/// Why the engine refused a transition.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rejection {
    /// Principal is anonymous
    LoginRequired,
    /// Event is not `published`
    EventNotPublished,
    /// Principal created the event
    SelfRegistrationForbidden,
    /// Principal already holds an active registration
    AlreadyRegistered,
    /// Deadline or start has passed
    RegistrationClosed,
    /// Active count reached capacity
    EventFull,
    /// No active registration to cancel
    NotRegistered,
    /// Edit would set capacity below the active count
    CapacityBelowRegistrations,
    /// Requested status change is not allowed
    InvalidStatusTransition,
    /// Edit would put the registration deadline at or after the start
    InvalidSchedule,
}

impl Rejection {
    /// Stable snake_case code shown to callers.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::LoginRequired => "login_required",
            Self::EventNotPublished => "event_not_published",
            Self::SelfRegistrationForbidden => "self_registration_forbidden",
            Self::AlreadyRegistered => "already_registered",
            Self::RegistrationClosed => "registration_closed",
            Self::EventFull => "event_full",
            Self::NotRegistered => "not_registered",
            Self::CapacityBelowRegistrations => "capacity_below_registrations",
            Self::InvalidStatusTransition => "invalid_status_transition",
            Self::InvalidSchedule => "invalid_schedule",
        }
    }

    /// Human-readable explanation.
    #[must_use]
    pub const fn message(&self) -> &'static str {
        match self {
            Self::LoginRequired => "Please log in to register for events.",
            Self::EventNotPublished => "This event is not open for registration.",
            Self::SelfRegistrationForbidden => "You cannot register for your own event.",
            Self::AlreadyRegistered => "You are already registered for this event.",
            Self::RegistrationClosed => "Registration for this event has closed.",
            Self::EventFull => "This event is full.",
            Self::NotRegistered => "You are not registered for this event.",
            Self::CapacityBelowRegistrations => {
                "Capacity cannot be lower than the number of current registrations."
            }
            Self::InvalidStatusTransition => "That status change is not allowed.",
            Self::InvalidSchedule => "Registration deadline must be before the event date.",
        }
    }
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

// ============================================================================
// State
// ============================================================================

/// An event plus its active registrations.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EventRoster {
    /// The event, as locked by the store
    pub event: Event,
    /// Registrations currently holding a seat
    pub active: Vec<Registration>,
    /// Reason the most recent action was refused, cleared on success
    pub last_rejection: Option<Rejection>,
}

impl EventRoster {
    /// Builds a roster, keeping only active registrations.
    #[must_use]
    pub fn new(event: Event, registrations: impl IntoIterator<Item = Registration>) -> Self {
        Self {
            event,
            active: registrations
                .into_iter()
                .filter(Registration::is_active)
                .collect(),
            last_rejection: None,
        }
    }

    /// Number of seats taken.
    #[must_use]
    pub fn active_count(&self) -> u32 {
        u32::try_from(self.active.len()).unwrap_or(u32::MAX)
    }

    /// The active registration held by `user_id`, if any.
    #[must_use]
    pub fn active_for(&self, user_id: UserId) -> Option<&Registration> {
        self.active.iter().find(|r| r.user_id == user_id)
    }

    /// Derived availability figures.
    #[must_use]
    pub fn availability(&self, now: DateTime<Utc>) -> Availability {
        Availability::derive(&self.event, self.active_count(), now)
    }
}

/// Per-event figures computed from the active count. Never stored.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Availability {
    /// Seats taken
    pub active: u32,
    /// Event capacity
    pub capacity: u32,
    /// `capacity - active`, floored at zero
    pub available_spots: u32,
    /// No seats left
    pub is_full: bool,
    /// Starts after now
    pub is_upcoming: bool,
    /// Published, before deadline and start
    pub is_registration_open: bool,
}

impl Availability {
    /// Computes the figures for `event` given its active count.
    #[must_use]
    pub fn derive(event: &Event, active: u32, now: DateTime<Utc>) -> Self {
        let capacity = event.capacity.value();
        Self {
            active,
            capacity,
            available_spots: capacity.saturating_sub(active),
            is_full: active >= capacity,
            is_upcoming: event.is_upcoming(now),
            is_registration_open: event.accepts_registrations_at(now),
        }
    }
}

// ============================================================================
// Actions & Effects
// ============================================================================

/// Roster transitions.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RosterAction {
    /// Take a seat
    Register {
        /// Who is registering
        principal: Principal,
        /// Time of the request, checked against deadline and start
        now: DateTime<Utc>,
    },
    /// Give up a seat
    Unregister {
        /// Holder of the registration
        user_id: UserId,
    },
    /// Edit the event (fields, capacity, status)
    Amend {
        /// Requested changes, already field-validated
        patch: EventPatch,
    },
}

/// Writes the store must persist after a successful reduction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RosterEffect {
    /// Insert this new active registration
    Registered(Registration),
    /// Mark this registration cancelled
    Cancelled(Registration),
    /// Overwrite the event row
    Amended(Event),
}

/// Dependencies of the roster reducer.
#[derive(Clone)]
pub struct RosterEnvironment {
    /// Clock for cancellation and update timestamps
    pub clock: Arc<dyn Clock>,
}

impl RosterEnvironment {
    /// Creates a new environment
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }
}

// ============================================================================
// Reducer
// ============================================================================

/// Enforces capacity, duplicate, self-registration and window rules.
#[derive(Clone, Copy, Debug, Default)]
pub struct RosterReducer;

impl RosterReducer {
    /// Creates a new reducer
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Checks a registration request. First failure wins.
    fn validate_register(
        state: &EventRoster,
        principal: &Principal,
        now: DateTime<Utc>,
    ) -> Result<UserId, Rejection> {
        if state.event.status != EventStatus::Published {
            return Err(Rejection::EventNotPublished);
        }

        let resource = Resource::event(state.event.creator_id);
        let actor = match authorize(principal, Action::RegisterForEvent, &resource) {
            Decision::Deny(DenyReason::SelfRegistrationForbidden) => {
                return Err(Rejection::SelfRegistrationForbidden);
            }
            Decision::Deny(_) => return Err(Rejection::LoginRequired),
            Decision::Allow => principal.as_actor().ok_or(Rejection::LoginRequired)?,
        };

        if state.active_for(actor.id).is_some() {
            return Err(Rejection::AlreadyRegistered);
        }

        if !state.event.window_open_at(now) {
            return Err(Rejection::RegistrationClosed);
        }

        if state.active_count() >= state.event.capacity.value() {
            return Err(Rejection::EventFull);
        }

        Ok(actor.id)
    }

    /// Checks an amendment against the current roster.
    fn validate_amend(state: &EventRoster, patch: &EventPatch) -> Result<(), Rejection> {
        if let Some(next) = patch.status {
            if !state.event.status.can_transition_to(next) {
                return Err(Rejection::InvalidStatusTransition);
            }
        }

        if let Some(capacity) = patch.capacity {
            if capacity.value() < state.active_count() {
                return Err(Rejection::CapacityBelowRegistrations);
            }
        }

        if patch.breaks_schedule(&state.event) {
            return Err(Rejection::InvalidSchedule);
        }

        Ok(())
    }

    fn reject(state: &mut EventRoster, rejection: Rejection) -> SmallVec<[RosterEffect; 4]> {
        state.last_rejection = Some(rejection);
        SmallVec::new()
    }
}

impl Reducer for RosterReducer {
    type State = EventRoster;
    type Action = RosterAction;
    type Environment = RosterEnvironment;
    type Effect = RosterEffect;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Self::Effect; 4]> {
        match action {
            RosterAction::Register { principal, now } => {
                let user_id = match Self::validate_register(state, &principal, now) {
                    Ok(user_id) => user_id,
                    Err(rejection) => return Self::reject(state, rejection),
                };

                let registration = Registration::open(user_id, state.event.id, now);
                state.active.push(registration.clone());
                state.last_rejection = None;
                smallvec![RosterEffect::Registered(registration)]
            }

            RosterAction::Unregister { user_id } => {
                let Some(index) = state.active.iter().position(|r| r.user_id == user_id) else {
                    return Self::reject(state, Rejection::NotRegistered);
                };

                let mut registration = state.active.remove(index);
                registration.status = RegistrationStatus::Cancelled;
                registration.cancelled_at = Some(env.clock.now());
                state.last_rejection = None;
                smallvec![RosterEffect::Cancelled(registration)]
            }

            RosterAction::Amend { patch } => {
                if let Err(rejection) = Self::validate_amend(state, &patch) {
                    return Self::reject(state, rejection);
                }

                state.event.apply_fields(&patch);
                if let Some(status) = patch.status {
                    state.event.status = status;
                }
                state.event.updated_at = env.clock.now();
                state.last_rejection = None;
                smallvec![RosterEffect::Amended(state.event.clone())]
            }
        }
    }
}

/// Runs one action and folds the outcome into a `Result`.
///
/// Convenience for stores: on rejection the roster is unchanged and the
/// rejection is returned as an error.
///
/// # Errors
///
/// Returns the rejection converted into [`crate::EventHubError`].
pub fn decide(
    state: &mut EventRoster,
    action: RosterAction,
    env: &RosterEnvironment,
) -> crate::Result<SmallVec<[RosterEffect; 4]>> {
    let effects = RosterReducer.reduce(state, action, env);
    match state.last_rejection {
        Some(rejection) if effects.is_empty() => Err(rejection.into()),
        _ => Ok(effects),
    }
}
