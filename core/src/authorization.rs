//! The Authorization Gate.
//!
//! A single decision table answering "may this principal perform this action
//! on this resource?". It performs no I/O: callers load whatever the resource
//! descriptor needs (an event's owner, a target identity) and pass it in.
//!
//! Rules, first match wins:
//!
//! 1. Anonymous principals may only view events; admin-only actions and every
//!    mutation are denied with [`DenyReason::LoginRequired`].
//! 2. Registering for an event you created is denied for every role.
//! 3. Admins are allowed everything else.
//! 4. Creating events needs the organizer role.
//! 5. Managing an event needs ownership.
//! 6. Admin-only actions are denied to everyone else.
//! 7. Anything left is allowed for an authenticated principal.

use crate::error::{EventHubError, Result};
use crate::types::{Role, UserId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// An authenticated identity as seen by the gate: who and in what role.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Actor {
    /// Identity identifier
    pub id: UserId,
    /// Role at the time of the request
    pub role: Role,
}

impl Actor {
    /// Creates an actor.
    #[must_use]
    pub const fn new(id: UserId, role: Role) -> Self {
        Self { id, role }
    }

    /// Whether the actor is an administrator.
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// Who is asking.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Principal {
    /// No session
    Anonymous,
    /// Logged-in identity
    Authenticated(Actor),
}

impl Principal {
    /// Shorthand for an authenticated principal.
    #[must_use]
    pub const fn actor(id: UserId, role: Role) -> Self {
        Self::Authenticated(Actor::new(id, role))
    }

    /// The actor, if authenticated.
    #[must_use]
    pub const fn as_actor(&self) -> Option<&Actor> {
        match self {
            Self::Anonymous => None,
            Self::Authenticated(actor) => Some(actor),
        }
    }

    /// The actor, or [`EventHubError::Unauthorized`].
    ///
    /// # Errors
    ///
    /// Returns [`EventHubError::Unauthorized`] for anonymous principals.
    pub fn require_actor(&self) -> Result<&Actor> {
        match self {
            Self::Anonymous => Err(EventHubError::Unauthorized),
            Self::Authenticated(actor) => Ok(actor),
        }
    }
}

impl From<Actor> for Principal {
    fn from(actor: Actor) -> Self {
        Self::Authenticated(actor)
    }
}

/// Action tags understood by the gate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    /// Browse or read events
    ViewEvents,
    /// Create an event
    CreateEvent,
    /// Edit an event's fields
    EditEvent,
    /// Delete an event
    DeleteEvent,
    /// Move an event to `published`
    PublishEvent,
    /// Move an event to `cancelled`
    CancelEvent,
    /// List an event's attendees
    ViewAttendees,
    /// Register for an event
    RegisterForEvent,
    /// Cancel one's own registration
    UnregisterFromEvent,
    /// Admin dashboard
    ViewAdminDashboard,
    /// List, edit, delete, promote or demote identities
    ManageUsers,
    /// System-wide registration list
    ViewAllRegistrations,
    /// System statistics
    ViewStatistics,
    /// Cancel another identity's registration
    CancelAnyRegistration,
}

impl Action {
    /// Actions that do not change state and are open to anonymous principals.
    #[must_use]
    pub const fn is_public_read(&self) -> bool {
        matches!(self, Self::ViewEvents)
    }

    /// Actions reserved for admins.
    #[must_use]
    pub const fn is_admin_only(&self) -> bool {
        matches!(
            self,
            Self::ViewAdminDashboard
                | Self::ManageUsers
                | Self::ViewAllRegistrations
                | Self::ViewStatistics
                | Self::CancelAnyRegistration
        )
    }

    /// Actions that require owning the event.
    #[must_use]
    pub const fn requires_ownership(&self) -> bool {
        matches!(
            self,
            Self::EditEvent
                | Self::DeleteEvent
                | Self::PublishEvent
                | Self::CancelEvent
                | Self::ViewAttendees
        )
    }
}

/// What the action targets.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Resource {
    /// No specific target
    None,
    /// An event, described by its owner
    Event {
        /// Creator of the event
        owner: UserId,
    },
    /// An identity
    Identity {
        /// Target identity
        id: UserId,
    },
}

impl Resource {
    /// Event resource owned by `owner`.
    #[must_use]
    pub const fn event(owner: UserId) -> Self {
        Self::Event { owner }
    }

    fn event_owner(&self) -> Option<UserId> {
        match self {
            Self::Event { owner } => Some(*owner),
            Self::None | Self::Identity { .. } => None,
        }
    }
}

/// Why the gate (or an admin guardrail) refused.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DenyReason {
    /// Anonymous principal attempted a protected action
    LoginRequired,
    /// Role too low for the action
    InsufficientRole,
    /// Event is owned by someone else
    NotOwner,
    /// Registering for one's own event
    SelfRegistrationForbidden,
    /// Target account is an admin or the caller's own account
    ProtectedAccount,
}

impl DenyReason {
    /// Stable snake_case code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::LoginRequired => "login_required",
            Self::InsufficientRole => "insufficient_role",
            Self::NotOwner => "not_owner",
            Self::SelfRegistrationForbidden => "self_registration_forbidden",
            Self::ProtectedAccount => "protected_account",
        }
    }
}

impl fmt::Display for DenyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Outcome of [`authorize`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Decision {
    /// Proceed
    Allow,
    /// Refuse with a reason
    Deny(DenyReason),
}

impl Decision {
    /// Whether the decision allows the action.
    #[must_use]
    pub const fn is_allowed(&self) -> bool {
        matches!(self, Self::Allow)
    }

    /// Converts a denial into the matching error.
    ///
    /// # Errors
    ///
    /// [`EventHubError::Unauthorized`] for `login_required`, otherwise
    /// [`EventHubError::Forbidden`].
    pub fn into_result(self) -> Result<()> {
        match self {
            Self::Allow => Ok(()),
            Self::Deny(reason) => Err(reason.into()),
        }
    }
}

/// Decides whether `principal` may perform `action` on `resource`.
#[must_use]
pub fn authorize(principal: &Principal, action: Action, resource: &Resource) -> Decision {
    let Principal::Authenticated(actor) = principal else {
        return if action.is_public_read() {
            Decision::Allow
        } else {
            Decision::Deny(DenyReason::LoginRequired)
        };
    };

    let owner = resource.event_owner();

    if action == Action::RegisterForEvent && owner == Some(actor.id) {
        return Decision::Deny(DenyReason::SelfRegistrationForbidden);
    }

    if actor.is_admin() {
        return Decision::Allow;
    }

    if action == Action::CreateEvent && !actor.role.can_organize() {
        return Decision::Deny(DenyReason::InsufficientRole);
    }

    if action.requires_ownership() && owner != Some(actor.id) {
        return Decision::Deny(DenyReason::NotOwner);
    }

    if action.is_admin_only() {
        return Decision::Deny(DenyReason::InsufficientRole);
    }

    Decision::Allow
}

/// [`authorize`] folded into a `Result`.
///
/// # Errors
///
/// Returns the error matching the denial reason.
pub fn ensure(principal: &Principal, action: Action, resource: &Resource) -> Result<()> {
    authorize(principal, action, resource).into_result()
}
