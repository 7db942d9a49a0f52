//! Admin console operations.
//!
//! Every method here is gated on an admin-only [`Action`]. On top of the
//! gate, user management enforces two guardrails: an admin cannot delete
//! their own account, and other admin accounts can be neither edited,
//! deleted, promoted nor demoted
//! ([`DenyReason::ProtectedAccount`]).

use crate::hub::EventHub;
use eventhub_auth::validation::{validate_email, validate_username};
use eventhub_core::authorization::{Action, Actor, DenyReason, Principal, Resource, ensure};
use eventhub_core::report::{RoleCounts, StatusCounts, SystemStatistics};
use eventhub_core::store::{EventCatalog, IdentityStore, ReportStore, RosterStore, Store};
use eventhub_core::types::{
    Event, EventFilter, EventId, EventOrder, EventStatus, Identity, IdentityFilter, Page,
    PageRequest, Registration, RegistrationFilter, Role, UserId,
};
use eventhub_core::{EventHubError, Result};
use serde::{Deserialize, Serialize};

/// Recent registrations shown on the dashboard.
pub const DASHBOARD_RECENT_REGISTRATIONS: u32 = 10;
/// Recent and upcoming events shown on the dashboard.
pub const DASHBOARD_EVENTS: u32 = 5;

/// Overview for the admin landing page.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dashboard {
    /// All identities
    pub total_users: u64,
    /// All events
    pub total_events: u64,
    /// All registration rows, including cancelled ones
    pub total_registrations: u64,
    /// Identities per role
    pub users_by_role: RoleCounts,
    /// Events per status
    pub events_by_status: StatusCounts,
    /// Newest registrations
    pub recent_registrations: Vec<Registration>,
    /// Newest events
    pub recent_events: Vec<Event>,
    /// Next published events
    pub upcoming_events: Vec<Event>,
}

/// Fields an admin may change on an account.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserUpdate {
    /// New username
    pub username: String,
    /// New email
    pub email: String,
    /// New role
    pub role: Role,
    /// Whether the account may log in
    pub is_active: bool,
}

impl UserUpdate {
    /// Start from the identity's current values.
    #[must_use]
    pub fn from_identity(identity: &Identity) -> Self {
        Self {
            username: identity.username.clone(),
            email: identity.email.clone(),
            role: identity.role,
            is_active: identity.is_active,
        }
    }
}

impl<S: Store> EventHub<S> {
    async fn load_identity(&self, user_id: UserId) -> Result<Identity> {
        self.store
            .find_identity(user_id)
            .await?
            .ok_or_else(|| EventHubError::identity_not_found(user_id))
    }

    /// Gate a user-management action and load its target.
    async fn managed_identity<'p>(
        &self,
        principal: &'p Principal,
        user_id: UserId,
    ) -> Result<(&'p Actor, Identity)> {
        ensure(principal, Action::ManageUsers, &Resource::Identity { id: user_id }).inspect_err(
            |e| tracing::warn!(%user_id, error = %e, "User management denied"),
        )?;
        let actor = principal.require_actor()?;
        let target = self.load_identity(user_id).await?;
        Ok((actor, target))
    }

    /// Admin landing page: counts, newest activity and next events.
    ///
    /// # Errors
    ///
    /// [`EventHubError::Unauthorized`] / [`EventHubError::Forbidden`] unless
    /// the principal is an admin.
    pub async fn dashboard(&self, principal: &Principal) -> Result<Dashboard> {
        ensure(principal, Action::ViewAdminDashboard, &Resource::None)?;
        let now = self.now();

        let stats = self.store.statistics(now).await?;
        let recent_registrations = self
            .store
            .list_registrations(
                &RegistrationFilter::default(),
                PageRequest::new(1, DASHBOARD_RECENT_REGISTRATIONS),
            )
            .await?
            .items;
        let recent_events = self
            .store
            .list_events(
                &EventFilter {
                    order: EventOrder::CreatedAtDesc,
                    ..EventFilter::default()
                },
                PageRequest::new(1, DASHBOARD_EVENTS),
            )
            .await?
            .items;
        let upcoming_events = self
            .store
            .list_events(
                &EventFilter::upcoming(now),
                PageRequest::new(1, DASHBOARD_EVENTS),
            )
            .await?
            .items;

        Ok(Dashboard {
            total_users: stats.users.total,
            total_events: stats.events.total,
            total_registrations: stats.registrations.total,
            users_by_role: stats.users.by_role,
            events_by_status: stats.events.by_status,
            recent_registrations,
            recent_events,
            upcoming_events,
        })
    }

    // ═══════════════════════════════════════════════════════════
    // Users
    // ═══════════════════════════════════════════════════════════

    /// Identities matching `filter`, newest first.
    ///
    /// # Errors
    ///
    /// [`EventHubError::Unauthorized`] / [`EventHubError::Forbidden`] unless
    /// the principal is an admin.
    pub async fn list_users(
        &self,
        principal: &Principal,
        filter: &IdentityFilter,
        page: PageRequest,
    ) -> Result<Page<Identity>> {
        ensure(principal, Action::ManageUsers, &Resource::None)?;
        self.store.list_identities(filter, page).await
    }

    /// Change an account's username, email, role or active flag.
    ///
    /// # Errors
    ///
    /// - [`EventHubError::Forbidden`] with `protected_account` when the
    ///   target is another admin
    /// - [`EventHubError::ValidationFailed`] for malformed username or email
    /// - [`EventHubError::Conflict`] if the username or email is taken
    pub async fn update_user(
        &self,
        principal: &Principal,
        user_id: UserId,
        update: UserUpdate,
    ) -> Result<Identity> {
        let (actor, mut target) = self.managed_identity(principal, user_id).await?;
        if target.is_admin() && target.id != actor.id {
            return Err(protected(actor, &target, "edit"));
        }
        validate_username(update.username.trim())?;
        validate_email(update.email.trim())?;

        target.username = update.username.trim().to_string();
        target.email = update.email.trim().to_string();
        target.role = update.role;
        target.is_active = update.is_active;
        target.updated_at = self.now();
        self.store.update_identity(&target).await?;

        tracing::info!(
            admin_id = %actor.id,
            %user_id,
            role = target.role.as_str(),
            is_active = target.is_active,
            "User updated"
        );
        Ok(target)
    }

    /// Delete an account with its events and registrations.
    ///
    /// # Errors
    ///
    /// [`EventHubError::Forbidden`] with `protected_account` when the target
    /// is the caller or any admin.
    pub async fn delete_user(&self, principal: &Principal, user_id: UserId) -> Result<()> {
        let (actor, target) = self.managed_identity(principal, user_id).await?;
        if target.id == actor.id || target.is_admin() {
            return Err(protected(actor, &target, "delete"));
        }

        self.store.delete_identity(user_id).await?;
        tracing::info!(admin_id = %actor.id, %user_id, username = %target.username, "User deleted");
        Ok(())
    }

    /// Give a `user` the `organizer` role.
    ///
    /// # Errors
    ///
    /// [`EventHubError::Forbidden`] with `protected_account` for admins.
    pub async fn promote_to_organizer(
        &self,
        principal: &Principal,
        user_id: UserId,
    ) -> Result<Identity> {
        self.set_role(principal, user_id, Role::Organizer).await
    }

    /// Return an `organizer` to the `user` role.
    ///
    /// # Errors
    ///
    /// [`EventHubError::Forbidden`] with `protected_account` for admins.
    pub async fn demote_to_user(&self, principal: &Principal, user_id: UserId) -> Result<Identity> {
        self.set_role(principal, user_id, Role::User).await
    }

    async fn set_role(&self, principal: &Principal, user_id: UserId, role: Role) -> Result<Identity> {
        let (actor, mut target) = self.managed_identity(principal, user_id).await?;
        if target.is_admin() {
            return Err(protected(actor, &target, "change role of"));
        }
        if target.role == role {
            return Ok(target);
        }

        target.role = role;
        target.updated_at = self.now();
        self.store.update_identity(&target).await?;
        tracing::info!(admin_id = %actor.id, %user_id, role = role.as_str(), "Role changed");
        Ok(target)
    }

    // ═══════════════════════════════════════════════════════════
    // Events & registrations
    // ═══════════════════════════════════════════════════════════

    /// Every event, any status, newest first.
    ///
    /// # Errors
    ///
    /// [`EventHubError::Unauthorized`] / [`EventHubError::Forbidden`] unless
    /// the principal is an admin.
    pub async fn list_all_events(
        &self,
        principal: &Principal,
        status: Option<EventStatus>,
        category: Option<String>,
        page: PageRequest,
    ) -> Result<Page<Event>> {
        ensure(principal, Action::ViewAdminDashboard, &Resource::None)?;
        let filter = EventFilter {
            status,
            category,
            order: EventOrder::CreatedAtDesc,
            ..EventFilter::default()
        };
        self.store.list_events(&filter, page).await
    }

    /// One event's registrations, cancelled ones included, newest first.
    ///
    /// # Errors
    ///
    /// - [`EventHubError::Unauthorized`] / [`EventHubError::Forbidden`] unless
    ///   the principal is an admin
    /// - [`EventHubError::NotFound`] if the event does not exist
    pub async fn event_registrations(
        &self,
        principal: &Principal,
        event_id: EventId,
        page: PageRequest,
    ) -> Result<Page<Registration>> {
        ensure(principal, Action::ViewAllRegistrations, &Resource::None)?;
        self.load_event(event_id).await?;
        self.all_registrations(principal, Some(event_id), page).await
    }

    /// Registrations system-wide, optionally for one event, newest first.
    ///
    /// # Errors
    ///
    /// [`EventHubError::Unauthorized`] / [`EventHubError::Forbidden`] unless
    /// the principal is an admin.
    pub async fn all_registrations(
        &self,
        principal: &Principal,
        event_id: Option<EventId>,
        page: PageRequest,
    ) -> Result<Page<Registration>> {
        ensure(principal, Action::ViewAllRegistrations, &Resource::None)?;
        let filter = RegistrationFilter {
            event_id,
            ..RegistrationFilter::default()
        };
        self.store.list_registrations(&filter, page).await
    }

    /// Cancel another user's active registration, freeing the seat.
    ///
    /// # Errors
    ///
    /// - [`EventHubError::Unauthorized`] / [`EventHubError::Forbidden`] unless
    ///   the principal is an admin
    /// - [`EventHubError::NotFound`] if the event does not exist
    /// - `Rejected(not_registered)` if the user holds no active registration
    pub async fn cancel_registration(
        &self,
        principal: &Principal,
        event_id: EventId,
        user_id: UserId,
    ) -> Result<Registration> {
        ensure(principal, Action::CancelAnyRegistration, &Resource::None).inspect_err(|e| {
            tracing::warn!(%event_id, %user_id, error = %e, "Registration cancel denied");
        })?;
        self.cancel_seat(event_id, user_id).await
    }

    /// System statistics as of now.
    ///
    /// # Errors
    ///
    /// [`EventHubError::Unauthorized`] / [`EventHubError::Forbidden`] unless
    /// the principal is an admin.
    pub async fn statistics(&self, principal: &Principal) -> Result<SystemStatistics> {
        ensure(principal, Action::ViewStatistics, &Resource::None)?;
        self.store.statistics(self.now()).await
    }
}

fn protected(actor: &Actor, target: &Identity, verb: &str) -> EventHubError {
    tracing::warn!(
        admin_id = %actor.id,
        user_id = %target.id,
        "Refused to {verb} protected account"
    );
    DenyReason::ProtectedAccount.into()
}
