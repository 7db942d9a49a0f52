//! Persistence seams.
//!
//! The application layer only talks to these traits. `eventhub-postgres`
//! implements them on PostgreSQL; `eventhub-testing` implements them in
//! memory with the same locking guarantees.
//!
//! Methods return `impl Future + Send` so that stores can be used from
//! spawned tasks; implementations are free to write them as `async fn`.

use crate::Result;
use crate::report::SystemStatistics;
use crate::roster::{EventRoster, RosterAction, RosterEffect};
use crate::types::{
    Event, EventFilter, EventId, Identity, IdentityFilter, Page, PageRequest, Registration,
    RegistrationFilter, UserId,
};
use chrono::{DateTime, Utc};
use smallvec::SmallVec;
use std::future::Future;

/// Identity Store: accounts, credential hashes and roles.
pub trait IdentityStore: Send + Sync {
    /// Insert a new identity.
    ///
    /// # Errors
    ///
    /// - [`crate::EventHubError::Conflict`] if the username or email is taken
    /// - [`crate::EventHubError::Storage`] on backend failure
    fn insert_identity(&self, identity: Identity) -> impl Future<Output = Result<Identity>> + Send;

    /// Look up an identity by id.
    ///
    /// # Errors
    ///
    /// Returns [`crate::EventHubError::Storage`] on backend failure.
    fn find_identity(&self, id: UserId) -> impl Future<Output = Result<Option<Identity>>> + Send;

    /// Look up an identity whose username or email equals `login` exactly,
    /// preferring an email match.
    ///
    /// # Errors
    ///
    /// Returns [`crate::EventHubError::Storage`] on backend failure.
    fn find_identity_by_login(
        &self,
        login: &str,
    ) -> impl Future<Output = Result<Option<Identity>>> + Send;

    /// Overwrite an existing identity.
    ///
    /// # Errors
    ///
    /// - [`crate::EventHubError::NotFound`] if it does not exist
    /// - [`crate::EventHubError::Conflict`] if the new username or email is taken
    /// - [`crate::EventHubError::Storage`] on backend failure
    fn update_identity(&self, identity: &Identity) -> impl Future<Output = Result<()>> + Send;

    /// Delete an identity together with its events and registrations.
    ///
    /// # Errors
    ///
    /// - [`crate::EventHubError::NotFound`] if it does not exist
    /// - [`crate::EventHubError::Storage`] on backend failure
    fn delete_identity(&self, id: UserId) -> impl Future<Output = Result<()>> + Send;

    /// List identities matching `filter`, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`crate::EventHubError::Storage`] on backend failure.
    fn list_identities(
        &self,
        filter: &IdentityFilter,
        page: PageRequest,
    ) -> impl Future<Output = Result<Page<Identity>>> + Send;
}

/// Event Store: events and their lifecycle.
///
/// Edits that touch capacity or status go through [`RosterStore::dispatch`]
/// so they are checked against the active count under the event lock.
pub trait EventCatalog: Send + Sync {
    /// Insert a new event.
    ///
    /// # Errors
    ///
    /// - [`crate::EventHubError::NotFound`] if the creator does not exist
    /// - [`crate::EventHubError::Storage`] on backend failure
    fn insert_event(&self, event: Event) -> impl Future<Output = Result<Event>> + Send;

    /// Look up an event by id.
    ///
    /// # Errors
    ///
    /// Returns [`crate::EventHubError::Storage`] on backend failure.
    fn find_event(&self, id: EventId) -> impl Future<Output = Result<Option<Event>>> + Send;

    /// Delete an event and all of its registrations.
    ///
    /// # Errors
    ///
    /// - [`crate::EventHubError::NotFound`] if it does not exist
    /// - [`crate::EventHubError::Storage`] on backend failure
    fn delete_event(&self, id: EventId) -> impl Future<Output = Result<()>> + Send;

    /// List events matching `filter` in the filter's order.
    ///
    /// # Errors
    ///
    /// Returns [`crate::EventHubError::Storage`] on backend failure.
    fn list_events(
        &self,
        filter: &EventFilter,
        page: PageRequest,
    ) -> impl Future<Output = Result<Page<Event>>> + Send;
}

/// Registration Ledger plus the Registration Engine's critical section.
pub trait RosterStore: Send + Sync {
    /// Lock the event, load its roster, run the roster reducer and persist
    /// the resulting effects, all as one atomic step.
    ///
    /// # Errors
    ///
    /// - [`crate::EventHubError::NotFound`] if the event does not exist
    /// - [`crate::EventHubError::Rejected`] / [`crate::EventHubError::Unauthorized`]
    ///   when the reducer refuses; nothing is written
    /// - [`crate::EventHubError::Storage`] on backend failure
    fn dispatch(
        &self,
        event_id: EventId,
        action: RosterAction,
    ) -> impl Future<Output = Result<SmallVec<[RosterEffect; 4]>>> + Send;

    /// Snapshot of an event and its active registrations.
    ///
    /// # Errors
    ///
    /// Returns [`crate::EventHubError::Storage`] on backend failure.
    fn roster(&self, event_id: EventId) -> impl Future<Output = Result<Option<EventRoster>>> + Send;

    /// Active registration count for one event.
    ///
    /// # Errors
    ///
    /// Returns [`crate::EventHubError::Storage`] on backend failure.
    fn active_count(&self, event_id: EventId) -> impl Future<Output = Result<u32>> + Send;

    /// Registrations matching `filter`, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`crate::EventHubError::Storage`] on backend failure.
    fn list_registrations(
        &self,
        filter: &RegistrationFilter,
        page: PageRequest,
    ) -> impl Future<Output = Result<Page<Registration>>> + Send;

    /// A user's active registrations with their events, soonest event first.
    ///
    /// # Errors
    ///
    /// Returns [`crate::EventHubError::Storage`] on backend failure.
    fn registered_events(
        &self,
        user_id: UserId,
    ) -> impl Future<Output = Result<Vec<(Registration, Event)>>> + Send;

    /// Active registrations of one event with the registered identities,
    /// oldest registration first.
    ///
    /// # Errors
    ///
    /// Returns [`crate::EventHubError::Storage`] on backend failure.
    fn attendees(
        &self,
        event_id: EventId,
    ) -> impl Future<Output = Result<Vec<(Registration, Identity)>>> + Send;
}

/// Aggregate figures for the admin console.
pub trait ReportStore: Send + Sync {
    /// System-wide statistics as of `now`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::EventHubError::Storage`] on backend failure.
    fn statistics(
        &self,
        now: DateTime<Utc>,
    ) -> impl Future<Output = Result<SystemStatistics>> + Send;
}

/// Everything the application layer needs from a backend.
pub trait Store: IdentityStore + EventCatalog + RosterStore + ReportStore {}

impl<T> Store for T where T: IdentityStore + EventCatalog + RosterStore + ReportStore {}
