//! The EventHub application service.
//!
//! [`EventHub`] is the single entry point for event and registration
//! operations. Every method takes the [`Principal`] asking, consults the
//! Authorization Gate, then talks to the store. Roster changes (register,
//! unregister, capacity and status edits) go through
//! [`RosterStore::dispatch`] so they run under the per-event lock.
//!
//! Admin console operations live in [`crate::admin`] as a second `impl`
//! block on the same type.

use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use eventhub_core::authorization::{Action, Decision, Principal, Resource, authorize, ensure};
use eventhub_core::environment::{Clock, SystemClock};
use eventhub_core::roster::{Availability, RosterAction, RosterEffect};
use eventhub_core::store::{EventCatalog, RosterStore, Store};
use eventhub_core::types::{
    Event, EventDraft, EventFilter, EventId, EventOrder, EventPatch, EventStatus, Identity, Page,
    PageRequest, Registration, UserId,
};
use eventhub_core::{EventHubError, Result, SmallVec};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::config::{AppConfig, DEFAULT_ADMIN_ITEMS_PER_PAGE, DEFAULT_ITEMS_PER_PAGE};

/// Page size used when collecting every match of a query.
const SCAN_PAGE_SIZE: u32 = 200;

/// Event details as shown to one viewer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventDetails {
    /// The event
    pub event: Event,
    /// Derived seat figures
    pub availability: Availability,
    /// Whether the viewer holds an active registration
    pub is_registered: bool,
    /// Whether the viewer may edit, publish, cancel or delete the event
    pub can_manage: bool,
}

/// Filters a visitor can apply to the upcoming-events listing.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventSearch {
    /// Exact category
    pub category: Option<String>,
    /// Case-insensitive text in title or description
    pub search: Option<String>,
    /// Case-insensitive text in location
    pub location: Option<String>,
    /// Earliest start, inclusive
    pub starts_from: Option<DateTime<Utc>>,
    /// Latest start, inclusive
    pub starts_until: Option<DateTime<Utc>>,
}

impl EventSearch {
    fn into_filter(self, now: DateTime<Utc>) -> EventFilter {
        let text = |value: Option<String>| {
            value
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        EventFilter {
            category: text(self.category),
            search: text(self.search),
            location: text(self.location),
            starts_from: self.starts_from,
            starts_until: self.starts_until,
            ..EventFilter::upcoming(now)
        }
    }
}

/// Application service over a [`Store`].
pub struct EventHub<S> {
    pub(crate) store: Arc<S>,
    pub(crate) clock: Arc<dyn Clock>,
    per_page: u32,
    admin_per_page: u32,
}

impl<S> Clone for EventHub<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            clock: Arc::clone(&self.clock),
            per_page: self.per_page,
            admin_per_page: self.admin_per_page,
        }
    }
}

impl<S> fmt::Debug for EventHub<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventHub")
            .field("per_page", &self.per_page)
            .field("admin_per_page", &self.admin_per_page)
            .finish_non_exhaustive()
    }
}

impl<S: Store> EventHub<S> {
    /// Create a hub on the system clock with default page sizes.
    pub fn new(store: Arc<S>) -> Self {
        Self::with_clock(store, Arc::new(SystemClock))
    }

    /// Create a hub with an explicit clock.
    pub fn with_clock(store: Arc<S>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            clock,
            per_page: DEFAULT_ITEMS_PER_PAGE,
            admin_per_page: DEFAULT_ADMIN_ITEMS_PER_PAGE,
        }
    }

    /// Create a hub on the system clock using the configured page sizes.
    pub fn from_config(store: Arc<S>, config: &AppConfig) -> Self {
        Self::new(store).with_page_sizes(config.items_per_page, config.admin_items_per_page)
    }

    /// Override the public and admin page sizes.
    #[must_use]
    pub fn with_page_sizes(mut self, per_page: u32, admin_per_page: u32) -> Self {
        self.per_page = per_page;
        self.admin_per_page = admin_per_page;
        self
    }

    /// The underlying store.
    #[must_use]
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Current time on the hub's clock.
    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Page `n` of a public listing.
    #[must_use]
    pub const fn page(&self, n: u32) -> PageRequest {
        PageRequest::new(n, self.per_page)
    }

    /// Page `n` of an admin listing.
    #[must_use]
    pub const fn admin_page(&self, n: u32) -> PageRequest {
        PageRequest::new(n, self.admin_per_page)
    }

    /// Ask the Authorization Gate without performing anything.
    #[must_use]
    pub fn authorize(&self, principal: &Principal, action: Action, resource: &Resource) -> Decision {
        authorize(principal, action, resource)
    }

    pub(crate) async fn load_event(&self, event_id: EventId) -> Result<Event> {
        self.store
            .find_event(event_id)
            .await?
            .ok_or_else(|| EventHubError::event_not_found(event_id))
    }

    // ═══════════════════════════════════════════════════════════
    // Event lifecycle
    // ═══════════════════════════════════════════════════════════

    /// Create an event owned by the principal.
    ///
    /// # Errors
    ///
    /// - [`EventHubError::Unauthorized`] for anonymous principals
    /// - [`EventHubError::Forbidden`] for plain users
    /// - [`EventHubError::ValidationFailed`] for invalid fields or schedule
    pub async fn create_event(&self, principal: &Principal, draft: EventDraft) -> Result<Event> {
        ensure(principal, Action::CreateEvent, &Resource::None).inspect_err(|e| {
            tracing::warn!(error = %e, "Event creation denied");
        })?;
        let actor = principal.require_actor()?;

        let event = Event::from_draft(EventId::new(), actor.id, draft, self.now())?;
        let event = self.store.insert_event(event).await?;

        tracing::info!(
            event_id = %event.id,
            creator_id = %actor.id,
            status = event.status.as_str(),
            "Event created"
        );
        Ok(event)
    }

    /// Edit an event's fields, capacity or status.
    ///
    /// # Errors
    ///
    /// - [`EventHubError::NotFound`] if the event does not exist
    /// - [`EventHubError::Unauthorized`] / [`EventHubError::Forbidden`] unless
    ///   the principal is the creator or an admin
    /// - [`EventHubError::ValidationFailed`] for invalid fields or schedule,
    ///   the merged schedule being rechecked under the event lock
    /// - [`EventHubError::Rejected`] with `capacity_below_registrations` or
    ///   `invalid_status_transition`
    pub async fn update_event(
        &self,
        principal: &Principal,
        event_id: EventId,
        patch: EventPatch,
    ) -> Result<Event> {
        let event = self.load_event(event_id).await?;
        ensure(principal, Action::EditEvent, &Resource::event(event.creator_id)).inspect_err(
            |e| tracing::warn!(%event_id, error = %e, "Event edit denied"),
        )?;
        patch.validate()?;
        patch.validate_schedule(&event, self.now())?;

        self.amend(event_id, patch).await
    }

    /// Move a draft to `published`.
    ///
    /// # Errors
    ///
    /// As [`Self::update_event`].
    pub async fn publish_event(&self, principal: &Principal, event_id: EventId) -> Result<Event> {
        self.change_status(principal, event_id, Action::PublishEvent, EventStatus::Published)
            .await
    }

    /// Move an event to `cancelled`. Existing registrations are kept.
    ///
    /// # Errors
    ///
    /// As [`Self::update_event`].
    pub async fn cancel_event(&self, principal: &Principal, event_id: EventId) -> Result<Event> {
        self.change_status(principal, event_id, Action::CancelEvent, EventStatus::Cancelled)
            .await
    }

    async fn change_status(
        &self,
        principal: &Principal,
        event_id: EventId,
        action: Action,
        status: EventStatus,
    ) -> Result<Event> {
        let event = self.load_event(event_id).await?;
        ensure(principal, action, &Resource::event(event.creator_id)).inspect_err(|e| {
            tracing::warn!(%event_id, ?action, error = %e, "Status change denied");
        })?;

        self.amend(event_id, EventPatch::status(status)).await
    }

    async fn amend(&self, event_id: EventId, patch: EventPatch) -> Result<Event> {
        let effects = self
            .store
            .dispatch(event_id, RosterAction::Amend { patch })
            .await
            .inspect_err(|e| tracing::warn!(%event_id, error = %e, "Event edit rejected"))?;

        let event = effects
            .into_iter()
            .find_map(|effect| match effect {
                RosterEffect::Amended(event) => Some(event),
                _ => None,
            })
            .ok_or_else(|| EventHubError::Storage("amend produced no event".to_string()))?;

        tracing::info!(%event_id, status = event.status.as_str(), "Event updated");
        Ok(event)
    }

    /// Delete an event and, by cascade, all of its registrations.
    ///
    /// # Errors
    ///
    /// - [`EventHubError::NotFound`] if the event does not exist
    /// - [`EventHubError::Unauthorized`] / [`EventHubError::Forbidden`] unless
    ///   the principal is the creator or an admin
    pub async fn delete_event(&self, principal: &Principal, event_id: EventId) -> Result<()> {
        let event = self.load_event(event_id).await?;
        ensure(principal, Action::DeleteEvent, &Resource::event(event.creator_id)).inspect_err(
            |e| tracing::warn!(%event_id, error = %e, "Event deletion denied"),
        )?;

        self.store.delete_event(event_id).await?;
        tracing::info!(%event_id, title = %event.title, "Event deleted");
        Ok(())
    }

    // ═══════════════════════════════════════════════════════════
    // Browsing
    // ═══════════════════════════════════════════════════════════

    /// One event with derived availability, as seen by `principal`.
    ///
    /// Drafts are only visible to their creator and admins.
    ///
    /// # Errors
    ///
    /// Returns [`EventHubError::NotFound`] if the event does not exist or is
    /// a draft the principal may not manage.
    pub async fn event_details(
        &self,
        principal: &Principal,
        event_id: EventId,
    ) -> Result<EventDetails> {
        let roster = self
            .store
            .roster(event_id)
            .await?
            .ok_or_else(|| EventHubError::event_not_found(event_id))?;

        let resource = Resource::event(roster.event.creator_id);
        let can_manage = authorize(principal, Action::EditEvent, &resource).is_allowed();
        if roster.event.status == EventStatus::Draft && !can_manage {
            return Err(EventHubError::event_not_found(event_id));
        }

        let is_registered = principal
            .as_actor()
            .is_some_and(|actor| roster.active_for(actor.id).is_some());

        Ok(EventDetails {
            availability: roster.availability(self.now()),
            is_registered,
            can_manage,
            event: roster.event,
        })
    }

    /// Published events starting after now, soonest first.
    ///
    /// # Errors
    ///
    /// Returns [`EventHubError::Storage`] on backend failure.
    pub async fn list_upcoming_events(
        &self,
        principal: &Principal,
        search: EventSearch,
        page: PageRequest,
    ) -> Result<Page<Event>> {
        ensure(principal, Action::ViewEvents, &Resource::None)?;
        let filter = search.into_filter(self.now());
        self.store.list_events(&filter, page).await
    }

    /// Published events starting in one calendar month, grouped by day.
    ///
    /// # Errors
    ///
    /// - [`EventHubError::ValidationFailed`] for an impossible month
    /// - [`EventHubError::Storage`] on backend failure
    pub async fn event_calendar(
        &self,
        principal: &Principal,
        year: i32,
        month: u32,
    ) -> Result<BTreeMap<NaiveDate, Vec<Event>>> {
        ensure(principal, Action::ViewEvents, &Resource::None)?;
        let (first, next) = month_bounds(year, month)?;

        let filter = EventFilter {
            status: Some(EventStatus::Published),
            starts_from: Some(first),
            starts_until: Some(next - Duration::microseconds(1)),
            order: EventOrder::StartsAtAsc,
            ..EventFilter::default()
        };

        let mut by_day: BTreeMap<NaiveDate, Vec<Event>> = BTreeMap::new();
        for event in self.collect_events(&filter).await? {
            by_day
                .entry(event.starts_at.date_naive())
                .or_default()
                .push(event);
        }
        Ok(by_day)
    }

    async fn collect_events(&self, filter: &EventFilter) -> Result<Vec<Event>> {
        let mut request = PageRequest::new(1, SCAN_PAGE_SIZE);
        let mut events = Vec::new();
        loop {
            let page = self.store.list_events(filter, request).await?;
            let more = page.has_next();
            events.extend(page.items);
            if !more {
                return Ok(events);
            }
            request.page += 1;
        }
    }

    /// Events created by the principal, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`EventHubError::Unauthorized`] for anonymous principals.
    pub async fn my_events(&self, principal: &Principal, page: PageRequest) -> Result<Page<Event>> {
        let actor = principal.require_actor()?;
        let filter = EventFilter {
            creator_id: Some(actor.id),
            order: EventOrder::CreatedAtDesc,
            ..EventFilter::default()
        };
        self.store.list_events(&filter, page).await
    }

    /// The principal's active registrations with their events, soonest
    /// event first.
    ///
    /// # Errors
    ///
    /// Returns [`EventHubError::Unauthorized`] for anonymous principals.
    pub async fn registered_events(
        &self,
        principal: &Principal,
    ) -> Result<Vec<(Registration, Event)>> {
        let actor = principal.require_actor()?;
        self.store.registered_events(actor.id).await
    }

    /// Who holds a seat, oldest registration first.
    ///
    /// # Errors
    ///
    /// - [`EventHubError::NotFound`] if the event does not exist
    /// - [`EventHubError::Unauthorized`] / [`EventHubError::Forbidden`] unless
    ///   the principal is the creator or an admin
    pub async fn event_attendees(
        &self,
        principal: &Principal,
        event_id: EventId,
    ) -> Result<Vec<(Registration, Identity)>> {
        let event = self.load_event(event_id).await?;
        ensure(principal, Action::ViewAttendees, &Resource::event(event.creator_id))?;
        self.store.attendees(event_id).await
    }

    // ═══════════════════════════════════════════════════════════
    // Registration Engine
    // ═══════════════════════════════════════════════════════════

    /// Take a seat at `event_id` as of `now`.
    ///
    /// # Errors
    ///
    /// Checked in order, first failure wins:
    ///
    /// - [`EventHubError::NotFound`] if the event does not exist
    /// - `Rejected(event_not_published)`
    /// - [`EventHubError::Unauthorized`] for anonymous principals
    /// - `Rejected(self_registration_forbidden)` for the creator
    /// - `Rejected(already_registered)`
    /// - `Rejected(registration_closed)` past the deadline or start
    /// - `Rejected(event_full)`
    pub async fn register_for_event(
        &self,
        principal: &Principal,
        event_id: EventId,
        now: DateTime<Utc>,
    ) -> Result<Registration> {
        let action = RosterAction::Register {
            principal: *principal,
            now,
        };
        let registration = match self.store.dispatch(event_id, action).await {
            Ok(effects) => first_registered(effects)?,
            Err(error) => {
                record_rejection(&error);
                tracing::warn!(%event_id, error = %error, "Registration refused");
                return Err(error);
            }
        };

        metrics::counter!("eventhub.registrations.accepted").increment(1);
        tracing::info!(
            %event_id,
            user_id = %registration.user_id,
            registration_id = %registration.id,
            "Registered for event"
        );
        Ok(registration)
    }

    /// Give up the principal's seat at `event_id`.
    ///
    /// # Errors
    ///
    /// - [`EventHubError::Unauthorized`] for anonymous principals
    /// - [`EventHubError::NotFound`] if the event does not exist
    /// - `Rejected(not_registered)` without an active registration
    pub async fn unregister_from_event(
        &self,
        principal: &Principal,
        event_id: EventId,
    ) -> Result<Registration> {
        ensure(principal, Action::UnregisterFromEvent, &Resource::None)?;
        let actor = principal.require_actor()?;
        self.cancel_seat(event_id, actor.id).await
    }

    pub(crate) async fn cancel_seat(
        &self,
        event_id: EventId,
        user_id: UserId,
    ) -> Result<Registration> {
        let registration = match self
            .store
            .dispatch(event_id, RosterAction::Unregister { user_id })
            .await
        {
            Ok(effects) => first_cancelled(effects)?,
            Err(error) => {
                record_rejection(&error);
                tracing::warn!(%event_id, %user_id, error = %error, "Unregistration refused");
                return Err(error);
            }
        };

        metrics::counter!("eventhub.registrations.cancelled").increment(1);
        tracing::info!(%event_id, %user_id, "Registration cancelled");
        Ok(registration)
    }
}

fn record_rejection(error: &EventHubError) {
    if let Some(rejection) = error.rejection() {
        metrics::counter!("eventhub.registrations.rejected", "reason" => rejection.code())
            .increment(1);
    }
}

fn first_registered(effects: SmallVec<[RosterEffect; 4]>) -> Result<Registration> {
    effects
        .into_iter()
        .find_map(|effect| match effect {
            RosterEffect::Registered(registration) => Some(registration),
            _ => None,
        })
        .ok_or_else(|| EventHubError::Storage("register produced no registration".to_string()))
}

fn first_cancelled(effects: SmallVec<[RosterEffect; 4]>) -> Result<Registration> {
    effects
        .into_iter()
        .find_map(|effect| match effect {
            RosterEffect::Cancelled(registration) => Some(registration),
            _ => None,
        })
        .ok_or_else(|| EventHubError::Storage("unregister produced no registration".to_string()))
}

/// First instant of the month and of the month after, in UTC.
fn month_bounds(year: i32, month: u32) -> Result<(DateTime<Utc>, DateTime<Utc>)> {
    let invalid = || EventHubError::ValidationFailed(format!("No such month: {year}-{month}"));
    let first = NaiveDate::from_ymd_opt(year, month, 1).ok_or_else(invalid)?;
    let next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)
    }
    .ok_or_else(invalid)?;

    let midnight = |date: NaiveDate| Utc.from_utc_datetime(&date.and_time(chrono::NaiveTime::MIN));
    Ok((midnight(first), midnight(next)))
}
