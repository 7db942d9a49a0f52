//! In-memory backend for fast, deterministic tests.
//!
//! [`InMemoryStore`] implements every store trait over plain collections
//! guarded by one `tokio::sync::Mutex`. Roster dispatch holds that mutex for
//! the whole load-reduce-persist step, which gives the same linearization per
//! event that `SELECT … FOR UPDATE` gives the PostgreSQL store.

use eventhub_core::authorization::Principal;
use eventhub_core::environment::{Clock, SystemClock};
use eventhub_core::report::{
    CategoryCount, EventStatistics, RegistrationStatistics, RoleCounts, StatusCounts,
    SystemStatistics, UserStatistics, tally_months, window_start,
};
use eventhub_core::roster::{self, EventRoster, RosterAction, RosterEffect, RosterEnvironment};
use eventhub_core::store::{EventCatalog, IdentityStore, ReportStore, RosterStore};
use eventhub_core::types::{
    Event, EventFilter, EventId, EventOrder, EventStatus, Identity, IdentityFilter, Page,
    PageRequest, Registration, RegistrationFilter, RegistrationStatus, Role, UserId,
};
use eventhub_core::{ConflictReason, DateTime, EventHubError, Result, SmallVec, Utc};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::Mutex;

#[derive(Debug, Default)]
struct Tables {
    // Vecs keep insertion order, used as a tie-breaker for equal timestamps.
    identities: Vec<Identity>,
    events: Vec<Event>,
    registrations: Vec<Registration>,
}

impl Tables {
    fn identity(&self, id: UserId) -> Option<&Identity> {
        self.identities.iter().find(|i| i.id == id)
    }

    fn event(&self, id: EventId) -> Option<&Event> {
        self.events.iter().find(|e| e.id == id)
    }

    fn check_unique(&self, candidate: &Identity) -> Result<()> {
        let others = self.identities.iter().filter(|i| i.id != candidate.id);
        for other in others {
            if other.username == candidate.username {
                return Err(EventHubError::Conflict(ConflictReason::UsernameTaken));
            }
            if other.email == candidate.email {
                return Err(EventHubError::Conflict(ConflictReason::EmailTaken));
            }
        }
        Ok(())
    }

    fn active_for_event(&self, event_id: EventId) -> impl Iterator<Item = &Registration> {
        self.registrations
            .iter()
            .filter(move |r| r.event_id == event_id && r.is_active())
    }

    fn apply(&mut self, effect: &RosterEffect) {
        match effect {
            RosterEffect::Registered(registration) => {
                self.registrations.push(registration.clone());
            }
            RosterEffect::Cancelled(registration) => {
                if let Some(row) = self
                    .registrations
                    .iter_mut()
                    .find(|r| r.id == registration.id)
                {
                    *row = registration.clone();
                }
            }
            RosterEffect::Amended(event) => {
                if let Some(row) = self.events.iter_mut().find(|e| e.id == event.id) {
                    *row = event.clone();
                }
            }
        }
    }
}

/// In-memory implementation of all EventHub store traits.
///
/// Cloning shares the underlying tables.
#[derive(Clone)]
pub struct InMemoryStore {
    tables: Arc<Mutex<Tables>>,
    env: RosterEnvironment,
}

impl InMemoryStore {
    /// Create an empty store on the system clock
    #[must_use]
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Create an empty store whose roster reducer uses `clock`
    #[must_use]
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            tables: Arc::new(Mutex::new(Tables::default())),
            env: RosterEnvironment::new(clock),
        }
    }

    /// Every registration row, including cancelled history, for assertions.
    pub async fn all_registrations(&self) -> Vec<Registration> {
        self.tables.lock().await.registrations.clone()
    }

    /// Number of stored events.
    pub async fn event_count(&self) -> usize {
        self.tables.lock().await.events.len()
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for InMemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryStore").finish_non_exhaustive()
    }
}

fn newest_first<T>(rows: Vec<T>, created_at: impl Fn(&T) -> DateTime<Utc>) -> Vec<T> {
    let mut rows: Vec<T> = rows.into_iter().rev().collect();
    rows.sort_by_key(|row| std::cmp::Reverse(created_at(row)));
    rows
}

impl IdentityStore for InMemoryStore {
    async fn insert_identity(&self, identity: Identity) -> Result<Identity> {
        let mut tables = self.tables.lock().await;
        tables.check_unique(&identity)?;
        tables.identities.push(identity.clone());
        Ok(identity)
    }

    async fn find_identity(&self, id: UserId) -> Result<Option<Identity>> {
        Ok(self.tables.lock().await.identity(id).cloned())
    }

    async fn find_identity_by_login(&self, login: &str) -> Result<Option<Identity>> {
        let tables = self.tables.lock().await;
        // An email match wins over a username match.
        let by_email = tables.identities.iter().find(|i| i.email == login);
        Ok(by_email
            .or_else(|| tables.identities.iter().find(|i| i.username == login))
            .cloned())
    }

    async fn update_identity(&self, identity: &Identity) -> Result<()> {
        let mut tables = self.tables.lock().await;
        tables.check_unique(identity)?;
        let row = tables
            .identities
            .iter_mut()
            .find(|i| i.id == identity.id)
            .ok_or_else(|| EventHubError::identity_not_found(identity.id))?;
        *row = identity.clone();
        Ok(())
    }

    async fn delete_identity(&self, id: UserId) -> Result<()> {
        let mut tables = self.tables.lock().await;
        if tables.identity(id).is_none() {
            return Err(EventHubError::identity_not_found(id));
        }

        let owned: Vec<EventId> = tables
            .events
            .iter()
            .filter(|e| e.creator_id == id)
            .map(|e| e.id)
            .collect();
        tables
            .registrations
            .retain(|r| r.user_id != id && !owned.contains(&r.event_id));
        tables.events.retain(|e| e.creator_id != id);
        tables.identities.retain(|i| i.id != id);
        Ok(())
    }

    async fn list_identities(
        &self,
        filter: &IdentityFilter,
        page: PageRequest,
    ) -> Result<Page<Identity>> {
        let tables = self.tables.lock().await;
        let matching: Vec<Identity> = tables
            .identities
            .iter()
            .filter(|i| filter.matches(i))
            .cloned()
            .collect();
        Ok(Page::from_vec(newest_first(matching, |i| i.created_at), page))
    }
}

impl EventCatalog for InMemoryStore {
    async fn insert_event(&self, event: Event) -> Result<Event> {
        let mut tables = self.tables.lock().await;
        if tables.identity(event.creator_id).is_none() {
            return Err(EventHubError::identity_not_found(event.creator_id));
        }
        tables.events.push(event.clone());
        Ok(event)
    }

    async fn find_event(&self, id: EventId) -> Result<Option<Event>> {
        Ok(self.tables.lock().await.event(id).cloned())
    }

    async fn delete_event(&self, id: EventId) -> Result<()> {
        let mut tables = self.tables.lock().await;
        if tables.event(id).is_none() {
            return Err(EventHubError::event_not_found(id));
        }
        tables.registrations.retain(|r| r.event_id != id);
        tables.events.retain(|e| e.id != id);
        Ok(())
    }

    async fn list_events(&self, filter: &EventFilter, page: PageRequest) -> Result<Page<Event>> {
        let tables = self.tables.lock().await;
        let matching: Vec<Event> = tables
            .events
            .iter()
            .filter(|e| filter.matches(e))
            .cloned()
            .collect();
        let ordered = match filter.order {
            EventOrder::StartsAtAsc => {
                let mut rows = matching;
                rows.sort_by_key(|e| e.starts_at);
                rows
            }
            EventOrder::CreatedAtDesc => newest_first(matching, |e| e.created_at),
        };
        Ok(Page::from_vec(ordered, page))
    }
}

impl RosterStore for InMemoryStore {
    async fn dispatch(
        &self,
        event_id: EventId,
        action: RosterAction,
    ) -> Result<SmallVec<[RosterEffect; 4]>> {
        let mut tables = self.tables.lock().await;
        let event = tables
            .event(event_id)
            .cloned()
            .ok_or_else(|| EventHubError::event_not_found(event_id))?;
        // Seats reference an identity row, as the registrations foreign key does.
        if let RosterAction::Register {
            principal: Principal::Authenticated(actor),
            ..
        } = &action
        {
            if tables.identity(actor.id).is_none() {
                return Err(EventHubError::identity_not_found(actor.id));
            }
        }
        let mut state = EventRoster::new(event, tables.active_for_event(event_id).cloned());

        let effects = roster::decide(&mut state, action, &self.env)?;
        for effect in &effects {
            tables.apply(effect);
        }
        Ok(effects)
    }

    async fn roster(&self, event_id: EventId) -> Result<Option<EventRoster>> {
        let tables = self.tables.lock().await;
        Ok(tables.event(event_id).cloned().map(|event| {
            EventRoster::new(event, tables.active_for_event(event_id).cloned())
        }))
    }

    async fn active_count(&self, event_id: EventId) -> Result<u32> {
        let tables = self.tables.lock().await;
        let count = tables.active_for_event(event_id).count();
        Ok(u32::try_from(count).unwrap_or(u32::MAX))
    }

    async fn list_registrations(
        &self,
        filter: &RegistrationFilter,
        page: PageRequest,
    ) -> Result<Page<Registration>> {
        let tables = self.tables.lock().await;
        let matching: Vec<Registration> = tables
            .registrations
            .iter()
            .filter(|r| filter.matches(r))
            .cloned()
            .collect();
        Ok(Page::from_vec(
            newest_first(matching, |r| r.registered_at),
            page,
        ))
    }

    async fn registered_events(&self, user_id: UserId) -> Result<Vec<(Registration, Event)>> {
        let tables = self.tables.lock().await;
        let mut rows: Vec<(Registration, Event)> = tables
            .registrations
            .iter()
            .filter(|r| r.user_id == user_id && r.is_active())
            .filter_map(|r| tables.event(r.event_id).map(|e| (r.clone(), e.clone())))
            .collect();
        rows.sort_by_key(|(_, event)| event.starts_at);
        Ok(rows)
    }

    async fn attendees(&self, event_id: EventId) -> Result<Vec<(Registration, Identity)>> {
        let tables = self.tables.lock().await;
        let mut rows: Vec<(Registration, Identity)> = tables
            .active_for_event(event_id)
            .filter_map(|r| tables.identity(r.user_id).map(|i| (r.clone(), i.clone())))
            .collect();
        rows.sort_by_key(|(registration, _)| registration.registered_at);
        Ok(rows)
    }
}

impl ReportStore for InMemoryStore {
    async fn statistics(&self, now: DateTime<Utc>) -> Result<SystemStatistics> {
        let tables = self.tables.lock().await;
        let count = |n: usize| u64::try_from(n).unwrap_or(u64::MAX);

        let by_role = |role: Role| count(tables.identities.iter().filter(|i| i.role == role).count());
        let users = UserStatistics {
            total: count(tables.identities.len()),
            active: count(tables.identities.iter().filter(|i| i.is_active).count()),
            by_role: RoleCounts {
                user: by_role(Role::User),
                organizer: by_role(Role::Organizer),
                admin: by_role(Role::Admin),
            },
        };

        let by_status =
            |status: EventStatus| count(tables.events.iter().filter(|e| e.status == status).count());
        let mut categories: BTreeMap<&str, u64> = BTreeMap::new();
        for category in tables.events.iter().filter_map(|e| e.category.as_deref()) {
            *categories.entry(category).or_default() += 1;
        }
        let mut by_category: Vec<CategoryCount> = categories
            .into_iter()
            .map(|(category, count)| CategoryCount {
                category: category.to_string(),
                count,
            })
            .collect();
        by_category.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.category.cmp(&b.category)));
        let upcoming = count(tables.events.iter().filter(|e| e.is_upcoming(now)).count());
        let events = EventStatistics {
            total: count(tables.events.len()),
            upcoming,
            past: count(tables.events.len()).saturating_sub(upcoming),
            by_status: StatusCounts {
                draft: by_status(EventStatus::Draft),
                published: by_status(EventStatus::Published),
                cancelled: by_status(EventStatus::Cancelled),
            },
            by_category,
        };

        let by_reg_status = |status: RegistrationStatus| {
            count(tables.registrations.iter().filter(|r| r.status == status).count())
        };
        let since = window_start(now);
        let registrations = RegistrationStatistics {
            total: count(tables.registrations.len()),
            active: by_reg_status(RegistrationStatus::Registered),
            cancelled: by_reg_status(RegistrationStatus::Cancelled),
            monthly: tally_months(
                now,
                tables
                    .registrations
                    .iter()
                    .map(|r| r.registered_at)
                    .filter(|t| *t >= since),
            ),
        };

        Ok(SystemStatistics {
            users,
            events,
            registrations,
        })
    }
}
