//! Domain types for EventHub.
//!
//! Identifiers, the three persisted entities (identity, event, registration),
//! their lifecycle states, the write models used to create and edit them, and
//! the filters and pagination types used by listing queries.

use crate::error::{EventHubError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

// ============================================================================
// Identifiers
// ============================================================================

/// Unique identifier for an identity (user account)
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct UserId(Uuid);

impl UserId {
    /// Creates a new random `UserId`
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create a `UserId` from a `Uuid`
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Get the inner UUID
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for UserId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for an event
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EventId(Uuid);

impl EventId {
    /// Creates a new random `EventId`
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create an `EventId` from a `Uuid`
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Get the inner UUID
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for EventId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a registration
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RegistrationId(Uuid);

impl RegistrationId {
    /// Creates a new random `RegistrationId`
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create a `RegistrationId` from a `Uuid`
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Get the inner UUID
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for RegistrationId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RegistrationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Roles and statuses
// ============================================================================

/// Role assigned to an identity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Can browse and register for events
    User,
    /// Can additionally create and manage their own events
    Organizer,
    /// Superuser
    Admin,
}

impl Role {
    /// Convert role to its stored string representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Organizer => "organizer",
            Self::Admin => "admin",
        }
    }

    /// Whether this role may create events.
    #[must_use]
    pub const fn can_organize(&self) -> bool {
        matches!(self, Self::Organizer | Self::Admin)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = EventHubError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "user" => Ok(Self::User),
            "organizer" => Ok(Self::Organizer),
            "admin" => Ok(Self::Admin),
            _ => Err(EventHubError::ValidationFailed(format!("Invalid role: {s}"))),
        }
    }
}

/// Lifecycle status of an event.
///
/// Transitions: `draft → published`, `{draft, published} → cancelled`.
/// Nothing leaves `cancelled`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventStatus {
    /// Visible only to its creator and admins
    Draft,
    /// Listed publicly and open for registration
    Published,
    /// Terminal
    Cancelled,
}

impl EventStatus {
    /// Convert status to its stored string representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Published => "published",
            Self::Cancelled => "cancelled",
        }
    }

    /// Whether moving from `self` to `next` is a legal transition.
    ///
    /// Re-asserting the current status is treated as a legal no-op.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Draft, Self::Draft | Self::Published | Self::Cancelled)
                | (Self::Published, Self::Published | Self::Cancelled)
                | (Self::Cancelled, Self::Cancelled)
        )
    }
}

impl fmt::Display for EventStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventStatus {
    type Err = EventHubError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "draft" => Ok(Self::Draft),
            "published" => Ok(Self::Published),
            "cancelled" => Ok(Self::Cancelled),
            _ => Err(EventHubError::ValidationFailed(format!(
                "Invalid event status: {s}"
            ))),
        }
    }
}

/// Status of a single registration row.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegistrationStatus {
    /// Holds a seat
    Registered,
    /// Kept for history, holds no seat
    Cancelled,
}

impl RegistrationStatus {
    /// Convert status to its stored string representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Registered => "registered",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for RegistrationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RegistrationStatus {
    type Err = EventHubError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "registered" => Ok(Self::Registered),
            "cancelled" => Ok(Self::Cancelled),
            _ => Err(EventHubError::ValidationFailed(format!(
                "Invalid registration status: {s}"
            ))),
        }
    }
}

// ============================================================================
// Capacity value object
// ============================================================================

/// Maximum number of active registrations for an event. Always at least 1.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct Capacity(u32);

impl Capacity {
    /// Creates a capacity, rejecting zero.
    ///
    /// # Errors
    ///
    /// Returns [`EventHubError::ValidationFailed`] when `value` is zero.
    pub fn new(value: u32) -> Result<Self> {
        if value == 0 {
            return Err(EventHubError::ValidationFailed(
                "Capacity must be at least 1".to_string(),
            ));
        }
        Ok(Self(value))
    }

    /// Get the raw value
    #[must_use]
    pub const fn value(&self) -> u32 {
        self.0
    }
}

impl TryFrom<u32> for Capacity {
    type Error = EventHubError;

    fn try_from(value: u32) -> Result<Self> {
        Self::new(value)
    }
}

impl From<Capacity> for u32 {
    fn from(capacity: Capacity) -> Self {
        capacity.0
    }
}

impl fmt::Display for Capacity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Identity
// ============================================================================

/// A user account.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// Identity identifier
    pub id: UserId,
    /// Unique login name
    pub username: String,
    /// Unique email address
    pub email: String,
    /// Salted credential hash (PHC string)
    #[serde(skip_serializing)]
    pub password_hash: String,
    /// Optional given name
    pub first_name: Option<String>,
    /// Optional family name
    pub last_name: Option<String>,
    /// Assigned role
    pub role: Role,
    /// Inactive accounts cannot log in
    pub is_active: bool,
    /// When the account was created
    pub created_at: DateTime<Utc>,
    /// When the account was last modified
    pub updated_at: DateTime<Utc>,
}

impl Identity {
    /// Display name: "First Last" when both are set, otherwise the username.
    #[must_use]
    pub fn full_name(&self) -> String {
        match (&self.first_name, &self.last_name) {
            (Some(first), Some(last)) => format!("{first} {last}"),
            _ => self.username.clone(),
        }
    }

    /// Whether the identity holds the `admin` role.
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

// ============================================================================
// Event
// ============================================================================

/// An organizer-owned event with a capacity and lifecycle status.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    /// Event identifier
    pub id: EventId,
    /// Title
    pub title: String,
    /// Long-form description
    pub description: String,
    /// Venue or online location
    pub location: String,
    /// When the event starts
    pub starts_at: DateTime<Utc>,
    /// Optional last moment registrations are accepted
    pub registration_deadline: Option<DateTime<Utc>>,
    /// Maximum active registrations
    pub capacity: Capacity,
    /// Optional category label (e.g. "workshop")
    pub category: Option<String>,
    /// Owning identity; never changes
    pub creator_id: UserId,
    /// Lifecycle status
    pub status: EventStatus,
    /// When the event was created
    pub created_at: DateTime<Utc>,
    /// When the event was last modified
    pub updated_at: DateTime<Utc>,
}

impl Event {
    /// Builds a new event from a validated draft.
    ///
    /// # Errors
    ///
    /// Returns [`EventHubError::ValidationFailed`] if the draft is invalid.
    pub fn from_draft(
        id: EventId,
        creator_id: UserId,
        draft: EventDraft,
        now: DateTime<Utc>,
    ) -> Result<Self> {
        draft.validate()?;
        validate_schedule(draft.starts_at, draft.registration_deadline)?;
        if draft.starts_at <= now {
            return Err(EventHubError::ValidationFailed(
                "Event date must be in the future".to_string(),
            ));
        }
        Ok(Self {
            id,
            title: draft.title,
            description: draft.description,
            location: draft.location,
            starts_at: draft.starts_at,
            registration_deadline: draft.registration_deadline,
            capacity: draft.capacity,
            category: draft.category,
            creator_id,
            status: draft.status,
            created_at: now,
            updated_at: now,
        })
    }

    /// Whether `user_id` created this event.
    #[must_use]
    pub fn is_owned_by(&self, user_id: UserId) -> bool {
        self.creator_id == user_id
    }

    /// Whether the event starts after `now`.
    #[must_use]
    pub fn is_upcoming(&self, now: DateTime<Utc>) -> bool {
        self.starts_at > now
    }

    /// Whether the registration window is open at `now`.
    ///
    /// Open means: published, before the deadline when one is set, and
    /// before the start.
    #[must_use]
    pub fn accepts_registrations_at(&self, now: DateTime<Utc>) -> bool {
        self.status == EventStatus::Published && self.window_open_at(now)
    }

    /// Time-only part of the registration window check.
    #[must_use]
    pub fn window_open_at(&self, now: DateTime<Utc>) -> bool {
        let before_deadline = self.registration_deadline.is_none_or(|deadline| now < deadline);
        before_deadline && now < self.starts_at
    }

    /// Applies the field changes of a patch. Status is left alone; the roster
    /// reducer validates and applies transitions.
    pub fn apply_fields(&mut self, patch: &EventPatch) {
        if let Some(title) = &patch.title {
            self.title.clone_from(title);
        }
        if let Some(description) = &patch.description {
            self.description.clone_from(description);
        }
        if let Some(location) = &patch.location {
            self.location.clone_from(location);
        }
        if let Some(starts_at) = patch.starts_at {
            self.starts_at = starts_at;
        }
        if let Some(deadline) = patch.registration_deadline {
            self.registration_deadline = deadline;
        }
        if let Some(capacity) = patch.capacity {
            self.capacity = capacity;
        }
        if let Some(category) = &patch.category {
            self.category.clone_from(category);
        }
    }
}

/// Fields supplied when creating an event.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventDraft {
    /// Title (1..=200 chars)
    pub title: String,
    /// Description (at least 20 chars)
    pub description: String,
    /// Location (1..=255 chars)
    pub location: String,
    /// Start time
    pub starts_at: DateTime<Utc>,
    /// Optional registration deadline
    pub registration_deadline: Option<DateTime<Utc>>,
    /// Capacity
    pub capacity: Capacity,
    /// Optional category (at most 50 chars)
    pub category: Option<String>,
    /// Initial status; `draft` or `published`
    pub status: EventStatus,
}

/// Maximum title length.
pub const MAX_TITLE_LEN: usize = 200;
/// Minimum description length.
pub const MIN_DESCRIPTION_LEN: usize = 20;
/// Maximum location length.
pub const MAX_LOCATION_LEN: usize = 255;
/// Maximum category length.
pub const MAX_CATEGORY_LEN: usize = 50;

impl EventDraft {
    /// Validates field-level constraints.
    ///
    /// # Errors
    ///
    /// Returns [`EventHubError::ValidationFailed`] describing the first
    /// violated constraint.
    pub fn validate(&self) -> Result<()> {
        validate_title(&self.title)?;
        validate_description(&self.description)?;
        validate_location(&self.location)?;
        validate_category(self.category.as_deref())?;
        if self.status == EventStatus::Cancelled {
            return Err(EventHubError::ValidationFailed(
                "An event cannot be created in cancelled status".to_string(),
            ));
        }
        Ok(())
    }
}

/// Partial update of an event. `None` leaves a field unchanged.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventPatch {
    /// New title
    pub title: Option<String>,
    /// New description
    pub description: Option<String>,
    /// New location
    pub location: Option<String>,
    /// New start time
    pub starts_at: Option<DateTime<Utc>>,
    /// New deadline; `Some(None)` clears it
    pub registration_deadline: Option<Option<DateTime<Utc>>>,
    /// New capacity
    pub capacity: Option<Capacity>,
    /// New category; `Some(None)` clears it
    pub category: Option<Option<String>>,
    /// Requested status transition
    pub status: Option<EventStatus>,
}

impl EventPatch {
    /// Patch that only changes status.
    #[must_use]
    pub fn status(status: EventStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    /// Whether the patch changes nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Validates the fields that are present.
    ///
    /// # Errors
    ///
    /// Returns [`EventHubError::ValidationFailed`] on the first invalid field
    /// or when the patch is empty.
    pub fn validate(&self) -> Result<()> {
        if self.is_empty() {
            return Err(EventHubError::ValidationFailed(
                "No fields to update".to_string(),
            ));
        }
        if let Some(title) = &self.title {
            validate_title(title)?;
        }
        if let Some(description) = &self.description {
            validate_description(description)?;
        }
        if let Some(location) = &self.location {
            validate_location(location)?;
        }
        if let Some(category) = &self.category {
            validate_category(category.as_deref())?;
        }
        Ok(())
    }

    /// Checks the schedule the patch would produce on `current`.
    ///
    /// A new start must lie after `now`; the resulting deadline, if any,
    /// must precede the resulting start.
    ///
    /// # Errors
    ///
    /// Returns [`EventHubError::ValidationFailed`] if either rule fails.
    pub fn validate_schedule(&self, current: &Event, now: DateTime<Utc>) -> Result<()> {
        if self.starts_at.is_none() && self.registration_deadline.is_none() {
            return Ok(());
        }
        if self.starts_at.is_some_and(|starts_at| starts_at <= now) {
            return Err(EventHubError::ValidationFailed(
                "Event date must be in the future".to_string(),
            ));
        }
        validate_schedule(
            self.starts_at.unwrap_or(current.starts_at),
            self.registration_deadline
                .unwrap_or(current.registration_deadline),
        )
    }

    /// Whether applying this patch to `current` leaves the registration
    /// deadline at or after the start. Patches that leave both schedule
    /// fields alone never conflict.
    #[must_use]
    pub fn breaks_schedule(&self, current: &Event) -> bool {
        if self.starts_at.is_none() && self.registration_deadline.is_none() {
            return false;
        }
        validate_schedule(
            self.starts_at.unwrap_or(current.starts_at),
            self.registration_deadline
                .unwrap_or(current.registration_deadline),
        )
        .is_err()
    }
}

fn validate_schedule(
    starts_at: DateTime<Utc>,
    registration_deadline: Option<DateTime<Utc>>,
) -> Result<()> {
    if registration_deadline.is_some_and(|deadline| deadline >= starts_at) {
        return Err(EventHubError::ValidationFailed(
            "Registration deadline must be before the event date".to_string(),
        ));
    }
    Ok(())
}

fn validate_title(title: &str) -> Result<()> {
    let len = title.trim().chars().count();
    if len == 0 {
        return Err(EventHubError::ValidationFailed(
            "Title is required".to_string(),
        ));
    }
    if len > MAX_TITLE_LEN {
        return Err(EventHubError::ValidationFailed(format!(
            "Title too long: {len} characters (max {MAX_TITLE_LEN})"
        )));
    }
    Ok(())
}

fn validate_description(description: &str) -> Result<()> {
    let len = description.trim().chars().count();
    if len < MIN_DESCRIPTION_LEN {
        return Err(EventHubError::ValidationFailed(format!(
            "Description must be at least {MIN_DESCRIPTION_LEN} characters"
        )));
    }
    Ok(())
}

fn validate_location(location: &str) -> Result<()> {
    let len = location.trim().chars().count();
    if len == 0 {
        return Err(EventHubError::ValidationFailed(
            "Location is required".to_string(),
        ));
    }
    if len > MAX_LOCATION_LEN {
        return Err(EventHubError::ValidationFailed(format!(
            "Location too long: {len} characters (max {MAX_LOCATION_LEN})"
        )));
    }
    Ok(())
}

fn validate_category(category: Option<&str>) -> Result<()> {
    if let Some(category) = category {
        if category.chars().count() > MAX_CATEGORY_LEN {
            return Err(EventHubError::ValidationFailed(format!(
                "Category too long (max {MAX_CATEGORY_LEN})"
            )));
        }
    }
    Ok(())
}

// ============================================================================
// Registration
// ============================================================================

/// A record linking an identity to an event.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registration {
    /// Registration identifier
    pub id: RegistrationId,
    /// Registered identity
    pub user_id: UserId,
    /// Target event
    pub event_id: EventId,
    /// Current status
    pub status: RegistrationStatus,
    /// When this active period began
    pub registered_at: DateTime<Utc>,
    /// When the registration was cancelled, if it was
    pub cancelled_at: Option<DateTime<Utc>>,
}

impl Registration {
    /// Opens a new active registration.
    #[must_use]
    pub fn open(user_id: UserId, event_id: EventId, now: DateTime<Utc>) -> Self {
        Self {
            id: RegistrationId::new(),
            user_id,
            event_id,
            status: RegistrationStatus::Registered,
            registered_at: now,
            cancelled_at: None,
        }
    }

    /// Whether the registration currently holds a seat.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.status == RegistrationStatus::Registered
    }
}

// ============================================================================
// Pagination
// ============================================================================

/// Default page size for listings.
pub const DEFAULT_PER_PAGE: u32 = 10;

/// A 1-based page request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    /// Page number, starting at 1
    pub page: u32,
    /// Items per page
    pub per_page: u32,
}

impl PageRequest {
    /// Creates a page request; zero values are bumped to 1.
    #[must_use]
    pub const fn new(page: u32, per_page: u32) -> Self {
        Self {
            page: if page == 0 { 1 } else { page },
            per_page: if per_page == 0 { 1 } else { per_page },
        }
    }

    /// First page with the default page size.
    #[must_use]
    pub const fn first() -> Self {
        Self::new(1, DEFAULT_PER_PAGE)
    }

    /// Number of rows to skip. Page 0 reads as the first page.
    #[must_use]
    pub fn offset(&self) -> u64 {
        u64::from(self.page).saturating_sub(1) * self.limit()
    }

    /// Number of rows to return, at least 1.
    #[must_use]
    pub fn limit(&self) -> u64 {
        u64::from(self.per_page.max(1))
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::first()
    }
}

/// One page of results plus the total match count.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page<T> {
    /// Items on this page
    pub items: Vec<T>,
    /// Total matches across all pages
    pub total: u64,
    /// Page number, starting at 1
    pub page: u32,
    /// Page size used
    pub per_page: u32,
}

impl<T> Page<T> {
    /// Slices an already filtered and ordered collection into a page.
    #[must_use]
    pub fn from_vec(all: Vec<T>, request: PageRequest) -> Self {
        let total = all.len() as u64;
        let skip = usize::try_from(request.offset()).unwrap_or(usize::MAX);
        let take = usize::try_from(request.limit()).unwrap_or(usize::MAX);
        Self {
            items: all.into_iter().skip(skip).take(take).collect(),
            total,
            page: request.page,
            per_page: request.per_page,
        }
    }

    /// Total number of pages (at least 1).
    #[must_use]
    pub fn total_pages(&self) -> u64 {
        self.total.div_ceil(u64::from(self.per_page.max(1))).max(1)
    }

    /// Whether a following page exists.
    #[must_use]
    pub fn has_next(&self) -> bool {
        u64::from(self.page) < self.total_pages()
    }

    /// Whether a preceding page exists.
    #[must_use]
    pub const fn has_prev(&self) -> bool {
        self.page > 1
    }

    /// Maps the items, keeping pagination metadata.
    #[must_use]
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            page: self.page,
            per_page: self.per_page,
        }
    }
}

// ============================================================================
// Filters
// ============================================================================

/// Sort order for event listings.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventOrder {
    /// Soonest first
    #[default]
    StartsAtAsc,
    /// Newest first
    CreatedAtDesc,
}

/// Criteria for listing events. Unset fields do not filter.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventFilter {
    /// Exact status
    pub status: Option<EventStatus>,
    /// Exact creator
    pub creator_id: Option<UserId>,
    /// Exact category
    pub category: Option<String>,
    /// Case-insensitive substring of title or description
    pub search: Option<String>,
    /// Case-insensitive substring of location
    pub location: Option<String>,
    /// Strictly after this instant
    pub starts_after: Option<DateTime<Utc>>,
    /// At or after this instant
    pub starts_from: Option<DateTime<Utc>>,
    /// At or before this instant
    pub starts_until: Option<DateTime<Utc>>,
    /// Sort order
    pub order: EventOrder,
}

impl EventFilter {
    /// Published events starting after `now`, soonest first.
    #[must_use]
    pub fn upcoming(now: DateTime<Utc>) -> Self {
        Self {
            status: Some(EventStatus::Published),
            starts_after: Some(now),
            ..Self::default()
        }
    }

    /// Whether `event` satisfies every set criterion.
    #[must_use]
    pub fn matches(&self, event: &Event) -> bool {
        self.status.is_none_or(|status| event.status == status)
            && self.creator_id.is_none_or(|creator| event.creator_id == creator)
            && self
                .category
                .as_deref()
                .is_none_or(|category| event.category.as_deref() == Some(category))
            && self.search.as_deref().is_none_or(|needle| {
                contains_ci(&event.title, needle) || contains_ci(&event.description, needle)
            })
            && self
                .location
                .as_deref()
                .is_none_or(|needle| contains_ci(&event.location, needle))
            && self.starts_after.is_none_or(|t| event.starts_at > t)
            && self.starts_from.is_none_or(|t| event.starts_at >= t)
            && self.starts_until.is_none_or(|t| event.starts_at <= t)
    }
}

/// Criteria for listing identities.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityFilter {
    /// Exact role
    pub role: Option<Role>,
    /// Case-insensitive substring of username or email
    pub search: Option<String>,
}

impl IdentityFilter {
    /// Whether `identity` satisfies every set criterion.
    #[must_use]
    pub fn matches(&self, identity: &Identity) -> bool {
        self.role.is_none_or(|role| identity.role == role)
            && self.search.as_deref().is_none_or(|needle| {
                contains_ci(&identity.username, needle) || contains_ci(&identity.email, needle)
            })
    }
}

/// Criteria for listing registrations.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrationFilter {
    /// Exact event
    pub event_id: Option<EventId>,
    /// Exact user
    pub user_id: Option<UserId>,
    /// Exact status
    pub status: Option<RegistrationStatus>,
}

impl RegistrationFilter {
    /// Whether `registration` satisfies every set criterion.
    #[must_use]
    pub fn matches(&self, registration: &Registration) -> bool {
        self.event_id.is_none_or(|id| registration.event_id == id)
            && self.user_id.is_none_or(|id| registration.user_id == id)
            && self.status.is_none_or(|status| registration.status == status)
    }
}

fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}
