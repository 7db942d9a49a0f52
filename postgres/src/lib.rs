//! `PostgreSQL` store for EventHub.
//!
//! [`PostgresStore`] implements every store trait from `eventhub-core` on a
//! sqlx connection pool:
//!
//! - Identities, events and registrations in three tables with
//!   `ON DELETE CASCADE` foreign keys
//! - Roster mutations inside one transaction holding `SELECT … FOR UPDATE` on
//!   the event row
//! - A partial unique index guaranteeing one active registration per
//!   (user, event)
//! - Embedded migrations via `sqlx::migrate!`
//!
//! # Example
//!
//! ```no_run
//! use eventhub_postgres::PostgresStore;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = PostgresStore::new("postgres://localhost/eventhub").await?;
//! store.migrate().await?;
//! # Ok(())
//! # }
//! ```

use eventhub_core::environment::{Clock, SystemClock};
use eventhub_core::roster::RosterEnvironment;
use eventhub_core::types::{
    Capacity, Event, EventId, Identity, Registration, RegistrationId, UserId,
};
use eventhub_core::{ConflictReason, EventHubError, Result};
use sqlx::postgres::{PgPool, PgRow};
use sqlx::Row;
use std::sync::Arc;

mod events;
mod identities;
mod registrations;
mod reports;

/// `PostgreSQL`-backed implementation of the EventHub store traits.
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
    env: RosterEnvironment,
}

impl PostgresStore {
    /// Connect to `database_url` with default pool settings.
    ///
    /// # Errors
    ///
    /// Returns [`EventHubError::Storage`] if the connection fails.
    pub async fn new(database_url: &str) -> Result<Self> {
        let pool = PgPool::connect(database_url)
            .await
            .map_err(|e| EventHubError::Storage(format!("Failed to connect: {e}")))?;
        Ok(Self::from_pool(pool))
    }

    /// Wrap an existing pool. Roster timestamps use the system clock.
    #[must_use]
    pub fn from_pool(pool: PgPool) -> Self {
        Self::with_clock(pool, Arc::new(SystemClock))
    }

    /// Wrap an existing pool with a custom clock for roster timestamps.
    #[must_use]
    pub fn with_clock(pool: PgPool, clock: Arc<dyn Clock>) -> Self {
        Self {
            pool,
            env: RosterEnvironment::new(clock),
        }
    }

    /// The underlying pool.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Run the embedded migrations.
    ///
    /// # Errors
    ///
    /// Returns [`EventHubError::Storage`] if a migration fails.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| EventHubError::Storage(format!("Migration failed: {e}")))?;
        tracing::info!("Database migrations applied");
        Ok(())
    }
}

impl std::fmt::Debug for PostgresStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PostgresStore")
            .field("pool", &self.pool)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Error mapping
// ============================================================================

/// Maps a sqlx error to a storage error with context.
fn storage(context: &'static str) -> impl FnOnce(sqlx::Error) -> EventHubError {
    move |e| EventHubError::Storage(format!("{context}: {e}"))
}

/// Maps a write error, translating constraint violations into domain errors.
fn write_error(context: &'static str) -> impl FnOnce(sqlx::Error) -> EventHubError {
    move |e| {
        if let sqlx::Error::Database(db) = &e {
            if db.is_unique_violation() {
                match db.constraint() {
                    Some("identities_username_key") => {
                        return EventHubError::Conflict(ConflictReason::UsernameTaken);
                    }
                    Some("identities_email_key") => {
                        return EventHubError::Conflict(ConflictReason::EmailTaken);
                    }
                    Some("registrations_one_active") => {
                        return EventHubError::Conflict(ConflictReason::DuplicateRegistration);
                    }
                    _ => {}
                }
            }
        }
        EventHubError::Storage(format!("{context}: {e}"))
    }
}

/// Like [`write_error`], but a foreign key violation becomes `missing`.
fn reference_error(
    context: &'static str,
    missing: EventHubError,
) -> impl FnOnce(sqlx::Error) -> EventHubError {
    move |e| {
        if let sqlx::Error::Database(db) = &e {
            if db.is_foreign_key_violation() {
                return missing;
            }
        }
        write_error(context)(e)
    }
}

fn decode(e: sqlx::Error) -> EventHubError {
    EventHubError::Storage(format!("Failed to decode row: {e}"))
}

fn count(value: i64) -> u64 {
    u64::try_from(value).unwrap_or(0)
}

/// `%needle%` for ILIKE, with LIKE wildcards in the input escaped.
fn like_pattern(needle: &str) -> String {
    let escaped = needle
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

// ============================================================================
// Row decoding
// ============================================================================

const IDENTITY_COLUMNS: &[&str] = &[
    "id",
    "username",
    "email",
    "password_hash",
    "first_name",
    "last_name",
    "role",
    "is_active",
    "created_at",
    "updated_at",
];

const EVENT_COLUMNS: &[&str] = &[
    "id",
    "title",
    "description",
    "location",
    "starts_at",
    "registration_deadline",
    "capacity",
    "category",
    "creator_id",
    "status",
    "created_at",
    "updated_at",
];

const REGISTRATION_COLUMNS: &[&str] = &[
    "id",
    "user_id",
    "event_id",
    "status",
    "registered_at",
    "cancelled_at",
];

/// `a.col AS pcol, …` for joined selects.
fn select_list(alias: &str, prefix: &str, columns: &[&str]) -> String {
    columns
        .iter()
        .map(|column| format!("{alias}.{column} AS {prefix}{column}"))
        .collect::<Vec<_>>()
        .join(", ")
}

fn get<'r, T>(row: &'r PgRow, prefix: &str, column: &str) -> Result<T>
where
    T: sqlx::Decode<'r, sqlx::Postgres> + sqlx::Type<sqlx::Postgres>,
{
    row.try_get(format!("{prefix}{column}").as_str())
        .map_err(decode)
}

fn identity_from_row(row: &PgRow, prefix: &str) -> Result<Identity> {
    let role: String = get(row, prefix, "role")?;
    Ok(Identity {
        id: UserId::from_uuid(get(row, prefix, "id")?),
        username: get(row, prefix, "username")?,
        email: get(row, prefix, "email")?,
        password_hash: get(row, prefix, "password_hash")?,
        first_name: get(row, prefix, "first_name")?,
        last_name: get(row, prefix, "last_name")?,
        role: role.parse()?,
        is_active: get(row, prefix, "is_active")?,
        created_at: get(row, prefix, "created_at")?,
        updated_at: get(row, prefix, "updated_at")?,
    })
}

fn event_from_row(row: &PgRow, prefix: &str) -> Result<Event> {
    let status: String = get(row, prefix, "status")?;
    let capacity: i32 = get(row, prefix, "capacity")?;
    let capacity = u32::try_from(capacity)
        .map_err(|_| EventHubError::Storage(format!("Invalid capacity in row: {capacity}")))?;
    Ok(Event {
        id: EventId::from_uuid(get(row, prefix, "id")?),
        title: get(row, prefix, "title")?,
        description: get(row, prefix, "description")?,
        location: get(row, prefix, "location")?,
        starts_at: get(row, prefix, "starts_at")?,
        registration_deadline: get(row, prefix, "registration_deadline")?,
        capacity: Capacity::new(capacity)?,
        category: get(row, prefix, "category")?,
        creator_id: UserId::from_uuid(get(row, prefix, "creator_id")?),
        status: status.parse()?,
        created_at: get(row, prefix, "created_at")?,
        updated_at: get(row, prefix, "updated_at")?,
    })
}

fn registration_from_row(row: &PgRow, prefix: &str) -> Result<Registration> {
    let status: String = get(row, prefix, "status")?;
    Ok(Registration {
        id: RegistrationId::from_uuid(get(row, prefix, "id")?),
        user_id: UserId::from_uuid(get(row, prefix, "user_id")?),
        event_id: EventId::from_uuid(get(row, prefix, "event_id")?),
        status: status.parse()?,
        registered_at: get(row, prefix, "registered_at")?,
        cancelled_at: get(row, prefix, "cancelled_at")?,
    })
}

fn capacity_param(capacity: Capacity) -> Result<i32> {
    i32::try_from(capacity.value()).map_err(|_| {
        EventHubError::ValidationFailed(format!("Capacity {capacity} exceeds i32::MAX"))
    })
}
