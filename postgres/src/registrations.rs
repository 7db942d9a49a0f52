//! Registration Ledger and roster dispatch on `PostgreSQL`.

use crate::{
    EVENT_COLUMNS, IDENTITY_COLUMNS, PostgresStore, REGISTRATION_COLUMNS, capacity_param, count,
    event_from_row, identity_from_row, reference_error, registration_from_row, select_list,
    storage,
};
use eventhub_core::authorization::Principal;
use eventhub_core::roster::{self, EventRoster, RosterAction, RosterEffect};
use eventhub_core::store::RosterStore;
use eventhub_core::types::{
    Event, EventId, Identity, Page, PageRequest, Registration, RegistrationFilter, UserId,
};
use eventhub_core::{EventHubError, Result, SmallVec};
use sqlx::{Postgres, Transaction};

const REGISTRATION_FILTER: &str = r"
    ($1::uuid IS NULL OR event_id = $1)
    AND ($2::uuid IS NULL OR user_id = $2)
    AND ($3::text IS NULL OR status = $3)
";

impl PostgresStore {
    /// Lock the event row and load its roster inside `tx`.
    async fn lock_roster(
        tx: &mut Transaction<'_, Postgres>,
        event_id: EventId,
    ) -> Result<Option<EventRoster>> {
        let sql = format!(
            "SELECT {} FROM events WHERE id = $1 FOR UPDATE",
            EVENT_COLUMNS.join(", ")
        );
        let Some(row) = sqlx::query(&sql)
            .bind(event_id.as_uuid())
            .fetch_optional(&mut **tx)
            .await
            .map_err(storage("Failed to lock event"))?
        else {
            return Ok(None);
        };
        let event = event_from_row(&row, "")?;

        let sql = format!(
            "SELECT {} FROM registrations WHERE event_id = $1 AND status = 'registered'",
            REGISTRATION_COLUMNS.join(", ")
        );
        let active = sqlx::query(&sql)
            .bind(event_id.as_uuid())
            .fetch_all(&mut **tx)
            .await
            .map_err(storage("Failed to load registrations"))?
            .iter()
            .map(|row| registration_from_row(row, ""))
            .collect::<Result<Vec<_>>>()?;

        Ok(Some(EventRoster::new(event, active)))
    }

    async fn identity_exists(tx: &mut Transaction<'_, Postgres>, user_id: UserId) -> Result<bool> {
        let (exists,): (bool,) =
            sqlx::query_as("SELECT EXISTS (SELECT 1 FROM identities WHERE id = $1)")
                .bind(user_id.as_uuid())
                .fetch_one(&mut **tx)
                .await
                .map_err(storage("Failed to look up identity"))?;
        Ok(exists)
    }

    /// Roll back `tx`, logging a failure instead of masking the caller's error.
    async fn abandon(tx: Transaction<'_, Postgres>, event_id: EventId) {
        if let Err(e) = tx.rollback().await {
            tracing::warn!(%event_id, error = %e, "Failed to roll back roster transaction");
        }
    }

    /// Persist one roster effect inside `tx`.
    async fn persist(tx: &mut Transaction<'_, Postgres>, effect: &RosterEffect) -> Result<()> {
        match effect {
            RosterEffect::Registered(registration) => {
                sqlx::query(
                    r"
                    INSERT INTO registrations (id, user_id, event_id, status, registered_at, cancelled_at)
                    VALUES ($1, $2, $3, $4, $5, $6)
                    ",
                )
                .bind(registration.id.as_uuid())
                .bind(registration.user_id.as_uuid())
                .bind(registration.event_id.as_uuid())
                .bind(registration.status.as_str())
                .bind(registration.registered_at)
                .bind(registration.cancelled_at)
                .execute(&mut **tx)
                .await
                .map_err(reference_error(
                    "Failed to insert registration",
                    EventHubError::identity_not_found(registration.user_id),
                ))?;
            }
            RosterEffect::Cancelled(registration) => {
                sqlx::query(
                    r"
                    UPDATE registrations SET status = $2, cancelled_at = $3
                    WHERE id = $1
                    ",
                )
                .bind(registration.id.as_uuid())
                .bind(registration.status.as_str())
                .bind(registration.cancelled_at)
                .execute(&mut **tx)
                .await
                .map_err(storage("Failed to cancel registration"))?;
            }
            RosterEffect::Amended(event) => {
                sqlx::query(
                    r"
                    UPDATE events
                    SET title = $2, description = $3, location = $4, starts_at = $5,
                        registration_deadline = $6, capacity = $7, category = $8,
                        status = $9, updated_at = $10
                    WHERE id = $1
                    ",
                )
                .bind(event.id.as_uuid())
                .bind(&event.title)
                .bind(&event.description)
                .bind(&event.location)
                .bind(event.starts_at)
                .bind(event.registration_deadline)
                .bind(capacity_param(event.capacity)?)
                .bind(&event.category)
                .bind(event.status.as_str())
                .bind(event.updated_at)
                .execute(&mut **tx)
                .await
                .map_err(storage("Failed to update event"))?;
            }
        }
        Ok(())
    }
}

impl RosterStore for PostgresStore {
    async fn dispatch(
        &self,
        event_id: EventId,
        action: RosterAction,
    ) -> Result<SmallVec<[RosterEffect; 4]>> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(storage("Failed to start transaction"))?;

        // Serializes every roster mutation for this event until commit.
        let Some(mut state) = Self::lock_roster(&mut tx, event_id).await? else {
            Self::abandon(tx, event_id).await;
            return Err(EventHubError::event_not_found(event_id));
        };

        if let RosterAction::Register {
            principal: Principal::Authenticated(actor),
            ..
        } = &action
        {
            if !Self::identity_exists(&mut tx, actor.id).await? {
                Self::abandon(tx, event_id).await;
                return Err(EventHubError::identity_not_found(actor.id));
            }
        }

        let effects = match roster::decide(&mut state, action, &self.env) {
            Ok(effects) => effects,
            Err(error) => {
                Self::abandon(tx, event_id).await;
                return Err(error);
            }
        };

        for effect in &effects {
            Self::persist(&mut tx, effect).await?;
        }

        tx.commit()
            .await
            .map_err(storage("Failed to commit transaction"))?;

        Ok(effects)
    }

    async fn roster(&self, event_id: EventId) -> Result<Option<EventRoster>> {
        let Some(event) = eventhub_core::store::EventCatalog::find_event(self, event_id).await?
        else {
            return Ok(None);
        };
        let sql = format!(
            "SELECT {} FROM registrations WHERE event_id = $1 AND status = 'registered'",
            REGISTRATION_COLUMNS.join(", ")
        );
        let active = sqlx::query(&sql)
            .bind(event_id.as_uuid())
            .fetch_all(&self.pool)
            .await
            .map_err(storage("Failed to load registrations"))?
            .iter()
            .map(|row| registration_from_row(row, ""))
            .collect::<Result<Vec<_>>>()?;
        Ok(Some(EventRoster::new(event, active)))
    }

    async fn active_count(&self, event_id: EventId) -> Result<u32> {
        let (active,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM registrations WHERE event_id = $1 AND status = 'registered'",
        )
        .bind(event_id.as_uuid())
        .fetch_one(&self.pool)
        .await
        .map_err(storage("Failed to count registrations"))?;

        Ok(u32::try_from(active).unwrap_or(u32::MAX))
    }

    #[allow(clippy::cast_possible_wrap)] // Page sizes are small
    async fn list_registrations(
        &self,
        filter: &RegistrationFilter,
        page: PageRequest,
    ) -> Result<Page<Registration>> {
        let event = filter.event_id.map(|id| *id.as_uuid());
        let user = filter.user_id.map(|id| *id.as_uuid());
        let status = filter.status.map(|status| status.as_str());

        let (total,): (i64,) = sqlx::query_as(&format!(
            "SELECT COUNT(*) FROM registrations WHERE {REGISTRATION_FILTER}"
        ))
        .bind(event)
        .bind(user)
        .bind(status)
        .fetch_one(&self.pool)
        .await
        .map_err(storage("Failed to count registrations"))?;

        let sql = format!(
            "SELECT {} FROM registrations WHERE {REGISTRATION_FILTER} \
             ORDER BY registered_at DESC, id LIMIT $4 OFFSET $5",
            REGISTRATION_COLUMNS.join(", ")
        );
        let rows = sqlx::query(&sql)
            .bind(event)
            .bind(user)
            .bind(status)
            .bind(page.limit() as i64)
            .bind(page.offset() as i64)
            .fetch_all(&self.pool)
            .await
            .map_err(storage("Failed to list registrations"))?;

        let items = rows
            .iter()
            .map(|row| registration_from_row(row, ""))
            .collect::<Result<Vec<_>>>()?;

        Ok(Page {
            items,
            total: count(total),
            page: page.page,
            per_page: page.per_page,
        })
    }

    async fn registered_events(&self, user_id: UserId) -> Result<Vec<(Registration, Event)>> {
        let sql = format!(
            "SELECT {}, {} FROM registrations r JOIN events e ON e.id = r.event_id \
             WHERE r.user_id = $1 AND r.status = 'registered' \
             ORDER BY e.starts_at ASC",
            select_list("r", "r_", REGISTRATION_COLUMNS),
            select_list("e", "e_", EVENT_COLUMNS)
        );
        let rows = sqlx::query(&sql)
            .bind(user_id.as_uuid())
            .fetch_all(&self.pool)
            .await
            .map_err(storage("Failed to load registered events"))?;

        rows.iter()
            .map(|row| Ok((registration_from_row(row, "r_")?, event_from_row(row, "e_")?)))
            .collect()
    }

    async fn attendees(&self, event_id: EventId) -> Result<Vec<(Registration, Identity)>> {
        let sql = format!(
            "SELECT {}, {} FROM registrations r JOIN identities i ON i.id = r.user_id \
             WHERE r.event_id = $1 AND r.status = 'registered' \
             ORDER BY r.registered_at ASC",
            select_list("r", "r_", REGISTRATION_COLUMNS),
            select_list("i", "i_", IDENTITY_COLUMNS)
        );
        let rows = sqlx::query(&sql)
            .bind(event_id.as_uuid())
            .fetch_all(&self.pool)
            .await
            .map_err(storage("Failed to load attendees"))?;

        rows.iter()
            .map(|row| Ok((registration_from_row(row, "r_")?, identity_from_row(row, "i_")?)))
            .collect()
    }
}
