//! Event Store on `PostgreSQL`.

use crate::{
    EVENT_COLUMNS, PostgresStore, capacity_param, count, event_from_row, like_pattern,
    reference_error, storage,
};
use eventhub_core::store::EventCatalog;
use eventhub_core::types::{Event, EventFilter, EventId, EventOrder, Page, PageRequest};
use eventhub_core::{EventHubError, Result};

const EVENT_FILTER: &str = r"
    ($1::text IS NULL OR status = $1)
    AND ($2::uuid IS NULL OR creator_id = $2)
    AND ($3::text IS NULL OR category = $3)
    AND ($4::text IS NULL OR title ILIKE $4 OR description ILIKE $4)
    AND ($5::text IS NULL OR location ILIKE $5)
    AND ($6::timestamptz IS NULL OR starts_at > $6)
    AND ($7::timestamptz IS NULL OR starts_at >= $7)
    AND ($8::timestamptz IS NULL OR starts_at <= $8)
";

const fn order_clause(order: EventOrder) -> &'static str {
    match order {
        EventOrder::StartsAtAsc => "starts_at ASC, id",
        EventOrder::CreatedAtDesc => "created_at DESC, id",
    }
}

impl EventCatalog for PostgresStore {
    async fn insert_event(&self, event: Event) -> Result<Event> {
        sqlx::query(
            r"
            INSERT INTO events (
                id, title, description, location, starts_at, registration_deadline,
                capacity, category, creator_id, status, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
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
        .bind(event.creator_id.as_uuid())
        .bind(event.status.as_str())
        .bind(event.created_at)
        .bind(event.updated_at)
        .execute(&self.pool)
        .await
        .map_err(reference_error(
            "Failed to insert event",
            EventHubError::identity_not_found(event.creator_id),
        ))?;

        tracing::debug!(event_id = %event.id, creator_id = %event.creator_id, "Event inserted");
        Ok(event)
    }

    async fn find_event(&self, id: EventId) -> Result<Option<Event>> {
        let sql = format!(
            "SELECT {} FROM events WHERE id = $1",
            EVENT_COLUMNS.join(", ")
        );
        let row = sqlx::query(&sql)
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(storage("Failed to load event"))?;

        row.as_ref().map(|row| event_from_row(row, "")).transpose()
    }

    async fn delete_event(&self, id: EventId) -> Result<()> {
        let result = sqlx::query("DELETE FROM events WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(storage("Failed to delete event"))?;

        if result.rows_affected() == 0 {
            return Err(EventHubError::event_not_found(id));
        }
        Ok(())
    }

    #[allow(clippy::cast_possible_wrap)] // Page sizes are small
    async fn list_events(&self, filter: &EventFilter, page: PageRequest) -> Result<Page<Event>> {
        let status = filter.status.map(|status| status.as_str());
        let creator = filter.creator_id.map(|id| *id.as_uuid());
        let search = filter.search.as_deref().map(like_pattern);
        let location = filter.location.as_deref().map(like_pattern);

        let (total,): (i64,) =
            sqlx::query_as(&format!("SELECT COUNT(*) FROM events WHERE {EVENT_FILTER}"))
                .bind(status)
                .bind(creator)
                .bind(filter.category.as_deref())
                .bind(search.as_deref())
                .bind(location.as_deref())
                .bind(filter.starts_after)
                .bind(filter.starts_from)
                .bind(filter.starts_until)
                .fetch_one(&self.pool)
                .await
                .map_err(storage("Failed to count events"))?;

        let sql = format!(
            "SELECT {} FROM events WHERE {EVENT_FILTER} ORDER BY {} LIMIT $9 OFFSET $10",
            EVENT_COLUMNS.join(", "),
            order_clause(filter.order)
        );
        let rows = sqlx::query(&sql)
            .bind(status)
            .bind(creator)
            .bind(filter.category.as_deref())
            .bind(search.as_deref())
            .bind(location.as_deref())
            .bind(filter.starts_after)
            .bind(filter.starts_from)
            .bind(filter.starts_until)
            .bind(page.limit() as i64)
            .bind(page.offset() as i64)
            .fetch_all(&self.pool)
            .await
            .map_err(storage("Failed to list events"))?;

        let items = rows
            .iter()
            .map(|row| event_from_row(row, ""))
            .collect::<Result<Vec<_>>>()?;

        Ok(Page {
            items,
            total: count(total),
            page: page.page,
            per_page: page.per_page,
        })
    }
}
