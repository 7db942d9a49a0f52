//! Aggregate statistics on `PostgreSQL`.

use crate::{PostgresStore, count, storage};
use chrono::{DateTime, Utc};
use eventhub_core::Result;
use eventhub_core::report::{
    CategoryCount, EventStatistics, RegistrationStatistics, RoleCounts, StatusCounts,
    SystemStatistics, UserStatistics, fill_months, window_start,
};
use eventhub_core::store::ReportStore;
use sqlx::Row;

impl ReportStore for PostgresStore {
    async fn statistics(&self, now: DateTime<Utc>) -> Result<SystemStatistics> {
        let row = sqlx::query(
            r"
            SELECT
                COUNT(*) AS total,
                COUNT(*) FILTER (WHERE is_active) AS active,
                COUNT(*) FILTER (WHERE role = 'user') AS users,
                COUNT(*) FILTER (WHERE role = 'organizer') AS organizers,
                COUNT(*) FILTER (WHERE role = 'admin') AS admins
            FROM identities
            ",
        )
        .fetch_one(&self.pool)
        .await
        .map_err(storage("Failed to compute identity statistics"))?;
        let get = |row: &sqlx::postgres::PgRow, column: &str| -> Result<u64> {
            row.try_get::<i64, _>(column)
                .map(count)
                .map_err(crate::decode)
        };
        let users = UserStatistics {
            total: get(&row, "total")?,
            active: get(&row, "active")?,
            by_role: RoleCounts {
                user: get(&row, "users")?,
                organizer: get(&row, "organizers")?,
                admin: get(&row, "admins")?,
            },
        };

        let row = sqlx::query(
            r"
            SELECT
                COUNT(*) AS total,
                COUNT(*) FILTER (WHERE starts_at > $1) AS upcoming,
                COUNT(*) FILTER (WHERE status = 'draft') AS draft,
                COUNT(*) FILTER (WHERE status = 'published') AS published,
                COUNT(*) FILTER (WHERE status = 'cancelled') AS cancelled
            FROM events
            ",
        )
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(storage("Failed to compute event statistics"))?;
        let total = get(&row, "total")?;
        let upcoming = get(&row, "upcoming")?;
        let by_status = StatusCounts {
            draft: get(&row, "draft")?,
            published: get(&row, "published")?,
            cancelled: get(&row, "cancelled")?,
        };

        let categories: Vec<(String, i64)> = sqlx::query_as(
            r"
            SELECT category, COUNT(*)
            FROM events
            WHERE category IS NOT NULL
            GROUP BY category
            ORDER BY COUNT(*) DESC, category
            ",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(storage("Failed to compute category breakdown"))?;

        let events = EventStatistics {
            total,
            upcoming,
            past: total.saturating_sub(upcoming),
            by_status,
            by_category: categories
                .into_iter()
                .map(|(category, n)| CategoryCount {
                    category,
                    count: count(n),
                })
                .collect(),
        };

        let row = sqlx::query(
            r"
            SELECT
                COUNT(*) AS total,
                COUNT(*) FILTER (WHERE status = 'registered') AS active,
                COUNT(*) FILTER (WHERE status = 'cancelled') AS cancelled
            FROM registrations
            ",
        )
        .fetch_one(&self.pool)
        .await
        .map_err(storage("Failed to compute registration statistics"))?;

        let monthly: Vec<(i32, i32, i64)> = sqlx::query_as(
            r"
            SELECT
                EXTRACT(YEAR FROM registered_at AT TIME ZONE 'UTC')::INT AS year,
                EXTRACT(MONTH FROM registered_at AT TIME ZONE 'UTC')::INT AS month,
                COUNT(*)
            FROM registrations
            WHERE registered_at >= $1
            GROUP BY 1, 2
            ",
        )
        .bind(window_start(now))
        .fetch_all(&self.pool)
        .await
        .map_err(storage("Failed to compute monthly registrations"))?;
        let monthly: Vec<(i32, u32, u64)> = monthly
            .into_iter()
            .map(|(year, month, n)| (year, u32::try_from(month).unwrap_or(0), count(n)))
            .collect();

        let registrations = RegistrationStatistics {
            total: get(&row, "total")?,
            active: get(&row, "active")?,
            cancelled: get(&row, "cancelled")?,
            monthly: fill_months(now, &monthly),
        };

        Ok(SystemStatistics {
            users,
            events,
            registrations,
        })
    }
}
