//! Identity Store on `PostgreSQL`.

use crate::{IDENTITY_COLUMNS, PostgresStore, count, identity_from_row, like_pattern, storage, write_error};
use eventhub_core::store::IdentityStore;
use eventhub_core::types::{Identity, IdentityFilter, Page, PageRequest, UserId};
use eventhub_core::{EventHubError, Result};

const IDENTITY_FILTER: &str = r"
    ($1::text IS NULL OR role = $1)
    AND ($2::text IS NULL OR username ILIKE $2 OR email ILIKE $2)
";

impl IdentityStore for PostgresStore {
    async fn insert_identity(&self, identity: Identity) -> Result<Identity> {
        sqlx::query(
            r"
            INSERT INTO identities (
                id, username, email, password_hash, first_name, last_name,
                role, is_active, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            ",
        )
        .bind(identity.id.as_uuid())
        .bind(&identity.username)
        .bind(&identity.email)
        .bind(&identity.password_hash)
        .bind(&identity.first_name)
        .bind(&identity.last_name)
        .bind(identity.role.as_str())
        .bind(identity.is_active)
        .bind(identity.created_at)
        .bind(identity.updated_at)
        .execute(&self.pool)
        .await
        .map_err(write_error("Failed to insert identity"))?;

        tracing::debug!(user_id = %identity.id, username = %identity.username, "Identity inserted");
        Ok(identity)
    }

    async fn find_identity(&self, id: UserId) -> Result<Option<Identity>> {
        let sql = format!(
            "SELECT {} FROM identities WHERE id = $1",
            IDENTITY_COLUMNS.join(", ")
        );
        let row = sqlx::query(&sql)
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(storage("Failed to load identity"))?;

        row.as_ref().map(|row| identity_from_row(row, "")).transpose()
    }

    async fn find_identity_by_login(&self, login: &str) -> Result<Option<Identity>> {
        let sql = format!(
            "SELECT {} FROM identities WHERE username = $1 OR email = $1 ORDER BY email = $1 DESC LIMIT 1",
            IDENTITY_COLUMNS.join(", ")
        );
        let row = sqlx::query(&sql)
            .bind(login)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage("Failed to load identity by login"))?;

        row.as_ref().map(|row| identity_from_row(row, "")).transpose()
    }

    async fn update_identity(&self, identity: &Identity) -> Result<()> {
        let result = sqlx::query(
            r"
            UPDATE identities
            SET username = $2, email = $3, password_hash = $4, first_name = $5,
                last_name = $6, role = $7, is_active = $8, updated_at = $9
            WHERE id = $1
            ",
        )
        .bind(identity.id.as_uuid())
        .bind(&identity.username)
        .bind(&identity.email)
        .bind(&identity.password_hash)
        .bind(&identity.first_name)
        .bind(&identity.last_name)
        .bind(identity.role.as_str())
        .bind(identity.is_active)
        .bind(identity.updated_at)
        .execute(&self.pool)
        .await
        .map_err(write_error("Failed to update identity"))?;

        if result.rows_affected() == 0 {
            return Err(EventHubError::identity_not_found(identity.id));
        }
        Ok(())
    }

    async fn delete_identity(&self, id: UserId) -> Result<()> {
        let result = sqlx::query("DELETE FROM identities WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(storage("Failed to delete identity"))?;

        if result.rows_affected() == 0 {
            return Err(EventHubError::identity_not_found(id));
        }
        tracing::debug!(user_id = %id, "Identity deleted with dependents");
        Ok(())
    }

    #[allow(clippy::cast_possible_wrap)] // Page sizes are small
    async fn list_identities(
        &self,
        filter: &IdentityFilter,
        page: PageRequest,
    ) -> Result<Page<Identity>> {
        let role = filter.role.map(|role| role.as_str());
        let search = filter.search.as_deref().map(like_pattern);

        let (total,): (i64,) =
            sqlx::query_as(&format!("SELECT COUNT(*) FROM identities WHERE {IDENTITY_FILTER}"))
                .bind(role)
                .bind(search.as_deref())
                .fetch_one(&self.pool)
                .await
                .map_err(storage("Failed to count identities"))?;

        let sql = format!(
            "SELECT {} FROM identities WHERE {IDENTITY_FILTER} \
             ORDER BY created_at DESC, id LIMIT $3 OFFSET $4",
            IDENTITY_COLUMNS.join(", ")
        );
        let rows = sqlx::query(&sql)
            .bind(role)
            .bind(search.as_deref())
            .bind(page.limit() as i64)
            .bind(page.offset() as i64)
            .fetch_all(&self.pool)
            .await
            .map_err(storage("Failed to list identities"))?;

        let items = rows
            .iter()
            .map(|row| identity_from_row(row, ""))
            .collect::<Result<Vec<_>>>()?;

        Ok(Page {
            items,
            total: count(total),
            page: page.page,
            per_page: page.per_page,
        })
    }
}
