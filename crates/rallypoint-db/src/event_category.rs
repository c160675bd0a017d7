//! Event category store, scoped under an organization.
//!
//! Categories group an organization's events (e.g. "meal prep & delivery").
//! Their refs are unique per organization, so two organizations may each
//! have a category with the same ref.

use rallypoint_types::{EventCategoryIdentifier, EventCategoryInsert, EventCategoryUpdate};
use sqlx::{PgConnection, PgPool};

use crate::error::DbError;
use crate::resolve;

/// Operations on the `event_category` table.
pub struct EventCategoryStore<'a> {
    pool: &'a PgPool,
}

impl<'a> EventCategoryStore<'a> {
    /// Create a new event category store bound to a connection pool.
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Create an event category under its organization.
    ///
    /// The organization identifier in the payload is required and resolved
    /// before the insert; it is never defaulted.
    ///
    /// # Errors
    ///
    /// Returns resolver errors for a bad organization reference, or
    /// [`DbError::Postgres`] if the insert fails (including a duplicate ref
    /// within the organization).
    pub async fn create(
        &self,
        category: &EventCategoryInsert,
    ) -> Result<EventCategoryRow, DbError> {
        let mut conn = self.pool.acquire().await?;
        let id_organization =
            resolve::resolve_organization(&mut conn, &category.organization).await?;

        let row = sqlx::query_as::<_, EventCategoryRow>(
            r"INSERT INTO event_category (id_ref, name, description, id_organization)
              VALUES ($1, $2, $3, $4)
              RETURNING id, id_ref, name, description, id_organization",
        )
        .bind(&category.id_ref)
        .bind(&category.name)
        .bind(&category.description)
        .bind(id_organization)
        .fetch_one(&mut *conn)
        .await?;

        tracing::debug!(id = row.id, id_organization, "Created event category");
        Ok(row)
    }

    /// Fetch an event category by id, or by ref scoped to its organization.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::UnresolvableIdentifier`] when the identifier lacks
    /// both an id and a ref-with-organization.
    pub async fn get(
        &self,
        ident: &EventCategoryIdentifier,
    ) -> Result<Option<EventCategoryRow>, DbError> {
        let mut conn = self.pool.acquire().await?;
        get_on(&mut conn, ident).await
    }

    /// Apply a partial update. The ref and the owning organization are never
    /// changed.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::UnresolvableIdentifier`] for an insufficient
    /// identifier, or [`DbError::Postgres`] if the update fails.
    pub async fn update(
        &self,
        ident: &EventCategoryIdentifier,
        update: &EventCategoryUpdate,
    ) -> Result<(), DbError> {
        let mut conn = self.pool.acquire().await?;
        let id = resolve::resolve_event_category(&mut conn, ident).await?;

        sqlx::query(
            r"UPDATE event_category
              SET name = COALESCE($1, name),
                  description = COALESCE($2, description)
              WHERE id = $3",
        )
        .bind(&update.name)
        .bind(&update.description)
        .bind(id)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    /// Delete an event category. Events keep their rows; their category link
    /// is severed by the schema's `SET NULL`.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::UnresolvableIdentifier`] for an insufficient
    /// identifier, or [`DbError::Postgres`] if the delete fails.
    pub async fn remove(&self, ident: &EventCategoryIdentifier) -> Result<(), DbError> {
        let mut conn = self.pool.acquire().await?;
        let id = resolve::resolve_event_category(&mut conn, ident).await?;

        sqlx::query(r"DELETE FROM event_category WHERE id = $1")
            .bind(id)
            .execute(&mut *conn)
            .await?;

        tracing::debug!(id, "Removed event category");
        Ok(())
    }
}

/// Fetch an event category on an existing connection.
pub(crate) async fn get_on(
    conn: &mut PgConnection,
    ident: &EventCategoryIdentifier,
) -> Result<Option<EventCategoryRow>, DbError> {
    if let Some(id) = ident.id {
        let row = sqlx::query_as::<_, EventCategoryRow>(
            r"SELECT id, id_ref, name, description, id_organization
              FROM event_category WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;
        return Ok(row);
    }

    let (Some(id_ref), Some(organization)) = (ident.id_ref.as_deref(), ident.organization.as_ref())
    else {
        return Err(DbError::UnresolvableIdentifier {
            entity: "event category",
        });
    };

    let id_organization = resolve::resolve_organization(conn, organization).await?;

    let row = sqlx::query_as::<_, EventCategoryRow>(
        r"SELECT id, id_ref, name, description, id_organization
          FROM event_category WHERE id_organization = $1 AND id_ref = $2",
    )
    .bind(id_organization)
    .bind(id_ref)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(row)
}

/// A row from the `event_category` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct EventCategoryRow {
    /// Database-assigned id.
    pub id: i64,
    /// Ref, unique within the organization.
    pub id_ref: Option<String>,
    /// Display name.
    pub name: String,
    /// Optional description.
    pub description: Option<String>,
    /// Owning organization.
    pub id_organization: i64,
}
