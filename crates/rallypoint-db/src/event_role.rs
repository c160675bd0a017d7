//! Event role store, scoped under an event.
//!
//! Roles describe the kinds of help an event needs ("meal delivery",
//! "cooking") and own positions. Role refs are unique per event. The
//! prune helper backs the batch importer's omission-is-deletion rule.

use rallypoint_types::{EventRoleIdentifier, EventRoleInsert, EventRoleSpec, EventRoleUpdate};
use sqlx::{PgConnection, PgPool};

use crate::error::DbError;
use crate::resolve;

/// Columns selected for every event role row.
const ROLE_COLUMNS: &str = r"id, id_ref, name, description, general_volunteers_needed, id_event";

/// Operations on the `event_role` table.
pub struct EventRoleStore<'a> {
    pool: &'a PgPool,
}

impl<'a> EventRoleStore<'a> {
    /// Create a new event role store bound to a connection pool.
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Create an event role under its event.
    ///
    /// The event identifier in the payload is required and resolved (by id,
    /// or by ref plus organization) before the insert.
    ///
    /// # Errors
    ///
    /// Returns resolver errors for a bad event reference, or
    /// [`DbError::Postgres`] on insert failure (including a duplicate role
    /// ref within the event).
    pub async fn create(&self, role: &EventRoleInsert) -> Result<EventRoleRow, DbError> {
        let mut conn = self.pool.acquire().await?;
        let id_event = resolve::resolve_event(&mut conn, &role.event).await?;

        let row = sqlx::query_as::<_, EventRoleRow>(&format!(
            r"INSERT INTO event_role
              (id_ref, name, description, general_volunteers_needed, id_event)
              VALUES ($1, $2, $3, $4, $5)
              RETURNING {ROLE_COLUMNS}"
        ))
        .bind(&role.id_ref)
        .bind(&role.name)
        .bind(&role.description)
        .bind(role.general_volunteers_needed)
        .bind(id_event)
        .fetch_one(&mut *conn)
        .await?;

        tracing::debug!(id = row.id, id_event, "Created event role");
        Ok(row)
    }

    /// Fetch an event role by id, or by ref scoped to its event.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::UnresolvableIdentifier`] when the identifier lacks
    /// both an id and a ref-with-resolvable-event.
    pub async fn get(
        &self,
        ident: &EventRoleIdentifier,
    ) -> Result<Option<EventRoleRow>, DbError> {
        if !ident.is_resolvable() {
            return Err(DbError::UnresolvableIdentifier {
                entity: "event role",
            });
        }
        let mut conn = self.pool.acquire().await?;

        if let Some(id) = ident.id {
            let row = sqlx::query_as::<_, EventRoleRow>(&format!(
                r"SELECT {ROLE_COLUMNS} FROM event_role WHERE id = $1"
            ))
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;
            return Ok(row);
        }

        // is_resolvable guarantees both the ref and the event are present.
        let (Some(id_ref), Some(event)) = (ident.id_ref.as_deref(), ident.event.as_ref()) else {
            return Err(DbError::UnresolvableIdentifier {
                entity: "event role",
            });
        };
        let id_event = resolve::resolve_event(&mut conn, event).await?;

        let row = sqlx::query_as::<_, EventRoleRow>(&format!(
            r"SELECT {ROLE_COLUMNS} FROM event_role WHERE id_event = $1 AND id_ref = $2"
        ))
        .bind(id_event)
        .bind(id_ref)
        .fetch_optional(&mut *conn)
        .await?;

        Ok(row)
    }

    /// Apply a partial update. The ref and the owning event are never
    /// changed.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::UnresolvableIdentifier`] for an insufficient
    /// identifier, or [`DbError::Postgres`] if the update fails.
    pub async fn update(
        &self,
        ident: &EventRoleIdentifier,
        update: &EventRoleUpdate,
    ) -> Result<(), DbError> {
        let mut conn = self.pool.acquire().await?;
        let id = resolve::resolve_event_role(&mut conn, ident).await?;

        sqlx::query(
            r"UPDATE event_role
              SET name = COALESCE($1, name),
                  description = COALESCE($2, description),
                  general_volunteers_needed = COALESCE($3, general_volunteers_needed)
              WHERE id = $4",
        )
        .bind(&update.name)
        .bind(&update.description)
        .bind(update.general_volunteers_needed)
        .bind(id)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    /// Delete an event role and, via cascade, nothing else: positions keep
    /// their rows with the role link severed by the schema's `SET NULL`.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::UnresolvableIdentifier`] for an insufficient
    /// identifier, or [`DbError::Postgres`] if the delete fails.
    pub async fn remove(&self, ident: &EventRoleIdentifier) -> Result<(), DbError> {
        let mut conn = self.pool.acquire().await?;
        let id = resolve::resolve_event_role(&mut conn, ident).await?;

        sqlx::query(r"DELETE FROM event_role WHERE id = $1")
            .bind(id)
            .execute(&mut *conn)
            .await?;

        tracing::debug!(id, "Removed event role");
        Ok(())
    }

    /// Delete every role of an event whose ref is NOT in the given set.
    ///
    /// Destructive and irreversible: callers must pass the complete desired
    /// state. Roles with no ref are left alone, since they can never appear
    /// in a ref list.
    ///
    /// Returns the number of deleted rows.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the delete fails.
    pub async fn delete_roles_not_in_refs(
        &self,
        id_event: i64,
        refs: &[String],
    ) -> Result<u64, DbError> {
        let mut conn = self.pool.acquire().await?;
        delete_not_in_refs_on(&mut conn, id_event, refs).await
    }
}

/// Prune an event's roles on an existing connection. See
/// [`EventRoleStore::delete_roles_not_in_refs`].
pub(crate) async fn delete_not_in_refs_on(
    conn: &mut PgConnection,
    id_event: i64,
    refs: &[String],
) -> Result<u64, DbError> {
    let result = sqlx::query(
        r"DELETE FROM event_role
          WHERE id_event = $1 AND id_ref IS NOT NULL AND id_ref <> ALL($2)",
    )
    .bind(id_event)
    .bind(refs)
    .execute(&mut *conn)
    .await?;

    let deleted = result.rows_affected();
    if deleted > 0 {
        tracing::debug!(id_event, deleted, "Pruned event roles not in upload");
    }
    Ok(deleted)
}

/// Atomically create-or-update a role from a nested document spec, returning
/// its id.
pub(crate) async fn upsert_spec_on(
    conn: &mut PgConnection,
    id_event: i64,
    spec: &EventRoleSpec,
) -> Result<i64, DbError> {
    let row: (i64,) = sqlx::query_as(
        r"INSERT INTO event_role
          (id_ref, name, description, general_volunteers_needed, id_event)
          VALUES ($1, $2, $3, $4, $5)
          ON CONFLICT (id_event, id_ref) DO UPDATE SET
            name = EXCLUDED.name,
            description = EXCLUDED.description,
            general_volunteers_needed = EXCLUDED.general_volunteers_needed
          RETURNING id",
    )
    .bind(&spec.id_ref)
    .bind(&spec.name)
    .bind(&spec.description)
    .bind(spec.general_volunteers_needed)
    .bind(id_event)
    .fetch_one(&mut *conn)
    .await?;

    Ok(row.0)
}

/// A row from the `event_role` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct EventRoleRow {
    /// Database-assigned id.
    pub id: i64,
    /// Ref, unique within the event.
    pub id_ref: Option<String>,
    /// Display name.
    pub name: String,
    /// Optional description.
    pub description: Option<String>,
    /// How many unassigned volunteers this role needs.
    pub general_volunteers_needed: Option<i32>,
    /// Owning event.
    pub id_event: i64,
}
