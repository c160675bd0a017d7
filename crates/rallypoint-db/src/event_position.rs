//! Event position store, scoped under an event and optionally under a role.
//!
//! Positions are the concrete slots volunteers sign up for ("Mill Rd."
//! within the delivery role). Position refs are unique per event, not per
//! role, so a position can be re-homed between roles without a ref clash.

use rallypoint_types::{
    EventPositionIdentifier, EventPositionInsert, EventPositionSpec, EventPositionUpdate,
};
use sqlx::{PgConnection, PgPool};

use crate::error::DbError;
use crate::resolve;

/// Columns selected for every event position row.
const POSITION_COLUMNS: &str = r"id, id_ref, name, description, id_event, id_event_role";

/// Operations on the `event_position` table.
pub struct EventPositionStore<'a> {
    pool: &'a PgPool,
}

impl<'a> EventPositionStore<'a> {
    /// Create a new event position store bound to a connection pool.
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Create an event position under its event, optionally linked to a
    /// role.
    ///
    /// The event identifier is required and resolved first; a role
    /// identifier, when present, is resolved within that same event.
    ///
    /// # Errors
    ///
    /// Returns resolver errors for a bad event or role reference, or
    /// [`DbError::Postgres`] on insert failure (including a duplicate
    /// position ref within the event).
    pub async fn create(
        &self,
        position: &EventPositionInsert,
    ) -> Result<EventPositionRow, DbError> {
        let mut conn = self.pool.acquire().await?;
        let id_event = resolve::resolve_event(&mut conn, &position.event).await?;

        let id_event_role = match &position.role {
            Some(role) => Some(resolve_role_for_event(&mut conn, id_event, role).await?),
            None => None,
        };

        let row = sqlx::query_as::<_, EventPositionRow>(&format!(
            r"INSERT INTO event_position (id_ref, name, description, id_event, id_event_role)
              VALUES ($1, $2, $3, $4, $5)
              RETURNING {POSITION_COLUMNS}"
        ))
        .bind(&position.id_ref)
        .bind(&position.name)
        .bind(&position.description)
        .bind(id_event)
        .bind(id_event_role)
        .fetch_one(&mut *conn)
        .await?;

        tracing::debug!(id = row.id, id_event, "Created event position");
        Ok(row)
    }

    /// Fetch an event position by id, or by ref scoped to its event.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::UnresolvableIdentifier`] when the identifier lacks
    /// both an id and a ref-with-resolvable-event.
    pub async fn get(
        &self,
        ident: &EventPositionIdentifier,
    ) -> Result<Option<EventPositionRow>, DbError> {
        if !ident.is_resolvable() {
            return Err(DbError::UnresolvableIdentifier {
                entity: "event position",
            });
        }
        let mut conn = self.pool.acquire().await?;

        if let Some(id) = ident.id {
            let row = sqlx::query_as::<_, EventPositionRow>(&format!(
                r"SELECT {POSITION_COLUMNS} FROM event_position WHERE id = $1"
            ))
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;
            return Ok(row);
        }

        let (Some(id_ref), Some(event)) = (ident.id_ref.as_deref(), ident.event.as_ref()) else {
            return Err(DbError::UnresolvableIdentifier {
                entity: "event position",
            });
        };
        let id_event = resolve::resolve_event(&mut conn, event).await?;

        let row = sqlx::query_as::<_, EventPositionRow>(&format!(
            r"SELECT {POSITION_COLUMNS} FROM event_position WHERE id_event = $1 AND id_ref = $2"
        ))
        .bind(id_event)
        .bind(id_ref)
        .fetch_optional(&mut *conn)
        .await?;

        Ok(row)
    }

    /// Apply a partial update. The ref and the owning event are never
    /// changed; a new role reference is resolved within the position's own
    /// event before being connected.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::UnresolvableIdentifier`] for an insufficient
    /// identifier, resolver errors for a bad role reference, or
    /// [`DbError::Postgres`] if the update fails.
    pub async fn update(
        &self,
        ident: &EventPositionIdentifier,
        update: &EventPositionUpdate,
    ) -> Result<(), DbError> {
        let mut conn = self.pool.acquire().await?;
        let id = resolve::resolve_event_position(&mut conn, ident).await?;

        let id_event_role = match &update.role {
            Some(role) => {
                let row: (i64,) =
                    sqlx::query_as(r"SELECT id_event FROM event_position WHERE id = $1")
                        .bind(id)
                        .fetch_one(&mut *conn)
                        .await?;
                Some(resolve_role_for_event(&mut conn, row.0, role).await?)
            }
            None => None,
        };

        sqlx::query(
            r"UPDATE event_position
              SET name = COALESCE($1, name),
                  description = COALESCE($2, description),
                  id_event_role = COALESCE($3, id_event_role)
              WHERE id = $4",
        )
        .bind(&update.name)
        .bind(&update.description)
        .bind(id_event_role)
        .bind(id)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    /// Delete an event position and, via cascade, its route.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::UnresolvableIdentifier`] for an insufficient
    /// identifier, or [`DbError::Postgres`] if the delete fails.
    pub async fn remove(&self, ident: &EventPositionIdentifier) -> Result<(), DbError> {
        let mut conn = self.pool.acquire().await?;
        let id = resolve::resolve_event_position(&mut conn, ident).await?;

        sqlx::query(r"DELETE FROM event_position WHERE id = $1")
            .bind(id)
            .execute(&mut *conn)
            .await?;

        tracing::debug!(id, "Removed event position");
        Ok(())
    }

    /// Delete every position of an event whose ref is NOT in the given set.
    ///
    /// Destructive and irreversible: callers must pass the complete desired
    /// state. Positions with no ref are left alone.
    ///
    /// Returns the number of deleted rows.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the delete fails.
    pub async fn delete_positions_not_in_refs(
        &self,
        id_event: i64,
        refs: &[String],
    ) -> Result<u64, DbError> {
        let mut conn = self.pool.acquire().await?;
        delete_not_in_refs_on(&mut conn, id_event, refs).await
    }
}

/// Resolve a role identifier within a known event.
async fn resolve_role_for_event(
    conn: &mut PgConnection,
    id_event: i64,
    role: &rallypoint_types::EventRoleIdentifier,
) -> Result<i64, DbError> {
    if let Some(id) = role.id {
        return Ok(id);
    }
    let Some(id_ref) = role.id_ref.as_deref() else {
        return Err(DbError::UnresolvableIdentifier {
            entity: "event role",
        });
    };
    resolve::resolve_role_in_event(conn, id_event, id_ref).await
}

/// Prune an event's positions on an existing connection. See
/// [`EventPositionStore::delete_positions_not_in_refs`].
pub(crate) async fn delete_not_in_refs_on(
    conn: &mut PgConnection,
    id_event: i64,
    refs: &[String],
) -> Result<u64, DbError> {
    let result = sqlx::query(
        r"DELETE FROM event_position
          WHERE id_event = $1 AND id_ref IS NOT NULL AND id_ref <> ALL($2)",
    )
    .bind(id_event)
    .bind(refs)
    .execute(&mut *conn)
    .await?;

    let deleted = result.rows_affected();
    if deleted > 0 {
        tracing::debug!(id_event, deleted, "Pruned event positions not in upload");
    }
    Ok(deleted)
}

/// Atomically create-or-update a position from a nested document spec,
/// returning its id.
///
/// The role link is set on creation only: an existing position keeps its
/// current role, matching the rule that scope never moves implicitly.
pub(crate) async fn upsert_spec_on(
    conn: &mut PgConnection,
    id_event: i64,
    id_event_role: Option<i64>,
    spec: &EventPositionSpec,
) -> Result<i64, DbError> {
    let row: (i64,) = sqlx::query_as(
        r"INSERT INTO event_position (id_ref, name, description, id_event, id_event_role)
          VALUES ($1, $2, $3, $4, $5)
          ON CONFLICT (id_event, id_ref) DO UPDATE SET
            name = EXCLUDED.name,
            description = EXCLUDED.description
          RETURNING id",
    )
    .bind(&spec.id_ref)
    .bind(&spec.name)
    .bind(&spec.description)
    .bind(id_event)
    .bind(id_event_role)
    .fetch_one(&mut *conn)
    .await?;

    Ok(row.0)
}

/// A row from the `event_position` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct EventPositionRow {
    /// Database-assigned id.
    pub id: i64,
    /// Ref, unique within the event.
    pub id_ref: Option<String>,
    /// Display name.
    pub name: String,
    /// Optional description.
    pub description: Option<String>,
    /// Owning event.
    pub id_event: i64,
    /// Owning role, if any.
    pub id_event_role: Option<i64>,
}
