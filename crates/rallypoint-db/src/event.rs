//! Event store, scoped under an organization.
//!
//! Events are the hub of the hierarchy: they belong to an organization, may
//! link to one of its categories, and own roles and positions. `create` and
//! `upsert` accept the nested role/position/route document and apply the
//! whole subtree in a single transaction, so a failure partway through
//! leaves nothing behind.

use rallypoint_types::{EventIdentifier, EventInsert, EventUpdate, RecordIdentifier};
use sqlx::{PgConnection, PgPool};

use crate::error::DbError;
use crate::resolve;
use crate::{event_position, event_role, route};

/// Columns selected for every event row.
const EVENT_COLUMNS: &str = r"id, id_ref, name, description, start_date, end_date, all_day,
                              addl_info, id_organization, id_event_category";

/// Operations on the `event` table.
pub struct EventStore<'a> {
    pool: &'a PgPool,
}

impl<'a> EventStore<'a> {
    /// Create a new event store bound to a connection pool.
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Create an event, along with any nested roles, positions, and routes.
    ///
    /// The organization identifier in the payload is required and resolved
    /// first; the optional category is resolved within that organization.
    /// Nested children are upserted by ref under the new event. The whole
    /// operation runs in one transaction.
    ///
    /// # Errors
    ///
    /// Returns resolver errors for a bad organization or category reference,
    /// or [`DbError::Postgres`] on insert failure (including a duplicate
    /// event ref within the organization), in which case nothing is
    /// committed.
    pub async fn create(&self, event: &EventInsert) -> Result<EventRow, DbError> {
        let mut tx = self.pool.begin().await?;

        let row = insert_on(&mut tx, event).await?;
        apply_children_on(&mut tx, &row, event).await?;

        tx.commit().await?;
        tracing::debug!(id = row.id, id_ref = ?row.id_ref, "Created event");
        Ok(row)
    }

    /// Fetch an event by id, or by ref scoped to its organization.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::UnresolvableIdentifier`] when the identifier lacks
    /// both an id and a ref-with-organization.
    pub async fn get(&self, ident: &EventIdentifier) -> Result<Option<EventRow>, DbError> {
        let mut conn = self.pool.acquire().await?;
        get_on(&mut conn, ident).await
    }

    /// Apply a partial update to an event.
    ///
    /// The ref and the owning organization are never changed implicitly; a
    /// new category reference is resolved within the event's own
    /// organization before being connected.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::UnresolvableIdentifier`] for an insufficient
    /// identifier, resolver errors for a bad category reference, or
    /// [`DbError::Postgres`] if the update fails.
    pub async fn update(
        &self,
        ident: &EventIdentifier,
        update: &EventUpdate,
    ) -> Result<(), DbError> {
        let mut conn = self.pool.acquire().await?;

        let Some(row) = get_on(&mut conn, ident).await? else {
            return Err(DbError::MissingReference {
                entity: "event",
                id_ref: ident.id_ref.clone().unwrap_or_default(),
            });
        };

        let id_event_category = match &update.category {
            Some(category) => {
                Some(resolve_category_for_org(&mut conn, row.id_organization, category).await?)
            }
            None => row.id_event_category,
        };

        sqlx::query(
            r"UPDATE event
              SET name = COALESCE($1, name),
                  description = COALESCE($2, description),
                  start_date = COALESCE($3, start_date),
                  end_date = COALESCE($4, end_date),
                  all_day = COALESCE($5, all_day),
                  addl_info = COALESCE($6, addl_info),
                  id_event_category = $7
              WHERE id = $8",
        )
        .bind(&update.name)
        .bind(&update.description)
        .bind(update.start_date)
        .bind(update.end_date)
        .bind(update.all_day)
        .bind(&update.addl_info)
        .bind(id_event_category)
        .bind(row.id)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    /// Create-or-update an event by ref, including its nested subtree.
    ///
    /// The ref-addressed path is a single atomic
    /// `INSERT ... ON CONFLICT DO UPDATE`, so two concurrent upserts for the
    /// same ref cannot both race into `create`. When the identifier carries
    /// a numeric id the row is updated in place instead. Nested roles and
    /// positions are upserted by ref; nothing is pruned (pruning belongs to
    /// the batch importer).
    ///
    /// # Errors
    ///
    /// Returns resolver errors, [`DbError::MissingReference`] when a numeric
    /// id matches no row, or [`DbError::Postgres`]; nothing is committed on
    /// failure.
    pub async fn upsert(
        &self,
        ident: &EventIdentifier,
        event: &EventInsert,
    ) -> Result<EventRow, DbError> {
        let mut tx = self.pool.begin().await?;

        let row = upsert_on(&mut tx, ident, event).await?;
        apply_children_on(&mut tx, &row, event).await?;

        tx.commit().await?;
        tracing::debug!(id = row.id, id_ref = ?row.id_ref, "Upserted event");
        Ok(row)
    }

    /// Delete an event and, via cascade, its roles, positions, and routes.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::UnresolvableIdentifier`] for an insufficient
    /// identifier, or [`DbError::Postgres`] if the delete fails.
    pub async fn remove(&self, ident: &EventIdentifier) -> Result<(), DbError> {
        let mut conn = self.pool.acquire().await?;
        let id = resolve::resolve_event(&mut conn, ident).await?;

        sqlx::query(r"DELETE FROM event WHERE id = $1")
            .bind(id)
            .execute(&mut *conn)
            .await?;

        tracing::debug!(id, "Removed event");
        Ok(())
    }
}

/// Resolve an optional category identifier within a known organization.
async fn resolve_category_for_org(
    conn: &mut PgConnection,
    id_organization: i64,
    category: &RecordIdentifier,
) -> Result<i64, DbError> {
    if let Some(id) = category.id {
        return Ok(id);
    }
    let Some(id_ref) = category.id_ref.as_deref() else {
        return Err(DbError::UnresolvableIdentifier {
            entity: "event category",
        });
    };
    resolve::resolve_category_in_org(conn, id_organization, id_ref).await
}

/// Insert the event row itself (no children) on an existing connection.
pub(crate) async fn insert_on(
    conn: &mut PgConnection,
    event: &EventInsert,
) -> Result<EventRow, DbError> {
    let id_organization = resolve::resolve_organization(conn, &event.organization).await?;
    let id_event_category = match &event.category {
        Some(category) => Some(resolve_category_for_org(conn, id_organization, category).await?),
        None => None,
    };

    let row = sqlx::query_as::<_, EventRow>(&format!(
        r"INSERT INTO event
          (id_ref, name, description, start_date, end_date, all_day, addl_info,
           id_organization, id_event_category)
          VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
          RETURNING {EVENT_COLUMNS}"
    ))
    .bind(&event.id_ref)
    .bind(&event.name)
    .bind(&event.description)
    .bind(event.start_date)
    .bind(event.end_date)
    .bind(event.all_day)
    .bind(&event.addl_info)
    .bind(id_organization)
    .bind(id_event_category)
    .fetch_one(&mut *conn)
    .await?;

    Ok(row)
}

/// Atomically create-or-update the event row (no children) on an existing
/// connection.
pub(crate) async fn upsert_on(
    conn: &mut PgConnection,
    ident: &EventIdentifier,
    event: &EventInsert,
) -> Result<EventRow, DbError> {
    // A numeric id pins an existing row: update it in place.
    if let Some(id) = ident.id {
        let row = sqlx::query_as::<_, EventRow>(&format!(
            r"UPDATE event
              SET name = $1, description = $2, start_date = $3, end_date = $4,
                  all_day = $5, addl_info = $6
              WHERE id = $7
              RETURNING {EVENT_COLUMNS}"
        ))
        .bind(&event.name)
        .bind(&event.description)
        .bind(event.start_date)
        .bind(event.end_date)
        .bind(event.all_day)
        .bind(&event.addl_info)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;
        return row.ok_or_else(|| DbError::MissingReference {
            entity: "event",
            id_ref: id.to_string(),
        });
    }

    // Ref-addressed: the identifier may carry the ref and scope, or the
    // payload may. Either way both must end up present.
    let id_ref = ident
        .id_ref
        .as_deref()
        .or(event.id_ref.as_deref())
        .ok_or(DbError::UnresolvableIdentifier { entity: "event" })?;
    let organization = ident.organization.as_ref().unwrap_or(&event.organization);

    let id_organization = resolve::resolve_organization(conn, organization).await?;
    let id_event_category = match &event.category {
        Some(category) => Some(resolve_category_for_org(conn, id_organization, category).await?),
        None => None,
    };

    let row = sqlx::query_as::<_, EventRow>(&format!(
        r"INSERT INTO event
          (id_ref, name, description, start_date, end_date, all_day, addl_info,
           id_organization, id_event_category)
          VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
          ON CONFLICT (id_organization, id_ref) DO UPDATE SET
            name = EXCLUDED.name,
            description = EXCLUDED.description,
            start_date = EXCLUDED.start_date,
            end_date = EXCLUDED.end_date,
            all_day = EXCLUDED.all_day,
            addl_info = EXCLUDED.addl_info,
            id_event_category = EXCLUDED.id_event_category
          RETURNING {EVENT_COLUMNS}"
    ))
    .bind(id_ref)
    .bind(&event.name)
    .bind(&event.description)
    .bind(event.start_date)
    .bind(event.end_date)
    .bind(event.all_day)
    .bind(&event.addl_info)
    .bind(id_organization)
    .bind(id_event_category)
    .fetch_one(&mut *conn)
    .await?;

    Ok(row)
}

/// Upsert the nested roles, positions, and routes of an event document.
pub(crate) async fn apply_children_on(
    conn: &mut PgConnection,
    event_row: &EventRow,
    event: &EventInsert,
) -> Result<(), DbError> {
    for role in &event.roles {
        let role_id = event_role::upsert_spec_on(&mut *conn, event_row.id, role).await?;
        for position in &role.positions {
            let position_id =
                event_position::upsert_spec_on(&mut *conn, event_row.id, Some(role_id), position)
                    .await?;
            if let Some(route_spec) = &position.route {
                route::replace_route_on(
                    &mut *conn,
                    position_id,
                    &Some(position.id_ref.clone()),
                    route_spec,
                )
                    .await?;
            }
        }
    }
    Ok(())
}

/// Fetch an event on an existing connection.
pub(crate) async fn get_on(
    conn: &mut PgConnection,
    ident: &EventIdentifier,
) -> Result<Option<EventRow>, DbError> {
    if let Some(id) = ident.id {
        let row = sqlx::query_as::<_, EventRow>(&format!(
            r"SELECT {EVENT_COLUMNS} FROM event WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;
        return Ok(row);
    }

    let (Some(id_ref), Some(organization)) = (ident.id_ref.as_deref(), ident.organization.as_ref())
    else {
        return Err(DbError::UnresolvableIdentifier { entity: "event" });
    };

    let id_organization = resolve::resolve_organization(conn, organization).await?;

    let row = sqlx::query_as::<_, EventRow>(&format!(
        r"SELECT {EVENT_COLUMNS} FROM event WHERE id_organization = $1 AND id_ref = $2"
    ))
    .bind(id_organization)
    .bind(id_ref)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(row)
}

/// Fetch an organization's events starting inside `[from, until)`, soonest
/// first, on an existing connection.
pub(crate) async fn in_window_for_organization_on(
    conn: &mut PgConnection,
    id_organization: i64,
    from: chrono::DateTime<chrono::Utc>,
    until: chrono::DateTime<chrono::Utc>,
) -> Result<Vec<EventRow>, DbError> {
    let rows = sqlx::query_as::<_, EventRow>(&format!(
        r"SELECT {EVENT_COLUMNS} FROM event
          WHERE id_organization = $1 AND start_date >= $2 AND start_date < $3
          ORDER BY start_date"
    ))
    .bind(id_organization)
    .bind(from)
    .bind(until)
    .fetch_all(&mut *conn)
    .await?;

    Ok(rows)
}

/// A row from the `event` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct EventRow {
    /// Database-assigned id.
    pub id: i64,
    /// Ref, unique within the organization.
    pub id_ref: Option<String>,
    /// Display name.
    pub name: String,
    /// Optional description.
    pub description: Option<String>,
    /// When the event starts.
    pub start_date: chrono::DateTime<chrono::Utc>,
    /// When the event ends, if bounded.
    pub end_date: Option<chrono::DateTime<chrono::Utc>>,
    /// Whether the event spans the whole day.
    pub all_day: bool,
    /// Free-form organization-specific payload, returned verbatim.
    pub addl_info: Option<serde_json::Value>,
    /// Owning organization.
    pub id_organization: i64,
    /// Linked category, if any.
    pub id_event_category: Option<i64>,
}
