//! Route and route delivery store.
//!
//! A route is the delivery run attached to one event position, with its
//! ordered list of stops. Routes are create-only: re-uploading a position's
//! route replaces it wholesale (the old route and its deliveries are
//! dropped, then the new subtree is inserted). The route ref is derived
//! from the position ref by the caller.

use rallypoint_types::{RouteDeliverySpec, RouteSpec};
use sqlx::{PgConnection, PgPool};

use crate::error::DbError;

/// Operations on the `route` and `route_delivery` tables.
pub struct RouteStore<'a> {
    pool: &'a PgPool,
}

impl<'a> RouteStore<'a> {
    /// Create a new route store bound to a connection pool.
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Replace the route of a position with the given spec, deliveries
    /// included, in one transaction.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] on failure; nothing is committed.
    pub async fn replace_for_position(
        &self,
        id_event_position: i64,
        position_ref: &Option<String>,
        spec: &RouteSpec,
    ) -> Result<RouteRow, DbError> {
        let mut tx = self.pool.begin().await?;
        let row = replace_route_on(&mut tx, id_event_position, position_ref, spec).await?;
        tx.commit().await?;
        Ok(row)
    }

    /// Fetch the route attached to a position, if any.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails.
    pub async fn get_for_position(
        &self,
        id_event_position: i64,
    ) -> Result<Option<RouteRow>, DbError> {
        let row = sqlx::query_as::<_, RouteRow>(
            r"SELECT id, id_ref, name, distance, passcode, id_event_position
              FROM route WHERE id_event_position = $1",
        )
        .bind(id_event_position)
        .fetch_optional(self.pool)
        .await?;

        Ok(row)
    }

    /// Fetch a route's deliveries in sequence order.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails.
    pub async fn deliveries(&self, id_route: i64) -> Result<Vec<RouteDeliveryRow>, DbError> {
        let rows = sqlx::query_as::<_, RouteDeliveryRow>(
            r"SELECT id, id_route, sequence, name, address, plus_code, portions,
                     phone, allergies, notes, when_not_home
              FROM route_delivery WHERE id_route = $1
              ORDER BY sequence",
        )
        .bind(id_route)
        .fetch_all(self.pool)
        .await?;

        Ok(rows)
    }

    /// Delete the route (and, via cascade, its deliveries) attached to a
    /// position.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the delete fails.
    pub async fn remove_for_position(&self, id_event_position: i64) -> Result<(), DbError> {
        let mut conn = self.pool.acquire().await?;
        remove_for_position_on(&mut conn, id_event_position).await
    }
}

/// Delete a position's route on an existing connection.
pub(crate) async fn remove_for_position_on(
    conn: &mut PgConnection,
    id_event_position: i64,
) -> Result<(), DbError> {
    sqlx::query(r"DELETE FROM route WHERE id_event_position = $1")
        .bind(id_event_position)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

/// Drop and recreate a position's route from a spec on an existing
/// connection. Delivery sequence numbers follow the spec's ordering.
pub(crate) async fn replace_route_on(
    conn: &mut PgConnection,
    id_event_position: i64,
    position_ref: &Option<String>,
    spec: &RouteSpec,
) -> Result<RouteRow, DbError> {
    remove_for_position_on(&mut *conn, id_event_position).await?;

    let row = sqlx::query_as::<_, RouteRow>(
        r"INSERT INTO route (id_ref, name, distance, passcode, id_event_position)
          VALUES ($1, $2, $3, $4, $5)
          RETURNING id, id_ref, name, distance, passcode, id_event_position",
    )
    .bind(position_ref)
    .bind(&spec.name)
    .bind(&spec.distance)
    .bind(&spec.passcode)
    .bind(id_event_position)
    .fetch_one(&mut *conn)
    .await?;

    for (idx, delivery) in spec.deliveries.iter().enumerate() {
        let sequence = i32::try_from(idx).unwrap_or(i32::MAX);
        insert_delivery_on(&mut *conn, row.id, sequence, delivery).await?;
    }

    tracing::debug!(
        id = row.id,
        id_event_position,
        deliveries = spec.deliveries.len(),
        "Replaced route for position"
    );
    Ok(row)
}

/// Insert one delivery stop on an existing connection.
async fn insert_delivery_on(
    conn: &mut PgConnection,
    id_route: i64,
    sequence: i32,
    delivery: &RouteDeliverySpec,
) -> Result<(), DbError> {
    sqlx::query(
        r"INSERT INTO route_delivery
          (id_route, sequence, name, address, plus_code, portions, phone,
           allergies, notes, when_not_home)
          VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
    )
    .bind(id_route)
    .bind(sequence)
    .bind(&delivery.name)
    .bind(&delivery.address)
    .bind(&delivery.plus_code)
    .bind(delivery.portions)
    .bind(&delivery.phone)
    .bind(&delivery.allergies)
    .bind(&delivery.notes)
    .bind(&delivery.when_not_home)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// A row from the `route` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct RouteRow {
    /// Database-assigned id.
    pub id: i64,
    /// Ref, derived from the owning position's ref.
    pub id_ref: Option<String>,
    /// Display name.
    pub name: String,
    /// Opaque distance payload, returned verbatim.
    pub distance: Option<serde_json::Value>,
    /// Passcode gating access to the route details.
    pub passcode: Option<String>,
    /// Owning position.
    pub id_event_position: i64,
}

/// A row from the `route_delivery` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct RouteDeliveryRow {
    /// Database-assigned id.
    pub id: i64,
    /// Owning route.
    pub id_route: i64,
    /// Position of this stop in the delivery order.
    pub sequence: i32,
    /// Recipient name.
    pub name: Option<String>,
    /// Street address.
    pub address: String,
    /// Google plus code for the address.
    pub plus_code: Option<String>,
    /// Number of portions to deliver.
    pub portions: i32,
    /// Contact phone number.
    pub phone: Option<String>,
    /// Allergy notes.
    pub allergies: Option<String>,
    /// Free-form delivery notes.
    pub notes: Option<String>,
    /// What to do when the recipient is not home.
    pub when_not_home: Option<String>,
}
