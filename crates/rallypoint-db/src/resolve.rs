//! Reference resolution: normalizing id-or-ref identifiers to canonical ids.
//!
//! Every write and read path funnels identifiers through these functions
//! before touching a row. A numeric id is authoritative and used as-is; a
//! ref is looked up within its parent scope, with the parent itself resolved
//! recursively. The functions take `&mut PgConnection` so the same code runs
//! on a plain pool connection or inside a transaction.
//!
//! Resolution is read-only: nothing here mutates rows.

use rallypoint_types::{
    EventCategoryIdentifier, EventIdentifier, EventPositionIdentifier, EventRoleIdentifier,
    PersonIdentifier, RecordIdentifier, SystemRoleIdentifier,
};
use sqlx::PgConnection;

use crate::error::DbError;

/// Resolve an organization identifier to its canonical id.
///
/// # Errors
///
/// Returns [`DbError::UnresolvableIdentifier`] when neither id nor ref is
/// present, and [`DbError::MissingReference`] when the ref matches no row.
pub async fn resolve_organization(
    conn: &mut PgConnection,
    ident: &RecordIdentifier,
) -> Result<i64, DbError> {
    if let Some(id) = ident.id {
        return Ok(id);
    }
    let Some(id_ref) = ident.id_ref.as_deref() else {
        return Err(DbError::UnresolvableIdentifier {
            entity: "organization",
        });
    };

    let row: Option<(i64,)> = sqlx::query_as(r"SELECT id FROM organization WHERE id_ref = $1")
        .bind(id_ref)
        .fetch_optional(&mut *conn)
        .await?;

    row.map(|r| r.0).ok_or_else(|| DbError::MissingReference {
        entity: "organization",
        id_ref: id_ref.to_owned(),
    })
}

/// Resolve an event category identifier to its canonical id.
///
/// # Errors
///
/// Returns [`DbError::UnresolvableIdentifier`] when the identifier lacks an
/// id and a ref-with-organization, and [`DbError::MissingReference`] when
/// the ref matches no row in the organization.
pub async fn resolve_event_category(
    conn: &mut PgConnection,
    ident: &EventCategoryIdentifier,
) -> Result<i64, DbError> {
    if let Some(id) = ident.id {
        return Ok(id);
    }
    let (Some(id_ref), Some(organization)) = (ident.id_ref.as_deref(), ident.organization.as_ref())
    else {
        return Err(DbError::UnresolvableIdentifier {
            entity: "event category",
        });
    };

    let id_organization = resolve_organization(conn, organization).await?;
    resolve_category_in_org(conn, id_organization, id_ref).await
}

/// Resolve a category ref within an already-resolved organization.
pub(crate) async fn resolve_category_in_org(
    conn: &mut PgConnection,
    id_organization: i64,
    id_ref: &str,
) -> Result<i64, DbError> {
    let row: Option<(i64,)> = sqlx::query_as(
        r"SELECT id FROM event_category WHERE id_organization = $1 AND id_ref = $2",
    )
    .bind(id_organization)
    .bind(id_ref)
    .fetch_optional(&mut *conn)
    .await?;

    row.map(|r| r.0).ok_or_else(|| DbError::MissingReference {
        entity: "event category",
        id_ref: id_ref.to_owned(),
    })
}

/// Resolve an event identifier to its canonical id.
///
/// # Errors
///
/// Returns [`DbError::UnresolvableIdentifier`] when the identifier lacks an
/// id and a ref-with-organization, and [`DbError::MissingReference`] when
/// the ref matches no row in the organization.
pub async fn resolve_event(
    conn: &mut PgConnection,
    ident: &EventIdentifier,
) -> Result<i64, DbError> {
    if let Some(id) = ident.id {
        return Ok(id);
    }
    let (Some(id_ref), Some(organization)) = (ident.id_ref.as_deref(), ident.organization.as_ref())
    else {
        return Err(DbError::UnresolvableIdentifier { entity: "event" });
    };

    let id_organization = resolve_organization(conn, organization).await?;

    let row: Option<(i64,)> =
        sqlx::query_as(r"SELECT id FROM event WHERE id_organization = $1 AND id_ref = $2")
            .bind(id_organization)
            .bind(id_ref)
            .fetch_optional(&mut *conn)
            .await?;

    row.map(|r| r.0).ok_or_else(|| DbError::MissingReference {
        entity: "event",
        id_ref: id_ref.to_owned(),
    })
}

/// Resolve an event role identifier to its canonical id.
///
/// # Errors
///
/// Returns [`DbError::UnresolvableIdentifier`] when the identifier lacks an
/// id and a ref-with-event, and [`DbError::MissingReference`] when the ref
/// matches no row in the event.
pub async fn resolve_event_role(
    conn: &mut PgConnection,
    ident: &EventRoleIdentifier,
) -> Result<i64, DbError> {
    if let Some(id) = ident.id {
        return Ok(id);
    }
    let (Some(id_ref), Some(event)) = (ident.id_ref.as_deref(), ident.event.as_ref()) else {
        return Err(DbError::UnresolvableIdentifier {
            entity: "event role",
        });
    };

    let id_event = resolve_event(conn, event).await?;
    resolve_role_in_event(conn, id_event, id_ref).await
}

/// Resolve a role ref within an already-resolved event.
pub(crate) async fn resolve_role_in_event(
    conn: &mut PgConnection,
    id_event: i64,
    id_ref: &str,
) -> Result<i64, DbError> {
    let row: Option<(i64,)> =
        sqlx::query_as(r"SELECT id FROM event_role WHERE id_event = $1 AND id_ref = $2")
            .bind(id_event)
            .bind(id_ref)
            .fetch_optional(&mut *conn)
            .await?;

    row.map(|r| r.0).ok_or_else(|| DbError::MissingReference {
        entity: "event role",
        id_ref: id_ref.to_owned(),
    })
}

/// Resolve an event position identifier to its canonical id.
///
/// # Errors
///
/// Returns [`DbError::UnresolvableIdentifier`] when the identifier lacks an
/// id and a ref-with-event, and [`DbError::MissingReference`] when the ref
/// matches no row in the event.
pub async fn resolve_event_position(
    conn: &mut PgConnection,
    ident: &EventPositionIdentifier,
) -> Result<i64, DbError> {
    if let Some(id) = ident.id {
        return Ok(id);
    }
    let (Some(id_ref), Some(event)) = (ident.id_ref.as_deref(), ident.event.as_ref()) else {
        return Err(DbError::UnresolvableIdentifier {
            entity: "event position",
        });
    };

    let id_event = resolve_event(conn, event).await?;
    resolve_position_in_event(conn, id_event, id_ref).await
}

/// Resolve a position ref within an already-resolved event.
pub(crate) async fn resolve_position_in_event(
    conn: &mut PgConnection,
    id_event: i64,
    id_ref: &str,
) -> Result<i64, DbError> {
    let row: Option<(i64,)> =
        sqlx::query_as(r"SELECT id FROM event_position WHERE id_event = $1 AND id_ref = $2")
            .bind(id_event)
            .bind(id_ref)
            .fetch_optional(&mut *conn)
            .await?;

    row.map(|r| r.0).ok_or_else(|| DbError::MissingReference {
        entity: "event position",
        id_ref: id_ref.to_owned(),
    })
}

/// Resolve a person identifier to its canonical id.
///
/// # Errors
///
/// Returns [`DbError::UnresolvableIdentifier`] when neither id nor email is
/// present, and [`DbError::MissingReference`] when the email matches no row.
pub async fn resolve_person(
    conn: &mut PgConnection,
    ident: &PersonIdentifier,
) -> Result<i64, DbError> {
    if let Some(id) = ident.id {
        return Ok(id);
    }
    let Some(email) = ident.email.as_deref() else {
        return Err(DbError::UnresolvableIdentifier { entity: "person" });
    };

    let row: Option<(i64,)> = sqlx::query_as(r"SELECT id FROM person WHERE email = $1")
        .bind(email)
        .fetch_optional(&mut *conn)
        .await?;

    row.map(|r| r.0).ok_or_else(|| DbError::MissingReference {
        entity: "person",
        id_ref: email.to_owned(),
    })
}

/// Resolve a system role identifier to its canonical id.
///
/// # Errors
///
/// Returns [`DbError::UnresolvableIdentifier`] when neither id nor role name
/// is present, and [`DbError::MissingReference`] when the name matches no
/// row.
pub async fn resolve_system_role(
    conn: &mut PgConnection,
    ident: &SystemRoleIdentifier,
) -> Result<i64, DbError> {
    if let Some(id) = ident.id {
        return Ok(id);
    }
    let Some(role) = ident.role.as_deref() else {
        return Err(DbError::UnresolvableIdentifier {
            entity: "system role",
        });
    };

    let row: Option<(i64,)> = sqlx::query_as(r"SELECT id FROM system_role WHERE role = $1")
        .bind(role)
        .fetch_optional(&mut *conn)
        .await?;

    row.map(|r| r.0).ok_or_else(|| DbError::MissingReference {
        entity: "system role",
        id_ref: role.to_owned(),
    })
}
