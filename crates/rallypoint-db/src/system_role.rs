//! System role store and role grants.
//!
//! System roles are the coarse permission labels ("master-admin",
//! "event-admin") granted to people, optionally scoped to one organization.
//! Role names are globally unique and `create` deliberately upserts by name
//! instead of failing on a duplicate.

use rallypoint_types::SystemRoleIdentifier;
use rallypoint_types::SystemRoleInsert;
use sqlx::{PgConnection, PgPool};

use crate::error::DbError;

/// Operations on the `system_role` and `person_system_role` tables.
pub struct SystemRoleStore<'a> {
    pool: &'a PgPool,
}

impl<'a> SystemRoleStore<'a> {
    /// Create a new system role store bound to a connection pool.
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Create a system role, idempotent on the role name.
    ///
    /// An existing role with the same name has its description replaced.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the upsert fails.
    pub async fn create(&self, role: &SystemRoleInsert) -> Result<SystemRoleRow, DbError> {
        let row = sqlx::query_as::<_, SystemRoleRow>(
            r"INSERT INTO system_role (role, description)
              VALUES ($1, $2)
              ON CONFLICT (role) DO UPDATE SET description = EXCLUDED.description
              RETURNING id, role, description",
        )
        .bind(&role.role)
        .bind(&role.description)
        .fetch_one(self.pool)
        .await?;

        tracing::debug!(id = row.id, role = %row.role, "Upserted system role");
        Ok(row)
    }

    /// Fetch a system role by id or name.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::UnresolvableIdentifier`] when the identifier is
    /// empty, or [`DbError::Postgres`] if the query fails.
    pub async fn get(
        &self,
        ident: &SystemRoleIdentifier,
    ) -> Result<Option<SystemRoleRow>, DbError> {
        let row = if let Some(id) = ident.id {
            sqlx::query_as::<_, SystemRoleRow>(
                r"SELECT id, role, description FROM system_role WHERE id = $1",
            )
            .bind(id)
            .fetch_optional(self.pool)
            .await?
        } else if let Some(role) = ident.role.as_deref() {
            sqlx::query_as::<_, SystemRoleRow>(
                r"SELECT id, role, description FROM system_role WHERE role = $1",
            )
            .bind(role)
            .fetch_optional(self.pool)
            .await?
        } else {
            return Err(DbError::UnresolvableIdentifier {
                entity: "system role",
            });
        };

        Ok(row)
    }

    /// Delete a system role and, via cascade, every grant of it.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::UnresolvableIdentifier`] when the identifier is
    /// empty, or [`DbError::Postgres`] if the delete fails.
    pub async fn remove(&self, ident: &SystemRoleIdentifier) -> Result<(), DbError> {
        if !ident.is_resolvable() {
            return Err(DbError::UnresolvableIdentifier {
                entity: "system role",
            });
        }

        sqlx::query(
            r"DELETE FROM system_role
              WHERE ($1::BIGINT IS NOT NULL AND id = $1)
                 OR ($1::BIGINT IS NULL AND role = $2)",
        )
        .bind(ident.id)
        .bind(ident.role.as_deref())
        .execute(self.pool)
        .await?;

        tracing::debug!(?ident, "Removed system role");
        Ok(())
    }
}

/// Grant a role to a person on an existing connection, optionally scoped to
/// an organization.
pub(crate) async fn insert_grant_on(
    conn: &mut PgConnection,
    id_person: i64,
    id_role: i64,
    id_organization: Option<i64>,
) -> Result<(), DbError> {
    sqlx::query(
        r"INSERT INTO person_system_role (id_person, id_role, id_organization)
          VALUES ($1, $2, $3)",
    )
    .bind(id_person)
    .bind(id_role)
    .bind(id_organization)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// A row from the `system_role` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SystemRoleRow {
    /// Database-assigned id.
    pub id: i64,
    /// Globally unique role name.
    pub role: String,
    /// What the role permits.
    pub description: String,
}
