//! Organization store: the root entity of the scoping hierarchy.
//!
//! Organizations are the only ref-bearing entity with no parent, so their
//! refs are globally unique and every lookup is a single-table affair.
//! Deleting an organization cascades through categories, events, roles,
//! positions, routes, and memberships via the schema's foreign keys.

use rallypoint_types::{OrganizationInsert, OrganizationUpdate, RecordIdentifier};
use sqlx::PgPool;

use crate::error::DbError;

/// Operations on the `organization` table.
pub struct OrganizationStore<'a> {
    pool: &'a PgPool,
}

impl<'a> OrganizationStore<'a> {
    /// Create a new organization store bound to a connection pool.
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Create an organization.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the insert fails, including when the
    /// ref is already taken.
    pub async fn create(&self, org: &OrganizationInsert) -> Result<OrganizationRow, DbError> {
        let row = sqlx::query_as::<_, OrganizationRow>(
            r"INSERT INTO organization (id_ref, name, description)
              VALUES ($1, $2, $3)
              RETURNING id, id_ref, name, description",
        )
        .bind(&org.id_ref)
        .bind(&org.name)
        .bind(&org.description)
        .fetch_one(self.pool)
        .await?;

        tracing::debug!(id = row.id, id_ref = %row.id_ref, "Created organization");
        Ok(row)
    }

    /// Fetch an organization by id or ref.
    ///
    /// Returns `Ok(None)` when no row matches; a malformed identifier is an
    /// error, not a miss.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::UnresolvableIdentifier`] when the identifier is
    /// empty, or [`DbError::Postgres`] if the query fails.
    pub async fn get(
        &self,
        ident: &RecordIdentifier,
    ) -> Result<Option<OrganizationRow>, DbError> {
        let row = if let Some(id) = ident.id {
            sqlx::query_as::<_, OrganizationRow>(
                r"SELECT id, id_ref, name, description FROM organization WHERE id = $1",
            )
            .bind(id)
            .fetch_optional(self.pool)
            .await?
        } else if let Some(id_ref) = ident.id_ref.as_deref() {
            sqlx::query_as::<_, OrganizationRow>(
                r"SELECT id, id_ref, name, description FROM organization WHERE id_ref = $1",
            )
            .bind(id_ref)
            .fetch_optional(self.pool)
            .await?
        } else {
            return Err(DbError::UnresolvableIdentifier {
                entity: "organization",
            });
        };

        Ok(row)
    }

    /// Apply a partial update to an organization. Absent fields are left
    /// untouched; the ref is never changed.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::UnresolvableIdentifier`] when the identifier is
    /// empty, or [`DbError::Postgres`] if the update fails.
    pub async fn update(
        &self,
        ident: &RecordIdentifier,
        update: &OrganizationUpdate,
    ) -> Result<(), DbError> {
        if !ident.is_resolvable() {
            return Err(DbError::UnresolvableIdentifier {
                entity: "organization",
            });
        }

        sqlx::query(
            r"UPDATE organization
              SET name = COALESCE($1, name),
                  description = COALESCE($2, description)
              WHERE ($3::BIGINT IS NOT NULL AND id = $3)
                 OR ($3::BIGINT IS NULL AND id_ref = $4)",
        )
        .bind(&update.name)
        .bind(&update.description)
        .bind(ident.id)
        .bind(ident.id_ref.as_deref())
        .execute(self.pool)
        .await?;

        Ok(())
    }

    /// Delete an organization and, via cascade, everything scoped under it.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::UnresolvableIdentifier`] when the identifier is
    /// empty, or [`DbError::Postgres`] if the delete fails.
    pub async fn remove(&self, ident: &RecordIdentifier) -> Result<(), DbError> {
        if !ident.is_resolvable() {
            return Err(DbError::UnresolvableIdentifier {
                entity: "organization",
            });
        }

        sqlx::query(
            r"DELETE FROM organization
              WHERE ($1::BIGINT IS NOT NULL AND id = $1)
                 OR ($1::BIGINT IS NULL AND id_ref = $2)",
        )
        .bind(ident.id)
        .bind(ident.id_ref.as_deref())
        .execute(self.pool)
        .await?;

        tracing::debug!(?ident, "Removed organization");
        Ok(())
    }
}

/// A row from the `organization` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct OrganizationRow {
    /// Database-assigned id.
    pub id: i64,
    /// Globally unique human-assigned ref.
    pub id_ref: String,
    /// Display name.
    pub name: String,
    /// Optional description.
    pub description: Option<String>,
}
