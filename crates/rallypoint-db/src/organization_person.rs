//! Organization membership store.
//!
//! An `organization_person` row links one person to one organization and
//! carries the org-specific profile blob. The pair is unique; creating a
//! link that already exists replaces the profile instead of failing.

use rallypoint_types::{MembershipData, PersonIdentifier, RecordIdentifier};
use sqlx::{PgConnection, PgPool};

use crate::error::DbError;
use crate::resolve;

/// Operations on the `organization_person` table.
pub struct OrganizationPersonStore<'a> {
    pool: &'a PgPool,
}

impl<'a> OrganizationPersonStore<'a> {
    /// Create a new membership store bound to a connection pool.
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Link a person to an organization, idempotent on the pair.
    ///
    /// An existing link has its profile data replaced.
    ///
    /// # Errors
    ///
    /// Returns resolver errors when either side of the link cannot be
    /// resolved, or [`DbError::Postgres`] if the upsert fails.
    pub async fn create(
        &self,
        organization: &RecordIdentifier,
        person: &PersonIdentifier,
        data: &MembershipData,
    ) -> Result<OrganizationPersonRow, DbError> {
        let mut conn = self.pool.acquire().await?;
        let id_organization = resolve::resolve_organization(&mut conn, organization).await?;
        let id_person = resolve::resolve_person(&mut conn, person).await?;

        let row = upsert_membership_on(&mut conn, id_organization, id_person, data).await?;

        tracing::debug!(id_organization, id_person, "Linked person to organization");
        Ok(row)
    }

    /// Fetch the membership link between a person and an organization, if
    /// any.
    ///
    /// # Errors
    ///
    /// Returns resolver errors when either identifier cannot be resolved, or
    /// [`DbError::Postgres`] if the query fails.
    pub async fn get(
        &self,
        organization: &RecordIdentifier,
        person: &PersonIdentifier,
    ) -> Result<Option<OrganizationPersonRow>, DbError> {
        let mut conn = self.pool.acquire().await?;
        let id_organization = resolve::resolve_organization(&mut conn, organization).await?;
        let id_person = resolve::resolve_person(&mut conn, person).await?;

        let row = sqlx::query_as::<_, OrganizationPersonRow>(
            r"SELECT id, id_organization, id_person, addl_info
              FROM organization_person
              WHERE id_organization = $1 AND id_person = $2",
        )
        .bind(id_organization)
        .bind(id_person)
        .fetch_optional(&mut *conn)
        .await?;

        Ok(row)
    }

    /// Sever the link between a person and an organization. The person row
    /// itself is untouched.
    ///
    /// # Errors
    ///
    /// Returns resolver errors when either identifier cannot be resolved, or
    /// [`DbError::Postgres`] if the delete fails.
    pub async fn remove(
        &self,
        organization: &RecordIdentifier,
        person: &PersonIdentifier,
    ) -> Result<(), DbError> {
        let mut conn = self.pool.acquire().await?;
        let id_organization = resolve::resolve_organization(&mut conn, organization).await?;
        let id_person = resolve::resolve_person(&mut conn, person).await?;

        sqlx::query(
            r"DELETE FROM organization_person WHERE id_organization = $1 AND id_person = $2",
        )
        .bind(id_organization)
        .bind(id_person)
        .execute(&mut *conn)
        .await?;

        tracing::debug!(id_organization, id_person, "Unlinked person from organization");
        Ok(())
    }
}

/// Upsert one membership link on an existing connection.
pub(crate) async fn upsert_membership_on(
    conn: &mut PgConnection,
    id_organization: i64,
    id_person: i64,
    data: &MembershipData,
) -> Result<OrganizationPersonRow, DbError> {
    let row = sqlx::query_as::<_, OrganizationPersonRow>(
        r"INSERT INTO organization_person (id_organization, id_person, addl_info)
          VALUES ($1, $2, $3)
          ON CONFLICT (id_organization, id_person) DO UPDATE SET
            addl_info = EXCLUDED.addl_info
          RETURNING id, id_organization, id_person, addl_info",
    )
    .bind(id_organization)
    .bind(id_person)
    .bind(&data.addl_info)
    .fetch_one(&mut *conn)
    .await?;

    Ok(row)
}

/// A row from the `organization_person` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct OrganizationPersonRow {
    /// Database-assigned id.
    pub id: i64,
    /// The organization side of the link.
    pub id_organization: i64,
    /// The person side of the link.
    pub id_person: i64,
    /// Free-form org-specific profile, returned verbatim.
    pub addl_info: Option<serde_json::Value>,
}
