//! Person store: volunteers, their memberships, and their role grants.
//!
//! `create` is deliberately idempotent on email. Re-submitting a person
//! replaces their core fields, memberships, and role grants in one
//! transaction, so a partially-edited roster upload can simply be run again.
//! The TOTP secret is stored verbatim but stripped from the API projection.

use std::collections::BTreeMap;

use chrono::{Duration, Utc};
use rallypoint_types::{
    MembershipData, PersonApi, PersonIdentifier, PersonInsert, RecordIdentifier,
};
use sqlx::{PgConnection, PgPool};

use crate::error::DbError;
use crate::event::{self, EventRow};
use crate::organization::OrganizationRow;
use crate::organization_person;
use crate::resolve;
use crate::system_role::{self, SystemRoleRow};

/// Default width of the upcoming-events window, in days.
pub const DEFAULT_UPCOMING_WINDOW_DAYS: i64 = 7;

/// Operations on the `person` table and its association tables.
pub struct PersonStore<'a> {
    pool: &'a PgPool,
    upcoming_window_days: i64,
}

impl<'a> PersonStore<'a> {
    /// Create a new person store bound to a connection pool.
    pub const fn new(pool: &'a PgPool) -> Self {
        Self {
            pool,
            upcoming_window_days: DEFAULT_UPCOMING_WINDOW_DAYS,
        }
    }

    /// Override the upcoming-events window width.
    #[must_use]
    pub const fn with_upcoming_window(mut self, days: i64) -> Self {
        self.upcoming_window_days = days;
        self
    }

    /// Create a person, idempotent on email.
    ///
    /// In one transaction: the person row is upserted by email, every
    /// existing membership and role grant is dropped, and the associations
    /// named in the payload are created from scratch. Membership keys are
    /// organization refs; role names must already exist in `system_role`.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::MissingReference`] when a membership key or role
    /// name matches nothing, or [`DbError::Postgres`] on failure. Nothing is
    /// committed on error.
    pub async fn create(&self, person: &PersonInsert) -> Result<PersonRecord, DbError> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, PersonRow>(
            r"INSERT INTO person (email, totpsecret)
              VALUES ($1, $2)
              ON CONFLICT (email) DO UPDATE SET totpsecret = EXCLUDED.totpsecret
              RETURNING id, email, totpsecret",
        )
        .bind(&person.email)
        .bind(&person.totpsecret)
        .fetch_one(&mut *tx)
        .await?;

        // Associations are replaced wholesale, not merged.
        sqlx::query(r"DELETE FROM organization_person WHERE id_person = $1")
            .bind(row.id)
            .execute(&mut *tx)
            .await?;
        sqlx::query(r"DELETE FROM person_system_role WHERE id_person = $1")
            .bind(row.id)
            .execute(&mut *tx)
            .await?;

        for (org_ref, data) in &person.organization {
            let id_organization: Option<(i64,)> =
                sqlx::query_as(r"SELECT id FROM organization WHERE id_ref = $1")
                    .bind(org_ref)
                    .fetch_optional(&mut *tx)
                    .await?;
            let Some((id_organization,)) = id_organization else {
                return Err(DbError::MissingReference {
                    entity: "organization",
                    id_ref: org_ref.clone(),
                });
            };
            organization_person::upsert_membership_on(&mut tx, id_organization, row.id, data)
                .await?;
        }

        for role in &person.roles {
            let id_role: Option<(i64,)> =
                sqlx::query_as(r"SELECT id FROM system_role WHERE role = $1")
                    .bind(role)
                    .fetch_optional(&mut *tx)
                    .await?;
            let Some((id_role,)) = id_role else {
                return Err(DbError::MissingReference {
                    entity: "system role",
                    id_ref: role.clone(),
                });
            };
            system_role::insert_grant_on(&mut tx, row.id, id_role, None).await?;
        }

        let record = load_record(
            &mut tx,
            row,
            &GetPersonParams {
                person: PersonIdentifier::default(),
                include_organizations: true,
                include_events: false,
                include_roles: true,
            },
            self.upcoming_window_days,
        )
        .await?;
        tx.commit().await?;

        tracing::info!(
            id = record.person.id,
            email = %record.person.email,
            memberships = record.memberships.len(),
            roles = record.roles.len(),
            "Upserted person"
        );
        Ok(record)
    }

    /// Fetch a person with the associations the params ask for.
    ///
    /// Returns `Ok(None)` when no person matches the identifier.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::UnresolvableIdentifier`] when the identifier
    /// carries neither an id nor an email, or [`DbError::Postgres`] if a
    /// query fails.
    pub async fn get(&self, params: &GetPersonParams) -> Result<Option<PersonRecord>, DbError> {
        let mut conn = self.pool.acquire().await?;

        let Some(row) = fetch_person_row(&mut conn, &params.person).await? else {
            return Ok(None);
        };

        let record = load_record(&mut conn, row, params, self.upcoming_window_days).await?;
        Ok(Some(record))
    }

    /// True when the person holds a membership in the organization.
    ///
    /// Unknown emails or refs count as "not a member" rather than erroring,
    /// so the check is safe to run on unauthenticated input.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::UnresolvableIdentifier`] when either identifier is
    /// empty, or [`DbError::Postgres`] if the query fails.
    pub async fn is_person_in_org(
        &self,
        person: &PersonIdentifier,
        organization: &RecordIdentifier,
    ) -> Result<bool, DbError> {
        if !person.is_resolvable() {
            return Err(DbError::UnresolvableIdentifier { entity: "person" });
        }
        if !organization.is_resolvable() {
            return Err(DbError::UnresolvableIdentifier {
                entity: "organization",
            });
        }

        let row: (bool,) = sqlx::query_as(
            r"SELECT EXISTS (
                SELECT 1 FROM organization_person op
                JOIN person p ON p.id = op.id_person
                JOIN organization o ON o.id = op.id_organization
                WHERE (($1::BIGINT IS NOT NULL AND p.id = $1)
                       OR ($1::BIGINT IS NULL AND p.email = $2))
                  AND (($3::BIGINT IS NOT NULL AND o.id = $3)
                       OR ($3::BIGINT IS NULL AND o.id_ref = $4))
              )",
        )
        .bind(person.id)
        .bind(person.email.as_deref())
        .bind(organization.id)
        .bind(organization.id_ref.as_deref())
        .fetch_one(self.pool)
        .await?;

        Ok(row.0)
    }

    /// Fetch the person's upcoming events, grouped by membership
    /// organization and ordered soonest first within each group.
    ///
    /// "Upcoming" means a start date inside `[now, now + window)`. Every
    /// membership appears in the result, including those with no events in
    /// the window.
    ///
    /// # Errors
    ///
    /// Returns resolver errors when the person cannot be resolved, or
    /// [`DbError::Postgres`] if a query fails.
    pub async fn upcoming_events(
        &self,
        person: &PersonIdentifier,
    ) -> Result<Vec<OrganizationEvents>, DbError> {
        let mut conn = self.pool.acquire().await?;
        let id_person = resolve::resolve_person(&mut conn, person).await?;

        let memberships = fetch_memberships(&mut conn, id_person).await?;

        let now = Utc::now();
        let until = window_end(now, self.upcoming_window_days);

        let mut result = Vec::with_capacity(memberships.len());
        for membership in memberships {
            let events =
                event::in_window_for_organization_on(&mut conn, membership.organization.id, now, until)
                    .await?;
            result.push(OrganizationEvents {
                organization: membership.organization,
                events,
            });
        }

        Ok(result)
    }

    /// Delete a person and, via cascade, their memberships and role grants.
    ///
    /// # Errors
    ///
    /// Returns resolver errors when the person cannot be resolved, or
    /// [`DbError::Postgres`] if the delete fails.
    pub async fn remove(&self, person: &PersonIdentifier) -> Result<(), DbError> {
        let mut conn = self.pool.acquire().await?;
        let id = resolve::resolve_person(&mut conn, person).await?;

        sqlx::query(r"DELETE FROM person WHERE id = $1")
            .bind(id)
            .execute(&mut *conn)
            .await?;

        tracing::debug!(id, "Removed person");
        Ok(())
    }
}

/// What to load alongside the person row.
#[derive(Debug, Clone)]
pub struct GetPersonParams {
    /// Who to fetch.
    pub person: PersonIdentifier,
    /// Load memberships with their organizations. On by default.
    pub include_organizations: bool,
    /// Load each membership's upcoming events. Implies organizations.
    pub include_events: bool,
    /// Load granted system roles.
    pub include_roles: bool,
}

impl GetPersonParams {
    /// Params for one person with memberships and nothing else.
    pub const fn new(person: PersonIdentifier) -> Self {
        Self {
            person,
            include_organizations: true,
            include_events: false,
            include_roles: false,
        }
    }

    /// Also load each membership's upcoming events.
    #[must_use]
    pub const fn with_events(mut self) -> Self {
        self.include_events = true;
        self
    }

    /// Also load granted system roles.
    #[must_use]
    pub const fn with_roles(mut self) -> Self {
        self.include_roles = true;
        self
    }
}

/// A person with whatever associations the caller asked for.
#[derive(Debug, Clone)]
pub struct PersonRecord {
    /// The person row itself.
    pub person: PersonRow,
    /// Memberships, one per organization, ordered by organization ref.
    pub memberships: Vec<Membership>,
    /// Granted system roles, ordered by role name.
    pub roles: Vec<SystemRoleRow>,
}

impl PersonRecord {
    /// The outward-facing projection: everything except the TOTP secret,
    /// with memberships flattened to a ref-keyed map.
    pub fn api_friendly(&self) -> PersonApi {
        let organization: BTreeMap<String, MembershipData> = self
            .memberships
            .iter()
            .map(|m| {
                (
                    m.organization.id_ref.clone(),
                    MembershipData {
                        addl_info: m.addl_info.clone(),
                    },
                )
            })
            .collect();

        PersonApi {
            email: self.person.email.clone(),
            organization,
            roles: self.roles.iter().map(|r| r.role.clone()).collect(),
        }
    }
}

/// One membership of a person, with the organization it points at.
#[derive(Debug, Clone)]
pub struct Membership {
    /// The organization the person belongs to.
    pub organization: OrganizationRow,
    /// Free-form org-specific profile.
    pub addl_info: Option<serde_json::Value>,
    /// The organization's upcoming events, when asked for. Empty otherwise.
    pub events: Vec<EventRow>,
}

/// One organization's upcoming events for a person.
#[derive(Debug, Clone)]
pub struct OrganizationEvents {
    /// The membership organization.
    pub organization: OrganizationRow,
    /// Events starting inside the window, soonest first.
    pub events: Vec<EventRow>,
}

/// A row from the `person` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PersonRow {
    /// Database-assigned id.
    pub id: i64,
    /// Email address, globally unique.
    pub email: String,
    /// TOTP shared secret. Never part of the API projection.
    pub totpsecret: String,
}

/// The exclusive end of an upcoming-events window starting at `from`.
fn window_end(
    from: chrono::DateTime<Utc>,
    window_days: i64,
) -> chrono::DateTime<Utc> {
    from.checked_add_signed(Duration::days(window_days))
        .unwrap_or(chrono::DateTime::<Utc>::MAX_UTC)
}

/// Fetch a bare person row by id or email.
async fn fetch_person_row(
    conn: &mut PgConnection,
    ident: &PersonIdentifier,
) -> Result<Option<PersonRow>, DbError> {
    if let Some(id) = ident.id {
        let row =
            sqlx::query_as::<_, PersonRow>(r"SELECT id, email, totpsecret FROM person WHERE id = $1")
                .bind(id)
                .fetch_optional(&mut *conn)
                .await?;
        return Ok(row);
    }
    let Some(email) = ident.email.as_deref() else {
        return Err(DbError::UnresolvableIdentifier { entity: "person" });
    };

    let row = sqlx::query_as::<_, PersonRow>(
        r"SELECT id, email, totpsecret FROM person WHERE email = $1",
    )
    .bind(email)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(row)
}

/// Joined row from `organization_person` and `organization`.
#[derive(Debug, sqlx::FromRow)]
struct MembershipJoinRow {
    id: i64,
    id_ref: String,
    name: String,
    description: Option<String>,
    addl_info: Option<serde_json::Value>,
}

/// Load a person's memberships, ordered by organization ref.
async fn fetch_memberships(
    conn: &mut PgConnection,
    id_person: i64,
) -> Result<Vec<Membership>, DbError> {
    let rows = sqlx::query_as::<_, MembershipJoinRow>(
        r"SELECT o.id, o.id_ref, o.name, o.description, op.addl_info
          FROM organization_person op
          JOIN organization o ON o.id = op.id_organization
          WHERE op.id_person = $1
          ORDER BY o.id_ref",
    )
    .bind(id_person)
    .fetch_all(&mut *conn)
    .await?;

    Ok(rows
        .into_iter()
        .map(|r| Membership {
            organization: OrganizationRow {
                id: r.id,
                id_ref: r.id_ref,
                name: r.name,
                description: r.description,
            },
            addl_info: r.addl_info,
            events: Vec::new(),
        })
        .collect())
}

/// Assemble a [`PersonRecord`] around an already-fetched person row.
async fn load_record(
    conn: &mut PgConnection,
    person: PersonRow,
    params: &GetPersonParams,
    upcoming_window_days: i64,
) -> Result<PersonRecord, DbError> {
    let mut memberships = if params.include_organizations || params.include_events {
        fetch_memberships(&mut *conn, person.id).await?
    } else {
        Vec::new()
    };

    if params.include_events {
        let now = Utc::now();
        let until = window_end(now, upcoming_window_days);
        for membership in &mut memberships {
            membership.events =
                event::in_window_for_organization_on(&mut *conn, membership.organization.id, now, until)
                    .await?;
        }
    }

    let roles = if params.include_roles {
        sqlx::query_as::<_, SystemRoleRow>(
            r"SELECT sr.id, sr.role, sr.description
              FROM person_system_role psr
              JOIN system_role sr ON sr.id = psr.id_role
              WHERE psr.id_person = $1
              ORDER BY sr.role",
        )
        .bind(person.id)
        .fetch_all(&mut *conn)
        .await?
    } else {
        Vec::new()
    };

    Ok(PersonRecord {
        person,
        memberships,
        roles,
    })
}
