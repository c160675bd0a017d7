//! Batch import: reconciling an event document against the database.
//!
//! The importer consumes the same nested document shape as
//! [`EventStore::create`](crate::EventStore::create) but applies it with
//! upsert-and-prune semantics: every role, position, and route in the
//! document is created or updated by ref, every previously-imported role or
//! position of the event whose ref is absent from the document is deleted,
//! and a position whose spec carries no route loses its route. The document
//! is the complete desired state of the event, and one import is one
//! transaction.

use rallypoint_types::{EventIdentifier, EventInsert};
use sqlx::PgPool;

use crate::error::DbError;
use crate::event::{self, EventRow};
use crate::{event_position, event_role, resolve, route};

/// Applies event documents with upsert-and-prune semantics.
pub struct EventImporter<'a> {
    pool: &'a PgPool,
}

impl<'a> EventImporter<'a> {
    /// Create a new importer bound to a connection pool.
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Reconcile one event document, in one transaction.
    ///
    /// The document must carry an event ref; the event is upserted by that
    /// ref within its organization, the nested subtree is upserted by ref,
    /// and roles and positions missing from the document are pruned.
    /// A surviving position whose spec omits its route has the route
    /// deleted. Children without a ref are never pruned, since they cannot
    /// have come from an import.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::UnresolvableIdentifier`] for a document without a
    /// ref, resolver errors for a bad organization or category reference, or
    /// [`DbError::Postgres`] on failure. Nothing is committed on error.
    pub async fn import(&self, document: &EventInsert) -> Result<ImportSummary, DbError> {
        if document.id_ref.is_none() {
            return Err(DbError::UnresolvableIdentifier { entity: "event" });
        }

        let mut tx = self.pool.begin().await?;

        let row = event::upsert_on(&mut tx, &EventIdentifier::default(), document).await?;
        event::apply_children_on(&mut tx, &row, document).await?;

        // A position spec without a route means the position has none; drop
        // whatever an earlier import attached.
        for role in &document.roles {
            for position in &role.positions {
                if position.route.is_none() {
                    let id_position =
                        resolve::resolve_position_in_event(&mut tx, row.id, &position.id_ref)
                            .await?;
                    route::remove_for_position_on(&mut tx, id_position).await?;
                }
            }
        }

        let role_refs: Vec<String> = document.roles.iter().map(|r| r.id_ref.clone()).collect();
        let position_refs: Vec<String> = document
            .roles
            .iter()
            .flat_map(|r| r.positions.iter().map(|p| p.id_ref.clone()))
            .collect();

        let roles_pruned = event_role::delete_not_in_refs_on(&mut tx, row.id, &role_refs).await?;
        let positions_pruned =
            event_position::delete_not_in_refs_on(&mut tx, row.id, &position_refs).await?;

        tx.commit().await?;

        let summary = ImportSummary {
            event: row,
            roles_upserted: role_refs.len(),
            positions_upserted: position_refs.len(),
            roles_pruned,
            positions_pruned,
        };
        tracing::info!(
            id = summary.event.id,
            id_ref = ?summary.event.id_ref,
            roles = summary.roles_upserted,
            positions = summary.positions_upserted,
            roles_pruned = summary.roles_pruned,
            positions_pruned = summary.positions_pruned,
            "Imported event document"
        );
        Ok(summary)
    }

    /// Reconcile a sequence of event documents, each in its own
    /// transaction.
    ///
    /// Stops at the first failure; documents already imported stay
    /// committed.
    ///
    /// # Errors
    ///
    /// Returns the first error encountered. See [`Self::import`].
    pub async fn import_all(
        &self,
        documents: &[EventInsert],
    ) -> Result<Vec<ImportSummary>, DbError> {
        let mut summaries = Vec::with_capacity(documents.len());
        for document in documents {
            summaries.push(self.import(document).await?);
        }
        Ok(summaries)
    }
}

/// What one document import did.
#[derive(Debug, Clone)]
pub struct ImportSummary {
    /// The event row after the upsert.
    pub event: EventRow,
    /// Roles created or updated from the document.
    pub roles_upserted: usize,
    /// Positions created or updated from the document.
    pub positions_upserted: usize,
    /// Roles deleted because their ref was absent from the document.
    pub roles_pruned: u64,
    /// Positions deleted because their ref was absent from the document.
    pub positions_pruned: u64,
}
