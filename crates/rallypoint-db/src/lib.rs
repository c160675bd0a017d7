//! Data layer for the Rallypoint volunteer coordination system
//! (`PostgreSQL`).
//!
//! Everything lives in one relational hierarchy: organizations own
//! categories and events, events own roles and positions, positions carry
//! at most one delivery route with its ordered stops. People hold
//! memberships in organizations and grants of system roles. Every entity is
//! addressable by its database id or by a human-assigned ref scoped to its
//! parent, and every store funnels identifiers through the [`resolve`]
//! module before touching a row.
//!
//! # Architecture
//!
//! ```text
//! organization
//!     |-- event_category
//!     +-- event
//!         |-- event_role
//!         +-- event_position -- route -- route_delivery
//!
//! person -- organization_person --> organization
//!        -- person_system_role --> system_role
//! ```
//!
//! # Modules
//!
//! - [`postgres`] -- `PostgreSQL` connection pool and configuration
//! - [`resolve`] -- id-or-ref identifier resolution
//! - [`organization`], [`event_category`], [`event`] -- the event hierarchy
//! - [`event_role`], [`event_position`], [`route`] -- the nested subtree
//! - [`person`], [`organization_person`], [`system_role`] -- people
//! - [`import`] -- upsert-and-prune batch import of event documents
//! - [`error`] -- Shared error types

pub mod error;
pub mod event;
pub mod event_category;
pub mod event_position;
pub mod event_role;
pub mod import;
pub mod organization;
pub mod organization_person;
pub mod person;
pub mod postgres;
pub mod resolve;
pub mod route;
pub mod system_role;

// Re-export primary types for convenience.
pub use error::DbError;
pub use event::{EventRow, EventStore};
pub use event_category::{EventCategoryRow, EventCategoryStore};
pub use event_position::{EventPositionRow, EventPositionStore};
pub use event_role::{EventRoleRow, EventRoleStore};
pub use import::{EventImporter, ImportSummary};
pub use organization::{OrganizationRow, OrganizationStore};
pub use organization_person::{OrganizationPersonRow, OrganizationPersonStore};
pub use person::{
    DEFAULT_UPCOMING_WINDOW_DAYS, GetPersonParams, Membership, OrganizationEvents, PersonRecord,
    PersonRow, PersonStore,
};
pub use postgres::{PostgresConfig, PostgresPool};
pub use route::{RouteDeliveryRow, RouteRow, RouteStore};
pub use system_role::{SystemRoleRow, SystemRoleStore};
