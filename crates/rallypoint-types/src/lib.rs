//! Shared type definitions for the Rallypoint volunteer-coordination core.
//!
//! This crate is the single source of truth for the shapes that cross the
//! data-layer boundary: record identifiers (numeric id or human-assigned
//! ref, optionally scoped to a parent), insert/update payloads, and the
//! API-friendly person projection.
//!
//! # Modules
//!
//! - [`identifier`] -- id-or-ref identifier structs and their validity rules
//! - [`payload`] -- insert/update payloads, including the nested event
//!   document consumed by the batch importer

pub mod identifier;
pub mod payload;

// Re-export all public types at crate root for convenience.
pub use identifier::{
    EventCategoryIdentifier, EventIdentifier, EventPositionIdentifier, EventRoleIdentifier,
    PersonIdentifier, RecordIdentifier, SystemRoleIdentifier,
};
pub use payload::{
    EventCategoryInsert, EventCategoryUpdate, EventInsert, EventPositionInsert,
    EventPositionSpec, EventPositionUpdate, EventRoleInsert, EventRoleSpec, EventRoleUpdate,
    EventUpdate, MembershipData, OrganizationInsert, OrganizationUpdate, PersonApi, PersonInsert,
    RouteDeliverySpec, RouteSpec, SystemRoleInsert,
};
