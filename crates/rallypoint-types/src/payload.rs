//! Insert and update payloads crossing the data-layer boundary.
//!
//! Insert payloads carry the fields of one new row plus identifiers for the
//! parents it connects to. The event insert additionally accepts a nested
//! role/position/route subtree, which is the same document shape the batch
//! importer consumes. Update payloads are partial: absent fields are left
//! untouched, and parent scope is only ever changed by passing the new
//! parent identifier explicitly.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::identifier::{EventIdentifier, EventRoleIdentifier, RecordIdentifier};

/// Payload for creating an organization.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct OrganizationInsert {
    /// Globally unique human-assigned reference.
    #[validate(length(min = 1))]
    pub id_ref: String,
    /// Display name.
    pub name: String,
    /// Optional description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Partial payload for updating an organization.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrganizationUpdate {
    /// New display name, if changing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// New description, if changing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Payload for creating an event category under an organization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventCategoryInsert {
    /// Reference, unique within the organization.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id_ref: Option<String>,
    /// Display name.
    pub name: String,
    /// Optional description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Owning organization, by id or ref. Never defaulted.
    pub organization: RecordIdentifier,
}

/// Partial payload for updating an event category.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventCategoryUpdate {
    /// New display name, if changing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// New description, if changing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Payload for creating an event, optionally with its full role subtree.
///
/// This same shape serves as the batch-import document: the importer applies
/// it with upsert-and-prune semantics, whereas `create` applies it as a plain
/// insert with nested child creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventInsert {
    /// Reference, unique within the organization.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id_ref: Option<String>,
    /// Display name.
    pub name: String,
    /// Optional description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// When the event starts.
    pub start_date: DateTime<Utc>,
    /// When the event ends, if bounded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<DateTime<Utc>>,
    /// Whether the event spans the whole day.
    #[serde(default)]
    pub all_day: bool,
    /// Free-form organization-specific payload, stored verbatim.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub addl_info: Option<serde_json::Value>,
    /// Owning organization, by id or ref. Never defaulted.
    pub organization: RecordIdentifier,
    /// Optional category, resolved within the same organization.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<RecordIdentifier>,
    /// Nested roles to upsert under the new event.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub roles: Vec<EventRoleSpec>,
}

/// Partial payload for updating an event.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventUpdate {
    /// New display name, if changing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// New description, if changing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// New start, if changing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<DateTime<Utc>>,
    /// New end, if changing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<DateTime<Utc>>,
    /// New all-day flag, if changing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub all_day: Option<bool>,
    /// New free-form payload, if changing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub addl_info: Option<serde_json::Value>,
    /// New category, resolved within the event's organization.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<RecordIdentifier>,
}

/// One role in a nested event document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventRoleSpec {
    /// Reference, unique within the event.
    pub id_ref: String,
    /// Display name.
    pub name: String,
    /// Optional description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// How many unassigned volunteers this role needs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub general_volunteers_needed: Option<i32>,
    /// Nested positions to upsert under this role.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub positions: Vec<EventPositionSpec>,
}

/// One position in a nested event document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventPositionSpec {
    /// Reference, unique within the event.
    pub id_ref: String,
    /// Display name.
    pub name: String,
    /// Optional description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Optional delivery route attached to this position.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub route: Option<RouteSpec>,
}

/// A delivery route in a nested event document.
///
/// Routes are create-only: the importer replaces a position's route wholesale
/// rather than editing it in place. The route ref is derived from the
/// position ref, so the spec carries none of its own.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteSpec {
    /// Display name.
    pub name: String,
    /// Opaque distance payload (e.g. value + unit), stored verbatim.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distance: Option<serde_json::Value>,
    /// Passcode gating access to the route details.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub passcode: Option<String>,
    /// Stops in delivery order; sequence numbers come from this ordering.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub deliveries: Vec<RouteDeliverySpec>,
}

/// One stop on a delivery route.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteDeliverySpec {
    /// Recipient name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Street address.
    pub address: String,
    /// Google plus code for the address.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plus_code: Option<String>,
    /// Number of portions to deliver.
    pub portions: i32,
    /// Contact phone number.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    /// Allergy notes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allergies: Option<String>,
    /// Free-form delivery notes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    /// What to do when the recipient is not home.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub when_not_home: Option<String>,
}

/// Payload for creating an event role directly (outside a nested document).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventRoleInsert {
    /// Reference, unique within the event.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id_ref: Option<String>,
    /// Display name.
    pub name: String,
    /// Optional description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// How many unassigned volunteers this role needs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub general_volunteers_needed: Option<i32>,
    /// Owning event, by id or ref + organization. Never defaulted.
    pub event: EventIdentifier,
}

/// Partial payload for updating an event role.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventRoleUpdate {
    /// New display name, if changing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// New description, if changing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// New volunteer count, if changing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub general_volunteers_needed: Option<i32>,
}

/// Payload for creating an event position directly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventPositionInsert {
    /// Reference, unique within the event.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id_ref: Option<String>,
    /// Display name.
    pub name: String,
    /// Optional description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Owning event, by id or ref + organization. Never defaulted.
    pub event: EventIdentifier,
    /// Optional owning role, resolved within the same event.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<EventRoleIdentifier>,
}

/// Partial payload for updating an event position.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventPositionUpdate {
    /// New display name, if changing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// New description, if changing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// New owning role, resolved within the position's event.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<EventRoleIdentifier>,
}

/// Per-organization membership data for one person.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MembershipData {
    /// Free-form org-specific profile (e.g. a nickname), stored verbatim.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub addl_info: Option<serde_json::Value>,
}

/// Payload for creating (or idempotently re-creating) a person.
///
/// `create` upserts by email: an existing person with the same email has
/// their core fields and associations replaced instead of the insert failing
/// on the uniqueness constraint.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct PersonInsert {
    /// Email address, globally unique.
    #[validate(email)]
    pub email: String,
    /// TOTP shared secret. Stored opaquely; never echoed back by the API
    /// projection.
    pub totpsecret: String,
    /// Memberships keyed by organization ref.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub organization: BTreeMap<String, MembershipData>,
    /// Names of system roles to grant. Each role must already exist.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub roles: Vec<String>,
}

/// The person projection returned to API callers.
///
/// Mirrors [`PersonInsert`] minus the authentication secret, so that the
/// projection of a created person round-trips the `organization` and `roles`
/// fields originally supplied.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonApi {
    /// Email address.
    pub email: String,
    /// Memberships keyed by organization ref.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub organization: BTreeMap<String, MembershipData>,
    /// Granted system role names.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub roles: Vec<String>,
}

/// Payload for creating a system role (idempotent on role name).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemRoleInsert {
    /// Role name, globally unique.
    pub role: String,
    /// What the role permits.
    pub description: String,
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn event_document_deserializes_with_nested_subtree() {
        let doc: EventInsert = serde_json::from_str(
            r#"{
                "id_ref": "mealdelivery-03-02",
                "name": "Meal prep & delivery Feb 03",
                "start_date": "2026-02-03T10:00:00Z",
                "organization": {"id_ref": "thf"},
                "category": {"id_ref": "meal-prep-delivery"},
                "roles": [
                    {
                        "id_ref": "delivery",
                        "name": "Meal delivery",
                        "positions": [
                            {
                                "id_ref": "mill-rd",
                                "name": "Mill Rd.",
                                "route": {
                                    "name": "Mill Rd. loop",
                                    "deliveries": [
                                        {"address": "1 Mill Rd", "portions": 2},
                                        {"address": "9 Mill Rd", "portions": 1}
                                    ]
                                }
                            }
                        ]
                    }
                ]
            }"#,
        )
        .unwrap();

        assert_eq!(doc.roles.len(), 1);
        let role = doc.roles.first().unwrap();
        assert_eq!(role.id_ref, "delivery");
        let position = role.positions.first().unwrap();
        assert_eq!(position.id_ref, "mill-rd");
        let route = position.route.as_ref().unwrap();
        assert_eq!(route.deliveries.len(), 2);
        assert!(!doc.all_day);
    }

    #[test]
    fn person_insert_validates_email() {
        let person = PersonInsert {
            email: "not-an-email".to_owned(),
            totpsecret: "abcdefg".to_owned(),
            organization: BTreeMap::new(),
            roles: Vec::new(),
        };
        assert!(person.validate().is_err());

        let person = PersonInsert {
            email: "volunteer@example.org".to_owned(),
            ..person
        };
        assert!(person.validate().is_ok());
    }

    #[test]
    fn person_api_omits_secret_field() {
        let api = PersonApi {
            email: "volunteer@example.org".to_owned(),
            organization: BTreeMap::new(),
            roles: vec!["event-admin".to_owned()],
        };
        let json = serde_json::to_value(&api).unwrap();
        assert!(json.get("totpsecret").is_none());
        assert_eq!(json["roles"][0], "event-admin");
    }
}
