//! Identifier structs addressing records by numeric id or human-assigned ref.
//!
//! Every entity can be addressed two ways: the opaque `BIGSERIAL` id the
//! database assigned on insert, or the `id_ref` string a human chose. Refs
//! are only unique within their scope (an event ref within its organization,
//! a role ref within its event), so a ref-only identifier must carry enough
//! parent context to be resolvable. The `is_resolvable` predicates encode
//! exactly that rule and are checked before any lookup is attempted.

use serde::{Deserialize, Serialize};

/// Identifier for a record addressable by id or by globally/parent-scoped ref.
///
/// Used directly for organizations (whose refs are globally unique) and as
/// the parent-scope component of the scoped identifiers below.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordIdentifier {
    /// Database-assigned numeric id. Authoritative when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    /// Human-assigned unique reference string.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id_ref: Option<String>,
}

impl RecordIdentifier {
    /// Build an identifier from a numeric id.
    pub const fn by_id(id: i64) -> Self {
        Self {
            id: Some(id),
            id_ref: None,
        }
    }

    /// Build an identifier from a ref string.
    pub fn by_ref(id_ref: impl Into<String>) -> Self {
        Self {
            id: None,
            id_ref: Some(id_ref.into()),
        }
    }

    /// True when either the id or the ref is present.
    pub const fn is_resolvable(&self) -> bool {
        self.id.is_some() || self.id_ref.is_some()
    }
}

/// Identifier for an event category, scoped to its organization.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventCategoryIdentifier {
    /// Database-assigned numeric id. Authoritative when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    /// Category ref, unique within the organization.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id_ref: Option<String>,
    /// Owning organization; required when addressing by ref.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organization: Option<RecordIdentifier>,
}

impl EventCategoryIdentifier {
    /// True when enough information is present to find a unique row.
    pub fn is_resolvable(&self) -> bool {
        self.id.is_some()
            || (self.id_ref.is_some()
                && self
                    .organization
                    .as_ref()
                    .is_some_and(RecordIdentifier::is_resolvable))
    }
}

/// Identifier for an event, scoped to its organization.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventIdentifier {
    /// Database-assigned numeric id. Authoritative when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    /// Event ref, unique within the organization.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id_ref: Option<String>,
    /// Owning organization; required when addressing by ref.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organization: Option<RecordIdentifier>,
}

impl EventIdentifier {
    /// Build an identifier from a numeric event id.
    pub const fn by_id(id: i64) -> Self {
        Self {
            id: Some(id),
            id_ref: None,
            organization: None,
        }
    }

    /// Build an identifier from an event ref plus its organization scope.
    pub fn by_ref(id_ref: impl Into<String>, organization: RecordIdentifier) -> Self {
        Self {
            id: None,
            id_ref: Some(id_ref.into()),
            organization: Some(organization),
        }
    }

    /// True when enough information is present to find a unique row.
    pub fn is_resolvable(&self) -> bool {
        self.id.is_some()
            || (self.id_ref.is_some()
                && self
                    .organization
                    .as_ref()
                    .is_some_and(RecordIdentifier::is_resolvable))
    }
}

/// Identifier for an event role, scoped to its event.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRoleIdentifier {
    /// Database-assigned numeric id. Authoritative when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    /// Role ref, unique within the event.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id_ref: Option<String>,
    /// Owning event; required when addressing by ref.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event: Option<EventIdentifier>,
}

impl EventRoleIdentifier {
    /// Build an identifier from a role ref plus its event scope.
    pub fn by_ref(id_ref: impl Into<String>, event: EventIdentifier) -> Self {
        Self {
            id: None,
            id_ref: Some(id_ref.into()),
            event: Some(event),
        }
    }

    /// True when enough information is present to find a unique row.
    ///
    /// A ref-only identifier needs its event, which in turn must be
    /// resolvable (by id, or by ref plus organization).
    pub fn is_resolvable(&self) -> bool {
        self.id.is_some()
            || (self.id_ref.is_some()
                && self.event.as_ref().is_some_and(EventIdentifier::is_resolvable))
    }
}

/// Identifier for an event position, scoped to its event.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventPositionIdentifier {
    /// Database-assigned numeric id. Authoritative when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    /// Position ref, unique within the event.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id_ref: Option<String>,
    /// Owning event; required when addressing by ref.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event: Option<EventIdentifier>,
}

impl EventPositionIdentifier {
    /// Build an identifier from a position ref plus its event scope.
    pub fn by_ref(id_ref: impl Into<String>, event: EventIdentifier) -> Self {
        Self {
            id: None,
            id_ref: Some(id_ref.into()),
            event: Some(event),
        }
    }

    /// True when enough information is present to find a unique row.
    pub fn is_resolvable(&self) -> bool {
        self.id.is_some()
            || (self.id_ref.is_some()
                && self.event.as_ref().is_some_and(EventIdentifier::is_resolvable))
    }
}

/// Identifier for a person, addressable by id or by globally unique email.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonIdentifier {
    /// Database-assigned numeric id. Authoritative when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    /// Email address, globally unique.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl PersonIdentifier {
    /// Build an identifier from a numeric person id.
    pub const fn by_id(id: i64) -> Self {
        Self {
            id: Some(id),
            email: None,
        }
    }

    /// Build an identifier from an email address.
    pub fn by_email(email: impl Into<String>) -> Self {
        Self {
            id: None,
            email: Some(email.into()),
        }
    }

    /// True when either the id or the email is present.
    pub const fn is_resolvable(&self) -> bool {
        self.id.is_some() || self.email.is_some()
    }
}

/// Identifier for a system role, addressable by id or by unique role name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemRoleIdentifier {
    /// Database-assigned numeric id. Authoritative when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    /// Role name, globally unique.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

impl SystemRoleIdentifier {
    /// Build an identifier from a role name.
    pub fn by_name(role: impl Into<String>) -> Self {
        Self {
            id: None,
            role: Some(role.into()),
        }
    }

    /// True when either the id or the role name is present.
    pub const fn is_resolvable(&self) -> bool {
        self.id.is_some() || self.role.is_some()
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn record_identifier_resolvable_forms() {
        assert!(RecordIdentifier::by_id(7).is_resolvable());
        assert!(RecordIdentifier::by_ref("thf").is_resolvable());
        assert!(!RecordIdentifier::default().is_resolvable());
    }

    #[test]
    fn event_identifier_ref_requires_organization() {
        let bare_ref = EventIdentifier {
            id_ref: Some("mealdelivery-03-02".to_owned()),
            ..EventIdentifier::default()
        };
        assert!(!bare_ref.is_resolvable());

        let scoped = EventIdentifier::by_ref("mealdelivery-03-02", RecordIdentifier::by_ref("thf"));
        assert!(scoped.is_resolvable());

        assert!(EventIdentifier::by_id(3).is_resolvable());
    }

    #[test]
    fn role_identifier_requires_resolvable_event_chain() {
        // Ref plus an event that itself has only a ref and no organization
        // is not enough.
        let dangling = EventRoleIdentifier {
            id_ref: Some("delivery".to_owned()),
            event: Some(EventIdentifier {
                id_ref: Some("mealdelivery-03-02".to_owned()),
                ..EventIdentifier::default()
            }),
            ..EventRoleIdentifier::default()
        };
        assert!(!dangling.is_resolvable());

        let full_chain = EventRoleIdentifier::by_ref(
            "delivery",
            EventIdentifier::by_ref("mealdelivery-03-02", RecordIdentifier::by_ref("thf")),
        );
        assert!(full_chain.is_resolvable());

        let by_event_id = EventRoleIdentifier::by_ref("delivery", EventIdentifier::by_id(12));
        assert!(by_event_id.is_resolvable());
    }

    #[test]
    fn identifiers_deserialize_from_sparse_json() {
        let ident: EventIdentifier = serde_json::from_str(
            r#"{"id_ref": "mealdelivery-03-02", "organization": {"id_ref": "thf"}}"#,
        )
        .unwrap();
        assert!(ident.is_resolvable());
        assert_eq!(ident.id, None);
    }
}
