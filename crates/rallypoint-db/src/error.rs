//! Error types for the data layer.
//!
//! All errors propagate via [`DbError`]. Storage failures (including
//! uniqueness-constraint violations) arrive through the [`sqlx`] variant
//! untouched; the resolver adds its own variants for identifiers that carry
//! too little information and for refs that match no row.

/// Errors that can occur in the data layer.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    /// A `PostgreSQL` operation failed.
    #[error("PostgreSQL error: {0}")]
    Postgres(#[from] sqlx::Error),

    /// A `PostgreSQL` migration failed.
    #[error("PostgreSQL migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A serialization or deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// An identifier carried neither an id nor a ref with a resolvable
    /// parent scope. Never silently defaulted.
    #[error("unresolvable {entity} identifier: an id, or a ref with its parent scope, is required")]
    UnresolvableIdentifier {
        /// The entity the identifier was meant to address.
        entity: &'static str,
    },

    /// A ref lookup found no matching row for the given scope.
    #[error("the {entity} referenced does not exist: {id_ref}")]
    MissingReference {
        /// The entity the ref was meant to address.
        entity: &'static str,
        /// The ref that matched nothing.
        id_ref: String,
    },

    /// A configuration error.
    #[error("Configuration error: {0}")]
    Config(String),
}
