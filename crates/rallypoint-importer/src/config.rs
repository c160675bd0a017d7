//! Configuration for the importer binary.
//!
//! All configuration is loaded from environment variables. The importer
//! needs a database to talk to and a JSON file of event documents to apply.

use rallypoint_db::PostgresConfig;

use crate::error::ImporterError;

/// Complete importer configuration loaded from the environment.
#[derive(Debug, Clone)]
pub struct ImporterConfig {
    /// `PostgreSQL` connection settings (from `DATABASE_URL` and friends).
    pub postgres: PostgresConfig,
    /// Path to the JSON file of event documents. Either a single document
    /// or an array of them.
    pub documents_path: String,
    /// When true, run migrations before importing.
    pub run_migrations: bool,
}

impl ImporterConfig {
    /// Load configuration from environment variables.
    ///
    /// Required variables:
    /// - `DATABASE_URL` -- `PostgreSQL` connection string
    ///
    /// Optional variables:
    /// - `DB_MAX_CONNECTIONS` -- pool size
    /// - `IMPORT_FILE` -- path to the documents file (default `events.json`)
    /// - `RUN_MIGRATIONS` -- run pending migrations first (default `true`)
    pub fn from_env() -> Result<Self, ImporterError> {
        let postgres =
            PostgresConfig::from_env().map_err(|e| ImporterError::Config(e.to_string()))?;
        Self::from_vars(postgres, |key| std::env::var(key).ok())
    }

    /// Build the importer settings from a variable lookup.
    fn from_vars(
        postgres: PostgresConfig,
        var: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ImporterError> {
        let documents_path = var("IMPORT_FILE").unwrap_or_else(|| "events.json".to_owned());

        let run_migrations: bool = match var("RUN_MIGRATIONS") {
            Some(raw) => raw
                .parse()
                .map_err(|e| ImporterError::Config(format!("invalid RUN_MIGRATIONS: {e}")))?,
            None => true,
        };

        Ok(Self {
            postgres,
            documents_path,
            run_migrations,
        })
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used)]

    use super::*;

    fn postgres() -> PostgresConfig {
        PostgresConfig::new("postgresql://localhost:5432/rallypoint")
    }

    #[test]
    fn defaults_apply_when_variables_are_absent() {
        let config =
            ImporterConfig::from_vars(postgres(), |_| None).expect("Defaults should parse");
        assert_eq!(config.documents_path, "events.json");
        assert!(config.run_migrations);
    }

    #[test]
    fn variables_override_defaults() {
        let config = ImporterConfig::from_vars(postgres(), |key| match key {
            "IMPORT_FILE" => Some("deploy/events.json".to_owned()),
            "RUN_MIGRATIONS" => Some("false".to_owned()),
            _ => None,
        })
        .expect("Overrides should parse");
        assert_eq!(config.documents_path, "deploy/events.json");
        assert!(!config.run_migrations);
    }

    #[test]
    fn garbled_run_migrations_is_rejected() {
        let result = ImporterConfig::from_vars(postgres(), |key| match key {
            "RUN_MIGRATIONS" => Some("maybe".to_owned()),
            _ => None,
        });
        assert!(matches!(result, Err(ImporterError::Config(_))));
    }
}
