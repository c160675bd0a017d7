//! Batch importer entry point for Rallypoint event documents.
//!
//! Reads a JSON file of nested event documents (event, roles, positions,
//! routes, deliveries), connects to `PostgreSQL`, and reconciles each
//! document with upsert-and-prune semantics: children present in the
//! document are created or updated by ref, children absent from it are
//! deleted. Each document is applied in its own transaction.
//!
//! Re-running the importer with the same file is a no-op apart from
//! timestamps, so it is safe to wire into a deploy step.

mod config;
mod error;

use rallypoint_db::{EventImporter, PostgresPool};
use rallypoint_types::EventInsert;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::config::ImporterConfig;
use crate::error::ImporterError;

/// Application entry point.
///
/// Initializes logging, loads configuration from environment variables,
/// reads the document file, connects to `PostgreSQL`, and applies every
/// document in order.
///
/// # Errors
///
/// Returns an error if configuration, the document file, or the import
/// itself fails. Documents already imported before a failure stay
/// committed.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    info!("rallypoint-importer starting");

    let config = ImporterConfig::from_env()?;

    // A path on the command line wins over IMPORT_FILE.
    let documents_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| config.documents_path.clone());
    info!(
        documents_path,
        run_migrations = config.run_migrations,
        "configuration loaded"
    );

    let documents = load_documents(&documents_path).await?;
    info!(documents = documents.len(), "document file parsed");

    let pool = PostgresPool::connect(&config.postgres).await?;
    if config.run_migrations {
        pool.run_migrations().await?;
    }

    let importer = EventImporter::new(pool.pool());
    let summaries = importer.import_all(&documents).await?;

    let roles_pruned: u64 = summaries.iter().map(|s| s.roles_pruned).sum();
    let positions_pruned: u64 = summaries.iter().map(|s| s.positions_pruned).sum();
    info!(
        events = summaries.len(),
        roles_pruned, positions_pruned, "import complete"
    );

    pool.close().await;
    Ok(())
}

/// Read and parse the document file. A single document and an array of
/// documents are both accepted.
async fn load_documents(path: &str) -> Result<Vec<EventInsert>, ImporterError> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| ImporterError::ReadFile {
            path: path.to_owned(),
            source,
        })?;

    let documents = if raw.trim_start().starts_with('[') {
        serde_json::from_str(&raw)
    } else {
        serde_json::from_str(&raw).map(|doc| vec![doc])
    }
    .map_err(|source| ImporterError::ParseFile {
        path: path.to_owned(),
        source,
    })?;

    Ok(documents)
}
