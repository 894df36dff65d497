//! Database schema definitions using SurrealQL.

use crate::{DbError, get_db};

/// Initialize the database schema.
///
/// This creates all necessary tables, fields, and indexes.
pub async fn init_schema() -> Result<(), DbError> {
    let db = get_db()?;

    tracing::info!("Initializing database schema...");

    db.query(TRANSCODE_JOB_SCHEMA).await?.check()?;

    tracing::info!("Database schema initialized");

    Ok(())
}

/// Transcode job table schema.
///
/// Schemaless so rendition objects are stored as-is; only the fields used
/// for filtering and ordering are declared.
const TRANSCODE_JOB_SCHEMA: &str = r#"
-- One row per media id, written by the outcome routers
DEFINE TABLE IF NOT EXISTS transcode_job SCHEMALESS;

DEFINE FIELD IF NOT EXISTS media_id ON transcode_job TYPE string;
DEFINE FIELD IF NOT EXISTS status ON transcode_job TYPE string;
DEFINE FIELD IF NOT EXISTS output_path ON transcode_job TYPE option<string>;
DEFINE FIELD IF NOT EXISTS error ON transcode_job TYPE option<string>;
DEFINE FIELD IF NOT EXISTS renditions ON transcode_job TYPE array DEFAULT [];
DEFINE FIELD IF NOT EXISTS finished_at ON transcode_job TYPE option<datetime>;
DEFINE FIELD IF NOT EXISTS created_at ON transcode_job TYPE datetime DEFAULT time::now();
DEFINE FIELD IF NOT EXISTS updated_at ON transcode_job TYPE datetime DEFAULT time::now();

DEFINE INDEX IF NOT EXISTS transcode_job_status ON transcode_job FIELDS status;
DEFINE INDEX IF NOT EXISTS transcode_job_updated ON transcode_job FIELDS updated_at;
"#;
