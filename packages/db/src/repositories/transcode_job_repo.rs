//! Transcode job repository for outcome persistence.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use transcode_core::{JobStatus, Variant};

use crate::{DbError, get_db};

const TABLE: &str = "transcode_job";

/// Repository for transcode job persistence operations.
pub struct TranscodeJobRepository;

/// Internal record type for SurrealDB reads.
#[derive(Debug, Deserialize)]
struct TranscodeJobRow {
    media_id: String,
    status: JobStatus,
    #[serde(default)]
    output_path: Option<String>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    renditions: Vec<Variant>,
    #[serde(default)]
    finished_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TranscodeJobRow {
    fn into_job(self) -> StoredTranscodeJob {
        StoredTranscodeJob {
            media_id: self.media_id,
            status: self.status,
            output_path: self.output_path,
            error: self.error,
            renditions: self.renditions,
            finished_at: self.finished_at,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// Persisted outcome of a transcode job.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredTranscodeJob {
    pub media_id: String,
    pub status: JobStatus,
    pub output_path: Option<String>,
    pub error: Option<String>,
    pub renditions: Vec<Variant>,
    pub finished_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TranscodeJobRepository {
    /// Record a successful transcode, creating the row if needed.
    pub async fn mark_done(
        media_id: &str,
        output_path: &str,
        renditions: &[Variant],
    ) -> Result<StoredTranscodeJob, DbError> {
        let db = get_db()?;

        let mut response = db
            .query(
                r#"
                UPSERT type::thing($table, $media_id) MERGE {
                    media_id: $media_id,
                    status: "done",
                    output_path: $output_path,
                    renditions: $renditions,
                    error: NONE,
                    finished_at: time::now(),
                    updated_at: time::now()
                };
                "#,
            )
            .bind(("table", TABLE))
            .bind(("media_id", media_id.to_string()))
            .bind(("output_path", output_path.to_string()))
            .bind(("renditions", renditions.to_vec()))
            .await?;

        let rows: Vec<TranscodeJobRow> = response.take(0)?;
        rows.into_iter()
            .next()
            .map(TranscodeJobRow::into_job)
            .ok_or_else(|| DbError::Query(format!("Failed to upsert transcode job {media_id}")))
    }

    /// Record a failed transcode, creating the row if needed.
    ///
    /// Any output from an earlier successful run is left in place.
    pub async fn mark_failed(media_id: &str, error: &str) -> Result<StoredTranscodeJob, DbError> {
        let db = get_db()?;

        let mut response = db
            .query(
                r#"
                UPSERT type::thing($table, $media_id) MERGE {
                    media_id: $media_id,
                    status: "error",
                    error: $error,
                    finished_at: time::now(),
                    updated_at: time::now()
                };
                "#,
            )
            .bind(("table", TABLE))
            .bind(("media_id", media_id.to_string()))
            .bind(("error", error.to_string()))
            .await?;

        let rows: Vec<TranscodeJobRow> = response.take(0)?;
        rows.into_iter()
            .next()
            .map(TranscodeJobRow::into_job)
            .ok_or_else(|| DbError::Query(format!("Failed to upsert transcode job {media_id}")))
    }

    /// Get a transcode job by media id.
    pub async fn get(media_id: &str) -> Result<StoredTranscodeJob, DbError> {
        let db = get_db()?;

        let row: Option<TranscodeJobRow> = db.select((TABLE, media_id.to_string())).await?;

        row.map(TranscodeJobRow::into_job)
            .ok_or_else(|| DbError::NotFound(format!("Transcode job not found: {media_id}")))
    }

    /// List transcode jobs in the given status, most recently updated first.
    pub async fn list_by_status(status: JobStatus) -> Result<Vec<StoredTranscodeJob>, DbError> {
        let db = get_db()?;

        let mut response = db
            .query(
                "SELECT * FROM type::table($table) WHERE status = $status \
                 ORDER BY updated_at DESC",
            )
            .bind(("table", TABLE))
            .bind(("status", status.as_str()))
            .await?;

        let rows: Vec<TranscodeJobRow> = response.take(0)?;
        Ok(rows.into_iter().map(TranscodeJobRow::into_job).collect())
    }

    /// Delete every stored transcode job.
    pub async fn clear() -> Result<(), DbError> {
        let db = get_db()?;
        db.query("DELETE transcode_job;").await?.check()?;
        Ok(())
    }
}
