//! Job domain types for tracked transcode work.

use std::borrow::Borrow;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::media::TranscodeOutput;

/// Caller-supplied key identifying a job, typically a media identifier.
///
/// The same key is used for deduplication in the job table and for lookups.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(pub String);

impl JobId {
    /// Create a job ID from any string-like value.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the raw key.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for JobId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for JobId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl Borrow<str> for JobId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// Lifecycle state of a job within a single execution attempt.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Job is waiting in the work queue.
    #[default]
    Pending,
    /// A worker is running the transcode.
    Processing,
    /// Transcode finished and produced a result.
    Done,
    /// Transcode failed.
    Error,
}

impl JobStatus {
    /// Check if the job is in a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Done | JobStatus::Error)
    }

    /// Get a simple status string for display.
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Processing => "processing",
            JobStatus::Done => "done",
            JobStatus::Error => "error",
        }
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for JobStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(JobStatus::Pending),
            "processing" => Ok(JobStatus::Processing),
            "done" => Ok(JobStatus::Done),
            "error" => Ok(JobStatus::Error),
            other => Err(format!("unknown job status: {other}")),
        }
    }
}

/// In-memory state of one submitted unit of work.
///
/// `error` is only set while the status is [`JobStatus::Error`] and `result`
/// only while it is [`JobStatus::Done`]. The transition methods keep those
/// fields consistent; readers receive clones and never see a record mid-update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobRecord {
    /// Deduplication and lookup key.
    pub id: JobId,
    /// Current status.
    pub status: JobStatus,
    /// Failure description when the transcode failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Transcode output when the job is done.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<TranscodeOutput>,
    /// When the record was created.
    pub created_at: DateTime<Utc>,
    /// When a worker picked the job up.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    /// When the job reached a terminal state.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub done_at: Option<DateTime<Utc>>,
}

impl JobRecord {
    /// Create a new pending record.
    pub fn new(id: impl Into<JobId>) -> Self {
        Self {
            id: id.into(),
            status: JobStatus::Pending,
            error: None,
            result: None,
            created_at: Utc::now(),
            started_at: None,
            done_at: None,
        }
    }

    /// Mark the record as picked up by a worker.
    pub fn begin(&mut self) {
        self.status = JobStatus::Processing;
        self.started_at = Some(Utc::now());
        self.done_at = None;
        self.error = None;
        self.result = None;
    }

    /// Mark the record as successfully transcoded.
    pub fn complete(&mut self, output: TranscodeOutput) {
        self.status = JobStatus::Done;
        self.result = Some(output);
        self.error = None;
        self.done_at = Some(Utc::now());
    }

    /// Mark the record as failed.
    pub fn fail(&mut self, error: impl Into<String>) {
        self.status = JobStatus::Error;
        self.error = Some(error.into());
        self.result = None;
        self.done_at = Some(Utc::now());
    }

    /// Time spent between pickup and the terminal transition.
    pub fn duration(&self) -> Option<Duration> {
        match (self.started_at, self.done_at) {
            (Some(started), Some(done)) => Some(done - started),
            _ => None,
        }
    }
}
