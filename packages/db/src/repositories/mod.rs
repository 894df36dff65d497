//! Repository implementations for database operations.

mod transcode_job_repo;

pub use transcode_job_repo::{StoredTranscodeJob, TranscodeJobRepository};
