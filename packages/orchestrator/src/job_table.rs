//! Concurrent store of job records keyed by job id.

use std::collections::HashMap;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use transcode_core::{JobId, JobRecord, JobStatus};

/// Count of jobs per status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobStats {
    pub pending: usize,
    pub processing: usize,
    pub done: usize,
    pub error: usize,
}

impl JobStats {
    pub fn total(&self) -> usize {
        self.pending + self.processing + self.done + self.error
    }
}

/// Job records behind a single reader/writer lock.
///
/// Every method takes the lock for the duration of one map operation and
/// returns owned copies, so callers never hold the lock and never observe a
/// record while it is being changed. Entries are never removed.
#[derive(Debug, Default)]
pub struct JobTable {
    jobs: RwLock<HashMap<JobId, JobRecord>>,
}

impl JobTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a pending record unless one already exists; return the stored record.
    pub fn upsert_if_absent(&self, id: &JobId) -> JobRecord {
        if let Some(record) = self.jobs.read().get(id) {
            return record.clone();
        }
        self.jobs
            .write()
            .entry(id.clone())
            .or_insert_with(|| JobRecord::new(id.clone()))
            .clone()
    }

    /// Snapshot of the record for `id`.
    pub fn get(&self, id: &str) -> Option<JobRecord> {
        self.jobs.read().get(id).cloned()
    }

    /// Apply `f` to the stored record, if any, under the write lock.
    pub fn update<R>(&self, id: &str, f: impl FnOnce(&mut JobRecord) -> R) -> Option<R> {
        self.jobs.write().get_mut(id).map(f)
    }

    /// Look up or create the record for `id` and move it to processing.
    pub fn begin(&self, id: &JobId) -> JobRecord {
        let mut jobs = self.jobs.write();
        let record = jobs
            .entry(id.clone())
            .or_insert_with(|| JobRecord::new(id.clone()));
        record.begin();
        record.clone()
    }

    /// Snapshots of all records, optionally filtered by status, oldest first.
    pub fn list(&self, status: Option<JobStatus>) -> Vec<JobRecord> {
        let mut records: Vec<JobRecord> = self
            .jobs
            .read()
            .values()
            .filter(|r| status.is_none_or(|s| r.status == s))
            .cloned()
            .collect();
        records.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        records
    }

    pub fn stats(&self) -> JobStats {
        let jobs = self.jobs.read();
        let mut stats = JobStats::default();
        for record in jobs.values() {
            match record.status {
                JobStatus::Pending => stats.pending += 1,
                JobStatus::Processing => stats.processing += 1,
                JobStatus::Done => stats.done += 1,
                JobStatus::Error => stats.error += 1,
            }
        }
        stats
    }

    pub fn len(&self) -> usize {
        self.jobs.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.read().is_empty()
    }
}
