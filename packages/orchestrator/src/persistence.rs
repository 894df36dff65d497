//! Persistence collaborator seam and its SurrealDB adapter.

use std::future::Future;
use std::pin::Pin;

use db::repositories::TranscodeJobRepository;
use transcode_core::{JobId, Variant};

use crate::error::PersistenceError;

/// Future type for persistence calls.
pub type PersistFuture = Pin<Box<dyn Future<Output = Result<(), PersistenceError>> + Send>>;

/// Destination for finished jobs.
///
/// Calls are best-effort: the outcome routers log a failed call and move on.
pub trait JobPersistence: Send + Sync + 'static {
    fn record_success(
        &self,
        id: JobId,
        output_path: String,
        variants: Vec<Variant>,
    ) -> PersistFuture;

    fn record_failure(&self, id: JobId, message: String) -> PersistFuture;
}

/// Persistence that discards every outcome.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopPersistence;

impl JobPersistence for NoopPersistence {
    fn record_success(
        &self,
        _id: JobId,
        _output_path: String,
        _variants: Vec<Variant>,
    ) -> PersistFuture {
        Box::pin(async { Ok(()) })
    }

    fn record_failure(&self, _id: JobId, _message: String) -> PersistFuture {
        Box::pin(async { Ok(()) })
    }
}

/// Writes outcomes to the `transcode_job` table.
///
/// Requires [`db::init`] to have run.
#[derive(Debug, Clone, Copy, Default)]
pub struct DbPersistence;

impl JobPersistence for DbPersistence {
    fn record_success(
        &self,
        id: JobId,
        output_path: String,
        variants: Vec<Variant>,
    ) -> PersistFuture {
        Box::pin(async move {
            TranscodeJobRepository::mark_done(id.as_str(), &output_path, &variants).await?;
            Ok(())
        })
    }

    fn record_failure(&self, id: JobId, message: String) -> PersistFuture {
        Box::pin(async move {
            TranscodeJobRepository::mark_failed(id.as_str(), &message).await?;
            Ok(())
        })
    }
}
