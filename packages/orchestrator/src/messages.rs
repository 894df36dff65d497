//! Message types for actor communication.

use transcode_core::{JobId, TranscodeRequest};

/// One queued unit of work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkItem {
    pub id: JobId,
    pub request: TranscodeRequest,
}

impl WorkItem {
    pub fn new(id: impl Into<JobId>, request: TranscodeRequest) -> Self {
        Self {
            id: id.into(),
            request,
        }
    }
}

/// Messages for the WorkerActor.
#[derive(Debug)]
pub enum WorkerMessage {
    /// Wait for cancellation or the next work item, then poll again.
    Poll,
}

/// Messages for the OutcomeRouter.
#[derive(Debug)]
pub enum RouterMessage {
    /// Wait for the next outcome or the drain signal, then poll again.
    Poll,
}
