//! Transcoding collaborator seam.

use std::future::Future;
use std::pin::Pin;

use media::FfmpegTranscoder;
use transcode_core::{TranscodeError, TranscodeOutput};

use crate::messages::WorkItem;

/// Future type for async transcodes.
pub type TranscodeFuture =
    Pin<Box<dyn Future<Output = Result<TranscodeOutput, TranscodeError>> + Send>>;

/// Trait for transcoding collaborators.
///
/// The returned future runs to completion on the worker that dequeued the
/// item; no timeout is applied around it.
pub trait Transcoder: Send + Sync + 'static {
    fn transcode(&self, item: &WorkItem) -> TranscodeFuture;
}

/// A simple function-based transcoder.
pub struct FnTranscoder<F>
where
    F: Fn(&WorkItem) -> TranscodeFuture + Send + Sync + 'static,
{
    transcode: F,
}

impl<F> FnTranscoder<F>
where
    F: Fn(&WorkItem) -> TranscodeFuture + Send + Sync + 'static,
{
    pub fn new(transcode: F) -> Self {
        Self { transcode }
    }
}

impl<F> Transcoder for FnTranscoder<F>
where
    F: Fn(&WorkItem) -> TranscodeFuture + Send + Sync + 'static,
{
    fn transcode(&self, item: &WorkItem) -> TranscodeFuture {
        (self.transcode)(item)
    }
}

impl Transcoder for FfmpegTranscoder {
    fn transcode(&self, item: &WorkItem) -> TranscodeFuture {
        let transcoder = self.clone();
        let item = item.clone();
        Box::pin(async move { transcoder.transcode(&item.id, &item.request).await })
    }
}
