//! Failure type reported by transcoding collaborators.

use thiserror::Error;

/// Errors a transcode can end with.
///
/// The worker stores the `Display` form of this error on the job record, so
/// [`TranscodeError::Failed`] renders its message verbatim.
#[derive(Debug, Error)]
pub enum TranscodeError {
    #[error("{0}")]
    Failed(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("probe failed: {0}")]
    Probe(String),

    #[error("transcoder exited with status {code:?}: {stderr}")]
    Tool { code: Option<i32>, stderr: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl TranscodeError {
    /// Create a plain failure with the given message.
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }
}
