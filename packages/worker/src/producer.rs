//! JSON-lines job producer.

use serde::Deserialize;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use transcode_core::TranscodeRequest;

use orchestrator::Orchestrator;

/// One submitted job, e.g. `{"media_id": "m1", "source": "m1.mp4"}`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct JobMessage {
    pub media_id: String,
    pub source: String,
    #[serde(default)]
    pub output_name: Option<String>,
}

impl JobMessage {
    pub fn into_request(self) -> (String, TranscodeRequest) {
        let mut request = TranscodeRequest::new(self.source);
        request.output_name = self.output_name;
        (self.media_id, request)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("malformed job message: {0}")]
    Json(#[from] serde_json::Error),

    #[error("job message has an empty media_id")]
    EmptyId,
}

/// Parse one input line. Blank lines yield `Ok(None)`.
pub fn parse_line(line: &str) -> Result<Option<JobMessage>, ParseError> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    let message: JobMessage = serde_json::from_str(line)?;
    if message.media_id.trim().is_empty() {
        return Err(ParseError::EmptyId);
    }
    Ok(Some(message))
}

/// Submit every valid line of `reader` until end of input or `shutdown`.
///
/// Malformed lines are logged and skipped. Returns the number of jobs submitted.
pub async fn run_producer<R>(
    reader: R,
    orchestrator: &Orchestrator,
    shutdown: CancellationToken,
) -> usize
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = reader.lines();
    let mut submitted = 0;

    loop {
        let line = tokio::select! {
            _ = shutdown.cancelled() => break,
            line = lines.next_line() => line,
        };

        let line = match line {
            Ok(Some(line)) => line,
            Ok(None) => {
                debug!("End of job input");
                break;
            }
            Err(e) => {
                warn!("Failed to read job input: {}", e);
                break;
            }
        };

        let message = match parse_line(&line) {
            Ok(Some(message)) => message,
            Ok(None) => continue,
            Err(e) => {
                warn!("Skipping input line: {}", e);
                continue;
            }
        };

        let (id, request) = message.into_request();
        debug!("Submitting job {}", id);
        tokio::select! {
            _ = shutdown.cancelled() => break,
            _ = orchestrator.add_job(id, request) => submitted += 1,
        }
    }

    info!("Producer finished after {} jobs", submitted);
    submitted
}
