//! Source resolution probing via ffprobe.

use std::path::Path;
use std::process::Stdio;

use serde::Deserialize;
use tokio::process::Command;
use transcode_core::TranscodeError;

#[derive(Debug, Deserialize)]
struct VideoStream {
    #[serde(default)]
    width: u32,
    #[serde(default)]
    height: u32,
}

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<VideoStream>,
}

/// Extract the width and height of the first video stream from ffprobe JSON.
pub fn parse_probe_output(json: &[u8]) -> Result<(u32, u32), TranscodeError> {
    let probe: ProbeOutput = serde_json::from_slice(json)
        .map_err(|e| TranscodeError::Probe(format!("invalid ffprobe output: {e}")))?;

    let stream = probe
        .streams
        .first()
        .ok_or_else(|| TranscodeError::Probe("no video stream found".into()))?;

    if stream.width == 0 || stream.height == 0 {
        return Err(TranscodeError::Probe(format!(
            "video stream has no usable resolution ({}x{})",
            stream.width, stream.height
        )));
    }

    Ok((stream.width, stream.height))
}

/// Run ffprobe on `input` and return the resolution of its first video stream.
pub async fn probe_resolution(
    ffprobe_bin: &Path,
    input: &Path,
) -> Result<(u32, u32), TranscodeError> {
    let output = Command::new(ffprobe_bin)
        .args([
            "-v",
            "quiet",
            "-print_format",
            "json",
            "-show_streams",
            "-select_streams",
            "v",
        ])
        .arg(input)
        .stdin(Stdio::null())
        .kill_on_drop(true)
        .output()
        .await?;

    if !output.status.success() {
        return Err(TranscodeError::Probe(format!(
            "ffprobe exited with {:?} for {}",
            output.status.code(),
            input.display()
        )));
    }

    parse_probe_output(&output.stdout)
}
