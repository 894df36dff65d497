//! Payload and output types exchanged with the transcoding collaborator.

use serde::{Deserialize, Serialize};

/// One encoded output rendition of a transcode.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Variant {
    /// Rendition name, e.g. `720p`.
    pub name: String,
    /// Target width in pixels.
    pub width: u32,
    /// Target height in pixels.
    pub height: u32,
    /// Video bitrate as passed to the encoder, e.g. `3000k`.
    pub video_bitrate: String,
    /// Audio bitrate as passed to the encoder, e.g. `128k`.
    pub audio_bitrate: String,
}

impl Variant {
    pub fn new(
        name: impl Into<String>,
        width: u32,
        height: u32,
        video_bitrate: impl Into<String>,
        audio_bitrate: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            width,
            height,
            video_bitrate: video_bitrate.into(),
            audio_bitrate: audio_bitrate.into(),
        }
    }

    /// Whether this rendition fits inside a source of the given resolution.
    pub fn fits_within(&self, width: u32, height: u32) -> bool {
        self.width <= width && self.height <= height
    }
}

/// Result of a successful transcode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscodeOutput {
    /// Location of the master playlist (or equivalent entry point).
    pub output_path: String,
    /// Renditions that were produced.
    #[serde(default)]
    pub variants: Vec<Variant>,
}

impl TranscodeOutput {
    pub fn new(output_path: impl Into<String>, variants: Vec<Variant>) -> Self {
        Self {
            output_path: output_path.into(),
            variants,
        }
    }
}

/// Job payload handed to the transcoding collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscodeRequest {
    /// Reference to the input media (a path or object key).
    pub source: String,
    /// Optional name for the output directory; the job id is used otherwise.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_name: Option<String>,
}

impl TranscodeRequest {
    /// Create a request for the given source.
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            output_name: None,
        }
    }

    /// Set the output directory name.
    pub fn with_output_name(mut self, name: impl Into<String>) -> Self {
        self.output_name = Some(name.into());
        self
    }
}
