//! Transcoder configuration.

use std::path::PathBuf;

use transcode_core::Variant;

use crate::renditions::default_ladder;

/// Where the transcoder finds its tools, inputs and output root.
#[derive(Debug, Clone)]
pub struct MediaConfig {
    /// ffmpeg executable
    pub ffmpeg_bin: PathBuf,
    /// ffprobe executable
    pub ffprobe_bin: PathBuf,
    /// Base directory for relative request sources
    pub input_dir: PathBuf,
    /// Root under which each job gets its own output directory
    pub output_dir: PathBuf,
    /// Candidate renditions, largest first
    pub ladder: Vec<Variant>,
    /// x264 preset
    pub preset: String,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            ffmpeg_bin: PathBuf::from("ffmpeg"),
            ffprobe_bin: PathBuf::from("ffprobe"),
            input_dir: PathBuf::from("assets"),
            output_dir: PathBuf::from("assets/transcode"),
            ladder: default_ladder(),
            preset: "veryfast".to_string(),
        }
    }
}

impl MediaConfig {
    /// Set the input and output directories.
    pub fn with_dirs(
        mut self,
        input_dir: impl Into<PathBuf>,
        output_dir: impl Into<PathBuf>,
    ) -> Self {
        self.input_dir = input_dir.into();
        self.output_dir = output_dir.into();
        self
    }

    /// Set the tool executables.
    pub fn with_tools(mut self, ffmpeg: impl Into<PathBuf>, ffprobe: impl Into<PathBuf>) -> Self {
        self.ffmpeg_bin = ffmpeg.into();
        self.ffprobe_bin = ffprobe.into();
        self
    }

    /// Replace the rendition ladder.
    pub fn with_ladder(mut self, ladder: Vec<Variant>) -> Self {
        self.ladder = ladder;
        self
    }

    /// Build a config from environment variables.
    ///
    /// - `FFMPEG_BIN` (default: `ffmpeg`)
    /// - `FFPROBE_BIN` (default: `ffprobe`)
    /// - `MEDIA_INPUT_DIR` (default: `assets`)
    /// - `MEDIA_OUTPUT_DIR` (default: `assets/transcode`)
    /// - `FFMPEG_PRESET` (default: `veryfast`)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            ffmpeg_bin: env_non_empty("FFMPEG_BIN")
                .map(PathBuf::from)
                .unwrap_or(defaults.ffmpeg_bin),
            ffprobe_bin: env_non_empty("FFPROBE_BIN")
                .map(PathBuf::from)
                .unwrap_or(defaults.ffprobe_bin),
            input_dir: env_non_empty("MEDIA_INPUT_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.input_dir),
            output_dir: env_non_empty("MEDIA_OUTPUT_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.output_dir),
            ladder: defaults.ladder,
            preset: env_non_empty("FFMPEG_PRESET").unwrap_or(defaults.preset),
        }
    }
}

fn env_non_empty(var_name: &str) -> Option<String> {
    std::env::var(var_name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
