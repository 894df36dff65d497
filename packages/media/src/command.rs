//! FFmpeg command builder and runner.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::process::Command;
use tracing::{debug, warn};
use transcode_core::{TranscodeError, Variant};

use crate::renditions::{filter_complex, var_stream_map};

/// Name of the HLS master playlist written into the output directory.
pub const MASTER_PLAYLIST: &str = "master.m3u8";

/// Name of the DASH manifest written into the output directory.
pub const DASH_MANIFEST: &str = "manifest.mpd";

/// Segment and variant playlist patterns, relative to the output directory.
const HLS_SEGMENT_PATTERN: &str = "%v/seg_%03d.m4s";
const HLS_PLAYLIST_PATTERN: &str = "%v/stream.m3u8";

/// Bytes of stderr kept on failure.
const STDERR_TAIL: usize = 4096;

/// Builder for an adaptive HLS + DASH FFmpeg invocation.
#[derive(Debug, Clone)]
pub struct FfmpegCommand {
    /// Input file path
    input: PathBuf,
    /// Renditions to encode, in output order
    renditions: Vec<Variant>,
    /// x264 preset
    preset: String,
    /// Keyframe interval in frames
    gop_size: u32,
    /// HLS segment duration in seconds
    segment_seconds: u32,
}

impl FfmpegCommand {
    /// Create a new command for the given input and renditions.
    pub fn new(input: impl AsRef<Path>, renditions: Vec<Variant>) -> Self {
        Self {
            input: input.as_ref().to_path_buf(),
            renditions,
            preset: "veryfast".to_string(),
            gop_size: 48,
            segment_seconds: 4,
        }
    }

    /// Set the encoder preset.
    pub fn preset(mut self, preset: impl Into<String>) -> Self {
        self.preset = preset.into();
        self
    }

    /// Set the keyframe interval.
    pub fn gop_size(mut self, frames: u32) -> Self {
        self.gop_size = frames;
        self
    }

    /// Set the HLS segment duration.
    pub fn segment_seconds(mut self, seconds: u32) -> Self {
        self.segment_seconds = seconds;
        self
    }

    /// Renditions this command encodes.
    pub fn renditions(&self) -> &[Variant] {
        &self.renditions
    }

    /// Build the command arguments.
    ///
    /// Output paths are relative; the command is meant to run with the
    /// output directory as its working directory.
    pub fn build_args(&self) -> Vec<String> {
        let mut args = vec![
            "-y".to_string(),
            "-i".to_string(),
            self.input.to_string_lossy().to_string(),
            "-filter_complex".to_string(),
            filter_complex(&self.renditions),
        ];

        // Map the scaled video and the (optional) first audio track per rendition
        for i in 0..self.renditions.len() {
            args.extend([
                "-map".to_string(),
                format!("[v{i}out]"),
                "-map".to_string(),
                "a:0?".to_string(),
            ]);
        }

        let gop = self.gop_size.to_string();
        for (i, r) in self.renditions.iter().enumerate() {
            args.extend([
                format!("-c:v:{i}"),
                "libx264".to_string(),
                format!("-b:v:{i}"),
                r.video_bitrate.clone(),
                "-preset".to_string(),
                self.preset.clone(),
                format!("-profile:v:{i}"),
                "main".to_string(),
                "-g".to_string(),
                gop.clone(),
                "-keyint_min".to_string(),
                gop.clone(),
                "-sc_threshold".to_string(),
                "0".to_string(),
                format!("-c:a:{i}"),
                "aac".to_string(),
                format!("-b:a:{i}"),
                r.audio_bitrate.clone(),
            ]);
        }

        // HLS with CMAF segments
        args.extend([
            "-f".to_string(),
            "hls".to_string(),
            "-hls_time".to_string(),
            self.segment_seconds.to_string(),
            "-hls_playlist_type".to_string(),
            "vod".to_string(),
            "-hls_segment_type".to_string(),
            "fmp4".to_string(),
            "-hls_segment_filename".to_string(),
            HLS_SEGMENT_PATTERN.to_string(),
            "-master_pl_name".to_string(),
            MASTER_PLAYLIST.to_string(),
            "-var_stream_map".to_string(),
            var_stream_map(&self.renditions),
            HLS_PLAYLIST_PATTERN.to_string(),
        ]);

        // DASH manifest over the same encodes
        args.extend([
            "-f".to_string(),
            "dash".to_string(),
            "-use_template".to_string(),
            "1".to_string(),
            "-use_timeline".to_string(),
            "1".to_string(),
            "-adaptation_sets".to_string(),
            "id=0,streams=v id=1,streams=a".to_string(),
            DASH_MANIFEST.to_string(),
        ]);

        args
    }
}

/// Run an FFmpeg command inside `work_dir` and wait for it to exit.
pub async fn run_ffmpeg(
    ffmpeg_bin: &Path,
    cmd: &FfmpegCommand,
    work_dir: &Path,
) -> Result<(), TranscodeError> {
    let args = cmd.build_args();
    debug!("Running FFmpeg: {} {}", ffmpeg_bin.display(), args.join(" "));

    let output = Command::new(ffmpeg_bin)
        .args(&args)
        .current_dir(work_dir)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .output()
        .await?;

    if output.status.success() {
        return Ok(());
    }

    let stderr = String::from_utf8_lossy(&output.stderr);
    let tail = tail_chars(stderr.trim(), STDERR_TAIL);
    warn!(
        "FFmpeg exited with {:?} in {}: {}",
        output.status.code(),
        work_dir.display(),
        tail
    );

    Err(TranscodeError::Tool {
        code: output.status.code(),
        stderr: tail.to_string(),
    })
}

fn tail_chars(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut start = s.len() - max;
    while !s.is_char_boundary(start) {
        start += 1;
    }
    &s[start..]
}
