//! FFmpeg-backed transcoding for the orchestrator.
//!
//! Probes the source resolution with `ffprobe`, picks the renditions of the
//! ladder that fit, and runs a single `ffmpeg` invocation producing HLS (fMP4
//! segments plus `master.m3u8`) and a DASH `manifest.mpd` side by side.

mod command;
mod config;
mod probe;
mod renditions;
mod transcoder;

pub use command::{DASH_MANIFEST, FfmpegCommand, MASTER_PLAYLIST, run_ffmpeg};
pub use config::MediaConfig;
pub use probe::{parse_probe_output, probe_resolution};
pub use renditions::{default_ladder, filter_complex, select_renditions, var_stream_map};
pub use transcoder::FfmpegTranscoder;
