//! End-to-end transcode of one source into an adaptive streaming package.

use std::path::{Component, Path, PathBuf};

use tracing::{debug, info};
use transcode_core::{JobId, TranscodeError, TranscodeOutput, TranscodeRequest};

use crate::command::{FfmpegCommand, MASTER_PLAYLIST, run_ffmpeg};
use crate::config::MediaConfig;
use crate::probe::probe_resolution;
use crate::renditions::select_renditions;

/// Transcoder driving the ffprobe and ffmpeg executables.
#[derive(Debug, Clone, Default)]
pub struct FfmpegTranscoder {
    config: MediaConfig,
}

impl FfmpegTranscoder {
    pub fn new(config: MediaConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &MediaConfig {
        &self.config
    }

    /// Transcode the request's source into `<output_dir>/<name>/`.
    ///
    /// `name` is the request's output name, or the job id when unset. Returns
    /// the path of the HLS master playlist and the renditions encoded.
    pub async fn transcode(
        &self,
        id: &JobId,
        request: &TranscodeRequest,
    ) -> Result<TranscodeOutput, TranscodeError> {
        let input = self.resolve_input(&request.source).await?;
        let name = request.output_name.as_deref().unwrap_or(id.as_str());
        validate_output_name(name)?;

        let (width, height) = probe_resolution(&self.config.ffprobe_bin, &input).await?;
        let selected = select_renditions(width, height, &self.config.ladder);
        if selected.is_empty() {
            return Err(TranscodeError::InvalidInput(
                "rendition ladder is empty".to_string(),
            ));
        }
        debug!(
            "Job {} source {}x{} -> {} renditions",
            id,
            width,
            height,
            selected.len()
        );

        let out_dir = self.config.output_dir.join(name);
        for i in 0..selected.len() {
            tokio::fs::create_dir_all(out_dir.join(i.to_string())).await?;
        }

        // ffmpeg runs inside out_dir, so the input must not be relative to the caller
        let input = std::path::absolute(&input)?;
        let cmd = FfmpegCommand::new(&input, selected).preset(self.config.preset.clone());
        run_ffmpeg(&self.config.ffmpeg_bin, &cmd, &out_dir).await?;

        let master = out_dir.join(MASTER_PLAYLIST);
        info!("Job {} transcoded to {}", id, master.display());

        Ok(TranscodeOutput::new(
            master.to_string_lossy(),
            cmd.renditions().to_vec(),
        ))
    }

    async fn resolve_input(&self, source: &str) -> Result<PathBuf, TranscodeError> {
        if source.trim().is_empty() {
            return Err(TranscodeError::InvalidInput("empty source".to_string()));
        }

        let path = Path::new(source);
        let path = if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.config.input_dir.join(path)
        };

        let is_file = tokio::fs::metadata(&path)
            .await
            .map(|m| m.is_file())
            .unwrap_or(false);
        if !is_file {
            return Err(TranscodeError::InvalidInput(format!(
                "source not found: {}",
                path.display()
            )));
        }
        Ok(path)
    }
}

/// Output names become a single directory under the output root.
fn validate_output_name(name: &str) -> Result<(), TranscodeError> {
    let mut components = Path::new(name).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) if !name.contains(['/', '\\']) => Ok(()),
        _ => Err(TranscodeError::InvalidInput(format!(
            "invalid output name: {name:?}"
        ))),
    }
}
