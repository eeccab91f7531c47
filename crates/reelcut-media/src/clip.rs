//! Clip encoding.
//!
//! One [`EncodeJob`] turns one time window of the source into one MP4:
//! seek, trim, crop to the target ratio, optionally enhance, re-encode.
//! Jobs are independent and share nothing but the read-only source file.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use reelcut_models::{CropRect, EncodingConfig, EnhancementSpec};

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::{MediaError, MediaResult};
use crate::filters::{apply_crop, build_filter_chain};

/// Everything needed to encode one clip.
#[derive(Debug, Clone)]
pub struct EncodeJob {
    pub input: PathBuf,
    pub output: PathBuf,
    /// Start offset in seconds
    pub start: f64,
    /// Clip length in seconds
    pub duration: f64,
    pub crop: CropRect,
    /// Width of the source frame, to recognize identity crops
    pub frame_width: u32,
    pub enhancement: EnhancementSpec,
    pub encoding: EncodingConfig,
}

impl EncodeJob {
    /// Build the ffmpeg invocation for this job.
    pub fn to_command(&self) -> FfmpegCommand {
        let params = apply_crop(
            build_filter_chain(self.enhancement.enabled),
            &self.crop,
            self.frame_width,
        );

        FfmpegCommand::new(&self.input, &self.output)
            .seek(self.start)
            .duration(self.duration)
            .output_args(params)
            .output_args(self.encoding.to_ffmpeg_args())
            .faststart()
    }
}

/// Encodes clips to files.
#[async_trait]
pub trait ClipEncoder: Send + Sync {
    async fn encode(&self, job: &EncodeJob) -> MediaResult<()>;
}

/// [`ClipEncoder`] that shells out to ffmpeg.
#[derive(Debug, Clone, Default)]
pub struct FfmpegClipEncoder {
    runner: FfmpegRunner,
}

impl FfmpegClipEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Abort encodes that run longer than `secs`.
    pub fn with_timeout(mut self, secs: Option<u64>) -> Self {
        self.runner = self.runner.with_timeout(secs);
        self
    }
}

#[async_trait]
impl ClipEncoder for FfmpegClipEncoder {
    async fn encode(&self, job: &EncodeJob) -> MediaResult<()> {
        info!(
            "Encoding clip: {} -> {} ({:.3}s +{:.3}s, crop {}x{} @ {})",
            job.input.display(),
            job.output.display(),
            job.start,
            job.duration,
            job.crop.width,
            job.crop.height,
            job.crop.x1
        );

        let clip_secs = job.duration;
        self.runner
            .run_with_progress(&job.to_command(), move |p| {
                debug!("Encode progress: {:.1}%", p.percent_of(clip_secs));
            })
            .await
            .map_err(|e| {
                if let Some(tail) = e.stderr_tail(5) {
                    warn!("ffmpeg stderr for {}:\n{}", job.output.display(), tail);
                }
                e
            })?;

        ensure_output(&job.output)
    }
}

fn ensure_output(path: &Path) -> MediaResult<()> {
    let size = std::fs::metadata(path)
        .map_err(|_| MediaError::FileNotFound(path.to_path_buf()))?
        .len();
    if size == 0 {
        return Err(MediaError::InvalidVideo(format!(
            "Encoder produced an empty file: {}",
            path.display()
        )));
    }
    Ok(())
}
