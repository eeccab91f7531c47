//! Still-frame sampling for analysis.

use std::path::{Path, PathBuf};

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::{MediaError, MediaResult};
use crate::probe::SourceVideo;

/// Frames wider than this are downscaled before analysis.
pub const ANALYSIS_MAX_WIDTH: u32 = 960;

/// A single decoded frame written to disk.
#[derive(Debug, Clone)]
pub struct SampledFrame {
    pub path: PathBuf,
    /// Width of the written image in pixels
    pub width: u32,
    /// Height of the written image in pixels
    pub height: u32,
}

fn analysis_filter(source_width: u32) -> Option<String> {
    (source_width > ANALYSIS_MAX_WIDTH).then(|| format!("scale={}:-2", ANALYSIS_MAX_WIDTH))
}

/// Decode the frame at `at_secs` into a PNG inside `work_dir`.
pub async fn sample_frame(
    source: &SourceVideo,
    at_secs: f64,
    work_dir: impl AsRef<Path>,
) -> MediaResult<SampledFrame> {
    let output = work_dir
        .as_ref()
        .join(format!("frame_{}.png", uuid::Uuid::new_v4().simple()));

    let mut cmd = FfmpegCommand::new(&source.path, &output)
        .seek(at_secs.max(0.0))
        .single_frame();
    if let Some(filter) = analysis_filter(source.width) {
        cmd = cmd.video_filter(filter);
    }

    FfmpegRunner::new().run(&cmd).await?;

    if !output.exists() {
        return Err(MediaError::InvalidVideo(format!(
            "No frame decoded at {:.3}s",
            at_secs
        )));
    }

    let (width, height) = image::image_dimensions(&output)?;
    Ok(SampledFrame {
        path: output,
        width,
        height,
    })
}
