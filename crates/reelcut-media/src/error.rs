//! Media error types.

use std::path::PathBuf;
use thiserror::Error;

pub type MediaResult<T> = Result<T, MediaError>;

/// Failures of probing, sampling, detecting, downloading or encoding.
#[derive(Debug, Error)]
pub enum MediaError {
    /// A required external program is not on `PATH`.
    #[error("{0} not found in PATH")]
    ToolNotFound(&'static str),

    #[error("ffmpeg failed: {message}")]
    FfmpegFailed {
        message: String,
        stderr: Option<String>,
        exit_code: Option<i32>,
    },

    #[error("ffprobe failed: {message}")]
    FfprobeFailed { message: String, stderr: Option<String> },

    #[error("Download failed: {0}")]
    DownloadFailed(String),

    #[error("Unsupported source: {0}")]
    UnsupportedSource(String),

    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Invalid video: {0}")]
    InvalidVideo(String),

    #[error("Face detection failed: {0}")]
    DetectionFailed(String),

    #[error("Timed out after {0}s")]
    Timeout(u64),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Malformed ffprobe output: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("Unreadable frame: {0}")]
    Image(#[from] image::ImageError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl MediaError {
    pub fn ffmpeg_failed(message: impl Into<String>, stderr: Option<String>, exit_code: Option<i32>) -> Self {
        Self::FfmpegFailed {
            message: message.into(),
            stderr,
            exit_code,
        }
    }

    pub fn download_failed(message: impl Into<String>) -> Self {
        Self::DownloadFailed(message.into())
    }

    pub fn detection_failed(message: impl Into<String>) -> Self {
        Self::DetectionFailed(message.into())
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Last `max_lines` non-blank lines of the captured stderr of a failed
    /// ffmpeg or ffprobe run.
    pub fn stderr_tail(&self, max_lines: usize) -> Option<String> {
        let stderr = match self {
            Self::FfmpegFailed { stderr, .. } | Self::FfprobeFailed { stderr, .. } => stderr.as_deref()?,
            _ => return None,
        };
        let lines: Vec<&str> = stderr.lines().filter(|l| !l.trim().is_empty()).collect();
        let skip = lines.len().saturating_sub(max_lines);
        Some(lines[skip..].join("\n"))
    }
}
