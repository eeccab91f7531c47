//! FFmpeg CLI wrapper and reframing engine.
//!
//! This crate provides:
//! - Type-safe FFmpeg command building
//! - Progress parsing from `-progress pipe:2`
//! - Source probing via FFprobe
//! - Vertical crop geometry and focal point estimation
//! - Face detection on sampled frames (OpenCV, optional)
//! - Clip encoding with optional enhancement
//! - Remote video acquisition via yt-dlp

pub mod clip;
pub mod command;
pub mod detection;
pub mod download;
pub mod error;
pub mod filters;
pub mod focal;
pub mod geometry;
pub mod probe;
pub mod progress;
pub mod sampler;

pub use clip::{ClipEncoder, EncodeJob, FfmpegClipEncoder};
pub use command::{check_ffmpeg, check_ffprobe, check_ytdlp, FfmpegCommand, FfmpegRunner};
pub use detection::{default_detector, select_largest_face, BoundingBox, DisabledFaceDetector, FaceDetector};
pub use download::{is_supported_url, VideoAcquirer, YtDlpAcquirer};
pub use error::{MediaError, MediaResult};
pub use focal::{estimate_focal_point, FaceLocator, FfmpegFaceLocator};
pub use geometry::{floor_even, resolve_crop, target_width};
pub use probe::{probe_video, SourceVideo};
pub use progress::FfmpegProgress;
