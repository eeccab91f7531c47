//! Encode progress reported by ffmpeg's `-progress` key/value stream.

use serde::{Deserialize, Serialize};

/// Snapshot of an encode in flight. A snapshot is emitted every time ffmpeg
/// closes a block with `progress=continue` or `progress=end`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FfmpegProgress {
    pub frame: u64,
    pub fps: f64,
    /// Position written so far, in milliseconds of output
    pub out_time_ms: i64,
    /// Encoding speed relative to realtime
    pub speed: f64,
    pub is_complete: bool,
}

impl FfmpegProgress {
    /// Fold one `key=value` line into the snapshot. Returns a copy when the
    /// line closes a block.
    pub fn apply_line(&mut self, line: &str) -> Option<FfmpegProgress> {
        let (key, value) = line.trim().split_once('=')?;
        match key {
            // Both keys carry microseconds.
            "out_time_us" | "out_time_ms" => {
                if let Ok(us) = value.parse::<i64>() {
                    self.out_time_ms = us / 1000;
                }
            }
            "frame" => self.frame = value.parse().unwrap_or(self.frame),
            "fps" => self.fps = value.parse().unwrap_or(self.fps),
            "speed" => {
                if let Some(speed) = value.strip_suffix('x').and_then(|s| s.trim().parse().ok()) {
                    self.speed = speed;
                }
            }
            "progress" => {
                self.is_complete = value == "end";
                return Some(self.clone());
            }
            _ => {}
        }
        None
    }

    /// Share of a clip of `clip_secs` already written, in percent.
    pub fn percent_of(&self, clip_secs: f64) -> f64 {
        if !clip_secs.is_finite() || clip_secs <= 0.0 {
            return 0.0;
        }
        (self.out_time_ms as f64 / (clip_secs * 1000.0) * 100.0).clamp(0.0, 100.0)
    }
}

/// Whether a stderr line belongs to the progress stream rather than to
/// ffmpeg's diagnostics.
pub(crate) fn is_progress_line(line: &str) -> bool {
    const KEYS: &[&str] = &[
        "frame",
        "fps",
        "bitrate",
        "total_size",
        "out_time_us",
        "out_time_ms",
        "out_time",
        "dup_frames",
        "drop_frames",
        "speed",
        "progress",
    ];
    match line.trim().split_once('=') {
        Some((key, _)) => KEYS.contains(&key) || key.starts_with("stream_"),
        None => false,
    }
}
