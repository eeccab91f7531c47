//! Building and running ffmpeg invocations.
//!
//! Every invocation reads one input and writes one output. Seeking and
//! duration are input options so ffmpeg seeks by keyframe index instead of
//! decoding from the start; filters and codecs are output options.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tracing::{debug, warn};

use crate::error::{MediaError, MediaResult};
use crate::progress::{is_progress_line, FfmpegProgress};

/// Diagnostic stderr lines kept for error reports.
const STDERR_TAIL_LINES: usize = 50;

/// One ffmpeg invocation.
#[derive(Debug, Clone)]
pub struct FfmpegCommand {
    input: PathBuf,
    output: PathBuf,
    before_input: Vec<String>,
    after_input: Vec<String>,
}

impl FfmpegCommand {
    pub fn new(input: impl AsRef<Path>, output: impl AsRef<Path>) -> Self {
        Self {
            input: input.as_ref().to_path_buf(),
            output: output.as_ref().to_path_buf(),
            before_input: Vec::new(),
            after_input: Vec::new(),
        }
    }

    /// Start reading the input at `seconds`.
    pub fn seek(mut self, seconds: f64) -> Self {
        self.before_input.push("-ss".into());
        self.before_input.push(format!("{:.3}", seconds));
        self
    }

    /// Read at most `seconds` of the input.
    pub fn duration(mut self, seconds: f64) -> Self {
        self.before_input.push("-t".into());
        self.before_input.push(format!("{:.3}", seconds));
        self
    }

    /// Append raw output options.
    pub fn output_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.after_input.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn video_filter(self, filter: impl Into<String>) -> Self {
        self.output_args(["-vf".to_string(), filter.into()])
    }

    /// Write exactly one video frame.
    pub fn single_frame(self) -> Self {
        self.output_args(["-frames:v", "1"])
    }

    /// Put the MP4 index first so players can start before the download ends.
    pub fn faststart(self) -> Self {
        self.output_args(["-movflags", "+faststart"])
    }

    pub fn output(&self) -> &Path {
        &self.output
    }

    /// Full argument list, without the program name.
    pub fn build_args(&self) -> Vec<String> {
        let mut args: Vec<String> = ["-y", "-hide_banner", "-nostats", "-v", "error", "-progress", "pipe:2"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        args.extend(self.before_input.iter().cloned());
        args.push("-i".into());
        args.push(self.input.to_string_lossy().into_owned());
        args.extend(self.after_input.iter().cloned());
        args.push(self.output.to_string_lossy().into_owned());
        args
    }
}

/// Runs [`FfmpegCommand`]s, optionally killing ones that overrun.
#[derive(Debug, Clone, Default)]
pub struct FfmpegRunner {
    timeout: Option<Duration>,
}

impl FfmpegRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Kill the process after `secs`; `None` waits indefinitely.
    pub fn with_timeout(mut self, secs: Option<u64>) -> Self {
        self.timeout = secs.map(Duration::from_secs);
        self
    }

    pub async fn run(&self, cmd: &FfmpegCommand) -> MediaResult<()> {
        self.run_with_progress(cmd, |_| {}).await
    }

    /// Run `cmd`, calling `on_progress` for every progress block ffmpeg
    /// reports. On failure the error carries the tail of ffmpeg's stderr.
    pub async fn run_with_progress<F>(&self, cmd: &FfmpegCommand, on_progress: F) -> MediaResult<()>
    where
        F: Fn(&FfmpegProgress) + Send + 'static,
    {
        let ffmpeg = check_ffmpeg()?;
        let args = cmd.build_args();
        debug!("ffmpeg {}", args.join(" "));

        let mut child = Command::new(ffmpeg)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| MediaError::internal("ffmpeg stderr was not piped"))?;

        let reader = tokio::spawn(async move {
            let mut lines = BufReader::new(stderr).lines();
            let mut progress = FfmpegProgress::default();
            let mut tail = VecDeque::with_capacity(STDERR_TAIL_LINES);
            while let Ok(Some(line)) = lines.next_line().await {
                if is_progress_line(&line) {
                    if let Some(snapshot) = progress.apply_line(&line) {
                        on_progress(&snapshot);
                    }
                } else if !line.trim().is_empty() {
                    if tail.len() == STDERR_TAIL_LINES {
                        tail.pop_front();
                    }
                    tail.push_back(line);
                }
            }
            tail.into_iter().collect::<Vec<_>>().join("\n")
        });

        let status = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, child.wait()).await {
                Ok(status) => status?,
                Err(_) => {
                    warn!("ffmpeg exceeded {}s, killing it", limit.as_secs());
                    let _ = child.kill().await;
                    return Err(MediaError::Timeout(limit.as_secs()));
                }
            },
            None => child.wait().await?,
        };

        let stderr_tail = reader.await.unwrap_or_default();
        if status.success() {
            return Ok(());
        }
        Err(MediaError::ffmpeg_failed(
            format!("ffmpeg exited with {}", status),
            (!stderr_tail.is_empty()).then_some(stderr_tail),
            status.code(),
        ))
    }
}

/// Path of the ffmpeg binary.
pub fn check_ffmpeg() -> MediaResult<PathBuf> {
    which::which("ffmpeg").map_err(|_| MediaError::ToolNotFound("ffmpeg"))
}

/// Path of the ffprobe binary.
pub fn check_ffprobe() -> MediaResult<PathBuf> {
    which::which("ffprobe").map_err(|_| MediaError::ToolNotFound("ffprobe"))
}

/// Path of the yt-dlp binary.
pub fn check_ytdlp() -> MediaResult<PathBuf> {
    which::which("yt-dlp").map_err(|_| MediaError::ToolNotFound("yt-dlp"))
}
