//! Remote video acquisition using yt-dlp.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, info};

use crate::command::check_ytdlp;
use crate::error::{MediaError, MediaResult};

/// Format selector preferring MP4 video with M4A audio.
const FORMAT_SELECTOR: &str = "bestvideo[ext=mp4]+bestaudio[ext=m4a]/best[ext=mp4]/best";

/// Fetches a remote video into a local file.
#[async_trait]
pub trait VideoAcquirer: Send + Sync {
    /// Download `url` into `dest_dir`, returning the local file path.
    async fn acquire(&self, url: &str, dest_dir: &Path) -> MediaResult<PathBuf>;
}

/// [`VideoAcquirer`] backed by the yt-dlp CLI.
#[derive(Debug, Clone, Default)]
pub struct YtDlpAcquirer {
    /// Optional Netscape cookies file passed through to yt-dlp
    cookies: Option<PathBuf>,
}

impl YtDlpAcquirer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cookies(mut self, path: impl Into<PathBuf>) -> Self {
        self.cookies = Some(path.into());
        self
    }

    fn build_args(&self, url: &str, output: &Path) -> Vec<String> {
        let mut args = vec![
            "--no-playlist".to_string(),
            "-f".to_string(),
            FORMAT_SELECTOR.to_string(),
            "--merge-output-format".to_string(),
            "mp4".to_string(),
            "-o".to_string(),
            output.to_string_lossy().to_string(),
        ];
        if let Some(cookies) = self.cookies.as_ref().filter(|p| p.exists()) {
            args.push("--cookies".to_string());
            args.push(cookies.to_string_lossy().to_string());
        }
        args.push(url.to_string());
        args
    }
}

#[async_trait]
impl VideoAcquirer for YtDlpAcquirer {
    async fn acquire(&self, url: &str, dest_dir: &Path) -> MediaResult<PathBuf> {
        if !is_supported_url(url) {
            return Err(MediaError::UnsupportedSource(url.to_string()));
        }

        let ytdlp = check_ytdlp()?;

        let output_path = dest_dir.join(format!("source_{}.mp4", uuid::Uuid::new_v4().simple()));
        info!("Downloading video from {} to {}", url, output_path.display());

        let output = Command::new(ytdlp)
            .args(self.build_args(url, &output_path))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            debug!("yt-dlp stderr: {}", stderr);
            let error_msg = stderr
                .lines()
                .rev()
                .find(|l| !l.trim().is_empty())
                .unwrap_or("Unknown error");
            return Err(MediaError::download_failed(format!("yt-dlp failed: {}", error_msg)));
        }

        if !output_path.exists() {
            return Err(MediaError::download_failed("Output file not created"));
        }

        let file_size = output_path.metadata()?.len();
        info!(
            output = %output_path.display(),
            size_mb = file_size as f64 / (1024.0 * 1024.0),
            "Downloaded video successfully"
        );

        Ok(output_path)
    }
}

/// Whether `source` is a fetchable http(s) URL rather than a local path.
pub fn is_supported_url(source: &str) -> bool {
    url::Url::parse(source)
        .map(|u| matches!(u.scheme(), "http" | "https") && u.host_str().is_some())
        .unwrap_or(false)
}
