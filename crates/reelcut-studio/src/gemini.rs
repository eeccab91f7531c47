//! Gemini client for segment proposals.
//!
//! The source video is pushed through the Gemini File API (resumable upload),
//! polled until the service has finished ingesting it, and then referenced
//! from a `generateContent` call that asks for the most shareable moments.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use reelcut_media::SourceVideo;

use crate::analysis::SegmentProposer;
use crate::config::StudioConfig;
use crate::error::{StudioError, StudioResult};

const API_BASE: &str = "https://generativelanguage.googleapis.com";
const VIDEO_MIME_TYPE: &str = "video/mp4";

const HIGHLIGHT_PROMPT: &str = "You are a short-form video editor. Watch this video and find the moments \
most likely to go viral as vertical shorts. Each moment should be between 10 and 30 seconds long. \
Respond with only a JSON array, no prose, where every element is an object with \
\"start\" (seconds from the beginning), \"end\" (seconds from the beginning) and \"title\" (a short catchy label).";

/// Gemini API request.
#[derive(Debug, Serialize)]
struct GeminiRequest {
    contents: Vec<Content>,
}

#[derive(Debug, Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
struct Part {
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    file_data: Option<FileData>,
}

#[derive(Debug, Serialize)]
struct FileData {
    mime_type: String,
    file_uri: String,
}

/// Gemini API response.
#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: ResponseContent,
}

#[derive(Debug, Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Serialize)]
struct UploadStart<'a> {
    file: UploadMetadata<'a>,
}

#[derive(Debug, Serialize)]
struct UploadMetadata<'a> {
    display_name: &'a str,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    file: RemoteFile,
}

/// A file known to the Gemini File API.
#[derive(Debug, Clone, Deserialize)]
struct RemoteFile {
    name: String,
    uri: String,
    #[serde(default)]
    state: FileState,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
enum FileState {
    #[default]
    StateUnspecified,
    Processing,
    Active,
    Failed,
}

/// [`SegmentProposer`] backed by Gemini.
pub struct GeminiProposer {
    api_key: String,
    model: String,
    client: Client,
    ready_timeout: Duration,
    poll_interval: Duration,
}

impl GeminiProposer {
    /// Create a proposer from configuration. Fails when no API key is set.
    pub fn from_config(config: &StudioConfig) -> StudioResult<Self> {
        let api_key = config
            .gemini_api_key
            .clone()
            .ok_or_else(|| StudioError::config_error("GEMINI_API_KEY not set"))?;

        Ok(Self {
            api_key,
            model: config.gemini_model.clone(),
            client: Client::new(),
            ready_timeout: config.analysis_timeout,
            poll_interval: config.analysis_poll_interval,
        })
    }

    async fn upload(&self, path: &Path) -> StudioResult<RemoteFile> {
        let size = tokio::fs::metadata(path).await?.len();
        let display_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "source.mp4".to_string());

        let start = self
            .client
            .post(format!("{}/upload/v1beta/files", API_BASE))
            .query(&[("key", &self.api_key)])
            .header("X-Goog-Upload-Protocol", "resumable")
            .header("X-Goog-Upload-Command", "start")
            .header("X-Goog-Upload-Header-Content-Length", size.to_string())
            .header("X-Goog-Upload-Header-Content-Type", VIDEO_MIME_TYPE)
            .json(&UploadStart {
                file: UploadMetadata {
                    display_name: &display_name,
                },
            })
            .send()
            .await
            .map_err(|e| StudioError::analysis_failed(format!("Upload start failed: {}", e)))?;

        let start = ensure_success(start, "Upload start").await?;
        let upload_url = start
            .headers()
            .get("x-goog-upload-url")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .ok_or_else(|| StudioError::analysis_failed("Upload start returned no upload URL"))?;

        let file = tokio::fs::File::open(path).await?;
        let finished = self
            .client
            .post(upload_url)
            .header("Content-Length", size.to_string())
            .header("X-Goog-Upload-Offset", "0")
            .header("X-Goog-Upload-Command", "upload, finalize")
            .body(reqwest::Body::from(file))
            .send()
            .await
            .map_err(|e| StudioError::analysis_failed(format!("Upload failed: {}", e)))?;

        let uploaded: UploadResponse = ensure_success(finished, "Upload")
            .await?
            .json()
            .await
            .map_err(|e| StudioError::analysis_failed(format!("Failed to parse upload response: {}", e)))?;

        info!(file = %uploaded.file.name, size_bytes = size, "Uploaded video for analysis");
        Ok(uploaded.file)
    }

    async fn get_file(&self, name: &str) -> StudioResult<RemoteFile> {
        let response = self
            .client
            .get(format!("{}/v1beta/{}", API_BASE, name))
            .query(&[("key", &self.api_key)])
            .send()
            .await
            .map_err(|e| StudioError::analysis_failed(format!("File status request failed: {}", e)))?;

        ensure_success(response, "File status")
            .await?
            .json()
            .await
            .map_err(|e| StudioError::analysis_failed(format!("Failed to parse file status: {}", e)))
    }

    /// Poll until the uploaded file is ready, bounded by the configured timeout.
    async fn wait_until_active(&self, mut file: RemoteFile) -> StudioResult<RemoteFile> {
        let deadline = Instant::now() + self.ready_timeout;
        loop {
            match file.state {
                FileState::Active => return Ok(file),
                FileState::Failed => {
                    return Err(StudioError::analysis_failed(format!(
                        "Video ingestion failed for {}",
                        file.name
                    )))
                }
                FileState::Processing | FileState::StateUnspecified => {}
            }

            if Instant::now() + self.poll_interval > deadline {
                return Err(StudioError::analysis_failed(format!(
                    "Video not ready after {}s",
                    self.ready_timeout.as_secs()
                )));
            }

            debug!(file = %file.name, state = ?file.state, "Waiting for uploaded video");
            tokio::time::sleep(self.poll_interval).await;
            file = self.get_file(&file.name).await?;
        }
    }

    async fn generate(&self, file: &RemoteFile) -> StudioResult<String> {
        let url = format!("{}/v1beta/models/{}:generateContent", API_BASE, self.model);
        let request = GeminiRequest {
            contents: vec![Content {
                parts: vec![
                    Part {
                        text: None,
                        file_data: Some(FileData {
                            mime_type: VIDEO_MIME_TYPE.to_string(),
                            file_uri: file.uri.clone(),
                        }),
                    },
                    Part {
                        text: Some(HIGHLIGHT_PROMPT.to_string()),
                        file_data: None,
                    },
                ],
            }],
        };

        let response = self
            .client
            .post(&url)
            .query(&[("key", &self.api_key)])
            .json(&request)
            .send()
            .await
            .map_err(|e| StudioError::analysis_failed(format!("Gemini API request failed: {}", e)))?;

        let gemini_response: GeminiResponse = ensure_success(response, "Gemini API")
            .await?
            .json()
            .await
            .map_err(|e| StudioError::analysis_failed(format!("Failed to parse Gemini response: {}", e)))?;

        response_text(&gemini_response).ok_or_else(|| StudioError::analysis_failed("No content in Gemini response"))
    }

    async fn delete_file(&self, name: &str) {
        let result = self
            .client
            .delete(format!("{}/v1beta/{}", API_BASE, name))
            .query(&[("key", &self.api_key)])
            .send()
            .await;
        if let Err(e) = result {
            warn!(file = %name, error = %e, "Failed to delete uploaded video");
        }
    }
}

#[async_trait]
impl SegmentProposer for GeminiProposer {
    async fn propose(&self, source: &SourceVideo) -> StudioResult<String> {
        let uploaded = self.upload(&source.path).await?;
        let name = uploaded.name.clone();

        let result = match self.wait_until_active(uploaded).await {
            Ok(file) => self.generate(&file).await,
            Err(e) => Err(e),
        };

        self.delete_file(&name).await;
        result
    }
}

async fn ensure_success(response: reqwest::Response, action: &str) -> StudioResult<reqwest::Response> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status();
    let error_text = response.text().await.unwrap_or_default();
    Err(StudioError::analysis_failed(format!(
        "{} returned {}: {}",
        action, status, error_text
    )))
}

/// Concatenated text parts of the first candidate.
fn response_text(response: &GeminiResponse) -> Option<String> {
    let text: String = response
        .candidates
        .first()?
        .content
        .parts
        .iter()
        .filter_map(|p| p.text.as_deref())
        .collect();
    (!text.trim().is_empty()).then_some(text)
}
