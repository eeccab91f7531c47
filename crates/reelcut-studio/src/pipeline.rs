//! Clip render pipeline.
//!
//! One request renders every selected segment of one source video:
//!
//! 1. Check the caller may render at all (no work, no charge otherwise)
//! 2. Select and clamp segments against the source duration
//! 3. Per segment: focal point → crop window → encode → read bytes
//! 4. Charge one credit if anything was produced
//!
//! Segments are independent: a failing segment is skipped and reported, the
//! rest of the batch carries on.

use std::path::Path;
use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, Instrument};

use reelcut_media::{
    estimate_focal_point, resolve_crop, ClipEncoder, EncodeJob, FaceLocator, FfmpegClipEncoder, FfmpegFaceLocator,
    SourceVideo,
};
use reelcut_models::encoding::OUTPUT_EXTENSION;
use reelcut_models::{Account, FocalMode, RenderRequest, RenderedClip, Segment, SegmentSource, SkippedSegment};

use crate::accounts::{resolve_account, AccountStore};
use crate::analysis::{analyze_candidates, SegmentProposer};
use crate::config::StudioConfig;
use crate::context::RequestContext;
use crate::credits::{charge_render_credit, is_chargeable};
use crate::error::{StudioError, StudioResult};
use crate::logging::RenderLogger;
use crate::selector::select_segments;

/// Outcome of one render request.
#[derive(Debug, Clone)]
pub struct RenderBatch {
    pub request_id: String,
    pub clips: Vec<RenderedClip>,
    /// Segments that were proposed or selected but produced no clip
    pub skipped: Vec<SkippedSegment>,
    /// Whether a credit was taken for this request
    pub credit_charged: bool,
}

/// The render pipeline and its collaborators.
#[derive(Clone)]
pub struct RenderPipeline {
    encoder: Arc<dyn ClipEncoder>,
    face_locator: Arc<dyn FaceLocator>,
    accounts: Arc<dyn AccountStore>,
    config: StudioConfig,
}

impl RenderPipeline {
    pub fn new(
        encoder: Arc<dyn ClipEncoder>,
        face_locator: Arc<dyn FaceLocator>,
        accounts: Arc<dyn AccountStore>,
        config: StudioConfig,
    ) -> Self {
        Self {
            encoder,
            face_locator,
            accounts,
            config,
        }
    }

    /// Pipeline using ffmpeg for encoding and the best available face detector.
    pub fn with_ffmpeg(accounts: Arc<dyn AccountStore>, config: StudioConfig) -> Self {
        let encoder = FfmpegClipEncoder::new().with_timeout(config.encode_timeout_secs);
        let detector = reelcut_media::default_detector(config.face_cascade.as_deref());
        Self::new(
            Arc::new(encoder),
            Arc::new(FfmpegFaceLocator::new(detector)),
            accounts,
            config,
        )
    }

    pub fn config(&self) -> &StudioConfig {
        &self.config
    }

    /// Resolve the caller's account and refuse callers without access.
    pub async fn authorize(&self, ctx: &RequestContext) -> StudioResult<Account> {
        let account = resolve_account(self.accounts.as_ref(), &ctx.email, ctx.is_admin())
            .await?
            .ok_or_else(|| StudioError::access_denied(format!("no account for {}", ctx.email)))?;

        if !account.has_access() {
            return Err(StudioError::access_denied(format!("{} has no credits left", ctx.email)));
        }
        Ok(account)
    }

    /// Face framing needs a working detector; refuse it up front rather than
    /// silently centering every clip.
    fn check_framing(&self, request: &RenderRequest) -> StudioResult<()> {
        if matches!(request.focal, FocalMode::FaceDetected) && !self.face_locator.is_available() {
            return Err(StudioError::config_error(
                "face framing requested but no face detector is available (opencv feature or cascade file missing)",
            ));
        }
        Ok(())
    }

    /// Ask `proposer` for candidate segments, then render them.
    ///
    /// Access is checked before the analysis call so a refused caller costs
    /// nothing.
    pub async fn analyze_and_render(
        &self,
        ctx: &RequestContext,
        source: &SourceVideo,
        proposer: &dyn SegmentProposer,
        request: RenderRequest,
    ) -> StudioResult<RenderBatch> {
        self.authorize(ctx).await?;
        self.check_framing(&request)?;
        let candidates = analyze_candidates(proposer, source).await?;
        let request = request.with_segments(SegmentSource::Candidates { candidates });
        self.render(ctx, source, &request).await
    }

    /// Render all segments of `request` from `source`.
    pub async fn render(
        &self,
        ctx: &RequestContext,
        source: &SourceVideo,
        request: &RenderRequest,
    ) -> StudioResult<RenderBatch> {
        let request_id = uuid::Uuid::new_v4().simple().to_string();
        let logger = RenderLogger::new(&request_id, "render_clips");
        let span = logger.create_span();
        self.render_inner(ctx, source, request, logger).instrument(span).await
    }

    async fn render_inner(
        &self,
        ctx: &RequestContext,
        source: &SourceVideo,
        request: &RenderRequest,
        logger: RenderLogger,
    ) -> StudioResult<RenderBatch> {
        let account = self.authorize(ctx).await.map_err(|e| {
            logger.log_warning(&e.to_string());
            e
        })?;
        self.check_framing(request).map_err(|e| {
            logger.log_warning(&e.to_string());
            e
        })?;

        logger.log_start(&format!(
            "{} ({}x{}, {:.1}s, {:.2} fps), focal {}, enhance {}",
            source.path.display(),
            source.width,
            source.height,
            source.duration,
            source.fps,
            request.focal,
            request.enhancement.enabled
        ));

        let selection = select_segments(&request.segments, source.duration);
        let mut skipped = selection.skipped.clone();
        if selection.is_empty() {
            logger.log_warning("No segment survived selection");
            return Err(StudioError::nothing_to_process(format!(
                "no valid segment within a {:.3}s source",
                source.duration
            )));
        }

        tokio::fs::create_dir_all(&self.config.work_dir).await?;
        let work_dir = tempfile::Builder::new()
            .prefix("render_")
            .tempdir_in(&self.config.work_dir)?;

        let stem = output_stem(&source.path);
        let total = selection.segments.len();
        let mut clips = Vec::with_capacity(total);

        for (batch_idx, (position, segment)) in selection.indexed().enumerate() {
            let filename = format!(
                "{}_{}_{}.{}",
                stem,
                batch_idx + 1,
                &logger.request_id()[..8],
                OUTPUT_EXTENSION
            );
            let output = work_dir.path().join(&filename);

            match self.render_segment(source, segment, request, &output).await {
                Ok(bytes) => {
                    logger.log_progress(&format!(
                        "Clip {}/{} '{}' [{:.3}, {:.3}) rendered ({} bytes)",
                        batch_idx + 1,
                        total,
                        segment.label,
                        segment.start,
                        segment.end,
                        bytes.len()
                    ));
                    clips.push(RenderedClip {
                        bytes,
                        filename,
                        label: segment.label.clone(),
                        segment: segment.clone(),
                        rendered_at: Utc::now(),
                    });
                }
                Err(e) => {
                    logger.log_warning(&format!("Clip {}/{} '{}' failed: {}", batch_idx + 1, total, segment.label, e));
                    skipped.push(SkippedSegment::new(position, &segment.label, e.to_string()));
                }
            }
        }

        drop(work_dir);

        if clips.is_empty() {
            logger.log_error("Every segment failed to render");
            let reasons: Vec<String> = skipped.iter().map(|s| format!("{}: {}", s.label, s.reason)).collect();
            return Err(StudioError::processing_failed(reasons.join("; ")));
        }

        let credit_charged = if is_chargeable(ctx, &account) {
            charge_render_credit(self.accounts.as_ref(), &ctx.email, self.config.credit_timeout).await
        } else {
            false
        };

        logger.log_completion(&format!(
            "{} clip(s), {} skipped, credit charged: {}",
            clips.len(),
            skipped.len(),
            credit_charged
        ));

        Ok(RenderBatch {
            request_id: logger.request_id().to_string(),
            clips,
            skipped,
            credit_charged,
        })
    }

    /// Encode one segment and return the clip bytes. The encoded file is
    /// removed once read.
    async fn render_segment(
        &self,
        source: &SourceVideo,
        segment: &Segment,
        request: &RenderRequest,
        output: &Path,
    ) -> StudioResult<Vec<u8>> {
        let focal = estimate_focal_point(source, segment, &request.focal, self.face_locator.as_ref()).await;
        let crop = resolve_crop(source.width, source.height, request.target_ratio.ratio(), focal);

        let job = EncodeJob {
            input: source.path.clone(),
            output: output.to_path_buf(),
            start: segment.start,
            duration: segment.duration(),
            crop,
            frame_width: source.width,
            enhancement: request.enhancement,
            encoding: self.config.encoding.clone(),
        };
        self.encoder.encode(&job).await?;

        let bytes = tokio::fs::read(output).await?;
        if let Err(e) = tokio::fs::remove_file(output).await {
            debug!("Failed to remove encoded clip {}: {}", output.display(), e);
        }
        Ok(bytes)
    }
}

/// Filename stem for clips cut from `path`.
fn output_stem(path: &Path) -> String {
    let stem: String = path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();
    if stem.is_empty() {
        "clip".to_string()
    } else {
        stem
    }
}
