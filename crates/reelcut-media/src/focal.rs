//! Horizontal focal point estimation.
//!
//! The focal point decides where the vertical crop window sits. It is either
//! fixed at the center, supplied by the user, or estimated from the largest
//! face visible at the segment midpoint. Estimation never fails: any problem
//! sampling or detecting degrades to the center.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, warn};

use reelcut_models::{FocalMode, FocalPoint, Segment};

use crate::detection::{select_largest_face, BoundingBox, FaceDetector};
use crate::error::{MediaError, MediaResult};
use crate::probe::SourceVideo;
use crate::sampler::{sample_frame, SampledFrame};

/// Locates faces in a source video at a point in time.
#[async_trait]
pub trait FaceLocator: Send + Sync {
    /// Faces visible at `at_secs`, in source pixel coordinates.
    async fn locate_faces(&self, source: &SourceVideo, at_secs: f64) -> MediaResult<Vec<BoundingBox>>;

    /// Whether a working detector backs this locator.
    fn is_available(&self) -> bool {
        true
    }
}

/// [`FaceLocator`] that decodes one frame with ffmpeg and runs a
/// [`FaceDetector`] on it.
#[derive(Clone)]
pub struct FfmpegFaceLocator {
    detector: Arc<dyn FaceDetector>,
}

impl FfmpegFaceLocator {
    pub fn new(detector: Arc<dyn FaceDetector>) -> Self {
        Self { detector }
    }
}

#[async_trait]
impl FaceLocator for FfmpegFaceLocator {
    async fn locate_faces(&self, source: &SourceVideo, at_secs: f64) -> MediaResult<Vec<BoundingBox>> {
        let work_dir = tempfile::tempdir()?;
        let frame = sample_frame(source, at_secs, work_dir.path()).await?;
        let faces = detect_in_frame(Arc::clone(&self.detector), &frame, source.width).await?;
        debug!(
            detector = self.detector.name(),
            at_secs,
            faces = faces.len(),
            "Detected faces in sampled frame"
        );
        Ok(faces)
    }

    fn is_available(&self) -> bool {
        self.detector.is_enabled()
    }
}

/// Run `detector` on a sampled frame off the async runtime and map the boxes
/// from the frame's width back to `source_width`.
async fn detect_in_frame(
    detector: Arc<dyn FaceDetector>,
    frame: &SampledFrame,
    source_width: u32,
) -> MediaResult<Vec<BoundingBox>> {
    let frame_path = frame.path.clone();
    let faces = tokio::task::spawn_blocking(move || detector.detect(&frame_path))
        .await
        .map_err(|e| MediaError::internal(format!("Face detection task failed: {}", e)))??;
    Ok(faces
        .into_iter()
        .map(|f| f.scale_x(frame.width, source_width))
        .collect())
}

/// Resolve the focal point for one segment.
pub async fn estimate_focal_point(
    source: &SourceVideo,
    segment: &Segment,
    mode: &FocalMode,
    locator: &dyn FaceLocator,
) -> FocalPoint {
    match mode {
        FocalMode::Fixed => FocalPoint::CENTER,
        FocalMode::Explicit { percent } => FocalPoint::new(*percent),
        FocalMode::FaceDetected => detect_focal_point(source, segment, locator).await,
    }
}

async fn detect_focal_point(source: &SourceVideo, segment: &Segment, locator: &dyn FaceLocator) -> FocalPoint {
    if source.fps <= 0.0 || !source.fps.is_finite() {
        debug!("Source frame rate unknown, using center focal point");
        return FocalPoint::CENTER;
    }

    let at_secs = segment.midpoint();
    match locator.locate_faces(source, at_secs).await {
        Ok(faces) => match select_largest_face(&faces) {
            Some(face) => FocalPoint::from_pixel(face.cx(), source.width),
            None => {
                debug!(at_secs, "No face found, using center focal point");
                FocalPoint::CENTER
            }
        },
        Err(e) => {
            warn!(at_secs, error = %e, "Face location failed, using center focal point");
            FocalPoint::CENTER
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FixedFaces {
        result: Result<Vec<BoundingBox>, String>,
        calls: AtomicUsize,
    }

    impl FixedFaces {
        fn ok(faces: Vec<BoundingBox>) -> Self {
            Self {
                result: Ok(faces),
                calls: AtomicUsize::new(0),
            }
        }

        fn failing() -> Self {
            Self {
                result: Err("decoder exploded".to_string()),
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl FaceLocator for FixedFaces {
        async fn locate_faces(&self, _source: &SourceVideo, _at_secs: f64) -> MediaResult<Vec<BoundingBox>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.result.clone().map_err(MediaError::detection_failed)
        }
    }

    /// Detector reporting boxes in the coordinates of a 960 px analysis frame.
    struct AnalysisFrameDetector(Vec<BoundingBox>);

    impl FaceDetector for AnalysisFrameDetector {
        fn name(&self) -> &'static str {
            "analysis_frame"
        }

        fn detect(&self, _frame: &std::path::Path) -> MediaResult<Vec<BoundingBox>> {
            Ok(self.0.clone())
        }
    }

    fn source() -> SourceVideo {
        SourceVideo::new("in.mp4", 90.0, 1920, 1080, 30.0)
    }

    fn segment() -> Segment {
        Segment::new(30.0, 60.0, "Clip")
    }

    #[tokio::test]
    async fn test_fixed_and_explicit_modes() {
        let locator = FixedFaces::ok(vec![]);
        let p = estimate_focal_point(&source(), &segment(), &FocalMode::Fixed, &locator).await;
        assert_eq!(p.percent(), 50.0);

        let p = estimate_focal_point(&source(), &segment(), &FocalMode::Explicit { percent: 130.0 }, &locator).await;
        assert_eq!(p.percent(), 100.0);
        assert_eq!(locator.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_largest_face_sets_focal_point() {
        let locator = FixedFaces::ok(vec![
            BoundingBox::new(100.0, 50.0, 10.0, 10.0),
            BoundingBox::new(1200.0, 80.0, 20.0, 20.0),
        ]);
        let p = estimate_focal_point(&source(), &segment(), &FocalMode::FaceDetected, &locator).await;
        assert!((p.percent() - 1210.0 / 1920.0 * 100.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_no_faces_is_center() {
        let locator = FixedFaces::ok(vec![]);
        let p = estimate_focal_point(&source(), &segment(), &FocalMode::FaceDetected, &locator).await;
        assert_eq!(p, FocalPoint::CENTER);
    }

    #[tokio::test]
    async fn test_locator_failure_is_center() {
        let locator = FixedFaces::failing();
        let p = estimate_focal_point(&source(), &segment(), &FocalMode::FaceDetected, &locator).await;
        assert_eq!(p, FocalPoint::CENTER);
        assert_eq!(locator.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_unknown_frame_rate_skips_detection() {
        let mut src = source();
        src.fps = 0.0;
        let locator = FixedFaces::ok(vec![BoundingBox::new(0.0, 0.0, 50.0, 50.0)]);
        let p = estimate_focal_point(&src, &segment(), &FocalMode::FaceDetected, &locator).await;
        assert_eq!(p, FocalPoint::CENTER);
        assert_eq!(locator.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_downscaled_boxes_map_to_source_width() {
        let detector = Arc::new(AnalysisFrameDetector(vec![
            BoundingBox::new(100.0, 40.0, 30.0, 30.0),
            BoundingBox::new(700.0, 60.0, 80.0, 80.0),
        ]));
        let frame = SampledFrame {
            path: "frame.png".into(),
            width: 960,
            height: 540,
        };

        let faces = detect_in_frame(detector, &frame, 1920).await.unwrap();
        assert_eq!(faces[0], BoundingBox::new(200.0, 40.0, 60.0, 30.0));
        assert_eq!(faces[1].x, 1400.0);
        assert_eq!(faces[1].width, 160.0);

        // Largest face centered at 1480 of 1920 px
        let largest = select_largest_face(&faces).unwrap();
        let focal = FocalPoint::from_pixel(largest.cx(), 1920);
        assert!((focal.percent() - 1480.0 / 1920.0 * 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_locator_reports_detector_availability() {
        let enabled = FfmpegFaceLocator::new(Arc::new(AnalysisFrameDetector(vec![])));
        assert!(enabled.is_available());

        let disabled = FfmpegFaceLocator::new(Arc::new(crate::detection::DisabledFaceDetector));
        assert!(!disabled.is_available());
    }
}
