//! Frontal face detection on single sampled frames.
//!
//! Backends:
//! - **OpenCV Haar cascade** (requires the `opencv` feature and a cascade file)
//! - **Disabled**: reports no faces and `is_enabled() == false`, so face framing is refused

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

use crate::error::MediaResult;
#[cfg(feature = "opencv")]
use crate::error::MediaError;

/// Cascade file locations in preference order.
pub(crate) const CASCADE_PATHS: &[&str] = &[
    "./models/haarcascade_frontalface_default.xml",
    "/app/models/haarcascade_frontalface_default.xml",
    "/usr/share/opencv4/haarcascades/haarcascade_frontalface_default.xml",
    "/usr/local/share/opencv4/haarcascades/haarcascade_frontalface_default.xml",
    "/usr/share/opencv/haarcascades/haarcascade_frontalface_default.xml",
];

/// Bounding box in pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    /// Left edge x-coordinate
    pub x: f64,
    /// Top edge y-coordinate
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl BoundingBox {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }

    /// Center x-coordinate.
    #[inline]
    pub fn cx(&self) -> f64 {
        self.x + self.width / 2.0
    }

    /// Box area in pixels.
    #[inline]
    pub fn area(&self) -> f64 {
        self.width * self.height
    }

    /// Rescale from a `from_width` wide frame to a `to_width` wide frame.
    pub fn scale_x(&self, from_width: u32, to_width: u32) -> BoundingBox {
        if from_width == 0 || from_width == to_width {
            return *self;
        }
        let factor = to_width as f64 / from_width as f64;
        BoundingBox {
            x: self.x * factor,
            width: self.width * factor,
            ..*self
        }
    }
}

/// Pick the largest face by area. On equal areas the earliest detection wins.
pub fn select_largest_face(faces: &[BoundingBox]) -> Option<&BoundingBox> {
    faces.iter().fold(None, |best: Option<&BoundingBox>, face| match best {
        Some(current) if face.area() <= current.area() => Some(current),
        _ => Some(face),
    })
}

/// A detector that finds frontal faces in a still image on disk.
pub trait FaceDetector: Send + Sync {
    /// Backend name for logging.
    fn name(&self) -> &'static str;

    /// Detect faces in the image at `frame`, in that image's pixel coordinates.
    fn detect(&self, frame: &Path) -> MediaResult<Vec<BoundingBox>>;

    /// False for backends that can never report a face.
    fn is_enabled(&self) -> bool {
        true
    }
}

/// Detector used when no face backend is available. Always finds nothing and
/// reports itself as disabled.
#[derive(Debug, Clone, Default)]
pub struct DisabledFaceDetector;

impl FaceDetector for DisabledFaceDetector {
    fn name(&self) -> &'static str {
        "disabled"
    }

    fn detect(&self, _frame: &Path) -> MediaResult<Vec<BoundingBox>> {
        Ok(Vec::new())
    }

    fn is_enabled(&self) -> bool {
        false
    }
}

/// Find a usable cascade file: the explicit path if it exists, otherwise the
/// first well-known location that does.
pub fn find_cascade_path(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        if path.exists() {
            return Some(path.to_path_buf());
        }
        warn!("Configured face cascade not found: {}", path.display());
    }
    CASCADE_PATHS
        .iter()
        .map(Path::new)
        .find(|p| p.exists())
        .map(Path::to_path_buf)
}

/// Build the best available detector.
///
/// Never fails: a missing backend or cascade yields [`DisabledFaceDetector`].
pub fn default_detector(cascade: Option<&Path>) -> Arc<dyn FaceDetector> {
    #[cfg(feature = "opencv")]
    {
        match find_cascade_path(cascade) {
            Some(path) => match HaarCascadeDetector::new(&path) {
                Ok(detector) => {
                    info!("Using Haar cascade face detection: {}", path.display());
                    return Arc::new(detector);
                }
                Err(e) => warn!("Failed to load face cascade {}: {}", path.display(), e),
            },
            None => warn!("No face cascade found, face framing is unavailable"),
        }
    }

    #[cfg(not(feature = "opencv"))]
    {
        if find_cascade_path(cascade).is_some() {
            warn!("Face cascade present but the opencv feature is disabled");
        } else {
            info!("Built without the opencv feature, face framing is unavailable");
        }
    }

    Arc::new(DisabledFaceDetector)
}

/// OpenCV Haar cascade frontal face detector.
#[cfg(feature = "opencv")]
pub struct HaarCascadeDetector {
    classifier: std::sync::Mutex<opencv::objdetect::CascadeClassifier>,
}

#[cfg(feature = "opencv")]
impl HaarCascadeDetector {
    const SCALE_FACTOR: f64 = 1.1;
    const MIN_NEIGHBORS: i32 = 5;
    const MIN_FACE_PX: i32 = 30;

    pub fn new(cascade_path: &Path) -> MediaResult<Self> {
        use opencv::prelude::*;

        let classifier = opencv::objdetect::CascadeClassifier::new(&cascade_path.to_string_lossy())
            .map_err(|e| MediaError::detection_failed(format!("Cannot load cascade: {}", e)))?;
        // A file that does not parse leaves the classifier empty rather than erroring.
        if classifier.empty().unwrap_or(true) {
            return Err(MediaError::detection_failed(format!(
                "Cascade is empty or unreadable: {}",
                cascade_path.display()
            )));
        }
        Ok(Self {
            classifier: std::sync::Mutex::new(classifier),
        })
    }
}

#[cfg(feature = "opencv")]
impl FaceDetector for HaarCascadeDetector {
    fn name(&self) -> &'static str {
        "haar_cascade"
    }

    fn detect(&self, frame: &Path) -> MediaResult<Vec<BoundingBox>> {
        use opencv::core::{Mat, Rect, Size, Vector};
        use opencv::prelude::*;
        use opencv::{imgcodecs, imgproc};

        let gray = imgcodecs::imread(&frame.to_string_lossy(), imgcodecs::IMREAD_GRAYSCALE)
            .map_err(|e| MediaError::detection_failed(format!("Cannot read frame: {}", e)))?;
        if gray.empty() {
            return Err(MediaError::detection_failed(format!(
                "Empty frame image: {}",
                frame.display()
            )));
        }

        let mut equalized = Mat::default();
        imgproc::equalize_hist(&gray, &mut equalized)
            .map_err(|e| MediaError::detection_failed(e.to_string()))?;

        let mut faces: Vector<Rect> = Vector::new();
        let mut classifier = self
            .classifier
            .lock()
            .map_err(|_| MediaError::internal("Face cascade lock poisoned"))?;
        classifier
            .detect_multi_scale(
                &equalized,
                &mut faces,
                Self::SCALE_FACTOR,
                Self::MIN_NEIGHBORS,
                0,
                Size::new(Self::MIN_FACE_PX, Self::MIN_FACE_PX),
                Size::new(0, 0),
            )
            .map_err(|e| MediaError::detection_failed(e.to_string()))?;

        Ok(faces
            .iter()
            .map(|r| BoundingBox::new(r.x as f64, r.y as f64, r.width as f64, r.height as f64))
            .collect())
    }
}
