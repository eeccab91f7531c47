//! Framing definitions: target aspect ratio, focal point and crop rectangle.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Target output aspect ratio (width / height).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct AspectRatio {
    pub width: u32,
    pub height: u32,
}

impl AspectRatio {
    /// Vertical short-form video.
    pub const PORTRAIT_9_16: AspectRatio = AspectRatio {
        width: 9,
        height: 16,
    };

    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Ratio as a float.
    pub fn ratio(&self) -> f64 {
        if self.height == 0 {
            return 0.0;
        }
        self.width as f64 / self.height as f64
    }
}

impl Default for AspectRatio {
    fn default() -> Self {
        Self::PORTRAIT_9_16
    }
}

impl fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.width, self.height)
    }
}

/// Error parsing an aspect ratio string.
#[derive(Debug, Error)]
#[error("Invalid aspect ratio: {0} (expected W:H)")]
pub struct AspectRatioParseError(String);

impl FromStr for AspectRatio {
    type Err = AspectRatioParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (w, h) = s
            .split_once(':')
            .ok_or_else(|| AspectRatioParseError(s.to_string()))?;
        let width: u32 = w.trim().parse().map_err(|_| AspectRatioParseError(s.to_string()))?;
        let height: u32 = h.trim().parse().map_err(|_| AspectRatioParseError(s.to_string()))?;
        if width == 0 || height == 0 {
            return Err(AspectRatioParseError(s.to_string()));
        }
        Ok(Self { width, height })
    }
}

/// Horizontal position of the point of interest, as a percentage of the
/// full frame width (0 = left edge, 50 = center, 100 = right edge).
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize, JsonSchema)]
pub struct FocalPoint(f64);

impl FocalPoint {
    pub const CENTER: FocalPoint = FocalPoint(50.0);

    /// Create a focal point, clamping into [0, 100]. Non-finite input maps to center.
    pub fn new(percent: f64) -> Self {
        if !percent.is_finite() {
            return Self::CENTER;
        }
        Self(percent.clamp(0.0, 100.0))
    }

    /// Focal point at pixel column `x` of a frame `frame_width` pixels wide.
    pub fn from_pixel(x: f64, frame_width: u32) -> Self {
        if frame_width == 0 {
            return Self::CENTER;
        }
        Self::new(x / frame_width as f64 * 100.0)
    }

    pub fn percent(&self) -> f64 {
        self.0
    }
}

impl Default for FocalPoint {
    fn default() -> Self {
        Self::CENTER
    }
}

/// How the focal point of each segment is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum FocalMode {
    /// Always the frame center.
    Fixed,
    /// A caller supplied percentage.
    Explicit { percent: f64 },
    /// Largest face found in the segment's middle frame.
    FaceDetected,
}

impl Default for FocalMode {
    fn default() -> Self {
        Self::Fixed
    }
}

impl fmt::Display for FocalMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FocalMode::Fixed => write!(f, "fixed"),
            FocalMode::Explicit { percent } => write!(f, "explicit({:.1}%)", percent),
            FocalMode::FaceDetected => write!(f, "face_detected"),
        }
    }
}

/// Horizontal crop window. Vertical extent always equals the source height.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct CropRect {
    /// Left edge in pixels
    pub x1: u32,
    /// Crop width in pixels
    pub width: u32,
    /// Crop height in pixels (source height)
    pub height: u32,
}

impl CropRect {
    /// Full-frame crop, i.e. no narrowing.
    pub fn identity(frame_width: u32, frame_height: u32) -> Self {
        Self {
            x1: 0,
            width: frame_width,
            height: frame_height,
        }
    }

    /// Whether this crop leaves a `frame_width` wide frame untouched.
    pub fn is_identity(&self, frame_width: u32) -> bool {
        self.x1 == 0 && self.width >= frame_width
    }

    /// Right edge in pixels (exclusive).
    pub fn x2(&self) -> u32 {
        self.x1 + self.width
    }
}
