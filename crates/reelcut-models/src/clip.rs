//! Render request and output clip models.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::encoding::EnhancementSpec;
use crate::framing::{AspectRatio, FocalMode};
use crate::segment::{Segment, SegmentSource};

/// One render request: every variant of the clipping flow is expressed as a
/// combination of these three knobs plus the target ratio.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct RenderRequest {
    #[serde(default)]
    pub segments: SegmentSource,
    #[serde(default)]
    pub focal: FocalMode,
    #[serde(default)]
    pub enhancement: EnhancementSpec,
    #[serde(default)]
    pub target_ratio: AspectRatio,
}

impl Default for RenderRequest {
    fn default() -> Self {
        Self {
            segments: SegmentSource::Heuristic,
            focal: FocalMode::Fixed,
            enhancement: EnhancementSpec::default(),
            target_ratio: AspectRatio::PORTRAIT_9_16,
        }
    }
}

impl RenderRequest {
    pub fn with_segments(mut self, segments: SegmentSource) -> Self {
        self.segments = segments;
        self
    }

    pub fn with_focal(mut self, focal: FocalMode) -> Self {
        self.focal = focal;
        self
    }

    pub fn with_enhancement(mut self, enabled: bool) -> Self {
        self.enhancement = EnhancementSpec::new(enabled);
        self
    }

    pub fn with_target_ratio(mut self, ratio: AspectRatio) -> Self {
        self.target_ratio = ratio;
        self
    }
}

/// A finished clip, owned by the caller once returned.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct RenderedClip {
    /// Encoded MP4 bytes
    #[serde(skip)]
    pub bytes: Vec<u8>,
    /// Suggested download filename, unique within the batch
    pub filename: String,
    pub label: String,
    /// Segment this clip was cut from
    pub segment: Segment,
    pub rendered_at: DateTime<Utc>,
}

impl RenderedClip {
    pub fn size_bytes(&self) -> usize {
        self.bytes.len()
    }
}

/// A segment that was selected or proposed but not rendered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SkippedSegment {
    /// Position in the original candidate list (0-based)
    pub index: usize,
    pub label: String,
    pub reason: String,
}

impl SkippedSegment {
    pub fn new(index: usize, label: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            index,
            label: label.into(),
            reason: reason.into(),
        }
    }
}
