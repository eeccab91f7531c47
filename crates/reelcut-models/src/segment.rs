//! Segment models.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Maximum length of a heuristically selected clip (seconds).
pub const MAX_CLIP_SECONDS: f64 = 30.0;

/// Sources longer than this skip their first third as likely intro material.
pub const INTRO_SKIP_THRESHOLD_SECONDS: f64 = 60.0;

/// A validated time window of the source video.
///
/// Produced only by the segment selector, which guarantees
/// `0 <= start < end <= duration` for the source it was selected against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Segment {
    /// Start time in seconds
    pub start: f64,
    /// End time in seconds (exclusive)
    pub end: f64,
    /// Human readable label
    pub label: String,
}

impl Segment {
    pub fn new(start: f64, end: f64, label: impl Into<String>) -> Self {
        Self {
            start,
            end,
            label: label.into(),
        }
    }

    /// Segment length in seconds.
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }

    /// Temporal midpoint, used for single-frame sampling.
    pub fn midpoint(&self) -> f64 {
        self.start + self.duration() / 2.0
    }
}

/// An unvalidated segment proposal from the analysis step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SegmentCandidate {
    pub start: f64,
    pub end: f64,
    pub label: String,
}

impl SegmentCandidate {
    pub fn new(start: f64, end: f64, label: impl Into<String>) -> Self {
        Self {
            start,
            end,
            label: label.into(),
        }
    }

    /// Default label for the candidate at 1-based `position`.
    pub fn default_label(position: usize) -> String {
        format!("Viral Clip {}", position)
    }
}

/// Where the segments of a render request come from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SegmentSource {
    /// Duration-based single window.
    Heuristic,
    /// Single window starting at a caller-chosen offset.
    ExplicitStart { start: f64 },
    /// Externally proposed windows, clamped independently.
    Candidates { candidates: Vec<SegmentCandidate> },
}

impl Default for SegmentSource {
    fn default() -> Self {
        Self::Heuristic
    }
}
