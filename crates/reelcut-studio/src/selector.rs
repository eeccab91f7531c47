//! Segment selection.
//!
//! Turns a [`SegmentSource`] into validated [`Segment`]s for a source of known
//! duration. Every returned segment satisfies `0 <= start < end <= duration`.

use tracing::debug;

use reelcut_models::segment::{INTRO_SKIP_THRESHOLD_SECONDS, MAX_CLIP_SECONDS};
use reelcut_models::timestamp::format_seconds;
use reelcut_models::{Segment, SegmentCandidate, SegmentSource, SkippedSegment};

const HEURISTIC_LABEL: &str = "Viral Short";

/// Segments chosen for a render, plus proposals that were dropped.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Selection {
    pub segments: Vec<Segment>,
    /// Position of each selected segment in the proposal list
    pub positions: Vec<usize>,
    pub skipped: Vec<SkippedSegment>,
}

impl Selection {
    fn single(segment: Option<Segment>) -> Self {
        let segments: Vec<Segment> = segment.into_iter().collect();
        Self {
            positions: (0..segments.len()).collect(),
            segments,
            skipped: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Selected segments with their proposal positions.
    pub fn indexed(&self) -> impl Iterator<Item = (usize, &Segment)> {
        self.positions.iter().copied().zip(self.segments.iter())
    }
}

fn valid_duration(duration: f64) -> Option<f64> {
    (duration.is_finite() && duration > 0.0).then_some(duration)
}

/// Single window: skip the first third of long sources, cap at 30 seconds.
pub fn select_heuristic(duration: f64) -> Option<Segment> {
    let duration = valid_duration(duration)?;
    let start = if duration > INTRO_SKIP_THRESHOLD_SECONDS {
        duration / 3.0
    } else {
        0.0
    };
    let end = (start + MAX_CLIP_SECONDS).min(duration);
    (start < end).then(|| Segment::new(start, end, HEURISTIC_LABEL))
}

/// Window starting at a user-chosen offset.
///
/// A start at or past the end of the source falls back to the first
/// 30 seconds.
pub fn select_from_start(start: f64, duration: f64) -> Option<Segment> {
    let duration = valid_duration(duration)?;
    let start = if start.is_finite() { start.max(0.0) } else { 0.0 };
    let end = (start + MAX_CLIP_SECONDS).min(duration);

    let (start, end) = if end <= start {
        debug!(start, duration, "Start is past the source end, using the opening window");
        (0.0, MAX_CLIP_SECONDS.min(duration))
    } else {
        (start, end)
    };

    Some(Segment::new(start, end, format!("Clip from {}", format_seconds(start))))
}

/// Clamp each candidate to the source, dropping the ones that end up empty.
pub fn select_candidates(candidates: &[SegmentCandidate], duration: f64) -> Selection {
    let mut selection = Selection::default();
    let duration = valid_duration(duration).unwrap_or(0.0);

    for (index, candidate) in candidates.iter().enumerate() {
        if !candidate.start.is_finite() || !candidate.end.is_finite() {
            selection
                .skipped
                .push(SkippedSegment::new(index, &candidate.label, "non-numeric bounds"));
            continue;
        }

        let start = candidate.start.max(0.0);
        let end = candidate.end.min(duration);
        if start >= end {
            debug!(
                index,
                start = candidate.start,
                end = candidate.end,
                duration,
                "Dropping empty candidate"
            );
            selection.skipped.push(SkippedSegment::new(
                index,
                &candidate.label,
                format!("window [{:.3}, {:.3}) is empty within a {:.3}s source", start, end, duration),
            ));
            continue;
        }

        selection
            .segments
            .push(Segment::new(start, end, candidate.label.clone()));
        selection.positions.push(index);
    }

    selection
}

/// Resolve any segment source against a source duration.
pub fn select_segments(source: &SegmentSource, duration: f64) -> Selection {
    match source {
        SegmentSource::Heuristic => Selection::single(select_heuristic(duration)),
        SegmentSource::ExplicitStart { start } => Selection::single(select_from_start(*start, duration)),
        SegmentSource::Candidates { candidates } => select_candidates(candidates, duration),
    }
}
