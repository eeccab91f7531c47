//! Candidate analysis: asking an external model for segment proposals.

use async_trait::async_trait;
use tracing::info;

use reelcut_media::SourceVideo;
use reelcut_models::SegmentCandidate;

use crate::candidates::parse_candidates;
use crate::error::{StudioError, StudioResult};

/// Something that looks at a video and proposes interesting windows.
///
/// Implementations return the model's raw text; parsing is done here so all
/// proposers share the same tolerance for messy output.
#[async_trait]
pub trait SegmentProposer: Send + Sync {
    async fn propose(&self, source: &SourceVideo) -> StudioResult<String>;
}

/// Run the proposer and parse its answer into candidates.
///
/// A failed call or an answer without usable candidates aborts the request
/// before any encoding starts.
pub async fn analyze_candidates(proposer: &dyn SegmentProposer, source: &SourceVideo) -> StudioResult<Vec<SegmentCandidate>> {
    let raw = proposer.propose(source).await?;
    let candidates = parse_candidates(&raw);
    if candidates.is_empty() {
        return Err(StudioError::nothing_to_process("analysis returned no usable segments"));
    }
    info!(count = candidates.len(), "Analysis proposed candidate segments");
    Ok(candidates)
}
