//! Shared data models for the reelcut clipping engine.
//!
//! This crate provides Serde-serializable types for:
//! - Segments and raw segment candidates
//! - Framing (aspect ratio, focal point, crop rectangle)
//! - Encoding and enhancement configuration
//! - Accounts and render requests/results

pub mod account;
pub mod clip;
pub mod encoding;
pub mod framing;
pub mod segment;
pub mod timestamp;

// Re-export common types
pub use account::{Account, DEFAULT_FREE_CREDITS, PREMIUM_CREDITS};
pub use clip::{RenderRequest, RenderedClip, SkippedSegment};
pub use encoding::{EncodingConfig, EnhancementSpec};
pub use framing::{AspectRatio, CropRect, FocalMode, FocalPoint};
pub use segment::{Segment, SegmentCandidate, SegmentSource};
pub use timestamp::{format_seconds, parse_timestamp, TimestampError};
