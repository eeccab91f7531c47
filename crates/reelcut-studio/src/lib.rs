//! Credit-gated clip studio.
//!
//! This crate provides:
//! - Segment selection (heuristic, explicit start, analysis candidates)
//! - Defensive parsing of model-proposed candidates
//! - Gemini-backed segment proposals
//! - Account stores, admin override and credit charging
//! - The render pipeline tying it all together
//! - Structured request logging

pub mod accounts;
pub mod analysis;
pub mod candidates;
pub mod config;
pub mod context;
pub mod credits;
pub mod error;
pub mod gemini;
pub mod logging;
pub mod pipeline;
pub mod selector;

pub use accounts::{AccountStore, InMemoryAccountStore, JsonFileAccountStore, SupabaseAccountStore};
pub use analysis::{analyze_candidates, SegmentProposer};
pub use candidates::parse_candidates;
pub use config::StudioConfig;
pub use context::{RequestContext, Role};
pub use error::{StudioError, StudioResult};
pub use gemini::GeminiProposer;
pub use logging::RenderLogger;
pub use pipeline::{RenderBatch, RenderPipeline};
pub use selector::{select_segments, Selection};
