//! Domain types for the clip search pipeline.
//!
//! This module contains the core data structures:
//! - Candidate: Posts admitted with a playable video
//! - Clip: Vision findings and the final selected clip
//! - Trace: Per-run stage counters

pub mod candidate;
pub mod clip;
pub mod trace;

// Re-export commonly used types
pub use candidate::{Candidate, MediaEntry, RawPost, VideoStream};
pub use clip::{ClipFinding, FinalAlternate, FinalResult, VisionResult};
pub use trace::{FinalTrace, TraceCounters};
