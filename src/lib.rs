//! clipscout - find short video clips in social posts
//!
//! Given a free-text description and a target duration, clipscout runs a
//! four-stage pipeline:
//! - scrape: search posts and keep those with a playable video
//! - filter: score post text for relevance and drop weak matches
//! - vision: analyze each surviving video concurrently for matching segments
//! - select: rank every segment by confidence and pick the best
//!
//! # Modules
//!
//! - `adapters`: External system integrations (X, Gemini, yt-dlp/ffmpeg)
//! - `core`: Orchestration logic (stages, state machine, retry, engine)
//! - `domain`: Data structures (Candidate, ClipFinding, FinalResult)
//! - `cli`: Command-line interface
//!
//! # Usage
//!
//! ```bash
//! clipscout --description "a dog catching a frisbee" --duration 10 --out clip.json
//! ```

pub mod adapters;
pub mod cli;
pub mod config;
pub mod core;
pub mod domain;
pub mod error;

// Re-export main types at crate root for convenience
pub use crate::core::{EngineOptions, PipelineEngine, RetryPolicy, RunRequest, RunState};
pub use domain::{Candidate, ClipFinding, FinalResult, VisionResult};
pub use error::{CollaboratorError, CollaboratorResult};
