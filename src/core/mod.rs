//! Core orchestration logic.
//!
//! This module contains:
//! - Retry: Backoff around collaborator calls
//! - Stages: Scrape, filter, vision and select
//! - State: Stage graph and per-run state bag
//! - Engine: Main execution engine

pub mod engine;
pub mod filter;
pub mod retry;
pub mod scrape;
pub mod select;
pub mod state;
pub mod vision;

// Re-export commonly used types
pub use engine::{EngineOptions, PipelineEngine};
pub use filter::{filter_candidates, DEFAULT_SCORE_THRESHOLD};
pub use retry::RetryPolicy;
pub use scrape::{scrape_candidates, MIN_SEARCH_MULTIPLIER};
pub use select::{flatten_findings, rank_findings, select_best_clip, sort_by_confidence, RankedClip};
pub use state::{decide, ExitReason, RunRequest, RunState, Stage, Transition};
pub use vision::{analyze_candidates, VisionOutcome};
