//! Run-level bookkeeping of how many items survived each stage.

use serde::{Deserialize, Serialize};

/// Counters accumulated by the engine as each stage completes.
///
/// Stages never touch this directly: they return their outputs and the
/// engine records the counts, so the vision fan-out has nothing shared to
/// write to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceCounters {
    /// Candidates admitted by the scrape stage
    pub scraped: Option<usize>,

    /// Candidates kept by the text filter
    pub text_filtered: Option<usize>,

    /// Vision analyses attempted
    pub vision_calls: Option<usize>,

    /// Videos that yielded at least one finding
    pub vision_matches: Option<usize>,

    /// 1-based rank of the chosen clip
    pub final_choice_rank: Option<usize>,
}

impl TraceCounters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_scrape(&mut self, scraped: usize) {
        self.scraped = Some(scraped);
    }

    pub fn record_filter(&mut self, kept: usize) {
        self.text_filtered = Some(kept);
    }

    pub fn record_vision(&mut self, attempted: usize, matched: usize) {
        self.vision_calls = Some(attempted);
        self.vision_matches = Some(matched);
    }

    pub fn record_selection(&mut self, rank: usize) {
        self.final_choice_rank = Some(rank);
    }

    /// Snapshot for the output document; unrecorded counters read as zero
    pub fn snapshot(&self) -> FinalTrace {
        FinalTrace {
            candidates_considered: self.scraped.unwrap_or(0),
            filtered_by_text: self.text_filtered.unwrap_or(0),
            vision_calls: self.vision_calls.unwrap_or(0),
            final_choice_rank: self.final_choice_rank.unwrap_or(0),
        }
    }
}

/// Trace section of the output document
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinalTrace {
    pub candidates_considered: usize,
    pub filtered_by_text: usize,
    pub vision_calls: usize,
    pub final_choice_rank: usize,
}
