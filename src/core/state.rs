//! Pipeline stages, transitions and the per-run state bag.
//!
//! Every legal move between stages is a [`Transition`] variant, and
//! [`decide`] is the whole transition table: given the current stage and
//! what the run has produced so far, it names the next move.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{Candidate, FinalResult, TraceCounters, VisionResult};

/// Where a run currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Scraping,
    Filtering,
    Analyzing,
    Selecting,
    Done,
}

/// A move between two stages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Transition {
    /// Always taken after scraping, even with no candidates
    ScrapeToFilter,
    FilterToAnalyze,
    /// Nothing survived the text filter
    FilterToDone,
    AnalyzeToSelect,
    /// No video yielded a finding
    AnalyzeToDone,
    SelectToDone,
}

impl Transition {
    pub const ALL: [Transition; 6] = [
        Transition::ScrapeToFilter,
        Transition::FilterToAnalyze,
        Transition::FilterToDone,
        Transition::AnalyzeToSelect,
        Transition::AnalyzeToDone,
        Transition::SelectToDone,
    ];

    pub fn source(self) -> Stage {
        match self {
            Transition::ScrapeToFilter => Stage::Scraping,
            Transition::FilterToAnalyze | Transition::FilterToDone => Stage::Filtering,
            Transition::AnalyzeToSelect | Transition::AnalyzeToDone => Stage::Analyzing,
            Transition::SelectToDone => Stage::Selecting,
        }
    }

    pub fn target(self) -> Stage {
        match self {
            Transition::ScrapeToFilter => Stage::Filtering,
            Transition::FilterToAnalyze => Stage::Analyzing,
            Transition::AnalyzeToSelect => Stage::Selecting,
            Transition::FilterToDone | Transition::AnalyzeToDone | Transition::SelectToDone => {
                Stage::Done
            }
        }
    }
}

/// Why a run reached [`Stage::Done`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitReason {
    NoCandidatesAfterFilter,
    NoClipsAfterVision,
    /// Selection ran but found nothing to rank
    NothingSelected,
    Selected,
}

/// Inputs of one run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRequest {
    pub description: String,
    pub duration_secs: u32,
    pub max_candidates: usize,
}

/// Everything a run has produced so far.
///
/// Owned exclusively by one run; handed back to the caller once the run
/// reaches [`Stage::Done`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunState {
    pub id: Uuid,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub request: RunRequest,
    pub stage: Stage,
    pub candidates: Vec<Candidate>,
    pub filtered_candidates: Vec<Candidate>,
    pub vision_results: Vec<VisionResult>,
    pub final_result: Option<FinalResult>,
    pub trace: TraceCounters,
    pub exit: Option<ExitReason>,
}

impl RunState {
    pub fn new(request: RunRequest) -> Self {
        Self {
            id: Uuid::new_v4(),
            started_at: Utc::now(),
            completed_at: None,
            request,
            stage: Stage::Scraping,
            candidates: Vec::new(),
            filtered_candidates: Vec::new(),
            vision_results: Vec::new(),
            final_result: None,
            trace: TraceCounters::new(),
            exit: None,
        }
    }

    pub fn is_done(&self) -> bool {
        self.stage == Stage::Done
    }

    /// Move along `transition`, recording the exit reason on terminal moves
    pub fn apply(&mut self, transition: Transition) {
        debug_assert_eq!(
            transition.source(),
            self.stage,
            "transition applied from the wrong stage"
        );

        self.stage = transition.target();
        self.exit = match transition {
            Transition::FilterToDone => Some(ExitReason::NoCandidatesAfterFilter),
            Transition::AnalyzeToDone => Some(ExitReason::NoClipsAfterVision),
            Transition::SelectToDone if self.final_result.is_some() => Some(ExitReason::Selected),
            Transition::SelectToDone => Some(ExitReason::NothingSelected),
            _ => None,
        };
        if self.is_done() {
            self.completed_at = Some(Utc::now());
        }
    }
}

/// Pick the next transition, or `None` once the run is done
pub fn decide(state: &RunState) -> Option<Transition> {
    match state.stage {
        Stage::Scraping => Some(Transition::ScrapeToFilter),
        Stage::Filtering if state.filtered_candidates.is_empty() => Some(Transition::FilterToDone),
        Stage::Filtering => Some(Transition::FilterToAnalyze),
        Stage::Analyzing if state.vision_results.iter().any(VisionResult::has_findings) => {
            Some(Transition::AnalyzeToSelect)
        }
        Stage::Analyzing => Some(Transition::AnalyzeToDone),
        Stage::Selecting => Some(Transition::SelectToDone),
        Stage::Done => None,
    }
}
