//! Pipeline engine: drives a run through its stages.
//!
//! Stage bodies only produce outputs. The engine stores them in the run
//! state, records trace counters, and asks [`decide`] for the next move.

use std::sync::Arc;

use anyhow::Result;
use tracing::{info, instrument, warn};

use super::filter::{filter_candidates, DEFAULT_SCORE_THRESHOLD};
use super::retry::RetryPolicy;
use super::scrape::scrape_candidates;
use super::select::select_best_clip;
use super::state::{decide, ExitReason, RunRequest, RunState, Stage, Transition};
use super::vision::analyze_candidates;
use crate::adapters::{ClipAnalyzer, PostSource, RelevanceScorer};

/// Tunables shared by every run of an engine
#[derive(Debug, Clone, PartialEq)]
pub struct EngineOptions {
    /// Minimum relevance score to survive the text filter (inclusive)
    pub score_threshold: f64,

    /// Raw posts requested per wanted candidate
    pub search_multiplier: usize,

    /// Concurrent vision analyses; `None` runs them all at once
    pub vision_concurrency: Option<usize>,

    /// Retry policy for every collaborator call
    pub retry: RetryPolicy,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            score_threshold: DEFAULT_SCORE_THRESHOLD,
            search_multiplier: 5,
            vision_concurrency: None,
            retry: RetryPolicy::default(),
        }
    }
}

/// Runs the scrape → filter → vision → select pipeline
pub struct PipelineEngine {
    source: Arc<dyn PostSource>,
    scorer: Arc<dyn RelevanceScorer>,
    analyzer: Arc<dyn ClipAnalyzer>,
    options: EngineOptions,
}

impl PipelineEngine {
    pub fn new(
        source: Arc<dyn PostSource>,
        scorer: Arc<dyn RelevanceScorer>,
        analyzer: Arc<dyn ClipAnalyzer>,
        options: EngineOptions,
    ) -> Self {
        Self {
            source,
            scorer,
            analyzer,
            options,
        }
    }

    /// Execute one run to completion and return its final state
    #[instrument(skip(self, request), fields(description = %request.description))]
    pub async fn run(&self, request: RunRequest) -> Result<RunState> {
        let mut state = RunState::new(request);
        info!(run_id = %state.id, "Starting pipeline run");

        // Each transition moves strictly forward, so a run can take at most
        // this many before reaching Done.
        for _ in 0..=Transition::ALL.len() {
            self.execute_stage(&mut state).await;

            let Some(transition) = decide(&state) else {
                self.finish(&state);
                return Ok(state);
            };

            info!(from = ?transition.source(), to = ?transition.target(), "Stage transition");
            state.apply(transition);
        }

        anyhow::bail!("Run {} did not reach a terminal stage", state.id)
    }

    /// Run the body of the current stage and store its output
    async fn execute_stage(&self, state: &mut RunState) {
        let options = &self.options;

        match state.stage {
            Stage::Scraping => {
                let candidates = scrape_candidates(
                    self.source.as_ref(),
                    &options.retry,
                    &state.request.description,
                    state.request.max_candidates,
                    options.search_multiplier,
                )
                .await;
                state.trace.record_scrape(candidates.len());
                state.candidates = candidates;
            }
            Stage::Filtering => {
                let filtered = filter_candidates(
                    self.scorer.as_ref(),
                    &options.retry,
                    &state.candidates,
                    &state.request.description,
                    options.score_threshold,
                )
                .await;
                state.trace.record_filter(filtered.len());
                state.filtered_candidates = filtered;
            }
            Stage::Analyzing => {
                let outcome = analyze_candidates(
                    self.analyzer.as_ref(),
                    &options.retry,
                    &state.filtered_candidates,
                    &state.request.description,
                    state.request.duration_secs,
                    options.vision_concurrency,
                )
                .await;
                state
                    .trace
                    .record_vision(outcome.attempted, outcome.results.len());
                state.vision_results = outcome.results;
            }
            Stage::Selecting => {
                let selected = select_best_clip(&state.vision_results, &state.trace);
                if let Some(result) = &selected {
                    state.trace.record_selection(result.trace.final_choice_rank);
                }
                state.final_result = selected;
            }
            Stage::Done => {}
        }
    }

    fn finish(&self, state: &RunState) {
        match state.exit {
            Some(ExitReason::Selected) => {
                info!(run_id = %state.id, trace = ?state.trace, "Pipeline run selected a clip");
            }
            Some(ExitReason::NoCandidatesAfterFilter) => {
                warn!(run_id = %state.id, "No candidates after filter");
            }
            Some(ExitReason::NoClipsAfterVision) => {
                warn!(run_id = %state.id, "No clips found after vision");
            }
            Some(ExitReason::NothingSelected) | None => {
                warn!(run_id = %state.id, "Pipeline run produced no result");
            }
        }
    }
}
