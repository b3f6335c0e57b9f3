//! Select stage: rank every finding across all videos and pick the best.
//!
//! Ranking is a stable sort by confidence, descending. Findings with equal
//! confidence keep their flatten order: earlier video first, then earlier
//! finding within the same video.

use tracing::info;

use crate::domain::{ClipFinding, FinalAlternate, FinalResult, TraceCounters, VisionResult};

/// Number of runner-ups reported next to the winner
pub const MAX_ALTERNATES: usize = 2;

const WINNER_RANK: usize = 1;

/// A finding tagged with the post and video it came from
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RankedClip<'a> {
    pub post_url: &'a str,
    pub video_url: &'a str,
    pub finding: &'a ClipFinding,
}

/// Flatten results into clips: outer loop over results, inner over findings
pub fn flatten_findings(results: &[VisionResult]) -> Vec<RankedClip<'_>> {
    results
        .iter()
        .flat_map(|result| {
            result.findings.iter().map(move |finding| RankedClip {
                post_url: &result.post_url,
                video_url: &result.best_video_url,
                finding,
            })
        })
        .collect()
}

/// Stable sort by confidence, highest first
pub fn sort_by_confidence(clips: &mut [RankedClip<'_>]) {
    clips.sort_by(|a, b| b.finding.confidence.total_cmp(&a.finding.confidence));
}

/// Flattened and ranked findings
pub fn rank_findings(results: &[VisionResult]) -> Vec<RankedClip<'_>> {
    let mut clips = flatten_findings(results);
    sort_by_confidence(&mut clips);
    clips
}

/// Build the final answer from ranked findings, or `None` if there are none.
///
/// The returned result carries a trace snapshot with the winner at rank 1.
pub fn select_best_clip(results: &[VisionResult], trace: &TraceCounters) -> Option<FinalResult> {
    let ranked = rank_findings(results);
    let (best, runners_up) = ranked.split_first()?;

    debug_assert!(
        best.finding.validate().is_ok(),
        "winning finding violates segment invariants"
    );

    let mut trace = trace.clone();
    trace.record_selection(WINNER_RANK);

    let alternates: Vec<FinalAlternate> = runners_up
        .iter()
        .take(MAX_ALTERNATES)
        .map(|clip| FinalAlternate::from(clip.finding))
        .collect();

    info!(
        post = %best.post_url,
        confidence = best.finding.confidence,
        alternates = alternates.len(),
        "Selected best clip"
    );

    Some(FinalResult {
        post_url: best.post_url.to_string(),
        video_url: best.video_url.to_string(),
        start_time_s: best.finding.start_time_s,
        end_time_s: best.finding.end_time_s,
        confidence: best.finding.confidence,
        reason: best.finding.reason.clone(),
        alternates,
        trace: trace.snapshot(),
    })
}
