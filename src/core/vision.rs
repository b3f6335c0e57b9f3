//! Vision stage: concurrent per-candidate clip analysis.
//!
//! Every candidate is analyzed independently. A failure, or an analysis
//! with no findings, drops that candidate only; siblings always run to
//! completion. Results come back in input order.

use futures::stream::{self, StreamExt};
use tracing::{info, instrument, warn};

use super::retry::RetryPolicy;
use crate::adapters::ClipAnalyzer;
use crate::domain::{Candidate, VisionResult};

/// What the fan-out produced
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VisionOutcome {
    /// Analyses started, one per candidate
    pub attempted: usize,

    /// Results with at least one finding, in candidate order
    pub results: Vec<VisionResult>,
}

/// Analyze all candidates, at most `concurrency` at a time.
///
/// `None` runs every analysis at once.
#[instrument(skip_all, fields(analyzer = analyzer.name(), count = candidates.len()))]
pub async fn analyze_candidates(
    analyzer: &dyn ClipAnalyzer,
    retry: &RetryPolicy,
    candidates: &[Candidate],
    description: &str,
    duration_secs: u32,
    concurrency: Option<usize>,
) -> VisionOutcome {
    if candidates.is_empty() {
        return VisionOutcome::default();
    }

    let limit = concurrency
        .filter(|&n| n > 0)
        .unwrap_or(candidates.len());

    let outcomes: Vec<Option<VisionResult>> = stream::iter(
        candidates
            .iter()
            .map(|candidate| analyze_one(analyzer, retry, candidate, description, duration_secs)),
    )
    .buffered(limit)
    .collect()
    .await;

    let results: Vec<VisionResult> = outcomes.into_iter().flatten().collect();

    info!(
        attempted = candidates.len(),
        matched = results.len(),
        "Vision analysis finished"
    );

    VisionOutcome {
        attempted: candidates.len(),
        results,
    }
}

async fn analyze_one(
    analyzer: &dyn ClipAnalyzer,
    retry: &RetryPolicy,
    candidate: &Candidate,
    description: &str,
    duration_secs: u32,
) -> Option<VisionResult> {
    let findings = match retry
        .run("analyze_video", || {
            analyzer.analyze(candidate, description, duration_secs)
        })
        .await
    {
        Ok(findings) => findings,
        Err(e) => {
            warn!(post = %candidate.post_url, error = %e, "Vision analysis failed, dropping candidate");
            return None;
        }
    };

    if findings.is_empty() {
        info!(post = %candidate.post_url, "No matching clips in video");
        return None;
    }

    info!(post = %candidate.post_url, findings = findings.len(), "Video has matching clips");
    Some(VisionResult {
        post_url: candidate.post_url.clone(),
        best_video_url: candidate.best_video_url.clone(),
        findings,
    })
}
