//! Text filter stage: keep candidates whose post text is relevant enough.

use std::collections::HashMap;

use tracing::{info, instrument, warn};

use super::retry::RetryPolicy;
use crate::adapters::{CandidateText, RelevanceScorer};
use crate::domain::Candidate;

pub const DEFAULT_SCORE_THRESHOLD: f64 = 0.5;

/// A candidate with its relevance verdict, alive only while deciding
#[derive(Debug)]
struct ScoredCandidate<'a> {
    candidate: &'a Candidate,
    score: f64,
    reason: Option<&'a str>,
}

impl ScoredCandidate<'_> {
    fn is_kept(&self, threshold: f64) -> bool {
        self.score >= threshold
    }
}

/// Keep candidates scoring at or above `threshold`, in input order.
///
/// Candidates the scorer leaves out count as score 0. If scoring fails for
/// any reason the input is returned unfiltered.
#[instrument(skip_all, fields(scorer = scorer.name(), count = candidates.len(), threshold = threshold))]
pub async fn filter_candidates(
    scorer: &dyn RelevanceScorer,
    retry: &RetryPolicy,
    candidates: &[Candidate],
    description: &str,
    threshold: f64,
) -> Vec<Candidate> {
    if candidates.is_empty() {
        return Vec::new();
    }

    let texts: Vec<CandidateText> = candidates
        .iter()
        .map(|c| CandidateText {
            url: c.post_url.clone(),
            text: c.text.clone(),
        })
        .collect();

    info!("Scoring candidate texts");
    let scores = match retry
        .run("score_texts", || scorer.score(description, &texts))
        .await
    {
        Ok(scores) => scores,
        Err(e) => {
            warn!(error = %e, "Text scoring failed, keeping all candidates");
            return candidates.to_vec();
        }
    };

    let by_url: HashMap<&str, (f64, &str)> = scores
        .iter()
        .map(|s| (s.url.as_str(), (s.score, s.reason.as_str())))
        .collect();

    let mut kept = Vec::new();
    for candidate in candidates {
        let (score, reason) = match by_url.get(candidate.post_url.as_str()) {
            Some(&(score, reason)) => (score, Some(reason)),
            None => (0.0, None),
        };
        let scored = ScoredCandidate {
            candidate,
            score,
            reason,
        };

        if scored.is_kept(threshold) {
            info!(post = %candidate.post_url, score, reason = scored.reason.unwrap_or(""), "Keeping candidate");
            kept.push(scored.candidate.clone());
        } else {
            info!(post = %candidate.post_url, score, reason = scored.reason.unwrap_or(""), "Dropping candidate");
        }
    }

    info!(before = candidates.len(), after = kept.len(), "Text filter applied");
    kept
}
