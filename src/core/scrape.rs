//! Scrape stage: discover posts and admit those with a playable video.

use tracing::{info, instrument, warn};

use super::retry::RetryPolicy;
use crate::adapters::PostSource;
use crate::domain::Candidate;
use crate::error::CollaboratorError;

/// Smallest allowed ratio of requested posts to wanted candidates
pub const MIN_SEARCH_MULTIPLIER: usize = 4;

/// Fetch up to `max_candidates` candidates for `query`.
///
/// Requests `max_candidates * search_multiplier` raw posts so that posts
/// without usable video can be skipped. Collaborator failures (including
/// authentication and rate limiting) degrade to an empty list.
#[instrument(skip(source, retry), fields(source = source.name()))]
pub async fn scrape_candidates(
    source: &dyn PostSource,
    retry: &RetryPolicy,
    query: &str,
    max_candidates: usize,
    search_multiplier: usize,
) -> Vec<Candidate> {
    if max_candidates == 0 {
        return Vec::new();
    }

    if let Err(e) = source.authenticate().await {
        warn!(error = %e, "Authentication failed, no candidates scraped");
        return Vec::new();
    }

    let search_limit = max_candidates.saturating_mul(search_multiplier.max(MIN_SEARCH_MULTIPLIER));
    info!(search_limit, "Searching for posts");

    let posts = match retry
        .run("search", || source.search(query, search_limit))
        .await
    {
        Ok(posts) => posts,
        Err(CollaboratorError::RateLimited(detail)) => {
            warn!(%detail, "Search was rate limited, no candidates scraped");
            return Vec::new();
        }
        Err(e) => {
            warn!(error = %e, "Search failed, no candidates scraped");
            return Vec::new();
        }
    };

    if posts.is_empty() {
        warn!("Search returned no results");
        return Vec::new();
    }

    let candidates: Vec<Candidate> = posts
        .iter()
        .filter_map(Candidate::from_raw)
        .take(max_candidates)
        .collect();

    info!(
        scanned = posts.len(),
        admitted = candidates.len(),
        "Found candidates with playable video"
    );
    candidates
}
