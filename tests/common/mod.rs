//! In-memory collaborators for driving the pipeline in tests.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};

use clipscout::adapters::{CandidateText, ClipAnalyzer, PostSource, RelevanceScore, RelevanceScorer};
use clipscout::core::RetryPolicy;
use clipscout::domain::{Candidate, ClipFinding, MediaEntry, RawPost, VideoStream};
use clipscout::error::{CollaboratorError, CollaboratorResult};

/// Retry policy with millisecond delays
pub fn fast_retry() -> RetryPolicy {
    RetryPolicy {
        max_attempts: 3,
        initial_delay_ms: 1,
        max_delay_ms: 5,
        backoff_multiplier: 2.0,
    }
}

pub fn post_url(id: &str) -> String {
    format!("https://x.com/user{}/status/{}", id, id)
}

pub fn video_url(id: &str) -> String {
    format!("https://video.example/{}.mp4", id)
}

/// A post with one MP4 video stream
pub fn video_post(id: &str, text: &str) -> RawPost {
    RawPost {
        id: id.to_string(),
        text: text.to_string(),
        author: format!("user{}", id),
        created_at: Utc.with_ymd_and_hms(2025, 10, 5, 12, 0, 0).unwrap(),
        media: vec![MediaEntry {
            media_type: "video".to_string(),
            url: None,
            streams: vec![VideoStream {
                url: video_url(id),
                content_type: Some("video/mp4".to_string()),
                bitrate: Some(832_000),
            }],
        }],
    }
}

/// A post whose only attachment is a photo
pub fn photo_post(id: &str, text: &str) -> RawPost {
    RawPost {
        media: vec![MediaEntry {
            media_type: "photo".to_string(),
            url: Some(format!("https://pbs.example/{}.jpg", id)),
            streams: vec![],
        }],
        ..video_post(id, text)
    }
}

pub fn candidate(id: &str) -> Candidate {
    Candidate::from_raw(&video_post(id, &format!("post {}", id))).unwrap()
}

pub fn finding(start: f64, end: f64, confidence: f64, reason: &str) -> ClipFinding {
    ClipFinding {
        start_time_s: start,
        end_time_s: end,
        confidence,
        reason: reason.to_string(),
    }
}

pub fn transient() -> CollaboratorError {
    CollaboratorError::Transient("connection reset".to_string())
}

pub fn rate_limited() -> CollaboratorError {
    CollaboratorError::RateLimited("429 Too Many Requests".to_string())
}

/// Search collaborator returning canned posts
#[derive(Default)]
pub struct FakeSource {
    pub posts: Vec<RawPost>,
    pub auth_error: bool,
    /// Errors returned by the first calls, in order
    pub failures: Mutex<VecDeque<CollaboratorError>>,
    pub calls: AtomicUsize,
    pub last_limit: AtomicUsize,
}

impl FakeSource {
    pub fn with_posts(posts: Vec<RawPost>) -> Self {
        Self {
            posts,
            ..Default::default()
        }
    }

    pub fn failing_with(errors: Vec<CollaboratorError>) -> Self {
        Self {
            failures: Mutex::new(errors.into()),
            ..Default::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PostSource for FakeSource {
    fn name(&self) -> &str {
        "fake-source"
    }

    async fn authenticate(&self) -> CollaboratorResult<()> {
        if self.auth_error {
            return Err(CollaboratorError::Auth("bad credentials".to_string()));
        }
        Ok(())
    }

    async fn search(&self, _query: &str, limit: usize) -> CollaboratorResult<Vec<RawPost>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.last_limit.store(limit, Ordering::SeqCst);
        if let Some(err) = self.failures.lock().unwrap().pop_front() {
            return Err(err);
        }
        Ok(self.posts.iter().take(limit).cloned().collect())
    }
}

/// Scoring collaborator with a fixed score per URL
#[derive(Default)]
pub struct FakeScorer {
    pub scores: HashMap<String, f64>,
    pub fail: bool,
    pub calls: AtomicUsize,
}

impl FakeScorer {
    pub fn with_scores<S: AsRef<str>>(scores: &[(S, f64)]) -> Self {
        Self {
            scores: scores
                .iter()
                .map(|(url, score)| (url.as_ref().to_string(), *score))
                .collect(),
            ..Default::default()
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RelevanceScorer for FakeScorer {
    fn name(&self) -> &str {
        "fake-scorer"
    }

    async fn score(
        &self,
        _description: &str,
        candidates: &[CandidateText],
    ) -> CollaboratorResult<Vec<RelevanceScore>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(CollaboratorError::UpstreamFormat("not json".to_string()));
        }
        Ok(candidates
            .iter()
            .filter_map(|c| {
                self.scores.get(&c.url).map(|&score| RelevanceScore {
                    url: c.url.clone(),
                    score,
                    reason: "fake".to_string(),
                })
            })
            .collect())
    }
}

/// Canned vision outcome for one post
pub enum Canned {
    Findings(Vec<ClipFinding>),
    Fail(fn() -> CollaboratorError),
}

/// Vision collaborator with per-post outcomes, delays and concurrency tracking
#[derive(Default)]
pub struct FakeAnalyzer {
    pub outcomes: HashMap<String, Canned>,
    pub delays: HashMap<String, Duration>,
    pub calls: AtomicUsize,
    in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
}

impl FakeAnalyzer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn findings(mut self, post: &str, findings: Vec<ClipFinding>) -> Self {
        self.outcomes.insert(post.to_string(), Canned::Findings(findings));
        self
    }

    pub fn failure(mut self, post: &str, err: fn() -> CollaboratorError) -> Self {
        self.outcomes.insert(post.to_string(), Canned::Fail(err));
        self
    }

    pub fn delay(mut self, post: &str, delay: Duration) -> Self {
        self.delays.insert(post.to_string(), delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ClipAnalyzer for FakeAnalyzer {
    fn name(&self) -> &str {
        "fake-analyzer"
    }

    async fn analyze(
        &self,
        candidate: &Candidate,
        _description: &str,
        _duration_secs: u32,
    ) -> CollaboratorResult<Vec<ClipFinding>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        let delay = self
            .delays
            .get(&candidate.post_url)
            .copied()
            .unwrap_or(Duration::from_millis(10));
        tokio::time::sleep(delay).await;

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        match self.outcomes.get(&candidate.post_url) {
            Some(Canned::Findings(findings)) => Ok(findings.clone()),
            Some(Canned::Fail(err)) => Err(err()),
            None => Ok(Vec::new()),
        }
    }
}
