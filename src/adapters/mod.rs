//! Adapter interfaces for external systems.
//!
//! The pipeline only sequences and ranks; every network call, download and
//! model invocation goes through one of these traits. Concrete adapters:
//! - `x`: post search against the X API
//! - `gemini`: relevance scoring and frame-based vision analysis
//! - `media`: video download and frame sampling via yt-dlp/ffmpeg

pub mod gemini;
pub mod media;
pub mod x;

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tempfile::TempDir;
use tracing::{debug, info};

use crate::domain::{Candidate, ClipFinding, RawPost};
use crate::error::CollaboratorResult;

pub use gemini::{GeminiClient, GeminiConfig};
pub use media::{MediaConfig, YtDlpFetcher};
pub use x::{XConfig, XSearchClient};

/// Post text submitted for relevance scoring
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateText {
    pub url: String,
    pub text: String,
}

/// Relevance verdict for one post
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelevanceScore {
    #[serde(rename = "tweet_url")]
    pub url: String,
    pub score: f64,
    pub reason: String,
}

/// A still JPEG frame sampled from a video
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    /// Offset into the video in seconds
    pub timestamp_s: f64,
    pub jpeg: Vec<u8>,
}

/// A video downloaded to a scratch directory.
///
/// The directory (and anything sampled into it) is removed when this value
/// is dropped.
#[derive(Debug)]
pub struct DownloadedVideo {
    path: PathBuf,
    dir: TempDir,
}

impl DownloadedVideo {
    pub fn new(dir: TempDir, path: PathBuf) -> Self {
        Self { path, dir }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Scratch directory owned by this download
    pub fn scratch_dir(&self) -> &Path {
        self.dir.path()
    }
}

/// Social-media search collaborator
#[async_trait]
pub trait PostSource: Send + Sync {
    /// Human-readable adapter name
    fn name(&self) -> &str;

    /// Establish a session before searching
    async fn authenticate(&self) -> CollaboratorResult<()> {
        Ok(())
    }

    /// Search for up to `limit` posts, in the upstream's ranking order
    async fn search(&self, query: &str, limit: usize) -> CollaboratorResult<Vec<RawPost>>;
}

/// Text-relevance scoring collaborator.
///
/// May omit posts from its answer; omitted posts count as score 0.
#[async_trait]
pub trait RelevanceScorer: Send + Sync {
    fn name(&self) -> &str;

    async fn score(
        &self,
        description: &str,
        candidates: &[CandidateText],
    ) -> CollaboratorResult<Vec<RelevanceScore>>;
}

/// Vision-analysis collaborator: proposes matching segments for one video
#[async_trait]
pub trait ClipAnalyzer: Send + Sync {
    fn name(&self) -> &str;

    async fn analyze(
        &self,
        candidate: &Candidate,
        description: &str,
        duration_secs: u32,
    ) -> CollaboratorResult<Vec<ClipFinding>>;
}

/// Video download and frame sampling
#[async_trait]
pub trait MediaFetcher: Send + Sync {
    async fn download(&self, post_url: &str) -> CollaboratorResult<DownloadedVideo>;

    async fn sample_frames(
        &self,
        video: &DownloadedVideo,
        interval_secs: u32,
        max_frames: usize,
    ) -> CollaboratorResult<Vec<Frame>>;
}

/// A multimodal model that reads frames and proposes segments
#[async_trait]
pub trait VisionModel: Send + Sync {
    async fn find_clips(
        &self,
        description: &str,
        duration_secs: u32,
        interval_secs: u32,
        frames: &[Frame],
    ) -> CollaboratorResult<Vec<ClipFinding>>;
}

/// [`ClipAnalyzer`] that downloads the video, samples frames, releases the
/// download and hands the frames to a [`VisionModel`].
pub struct FrameSamplingAnalyzer<F, M> {
    fetcher: F,
    model: M,
    interval_secs: u32,
    max_frames: usize,
}

impl<F, M> FrameSamplingAnalyzer<F, M>
where
    F: MediaFetcher,
    M: VisionModel,
{
    pub fn new(fetcher: F, model: M, interval_secs: u32, max_frames: usize) -> Self {
        Self {
            fetcher,
            model,
            interval_secs,
            max_frames,
        }
    }

    async fn frames_for(&self, post_url: &str) -> CollaboratorResult<Vec<Frame>> {
        let video = self.fetcher.download(post_url).await?;
        let frames = self
            .fetcher
            .sample_frames(&video, self.interval_secs, self.max_frames)
            .await;
        debug!(path = %video.path().display(), "Releasing downloaded video");
        drop(video);
        frames
    }
}

#[async_trait]
impl<F, M> ClipAnalyzer for FrameSamplingAnalyzer<F, M>
where
    F: MediaFetcher,
    M: VisionModel,
{
    fn name(&self) -> &str {
        "frame-sampling"
    }

    async fn analyze(
        &self,
        candidate: &Candidate,
        description: &str,
        duration_secs: u32,
    ) -> CollaboratorResult<Vec<ClipFinding>> {
        let frames = self.frames_for(&candidate.post_url).await?;
        if frames.is_empty() {
            info!(post = %candidate.post_url, "No frames sampled, skipping vision call");
            return Ok(Vec::new());
        }

        info!(
            post = %candidate.post_url,
            frames = frames.len(),
            "Sending frames to vision model"
        );
        self.model
            .find_clips(description, duration_secs, self.interval_secs, &frames)
            .await
    }
}
