//! Posts discovered by the scraper and the candidates admitted from them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single media attachment on a raw post
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaEntry {
    /// Media kind as reported upstream ("video", "photo", "animated_gif")
    pub media_type: String,

    /// Generic media URL, used when no MP4 stream is exposed
    pub url: Option<String>,

    /// Playable stream variants
    #[serde(default)]
    pub streams: Vec<VideoStream>,
}

impl MediaEntry {
    pub fn is_video(&self) -> bool {
        self.media_type == "video"
    }
}

/// One encoded variant of a video
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoStream {
    pub url: String,
    pub content_type: Option<String>,
    pub bitrate: Option<u64>,
}

impl VideoStream {
    pub fn is_mp4(&self) -> bool {
        self.content_type
            .as_deref()
            .is_some_and(|ct| ct.contains("mp4"))
    }
}

/// A post as returned by the search collaborator, before admission
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawPost {
    pub id: String,
    pub text: String,
    pub author: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub media: Vec<MediaEntry>,
}

impl RawPost {
    /// Canonical public URL of the post
    pub fn url(&self) -> String {
        format!("https://x.com/{}/status/{}", self.author, self.id)
    }

    /// Every stream URL across the post's video attachments, in upstream order
    pub fn video_urls(&self) -> Vec<String> {
        self.media
            .iter()
            .filter(|m| m.is_video())
            .flat_map(|m| m.streams.iter())
            .filter(|s| !s.url.is_empty())
            .map(|s| s.url.clone())
            .collect()
    }

    /// Highest-bitrate MP4 stream of the first video attachment.
    ///
    /// Falls back to the attachment's generic URL when it exposes no MP4
    /// stream. Returns `None` for posts without a playable video.
    pub fn best_video_url(&self) -> Option<String> {
        let video = self.media.iter().find(|m| m.is_video())?;

        let mut best: Option<&VideoStream> = None;
        for stream in video
            .streams
            .iter()
            .filter(|s| !s.url.is_empty() && s.is_mp4())
        {
            // Strictly greater keeps the first stream on equal bitrates
            let bitrate = stream.bitrate.unwrap_or(0);
            if best.map_or(true, |b| bitrate > b.bitrate.unwrap_or(0)) {
                best = Some(stream);
            }
        }

        match best {
            Some(stream) => Some(stream.url.clone()),
            None => video.url.clone().filter(|u| !u.is_empty()),
        }
    }
}

/// A discovered post with a playable video, admitted into the pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub post_url: String,
    pub video_urls: Vec<String>,
    pub best_video_url: String,
    pub text: String,
    pub author: String,
    pub created_at: DateTime<Utc>,
}

impl Candidate {
    /// Admit a raw post, or `None` when it carries no playable stream
    pub fn from_raw(post: &RawPost) -> Option<Self> {
        let best_video_url = post.best_video_url()?;
        Some(Self {
            post_url: post.url(),
            video_urls: post.video_urls(),
            best_video_url,
            text: post.text.clone(),
            author: post.author.clone(),
            created_at: post.created_at,
        })
    }
}
