//! X (Twitter) API v2 adapter for post search.
//!
//! Uses the recent-search endpoint with a bearer token and joins each tweet
//! with its author and media from the `includes` block.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::{debug, info};

use super::PostSource;
use crate::domain::{MediaEntry, RawPost, VideoStream};
use crate::error::{CollaboratorError, CollaboratorResult};

const SEARCH_PATH: &str = "/2/tweets/search/recent";
const MIN_PAGE_SIZE: usize = 10;
const MAX_PAGE_SIZE: usize = 100;

/// Configuration for the X search client
#[derive(Clone)]
pub struct XConfig {
    pub base_url: String,
    pub bearer_token: Option<String>,
    pub timeout: Duration,
    /// Restrict the query to posts with native video
    pub videos_only: bool,
}

impl Default for XConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.twitter.com".to_string(),
            bearer_token: None,
            timeout: Duration::from_secs(120),
            videos_only: true,
        }
    }
}

impl std::fmt::Debug for XConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("XConfig")
            .field("base_url", &self.base_url)
            .field("bearer_token", &self.bearer_token.as_ref().map(|_| "<redacted>"))
            .field("timeout", &self.timeout)
            .field("videos_only", &self.videos_only)
            .finish()
    }
}

/// Post search over the X API
pub struct XSearchClient {
    config: XConfig,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    data: Vec<ApiTweet>,
    #[serde(default)]
    includes: Includes,
    #[serde(default)]
    meta: Meta,
}

#[derive(Debug, Deserialize)]
struct ApiTweet {
    id: String,
    text: String,
    author_id: Option<String>,
    created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    attachments: Attachments,
}

#[derive(Debug, Default, Deserialize)]
struct Attachments {
    #[serde(default)]
    media_keys: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
struct Includes {
    #[serde(default)]
    media: Vec<ApiMedia>,
    #[serde(default)]
    users: Vec<ApiUser>,
}

#[derive(Debug, Deserialize)]
struct ApiMedia {
    media_key: String,
    #[serde(rename = "type")]
    media_type: String,
    url: Option<String>,
    #[serde(default)]
    variants: Vec<ApiVariant>,
}

#[derive(Debug, Deserialize)]
struct ApiVariant {
    url: String,
    content_type: Option<String>,
    bit_rate: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct ApiUser {
    id: String,
    username: String,
}

#[derive(Debug, Default, Deserialize)]
struct Meta {
    next_token: Option<String>,
}

impl XSearchClient {
    pub fn new(config: XConfig) -> CollaboratorResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| CollaboratorError::Transient(e.to_string()))?;

        Ok(Self { config, client })
    }

    fn token(&self) -> CollaboratorResult<&str> {
        self.config
            .bearer_token
            .as_deref()
            .filter(|t| !t.is_empty())
            .ok_or_else(|| CollaboratorError::Auth("X bearer token is not configured".to_string()))
    }

    fn build_query(&self, query: &str) -> String {
        if self.config.videos_only {
            format!("{} has:videos -is:retweet", query.trim())
        } else {
            query.trim().to_string()
        }
    }

    async fn fetch_page(
        &self,
        query: &str,
        page_size: usize,
        next_token: Option<&str>,
    ) -> CollaboratorResult<SearchResponse> {
        let url = format!("{}{}", self.config.base_url.trim_end_matches('/'), SEARCH_PATH);
        let page_size = page_size.to_string();

        let mut params = vec![
            ("query", query),
            ("max_results", page_size.as_str()),
            ("expansions", "attachments.media_keys,author_id"),
            ("media.fields", "type,url,variants"),
            ("tweet.fields", "created_at"),
            ("user.fields", "username"),
        ];
        if let Some(token) = next_token {
            params.push(("next_token", token));
        }

        let response = self
            .client
            .get(&url)
            .bearer_auth(self.token()?)
            .query(&params)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(CollaboratorError::from_status(status, &body));
        }

        Ok(serde_json::from_str(&body)?)
    }
}

/// Join tweets with their authors and media into raw posts
fn into_posts(response: SearchResponse) -> Vec<RawPost> {
    let users: HashMap<&str, &str> = response
        .includes
        .users
        .iter()
        .map(|u| (u.id.as_str(), u.username.as_str()))
        .collect();
    let media: HashMap<&str, &ApiMedia> = response
        .includes
        .media
        .iter()
        .map(|m| (m.media_key.as_str(), m))
        .collect();

    let mut posts = Vec::with_capacity(response.data.len());
    for tweet in &response.data {
        let author = tweet
            .author_id
            .as_deref()
            .and_then(|id| users.get(id).copied());
        let (Some(author), Some(created_at)) = (author, tweet.created_at) else {
            debug!(tweet_id = %tweet.id, "Skipping tweet without author or timestamp");
            continue;
        };

        let entries = tweet
            .attachments
            .media_keys
            .iter()
            .filter_map(|key| media.get(key.as_str()))
            .map(|m| MediaEntry {
                media_type: m.media_type.clone(),
                url: m.url.clone(),
                streams: m
                    .variants
                    .iter()
                    .map(|v| VideoStream {
                        url: v.url.clone(),
                        content_type: v.content_type.clone(),
                        bitrate: v.bit_rate,
                    })
                    .collect(),
            })
            .collect();

        posts.push(RawPost {
            id: tweet.id.clone(),
            text: tweet.text.clone(),
            author: author.to_string(),
            created_at,
            media: entries,
        });
    }
    posts
}

#[async_trait]
impl PostSource for XSearchClient {
    fn name(&self) -> &str {
        "x"
    }

    async fn authenticate(&self) -> CollaboratorResult<()> {
        self.token().map(|_| ())
    }

    async fn search(&self, query: &str, limit: usize) -> CollaboratorResult<Vec<RawPost>> {
        let query = self.build_query(query);
        let mut posts = Vec::new();
        let mut next_token: Option<String> = None;

        while posts.len() < limit {
            let page_size = (limit - posts.len()).clamp(MIN_PAGE_SIZE, MAX_PAGE_SIZE);
            let page = self
                .fetch_page(&query, page_size, next_token.as_deref())
                .await?;
            next_token = page.meta.next_token.clone();

            let page_posts = into_posts(page);
            debug!(count = page_posts.len(), "Fetched search page");
            posts.extend(page_posts);

            if next_token.is_none() {
                break;
            }
        }

        posts.truncate(limit);
        info!(count = posts.len(), query = %query, "Search returned posts");
        Ok(posts)
    }
}
