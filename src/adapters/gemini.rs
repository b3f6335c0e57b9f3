//! Gemini adapter for relevance scoring and frame-based vision analysis.
//!
//! Both calls request structured JSON output and validate it before it
//! reaches the pipeline: out-of-range scores or malformed segments are
//! reported as `UpstreamFormat`, never passed along.

use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use super::{CandidateText, Frame, RelevanceScore, RelevanceScorer, VisionModel};
use crate::domain::ClipFinding;
use crate::error::{CollaboratorError, CollaboratorResult};

const TEXT_FILTER_PROMPT: &str = include_str!("../prompts/text_filter.txt");
const VISION_PROMPT: &str = include_str!("../prompts/vision_analyzer.txt");

const SCORING_TEMPERATURE: f64 = 0.0;
const VISION_TEMPERATURE: f64 = 0.1;

/// Configuration for the Gemini client
#[derive(Clone)]
pub struct GeminiConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub model: String,
    pub timeout: Duration,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://generativelanguage.googleapis.com".to_string(),
            api_key: None,
            model: "gemini-2.5-flash".to_string(),
            timeout: Duration::from_secs(120),
        }
    }
}

impl std::fmt::Debug for GeminiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("model", &self.model)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Gemini `generateContent` client
pub struct GeminiClient {
    config: GeminiConfig,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<ResponseCandidate>,
}

#[derive(Debug, Deserialize)]
struct ResponseCandidate {
    content: Option<ResponseContent>,
}

#[derive(Debug, Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TextFilterOutput {
    results: Vec<RelevanceScore>,
}

#[derive(Debug, Deserialize)]
struct VisionOutput {
    #[serde(default)]
    findings: Vec<ClipFinding>,
}

impl GeminiClient {
    pub fn new(config: GeminiConfig) -> CollaboratorResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| CollaboratorError::Transient(e.to_string()))?;

        Ok(Self { config, client })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.config.base_url.trim_end_matches('/'),
            self.config.model
        )
    }

    /// Send one request and return the JSON text of the first candidate
    async fn generate(
        &self,
        parts: Vec<Value>,
        temperature: f64,
        schema: Value,
    ) -> CollaboratorResult<String> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| CollaboratorError::Auth("Gemini API key is not configured".to_string()))?;

        let body = json!({
            "contents": [{ "role": "user", "parts": parts }],
            "generationConfig": {
                "temperature": temperature,
                "responseMimeType": "application/json",
                "responseSchema": schema,
            }
        });

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(CollaboratorError::from_status(status, &text));
        }

        extract_text(&text)
    }
}

fn extract_text(body: &str) -> CollaboratorResult<String> {
    let response: GenerateResponse = serde_json::from_str(body)?;
    response
        .candidates
        .into_iter()
        .filter_map(|c| c.content)
        .flat_map(|c| c.parts)
        .find_map(|p| p.text)
        .ok_or_else(|| {
            CollaboratorError::UpstreamFormat("response contained no text part".to_string())
        })
}

fn text_filter_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "results": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "tweet_url": { "type": "STRING" },
                        "score": { "type": "NUMBER" },
                        "reason": { "type": "STRING" }
                    },
                    "required": ["tweet_url", "score", "reason"]
                }
            }
        },
        "required": ["results"]
    })
}

fn vision_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "findings": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "start_time_s": { "type": "NUMBER" },
                        "end_time_s": { "type": "NUMBER" },
                        "confidence": { "type": "NUMBER" },
                        "reason": { "type": "STRING" }
                    },
                    "required": ["start_time_s", "end_time_s", "confidence", "reason"]
                }
            }
        },
        "required": ["findings"]
    })
}

/// Parse and validate the scoring model's answer
fn parse_scores(text: &str) -> CollaboratorResult<Vec<RelevanceScore>> {
    let output: TextFilterOutput = serde_json::from_str(text)?;
    for result in &output.results {
        if !(0.0..=1.0).contains(&result.score) {
            return Err(CollaboratorError::UpstreamFormat(format!(
                "score for {} out of range: {}",
                result.url, result.score
            )));
        }
    }
    Ok(output.results)
}

/// Parse and validate the vision model's answer
fn parse_findings(text: &str) -> CollaboratorResult<Vec<ClipFinding>> {
    let output: VisionOutput = serde_json::from_str(text)?;
    for finding in &output.findings {
        finding.validate().map_err(CollaboratorError::UpstreamFormat)?;
    }
    Ok(output.findings)
}

/// Substitute `{name}` placeholders in one left-to-right pass.
///
/// Inserted values are never rescanned, so placeholder-like text in a
/// description or post body comes through verbatim.
fn fill_template(template: &str, values: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let tail = &rest[open..];
        let hit = values.iter().find_map(|&(name, value)| {
            tail.strip_prefix('{')
                .and_then(|t| t.strip_prefix(name))
                .and_then(|t| t.strip_prefix('}'))
                .map(|after| (value, after))
        });
        match hit {
            Some((value, after)) => {
                out.push_str(value);
                rest = after;
            }
            None => {
                out.push('{');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

fn render_text_filter_prompt(
    description: &str,
    candidates: &[CandidateText],
) -> CollaboratorResult<String> {
    let listing = serde_json::to_string_pretty(candidates)?;
    Ok(fill_template(
        TEXT_FILTER_PROMPT,
        &[("description", description), ("candidate_texts", listing.as_str())],
    ))
}

fn render_vision_prompt(description: &str, duration_secs: u32, interval_secs: u32) -> String {
    let duration = duration_secs.to_string();
    let interval = interval_secs.to_string();
    fill_template(
        VISION_PROMPT,
        &[
            ("description", description),
            ("duration_seconds", duration.as_str()),
            ("interval_seconds", interval.as_str()),
        ],
    )
}

#[async_trait]
impl RelevanceScorer for GeminiClient {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn score(
        &self,
        description: &str,
        candidates: &[CandidateText],
    ) -> CollaboratorResult<Vec<RelevanceScore>> {
        let prompt = render_text_filter_prompt(description, candidates)?;
        let text = self
            .generate(
                vec![json!({ "text": prompt })],
                SCORING_TEMPERATURE,
                text_filter_schema(),
            )
            .await?;
        parse_scores(&text)
    }
}

#[async_trait]
impl VisionModel for GeminiClient {
    async fn find_clips(
        &self,
        description: &str,
        duration_secs: u32,
        interval_secs: u32,
        frames: &[Frame],
    ) -> CollaboratorResult<Vec<ClipFinding>> {
        let mut parts = Vec::with_capacity(frames.len() * 2 + 1);
        parts.push(json!({
            "text": render_vision_prompt(description, duration_secs, interval_secs)
        }));
        for frame in frames {
            parts.push(json!({ "text": format!("Frame at {:.1}s", frame.timestamp_s) }));
            parts.push(json!({
                "inline_data": {
                    "mime_type": "image/jpeg",
                    "data": BASE64.encode(&frame.jpeg),
                }
            }));
        }

        debug!(frames = frames.len(), model = %self.config.model, "Requesting vision analysis");
        let text = self.generate(parts, VISION_TEMPERATURE, vision_schema()).await?;
        parse_findings(&text)
    }
}
