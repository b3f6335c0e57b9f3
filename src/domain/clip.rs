//! Vision findings and the final selected clip.

use serde::{Deserialize, Serialize};

use super::trace::FinalTrace;

/// One proposed contiguous segment inside a video
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClipFinding {
    /// Segment start in seconds (>= 0)
    pub start_time_s: f64,

    /// Segment end in seconds (> start)
    pub end_time_s: f64,

    /// Confidence that the segment matches the description, in [0, 1]
    pub confidence: f64,

    /// Model's justification
    pub reason: String,
}

impl ClipFinding {
    /// Check the segment invariants, describing the first violation
    pub fn validate(&self) -> Result<(), String> {
        if !self.start_time_s.is_finite() || self.start_time_s < 0.0 {
            return Err(format!("start_time_s must be >= 0, got {}", self.start_time_s));
        }
        if !self.end_time_s.is_finite() || self.end_time_s <= self.start_time_s {
            return Err(format!(
                "end_time_s must be greater than start_time_s ({} <= {})",
                self.end_time_s, self.start_time_s
            ));
        }
        if !(0.0..=1.0).contains(&self.confidence) {
            return Err(format!("confidence must be in [0, 1], got {}", self.confidence));
        }
        Ok(())
    }
}

/// Video-level analysis output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisionResult {
    pub post_url: String,
    pub best_video_url: String,
    pub findings: Vec<ClipFinding>,
}

impl VisionResult {
    /// A result without findings counts as "no match"
    pub fn has_findings(&self) -> bool {
        !self.findings.is_empty()
    }
}

/// Runner-up clip, stripped of its justification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinalAlternate {
    pub start_time_s: f64,
    pub end_time_s: f64,
    pub confidence: f64,
}

impl From<&ClipFinding> for FinalAlternate {
    fn from(finding: &ClipFinding) -> Self {
        Self {
            start_time_s: finding.start_time_s,
            end_time_s: finding.end_time_s,
            confidence: finding.confidence,
        }
    }
}

/// The pipeline's externally visible answer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinalResult {
    #[serde(rename = "tweet_url")]
    pub post_url: String,
    pub video_url: String,
    pub start_time_s: f64,
    pub end_time_s: f64,
    pub confidence: f64,
    pub reason: String,
    #[serde(default)]
    pub alternates: Vec<FinalAlternate>,
    #[serde(default)]
    pub trace: FinalTrace,
}
