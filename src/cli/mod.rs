//! Command-line interface for clipscout.
//!
//! Runs one clip search and writes the selected clip as JSON.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};

use crate::adapters::{FrameSamplingAnalyzer, GeminiClient, XSearchClient, YtDlpFetcher};
use crate::config::Settings;
use crate::core::{PipelineEngine, RunRequest};
use crate::domain::FinalResult;

/// clipscout - find a video clip in social posts that matches a description
#[derive(Parser, Debug)]
#[command(name = "clipscout")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Description of the clip to search for
    #[arg(long)]
    pub description: String,

    /// Target duration of the clip in seconds
    #[arg(long)]
    pub duration: u32,

    /// Maximum number of candidate posts to analyze
    #[arg(long, default_value = "10")]
    pub max_candidates: usize,

    /// Output file for the selected clip
    #[arg(long, default_value = "results.json")]
    pub out: PathBuf,

    /// Override the text relevance threshold (0.0 - 1.0)
    #[arg(long)]
    pub threshold: Option<f64>,

    /// Path to a config file (defaults to .clipscout/config.yaml discovery)
    #[arg(long, env = "CLIPSCOUT_CONFIG")]
    pub config: Option<PathBuf>,
}

impl Cli {
    /// Execute the search
    pub async fn execute(self) -> Result<()> {
        let mut settings = Settings::load(self.config.as_deref())?;
        if let Some(threshold) = self.threshold {
            settings.pipeline.score_threshold = threshold;
            settings.validate()?;
        }
        info!(
            description = %self.description,
            duration = self.duration,
            max_candidates = self.max_candidates,
            out = %self.out.display(),
            "Starting clip search"
        );

        let engine = build_engine(&settings)?;
        let state = engine
            .run(RunRequest {
                description: self.description,
                duration_secs: self.duration,
                max_candidates: self.max_candidates,
            })
            .await?;

        write_outcome(&self.out, state.final_result.as_ref())?;
        Ok(())
    }
}

/// Wire the real collaborators into an engine
fn build_engine(settings: &Settings) -> Result<PipelineEngine> {
    let source = XSearchClient::new(settings.x.clone()).context("Failed to build X client")?;
    let scorer =
        GeminiClient::new(settings.gemini.clone()).context("Failed to build Gemini client")?;
    let vision_model =
        GeminiClient::new(settings.gemini.clone()).context("Failed to build Gemini client")?;
    let analyzer = FrameSamplingAnalyzer::new(
        YtDlpFetcher::new(settings.media.clone()),
        vision_model,
        settings.pipeline.frame_interval_secs,
        settings.pipeline.max_frames,
    );

    Ok(PipelineEngine::new(
        Arc::new(source),
        Arc::new(scorer),
        Arc::new(analyzer),
        settings.engine_options(),
    ))
}

/// Write the selected clip to `out`, or only log a warning when there is
/// none. Returns whether a file was written.
pub fn write_outcome(out: &Path, result: Option<&FinalResult>) -> Result<bool> {
    let Some(result) = result else {
        warn!(out = %out.display(), "No clip found, no output written");
        return Ok(false);
    };

    write_result(out, result)?;
    info!(
        out = %out.display(),
        post = %result.post_url,
        confidence = result.confidence,
        "Wrote result"
    );
    Ok(true)
}

/// Write the result as pretty JSON
pub fn write_result(path: &Path, result: &FinalResult) -> Result<()> {
    let json = serde_json::to_string_pretty(result).context("Failed to serialize result")?;
    std::fs::write(path, json)
        .with_context(|| format!("Failed to write result file: {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{FinalAlternate, FinalTrace};
    use clap::CommandFactory;

    fn sample_result() -> FinalResult {
        FinalResult {
            post_url: "https://x.com/a/status/1".to_string(),
            video_url: "https://v.example/1.mp4".to_string(),
            start_time_s: 2.0,
            end_time_s: 10.0,
            confidence: 0.88,
            reason: "cat pushes glass".to_string(),
            alternates: vec![FinalAlternate {
                start_time_s: 30.0,
                end_time_s: 38.0,
                confidence: 0.6,
            }],
            trace: FinalTrace {
                candidates_considered: 10,
                filtered_by_text: 3,
                vision_calls: 3,
                final_choice_rank: 1,
            },
        }
    }

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_defaults() {
        let cli = Cli::try_parse_from([
            "clipscout",
            "--description",
            "a cat knocking a glass off a table",
            "--duration",
            "8",
        ])
        .unwrap();

        assert_eq!(cli.duration, 8);
        assert_eq!(cli.max_candidates, 10);
        assert_eq!(cli.out, PathBuf::from("results.json"));
        assert!(cli.threshold.is_none());
    }

    #[test]
    fn test_description_and_duration_required() {
        assert!(Cli::try_parse_from(["clipscout", "--duration", "8"]).is_err());
        assert!(Cli::try_parse_from(["clipscout", "--description", "x"]).is_err());
    }

    #[test]
    fn test_no_result_writes_nothing() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join("results.json");

        let written = write_outcome(&path, None).unwrap();

        assert!(!written);
        assert!(!path.exists());
    }

    #[test]
    fn test_outcome_with_result_writes_json() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join("results.json");
        let result = sample_result();

        let written = write_outcome(&path, Some(&result)).unwrap();

        assert!(written);
        let json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(json["tweet_url"], "https://x.com/a/status/1");
        assert_eq!(json["alternates"][0]["confidence"], 0.6);
        assert_eq!(json["trace"]["final_choice_rank"], 1);
    }

    #[test]
    fn test_write_result() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join("results.json");
        let result = sample_result();

        write_result(&path, &result).unwrap();

        let written: FinalResult =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written, result);
    }
}
