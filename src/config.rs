//! Configuration for clipscout.
//!
//! Configuration sources (highest priority first):
//! 1. Environment variables (GEMINI_API_KEY, X_BEARER_TOKEN, ...), including
//!    any loaded from a `.env` file at startup
//! 2. Config file (.clipscout/config.yaml, or CLIPSCOUT_CONFIG / --config)
//! 3. Defaults
//!
//! Config file discovery:
//! - Searches current directory and parents for .clipscout/config.yaml

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::adapters::{GeminiConfig, MediaConfig, XConfig};
use crate::core::{EngineOptions, RetryPolicy, MIN_SEARCH_MULTIPLIER};

const DEFAULT_TIMEOUT_SECONDS: u64 = 120;

/// Raw config file schema (matches YAML structure)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConfigFile {
    pub version: Option<String>,
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub gemini: GeminiFileConfig,
    #[serde(default)]
    pub x: XFileConfig,
    #[serde(default)]
    pub media: MediaFileConfig,
    pub retry: Option<RetryPolicy>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PipelineConfig {
    pub score_threshold: Option<f64>,
    pub search_multiplier: Option<usize>,
    pub frame_interval_secs: Option<u32>,
    pub max_frames: Option<usize>,
    pub vision_concurrency: Option<usize>,
    /// Per-call timeout for every collaborator
    pub timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GeminiFileConfig {
    pub model: Option<String>,
    pub base_url: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct XFileConfig {
    pub base_url: Option<String>,
    pub videos_only: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MediaFileConfig {
    pub ytdlp_path: Option<String>,
    pub ffmpeg_path: Option<String>,
}

/// Pipeline tunables after resolution
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineSettings {
    pub score_threshold: f64,
    pub search_multiplier: usize,
    pub frame_interval_secs: u32,
    pub max_frames: usize,
    pub vision_concurrency: Option<usize>,
    pub retry: RetryPolicy,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            score_threshold: 0.5,
            search_multiplier: 5,
            frame_interval_secs: 2,
            max_frames: 60,
            vision_concurrency: None,
            retry: RetryPolicy::default(),
        }
    }
}

/// Resolved configuration
#[derive(Debug, Clone)]
pub struct Settings {
    pub gemini: GeminiConfig,
    pub x: XConfig,
    pub media: MediaConfig,
    pub pipeline: PipelineSettings,
    /// Path to config file (if found)
    pub config_file: Option<PathBuf>,
}

impl Settings {
    /// Load settings from the environment, an optional explicit config file
    /// path, or a discovered `.clipscout/config.yaml`
    pub fn load(explicit_config: Option<&Path>) -> Result<Self> {
        let config_path = explicit_config
            .map(Path::to_path_buf)
            .or_else(|| std::env::var("CLIPSCOUT_CONFIG").ok().map(PathBuf::from))
            .or_else(find_config_file);

        let file = match config_path {
            Some(path) => {
                let config = load_config_file(&path)?;
                Some((path, config))
            }
            None => None,
        };

        let settings = resolve(file, |key| std::env::var(key).ok());
        settings.validate()?;
        Ok(settings)
    }

    /// Reject values the pipeline cannot run with
    pub fn validate(&self) -> Result<()> {
        let p = &self.pipeline;
        if !(0.0..=1.0).contains(&p.score_threshold) {
            anyhow::bail!("score_threshold must be in [0, 1], got {}", p.score_threshold);
        }
        if p.search_multiplier < MIN_SEARCH_MULTIPLIER {
            anyhow::bail!(
                "search_multiplier must be at least {}, got {}",
                MIN_SEARCH_MULTIPLIER,
                p.search_multiplier
            );
        }
        if p.frame_interval_secs == 0 {
            anyhow::bail!("frame_interval_secs must be positive");
        }
        if p.max_frames == 0 {
            anyhow::bail!("max_frames must be positive");
        }
        if p.retry.max_attempts == 0 {
            anyhow::bail!("retry.max_attempts must be at least 1");
        }
        Ok(())
    }

    /// Engine options derived from the pipeline settings
    pub fn engine_options(&self) -> EngineOptions {
        EngineOptions {
            score_threshold: self.pipeline.score_threshold,
            search_multiplier: self.pipeline.search_multiplier,
            vision_concurrency: self.pipeline.vision_concurrency,
            retry: self.pipeline.retry.clone(),
        }
    }
}

/// Find config file by searching current directory and parents
fn find_config_file() -> Option<PathBuf> {
    let mut current = std::env::current_dir().ok()?;

    loop {
        let config_path = current.join(".clipscout").join("config.yaml");
        if config_path.exists() {
            return Some(config_path);
        }

        if !current.pop() {
            break;
        }
    }

    None
}

/// Load and parse config file
fn load_config_file(path: &Path) -> Result<ConfigFile> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    serde_yaml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Merge defaults, an optional config file and environment lookups
fn resolve<E>(file: Option<(PathBuf, ConfigFile)>, env: E) -> Settings
where
    E: Fn(&str) -> Option<String>,
{
    let (config_file, config) = match file {
        Some((path, config)) => (Some(path), config),
        None => (None, ConfigFile::default()),
    };

    let defaults = PipelineSettings::default();
    let p = &config.pipeline;
    let pipeline = PipelineSettings {
        score_threshold: p.score_threshold.unwrap_or(defaults.score_threshold),
        search_multiplier: p.search_multiplier.unwrap_or(defaults.search_multiplier),
        frame_interval_secs: p.frame_interval_secs.unwrap_or(defaults.frame_interval_secs),
        max_frames: p.max_frames.unwrap_or(defaults.max_frames),
        vision_concurrency: p.vision_concurrency.filter(|&n| n > 0),
        retry: config.retry.clone().unwrap_or(defaults.retry),
    };
    let timeout = Duration::from_secs(p.timeout_seconds.unwrap_or(DEFAULT_TIMEOUT_SECONDS));

    let gemini_defaults = GeminiConfig::default();
    let gemini = GeminiConfig {
        base_url: env("GEMINI_BASE_URL")
            .or_else(|| config.gemini.base_url.clone())
            .unwrap_or(gemini_defaults.base_url),
        api_key: env("GEMINI_API_KEY").or_else(|| env("GOOGLE_API_KEY")),
        model: env("GEMINI_MODEL")
            .or_else(|| config.gemini.model.clone())
            .unwrap_or(gemini_defaults.model),
        timeout,
    };

    let x_defaults = XConfig::default();
    let x = XConfig {
        base_url: env("X_API_BASE_URL")
            .or_else(|| config.x.base_url.clone())
            .unwrap_or(x_defaults.base_url),
        bearer_token: env("X_BEARER_TOKEN"),
        timeout,
        videos_only: config.x.videos_only.unwrap_or(x_defaults.videos_only),
    };

    let media_defaults = MediaConfig::default();
    let media = MediaConfig {
        ytdlp_path: config.media.ytdlp_path.clone().unwrap_or(media_defaults.ytdlp_path),
        ffmpeg_path: config.media.ffmpeg_path.clone().unwrap_or(media_defaults.ffmpeg_path),
        download_timeout: timeout,
        sample_timeout: timeout,
    };

    Settings {
        gemini,
        x,
        media,
        pipeline,
        config_file,
    }
}
