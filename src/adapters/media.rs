//! Video download and frame sampling via external tools.
//!
//! Downloads go through `yt-dlp` into a fresh temporary directory; frames
//! are extracted with `ffmpeg` into the same directory, so dropping the
//! [`DownloadedVideo`] cleans up both.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, info};

use super::{DownloadedVideo, Frame, MediaFetcher};
use crate::error::{CollaboratorError, CollaboratorResult};

const YTDLP_FORMAT: &str = "bestvideo[ext=mp4]+bestaudio[ext=m4a]/best[ext=mp4]/best";
const FRAMES_SUBDIR: &str = "frames";

/// Tool locations and limits for the media adapter
#[derive(Debug, Clone)]
pub struct MediaConfig {
    pub ytdlp_path: String,
    pub ffmpeg_path: String,
    pub download_timeout: Duration,
    pub sample_timeout: Duration,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            ytdlp_path: "yt-dlp".to_string(),
            ffmpeg_path: "ffmpeg".to_string(),
            download_timeout: Duration::from_secs(120),
            sample_timeout: Duration::from_secs(120),
        }
    }
}

/// [`MediaFetcher`] backed by yt-dlp and ffmpeg
pub struct YtDlpFetcher {
    config: MediaConfig,
}

impl Default for YtDlpFetcher {
    fn default() -> Self {
        Self::new(MediaConfig::default())
    }
}

impl YtDlpFetcher {
    pub fn new(config: MediaConfig) -> Self {
        Self { config }
    }

    /// Run a tool to completion, returning its stdout
    async fn run_tool(
        &self,
        program: &str,
        args: &[String],
        limit: Duration,
    ) -> CollaboratorResult<String> {
        let child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| CollaboratorError::Resource(format!("failed to spawn {}: {}", program, e)))?;

        let output = timeout(limit, child.wait_with_output())
            .await
            .map_err(|_| {
                CollaboratorError::Transient(format!("{} timed out after {:?}", program, limit))
            })?
            .map_err(|e| CollaboratorError::Resource(format!("failed to wait for {}: {}", program, e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let exit_code = output.status.code().unwrap_or(-1);
            return Err(CollaboratorError::Resource(format!(
                "{} failed with exit code {}: {}",
                program,
                exit_code,
                stderr.trim()
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// Last non-empty stdout line that names an existing file
fn downloaded_path(stdout: &str) -> Option<PathBuf> {
    stdout
        .lines()
        .rev()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(PathBuf::from)
        .find(|p| p.is_file())
}

/// Sampled JPEGs in frame order
async fn collect_frames(dir: &Path, interval_secs: u32) -> CollaboratorResult<Vec<Frame>> {
    let mut names = Vec::new();
    let mut entries = tokio::fs::read_dir(dir)
        .await
        .map_err(|e| CollaboratorError::Resource(format!("failed to list frames: {}", e)))?;
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| CollaboratorError::Resource(format!("failed to list frames: {}", e)))?
    {
        let path = entry.path();
        if path.extension().is_some_and(|ext| ext == "jpg") {
            names.push(path);
        }
    }
    // frame_00001.jpg, frame_00002.jpg, ...
    names.sort();

    let mut frames = Vec::with_capacity(names.len());
    for (index, path) in names.iter().enumerate() {
        let jpeg = tokio::fs::read(path)
            .await
            .map_err(|e| CollaboratorError::Resource(format!("failed to read frame: {}", e)))?;
        frames.push(Frame {
            timestamp_s: f64::from(interval_secs) * index as f64,
            jpeg,
        });
    }
    Ok(frames)
}

#[async_trait]
impl MediaFetcher for YtDlpFetcher {
    async fn download(&self, post_url: &str) -> CollaboratorResult<DownloadedVideo> {
        let dir = tempfile::tempdir()
            .map_err(|e| CollaboratorError::Resource(format!("failed to create temp dir: {}", e)))?;
        let template = dir.path().join("%(id)s.%(ext)s");

        let args = vec![
            "--format".to_string(),
            YTDLP_FORMAT.to_string(),
            "--merge-output-format".to_string(),
            "mp4".to_string(),
            "--output".to_string(),
            template.to_string_lossy().into_owned(),
            "--force-overwrites".to_string(),
            "--no-progress".to_string(),
            "--quiet".to_string(),
            "--print".to_string(),
            "after_move:filepath".to_string(),
            post_url.to_string(),
        ];

        let stdout = self
            .run_tool(&self.config.ytdlp_path, &args, self.config.download_timeout)
            .await?;

        let path = downloaded_path(&stdout).ok_or_else(|| {
            CollaboratorError::Resource(format!("yt-dlp produced no file for {}", post_url))
        })?;

        info!(post = %post_url, path = %path.display(), "Downloaded video");
        Ok(DownloadedVideo::new(dir, path))
    }

    async fn sample_frames(
        &self,
        video: &DownloadedVideo,
        interval_secs: u32,
        max_frames: usize,
    ) -> CollaboratorResult<Vec<Frame>> {
        let frames_dir = video.scratch_dir().join(FRAMES_SUBDIR);
        tokio::fs::create_dir_all(&frames_dir)
            .await
            .map_err(|e| CollaboratorError::Resource(format!("failed to create frame dir: {}", e)))?;

        let args = vec![
            "-hide_banner".to_string(),
            "-loglevel".to_string(),
            "error".to_string(),
            "-i".to_string(),
            video.path().to_string_lossy().into_owned(),
            "-vf".to_string(),
            format!("fps=1/{}", interval_secs.max(1)),
            "-frames:v".to_string(),
            max_frames.to_string(),
            "-q:v".to_string(),
            "3".to_string(),
            frames_dir.join("frame_%05d.jpg").to_string_lossy().into_owned(),
        ];

        self.run_tool(&self.config.ffmpeg_path, &args, self.config.sample_timeout)
            .await?;

        let frames = collect_frames(&frames_dir, interval_secs).await?;
        debug!(count = frames.len(), path = %video.path().display(), "Sampled frames");
        Ok(frames)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_downloaded_path_picks_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("123.mp4");
        std::fs::write(&file, b"x").unwrap();

        let stdout = format!("[info] noise\n{}\n\n", file.display());
        assert_eq!(downloaded_path(&stdout), Some(file));
        assert_eq!(downloaded_path("nothing useful\n"), None);
    }

    #[tokio::test]
    async fn test_collect_frames_in_order_with_timestamps() {
        let dir = tempfile::tempdir().unwrap();
        for i in [3, 1, 2] {
            std::fs::write(dir.path().join(format!("frame_{:05}.jpg", i)), vec![i as u8]).unwrap();
        }
        std::fs::write(dir.path().join("notes.txt"), b"skip").unwrap();

        let frames = collect_frames(dir.path(), 2).await.unwrap();

        assert_eq!(frames.len(), 3);
        assert_eq!(frames[0].jpeg, vec![1]);
        assert_eq!(frames[2].jpeg, vec![3]);
        assert_eq!(frames[1].timestamp_s, 2.0);
        assert_eq!(frames[2].timestamp_s, 4.0);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_tool_timeout_is_transient() {
        let fetcher = YtDlpFetcher::default();

        let result = fetcher
            .run_tool("sleep", &["5".to_string()], Duration::from_millis(100))
            .await;

        assert!(matches!(result, Err(CollaboratorError::Transient(_))));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_tool_failure_is_resource_error() {
        let fetcher = YtDlpFetcher::default();

        let result = fetcher
            .run_tool("false", &[], Duration::from_secs(5))
            .await;

        assert!(matches!(result, Err(CollaboratorError::Resource(_))));
    }

    #[tokio::test]
    async fn test_missing_tool_is_resource_error() {
        let fetcher = YtDlpFetcher::new(MediaConfig {
            ytdlp_path: "/nonexistent/yt-dlp-binary".to_string(),
            ..Default::default()
        });

        let result = fetcher.download("https://x.com/a/status/1").await;
        assert!(matches!(result, Err(CollaboratorError::Resource(_))));
    }
}
