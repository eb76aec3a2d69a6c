//! Audio download through the `yt-dlp` command line tool.

use async_trait::async_trait;
use std::path::Path;
use std::process::Stdio;
use thiserror::Error;
use tokio::process::Command;
use tracing::debug;

/// Errors that can occur while fetching audio.
#[derive(Debug, Error)]
pub enum AudioFetchError {
    #[error("yt-dlp failed ({status}): {stderr}")]
    CommandFailed { status: String, stderr: String },

    #[error("failed to run yt-dlp: {0}")]
    Io(#[from] std::io::Error),
}

/// Backend that finds audio for a search query and writes it to disk.
#[async_trait]
pub trait AudioFetcher: Send + Sync {
    /// Download the best match for `query`. `destination_template` is a path
    /// whose file name ends in `.%(ext)s`; the backend fills in the extension.
    async fn fetch(&self, query: &str, destination_template: &Path) -> Result<(), AudioFetchError>;
}

pub struct YtDlpFetcher {
    binary: String,
    audio_format: String,
    audio_quality: String,
}

impl YtDlpFetcher {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
            audio_format: "m4a".to_string(),
            audio_quality: "192K".to_string(),
        }
    }

    pub fn binary(&self) -> &str {
        &self.binary
    }

    /// Arguments passed to yt-dlp for one download.
    fn build_args(&self, query: &str, destination_template: &Path) -> Vec<String> {
        vec![
            "--format".to_string(),
            "bestaudio/best".to_string(),
            "--extract-audio".to_string(),
            "--audio-format".to_string(),
            self.audio_format.clone(),
            "--audio-quality".to_string(),
            self.audio_quality.clone(),
            "--output".to_string(),
            destination_template.to_string_lossy().to_string(),
            "--quiet".to_string(),
            "--no-warnings".to_string(),
            "--no-progress".to_string(),
            "--no-playlist".to_string(),
            format!("ytsearch1:{}", query),
        ]
    }
}

#[async_trait]
impl AudioFetcher for YtDlpFetcher {
    async fn fetch(&self, query: &str, destination_template: &Path) -> Result<(), AudioFetchError> {
        debug!("yt-dlp query: {}", query);
        let output = Command::new(&self.binary)
            .args(self.build_args(query, destination_template))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(AudioFetchError::CommandFailed {
                status: output.status.to_string(),
                stderr,
            });
        }
        Ok(())
    }
}
