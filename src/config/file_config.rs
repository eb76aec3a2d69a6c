use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct FileConfig {
    // Core settings (can override CLI and environment)
    pub database_path: Option<String>,
    pub download_folder: Option<String>,
    pub max_workers: Option<usize>,
    pub debug: Option<bool>,

    // Collaborators
    pub spotify_rate_limit_delay: Option<f64>,
    pub http_timeout_secs: Option<u64>,
    pub cloudinary_folder: Option<String>,
    pub yt_dlp_path: Option<String>,
    pub ffprobe_path: Option<String>,

    // Feature configs
    pub retry: Option<RetryConfig>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct RetryConfig {
    /// Total attempts per external call
    pub max_retries: Option<u32>,
    /// Seconds before the second attempt
    pub retry_delay: Option<f64>,
    pub backoff_factor: Option<f64>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        toml::from_str(&content).with_context(|| format!("Failed to parse config file: {:?}", path))
    }
}
