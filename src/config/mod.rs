mod file_config;

pub use file_config::{FileConfig, RetryConfig};

use anyhow::{bail, Result};
use std::collections::HashMap;
use std::fmt::Display;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Environment variables visible to config resolution.
pub type EnvVars = HashMap<String, String>;

pub const DEFAULT_DATABASE_PATH: &str = "spotsync.db";
pub const DEFAULT_DOWNLOAD_FOLDER: &str = "downloaded-songs";
pub const DEFAULT_CLOUDINARY_FOLDER: &str = "vibAura_songs";
pub const DEFAULT_MAX_WORKERS: usize = 4;

/// CLI arguments that can be used for config resolution.
/// This struct mirrors the CLI arguments that can be overridden by TOML config.
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    pub db_path: Option<PathBuf>,
    pub download_dir: Option<PathBuf>,
    pub workers: Option<usize>,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    // Core settings
    pub database_path: PathBuf,
    pub download_folder: PathBuf,
    pub max_workers: usize,
    pub debug: bool,

    // Collaborators
    pub metadata_rate_limit_delay: Duration,
    pub http_timeout: Duration,
    pub cloudinary_folder: String,
    pub yt_dlp_path: String,
    pub ffprobe_path: String,

    pub retry: RetrySettings,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RetrySettings {
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub backoff_factor: f64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_secs(1),
            backoff_factor: 2.0,
        }
    }
}

impl AppConfig {
    /// Resolve configuration from CLI arguments, optional TOML file config and
    /// the environment. TOML values override CLI values, CLI values override
    /// the environment.
    pub fn resolve(cli: &CliConfig, file_config: Option<FileConfig>, env: &EnvVars) -> Result<Self> {
        let file = file_config.unwrap_or_default();

        let database_path = file
            .database_path
            .map(PathBuf::from)
            .or_else(|| cli.db_path.clone())
            .or_else(|| env_var(env, "DATABASE_PATH").map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DATABASE_PATH));

        let download_folder = file
            .download_folder
            .map(PathBuf::from)
            .or_else(|| cli.download_dir.clone())
            .or_else(|| env_var(env, "DOWNLOAD_FOLDER").map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DOWNLOAD_FOLDER));

        let max_workers = match file.max_workers.or(cli.workers) {
            Some(workers) => workers,
            None => parse_env(env, "MAX_WORKERS")?.unwrap_or(DEFAULT_MAX_WORKERS),
        };
        if max_workers == 0 {
            bail!("max_workers must be at least 1");
        }

        let debug = match file.debug {
            Some(debug) => debug,
            None => parse_env_bool(env, "DEBUG")?.unwrap_or(false),
        };

        let rate_limit_secs = match file.spotify_rate_limit_delay {
            Some(secs) => secs,
            None => parse_env(env, "SPOTIFY_RATE_LIMIT_DELAY")?.unwrap_or(0.1),
        };
        let metadata_rate_limit_delay = seconds("spotify_rate_limit_delay", rate_limit_secs)?;

        let http_timeout = Duration::from_secs(match file.http_timeout_secs {
            Some(secs) => secs,
            None => parse_env(env, "HTTP_TIMEOUT_SECS")?.unwrap_or(30),
        });

        let cloudinary_folder = file
            .cloudinary_folder
            .or_else(|| env_var(env, "CLOUDINARY_FOLDER"))
            .unwrap_or_else(|| DEFAULT_CLOUDINARY_FOLDER.to_string());
        let yt_dlp_path = file
            .yt_dlp_path
            .or_else(|| env_var(env, "YT_DLP_PATH"))
            .unwrap_or_else(|| "yt-dlp".to_string());
        let ffprobe_path = file
            .ffprobe_path
            .or_else(|| env_var(env, "FFPROBE_PATH"))
            .unwrap_or_else(|| "ffprobe".to_string());

        // Retry settings - merge file config with env and defaults
        let retry_file = file.retry.unwrap_or_default();
        let defaults = RetrySettings::default();
        let max_attempts = match retry_file.max_retries {
            Some(n) => n,
            None => parse_env(env, "MAX_RETRIES")?.unwrap_or(defaults.max_attempts),
        };
        let retry_delay = match retry_file.retry_delay {
            Some(secs) => secs,
            None => parse_env(env, "RETRY_DELAY")?.unwrap_or(defaults.initial_delay.as_secs_f64()),
        };
        let backoff_factor = match retry_file.backoff_factor {
            Some(factor) => factor,
            None => parse_env(env, "RETRY_BACKOFF_FACTOR")?.unwrap_or(defaults.backoff_factor),
        };
        if max_attempts == 0 {
            bail!("max_retries must be at least 1");
        }
        if !backoff_factor.is_finite() || backoff_factor <= 0.0 {
            bail!("retry backoff_factor must be a positive number, got {}", backoff_factor);
        }
        let retry = RetrySettings {
            max_attempts,
            initial_delay: seconds("retry_delay", retry_delay)?,
            backoff_factor,
        };

        Ok(Self {
            database_path,
            download_folder,
            max_workers,
            debug,
            metadata_rate_limit_delay,
            http_timeout,
            cloudinary_folder,
            yt_dlp_path,
            ffprobe_path,
            retry,
        })
    }

    /// Default tracing filter directive for this config.
    pub fn default_log_level(&self) -> &'static str {
        if self.debug {
            "debug"
        } else {
            "info"
        }
    }
}

#[derive(Clone)]
pub struct SpotifyCredentials {
    pub client_id: String,
    pub client_secret: String,
}

#[derive(Clone)]
pub struct CloudinaryCredentials {
    pub cloud_name: String,
    pub api_key: String,
    pub api_secret: String,
}

// Secrets never show up in logs
impl std::fmt::Debug for SpotifyCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpotifyCredentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"***")
            .finish()
    }
}

impl std::fmt::Debug for CloudinaryCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudinaryCredentials")
            .field("cloud_name", &self.cloud_name)
            .field("api_key", &self.api_key)
            .field("api_secret", &"***")
            .finish()
    }
}

/// Credentials for the external services, read from the environment only.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub spotify: SpotifyCredentials,
    pub cloudinary: CloudinaryCredentials,
}

impl Credentials {
    pub const REQUIRED_VARS: [&'static str; 5] = [
        "SPOTIFY_CLIENT_ID",
        "SPOTIFY_CLIENT_SECRET",
        "CLOUDINARY_CLOUD_NAME",
        "CLOUDINARY_API_KEY",
        "CLOUDINARY_API_SECRET",
    ];

    /// Read all credentials, reporting every missing variable at once.
    pub fn from_env(env: &EnvVars) -> Result<Self> {
        let missing: Vec<&str> = Self::REQUIRED_VARS
            .iter()
            .copied()
            .filter(|key| env_var(env, key).is_none())
            .collect();
        if !missing.is_empty() {
            bail!(
                "Missing required environment variables: {}",
                missing.join(", ")
            );
        }

        let get = |key: &str| env_var(env, key).unwrap_or_default();
        Ok(Self {
            spotify: SpotifyCredentials {
                client_id: get("SPOTIFY_CLIENT_ID"),
                client_secret: get("SPOTIFY_CLIENT_SECRET"),
            },
            cloudinary: CloudinaryCredentials {
                cloud_name: get("CLOUDINARY_CLOUD_NAME"),
                api_key: get("CLOUDINARY_API_KEY"),
                api_secret: get("CLOUDINARY_API_SECRET"),
            },
        })
    }
}

/// Non-empty, trimmed value of an environment variable.
fn env_var(env: &EnvVars, key: &str) -> Option<String> {
    env.get(key)
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn parse_env<T>(env: &EnvVars, key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: Display,
{
    match env_var(env, key) {
        None => Ok(None),
        Some(raw) => match raw.parse::<T>() {
            Ok(value) => Ok(Some(value)),
            Err(e) => bail!("Invalid value for {}: {:?} ({})", key, raw, e),
        },
    }
}

fn parse_env_bool(env: &EnvVars, key: &str) -> Result<Option<bool>> {
    match env_var(env, key) {
        None => Ok(None),
        Some(raw) => match raw.to_lowercase().as_str() {
            "true" | "1" | "yes" => Ok(Some(true)),
            "false" | "0" | "no" => Ok(Some(false)),
            _ => bail!("Invalid value for {}: {:?} (expected true or false)", key, raw),
        },
    }
}

fn seconds(name: &str, secs: f64) -> Result<Duration> {
    match Duration::try_from_secs_f64(secs) {
        Ok(duration) => Ok(duration),
        Err(_) => bail!("{} must be a non-negative number of seconds, got {}", name, secs),
    }
}
