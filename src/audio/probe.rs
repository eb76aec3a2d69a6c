//! Duration extraction using ffprobe.

use async_trait::async_trait;
use serde::Deserialize;
use std::path::Path;
use std::process::Stdio;
use thiserror::Error;
use tokio::process::Command;

/// Errors that can occur while probing an audio file.
#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("ffprobe failed: {0}")]
    ProbeFailed(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid output: {0}")]
    InvalidOutput(String),
}

/// Reads stream information from local audio files.
#[async_trait]
pub trait AudioProbe: Send + Sync {
    /// Duration in seconds, rounded to two decimals.
    async fn duration_seconds(&self, path: &Path) -> Result<f64, ProbeError>;
}

/// ffprobe JSON output structure.
#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    format: FfprobeFormat,
}

#[derive(Debug, Deserialize)]
struct FfprobeFormat {
    duration: Option<String>,
}

pub struct FfprobeProbe {
    binary: String,
}

impl FfprobeProbe {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }
}

#[async_trait]
impl AudioProbe for FfprobeProbe {
    async fn duration_seconds(&self, path: &Path) -> Result<f64, ProbeError> {
        let output = Command::new(&self.binary)
            .args(["-v", "quiet", "-print_format", "json", "-show_format"])
            .arg(path)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ProbeError::ProbeFailed(stderr.to_string()));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        parse_duration(&stdout)
    }
}

fn parse_duration(json: &str) -> Result<f64, ProbeError> {
    let probe: FfprobeOutput = serde_json::from_str(json)
        .map_err(|e| ProbeError::InvalidOutput(format!("JSON parse error: {}", e)))?;

    let duration: f64 = probe
        .format
        .duration
        .ok_or_else(|| ProbeError::InvalidOutput("No duration in format section".to_string()))?
        .parse()
        .map_err(|e| ProbeError::InvalidOutput(format!("Bad duration: {}", e)))?;

    if !duration.is_finite() || duration < 0.0 {
        return Err(ProbeError::InvalidOutput(format!(
            "Bad duration: {}",
            duration
        )));
    }
    Ok(round_to_hundredths(duration))
}

pub fn round_to_hundredths(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
