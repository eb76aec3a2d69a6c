//! Signed uploads to Cloudinary.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;
use tracing::debug;

use super::{BlobUploader, UploadedAsset};
use crate::config::CloudinaryCredentials;

pub const DEFAULT_API_BASE: &str = "https://api.cloudinary.com/v1_1";

/// Cloudinary stores audio under the "video" resource type.
const RESOURCE_TYPE: &str = "video";

#[derive(Debug, Deserialize)]
struct UploadResponse {
    secure_url: String,
    public_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

pub struct CloudinaryUploader {
    client: reqwest::Client,
    api_base: String,
    credentials: CloudinaryCredentials,
    folder: String,
}

impl CloudinaryUploader {
    pub fn new(credentials: CloudinaryCredentials, folder: String, timeout: Duration) -> Result<Self> {
        Self::with_api_base(credentials, folder, timeout, DEFAULT_API_BASE.to_string())
    }

    pub fn with_api_base(
        credentials: CloudinaryCredentials,
        folder: String,
        timeout: Duration,
        api_base: String,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            api_base: api_base.trim_end_matches('/').to_string(),
            credentials,
            folder,
        })
    }

    /// Validate the credentials locally. Cloudinary has no cheap auth probe
    /// for upload-only keys, so this only rejects values that can never work.
    pub fn check_credentials(&self) -> Result<()> {
        let cloud_name = &self.credentials.cloud_name;
        if cloud_name.is_empty()
            || !cloud_name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            bail!("Invalid Cloudinary cloud name: {:?}", cloud_name);
        }
        if self.credentials.api_key.is_empty() || self.credentials.api_secret.is_empty() {
            bail!("Cloudinary API key and secret must not be empty");
        }
        Ok(())
    }

    pub fn upload_url(&self) -> String {
        format!(
            "{}/{}/{}/upload",
            self.api_base, self.credentials.cloud_name, RESOURCE_TYPE
        )
    }

    /// Parameters that are part of the signature.
    fn signed_params(&self, timestamp: i64) -> BTreeMap<&'static str, String> {
        let mut params = BTreeMap::new();
        if !self.folder.is_empty() {
            params.insert("folder", self.folder.clone());
        }
        params.insert("overwrite", "true".to_string());
        params.insert("timestamp", timestamp.to_string());
        params
    }
}

/// Sign `params` the way Cloudinary expects: sorted `key=value` pairs joined
/// by `&`, followed by the API secret, hashed with SHA-256.
pub fn sign_params(params: &BTreeMap<&str, String>, api_secret: &str) -> String {
    let to_sign = params
        .iter()
        .filter(|(_, value)| !value.is_empty())
        .map(|(key, value)| format!("{}={}", key, value))
        .collect::<Vec<_>>()
        .join("&");

    let mut hasher = Sha256::new();
    hasher.update(to_sign.as_bytes());
    hasher.update(api_secret.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[async_trait]
impl BlobUploader for CloudinaryUploader {
    async fn upload(&self, local_path: &Path) -> Result<UploadedAsset> {
        let bytes = tokio::fs::read(local_path)
            .await
            .with_context(|| format!("Failed to read {:?} for upload", local_path))?;
        let file_name = local_path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "audio".to_string());

        let params = self.signed_params(chrono::Utc::now().timestamp());
        let signature = sign_params(&params, &self.credentials.api_secret);

        let mut form = reqwest::multipart::Form::new()
            .part(
                "file",
                reqwest::multipart::Part::bytes(bytes).file_name(file_name.clone()),
            )
            .text("api_key", self.credentials.api_key.clone())
            .text("signature", signature)
            .text("signature_algorithm", "sha256");
        for (key, value) in params {
            form = form.text(key, value);
        }

        debug!("Uploading {} to Cloudinary", file_name);
        let response = self
            .client
            .post(self.upload_url())
            .multipart(form)
            .send()
            .await
            .context("Failed to connect to Cloudinary")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorResponse>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            bail!("Cloudinary upload failed with status {}: {}", status, message);
        }

        let body: UploadResponse = response
            .json()
            .await
            .context("Failed to parse Cloudinary upload response")?;
        debug!(
            "Uploaded {} as {}",
            file_name,
            body.public_id.as_deref().unwrap_or("?")
        );
        Ok(UploadedAsset {
            secure_url: body.secure_url,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn credentials(cloud_name: &str) -> CloudinaryCredentials {
        CloudinaryCredentials {
            cloud_name: cloud_name.to_string(),
            api_key: "1234".to_string(),
            api_secret: "abcd".to_string(),
        }
    }

    fn uploader(cloud_name: &str, folder: &str) -> CloudinaryUploader {
        CloudinaryUploader::new(
            credentials(cloud_name),
            folder.to_string(),
            Duration::from_secs(30),
        )
        .unwrap()
    }

    #[test]
    fn test_sign_params_sorted_and_hashed() {
        let mut params = BTreeMap::new();
        params.insert("timestamp", "1315060510".to_string());
        params.insert("public_id", "sample_image".to_string());
        params.insert("eager", "w_400,h_300,c_pad|w_260,h_200,c_crop".to_string());

        let expected = {
            let mut hasher = Sha256::new();
            hasher.update(
                b"eager=w_400,h_300,c_pad|w_260,h_200,c_crop&public_id=sample_image&timestamp=1315060510abcd",
            );
            format!("{:x}", hasher.finalize())
        };
        assert_eq!(sign_params(&params, "abcd"), expected);
        assert_eq!(expected.len(), 64);
    }

    #[test]
    fn test_signed_params() {
        let params = uploader("demo", "vibAura_songs").signed_params(42);
        let keys: Vec<&str> = params.keys().copied().collect();
        assert_eq!(keys, vec!["folder", "overwrite", "timestamp"]);
        assert_eq!(params["timestamp"], "42");

        let params = uploader("demo", "").signed_params(42);
        assert!(!params.contains_key("folder"));
    }

    #[test]
    fn test_upload_url() {
        assert_eq!(
            uploader("demo", "x").upload_url(),
            "https://api.cloudinary.com/v1_1/demo/video/upload"
        );
    }

    #[test]
    fn test_check_credentials() {
        assert!(uploader("my-cloud_1", "x").check_credentials().is_ok());
        assert!(uploader("bad cloud", "x").check_credentials().is_err());
        assert!(uploader("", "x").check_credentials().is_err());
    }

    #[tokio::test]
    async fn test_upload_missing_file() {
        let err = uploader("demo", "x")
            .upload(Path::new("/nonexistent/song.m4a"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("for upload"));
    }
}
