//! Cloud storage for uploaded audio.

mod cloudinary;

pub use cloudinary::{sign_params, CloudinaryUploader};

use anyhow::Result;
use async_trait::async_trait;
use std::path::Path;

/// Publicly reachable copy of an uploaded file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedAsset {
    pub secure_url: String,
}

#[async_trait]
pub trait BlobUploader: Send + Sync {
    async fn upload(&self, local_path: &Path) -> Result<UploadedAsset>;
}
