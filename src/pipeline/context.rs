//! Shared clients and settings for the pipeline stages.

use std::path::Path;
use std::sync::Arc;

use tracing::error;

use super::executor::BatchExecutor;
use super::ledger::DownloadLedger;
use super::models::{CatalogId, FailureReason, SyncError};
use super::pacer::RequestPacer;
use super::retry_policy::RetryPolicy;
use crate::audio::{AudioFetcher, AudioProbe};
use crate::blob_store::{BlobUploader, UploadedAsset};
use crate::catalog_db::CatalogDb;
use crate::spotify::{MetadataProvider, PlaylistTracksPage, SpotifyPlaylist, SpotifyTrack};

/// Everything a stage task needs, built once at startup and shared by `Arc`.
pub struct SyncContext {
    pub metadata: Arc<dyn MetadataProvider>,
    pub audio: Arc<dyn AudioFetcher>,
    pub uploader: Arc<dyn BlobUploader>,
    pub probe: Arc<dyn AudioProbe>,
    pub db: Arc<dyn CatalogDb>,
    pub ledger: DownloadLedger,
    pub retry: RetryPolicy,
    pub pacer: RequestPacer,
    pub executor: BatchExecutor,
}

impl SyncContext {
    /// Fetch track metadata, paced and retried.
    pub async fn fetch_track(&self, id: &CatalogId) -> Result<SpotifyTrack, SyncError> {
        let metadata = self.metadata.as_ref();
        let pacer = &self.pacer;
        self.retry
            .run(&format!("fetch track {}", id), move || async move {
                pacer.wait().await;
                metadata.fetch_track(id).await
            })
            .await
            .map_err(|e| {
                error!("Failed to fetch metadata for {}: {:#}", id, e);
                SyncError::external(FailureReason::MetadataFetch, e)
            })
    }

    /// Fetch a playlist with its first page of members, paced and retried.
    pub async fn fetch_playlist(&self, id: &CatalogId) -> Result<SpotifyPlaylist, SyncError> {
        let metadata = self.metadata.as_ref();
        let pacer = &self.pacer;
        self.retry
            .run(&format!("fetch playlist {}", id), move || async move {
                pacer.wait().await;
                metadata.fetch_playlist(id).await
            })
            .await
            .map_err(|e| {
                error!("Failed to fetch playlist {}: {:#}", id, e);
                SyncError::external(FailureReason::MetadataFetch, e)
            })
    }

    pub async fn fetch_playlist_page(&self, next_url: &str) -> Result<PlaylistTracksPage, SyncError> {
        let metadata = self.metadata.as_ref();
        let pacer = &self.pacer;
        self.retry
            .run("fetch playlist page", move || async move {
                pacer.wait().await;
                metadata.fetch_playlist_page(next_url).await
            })
            .await
            .map_err(|e| SyncError::external(FailureReason::MetadataFetch, e))
    }

    /// Download audio for `query` into `template`, retried.
    pub async fn fetch_audio(&self, query: &str, template: &Path) -> Result<(), SyncError> {
        let audio = self.audio.as_ref();
        self.retry
            .run(&format!("download '{}'", query), move || async move {
                audio.fetch(query, template).await
            })
            .await
            .map_err(|e| SyncError::external(FailureReason::AudioFetch, e))
    }

    /// Upload a local file, retried.
    pub async fn upload(&self, path: &Path) -> Result<UploadedAsset, SyncError> {
        let uploader = self.uploader.as_ref();
        self.retry
            .run(&format!("upload {:?}", path.file_name().unwrap_or_default()), move || async move {
                uploader.upload(path).await
            })
            .await
            .map_err(|e| SyncError::external(FailureReason::Upload, e))
    }
}
